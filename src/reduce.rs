//! Collective reductions: `accumulate` (native-primitive path) and `accumulate_custom` (the
//! `(value, valid)`-tagged path for user operators or non-primitive element types).
//!
//! Both are two-phase: a local fold over the caller's iterator, then a collective all-reduce
//! through the team's transport, then one final application of the caller's `binop` against
//! `init`. The local fold's running accumulator is pushed through the same `combine_bytes`
//! helper the transport's own all-reduce tree uses, so the local and collective phases agree on
//! arithmetic by construction rather than by two independent implementations.

use pgas_transport::{op_create, op_destroy, DataType, ReduceOp};

use crate::container::Container;
use crate::memory::{from_bytes, to_bytes};
use crate::team::Team;
use crate::view::View;

/// Element types the native reduction path understands natively, with a defined identity element
/// per recognized operator (used to seed an empty local fold without requiring the caller to
/// supply one).
pub trait Accumulable: Copy {
    const DTYPE: DataType;
    fn identity(op: ReduceOp) -> Self;
}

macro_rules! impl_accumulable_int {
    ($ty:ty, $dtype:expr) => {
        impl Accumulable for $ty {
            const DTYPE: DataType = $dtype;
            fn identity(op: ReduceOp) -> Self {
                match op {
                    ReduceOp::Sum => 0,
                    ReduceOp::Product => 1,
                    ReduceOp::Min => <$ty>::MAX,
                    ReduceOp::Max => <$ty>::MIN,
                    ReduceOp::BitAnd => !(0 as $ty),
                    ReduceOp::BitOr => 0,
                    ReduceOp::BitXor => 0,
                    other => panic!("{other:?} has no identity for integer accumulation"),
                }
            }
        }
    };
}

impl_accumulable_int!(i32, DataType::I32);
impl_accumulable_int!(i64, DataType::I64);
impl_accumulable_int!(u32, DataType::U32);
impl_accumulable_int!(u64, DataType::U64);

macro_rules! impl_accumulable_float {
    ($ty:ty, $dtype:expr) => {
        impl Accumulable for $ty {
            const DTYPE: DataType = $dtype;
            fn identity(op: ReduceOp) -> Self {
                match op {
                    ReduceOp::Sum => 0.0,
                    ReduceOp::Product => 1.0,
                    ReduceOp::Min => <$ty>::INFINITY,
                    ReduceOp::Max => <$ty>::NEG_INFINITY,
                    other => panic!("{other:?} has no identity for float accumulation"),
                }
            }
        }
    };
}

impl_accumulable_float!(f32, DataType::F32);
impl_accumulable_float!(f64, DataType::F64);

impl Accumulable for bool {
    const DTYPE: DataType = DataType::Bool;
    fn identity(op: ReduceOp) -> Self {
        match op {
            ReduceOp::LogicalAnd => true,
            ReduceOp::LogicalOr => false,
            other => panic!("{other:?} has no identity for bool accumulation"),
        }
    }
}

/// Local-range form: fold `local` with the native reduction `op`, all-reduce across `team`, then
/// apply `op` once more against `init`.
pub fn accumulate<T: Accumulable>(local: impl Iterator<Item = T>, init: T, op: ReduceOp, team: &Team) -> T {
    let identity = T::identity(op);
    let local_result = local.fold(identity, |acc, x| {
        from_bytes(&pgas_transport::combine_bytes(op, T::DTYPE, &to_bytes(&acc), &to_bytes(&x)))
    });
    let combined = team.transport().allreduce(&to_bytes(&local_result), T::DTYPE, op);
    from_bytes(&pgas_transport::combine_bytes(op, T::DTYPE, &to_bytes(&init), &combined))
}

/// Global-range form over an entire container: computes this unit's local range via the
/// container's pattern, then dispatches to the local-range form.
pub fn accumulate_container<T: Accumulable, const R: usize>(
    container: &Container<T, R>,
    init: T,
    op: ReduceOp,
) -> T {
    accumulate(container.local_iter().map(|r| r.get()), init, op, container.team())
}

/// Global-range form over a view: restricts to this unit's locally-owned indices, then dispatches
/// to the local-range form.
pub fn accumulate_view<T: Accumulable, const R: usize>(view: &View<'_, T, R>, init: T, op: ReduceOp) -> T {
    let team = view.origin_team();
    accumulate(view.as_local().iter().map(|r| r.get()), init, op, team)
}

fn encode_custom_payload<T: Copy>(value: T, valid: bool) -> Vec<u8> {
    let mut bytes = to_bytes(&value);
    bytes.push(valid as u8);
    bytes
}

fn decode_custom_payload<T: Copy>(bytes: &[u8]) -> (T, bool) {
    let elem_size = std::mem::size_of::<T>();
    let value = from_bytes(&bytes[..elem_size]);
    let valid = bytes[elem_size] != 0;
    (value, valid)
}

/// Local-range form for a user-defined `binop` (or a non-primitive element type) not representable
/// in the transport's native op/type table. The all-reduce payload is tagged with a validity flag
/// so units with an empty local range do not need to supply an identity element for `binop`.
pub fn accumulate_custom<T, F>(local: impl Iterator<Item = T>, init: T, binop: F, team: &Team) -> T
where
    T: Copy + Send + Sync + 'static,
    F: Fn(T, T) -> T + Send + Sync + 'static,
{
    let binop = std::sync::Arc::new(binop);
    let mut value = init;
    let mut valid = false;
    for x in local {
        value = if valid { binop(value, x) } else { x };
        valid = true;
    }
    let payload = encode_custom_payload(value, valid);
    let op_binop = binop.clone();
    let op_id = op_create(move |a: &[u8], b: &[u8]| {
        let (a_val, a_valid) = decode_custom_payload::<T>(a);
        let (b_val, b_valid) = decode_custom_payload::<T>(b);
        let (out_val, out_valid) = match (a_valid, b_valid) {
            (true, true) => (op_binop(a_val, b_val), true),
            (true, false) => (a_val, true),
            (false, true) => (b_val, true),
            (false, false) => (a_val, false),
        };
        encode_custom_payload(out_val, out_valid)
    });
    let combined = team
        .transport()
        .allreduce(&payload, DataType::Custom(0), ReduceOp::Custom(op_id));
    op_destroy(op_id);
    let (combined_value, combined_valid) = decode_custom_payload::<T>(&combined);
    if combined_valid {
        // Spec: "finally binop(init, combined) is returned" — apply the caller's op once more
        // against init, same as the native path in `accumulate`.
        binop(init, combined_value)
    } else {
        log::warn!("accumulate_custom: every unit had an empty local range; returning init unchanged");
        init
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::Team;
    use pgas_transport::run_spmd;
    use std::sync::Arc;

    #[test]
    fn accumulate_sum_matches_gauss_sum() {
        let results = run_spmd(3, |t| {
            let team = Team::new(Arc::new(t), "test");
            let arr: Container<i64, 1> = Container::array(20, team.clone());
            for i in 0..20i64 {
                let r = arr.at_index(i as usize);
                if r.is_local() {
                    r.set(i + 1);
                }
            }
            arr.barrier();
            accumulate_container(&arr, 10, ReduceOp::Sum)
        })
        .unwrap();
        assert_eq!(results, vec![220, 220, 220]);
    }

    #[test]
    fn accumulate_custom_handles_all_empty_ranges() {
        // nunits=1, empty local range (zero-length array): returns init unchanged.
        let results = run_spmd(1, |t| {
            let team = Team::new(Arc::new(t), "test");
            let arr: Container<i64, 1> = Container::array(0, team.clone());
            accumulate_custom(arr.local_iter().map(|r| r.get()), 42, |a, b| a.max(b), &team)
        })
        .unwrap();
        assert_eq!(results, vec![42]);
    }

    #[test]
    fn accumulate_custom_applies_binop_across_units() {
        let results = run_spmd(3, |t| {
            let team = Team::new(Arc::new(t), "test");
            let arr: Container<i64, 1> = Container::array(9, team.clone());
            for i in 0..9i64 {
                let r = arr.at_index(i as usize);
                if r.is_local() {
                    r.set(i);
                }
            }
            arr.barrier();
            accumulate_custom(arr.local_iter().map(|r| r.get()), i64::MIN, |a, b| a.max(b), &team)
        })
        .unwrap();
        assert_eq!(results, vec![8, 8, 8]);
    }
}
