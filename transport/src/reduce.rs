//! Native reduction operators plus the custom type/op registry (`type_create_custom`,
//! `op_create`, `op_destroy`, `type_destroy`).

use crate::addr::DataType;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    Sum,
    Product,
    Min,
    Max,
    LogicalAnd,
    LogicalOr,
    BitAnd,
    BitOr,
    BitXor,
    Custom(u32),
}

type CustomCombine = dyn Fn(&[u8], &[u8]) -> Vec<u8> + Send + Sync;

static NEXT_CUSTOM_ID: AtomicU32 = AtomicU32::new(0);
static CUSTOM_OPS: Lazy<Mutex<Vec<(u32, Box<CustomCombine>)>>> = Lazy::new(|| Mutex::new(Vec::new()));
static CUSTOM_TYPES: Lazy<Mutex<Vec<u32>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// `type_create_custom` — register an opaque, non-primitive element type. Returns the id to use
/// with `DataType::Custom`.
pub fn type_create_custom() -> u32 {
    let id = NEXT_CUSTOM_ID.fetch_add(1, Ordering::SeqCst);
    CUSTOM_TYPES.lock().unwrap().push(id);
    id
}

/// `type_destroy` — release a custom type id. Safe to call even if never created; mirrors the
/// transport's "fatal on genuine misuse, inert on redundant teardown" style.
pub fn type_destroy(id: u32) {
    CUSTOM_TYPES.lock().unwrap().retain(|&t| t != id);
}

/// `op_create` — register a user-defined combine function, operating on raw byte payloads.
/// Returns the id to use with `ReduceOp::Custom`.
pub fn op_create<F>(combine: F) -> u32
where
    F: Fn(&[u8], &[u8]) -> Vec<u8> + Send + Sync + 'static,
{
    let id = NEXT_CUSTOM_ID.fetch_add(1, Ordering::SeqCst);
    CUSTOM_OPS.lock().unwrap().push((id, Box::new(combine)));
    id
}

/// `op_destroy` — release a custom op id.
pub fn op_destroy(id: u32) {
    CUSTOM_OPS.lock().unwrap().retain(|(o, _)| *o != id);
}

fn custom_combine(id: u32, a: &[u8], b: &[u8]) -> Vec<u8> {
    let ops = CUSTOM_OPS.lock().unwrap();
    let (_, f) = ops
        .iter()
        .find(|(o, _)| *o == id)
        .unwrap_or_else(|| panic!("op {id} was never registered via op_create"));
    f(a, b)
}

macro_rules! numeric_combine {
    ($ty:ty, $a:expr, $b:expr, $op:expr) => {{
        let x = <$ty>::from_ne_bytes($a.try_into().unwrap());
        let y = <$ty>::from_ne_bytes($b.try_into().unwrap());
        let r: $ty = match $op {
            ReduceOp::Sum => x + y,
            ReduceOp::Product => x * y,
            ReduceOp::Min => x.min(y),
            ReduceOp::Max => x.max(y),
            _ => unreachable!("non-numeric op reached numeric_combine"),
        };
        r.to_ne_bytes().to_vec()
    }};
}

/// Combine two elements of `dtype` with `op`. Used by the all-reduce fold; both the native path
/// (numeric primitive types) and the custom path (`ReduceOp::Custom` / `DataType::Custom`) are
/// supported.
pub fn combine_bytes(op: ReduceOp, dtype: DataType, a: &[u8], b: &[u8]) -> Vec<u8> {
    if let ReduceOp::Custom(id) = op {
        return custom_combine(id, a, b);
    }
    match dtype {
        DataType::I32 => numeric_combine_int::<i32>(op, a, b),
        DataType::I64 => numeric_combine_int::<i64>(op, a, b),
        DataType::U32 => numeric_combine_int::<u32>(op, a, b),
        DataType::U64 => numeric_combine_int::<u64>(op, a, b),
        DataType::F32 => numeric_combine!(f32, a, b, op),
        DataType::F64 => numeric_combine!(f64, a, b, op),
        DataType::Bool => {
            let x = a[0] != 0;
            let y = b[0] != 0;
            let r = match op {
                ReduceOp::LogicalAnd => x && y,
                ReduceOp::LogicalOr => x || y,
                _ => unreachable!("non-logical op reached bool combine"),
            };
            vec![r as u8]
        }
        DataType::Custom(_) => panic!("DataType::Custom requires ReduceOp::Custom"),
    }
}

fn numeric_combine_int<T>(op: ReduceOp, a: &[u8], b: &[u8]) -> Vec<u8>
where
    T: IntBits,
{
    T::combine(op, a, b)
}

trait IntBits: Sized {
    fn combine(op: ReduceOp, a: &[u8], b: &[u8]) -> Vec<u8>;
}

macro_rules! impl_int_bits {
    ($ty:ty) => {
        impl IntBits for $ty {
            fn combine(op: ReduceOp, a: &[u8], b: &[u8]) -> Vec<u8> {
                let x = <$ty>::from_ne_bytes(a.try_into().unwrap());
                let y = <$ty>::from_ne_bytes(b.try_into().unwrap());
                let r: $ty = match op {
                    ReduceOp::Sum => x.wrapping_add(y),
                    ReduceOp::Product => x.wrapping_mul(y),
                    ReduceOp::Min => x.min(y),
                    ReduceOp::Max => x.max(y),
                    ReduceOp::BitAnd => x & y,
                    ReduceOp::BitOr => x | y,
                    ReduceOp::BitXor => x ^ y,
                    _ => unreachable!("non-integer op reached int combine"),
                };
                r.to_ne_bytes().to_vec()
            }
        }
    };
}

impl_int_bits!(i32);
impl_int_bits!(i64);
impl_int_bits!(u32);
impl_int_bits!(u64);
