//! `LocalTransport` — the in-process, thread-per-unit reference collaborator for the one-sided
//! transport interface. Grounded directly on the teacher's `util::workers::WorkerGroup` /
//! `Monitor` (barrier + epoch counter) and `trace::distributed_node_objref`'s treatment of
//! "owner thread" as a stand-in for a distinct address space: each unit here is a real OS thread,
//! and a "remote" operation is a synchronized write/read into another thread's buffer rather than
//! a network transfer.
//!
//! The teacher reaches for `crossbeam::channel` for this kind of per-thread mailbox; here the
//! rendezvous points are collective (every unit always participates, in the same order), which a
//! plain `std::sync::Barrier` expresses more directly than an MPSC channel would.
//!
//! Per-unit storage uses `Mutex<Vec<u8>>` (the same shape as the teacher's `wp::LocalQueue`'s
//! `Mutex<Vec<T>>`) rather than raw shared memory. A production one-sided transport would use
//! unsynchronized memory plus hardware fences instead, which a real cluster interconnect provides
//! and an in-process stand-in cannot. The mutex only buys memory safety; the *logical*
//! weak-visibility contract (writes are not observable until `flush`/`barrier`) is enforced
//! independently by the pending-write queue below, without any cross-unit locking on the happy
//! path.

use crate::addr::{RawGlobalPtr, SegmentId, UnitId};
use crate::error::TransportError;
use crate::handle::{Handle, PendingQueue, PendingWrite};
use crate::reduce::{combine_bytes, ReduceOp};
use crate::{DataType, Transport};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier, Mutex};

struct Segment {
    buffers: Vec<Mutex<Vec<u8>>>,
    pending: Vec<Mutex<PendingQueue>>,
}

impl Segment {
    fn new(local_sizes: &[usize]) -> Self {
        Segment {
            buffers: local_sizes.iter().map(|&n| Mutex::new(vec![0u8; n])).collect(),
            pending: (0..local_sizes.len()).map(|_| Mutex::new(PendingQueue::default())).collect(),
        }
    }
}

/// A barrier-guarded all-to-all gather: every unit contributes one `T`, every unit receives the
/// full `Vec<T>` indexed by unit id.
struct CollectiveChannel<T> {
    barrier: Barrier,
    slots: Mutex<Vec<Option<T>>>,
}

impl<T: Clone> CollectiveChannel<T> {
    fn new(nunits: usize) -> Self {
        CollectiveChannel {
            barrier: Barrier::new(nunits),
            slots: Mutex::new(vec![None; nunits]),
        }
    }

    fn gather(&self, myid: UnitId, value: T) -> Vec<T> {
        self.slots.lock().unwrap()[myid] = Some(value);
        self.barrier.wait();
        let result: Vec<T> = self
            .slots
            .lock()
            .unwrap()
            .iter()
            .map(|slot| slot.clone().expect("every unit contributes before the gather barrier"))
            .collect();
        let r = self.barrier.wait();
        if r.is_leader() {
            for slot in self.slots.lock().unwrap().iter_mut() {
                *slot = None;
            }
        }
        result
    }
}

/// A barrier-guarded single-writer rendezvous: exactly one (arbitrary) unit computes a value,
/// every unit reads the same result back.
struct RendezvousChannel<T> {
    barrier: Barrier,
    slot: Mutex<Option<T>>,
}

impl<T: Clone> RendezvousChannel<T> {
    fn new(nunits: usize) -> Self {
        RendezvousChannel {
            barrier: Barrier::new(nunits),
            slot: Mutex::new(None),
        }
    }

    fn elect<F: FnOnce() -> T>(&self, compute: F) -> T {
        let r1 = self.barrier.wait();
        if r1.is_leader() {
            *self.slot.lock().unwrap() = Some(compute());
        }
        self.barrier.wait();
        let value = self
            .slot
            .lock()
            .unwrap()
            .clone()
            .expect("elected unit published before the second barrier");
        let r3 = self.barrier.wait();
        if r3.is_leader() {
            *self.slot.lock().unwrap() = None;
        }
        value
    }
}

struct Shared {
    nunits: usize,
    team_barrier: Barrier,
    segments: Mutex<HashMap<SegmentId, Arc<Segment>>>,
    next_segment_id: AtomicU64,
    alloc_gather: CollectiveChannel<usize>,
    alloc_rendezvous: RendezvousChannel<SegmentId>,
    reduce_gather: CollectiveChannel<Vec<u8>>,
}

/// Per-unit handle onto the shared, in-process "cluster". Construct a set of these with
/// [`run_spmd`], one per simulated unit.
pub struct LocalTransport {
    shared: Arc<Shared>,
    myid: UnitId,
}

impl LocalTransport {
    fn segment(&self, id: SegmentId) -> Arc<Segment> {
        self.shared
            .segments
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| panic!("segment {id} is not live on unit {}", self.myid))
    }

    fn write_into(&self, seg: &Segment, unit: UnitId, offset: usize, bytes: &[u8]) {
        let mut buf = seg.buffers[unit].lock().unwrap();
        let end = offset + bytes.len();
        assert!(
            end <= buf.len(),
            "write [{offset}, {end}) out of bounds for unit {unit}'s {}-byte local segment",
            buf.len()
        );
        buf[offset..end].copy_from_slice(bytes);
    }

    fn read_from(&self, seg: &Segment, unit: UnitId, offset: usize, nbytes: usize) -> Vec<u8> {
        let buf = seg.buffers[unit].lock().unwrap();
        let end = offset + nbytes;
        assert!(
            end <= buf.len(),
            "read [{offset}, {end}) out of bounds for unit {unit}'s {}-byte local segment",
            buf.len()
        );
        buf[offset..end].to_vec()
    }
}

impl Transport for LocalTransport {
    fn nunits(&self) -> usize {
        self.shared.nunits
    }

    fn myid(&self) -> UnitId {
        self.myid
    }

    fn team_memalloc_aligned(&self, bytes: usize, _align: usize) -> RawGlobalPtr {
        let sizes = self.shared.alloc_gather.gather(self.myid, bytes);
        let segment_id = self.shared.alloc_rendezvous.elect(|| {
            let id = self.shared.next_segment_id.fetch_add(1, Ordering::SeqCst);
            let seg = Arc::new(Segment::new(&sizes));
            self.shared.segments.lock().unwrap().insert(id, seg);
            log::debug!("team_memalloc_aligned: segment {id} created, per-unit sizes {sizes:?}");
            id
        });
        RawGlobalPtr {
            segment: segment_id,
            unit: 0,
            offset: 0,
        }
    }

    fn team_memfree(&self, seg: SegmentId) {
        self.shared.team_barrier.wait();
        if self.myid == 0 {
            self.shared.segments.lock().unwrap().remove(&seg);
            log::debug!("team_memfree: segment {seg} released");
        }
        self.shared.team_barrier.wait();
    }

    fn put_blocking_local(&self, dst: RawGlobalPtr, src: &[u8]) {
        let seg = self.segment(dst.segment);
        if dst.unit == self.myid {
            self.write_into(&seg, dst.unit, dst.offset, src);
        } else {
            seg.pending[dst.unit].lock().unwrap().push(PendingWrite {
                offset: dst.offset,
                bytes: src.to_vec(),
            });
        }
    }

    fn get_blocking(&self, dst: &mut [u8], src: RawGlobalPtr) {
        let seg = self.segment(src.segment);
        let data = self.read_from(&seg, src.unit, src.offset, dst.len());
        dst.copy_from_slice(&data);
    }

    fn put(&self, dst: RawGlobalPtr, src: &[u8]) -> Handle {
        self.put_blocking_local(dst, src);
        Handle::ready(None)
    }

    fn get_handle(&self, src: RawGlobalPtr, nbytes: usize) -> Handle {
        let mut buf = vec![0u8; nbytes];
        self.get_blocking(&mut buf, src);
        Handle::ready(Some(buf))
    }

    fn test_local(&self, handle: &Handle) -> bool {
        handle.test_local()
    }

    fn wait(&self, handle: Handle) -> Option<Vec<u8>> {
        handle.wait()
    }

    fn flush(&self, seg: SegmentId, target: UnitId) {
        let seg = self.segment(seg);
        let writes = seg.pending[target].lock().unwrap().drain();
        let n = writes.len();
        for write in writes {
            self.write_into(&seg, target, write.offset, &write.bytes);
        }
        if n > 0 {
            log::trace!("flush: applied {n} pending write(s) to unit {target}");
        }
    }

    fn barrier(&self) {
        // Drain our own inbox before the rendezvous so that, by the time every unit has passed
        // the barrier, every write queued against any unit's memory prior to entry is visible.
        if let Ok(segments) = self.shared.segments.lock() {
            for seg in segments.values() {
                let writes = seg.pending[self.myid].lock().unwrap().drain();
                for write in writes {
                    self.write_into(seg, self.myid, write.offset, &write.bytes);
                }
            }
        }
        self.shared.team_barrier.wait();
    }

    fn allreduce(&self, send: &[u8], dtype: DataType, op: ReduceOp) -> Vec<u8> {
        let contributions = self.shared.reduce_gather.gather(self.myid, send.to_vec());
        let mut iter = contributions.into_iter();
        let mut acc = iter.next().expect("allreduce requires at least one unit");
        for next in iter {
            acc = combine_bytes(op, dtype, &acc, &next);
        }
        acc
    }
}

/// Spawn `nunits` threads, each running `body` with its own [`LocalTransport`] handle bound to a
/// distinct unit id, and collect their results in unit order. This is the SPMD entry point: the
/// same `body` runs on every simulated unit, exactly as the same program text runs on every real
/// process in a PGAS job.
///
/// With the `single_thread` feature enabled, `nunits` is forced to 1 regardless of the requested
/// value, mirroring the teacher's own debugging feature flag of the same name.
pub fn run_spmd<F, R>(nunits: usize, body: F) -> Result<Vec<R>, TransportError>
where
    F: Fn(LocalTransport) -> R + Send + Sync + 'static,
    R: Send + 'static,
{
    #[cfg(feature = "single_thread")]
    let nunits = 1;

    if nunits == 0 {
        return Err(TransportError::ClusterSetup {
            requested: nunits,
            reason: "a team must contain at least one unit".to_string(),
        });
    }
    let shared = Arc::new(Shared {
        nunits,
        team_barrier: Barrier::new(nunits),
        segments: Mutex::new(HashMap::new()),
        next_segment_id: AtomicU64::new(0),
        alloc_gather: CollectiveChannel::new(nunits),
        alloc_rendezvous: RendezvousChannel::new(nunits),
        reduce_gather: CollectiveChannel::new(nunits),
    });
    let body = Arc::new(body);
    log::info!("run_spmd: starting {nunits} unit(s)");
    let handles: Vec<_> = (0..nunits)
        .map(|myid| {
            let shared = shared.clone();
            let body = body.clone();
            std::thread::Builder::new()
                .name(format!("pgas-unit-{myid}"))
                .spawn(move || body(LocalTransport { shared, myid }))
                .expect("failed to spawn unit thread")
        })
        .collect();
    let results = handles
        .into_iter()
        .map(|h| h.join().expect("unit thread panicked"))
        .collect();
    log::info!("run_spmd: all {nunits} unit(s) finished");
    Ok(results)
}
