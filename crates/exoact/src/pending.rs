//! Remote invocations waiting for their reply.
//!
//! Every outbound parcel with a return path gets an invocation id from a
//! per-locality counter and an entry here. The reply pump completes entries
//! by id; an entry is removed on its first completion, so a second reply for
//! the same id finds nothing and is reported as a duplicate.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;

use neoparcel::GlobalAddress;

use crate::error::Error;
use crate::error::Result;

/// Delivers the raw outcome to the typed promise that waits for it.
pub(crate) type Deliver = Box<dyn FnOnce(Result<Vec<u8>>) + Send + Sync>;

struct PendingInvocation {
    action: &'static str,
    target: GlobalAddress,
    deliver: Deliver,
}

pub(crate) struct PendingTable {
    entries: DashMap<u64, PendingInvocation>,
    next: AtomicU64,
}

impl Default for PendingTable {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            next: AtomicU64::new(1),
        }
    }
}

impl PendingTable {
    /// Reserves a fresh invocation id.
    pub fn issue(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Records the waiter of an issued invocation, before its parcel is sent.
    pub fn insert(&self, id: u64, action: &'static str, target: GlobalAddress, deliver: Deliver) {
        self.entries.insert(id, PendingInvocation { action, target, deliver });
    }

    /// Hands the outcome of invocation `id` to its waiter.
    ///
    /// Fails with `DuplicateResult` if `id` was issued but already completed,
    /// and with `Decode` if it was never issued at all.
    pub fn complete(&self, id: u64, outcome: Result<Vec<u8>>) -> Result<()> {
        match self.entries.remove(&id) {
            Some((_, pending)) => {
                tracing::trace!(id, action = pending.action, target = %pending.target, "invocation completed");
                (pending.deliver)(outcome);
                Ok(())
            }
            None if id != 0 && id < self.next.load(Ordering::Relaxed) => Err(Error::DuplicateResult(id)),
            None => Err(Error::Decode(format!("reply names unissued invocation {}", id))),
        }
    }

    /// Fails one invocation that never made it onto the wire.
    pub fn fail(&self, id: u64, error: Error) {
        if let Some((_, pending)) = self.entries.remove(&id) {
            (pending.deliver)(Err(error));
        }
    }

    /// Fails every waiting invocation with `error`.
    pub fn fail_all(&self, error: Error) -> usize {
        let ids: Vec<u64> = self.entries.iter().map(|e| *e.key()).collect();
        let mut failed = 0;
        for id in ids {
            if let Some((_, pending)) = self.entries.remove(&id) {
                (pending.deliver)(Err(error.clone()));
                failed += 1;
            }
        }
        failed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use neoparcel::LocalityId;

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<Result<Vec<u8>>>>>, impl Fn() -> Deliver) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let make = move || -> Deliver {
            let sink = sink.clone();
            Box::new(move |outcome| sink.lock().unwrap().push(outcome))
        };
        (seen, make)
    }

    #[test]
    fn test_completes_exactly_once() {
        let table = PendingTable::default();
        let (seen, deliver) = recorder();
        let target = GlobalAddress::new(LocalityId(1), 5);

        let id = table.issue();
        table.insert(id, "test/op", target, deliver());
        assert_eq!(table.len(), 1);

        table.complete(id, Ok(vec![1])).unwrap();
        assert_eq!(table.complete(id, Ok(vec![2])), Err(Error::DuplicateResult(id)));

        assert_eq!(table.len(), 0);
        assert_eq!(*seen.lock().unwrap(), vec![Ok(vec![1])]);
    }

    #[test]
    fn test_unissued_id_is_not_a_duplicate() {
        let table = PendingTable::default();
        assert!(matches!(table.complete(77, Ok(vec![])), Err(Error::Decode(_))));
        assert!(matches!(table.complete(0, Ok(vec![])), Err(Error::Decode(_))));
    }

    #[test]
    fn test_fail_all_drains_table() {
        let table = PendingTable::default();
        let (seen, deliver) = recorder();
        let target = GlobalAddress::new(LocalityId(2), 1);

        let a = table.issue();
        let b = table.issue();
        table.insert(a, "test/a", target, deliver());
        table.insert(b, "test/b", target, deliver());
        assert_ne!(a, b);

        let error = Error::BrokenPromise;
        assert_eq!(table.fail_all(error.clone()), 2);
        assert_eq!(table.len(), 0);
        assert_eq!(*seen.lock().unwrap(), vec![Err(error.clone()), Err(error)]);

        // late replies for drained ids are duplicates
        assert_eq!(table.complete(a, Ok(vec![])), Err(Error::DuplicateResult(a)));
    }
}
