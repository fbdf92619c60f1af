//! Identity tokens and memoized binary operations.
//!
//! Solids and regions are immutable, so the result of combining two of them
//! never changes. Each one carries an [`Id`] and an [`OpCache`] remembering
//! what it was combined with and what came out.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, Weak,
    },
};

use crate::BinaryOp;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Identifies a solid or a region.
///
/// Ids are handed out in increasing order, so a value created from two
/// others always has a larger id than both of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(u64);

impl Id {
    /// A fresh id, different from every id handed out before.
    pub fn fresh() -> Id {
        Id(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

type Entries<T> = Mutex<HashMap<(BinaryOp, Id), Entry<T>>>;

#[derive(Debug)]
struct Entry<T> {
    // The other operand's cache: once that's gone, so is the other operand,
    // and nothing can ask for this entry again.
    other: Weak<Entries<T>>,
    result: T,
}

/// Results of binary operations, keyed by the operation and the id of the
/// other operand.
///
/// Entries don't keep the other operand alive. Entries whose other operand
/// has been dropped are cleared out whenever something new is remembered.
#[derive(Clone, Debug)]
pub struct OpCache<T> {
    entries: Arc<Entries<T>>,
}

impl<T> Default for OpCache<T> {
    fn default() -> Self {
        OpCache {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T: Clone> OpCache<T> {
    fn lock(&self) -> MutexGuard<'_, HashMap<(BinaryOp, Id), Entry<T>>> {
        // Entries are only ever inserted whole, so a panic while the lock was
        // held can't have left anything half-written.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The remembered result of `op` with `other`, if any.
    pub fn get(&self, op: BinaryOp, other: Id) -> Option<T> {
        self.lock().get(&(op, other)).map(|e| e.result.clone())
    }

    /// Remembers the result of `op` with `other`, whose id is `other_id` and
    /// whose cache is `other`.
    ///
    /// `result_ids` are the ids of everything in the result, and `newest`
    /// the larger of the two operands' ids. Results that reuse an operand (or
    /// anything older) aren't remembered: the operand would end up holding on
    /// to itself.
    pub fn insert(
        &self,
        op: BinaryOp,
        other: &OpCache<T>,
        other_id: Id,
        newest: Id,
        result_ids: impl IntoIterator<Item = Id>,
        result: &T,
    ) {
        if result_ids.into_iter().any(|id| id <= newest) {
            return;
        }
        let mut entries = self.lock();
        entries.retain(|_, e| e.other.strong_count() > 0);
        entries.insert(
            (op, other_id),
            Entry {
                other: Arc::downgrade(&other.entries),
                result: result.clone(),
            },
        );
    }

    /// The number of remembered results.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Is nothing remembered?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
