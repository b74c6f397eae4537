//! Pending buckets
//!
//! Every live routine sits in exactly one of four buckets. The timed bucket
//! is kept sorted by due time on every insert, with new entries placed after
//! existing ones due at the same time, so equal due times resume first-in
//! first-out and the queue is never re-sorted wholesale.

use crate::handle::RoutineHandle;
use routine_types::BucketKind;

struct TimedEntry {
    due_ms: u64,
    handle: RoutineHandle,
}

pub(crate) struct Buckets {
    next_tick: Vec<RoutineHandle>,
    timed: Vec<TimedEntry>,
    end_of_pass: Vec<RoutineHandle>,
    fixed_step: Vec<RoutineHandle>,
}

impl Buckets {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            next_tick: Vec::with_capacity(capacity),
            timed: Vec::with_capacity(capacity),
            end_of_pass: Vec::with_capacity(capacity),
            fixed_step: Vec::with_capacity(capacity),
        }
    }

    /// Place a routine that is not currently in any bucket
    pub(crate) fn insert(&mut self, handle: RoutineHandle, kind: BucketKind) {
        let record = handle.record();
        debug_assert!(record.bucket().is_none(), "routine already bucketed");
        record.set_bucket(Some(kind));

        match kind {
            BucketKind::Timed => {
                let due_ms = record.due_ms().unwrap_or(0);
                let at = self.timed.partition_point(|e| e.due_ms <= due_ms);
                self.timed.insert(at, TimedEntry { due_ms, handle });
            }
            other => self.list_mut(other).push(handle),
        }
    }

    /// Take a routine out of whichever bucket holds it
    pub(crate) fn remove(&mut self, handle: &RoutineHandle) -> Option<BucketKind> {
        let kind = handle.record().bucket()?;
        handle.record().set_bucket(None);

        match kind {
            BucketKind::Timed => {
                if let Some(at) = self.timed.iter().position(|e| e.handle.same_as(handle)) {
                    self.timed.remove(at);
                }
            }
            other => {
                let list = self.list_mut(other);
                if let Some(at) = list.iter().position(|h| h.same_as(handle)) {
                    list.remove(at);
                }
            }
        }
        Some(kind)
    }

    /// Move a routine into `kind`; a routine already there keeps its place
    pub(crate) fn relocate(&mut self, handle: &RoutineHandle, kind: BucketKind) -> bool {
        if handle.record().bucket() == Some(kind) {
            return false;
        }
        self.remove(handle);
        self.insert(handle.clone(), kind);
        true
    }

    /// Take a routine out and insert it again, behind every entry already
    /// due at the same time. Used for freshly started timers.
    pub(crate) fn requeue(&mut self, handle: &RoutineHandle, kind: BucketKind) {
        self.remove(handle);
        self.insert(handle.clone(), kind);
    }

    pub(crate) fn snapshot(&self, kind: BucketKind) -> Vec<RoutineHandle> {
        match kind {
            BucketKind::Timed => self.timed.iter().map(|e| e.handle.clone()).collect(),
            other => self.list(other).clone(),
        }
    }

    /// Every live routine, bucket by bucket
    pub(crate) fn all(&self) -> Vec<RoutineHandle> {
        BucketKind::ALL
            .iter()
            .flat_map(|kind| self.snapshot(*kind))
            .collect()
    }

    pub(crate) fn len(&self, kind: BucketKind) -> usize {
        match kind {
            BucketKind::Timed => self.timed.len(),
            other => self.list(other).len(),
        }
    }

    /// Earliest due time in the timed queue
    pub(crate) fn next_due_ms(&self) -> Option<u64> {
        self.timed.first().map(|e| e.due_ms)
    }

    /// Rewrite the order of an insertion-ordered bucket.
    ///
    /// `ordered` is a sorted snapshot; members that left the bucket since the
    /// snapshot are skipped and members that joined keep their place at the
    /// back. The timed bucket is never reordered.
    pub(crate) fn reorder(&mut self, kind: BucketKind, ordered: Vec<RoutineHandle>) {
        if kind == BucketKind::Timed {
            return;
        }
        let list = self.list_mut(kind);
        let mut rest = std::mem::take(list);
        let mut next = Vec::with_capacity(rest.len());
        for handle in ordered {
            if let Some(at) = rest.iter().position(|h| h.same_as(&handle)) {
                next.push(rest.remove(at));
            }
        }
        next.extend(rest);
        *list = next;
    }

    fn list(&self, kind: BucketKind) -> &Vec<RoutineHandle> {
        match kind {
            BucketKind::NextTick => &self.next_tick,
            BucketKind::EndOfPass => &self.end_of_pass,
            BucketKind::FixedStep => &self.fixed_step,
            BucketKind::Timed => unreachable!("timed bucket is not a plain list"),
        }
    }

    fn list_mut(&mut self, kind: BucketKind) -> &mut Vec<RoutineHandle> {
        match kind {
            BucketKind::NextTick => &mut self.next_tick,
            BucketKind::EndOfPass => &mut self.end_of_pass,
            BucketKind::FixedStep => &mut self.fixed_step,
            BucketKind::Timed => unreachable!("timed bucket is not a plain list"),
        }
    }
}
