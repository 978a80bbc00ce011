use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{DownloadResult, Stats};

/// Append-only record of every completed download attempt, in completion order.
///
/// All appends are serialized behind a single lock. An entry is pushed in one step, so a poisoned
/// lock never exposes a partially written entry and is simply recovered.
///
/// Only the executor appends or clears entries:
/// ```compile_fail
/// # use geoeye_dl::History;
/// let history = History::default();
/// history.clear();
/// ```
#[derive(Debug, Default)]
pub struct History {
    entries: RwLock<Vec<DownloadResult>>,
}

impl History {
    pub(crate) fn push(&self, result: DownloadResult) {
        self.write().push(result);
    }

    /// A snapshot of all entries, oldest first.
    pub fn snapshot(&self) -> Vec<DownloadResult> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub(crate) fn clear(&self) {
        self.write().clear();
    }

    /// Summarize the current entries.
    pub fn stats(&self) -> Stats {
        Stats::from_results(&self.read())
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<DownloadResult>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<DownloadResult>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
