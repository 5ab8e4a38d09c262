//! Bounded in-memory log buffer.
//!
//! Writers never block: [`LogBuffer::try_push`] uses `try_lock` and drops the
//! record when the lock is already held, whether by a reader on another
//! thread or by the same thread re-entering the logging path while a guard is
//! alive. Readers use a normal blocking lock and copy records out before any
//! filtering, so the critical section stays short.

use super::record::{LogLevel, LogRecord};
use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, TryLockError};

/// Default number of records kept in memory.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Thread-safe FIFO ring of [`LogRecord`]s with a fixed capacity.
///
/// Cloning yields another handle to the same storage.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    records: Mutex<VecDeque<LogRecord>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl LogBuffer {
    /// Create a buffer holding at most `capacity` records (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Inner {
                records: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity,
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Maximum number of records retained.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Append a record without blocking.
    ///
    /// Returns `false` when the lock was contended and the record was
    /// discarded. Evicts the oldest record when full.
    pub fn try_push(&self, record: LogRecord) -> bool {
        let mut records = match self.inner.records.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        };
        if records.len() >= self.inner.capacity {
            records.pop_front();
        }
        records.push_back(record);
        true
    }

    /// Records discarded because the lock was contended.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Copy of the matching records, oldest first.
    ///
    /// `level` and `logger` match exactly. When `limit` is set only the last
    /// `limit` matches are returned; `Some(0)` means no limit, like `None`.
    pub fn query(
        &self,
        level: Option<LogLevel>,
        logger: Option<&str>,
        limit: Option<usize>,
    ) -> Vec<LogRecord> {
        let mut records: Vec<LogRecord> = self.snapshot();
        records.retain(|r| {
            level.is_none_or(|lvl| r.level == lvl) && logger.is_none_or(|name| r.logger == name)
        });
        if let Some(limit) = limit
            && limit > 0
            && records.len() > limit
        {
            let excess = records.len() - limit;
            records.drain(..excess);
        }
        records
    }

    /// Distinct logger names currently held, sorted.
    pub fn logger_names(&self) -> Vec<String> {
        let names: BTreeSet<String> = self.snapshot().into_iter().map(|r| r.logger).collect();
        names.into_iter().collect()
    }

    /// Remove every record.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when no records are held.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn snapshot(&self) -> Vec<LogRecord> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<LogRecord>> {
        self.inner.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` while holding the buffer lock.
    #[cfg(test)]
    pub(crate) fn while_locked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.lock();
        f()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
