//! Per-controller UI state primitives.
//!
//! * [`StateCell`] holds a controller's state and hands out snapshots.
//! * [`SingleFlight`] rejects a second action while one is still running.
//! * [`CopyFeedback`] keeps "copied" indicators that clear themselves.

use crate::error::ToolError;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Interior-mutable state with cloned snapshots.
#[derive(Debug, Default)]
pub struct StateCell<S> {
    inner: Mutex<S>,
}

impl<S: Clone> StateCell<S> {
    pub fn new(state: S) -> Self {
        Self {
            inner: Mutex::new(state),
        }
    }

    pub fn get(&self) -> S {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

/// Cooperative single-flight guard.
///
/// The first caller of [`SingleFlight::begin`] gets a [`FlightGuard`]; until
/// it is dropped every further call fails with [`ToolError::Busy`].
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    busy: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Result<FlightGuard, ToolError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ToolError::Busy)?;
        Ok(FlightGuard {
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases its [`SingleFlight`] when dropped.
#[derive(Debug)]
pub struct FlightGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Self-clearing "copied" indicators, one per key.
///
/// Marking a key sets it and schedules its reset after `hold`. Marking it
/// again before then re-arms the timer; the older timer finds a newer
/// generation and leaves the mark alone.
#[derive(Debug, Clone)]
pub struct CopyFeedback<K> {
    marks: Arc<Mutex<HashMap<K, u64>>>,
    generation: Arc<AtomicU64>,
    hold: Duration,
}

impl<K> CopyFeedback<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    pub fn new(hold: Duration) -> Self {
        Self {
            marks: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
            hold,
        }
    }

    /// Set the indicator for `key`. Must be called inside a tokio runtime.
    pub fn mark(&self, key: K) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.marks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.clone(), generation);

        let marks = Arc::clone(&self.marks);
        let hold = self.hold;
        tokio::spawn(async move {
            tokio::time::sleep(hold).await;
            let mut marks = marks.lock().unwrap_or_else(|e| e.into_inner());
            if marks.get(&key) == Some(&generation) {
                marks.remove(&key);
            }
        });
    }

    pub fn is_marked(&self, key: &K) -> bool {
        self.marks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    /// Clear every indicator now. Pending timers become no-ops.
    pub fn clear(&self) {
        self.marks.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
