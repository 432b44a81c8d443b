//! Callback registry
//!
//! Callbacks are invoked on the audio thread with no engine lock held, so a
//! callback may call back into the engine (including `stop()` or `play()`).

use crate::error::PlaybackError;
use std::sync::{Arc, Mutex, PoisonError};

/// Invoked once when a stream reaches its natural end
pub type FinishedCallback = Arc<dyn Fn() + Send + Sync>;

/// Invoked once per processed block with `(position_ms, duration_ms)`
pub type PositionCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Invoked when a session ends because of an error
pub type ErrorCallback = Arc<dyn Fn(&PlaybackError) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Callbacks {
    finished: Mutex<Option<FinishedCallback>>,
    position: Mutex<Option<PositionCallback>>,
    error: Mutex<Option<ErrorCallback>>,
}

/// Clone a callback out so it runs without the slot's lock held
fn current<T: Clone>(slot: &Mutex<Option<T>>) -> Option<T> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

fn replace<T>(slot: &Mutex<Option<T>>, callback: Option<T>) {
    *slot.lock().unwrap_or_else(PoisonError::into_inner) = callback;
}

impl Callbacks {
    pub(crate) fn set_finished(&self, callback: Option<FinishedCallback>) {
        replace(&self.finished, callback);
    }

    pub(crate) fn set_position(&self, callback: Option<PositionCallback>) {
        replace(&self.position, callback);
    }

    pub(crate) fn set_error(&self, callback: Option<ErrorCallback>) {
        replace(&self.error, callback);
    }

    pub(crate) fn finished(&self) {
        if let Some(callback) = current(&self.finished) {
            callback();
        }
    }

    pub(crate) fn position(&self, position_ms: u64, duration_ms: u64) {
        if let Some(callback) = current(&self.position) {
            callback(position_ms, duration_ms);
        }
    }

    pub(crate) fn error(&self, error: &PlaybackError) {
        if let Some(callback) = current(&self.error) {
            callback(error);
        }
    }
}
