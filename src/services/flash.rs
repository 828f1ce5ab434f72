//! Transient user-facing notifications.
//!
//! Services push flashes into a `FlashSink`; the host UI drains them and
//! shows each one as a dismissable banner.

use serde::Serialize;
use std::sync::Mutex;

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Alert,
}

/// A single flash message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub message: String,
    pub level: FlashLevel,
}

impl Flash {
    pub fn alert(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: FlashLevel::Alert,
        }
    }
}

/// Receiver of flash messages.
pub trait FlashSink: Send + Sync {
    fn flash(&self, flash: Flash);
}

/// In-memory queue of flashes waiting to be shown.
#[derive(Debug, Default)]
pub struct FlashQueue {
    pending: Mutex<Vec<Flash>>,
}

impl FlashQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every queued flash, oldest first.
    pub fn drain(&self) -> Vec<Flash> {
        match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FlashSink for FlashQueue {
    fn flash(&self, flash: Flash) {
        log::debug!("[flash] {:?}: {}", flash.level, flash.message);
        match self.pending.lock() {
            Ok(mut pending) => pending.push(flash),
            Err(poisoned) => poisoned.into_inner().push(flash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_drains_in_order() {
        let queue = FlashQueue::new();
        queue.flash(Flash::alert("first"));
        queue.flash(Flash::alert("second"));
        assert_eq!(queue.len(), 2);

        let drained = queue.drain();
        assert_eq!(drained, vec![Flash::alert("first"), Flash::alert("second")]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_flash_serialization() {
        let json = serde_json::to_string(&Flash::alert("Oops")).unwrap();
        assert_eq!(json, r#"{"message":"Oops","level":"alert"}"#);
    }
}
