//! Completion notifications
//!
//! When a join closes a room, every participant with a contact address gets
//! told the group purchase completed. Delivery runs as a fire-and-forget
//! effect after the closing state change has committed; a delivery failure
//! is logged and never rolls the close back.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Boxed future returned by notifier implementations
pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>>;

/// Delivery failure, carried for logging only
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// What participants are told when their room closes successfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionNotice {
    /// Display name of the purchased product
    pub product_name: String,
    /// Contact addresses of participants who have one
    pub recipients: Vec<String>,
}

/// Delivery channel for completion notices
///
/// Object safe so the environment can hold `Arc<dyn CompletionNotifier>`;
/// implementations return a boxed future instead of using `async fn`.
pub trait CompletionNotifier: Send + Sync {
    /// Deliver a notice to all recipients
    fn notify(&self, notice: CompletionNotice) -> NotifyFuture<'_>;
}

/// Notifier that only logs, for the demo and local runs
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

impl CompletionNotifier for LoggingNotifier {
    fn notify(&self, notice: CompletionNotice) -> NotifyFuture<'_> {
        Box::pin(async move {
            tracing::info!(
                product = %notice.product_name,
                recipients = notice.recipients.len(),
                "group purchase completed"
            );
            Ok(())
        })
    }
}

/// Notifier that records every notice, for tests
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<CompletionNotice>>,
}

impl RecordingNotifier {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices delivered so far
    #[must_use]
    pub fn sent(&self) -> Vec<CompletionNotice> {
        #[allow(clippy::unwrap_used)]
        let sent = self.sent.lock().unwrap();
        sent.clone()
    }
}

impl CompletionNotifier for RecordingNotifier {
    fn notify(&self, notice: CompletionNotice) -> NotifyFuture<'_> {
        Box::pin(async move {
            #[allow(clippy::unwrap_used)]
            let mut sent = self.sent.lock().unwrap();
            sent.push(notice);
            Ok(())
        })
    }
}

/// Notifier whose deliveries always fail, for tests of the forget half of
/// fire-and-forget
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingNotifier;

impl CompletionNotifier for FailingNotifier {
    fn notify(&self, _notice: CompletionNotice) -> NotifyFuture<'_> {
        Box::pin(async { Err(NotifyError("delivery channel down".to_owned())) })
    }
}
