//! Mock SMS sender for tests and local development.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::domain::foundation::PhoneNumber;
use crate::ports::{NotificationError, NotificationSender, SendReceipt};

/// One captured message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub body: String,
}

/// In-memory NotificationSender that records every message.
#[derive(Default)]
pub struct MockSmsSender {
    sent: Mutex<Vec<SentMessage>>,
    fail_next: AtomicBool,
}

impl MockSmsSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next send fail with a transport error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Everything sent so far.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSender for MockSmsSender {
    async fn send(
        &self,
        recipient: &PhoneNumber,
        body: &str,
    ) -> Result<SendReceipt, NotificationError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(NotificationError::GatewayUnreachable(
                "injected failure".to_string(),
            ));
        }

        let mut sent = self
            .sent
            .lock()
            .map_err(|_| NotificationError::GatewayUnreachable("lock poisoned".to_string()))?;
        sent.push(SentMessage {
            recipient: recipient.to_string(),
            body: body.to_string(),
        });

        Ok(SendReceipt {
            message_id: Some(format!("mock-{}", sent.len())),
        })
    }
}
