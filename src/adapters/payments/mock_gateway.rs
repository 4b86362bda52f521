//! Mock payment gateway.
//!
//! Real gateway integrations are owned by the billing core; this adapter
//! exists so the refund flow and tests have a working PaymentGateway.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::domain::foundation::PaymentId;
use crate::ports::{PaymentError, PaymentGateway, PaymentRequest, PaymentResult, PaymentState};

/// In-memory PaymentGateway that completes every payment immediately.
#[derive(Default)]
pub struct MockPaymentGateway {
    payments: Mutex<HashMap<String, PaymentResult>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn initialize_payment(
        &self,
        _request: &PaymentRequest,
    ) -> Result<PaymentResult, PaymentError> {
        let reference = format!("mock-{}", Uuid::new_v4().simple());
        let result = PaymentResult {
            payment_id: PaymentId::new(),
            state: PaymentState::Completed,
            reference: reference.clone(),
        };

        self.payments
            .lock()
            .map_err(|_| PaymentError::GatewayUnreachable("lock poisoned".to_string()))?
            .insert(reference, result.clone());

        Ok(result)
    }

    async fn verify_payment(&self, reference: &str) -> Result<PaymentResult, PaymentError> {
        self.payments
            .lock()
            .map_err(|_| PaymentError::GatewayUnreachable("lock poisoned".to_string()))?
            .get(reference)
            .cloned()
            .ok_or_else(|| PaymentError::UnknownReference(reference.to_string()))
    }

    async fn reverse_payment(&self, reference: &str) -> Result<PaymentResult, PaymentError> {
        let mut payments = self
            .payments
            .lock()
            .map_err(|_| PaymentError::GatewayUnreachable("lock poisoned".to_string()))?;

        let result = payments
            .get_mut(reference)
            .ok_or_else(|| PaymentError::UnknownReference(reference.to_string()))?;
        result.state = PaymentState::Reversed;
        Ok(result.clone())
    }
}
