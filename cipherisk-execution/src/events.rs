//! Notification surface. The core queues events on the execution context;
//! whoever commits the transition hands them to an [`EventSink`].

use cipherisk_types::{short_hex, RiskEvent};
use std::sync::{Arc, Mutex};
use tracing::info;

pub trait EventSink: Send + Sync {
    fn notify(&self, event: &RiskEvent);
}

/// Writes every event to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn notify(&self, event: &RiskEvent) {
        match event {
            RiskEvent::PortfolioComputed {
                portfolio_id,
                result_id,
                submitter,
                risk_handle,
                health_handle,
            } => info!(
                topic = event.topic(),
                portfolio = %short_hex(portfolio_id),
                result_id,
                submitter = %short_hex(submitter),
                risk = %risk_handle,
                health = %health_handle,
                "event"
            ),
            other => info!(topic = other.topic(), payload = ?other, "event"),
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default, Clone)]
pub struct CapturingSink {
    events: Arc<Mutex<Vec<RiskEvent>>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RiskEvent> {
        self.events.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut g) = self.events.lock() {
            g.clear();
        }
    }
}

impl EventSink for CapturingSink {
    fn notify(&self, event: &RiskEvent) {
        if let Ok(mut g) = self.events.lock() {
            g.push(event.clone());
        }
    }
}
