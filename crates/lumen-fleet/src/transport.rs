//! # Status Transport Seam
//!
//! Contract with the pub/sub transport collaborator (an MQTT broker in
//! the deployed system). The runtime only publishes scalar status
//! values; connection management is the collaborator's concern.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{FleetError, FleetResult};

// =============================================================================
// Transport Trait
// =============================================================================

/// Publish contract for periodic status emission.
#[async_trait]
pub trait StatusTransport: Send + Sync {
    /// Publishes one scalar payload on a topic.
    async fn publish(&self, topic: &str, payload: &str) -> FleetResult<()>;
}

// =============================================================================
// Log Transport
// =============================================================================

/// Transport that only logs publications. Used by the proxy binary when
/// no broker is wired up.
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl StatusTransport for LogTransport {
    async fn publish(&self, topic: &str, payload: &str) -> FleetResult<()> {
        debug!(%topic, %payload, "Status publish");
        Ok(())
    }
}

// =============================================================================
// Memory Transport (test double)
// =============================================================================

/// In-memory transport for tests: records publications and can be told
/// to fail.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    messages: std::sync::Mutex<Vec<(String, String)>>,
    fail_publishes: std::sync::atomic::AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// All (topic, payload) pairs published so far.
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().expect("messages lock").clone()
    }

    /// Payloads published on one topic.
    pub fn payloads_for(&self, topic: &str) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p)
            .collect()
    }

    /// Makes subsequent publishes fail.
    pub fn fail_publishes(&self, fail: bool) {
        self.fail_publishes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl StatusTransport for MemoryTransport {
    async fn publish(&self, topic: &str, payload: &str) -> FleetResult<()> {
        if self
            .fail_publishes
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Err(FleetError::PublishFailed {
                topic: topic.to_string(),
                reason: "memory transport set to fail".to_string(),
            });
        }

        self.messages
            .lock()
            .expect("messages lock")
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
