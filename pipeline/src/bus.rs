//! In-process topic-based publish/subscribe.
//!
//! A stand-in for a real message broker. Delivery is at-most-once per
//! currently registered subscriber: there is no persistence or replay, and a
//! handler registered after a publish never sees that publish. Fan-out runs
//! handlers in registration order within the publishing task; a failing
//! handler is logged and does not stop fan-out or surface to the publisher.

use crate::PipelineError;
use crate::metrics_defs::{EVENTS_PUBLISHED, HANDLER_FAILURES};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use shared::counter;
use shared::events::Envelope;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: Envelope<Value>) -> Result<(), PipelineError>;
}

#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::default()
    }

    pub fn subscribe(&self, topic: &str, handler: Arc<dyn EventHandler>) {
        self.subscribers
            .write()
            .entry(topic.to_string())
            .or_default()
            .push(handler);
    }

    pub async fn publish(&self, topic: &str, event: Envelope<Value>) {
        // Snapshot the current subscriber list so the lock is not held
        // across handler awaits.
        let handlers: Vec<Arc<dyn EventHandler>> = self
            .subscribers
            .read()
            .get(topic)
            .cloned()
            .unwrap_or_default();

        counter!(EVENTS_PUBLISHED).increment(1);

        for handler in handlers {
            if let Err(err) = handler.handle(event.clone()).await {
                counter!(HANDLER_FAILURES).increment(1);
                tracing::error!(
                    topic,
                    handler = handler.name(),
                    event_id = %event.event_id,
                    error = %err,
                    "event handler failed"
                );
            }
        }
    }
}
