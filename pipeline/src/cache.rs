//! Most-recent-wins store for pipeline result envelopes.
//!
//! Writes only come from the moment handler, which commits one run at a
//! time; readers are the polling endpoints. Each overwrite replaces the
//! slot wholesale. Nothing is persisted, the cache starts empty on boot.

use parking_lot::RwLock;
use serde_json::Value;
use shared::events::Envelope;
use std::collections::HashMap;

#[derive(Default)]
pub struct LatestResults {
    slots: RwLock<HashMap<String, Envelope<Value>>>,
}

impl LatestResults {
    pub fn new() -> Self {
        LatestResults::default()
    }

    pub fn get_latest(&self, topic: &str) -> Option<Envelope<Value>> {
        self.slots.read().get(topic).cloned()
    }

    pub fn set_latest(&self, topic: &str, envelope: Envelope<Value>) {
        self.slots.write().insert(topic.to_string(), envelope);
    }
}
