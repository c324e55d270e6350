//! Composite-key codec for allocation units.
//!
//! The optimizer addresses each allocation unit by a single delimited string
//! so its output maps can be correlated back to unit identities. The
//! delimiter is assumed not to occur in any field value.

use serde::{Deserialize, Serialize};

pub const KEY_DELIMITER: char = '|';

/// The 7-field identity of an allocation unit.
///
/// `inventory_id` was added after the key format shipped, so it is the only
/// optional field: encoding omits it when empty and decoding tolerates keys
/// with fewer than seven parts by filling trailing fields with empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitKey {
    pub channel: String,
    pub campaign_id: String,
    pub segment_id: String,
    pub moment: String,
    pub creative_id: String,
    pub offer_id: String,
    #[serde(default)]
    pub inventory_id: String,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum KeyError {
    #[error("missing key field: {0}")]
    MissingField(&'static str),
}

impl UnitKey {
    pub fn encode(&self) -> Result<String, KeyError> {
        let mandatory = [
            ("channel", &self.channel),
            ("campaign_id", &self.campaign_id),
            ("segment_id", &self.segment_id),
            ("moment", &self.moment),
            ("creative_id", &self.creative_id),
            ("offer_id", &self.offer_id),
        ];
        for (name, value) in mandatory {
            if value.is_empty() {
                return Err(KeyError::MissingField(name));
            }
        }

        let d = KEY_DELIMITER;
        let base = format!(
            "{}{d}{}{d}{}{d}{}{d}{}{d}{}",
            self.channel,
            self.campaign_id,
            self.segment_id,
            self.moment,
            self.creative_id,
            self.offer_id,
        );
        if self.inventory_id.is_empty() {
            Ok(base)
        } else {
            Ok(format!("{base}{d}{}", self.inventory_id))
        }
    }

    /// Decodes a composite key. Short keys (produced before the inventory
    /// dimension existed) decode with empty trailing fields instead of
    /// erroring.
    pub fn decode(key: &str) -> UnitKey {
        let mut parts = key.split(KEY_DELIMITER);
        let mut next = || parts.next().unwrap_or("").to_string();
        UnitKey {
            channel: next(),
            campaign_id: next(),
            segment_id: next(),
            moment: next(),
            creative_id: next(),
            offer_id: next(),
            inventory_id: next(),
        }
    }
}
