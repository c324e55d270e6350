//! Event schema shared by the gateway and the allocation pipeline.
//!
//! Every message crossing the bus is wrapped in an [`Envelope`]. The envelope
//! version is pinned; bumping it is a wire-format change for every consumer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ENVELOPE_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub event_id: String,
    pub event_type: String,
    pub tenant_id: String,
    pub timestamp_utc: DateTime<Utc>,
    pub source: String,
    pub version: String,
    pub payload: T,
    /// Optimizer run correlation id, only present on result envelopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

impl<T> Envelope<T> {
    pub fn new(event_type: &str, tenant_id: &str, source: &str, payload: T) -> Self {
        Envelope {
            event_id: Uuid::new_v4().to_string(),
            event_type: event_type.to_string(),
            tenant_id: tenant_id.to_string(),
            timestamp_utc: Utc::now(),
            source: source.to_string(),
            version: ENVELOPE_VERSION.to_string(),
            payload,
            run_id: None,
        }
    }

    pub fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = Some(run_id.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    League,
    Playoffs,
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rivalry {
    Low,
    Med,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentType {
    PlayerSuccess,
    PlayerFailure,
    TeamSuccess,
    TeamFailure,
    TurningPoint,
}

impl MomentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MomentType::PlayerSuccess => "player_success",
            MomentType::PlayerFailure => "player_failure",
            MomentType::TeamSuccess => "team_success",
            MomentType::TeamFailure => "team_failure",
            MomentType::TurningPoint => "turning_point",
        }
    }

    /// High-salience moments allow the optimizer to reallocate aggressively.
    pub fn is_spike(&self) -> bool {
        matches!(self, MomentType::TeamSuccess | MomentType::TurningPoint)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonContext {
    pub tournament: String,
    pub stage: Stage,
    pub must_win: bool,
    pub points_pressure: f64,
    pub rivalry: Rivalry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveContext {
    pub clock: String,
    pub win_probability: f64,
    pub swing: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Moment {
    #[serde(rename = "type")]
    pub moment_type: MomentType,
    pub entity_id: String,
    pub intensity: f64,
    pub window_sec: u32,
}

/// A detected live-event trigger, e.g. a scoring play.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentDetected {
    pub match_id: String,
    pub sport: String,
    pub league: String,
    pub season_context: SeasonContext,
    pub live_context: LiveContext,
    pub moment: Moment,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_moment() -> MomentDetected {
        MomentDetected {
            match_id: "match_42".into(),
            sport: "football".into(),
            league: "premier".into(),
            season_context: SeasonContext {
                tournament: "league_cup".into(),
                stage: Stage::Playoffs,
                must_win: true,
                points_pressure: 0.8,
                rivalry: Rivalry::High,
            },
            live_context: LiveContext {
                clock: "87:12".into(),
                win_probability: 0.61,
                swing: 0.18,
            },
            moment: Moment {
                moment_type: MomentType::TeamSuccess,
                entity_id: "team_home".into(),
                intensity: 0.9,
                window_sec: 120,
            },
        }
    }

    #[test]
    fn envelope_defaults() {
        let env = Envelope::new("moment.detected", "club_1", "live-feed", sample_moment());
        assert_eq!(env.version, ENVELOPE_VERSION);
        assert_eq!(env.event_type, "moment.detected");
        assert!(env.run_id.is_none());
        assert!(!env.event_id.is_empty());
    }

    #[test]
    fn envelope_ids_are_unique() {
        let a = Envelope::new("t", "club_1", "test", ());
        let b = Envelope::new("t", "club_1", "test", ());
        assert_ne!(a.event_id, b.event_id);
    }

    #[test]
    fn moment_type_wire_names() {
        let json = serde_json::to_string(&MomentType::TurningPoint).unwrap();
        assert_eq!(json, "\"turning_point\"");
        let parsed: MomentType = serde_json::from_str("\"team_failure\"").unwrap();
        assert_eq!(parsed, MomentType::TeamFailure);
    }

    #[test]
    fn run_id_skipped_when_absent() {
        let env = Envelope::new("t", "club_1", "test", serde_json::json!({}));
        let value = serde_json::to_value(&env).unwrap();
        assert!(value.get("run_id").is_none());

        let tagged = env.with_run_id("run_7");
        let value = serde_json::to_value(&tagged).unwrap();
        assert_eq!(value["run_id"], "run_7");
    }

    #[test]
    fn moment_payload_round_trips() {
        let env = Envelope::new("moment.detected", "club_1", "live-feed", sample_moment());
        let json = serde_json::to_string(&env).unwrap();
        let back: Envelope<MomentDetected> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.payload.moment.moment_type, MomentType::TeamSuccess);
        assert_eq!(back.payload.season_context.stage, Stage::Playoffs);
    }
}
