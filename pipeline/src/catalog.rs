//! Catalog-backed optimizer request assembly.
//!
//! The moment handler is written against [`CatalogProvider`] so the fixture
//! catalog below can be swapped for a real inventory/segment/creative lookup
//! without touching pipeline logic.

use crate::optimizer::{AllocationUnit, OptimizeRequest, UnitSignals};
use indexmap::IndexMap;
use shared::events::MomentDetected;
use std::collections::HashMap;

pub trait CatalogProvider: Send + Sync {
    fn build_request(&self, moment: &MomentDetected) -> OptimizeRequest;
}

const TOTAL_BUDGET: f64 = 100_000.0;
const EXPLORATION_RATIO: f64 = 0.08;
const OPERATOR_ID: &str = "broadcaster_demo";
const INVENTORY_OWNER_ID: &str = "club_demo";

const CHANNELS: &[&str] = &["meta", "dsp", "inapp"];
const SEGMENTS: &[&str] = &["seg_hardcore", "seg_casual"];
const CREATIVES: &[&str] = &["cr_upbeat", "cr_consoling"];

/// Fixed channel x segment x creative catalog. A stand-in for a warehouse /
/// CDP / creative-library lookup.
pub struct FixtureCatalog;

impl CatalogProvider for FixtureCatalog {
    fn build_request(&self, moment: &MomentDetected) -> OptimizeRequest {
        let moment_name = moment.moment.moment_type.as_str();

        let mut units = Vec::new();
        let mut signals = IndexMap::new();

        for &channel in CHANNELS {
            let owned = channel == "inapp";
            for &segment in SEGMENTS {
                for &creative in CREATIVES {
                    let unit = AllocationUnit {
                        channel: channel.to_string(),
                        campaign_id: "camp_1".to_string(),
                        segment_id: segment.to_string(),
                        moment: moment_name.to_string(),
                        creative_id: creative.to_string(),
                        offer_id: "off_merch".to_string(),
                        inventory_id: if owned { "inv_owned_app" } else { "inv_gam_home" }.to_string(),
                        inventory_type: if owned { "owned" } else { "gam" }.to_string(),
                        operator_id: OPERATOR_ID.to_string(),
                        inventory_owner_id: INVENTORY_OWNER_ID.to_string(),
                        rights_type: if owned { "owned" } else { "licensed" }.to_string(),
                        placement_ref: if owned { "slot_home_hero" } else { "gam_home_1" }.to_string(),
                        format_compatible: true,
                        category_allowed: true,
                    };
                    let key = unit
                        .key()
                        .encode()
                        .expect("fixture unit identity is complete");

                    let hardcore = segment == "seg_hardcore";
                    signals.insert(
                        key,
                        UnitSignals {
                            p_action: if hardcore { 0.08 } else { 0.04 },
                            ltv_uplift: if hardcore { 2200.0 } else { 1200.0 },
                            margin_rate: 0.35,
                            expected_cost_per_action: match channel {
                                "inapp" => 20.0,
                                "meta" => 45.0,
                                _ => 55.0,
                            },
                            max_spend: 30_000.0,
                            min_spend: 0.0,
                            fatigue_score: if creative == "cr_upbeat" { 0.2 } else { 0.1 },
                            freq_cap_ok: true,
                            brand_safe: true,
                            eligible: true,
                            incrementality: 1.0,
                        },
                    );
                    units.push(unit);
                }
            }
        }

        let multiplier = if moment_name == "team_success" { 1.6 } else { 1.2 };

        OptimizeRequest {
            total_budget: TOTAL_BUDGET,
            exploration_ratio: EXPLORATION_RATIO,
            units,
            signals,
            operator_id: OPERATOR_ID.to_string(),
            channel_min: HashMap::from([("inapp".to_string(), 10_000.0)]),
            channel_max: HashMap::from([("dsp".to_string(), 45_000.0)]),
            campaign_min: HashMap::new(),
            campaign_max: HashMap::new(),
            moment_multipliers: HashMap::from([(moment_name.to_string(), multiplier)]),
            previous_allocations: HashMap::new(),
            moment_spike_active: moment.moment.moment_type.is_spike(),
        }
    }
}
