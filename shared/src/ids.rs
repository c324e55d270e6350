use uuid::Uuid;

/// Generates a short resource id of the form `{prefix}_{8 hex chars}`,
/// e.g. `camp_a1b2c3d4`.
pub fn new_id(prefix: &str) -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &uuid[..8])
}
