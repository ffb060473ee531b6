//! Upgrades legacy config documents to the current schema.
//!
//! Three on-disk generations exist:
//! - v1: flat `{ supportRoleId, categoryId, logsChannelId }` per guild
//! - v2: adds `setores[]`, `customButtons[]`, `supportRoles[]`
//! - v3: wraps everything under `panels: { <panelId>: {...} }`
//!
//! The current format adds an explicit top-level `version` field so future
//! upgrades can chain from a known point. Each step is a pure function on
//! the JSON value for one guild.

use serde_json::{json, Map, Value};

/// Schema version written by this build.
pub const SCHEMA_VERSION: u64 = 3;

/// Upgrade a whole parsed document to the current shape, returning the
/// per-guild map. Accepts the current versioned wrapper as well as any
/// legacy flat document whose top-level keys are guild ids.
pub fn upgrade(doc: Value) -> Map<String, Value> {
    let Value::Object(mut root) = doc else {
        return Map::new();
    };

    if root.contains_key("version") {
        return match root.remove("guilds") {
            Some(Value::Object(guilds)) => guilds,
            _ => Map::new(),
        };
    }

    root.into_iter()
        .map(|(guild_id, entry)| (guild_id, upgrade_guild(entry)))
        .collect()
}

/// Run one guild entry through the migration chain.
pub fn upgrade_guild(entry: Value) -> Value {
    if entry.get("panels").is_some() {
        return entry;
    }
    v2_to_v3(v1_to_v2(entry))
}

/// v1 -> v2: fold the single `supportRoleId` into `supportRoles[]` and
/// install the empty sector/button lists. Already-v2 entries pass through.
pub fn v1_to_v2(entry: Value) -> Value {
    let Value::Object(mut obj) = entry else {
        return json!({});
    };

    if !obj.contains_key("supportRoles") {
        let roles = match obj.get("supportRoleId").and_then(Value::as_str) {
            Some(id) => json!([id]),
            None => json!([]),
        };
        obj.insert("supportRoles".to_string(), roles);
    }
    obj.entry("setores").or_insert_with(|| json!([]));
    obj.entry("customButtons").or_insert_with(|| json!([]));

    Value::Object(obj)
}

/// v2 -> v3: wrap the flat fields into a synthetic panel named "default".
pub fn v2_to_v3(entry: Value) -> Value {
    let Value::Object(obj) = entry else {
        return json!({ "panels": {} });
    };

    json!({
        "panels": {
            "default": {
                "name": "default",
                "setores": obj.get("setores").cloned().unwrap_or_else(|| json!([])),
                "customButtons": obj.get("customButtons").cloned().unwrap_or_else(|| json!([])),
                "supportRoles": obj.get("supportRoles").cloned().unwrap_or_else(|| json!([])),
                "categoryId": obj.get("categoryId").cloned().unwrap_or(Value::Null),
                "logsChannelId": obj.get("logsChannelId").cloned().unwrap_or(Value::Null),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v1_entry() -> Value {
        json!({
            "supportRoleId": "111",
            "categoryId": "222",
            "logsChannelId": "333"
        })
    }

    #[test]
    fn test_v1_to_v2_folds_role() {
        let v2 = v1_to_v2(v1_entry());
        assert_eq!(v2["supportRoles"], json!(["111"]));
        assert_eq!(v2["setores"], json!([]));
        assert_eq!(v2["customButtons"], json!([]));
    }

    #[test]
    fn test_v1_to_v2_keeps_existing_roles() {
        let entry = json!({ "supportRoles": ["9"], "setores": [{"name": "x", "description": "y"}] });
        let v2 = v1_to_v2(entry);
        assert_eq!(v2["supportRoles"], json!(["9"]));
        assert_eq!(v2["setores"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_v2_to_v3_wraps_into_default_panel() {
        let v3 = v2_to_v3(v1_to_v2(v1_entry()));
        let panel = &v3["panels"]["default"];
        assert_eq!(panel["name"], "default");
        assert_eq!(panel["supportRoles"], json!(["111"]));
        assert_eq!(panel["categoryId"], "222");
        assert_eq!(panel["logsChannelId"], "333");
    }

    #[test]
    fn test_upgrade_guild_passes_v3_through() {
        let entry = json!({ "panels": { "vip": { "name": "VIP" } } });
        assert_eq!(upgrade_guild(entry.clone()), entry);
    }

    #[test]
    fn test_upgrade_legacy_document() {
        let doc = json!({
            "100": v1_entry(),
            "200": { "panels": { "default": { "name": "default" } } }
        });
        let guilds = upgrade(doc);
        assert!(guilds["100"]["panels"]["default"].is_object());
        assert!(guilds["200"]["panels"]["default"].is_object());
    }

    #[test]
    fn test_upgrade_is_idempotent() {
        let doc = json!({ "100": v1_entry() });
        let once = upgrade(doc);

        let wrapped = json!({ "version": SCHEMA_VERSION, "guilds": once.clone() });
        let twice = upgrade(wrapped);
        assert_eq!(Value::Object(once), Value::Object(twice));
    }
}
