use std::collections::HashMap;

use poise::serenity_prelude as serenity;
use serde::{Deserialize, Serialize};

/// Everything stored for one guild: a map of panel-id -> panel.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GuildEntry {
    #[serde(default)]
    pub panels: HashMap<String, Panel>,
}

/// A named ticket-intake surface within a guild.
///
/// Field names match the on-disk JSON produced by earlier releases
/// (`setores`, `customButtons`, ...), so existing config files load as-is.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    pub name: String,
    #[serde(default, rename = "setores")]
    pub sectors: Vec<Sector>,
    #[serde(default)]
    pub custom_buttons: Vec<CustomButton>,
    #[serde(default)]
    pub support_roles: Vec<String>,
    pub category_id: Option<String>,
    pub logs_channel_id: Option<String>,
}

impl Panel {
    pub fn new(name: impl Into<String>) -> Self {
        Panel {
            name: name.into(),
            ..Default::default()
        }
    }

    /// A panel can open tickets only once a category and at least one
    /// support role are configured.
    pub fn is_ready(&self) -> bool {
        self.category_id.is_some() && !self.support_roles.is_empty()
    }

    /// Support role ids parsed to serenity types (invalid entries skipped).
    pub fn support_role_ids(&self) -> Vec<serenity::RoleId> {
        self.support_roles
            .iter()
            .filter_map(|id| id.parse::<u64>().ok())
            .map(serenity::RoleId::new)
            .collect()
    }

    pub fn category_channel_id(&self) -> Option<serenity::ChannelId> {
        self.category_id
            .as_ref()
            .and_then(|id| id.parse::<u64>().ok())
            .map(serenity::ChannelId::new)
    }

    pub fn logs_channel(&self) -> Option<serenity::ChannelId> {
        self.logs_channel_id
            .as_ref()
            .and_then(|id| id.parse::<u64>().ok())
            .map(serenity::ChannelId::new)
    }
}

/// A category of inquiry offered in the panel's select menu.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Sector {
    pub name: String,
    pub description: String,
    pub emoji: Option<String>,
}

/// An extra open-ticket button on the panel message.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CustomButton {
    pub label: String,
    pub emoji: Option<String>,
    pub style: PanelButtonStyle,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PanelButtonStyle {
    #[default]
    Primary,
    Secondary,
    Success,
    Danger,
}

impl From<PanelButtonStyle> for serenity::ButtonStyle {
    fn from(style: PanelButtonStyle) -> Self {
        match style {
            PanelButtonStyle::Primary => serenity::ButtonStyle::Primary,
            PanelButtonStyle::Secondary => serenity::ButtonStyle::Secondary,
            PanelButtonStyle::Success => serenity::ButtonStyle::Success,
            PanelButtonStyle::Danger => serenity::ButtonStyle::Danger,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_ready_needs_category_and_role() {
        let mut panel = Panel::new("default");
        assert!(!panel.is_ready());

        panel.category_id = Some("123".to_string());
        assert!(!panel.is_ready());

        panel.support_roles.push("456".to_string());
        assert!(panel.is_ready());
    }

    #[test]
    fn panel_serializes_with_legacy_field_names() {
        let mut panel = Panel::new("default");
        panel.support_roles.push("1".to_string());
        panel.sectors.push(Sector {
            name: "Sales".to_string(),
            description: "Orders and payments".to_string(),
            emoji: None,
        });

        let value = serde_json::to_value(&panel).unwrap();
        assert!(value.get("setores").is_some());
        assert!(value.get("customButtons").is_some());
        assert!(value.get("supportRoles").is_some());
        assert!(value.get("categoryId").is_some());
    }

    #[test]
    fn invalid_role_ids_are_skipped() {
        let mut panel = Panel::new("default");
        panel.support_roles.push("not-a-number".to_string());
        panel.support_roles.push("789".to_string());
        assert_eq!(panel.support_role_ids(), vec![serenity::RoleId::new(789)]);
    }
}
