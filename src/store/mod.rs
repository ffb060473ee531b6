//! Persistent configuration store plus the ephemeral per-process state
//! (panel selections, open-ticket records).
//!
//! The guild map mirrors a single pretty-printed JSON file. Reads and
//! writes go through one mutex so overlapping handlers cannot interleave
//! read-modify-write cycles on a guild record; every successful mutation
//! rewrites the whole file while the lock is held. Save failures are
//! logged and otherwise ignored.

pub mod migrate;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::models::panel::{CustomButton, GuildEntry, Panel, Sector};
use crate::utils::sanitize;

/// On-disk wrapper, see [`migrate`] for the legacy shapes.
#[derive(Debug, Serialize, Deserialize)]
struct Document {
    version: u64,
    guilds: HashMap<String, GuildEntry>,
}

/// Domain errors surfaced to the invoking user as ephemeral replies.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("A panel with id `{0}` already exists.")]
    PanelExists(String),
    #[error("Panel `{0}` was not found.")]
    PanelNotFound(String),
    #[error("No panel selected. Use `/panel select` first.")]
    NoSelection,
    #[error("That name produces an empty panel id. Pick a name with letters or digits.")]
    EmptyPanelName,
    #[error("`{0}` is already configured on this panel.")]
    AlreadyConfigured(String),
    #[error("`{0}` is not configured on this panel.")]
    NotConfigured(String),
}

/// Lifecycle slot for one user's ticket in one guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketRecord {
    /// Reserved before the remote channel-create call completes.
    Creating,
    Open(serenity::ChannelId),
}

type MemberKey = (serenity::GuildId, serenity::UserId);

#[derive(Debug)]
pub struct TicketStore {
    path: PathBuf,
    guilds: Mutex<HashMap<String, GuildEntry>>,
    /// (guild, user) -> selected panel id. Process-memory only.
    selections: DashMap<MemberKey, String>,
    /// (guild, user) -> ticket record. Process-memory only; this map is
    /// the duplicate-ticket check, inserted before the channel exists.
    open_tickets: DashMap<MemberKey, TicketRecord>,
}

impl TicketStore {
    /// Read the config file, migrating legacy shapes in place. A missing
    /// file initializes an empty document and writes it out; a parse
    /// failure degrades to an empty in-memory config.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let (guilds, rewrite) = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(doc) => {
                    let mut guilds = HashMap::new();
                    for (guild_id, entry) in migrate::upgrade(doc) {
                        match serde_json::from_value::<GuildEntry>(entry) {
                            Ok(parsed) => {
                                guilds.insert(guild_id, parsed);
                            }
                            Err(e) => {
                                warn!("Skipping malformed entry for guild {}: {}", guild_id, e);
                            }
                        }
                    }
                    info!("Loaded config for {} guild(s) from {}", guilds.len(), path.display());
                    (guilds, true)
                }
                Err(e) => {
                    // Keep the broken file on disk for inspection
                    error!("Failed to parse {}: {}", path.display(), e);
                    (HashMap::new(), false)
                }
            },
            Err(_) => {
                info!("No config file at {}, creating one", path.display());
                (HashMap::new(), true)
            }
        };

        let store = TicketStore {
            path,
            guilds: Mutex::new(guilds),
            selections: DashMap::new(),
            open_tickets: DashMap::new(),
        };

        // Normalizes legacy files and creates missing ones
        if rewrite {
            store.save(&store.guilds.lock().expect("store lock poisoned"));
        }
        store
    }

    fn save(&self, guilds: &HashMap<String, GuildEntry>) {
        let doc = Document {
            version: migrate::SCHEMA_VERSION,
            guilds: guilds.clone(),
        };
        let serialized = match serde_json::to_string_pretty(&doc) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to serialize config: {}", e);
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, serialized) {
            error!("Failed to write {}: {}", self.path.display(), e);
        }
    }

    // --- Panel registry ---

    pub fn get_panel(&self, guild: serenity::GuildId, id: &str) -> Option<Panel> {
        let guilds = self.guilds.lock().expect("store lock poisoned");
        guilds
            .get(&guild.to_string())
            .and_then(|entry| entry.panels.get(id))
            .cloned()
    }

    /// All panels of a guild, sorted by id.
    pub fn panels(&self, guild: serenity::GuildId) -> Vec<(String, Panel)> {
        let guilds = self.guilds.lock().expect("store lock poisoned");
        let mut panels: Vec<_> = guilds
            .get(&guild.to_string())
            .map(|entry| {
                entry
                    .panels
                    .iter()
                    .map(|(id, p)| (id.clone(), p.clone()))
                    .collect()
            })
            .unwrap_or_default();
        panels.sort_by(|a, b| a.0.cmp(&b.0));
        panels
    }

    /// Install an empty panel and auto-select it for the creating user.
    /// The id derives deterministically from the name; a collision rejects
    /// the new panel.
    pub fn create_panel(
        &self,
        guild: serenity::GuildId,
        user: serenity::UserId,
        name: &str,
    ) -> Result<String, StoreError> {
        let id = sanitize::panel_id(name);
        if id.is_empty() {
            return Err(StoreError::EmptyPanelName);
        }

        {
            let mut guilds = self.guilds.lock().expect("store lock poisoned");
            let entry = guilds.entry(guild.to_string()).or_default();
            if entry.panels.contains_key(&id) {
                return Err(StoreError::PanelExists(id));
            }
            entry.panels.insert(id.clone(), Panel::new(name));
            self.save(&guilds);
        }

        self.selections.insert((guild, user), id.clone());
        Ok(id)
    }

    /// Remove a panel and invalidate every selection pointing at it.
    pub fn delete_panel(&self, guild: serenity::GuildId, id: &str) -> Result<(), StoreError> {
        {
            let mut guilds = self.guilds.lock().expect("store lock poisoned");
            let entry = guilds
                .get_mut(&guild.to_string())
                .ok_or_else(|| StoreError::PanelNotFound(id.to_string()))?;
            if entry.panels.remove(id).is_none() {
                return Err(StoreError::PanelNotFound(id.to_string()));
            }
            self.save(&guilds);
        }

        self.selections
            .retain(|(g, _), selected| *g != guild || selected != id);
        Ok(())
    }

    // --- Session context ---

    pub fn select_panel(
        &self,
        guild: serenity::GuildId,
        user: serenity::UserId,
        id: &str,
    ) -> Result<(), StoreError> {
        if self.get_panel(guild, id).is_none() {
            return Err(StoreError::PanelNotFound(id.to_string()));
        }
        self.selections.insert((guild, user), id.to_string());
        Ok(())
    }

    /// Resolve which panel a panel-scoped command targets: the explicit
    /// argument wins, otherwise the invoker's session selection. A stale
    /// selection (panel deleted meanwhile) is dropped and forces a
    /// re-select.
    pub fn resolve_panel(
        &self,
        guild: serenity::GuildId,
        user: serenity::UserId,
        explicit: Option<&str>,
    ) -> Result<(String, Panel), StoreError> {
        if let Some(name) = explicit {
            let id = sanitize::panel_id(name);
            let panel = self
                .get_panel(guild, &id)
                .ok_or(StoreError::PanelNotFound(id.clone()))?;
            return Ok((id, panel));
        }

        let id = self
            .selections
            .get(&(guild, user))
            .map(|sel| sel.value().clone())
            .ok_or(StoreError::NoSelection)?;

        match self.get_panel(guild, &id) {
            Some(panel) => Ok((id, panel)),
            None => {
                self.selections.remove(&(guild, user));
                Err(StoreError::NoSelection)
            }
        }
    }

    // --- Panel field mutations (each persists on success) ---

    fn mutate_panel<F>(
        &self,
        guild: serenity::GuildId,
        id: &str,
        mutation: F,
    ) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Panel) -> Result<(), StoreError>,
    {
        let mut guilds = self.guilds.lock().expect("store lock poisoned");
        let panel = guilds
            .get_mut(&guild.to_string())
            .and_then(|entry| entry.panels.get_mut(id))
            .ok_or_else(|| StoreError::PanelNotFound(id.to_string()))?;
        mutation(panel)?;
        self.save(&guilds);
        Ok(())
    }

    /// The one-shot `/panel setup`: category plus first support role.
    pub fn setup_panel(
        &self,
        guild: serenity::GuildId,
        id: &str,
        role_id: String,
        category_id: String,
    ) -> Result<(), StoreError> {
        self.mutate_panel(guild, id, |panel| {
            panel.category_id = Some(category_id);
            if !panel.support_roles.contains(&role_id) {
                panel.support_roles.push(role_id);
            }
            Ok(())
        })
    }

    pub fn add_role(
        &self,
        guild: serenity::GuildId,
        id: &str,
        role_id: String,
    ) -> Result<(), StoreError> {
        self.mutate_panel(guild, id, |panel| {
            if panel.support_roles.contains(&role_id) {
                return Err(StoreError::AlreadyConfigured(role_id));
            }
            panel.support_roles.push(role_id);
            Ok(())
        })
    }

    pub fn remove_role(
        &self,
        guild: serenity::GuildId,
        id: &str,
        role_id: &str,
    ) -> Result<(), StoreError> {
        self.mutate_panel(guild, id, |panel| {
            let before = panel.support_roles.len();
            panel.support_roles.retain(|r| r != role_id);
            if panel.support_roles.len() == before {
                return Err(StoreError::NotConfigured(role_id.to_string()));
            }
            Ok(())
        })
    }

    pub fn add_sector(
        &self,
        guild: serenity::GuildId,
        id: &str,
        sector: Sector,
    ) -> Result<(), StoreError> {
        self.mutate_panel(guild, id, |panel| {
            if panel.sectors.iter().any(|s| s.name == sector.name) {
                return Err(StoreError::AlreadyConfigured(sector.name));
            }
            panel.sectors.push(sector);
            Ok(())
        })
    }

    pub fn remove_sector(
        &self,
        guild: serenity::GuildId,
        id: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        self.mutate_panel(guild, id, |panel| {
            let before = panel.sectors.len();
            panel.sectors.retain(|s| s.name != name);
            if panel.sectors.len() == before {
                return Err(StoreError::NotConfigured(name.to_string()));
            }
            Ok(())
        })
    }

    pub fn add_button(
        &self,
        guild: serenity::GuildId,
        id: &str,
        button: CustomButton,
    ) -> Result<(), StoreError> {
        self.mutate_panel(guild, id, |panel| {
            if panel.custom_buttons.iter().any(|b| b.label == button.label) {
                return Err(StoreError::AlreadyConfigured(button.label));
            }
            panel.custom_buttons.push(button);
            Ok(())
        })
    }

    pub fn remove_button(
        &self,
        guild: serenity::GuildId,
        id: &str,
        label: &str,
    ) -> Result<(), StoreError> {
        self.mutate_panel(guild, id, |panel| {
            let before = panel.custom_buttons.len();
            panel.custom_buttons.retain(|b| b.label != label);
            if panel.custom_buttons.len() == before {
                return Err(StoreError::NotConfigured(label.to_string()));
            }
            Ok(())
        })
    }

    pub fn set_logs_channel(
        &self,
        guild: serenity::GuildId,
        id: &str,
        channel_id: String,
    ) -> Result<(), StoreError> {
        self.mutate_panel(guild, id, |panel| {
            panel.logs_channel_id = Some(channel_id);
            Ok(())
        })
    }

    /// Logs channels of every panel in the guild. Closing a ticket
    /// broadcasts to all of them, not just the owning panel's.
    pub fn logs_channels(&self, guild: serenity::GuildId) -> Vec<serenity::ChannelId> {
        let guilds = self.guilds.lock().expect("store lock poisoned");
        guilds
            .get(&guild.to_string())
            .map(|entry| {
                entry
                    .panels
                    .values()
                    .filter_map(Panel::logs_channel)
                    .collect()
            })
            .unwrap_or_default()
    }

    // --- Open-ticket records ---

    /// Reserve the (guild, user) ticket slot before the remote create
    /// call. The entry API makes the check-and-insert atomic, so two
    /// near-simultaneous open triggers cannot both pass.
    pub fn begin_ticket(
        &self,
        guild: serenity::GuildId,
        user: serenity::UserId,
    ) -> Result<(), Option<serenity::ChannelId>> {
        match self.open_tickets.entry((guild, user)) {
            Entry::Occupied(occupied) => Err(match occupied.get() {
                TicketRecord::Open(channel) => Some(*channel),
                TicketRecord::Creating => None,
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(TicketRecord::Creating);
                Ok(())
            }
        }
    }

    pub fn confirm_ticket(
        &self,
        guild: serenity::GuildId,
        user: serenity::UserId,
        channel: serenity::ChannelId,
    ) {
        self.open_tickets
            .insert((guild, user), TicketRecord::Open(channel));
    }

    pub fn abort_ticket(&self, guild: serenity::GuildId, user: serenity::UserId) {
        self.open_tickets.remove(&(guild, user));
    }

    /// Drop the record(s) pointing at a closed channel.
    pub fn release_channel(&self, channel: serenity::ChannelId) {
        self.open_tickets
            .retain(|_, record| *record != TicketRecord::Open(channel));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "tickets-rs-test-{}-{}.json",
            tag,
            std::process::id()
        ))
    }

    fn ids() -> (serenity::GuildId, serenity::UserId) {
        (serenity::GuildId::new(100), serenity::UserId::new(7))
    }

    #[test]
    fn test_create_panel_rejects_duplicate_id() {
        let path = temp_path("dup");
        let store = TicketStore::load(&path);
        let (guild, user) = ids();

        store.create_panel(guild, user, "Customer Support").unwrap();
        // Different display name, same derived id
        let err = store.create_panel(guild, user, "customer!!support").unwrap_err();
        assert!(matches!(err, StoreError::PanelExists(_)));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let path = temp_path("roundtrip");
        let (guild, user) = ids();

        {
            let store = TicketStore::load(&path);
            let id = store.create_panel(guild, user, "default").unwrap();
            store
                .setup_panel(guild, &id, "111".to_string(), "222".to_string())
                .unwrap();
            store.set_logs_channel(guild, &id, "333".to_string()).unwrap();
            store
                .add_sector(
                    guild,
                    &id,
                    Sector {
                        name: "Sales".to_string(),
                        description: "Orders".to_string(),
                        emoji: Some("💰".to_string()),
                    },
                )
                .unwrap();
        }

        let reloaded = TicketStore::load(&path);
        let panel = reloaded.get_panel(guild, "default").unwrap();
        assert_eq!(panel.support_roles, vec!["111".to_string()]);
        assert_eq!(panel.category_id.as_deref(), Some("222"));
        assert_eq!(panel.logs_channel_id.as_deref(), Some("333"));
        assert_eq!(panel.sectors.len(), 1);
        assert_eq!(panel.sectors[0].emoji.as_deref(), Some("💰"));
        assert!(panel.is_ready());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_legacy_v1_file_migrates_once() {
        let path = temp_path("migrate");
        fs::write(
            &path,
            r#"{ "100": { "supportRoleId": "111", "categoryId": "222", "logsChannelId": "333" } }"#,
        )
        .unwrap();

        let (guild, _) = ids();
        let store = TicketStore::load(&path);
        let panel = store.get_panel(guild, "default").unwrap();
        assert_eq!(panel.support_roles, vec!["111".to_string()]);
        assert!(panel.is_ready());
        drop(store);

        // Second load reads the rewritten versioned document
        let again = TicketStore::load(&path);
        let panel = again.get_panel(guild, "default").unwrap();
        assert_eq!(panel.category_id.as_deref(), Some("222"));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_delete_panel_clears_selections() {
        let path = temp_path("delete");
        let store = TicketStore::load(&path);
        let (guild, user) = ids();
        let other_user = serenity::UserId::new(8);

        let id = store.create_panel(guild, user, "vip").unwrap();
        store.select_panel(guild, other_user, &id).unwrap();

        // Both users resolve the panel before deletion
        assert!(store.resolve_panel(guild, user, None).is_ok());
        assert!(store.resolve_panel(guild, other_user, None).is_ok());

        store.delete_panel(guild, &id).unwrap();

        assert!(matches!(
            store.resolve_panel(guild, user, None),
            Err(StoreError::NoSelection)
        ));
        assert!(matches!(
            store.resolve_panel(guild, other_user, None),
            Err(StoreError::NoSelection)
        ));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_explicit_panel_argument_overrides_selection() {
        let path = temp_path("explicit");
        let store = TicketStore::load(&path);
        let (guild, user) = ids();

        store.create_panel(guild, user, "first").unwrap();
        store.create_panel(guild, user, "second").unwrap(); // auto-selects

        let (id, _) = store.resolve_panel(guild, user, None).unwrap();
        assert_eq!(id, "second");

        let (id, _) = store.resolve_panel(guild, user, Some("First")).unwrap();
        assert_eq!(id, "first");

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_duplicate_sector_and_button_rejected() {
        let path = temp_path("dupfields");
        let store = TicketStore::load(&path);
        let (guild, user) = ids();
        let id = store.create_panel(guild, user, "default").unwrap();

        let sector = Sector {
            name: "Sales".to_string(),
            description: "Orders".to_string(),
            emoji: None,
        };
        store.add_sector(guild, &id, sector.clone()).unwrap();
        assert!(matches!(
            store.add_sector(guild, &id, sector),
            Err(StoreError::AlreadyConfigured(_))
        ));

        let button = CustomButton {
            label: "Urgent".to_string(),
            emoji: None,
            style: crate::models::panel::PanelButtonStyle::Danger,
        };
        store.add_button(guild, &id, button.clone()).unwrap();
        assert!(matches!(
            store.add_button(guild, &id, button),
            Err(StoreError::AlreadyConfigured(_))
        ));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_ticket_reservation_is_exclusive() {
        let path = temp_path("reserve");
        let store = TicketStore::load(&path);
        let (guild, user) = ids();

        assert!(store.begin_ticket(guild, user).is_ok());
        // Second attempt while the channel is still being created
        assert_eq!(store.begin_ticket(guild, user), Err(None));

        let channel = serenity::ChannelId::new(42);
        store.confirm_ticket(guild, user, channel);
        assert_eq!(store.begin_ticket(guild, user), Err(Some(channel)));

        store.release_channel(channel);
        assert!(store.begin_ticket(guild, user).is_ok());
        store.abort_ticket(guild, user);
        assert!(store.begin_ticket(guild, user).is_ok());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_failed_open_frees_the_reservation() {
        let path = temp_path("abort");
        let store = TicketStore::load(&path);
        let (guild, user) = ids();

        // Any failure between the reservation and the channel create must
        // abort, otherwise the user stays locked out for good
        assert!(store.begin_ticket(guild, user).is_ok());
        assert_eq!(store.begin_ticket(guild, user), Err(None));
        store.abort_ticket(guild, user);

        assert!(store.begin_ticket(guild, user).is_ok());
        store.confirm_ticket(guild, user, serenity::ChannelId::new(55));
        assert_eq!(
            store.begin_ticket(guild, user),
            Err(Some(serenity::ChannelId::new(55)))
        );

        let _ = fs::remove_file(path);
    }
}
