// Panel administration commands

use poise::serenity_prelude as serenity;
use tracing::info;

use crate::models::panel::{CustomButton, PanelButtonStyle, Sector};
use crate::store::StoreError;
use crate::utils::embeds;
use crate::utils::sanitize;
use crate::{Context, Error};

/// Button style options for custom panel buttons
#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum ButtonStyleChoice {
    #[name = "Primary (blurple)"]
    Primary,
    #[name = "Secondary (grey)"]
    Secondary,
    #[name = "Success (green)"]
    Success,
    #[name = "Danger (red)"]
    Danger,
}

impl From<ButtonStyleChoice> for PanelButtonStyle {
    fn from(choice: ButtonStyleChoice) -> Self {
        match choice {
            ButtonStyleChoice::Primary => PanelButtonStyle::Primary,
            ButtonStyleChoice::Secondary => PanelButtonStyle::Secondary,
            ButtonStyleChoice::Success => PanelButtonStyle::Success,
            ButtonStyleChoice::Danger => PanelButtonStyle::Danger,
        }
    }
}

async fn reply_error(ctx: Context<'_>, message: String) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content(format!("❌ {}", message))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

async fn reply_success(ctx: Context<'_>, title: &str, description: String) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .embed(embeds::success(title, description))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

fn guild_of(ctx: &Context<'_>) -> Result<serenity::GuildId, Error> {
    ctx.guild_id()
        .ok_or_else(|| "This command can only be used in a server.".into())
}

/// Resolve the panel a subcommand targets: explicit argument first,
/// session selection second.
fn resolve(
    ctx: &Context<'_>,
    explicit: Option<&str>,
) -> Result<(serenity::GuildId, String), StoreError> {
    let guild_id = ctx.guild_id().ok_or(StoreError::NoSelection)?;
    let (id, _) = ctx
        .data()
        .store
        .resolve_panel(guild_id, ctx.author().id, explicit)?;
    Ok((guild_id, id))
}

/// Manage ticket panels
#[poise::command(
    slash_command,
    guild_only,
    subcommands(
        "create", "delete", "select", "list", "setup", "add_role", "remove_role",
        "add_sector", "remove_sector", "add_button", "remove_button", "logs", "deploy"
    )
)]
pub async fn panel(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Create a new ticket panel (and select it)
#[poise::command(slash_command, required_permissions = "ADMINISTRATOR")]
pub async fn create(
    ctx: Context<'_>,
    #[description = "Display name of the panel"] name: String,
) -> Result<(), Error> {
    let guild_id = guild_of(&ctx)?;

    match ctx.data().store.create_panel(guild_id, ctx.author().id, &name) {
        Ok(id) => {
            info!("Panel {} created in guild {}", id, guild_id);
            reply_success(
                ctx,
                "✅ Panel Created",
                format!(
                    "Panel **{}** created with id `{}` and selected for you.\n\nConfigure it with `/panel setup`, then post it with `/panel deploy`.",
                    name, id
                ),
            )
            .await
        }
        Err(e) => reply_error(ctx, e.to_string()).await,
    }
}

/// Delete a ticket panel
#[poise::command(slash_command, required_permissions = "ADMINISTRATOR")]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "Panel to delete (defaults to your selection)"] panel: Option<String>,
) -> Result<(), Error> {
    let (guild_id, id) = match resolve(&ctx, panel.as_deref()) {
        Ok(target) => target,
        Err(e) => return reply_error(ctx, e.to_string()).await,
    };

    match ctx.data().store.delete_panel(guild_id, &id) {
        Ok(()) => {
            info!("Panel {} deleted in guild {}", id, guild_id);
            reply_success(ctx, "🗑️ Panel Deleted", format!("Panel `{}` was removed.", id)).await
        }
        Err(e) => reply_error(ctx, e.to_string()).await,
    }
}

/// Select the panel your next panel commands apply to
#[poise::command(slash_command, required_permissions = "ADMINISTRATOR")]
pub async fn select(
    ctx: Context<'_>,
    #[description = "Panel name or id"] name: String,
) -> Result<(), Error> {
    let guild_id = guild_of(&ctx)?;
    let id = sanitize::panel_id(&name);

    match ctx.data().store.select_panel(guild_id, ctx.author().id, &id) {
        Ok(()) => {
            reply_success(ctx, "✅ Panel Selected", format!("Now working on panel `{}`.", id)).await
        }
        Err(e) => reply_error(ctx, e.to_string()).await,
    }
}

/// List this server's ticket panels
#[poise::command(slash_command, required_permissions = "ADMINISTRATOR")]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_of(&ctx)?;
    let panels = ctx.data().store.panels(guild_id);

    if panels.is_empty() {
        return reply_error(ctx, "No panels configured. Create one with `/panel create`.".into())
            .await;
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("🎛️ Ticket Panels")
        .color(embeds::colors::PRIMARY);
    for (id, panel) in panels {
        let status = if panel.is_ready() { "ready" } else { "incomplete" };
        embed = embed.field(
            format!("{} (`{}`)", panel.name, id),
            format!(
                "Status: {} | {} role(s), {} sector(s), {} button(s)",
                status,
                panel.support_roles.len(),
                panel.sectors.len(),
                panel.custom_buttons.len()
            ),
            false,
        );
    }

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Configure the support role and ticket category in one go
#[poise::command(slash_command, required_permissions = "ADMINISTRATOR")]
pub async fn setup(
    ctx: Context<'_>,
    #[description = "Role that gets access to tickets"] role: serenity::Role,
    #[description = "Category the tickets are created under"]
    #[channel_types("Category")]
    category: serenity::GuildChannel,
    #[description = "Panel to configure (defaults to your selection)"] panel: Option<String>,
) -> Result<(), Error> {
    let guild_id = guild_of(&ctx)?;
    let store = &ctx.data().store;

    // First-time setup on a fresh guild implicitly creates "default",
    // matching what the flat pre-panel config did.
    let id = match store.resolve_panel(guild_id, ctx.author().id, panel.as_deref()) {
        Ok((id, _)) => id,
        Err(StoreError::NoSelection) if store.panels(guild_id).is_empty() => {
            match store.create_panel(guild_id, ctx.author().id, "default") {
                Ok(id) => id,
                Err(e) => return reply_error(ctx, e.to_string()).await,
            }
        }
        Err(e) => return reply_error(ctx, e.to_string()).await,
    };

    match store.setup_panel(guild_id, &id, role.id.to_string(), category.id.to_string()) {
        Ok(()) => {
            info!("Panel {} in guild {} configured", id, guild_id);
            reply_success(
                ctx,
                "✅ Setup Complete",
                format!(
                    "**Ticket system configured on panel `{}`.**\n\n📌 **Support role:** <@&{}>\n📁 **Category:** {}",
                    id, role.id, category.name
                ),
            )
            .await
        }
        Err(e) => reply_error(ctx, e.to_string()).await,
    }
}

/// Add a support role to the panel
#[poise::command(slash_command, required_permissions = "ADMINISTRATOR")]
pub async fn add_role(
    ctx: Context<'_>,
    #[description = "Role to add"] role: serenity::Role,
    #[description = "Panel to configure (defaults to your selection)"] panel: Option<String>,
) -> Result<(), Error> {
    let (guild_id, id) = match resolve(&ctx, panel.as_deref()) {
        Ok(target) => target,
        Err(e) => return reply_error(ctx, e.to_string()).await,
    };

    match ctx.data().store.add_role(guild_id, &id, role.id.to_string()) {
        Ok(()) => {
            reply_success(
                ctx,
                "✅ Role Added",
                format!("<@&{}> now has access to `{}` tickets.", role.id, id),
            )
            .await
        }
        Err(e) => reply_error(ctx, e.to_string()).await,
    }
}

/// Remove a support role from the panel
#[poise::command(slash_command, required_permissions = "ADMINISTRATOR")]
pub async fn remove_role(
    ctx: Context<'_>,
    #[description = "Role to remove"] role: serenity::Role,
    #[description = "Panel to configure (defaults to your selection)"] panel: Option<String>,
) -> Result<(), Error> {
    let (guild_id, id) = match resolve(&ctx, panel.as_deref()) {
        Ok(target) => target,
        Err(e) => return reply_error(ctx, e.to_string()).await,
    };

    match ctx.data().store.remove_role(guild_id, &id, &role.id.to_string()) {
        Ok(()) => {
            reply_success(
                ctx,
                "🚫 Role Removed",
                format!("<@&{}> no longer has access to `{}` tickets.", role.id, id),
            )
            .await
        }
        Err(e) => reply_error(ctx, e.to_string()).await,
    }
}

/// Add a sector to the panel's select menu
#[poise::command(slash_command, required_permissions = "ADMINISTRATOR")]
pub async fn add_sector(
    ctx: Context<'_>,
    #[description = "Sector name"] name: String,
    #[description = "Short description shown in the menu"] description: String,
    #[description = "Emoji shown next to the option"] emoji: Option<String>,
    #[description = "Panel to configure (defaults to your selection)"] panel: Option<String>,
) -> Result<(), Error> {
    let (guild_id, id) = match resolve(&ctx, panel.as_deref()) {
        Ok(target) => target,
        Err(e) => return reply_error(ctx, e.to_string()).await,
    };

    let sector = Sector {
        name: name.clone(),
        description,
        emoji,
    };
    match ctx.data().store.add_sector(guild_id, &id, sector) {
        Ok(()) => {
            reply_success(
                ctx,
                "✅ Sector Added",
                format!("Sector **{}** added to panel `{}`.", name, id),
            )
            .await
        }
        Err(e) => reply_error(ctx, e.to_string()).await,
    }
}

/// Remove a sector from the panel
#[poise::command(slash_command, required_permissions = "ADMINISTRATOR")]
pub async fn remove_sector(
    ctx: Context<'_>,
    #[description = "Sector name"] name: String,
    #[description = "Panel to configure (defaults to your selection)"] panel: Option<String>,
) -> Result<(), Error> {
    let (guild_id, id) = match resolve(&ctx, panel.as_deref()) {
        Ok(target) => target,
        Err(e) => return reply_error(ctx, e.to_string()).await,
    };

    match ctx.data().store.remove_sector(guild_id, &id, &name) {
        Ok(()) => {
            reply_success(
                ctx,
                "🗑️ Sector Removed",
                format!("Sector **{}** removed from panel `{}`.", name, id),
            )
            .await
        }
        Err(e) => reply_error(ctx, e.to_string()).await,
    }
}

/// Add a custom open-ticket button to the panel
#[poise::command(slash_command, required_permissions = "ADMINISTRATOR")]
pub async fn add_button(
    ctx: Context<'_>,
    #[description = "Button label"] label: String,
    #[description = "Button color"] style: ButtonStyleChoice,
    #[description = "Emoji shown on the button"] emoji: Option<String>,
    #[description = "Panel to configure (defaults to your selection)"] panel: Option<String>,
) -> Result<(), Error> {
    let (guild_id, id) = match resolve(&ctx, panel.as_deref()) {
        Ok(target) => target,
        Err(e) => return reply_error(ctx, e.to_string()).await,
    };

    let button = CustomButton {
        label: label.clone(),
        emoji,
        style: style.into(),
    };
    match ctx.data().store.add_button(guild_id, &id, button) {
        Ok(()) => {
            reply_success(
                ctx,
                "✅ Button Added",
                format!("Button **{}** added to panel `{}`.", label, id),
            )
            .await
        }
        Err(e) => reply_error(ctx, e.to_string()).await,
    }
}

/// Remove a custom button from the panel
#[poise::command(slash_command, required_permissions = "ADMINISTRATOR")]
pub async fn remove_button(
    ctx: Context<'_>,
    #[description = "Button label"] label: String,
    #[description = "Panel to configure (defaults to your selection)"] panel: Option<String>,
) -> Result<(), Error> {
    let (guild_id, id) = match resolve(&ctx, panel.as_deref()) {
        Ok(target) => target,
        Err(e) => return reply_error(ctx, e.to_string()).await,
    };

    match ctx.data().store.remove_button(guild_id, &id, &label) {
        Ok(()) => {
            reply_success(
                ctx,
                "🗑️ Button Removed",
                format!("Button **{}** removed from panel `{}`.", label, id),
            )
            .await
        }
        Err(e) => reply_error(ctx, e.to_string()).await,
    }
}

/// Configure the logs channel for opened/closed tickets
#[poise::command(slash_command, required_permissions = "ADMINISTRATOR")]
pub async fn logs(
    ctx: Context<'_>,
    #[description = "Channel the logs are sent to"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
    #[description = "Panel to configure (defaults to your selection)"] panel: Option<String>,
) -> Result<(), Error> {
    let (guild_id, id) = match resolve(&ctx, panel.as_deref()) {
        Ok(target) => target,
        Err(e) => return reply_error(ctx, e.to_string()).await,
    };

    match ctx
        .data()
        .store
        .set_logs_channel(guild_id, &id, channel.id.to_string())
    {
        Ok(()) => {
            reply_success(
                ctx,
                "✅ Logs Channel Configured",
                format!("Ticket logs for panel `{}` go to <#{}>.", id, channel.id),
            )
            .await
        }
        Err(e) => reply_error(ctx, e.to_string()).await,
    }
}

/// Post the panel's intake message in the current channel
#[poise::command(slash_command, required_permissions = "MANAGE_CHANNELS")]
pub async fn deploy(
    ctx: Context<'_>,
    #[description = "Panel to post (defaults to your selection)"] panel: Option<String>,
) -> Result<(), Error> {
    let guild_id = guild_of(&ctx)?;
    let (id, panel) = match ctx
        .data()
        .store
        .resolve_panel(guild_id, ctx.author().id, panel.as_deref())
    {
        Ok(resolved) => resolved,
        Err(e) => return reply_error(ctx, e.to_string()).await,
    };

    let embed = serenity::CreateEmbed::new()
        .title("**Welcome to the Support Center!**")
        .description(
            "**To start, pick a sector in the selection menu below or click one of the buttons.**\n\n\
            A staff member will be with you as soon as one is available. Please avoid pinging the \
            team or opening tickets without an actual support request.",
        )
        .color(embeds::colors::PRIMARY)
        .footer(serenity::CreateEmbedFooter::new(embeds::FOOTER))
        .timestamp(serenity::Timestamp::now());

    let mut rows = Vec::new();

    if !panel.sectors.is_empty() {
        let options: Vec<_> = panel
            .sectors
            .iter()
            .map(|sector| {
                let mut option =
                    serenity::CreateSelectMenuOption::new(sector.name.clone(), sector.name.clone())
                        .description(sector.description.clone());
                if let Some(emoji) = sector
                    .emoji
                    .as_deref()
                    .and_then(|e| serenity::ReactionType::try_from(e).ok())
                {
                    option = option.emoji(emoji);
                }
                option
            })
            .collect();
        let menu = serenity::CreateSelectMenu::new(
            format!("ticket_sector:{}", id),
            serenity::CreateSelectMenuKind::String { options },
        )
        .placeholder("Choose a sector...");
        rows.push(serenity::CreateActionRow::SelectMenu(menu));
    }

    let mut buttons = vec![serenity::CreateButton::new(format!("ticket_open:{}", id))
        .label("Open Ticket")
        .emoji('🎫')
        .style(serenity::ButtonStyle::Primary)];
    for (index, custom) in panel.custom_buttons.iter().enumerate() {
        let mut button = serenity::CreateButton::new(format!("ticket_open:{}:{}", id, index))
            .label(custom.label.clone())
            .style(custom.style.into());
        if let Some(emoji) = custom
            .emoji
            .as_deref()
            .and_then(|e| serenity::ReactionType::try_from(e).ok())
        {
            button = button.emoji(emoji);
        }
        buttons.push(button);
    }
    rows.push(serenity::CreateActionRow::Buttons(buttons));

    let message = serenity::CreateMessage::new().embed(embed).components(rows);
    match ctx.channel_id().send_message(ctx.http(), message).await {
        Ok(_) => reply_success(ctx, "✅ Panel Deployed", format!("Panel `{}` posted!", id)).await,
        Err(e) => {
            tracing::error!("Failed to deploy panel {}: {:?}", id, e);
            reply_error(ctx, "Failed to post the panel. Check the bot's permissions.".into()).await
        }
    }
}
