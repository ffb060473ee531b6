// Ticket channel lifecycle: open -> claimed -> closed -> deleted

use poise::serenity_prelude as serenity;
use tracing::{error, info};

use crate::utils::embeds::{self, colors};
use crate::utils::sanitize;
use crate::{Data, Error};

/// Seconds between the closing announcement and the channel deletion.
const CLOSE_DELAY_SECS: u64 = 5;

async fn reply_ephemeral(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    message: &str,
) -> Result<(), Error> {
    interaction
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .content(message)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

/// The guild channel the interaction fired in, if it is a ticket channel.
async fn ticket_channel(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
) -> Option<serenity::GuildChannel> {
    let channel = interaction
        .channel_id
        .to_channel(&ctx.http)
        .await
        .ok()?
        .guild()?;
    sanitize::is_ticket_channel(&channel.name).then_some(channel)
}

/// Open a ticket from a panel button or sector choice.
///
/// Guards: the panel must be fully configured, and the (guild, user) slot
/// must be free. The slot is reserved before the channel-create call so a
/// second click while the first is in flight is rejected.
pub async fn open(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    data: &Data,
    panel_id: &str,
    sector: Option<&str>,
) -> Result<(), Error> {
    let guild_id = interaction.guild_id.ok_or("No guild ID")?;
    let user = &interaction.user;

    let panel = match data.store.get_panel(guild_id, panel_id) {
        Some(panel) if panel.is_ready() => panel,
        _ => {
            return reply_ephemeral(
                ctx,
                interaction,
                "The ticket system is not configured yet. Ask an administrator to run `/panel setup`.",
            )
            .await;
        }
    };

    if let Err(existing) = data.store.begin_ticket(guild_id, user.id) {
        let message = match existing {
            Some(channel) => format!("You already have an open ticket: <#{}>", channel),
            None => "Your ticket is already being created, hold on.".to_string(),
        };
        return reply_ephemeral(ctx, interaction, &message).await;
    }

    // A failed acknowledgment must free the slot again, or the user is
    // locked out of opening tickets for the rest of the process lifetime
    if let Err(e) = reply_ephemeral(ctx, interaction, "🎫 Creating your ticket...").await {
        data.store.abort_ticket(guild_id, user.id);
        return Err(e);
    }

    let support_roles = panel.support_role_ids();
    let mut overwrites = vec![
        serenity::PermissionOverwrite {
            allow: serenity::Permissions::empty(),
            deny: serenity::Permissions::VIEW_CHANNEL,
            kind: serenity::PermissionOverwriteType::Role(serenity::RoleId::new(guild_id.get())),
        },
        serenity::PermissionOverwrite {
            allow: serenity::Permissions::VIEW_CHANNEL
                | serenity::Permissions::SEND_MESSAGES
                | serenity::Permissions::READ_MESSAGE_HISTORY,
            deny: serenity::Permissions::empty(),
            kind: serenity::PermissionOverwriteType::Member(user.id),
        },
    ];
    for role_id in &support_roles {
        overwrites.push(serenity::PermissionOverwrite {
            allow: serenity::Permissions::VIEW_CHANNEL
                | serenity::Permissions::SEND_MESSAGES
                | serenity::Permissions::READ_MESSAGE_HISTORY,
            deny: serenity::Permissions::empty(),
            kind: serenity::PermissionOverwriteType::Role(*role_id),
        });
    }

    let builder = serenity::CreateChannel::new(sanitize::ticket_channel_name(&user.name))
        .kind(serenity::ChannelType::Text)
        .permissions(overwrites);
    let builder = match panel.category_channel_id() {
        Some(category) => builder.category(category),
        None => builder,
    };

    let channel = match guild_id.create_channel(&ctx.http, builder).await {
        Ok(channel) => channel,
        Err(e) => {
            error!("Failed to create ticket channel: {:?}", e);
            data.store.abort_ticket(guild_id, user.id);
            let _ = interaction
                .create_followup(
                    &ctx.http,
                    serenity::CreateInteractionResponseFollowup::new()
                        .content("Failed to create the ticket. Check the bot's permissions.")
                        .ephemeral(true),
                )
                .await;
            return Ok(());
        }
    };

    data.store.confirm_ticket(guild_id, user.id, channel.id);

    let mut description = format!(
        "Hello <@{}>, welcome to your ticket!\n\nA member of the support team will be with you shortly.",
        user.id
    );
    if let Some(sector) = sector {
        description.push_str(&format!("\n\n**Sector:** {}", sector));
    }
    description.push_str("\n\n**Use the buttons below to claim or close this ticket.**");

    let claim = serenity::CreateButton::new(format!("ticket_claim:{}", panel_id))
        .label("Claim Ticket")
        .emoji('✋')
        .style(serenity::ButtonStyle::Success);
    let close = serenity::CreateButton::new(format!("ticket_close:{}", panel_id))
        .label("Close Ticket")
        .emoji('🔒')
        .style(serenity::ButtonStyle::Danger);

    let role_mentions: Vec<String> = support_roles
        .iter()
        .map(|role| format!("<@&{}>", role))
        .collect();

    let message = serenity::CreateMessage::new()
        .content(format!("<@{}> | {}", user.id, role_mentions.join(" ")))
        .embed(embeds::success("🎫 Ticket Opened", description))
        .components(vec![serenity::CreateActionRow::Buttons(vec![claim, close])]);

    if let Err(e) = channel.send_message(&ctx.http, message).await {
        error!("Failed to send ticket control message: {:?}", e);
    }

    info!("Ticket {} opened by {}", channel.name, user.name);

    // Best-effort mirror to the panel's logs channel
    if let Some(logs) = panel.logs_channel() {
        let log_embed = embeds::base(
            "📂 Ticket Opened",
            format!(
                "**User:** <@{}> ({})\n**Channel:** <#{}>\n**Panel:** {}\n**Time:** <t:{}:F>",
                user.id,
                user.name,
                channel.id,
                panel.name,
                chrono::Utc::now().timestamp()
            ),
            colors::SUCCESS,
        );
        if let Err(e) = logs
            .send_message(&ctx.http, serenity::CreateMessage::new().embed(log_embed))
            .await
        {
            error!("Failed to send opened-ticket log: {:?}", e);
        }
    }

    Ok(())
}

/// Claim the ticket: only holders of one of the panel's support roles may.
/// Re-claiming just posts another announcement.
pub async fn claim(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    data: &Data,
    panel_id: &str,
) -> Result<(), Error> {
    let guild_id = interaction.guild_id.ok_or("No guild ID")?;

    let Some(channel) = ticket_channel(ctx, interaction).await else {
        return reply_ephemeral(ctx, interaction, "This button only works in ticket channels.")
            .await;
    };

    let support_roles = data
        .store
        .get_panel(guild_id, panel_id)
        .map(|panel| panel.support_role_ids())
        .unwrap_or_default();

    let member_roles = interaction
        .member
        .as_ref()
        .map(|m| m.roles.clone())
        .unwrap_or_default();

    if !support_roles.iter().any(|role| member_roles.contains(role)) {
        return reply_ephemeral(
            ctx,
            interaction,
            "Only members of the support team can claim tickets.",
        )
        .await;
    }

    let embed = embeds::base(
        "✋ Ticket Claimed",
        format!(
            "This ticket was claimed by <@{}>.\n\nThey will handle the request.",
            interaction.user.id
        ),
        colors::WARNING,
    );
    interaction
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new().embed(embed),
            ),
        )
        .await?;

    info!("Ticket {} claimed by {}", channel.name, interaction.user.name);
    Ok(())
}

/// Close the ticket: announce, mirror to every configured logs channel in
/// the guild, then delete the channel after a short delay. Anyone in the
/// channel may close it.
pub async fn close(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let guild_id = interaction.guild_id.ok_or("No guild ID")?;

    let Some(channel) = ticket_channel(ctx, interaction).await else {
        return reply_ephemeral(ctx, interaction, "This button only works in ticket channels.")
            .await;
    };

    let embed = embeds::base(
        "🔒 Ticket Closed",
        format!(
            "Ticket closed by <@{}>.\n\nThis channel will be deleted in {} seconds...",
            interaction.user.id, CLOSE_DELAY_SECS
        ),
        colors::ERROR,
    );
    interaction
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new().embed(embed),
            ),
        )
        .await?;

    info!("Ticket {} closed by {}", channel.name, interaction.user.name);

    // Every panel with a logs channel gets the closed record
    for logs in data.store.logs_channels(guild_id) {
        let log_embed = embeds::base(
            "🔒 Ticket Closed",
            format!(
                "**Closed by:** <@{}> ({})\n**Channel:** #{}\n**Time:** <t:{}:F>",
                interaction.user.id,
                interaction.user.name,
                channel.name,
                chrono::Utc::now().timestamp()
            ),
            colors::ERROR,
        );
        if let Err(e) = logs
            .send_message(&ctx.http, serenity::CreateMessage::new().embed(log_embed))
            .await
        {
            error!("Failed to send closed-ticket log: {:?}", e);
        }
    }

    // Let the closing announcement render before the channel goes away.
    // The open-ticket record is released only once the delete succeeds;
    // if it fails, the record keeps blocking a second ticket alongside
    // the surviving channel.
    let http = ctx.http.clone();
    let store = data.store.clone();
    let channel_id = channel.id;
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(CLOSE_DELAY_SECS)).await;
        match channel_id.delete(&http).await {
            Ok(_) => store.release_channel(channel_id),
            Err(e) => error!("Failed to delete ticket channel: {:?}", e),
        }
    });

    Ok(())
}
