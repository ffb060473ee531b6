// User management inside a ticket channel

use poise::serenity_prelude as serenity;
use tracing::{error, info};

use crate::utils::embeds;
use crate::utils::sanitize;
use crate::{Context, Error};

/// The current channel, if it is a ticket channel.
async fn current_ticket_channel(ctx: &Context<'_>) -> Option<serenity::GuildChannel> {
    let channel = ctx
        .channel_id()
        .to_channel(ctx.http())
        .await
        .ok()?
        .guild()?;
    sanitize::is_ticket_channel(&channel.name).then_some(channel)
}

async fn reply_not_ticket(ctx: Context<'_>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content("❌ This command only works in ticket channels.")
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Add a user to the current ticket
#[poise::command(slash_command, guild_only)]
pub async fn adduser(
    ctx: Context<'_>,
    #[description = "User to add to the ticket"] user: serenity::User,
) -> Result<(), Error> {
    let Some(channel) = current_ticket_channel(&ctx).await else {
        return reply_not_ticket(ctx).await;
    };

    let overwrite = serenity::PermissionOverwrite {
        allow: serenity::Permissions::VIEW_CHANNEL
            | serenity::Permissions::SEND_MESSAGES
            | serenity::Permissions::READ_MESSAGE_HISTORY,
        deny: serenity::Permissions::empty(),
        kind: serenity::PermissionOverwriteType::Member(user.id),
    };

    match channel.create_permission(ctx.http(), overwrite).await {
        Ok(()) => {
            info!("User {} added to {} by {}", user.name, channel.name, ctx.author().name);
            let embed = embeds::success(
                "✅ User Added",
                format!("<@{}> was added to the ticket by <@{}>.", user.id, ctx.author().id),
            );
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(e) => {
            error!("Failed to add user to ticket: {:?}", e);
            ctx.send(
                poise::CreateReply::default()
                    .content("❌ Failed to add the user. Check the bot's permissions.")
                    .ephemeral(true),
            )
            .await?;
        }
    }

    Ok(())
}

/// Remove a user from the current ticket
#[poise::command(slash_command, guild_only)]
pub async fn removeuser(
    ctx: Context<'_>,
    #[description = "User to remove from the ticket"] user: serenity::User,
) -> Result<(), Error> {
    let Some(channel) = current_ticket_channel(&ctx).await else {
        return reply_not_ticket(ctx).await;
    };

    match channel
        .delete_permission(ctx.http(), serenity::PermissionOverwriteType::Member(user.id))
        .await
    {
        Ok(()) => {
            info!("User {} removed from {} by {}", user.name, channel.name, ctx.author().name);
            let embed = embeds::base(
                "🚫 User Removed",
                format!("<@{}> was removed from the ticket by <@{}>.", user.id, ctx.author().id),
                embeds::colors::ERROR,
            );
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(e) => {
            error!("Failed to remove user from ticket: {:?}", e);
            ctx.send(
                poise::CreateReply::default()
                    .content("❌ Failed to remove the user. Check the bot's permissions.")
                    .ephemeral(true),
            )
            .await?;
        }
    }

    Ok(())
}
