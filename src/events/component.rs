// Button and select-menu interaction routing
//
// Custom ids carry the panel id after a `:` separator, e.g.
// `ticket_open:default` or `ticket_sector:vip`.

use poise::serenity_prelude as serenity;

use crate::{tickets, Data, Error};

pub async fn handle(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let custom_id = interaction.data.custom_id.clone();
    let (action, rest) = match custom_id.split_once(':') {
        Some((action, rest)) => (action, rest),
        None => (custom_id.as_str(), "default"),
    };
    // Custom open buttons append an index after a second separator
    let panel_id = rest.split(':').next().unwrap_or(rest);

    match action {
        "ticket_open" => tickets::open(ctx, interaction, data, panel_id, None).await,
        "ticket_sector" => {
            let sector = match &interaction.data.kind {
                serenity::ComponentInteractionDataKind::StringSelect { values } => {
                    values.first().cloned()
                }
                _ => None,
            };
            tickets::open(ctx, interaction, data, panel_id, sector.as_deref()).await
        }
        "ticket_claim" => tickets::claim(ctx, interaction, data, panel_id).await,
        "ticket_close" => tickets::close(ctx, interaction, data).await,
        _ => Ok(()),
    }
}
