// Shared embed styling

use poise::serenity_prelude as serenity;

/// Discord embed colors
pub mod colors {
    pub const PRIMARY: u32 = 0x0099ff;
    pub const SUCCESS: u32 = 0x2ecc71;
    pub const ERROR: u32 = 0xff0000;
    pub const WARNING: u32 = 0xffd700;
}

/// Footer applied to every embed the bot sends.
pub const FOOTER: &str = "tickets-rs";

pub fn base(title: &str, description: String, color: u32) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .color(color)
        .footer(serenity::CreateEmbedFooter::new(FOOTER))
        .timestamp(serenity::Timestamp::now())
}

pub fn success(title: &str, description: String) -> serenity::CreateEmbed {
    base(title, description, colors::SUCCESS)
}
