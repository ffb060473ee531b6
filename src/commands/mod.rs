// Slash command modules
pub mod panel;
pub mod ticket;
