// Utility functions module
pub mod embeds;
pub mod sanitize;
