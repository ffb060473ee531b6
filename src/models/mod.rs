// Data model module
pub mod panel;
