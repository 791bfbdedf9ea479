pub mod caf;
pub mod command;
pub mod devices;
pub mod format;
pub mod layout;
pub mod output;
