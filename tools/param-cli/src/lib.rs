//! param-cli library
//!
//! Schema files, editor configuration and the edit session behind the
//! `param` command.

pub mod config;
pub mod hex_text;
pub mod report;
pub mod schema_file;
pub mod session;

pub use config::EditorConfig;
pub use session::Session;
