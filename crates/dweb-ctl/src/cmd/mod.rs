//! CLI command modules.

pub mod http;
pub mod log;
pub mod nodes;
pub mod select;
pub mod services;
pub mod status;
