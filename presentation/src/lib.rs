pub mod api;
pub mod cli;
pub mod json_error;
pub mod server;
