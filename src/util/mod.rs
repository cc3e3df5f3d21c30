pub mod config;
pub mod errors;
pub mod headers;
pub mod http;
pub mod mailbox;
pub mod source;
pub mod task;
