pub mod model;
pub mod source;

pub use source::Spotify;

pub const SOURCE_NAME: &str = "spotify";
pub const GRANT_TYPE: &str = "refresh_token";
