use crate::models::PlaybackSnapshot;
use async_trait::async_trait;
use std::sync::Arc;

/// Anything that can report what is playing right now.
/// Implementations swallow their own failures and answer with [`PlaybackSnapshot::NotPlaying`].
#[async_trait]
pub trait PlaybackSource: Send + Sync + 'static {
    fn get_name(&self) -> &'static str;
    async fn fetch_snapshot(&self) -> PlaybackSnapshot;
}

pub type SharedSource = Arc<dyn PlaybackSource>;
