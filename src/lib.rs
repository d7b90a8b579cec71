pub mod cache;
pub mod config;
pub mod emoji;
pub mod util; // doctestのためpubにする
pub mod youtube;

pub use config::AppConfig;
pub use emoji::{EmojiError, FetchQueue, JsonEmojiStore};
pub use youtube::{ChatPoller, LiveStreamResolver, YouTubeClient, YouTubeError};
