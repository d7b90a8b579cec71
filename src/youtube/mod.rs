//! YouTube Data API v3 ライブチャットモジュール
//!
//! 配信中のライブチャットIDを解決し、チャットページを繰り返し取得して
//! メッセージを1件ずつ配信する。
//!
//! ## 注意事項
//! - search.list はクォータ消費が大きいため、解決結果はキャッシュする
//! - ポーリング間隔はサーバー推奨値に従う（最小間隔あり）

pub mod client;
pub mod errors;
pub mod live_stream;
pub mod poller;
pub mod state;
pub mod throttle;
pub mod types;

pub use client::YouTubeClient;
pub use errors::YouTubeError;
pub use live_stream::LiveStreamResolver;
pub use poller::{ChatPageFetcher, ChatPoller, PollHandle, PollOutcome, StopToken};
pub use types::{ApiErrorObject, LiveChatMessage, LiveStreamInfo};
