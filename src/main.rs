use std::sync::Arc;

use yt_emoji_chat::{
    config::AppConfig,
    youtube::{ApiErrorObject, ChatPoller, LiveChatMessage, LiveStreamResolver, YouTubeClient},
};

/// 使い方: `yt-emoji-chat <CHANNEL_ID|VIDEO_ID>`
///
/// `UC` で始まる引数はチャンネルID、それ以外は動画IDとして扱う。
/// 引数がなければ YOUTUBE_CHANNEL_ID / YOUTUBE_VIDEO_ID を参照する。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    log::info!(
        "Using API key {}",
        yt_emoji_chat::util::mask_api_key(&config.api_key)
    );

    let (channel_id, video_id) = match std::env::args().nth(1) {
        Some(arg) if arg.starts_with("UC") => (Some(arg), None),
        Some(arg) => (None, Some(arg)),
        None => (
            std::env::var("YOUTUBE_CHANNEL_ID").ok(),
            std::env::var("YOUTUBE_VIDEO_ID").ok(),
        ),
    };

    let client = YouTubeClient::new(config.api_key.clone())?;
    let resolver = LiveStreamResolver::open(client.clone(), &config.cache_dir).await;

    let Some(info) = resolver
        .resolve(channel_id.as_deref(), video_id.as_deref())
        .await?
    else {
        log::warn!("No live stream found");
        return Ok(());
    };
    log::info!(
        "Polling live chat {} (video {})",
        info.chat_id,
        info.live_stream_id
    );

    if let Some(channel_id) = info.channel_id.as_deref() {
        match config.emoji_store().load(channel_id).await {
            Ok(Some(emojis)) => {
                log::info!("Loaded {} custom emojis for {}", emojis.len(), channel_id)
            }
            Ok(None) => log::info!("No custom emojis stored for {}", channel_id),
            Err(e) => log::warn!("Failed to load custom emojis for {}: {}", channel_id, e),
        }
    }

    let poller = ChatPoller::with_config(Arc::new(client), config.poller.clone());
    let handle = poller.start(
        info.chat_id,
        |message: LiveChatMessage| {
            let text = message.snippet.display_message.as_deref().unwrap_or("");
            println!("{}: {}", message.author_details.display_name, text);
        },
        |error: ApiErrorObject| {
            log::error!("Live chat error {}: {}", error.code, error.message);
        },
    );

    let stop = handle.stop_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted, stopping poller");
            stop.stop();
        }
    });

    let outcome = handle.join().await;
    log::info!("Poller finished: {:?}", outcome);
    Ok(())
}
