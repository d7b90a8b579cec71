//! 絵文字取得キュー
//!
//! スクレイピング要求を1件ずつ・一定間隔で処理する。
//! 同じ動画IDへの要求はリスナーとしてまとめ、処理が終わった時点で全員に結果を通知する。
//!
//! ## 処理の流れ
//! 1. 先頭のエントリを取り出す（FIFO）
//! 2. チャンネルのデータが保存済みなら成功を通知
//! 3. 未保存ならスクレイピングし、絵文字があれば保存して成功、なければ失敗を通知
//! 4. エントリが残っていれば `step_delay` 待って次へ、なければ停止
//!
//! 同じ動画のエントリが連続して処理された場合、保存済み判定で2回目以降のスクレイピングは
//! スキップされる。保存前に重複エントリが処理されると重複してスクレイピングすることがあるが、
//! 結果はそれぞれ正しく通知される。

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use super::{EmojiError, EmojiScraper, EmojiStore};
use crate::config::FetchQueueConfig;

/// キューのエントリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub video_id: String,
    /// 要求元が指定したチャンネルID（推測値の場合がある）
    pub channel_id: String,
}

#[derive(Default)]
struct QueueState {
    entries: VecDeque<QueueEntry>,
    /// 動画ID → 完了待ちの要求
    listeners: HashMap<String, Vec<oneshot::Sender<bool>>>,
    running: bool,
}

struct Inner {
    state: Mutex<QueueState>,
    store: Arc<dyn EmojiStore>,
    scraper: Arc<dyn EmojiScraper>,
    config: FetchQueueConfig,
}

/// 絵文字取得キュー
///
/// クローンは同じキューを共有する。
#[derive(Clone)]
pub struct FetchQueue {
    inner: Arc<Inner>,
}

/// `queue()` の結果待ち
///
/// データが利用可能になれば `true`、見つからない・失敗した場合は `false` で完了する。
#[must_use = "a ticket does nothing unless awaited"]
pub struct FetchTicket {
    rx: oneshot::Receiver<bool>,
}

impl Future for FetchTicket {
    type Output = bool;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        // 送信側が破棄された場合（ランタイム終了時など）は失敗扱い
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|result| result.unwrap_or(false))
    }
}

impl FetchQueue {
    /// デフォルト設定でキューを作成
    pub fn new(store: Arc<dyn EmojiStore>, scraper: Arc<dyn EmojiScraper>) -> Self {
        Self::with_config(store, scraper, FetchQueueConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn EmojiStore>,
        scraper: Arc<dyn EmojiScraper>,
        config: FetchQueueConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::default()),
                store,
                scraper,
                config,
            }),
        }
    }

    /// 絵文字取得を要求する
    ///
    /// キューが上限に達している場合は積まずに即座に `EmojiError::QueueFull` を返す。
    /// ワーカーが停止中なら起動するため、tokioランタイム内で呼び出すこと。
    pub fn queue(&self, video_id: &str, channel_id: &str) -> Result<FetchTicket, EmojiError> {
        let (tx, rx) = oneshot::channel();

        let start_worker = {
            let mut state = self.inner.lock_state();
            if state.entries.len() >= self.inner.config.limit {
                log::warn!(
                    "Fetch queue full ({} entries), rejecting video {}",
                    state.entries.len(),
                    video_id
                );
                return Err(EmojiError::QueueFull {
                    limit: self.inner.config.limit,
                });
            }

            state
                .listeners
                .entry(video_id.to_string())
                .or_default()
                .push(tx);
            state.entries.push_back(QueueEntry {
                video_id: video_id.to_string(),
                channel_id: channel_id.to_string(),
            });

            let idle = !state.running;
            state.running = true;
            idle
        };

        if start_worker {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                inner.run().await;
            });
        }

        Ok(FetchTicket { rx })
    }

    /// 保存済みなら即座に `true`、未保存ならキューに積んで結果を待つ
    pub async fn ensure(&self, video_id: &str, channel_id: &str) -> Result<bool, EmojiError> {
        if self.inner.store.exists(channel_id).await {
            return Ok(true);
        }
        Ok(self.queue(video_id, channel_id)?.await)
    }

    /// 未処理のエントリ一覧（コピー）
    pub fn get_video_ids(&self) -> Vec<QueueEntry> {
        self.inner.lock_state().entries.iter().cloned().collect()
    }

    /// 未処理のエントリ数
    pub fn len(&self) -> usize {
        self.inner.lock_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// ワーカーが停止中か
    pub fn is_idle(&self) -> bool {
        !self.inner.lock_state().running
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        // ロック中にパニックする処理はないため、ポイズンされても状態は整合している
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn run(self: Arc<Self>) {
        log::debug!("Fetch queue worker started");

        loop {
            let next = self.lock_state().entries.pop_front();

            if let Some(entry) = next {
                let inner = Arc::clone(&self);
                let job = entry.clone();
                // 1件の失敗（パニック含む）でワーカーを止めない
                let ok = match tokio::spawn(async move { inner.process(&job).await }).await {
                    Ok(ok) => ok,
                    Err(e) => {
                        log::error!("Emoji fetch task for video {} failed: {}", entry.video_id, e);
                        false
                    }
                };
                self.notify(&entry.video_id, ok);
            }

            {
                let mut state = self.lock_state();
                if state.entries.is_empty() {
                    state.running = false;
                    break;
                }
            }

            tokio::time::sleep(self.config.step_delay).await;
        }

        log::debug!("Fetch queue worker idle");
    }

    async fn process(&self, entry: &QueueEntry) -> bool {
        if self.store.exists(&entry.channel_id).await {
            log::debug!(
                "Emojis for channel {} already stored, skipping video {}",
                entry.channel_id,
                entry.video_id
            );
            return true;
        }

        log::info!("Fetching emojis for video {}", entry.video_id);

        match self.scraper.fetch_emojis(&entry.video_id).await {
            Ok(Some(scraped)) if !scraped.emojis.is_empty() => {
                // スクレイピングで判明したチャンネルIDを正とする
                let channel_id =
                    if !scraped.channel_id.is_empty() && scraped.channel_id != entry.channel_id {
                        log::info!(
                            "Video {} belongs to channel {} (requested as {})",
                            entry.video_id,
                            scraped.channel_id,
                            entry.channel_id
                        );
                        scraped.channel_id.as_str()
                    } else {
                        entry.channel_id.as_str()
                    };

                match self.store.persist(channel_id, &scraped.emojis).await {
                    Ok(()) => {
                        log::info!(
                            "Stored {} emojis for channel {} (video {})",
                            scraped.emojis.len(),
                            channel_id,
                            entry.video_id
                        );
                        true
                    }
                    Err(e) => {
                        log::warn!("Failed to store emojis for channel {}: {}", channel_id, e);
                        false
                    }
                }
            }
            Ok(_) => {
                log::info!("No emojis found for video {}", entry.video_id);
                false
            }
            Err(e) => {
                log::warn!("Failed to fetch emojis for video {}: {}", entry.video_id, e);
                false
            }
        }
    }

    fn notify(&self, video_id: &str, ok: bool) {
        let listeners = self
            .lock_state()
            .listeners
            .remove(video_id)
            .unwrap_or_default();

        for listener in listeners {
            // 受信側が先に破棄されていても問題ない
            let _ = listener.send(ok);
        }
    }
}
