/// APIキーをマスキングしてログ出力用の文字列を生成
///
/// APIキーの最初の4文字と最後の4文字のみを表示し、中間を***でマスキング
///
/// # Examples
/// ```
/// use yt_emoji_chat::util::mask_api_key;
///
/// let masked = mask_api_key("AIzaSyABC123def456GHI789");
/// assert_eq!(masked, "AIza***I789");
/// ```
pub fn mask_api_key(api_key: &str) -> String {
    let len = api_key.chars().count();
    if len <= 8 {
        // 短いキーは全体をマスク
        return "***".to_string();
    }

    let prefix: String = api_key.chars().take(4).collect();
    let suffix: String = api_key.chars().skip(len - 4).collect();
    format!("{}***{}", prefix, suffix)
}

/// プロフィール画像URLのサイズ指定を書き換える
///
/// YouTubeの画像URLは `=s16-` のようにサイズを埋め込んでいるため、
/// 取得時のサイズ（16px）を表示サイズに置き換える。
/// サイズ指定を含まないURLはそのまま返す。
///
/// # Examples
/// ```
/// use yt_emoji_chat::util::resize_profile_image_url;
///
/// let url = "https://yt4.ggpht.com/abc=s16-c-k-c0x00ffffff-no-rj";
/// assert_eq!(
///     resize_profile_image_url(url, 16, 32),
///     "https://yt4.ggpht.com/abc=s32-c-k-c0x00ffffff-no-rj"
/// );
/// ```
pub fn resize_profile_image_url(url: &str, from_size: u32, to_size: u32) -> String {
    let from = format!("=s{}-", from_size);
    let to = format!("=s{}-", to_size);
    url.replacen(&from, &to, 1)
}
