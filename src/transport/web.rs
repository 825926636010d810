//! Public channel web preview transport.
//!
//! Reads `https://t.me/s/<username>`, which lists the most recent posts of a
//! public channel and pages backwards with `?before=<id>`. Invite links need
//! an authenticated client and are reported as unreachable.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use rand::Rng;
use regex::Regex;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Node, Selector};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::time::sleep;
use url::Url;

use crate::config::TransportConfig;
use crate::content::{Media, Message};
use crate::error::{Error, Result};
use crate::transport::{Channel, ChannelRef, MessageStream, ProgressCallback, Transport};

macro_rules! selector {
    ($name:ident, $css:expr) => {
        static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

selector!(CHANNEL_TITLE, ".tgme_channel_info_header_title");
selector!(CHANNEL_USERNAME, ".tgme_channel_info_header_username");
selector!(CHANNEL_DESCRIPTION, ".tgme_channel_info_description");
selector!(CHANNEL_COUNTER, ".tgme_channel_info_counter");
selector!(COUNTER_VALUE, ".counter_value");
selector!(COUNTER_TYPE, ".counter_type");
selector!(POST, ".tgme_widget_message[data-post]");
selector!(POST_TEXT, ".tgme_widget_message_bubble > .tgme_widget_message_text");
selector!(POST_DATE, ".tgme_widget_message_date time[datetime]");
selector!(POST_FORWARDED, ".tgme_widget_message_forwarded_from");
selector!(POST_VIDEO, "video.tgme_widget_message_video");
selector!(POST_VIDEO_DURATION, ".message_video_duration");
selector!(POST_VOICE, "audio.tgme_widget_message_voice");
selector!(POST_PHOTO, ".tgme_widget_message_photo_wrap");
selector!(POST_DOCUMENT_TITLE, ".tgme_widget_message_document_title");
selector!(POST_DOCUMENT_EXTRA, ".tgme_widget_message_document_extra");
selector!(POST_LINK_PREVIEW, "a.tgme_widget_message_link_preview[href]");

static BACKGROUND_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"background-image:\s*url\(['"]?([^'")]+)['"]?\)"#).unwrap());

static HUMAN_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*(b|kb|mb|gb|tb)\s*$").unwrap());

/// A post as read from a preview page.
#[derive(Debug, Clone)]
pub(crate) struct WebPost {
    pub message: Message,
    /// Direct URL of the photo, video or voice note.
    pub media_url: Option<String>,
}

/// Everything read from one preview page.
#[derive(Debug, Default)]
pub(crate) struct ChannelPage {
    pub channel: Option<Channel>,
    /// Posts in page order (oldest first).
    pub posts: Vec<Result<WebPost>>,
    /// Smallest post ID on the page, used as the next `before` cursor.
    pub min_id: Option<i64>,
}

/// Transport over the public channel web preview.
pub struct WebTransport {
    client: Client,
    base_url: Url,
    page_delay_ms: (u64, u64),
}

impl WebTransport {
    /// Create a new web transport.
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: Url::parse(&config.base_url)?,
            page_delay_ms: (config.page_delay_min_ms, config.page_delay_max_ms),
        })
    }

    fn page_url(&self, username: &str, before: Option<i64>) -> Result<Url> {
        let mut url = self.base_url.join(&format!("s/{}", username))?;
        if let Some(before) = before {
            url.query_pairs_mut()
                .append_pair("before", &before.to_string());
        }
        Ok(url)
    }

    /// Fetch a page and return its body, or `None` when the preview is unavailable.
    async fn get_page(&self, url: Url) -> Result<Option<String>> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        tracing::debug!("Response status: {}", status);

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::ChannelUnreachable("rate limited".into()));
        }

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            return Err(Error::MessageFetch(format!("HTTP {} for {}", status, url)));
        }

        // Channels without a public preview redirect to the plain profile page.
        if url.path().starts_with("/s/") && !response.url().path().starts_with("/s/") {
            tracing::debug!("Preview redirected to {}", response.url());
            return Ok(None);
        }

        Ok(Some(response.text().await?))
    }

    async fn fetch_page(&self, username: &str, before: Option<i64>) -> Result<ChannelPage> {
        let url = self.page_url(username, before)?;
        match self.get_page(url).await? {
            Some(body) => Ok(parse_channel_page(&body)),
            None => Err(Error::ChannelUnreachable(format!(
                "@{} has no public preview",
                username
            ))),
        }
    }

    async fn polite_delay(&self) {
        let (min, max) = self.page_delay_ms;
        let delay_ms = rand::thread_rng().gen_range(min..=max);
        sleep(Duration::from_millis(delay_ms)).await;
    }

    /// Look up the direct media URL of a single post.
    async fn media_url(&self, username: &str, message_id: i64) -> Result<String> {
        let mut url = self.base_url.join(&format!("{}/{}", username, message_id))?;
        url.query_pairs_mut().append_pair("embed", "1");

        let body = self
            .get_page(url)
            .await?
            .ok_or_else(|| Error::DownloadFailed(format!("Post {} not found", message_id)))?;

        let page = parse_channel_page(&body);
        let post = page
            .posts
            .into_iter()
            .filter_map(|post| post.ok())
            .find(|post| post.message.id == message_id)
            .ok_or_else(|| Error::DownloadFailed(format!("Post {} not found", message_id)))?;

        post.media_url.ok_or_else(|| {
            Error::DownloadFailed(format!(
                "Post {} has no media available on the web preview",
                message_id
            ))
        })
    }
}

struct PageCursor {
    before: Option<i64>,
    buffer: VecDeque<Result<Message>>,
    remaining: usize,
    first_page: bool,
    exhausted: bool,
}

#[async_trait]
impl Transport for WebTransport {
    fn name(&self) -> &'static str {
        "web"
    }

    async fn connect(&self) -> Result<bool> {
        let response = self
            .client
            .get(self.base_url.clone())
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Cannot reach {}: {}", self.base_url, e)))?;

        Ok(response.status().is_success() || response.status().is_redirection())
    }

    async fn resolve_channel(&self, channel: &ChannelRef) -> Result<Option<Channel>> {
        let username = match channel {
            ChannelRef::Public { username } => username,
            ChannelRef::Invite { .. } => {
                tracing::warn!("Invite links need an authenticated client: {}", channel);
                return Ok(None);
            }
        };

        let url = self.page_url(username, None)?;
        let Some(body) = self.get_page(url).await? else {
            return Ok(None);
        };

        let page = parse_channel_page(&body);
        Ok(page.channel.map(|mut resolved| {
            if resolved.username.is_none() {
                resolved.username = Some(username.clone());
                resolved.is_private = false;
            }
            resolved
        }))
    }

    fn iter_messages<'a>(&'a self, channel: &'a Channel, limit: usize) -> MessageStream<'a> {
        let Some(username) = channel.username.clone() else {
            let err = Error::ChannelUnreachable(format!("{} has no public username", channel.title));
            return Box::pin(stream::once(async move { Err(err) }));
        };

        let cursor = PageCursor {
            before: None,
            buffer: VecDeque::new(),
            remaining: limit,
            first_page: true,
            exhausted: false,
        };

        stream::unfold(cursor, move |mut cursor| {
            let username = username.clone();
            async move {
                loop {
                    if cursor.remaining == 0 {
                        return None;
                    }

                    if let Some(item) = cursor.buffer.pop_front() {
                        cursor.remaining -= 1;
                        return Some((item, cursor));
                    }

                    if cursor.exhausted {
                        return None;
                    }

                    if !cursor.first_page {
                        self.polite_delay().await;
                    }
                    cursor.first_page = false;

                    let page = match self.fetch_page(&username, cursor.before).await {
                        Ok(page) => page,
                        Err(e) => {
                            cursor.exhausted = true;
                            return Some((Err(e), cursor));
                        }
                    };

                    match page.min_id {
                        Some(min_id) if cursor.before.map_or(true, |b| min_id < b) && min_id > 1 => {
                            cursor.before = Some(min_id);
                        }
                        _ => cursor.exhausted = true,
                    }

                    // Pages list posts oldest first.
                    cursor.buffer.extend(
                        page.posts
                            .into_iter()
                            .rev()
                            .map(|post| post.map(|post| post.message)),
                    );

                    if cursor.buffer.is_empty() {
                        cursor.exhausted = true;
                    }
                }
            }
        })
        .boxed()
    }

    async fn fetch_media(
        &self,
        channel: &Channel,
        message_id: i64,
        destination: &Path,
        progress: &ProgressCallback,
    ) -> Result<()> {
        let username = channel.username.as_deref().ok_or_else(|| {
            Error::DownloadFailed(format!("{} has no public username", channel.title))
        })?;

        let media_url = self.media_url(username, message_id).await?;
        tracing::debug!("Downloading {} from {}", message_id, media_url);

        let response = self.client.get(&media_url).send().await?;
        if !response.status().is_success() {
            return Err(Error::DownloadFailed(format!(
                "Failed to download file: HTTP {}",
                response.status()
            )));
        }

        let total = response.content_length();
        let mut file = File::create(destination).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::DownloadFailed(format!("Stream error: {}", e)))?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            progress(downloaded, total);
        }

        file.flush().await?;
        Ok(())
    }
}

/// Parse a channel preview (or embed) page.
pub(crate) fn parse_channel_page(html: &str) -> ChannelPage {
    let document = Html::parse_document(html);

    let channel = parse_channel_info(&document);

    let mut min_id: Option<i64> = None;
    let posts = document
        .select(&POST)
        .map(|element| {
            let post = parse_post(element);
            if let Ok(post) = &post {
                min_id = Some(min_id.map_or(post.message.id, |m| m.min(post.message.id)));
            }
            post
        })
        .collect();

    ChannelPage {
        channel,
        posts,
        min_id,
    }
}

fn parse_channel_info(document: &Html) -> Option<Channel> {
    let title = first_text(document.root_element(), &CHANNEL_TITLE)?;
    let username = first_text(document.root_element(), &CHANNEL_USERNAME)
        .map(|name| name.trim_start_matches('@').to_string())
        .filter(|name| !name.is_empty());
    let description = document
        .select(&CHANNEL_DESCRIPTION)
        .next()
        .map(rich_text)
        .filter(|text| !text.is_empty());

    let members_count = document.select(&CHANNEL_COUNTER).find_map(|counter| {
        let kind = first_text(counter, &COUNTER_TYPE)?;
        if !matches!(
            kind.as_str(),
            "subscriber" | "subscribers" | "member" | "members"
        ) {
            return None;
        }
        parse_counter(&first_text(counter, &COUNTER_VALUE)?)
    });

    Some(Channel {
        id: None,
        title,
        is_private: username.is_none(),
        username,
        members_count,
        description,
    })
}

fn parse_post(element: ElementRef<'_>) -> Result<WebPost> {
    let data_post = element.value().attr("data-post").unwrap_or_default();
    let id = data_post
        .rsplit('/')
        .next()
        .and_then(|id| id.parse::<i64>().ok())
        .ok_or_else(|| Error::ExtractionSkip {
            message_id: None,
            reason: format!("invalid post reference '{}'", data_post),
        })?;

    let date = element
        .select(&POST_DATE)
        .next()
        .and_then(|time| time.value().attr("datetime"))
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| Error::ExtractionSkip {
            message_id: Some(id),
            reason: "missing or invalid date".to_string(),
        })?;

    let text = element
        .select(&POST_TEXT)
        .next()
        .map(rich_text)
        .filter(|text| !text.is_empty());

    let (media, media_url) = parse_post_media(element);

    Ok(WebPost {
        message: Message {
            id,
            text,
            media,
            date,
            forwarded: element.select(&POST_FORWARDED).next().is_some(),
        },
        media_url,
    })
}

fn parse_post_media(element: ElementRef<'_>) -> (Option<Media>, Option<String>) {
    if let Some(video) = element.select(&POST_VIDEO).next() {
        let duration_secs = first_text(element, &POST_VIDEO_DURATION)
            .as_deref()
            .and_then(parse_clock);
        return (
            Some(Media::Document {
                file_name: None,
                mime_type: Some("video/mp4".to_string()),
                size: None,
                duration_secs,
            }),
            video.value().attr("src").map(str::to_string),
        );
    }

    if let Some(voice) = element.select(&POST_VOICE).next() {
        return (
            Some(Media::Document {
                file_name: None,
                mime_type: Some("audio/ogg".to_string()),
                size: None,
                duration_secs: None,
            }),
            voice.value().attr("src").map(str::to_string),
        );
    }

    if let Some(photo) = element.select(&POST_PHOTO).next() {
        let url = photo
            .value()
            .attr("style")
            .and_then(|style| BACKGROUND_URL.captures(style))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        return (Some(Media::Photo { size: None }), url);
    }

    if let Some(file_name) = first_text(element, &POST_DOCUMENT_TITLE) {
        let size = first_text(element, &POST_DOCUMENT_EXTRA)
            .as_deref()
            .and_then(parse_human_size);
        let mime_type = mime_guess::from_path(&file_name)
            .first()
            .map(|mime| mime.essence_str().to_string());
        return (
            Some(Media::Document {
                file_name: Some(file_name),
                mime_type,
                size,
                duration_secs: None,
            }),
            None,
        );
    }

    if let Some(link) = element.select(&POST_LINK_PREVIEW).next() {
        if let Some(href) = link.value().attr("href") {
            return (
                Some(Media::WebPage {
                    url: href.to_string(),
                }),
                None,
            );
        }
    }

    (None, None)
}

fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Text content with `<br>` rendered as line breaks.
fn rich_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(fragment) => text.push_str(fragment),
            Node::Element(el) if el.name() == "br" => text.push('\n'),
            _ => {}
        }
    }
    text.trim().to_string()
}

/// Parse `"12.3K"`-style counters.
fn parse_counter(raw: &str) -> Option<u64> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let (number, multiplier) = match cleaned.chars().last()? {
        'K' | 'k' => (&cleaned[..cleaned.len() - 1], 1_000.0),
        'M' | 'm' => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };
    let value: f64 = number.parse().ok()?;
    Some((value * multiplier).round() as u64)
}

/// Parse `"1.2 GB"`-style sizes into bytes.
fn parse_human_size(raw: &str) -> Option<u64> {
    let caps = HUMAN_SIZE.captures(raw)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let multiplier = match caps.get(2)?.as_str().to_lowercase().as_str() {
        "b" => 1u64,
        "kb" => 1 << 10,
        "mb" => 1 << 20,
        "gb" => 1 << 30,
        "tb" => 1 << 40,
        _ => return None,
    };
    Some((value * multiplier as f64).round() as u64)
}

/// Parse `"1:02:03"` or `"0:45"` into seconds.
fn parse_clock(raw: &str) -> Option<u64> {
    raw.trim()
        .split(':')
        .try_fold(0u64, |acc, part| Some(acc * 60 + part.parse::<u64>().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Media;

    const PAGE: &str = r#"
<html><body>
<div class="tgme_channel_info">
  <div class="tgme_channel_info_header">
    <div class="tgme_channel_info_header_title"><span dir="auto">Filmes HD</span></div>
    <div class="tgme_channel_info_header_username"><a href="https://t.me/filmes_hd">@filmes_hd</a></div>
  </div>
  <div class="tgme_channel_info_counters">
    <div class="tgme_channel_info_counter"><span class="counter_value">12.3K</span> <span class="counter_type">subscribers</span></div>
    <div class="tgme_channel_info_counter"><span class="counter_value">850</span> <span class="counter_type">photos</span></div>
  </div>
  <div class="tgme_channel_info_description">Os melhores filmes<br/>todo dia</div>
</div>
<div class="tgme_widget_message_wrap">
  <div class="tgme_widget_message js-widget_message" data-post="filmes_hd/10">
    <div class="tgme_widget_message_bubble">
      <a class="tgme_widget_message_photo_wrap" href="https://t.me/filmes_hd/10" style="width:800px;background-image:url('https://cdn.example.org/file/photo10.jpg')"></a>
      <div class="tgme_widget_message_text js-message_text" dir="auto">Cartaz do dia<br/>indexado por @filmes_hd</div>
      <div class="tgme_widget_message_footer">
        <a class="tgme_widget_message_date" href="https://t.me/filmes_hd/10"><time datetime="2024-03-01T10:00:00+00:00" class="time">10:00</time></a>
      </div>
    </div>
  </div>
</div>
<div class="tgme_widget_message_wrap">
  <div class="tgme_widget_message js-widget_message" data-post="filmes_hd/11">
    <div class="tgme_widget_message_bubble">
      <div class="tgme_widget_message_forwarded_from">Forwarded from <a href="https://t.me/outro">Outro</a></div>
      <a class="tgme_widget_message_video_player" href="https://t.me/filmes_hd/11">
        <video src="https://cdn.example.org/file/video11.mp4" class="tgme_widget_message_video js-message_video"></video>
        <time class="message_video_duration js-message_video_duration">1:02:03</time>
      </a>
      <div class="tgme_widget_message_text js-message_text" dir="auto">O Filme<br/>Tamanho: 1.5GB</div>
      <div class="tgme_widget_message_footer">
        <a class="tgme_widget_message_date" href="https://t.me/filmes_hd/11"><time datetime="2024-03-02T10:00:00+00:00" class="time">10:00</time></a>
      </div>
    </div>
  </div>
</div>
<div class="tgme_widget_message_wrap">
  <div class="tgme_widget_message js-widget_message" data-post="filmes_hd/12">
    <div class="tgme_widget_message_bubble">
      <div class="tgme_widget_message_document_wrap">
        <div class="tgme_widget_message_document_title" dir="auto">curso.zip</div>
        <div class="tgme_widget_message_document_extra" dir="auto">2 GB</div>
      </div>
      <div class="tgme_widget_message_footer">
        <a class="tgme_widget_message_date" href="https://t.me/filmes_hd/12"><time datetime="2024-03-03T10:00:00+00:00" class="time">10:00</time></a>
      </div>
    </div>
  </div>
</div>
<div class="tgme_widget_message_wrap">
  <div class="tgme_widget_message js-widget_message" data-post="filmes_hd/13">
    <div class="tgme_widget_message_bubble">
      <div class="tgme_widget_message_text js-message_text" dir="auto">sem data</div>
    </div>
  </div>
</div>
</body></html>
"#;

    #[test]
    fn test_parse_channel_info() {
        let page = parse_channel_page(PAGE);
        let channel = page.channel.unwrap();

        assert_eq!(channel.title, "Filmes HD");
        assert_eq!(channel.username.as_deref(), Some("filmes_hd"));
        assert!(!channel.is_private);
        assert_eq!(channel.members_count, Some(12_300));
        assert_eq!(
            channel.description.as_deref(),
            Some("Os melhores filmes\ntodo dia")
        );
    }

    #[test]
    fn test_parse_posts() {
        let page = parse_channel_page(PAGE);
        assert_eq!(page.posts.len(), 4);
        assert_eq!(page.min_id, Some(10));

        let photo = page.posts[0].as_ref().unwrap();
        assert_eq!(photo.message.id, 10);
        assert_eq!(
            photo.message.text.as_deref(),
            Some("Cartaz do dia\nindexado por @filmes_hd")
        );
        assert_eq!(photo.message.media, Some(Media::Photo { size: None }));
        assert_eq!(
            photo.media_url.as_deref(),
            Some("https://cdn.example.org/file/photo10.jpg")
        );

        let video = page.posts[1].as_ref().unwrap();
        assert!(video.message.forwarded);
        assert_eq!(
            video.message.media,
            Some(Media::Document {
                file_name: None,
                mime_type: Some("video/mp4".into()),
                size: None,
                duration_secs: Some(3723),
            })
        );

        let document = page.posts[2].as_ref().unwrap();
        match &document.message.media {
            Some(Media::Document {
                file_name, size, ..
            }) => {
                assert_eq!(file_name.as_deref(), Some("curso.zip"));
                assert_eq!(*size, Some(2 * (1 << 30)));
            }
            other => panic!("unexpected media: {:?}", other),
        }
        assert_eq!(document.message.text, None);
        assert!(document.media_url.is_none());
    }

    #[test]
    fn test_post_without_date_is_skipped() {
        let page = parse_channel_page(PAGE);
        match &page.posts[3] {
            Err(Error::ExtractionSkip { message_id, .. }) => assert_eq!(*message_id, Some(13)),
            other => panic!("expected skip, got {:?}", other.as_ref().map(|p| p.message.id)),
        }
    }

    #[test]
    fn test_page_without_channel_header() {
        let page = parse_channel_page("<html><body><p>nothing</p></body></html>");
        assert!(page.channel.is_none());
        assert!(page.posts.is_empty());
        assert_eq!(page.min_id, None);
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_counter("12.3K"), Some(12_300));
        assert_eq!(parse_counter("1.5M"), Some(1_500_000));
        assert_eq!(parse_counter("850"), Some(850));
        assert_eq!(parse_counter("n/a"), None);

        assert_eq!(parse_human_size("512 KB"), Some(512 * 1024));
        assert_eq!(parse_human_size("1.5 MB"), Some(1_572_864));
        assert_eq!(parse_human_size("big"), None);

        assert_eq!(parse_clock("0:45"), Some(45));
        assert_eq!(parse_clock("1:02:03"), Some(3723));
        assert_eq!(parse_clock("x:10"), None);
    }

    #[test]
    fn test_page_url() {
        let transport = WebTransport::new(&TransportConfig::default()).unwrap();
        assert_eq!(
            transport.page_url("filmes_hd", None).unwrap().as_str(),
            "https://t.me/s/filmes_hd"
        );
        assert_eq!(
            transport.page_url("filmes_hd", Some(120)).unwrap().as_str(),
            "https://t.me/s/filmes_hd?before=120"
        );
    }
}
