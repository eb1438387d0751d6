//! FootageLocator - turns a model-written keyword into a footage URL.

use super::client::{PexelsClient, StockVideo, VideoFile};
use crate::config::PexelsConfig;

/// Characters removed from keywords before searching.
const STRIPPED_CHARS: &[char] = &[
    '[', ']', '(', ')', '{', '}', '<', '>', '「', '」', '『', '』', '【', '】', '（', '）', '"',
    '\'', '`', '“', '”', '‘', '’', '.', '。', '\n', '\r',
];

/// Separators after which the rest of the keyword is dropped.
const COMMA_CHARS: &[char] = &[',', '、', '，'];

/// Which search produced the asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FootageOrigin {
    /// The sanitized keyword matched.
    Primary,
    /// The keyword found nothing; the generic fallback term matched.
    Fallback,
    /// Neither search found anything.
    Placeholder,
}

/// A chosen footage file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootageAsset {
    pub url: String,
    /// Zero for the placeholder, whose width is unknown.
    pub width: u32,
    pub origin: FootageOrigin,
}

/// Clean up a keyword for use as a search query.
///
/// Brackets, quotes, periods and newlines are removed, only the text before the
/// first comma is kept and whitespace is trimmed. An empty result becomes
/// `default_term`.
pub fn sanitize_keyword(keyword: &str, default_term: &str) -> String {
    let stripped: String = keyword
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .collect();
    let first = stripped.split(COMMA_CHARS).next().unwrap_or("").trim();

    if first.is_empty() {
        default_term.to_string()
    } else {
        first.to_string()
    }
}

/// Pick the widest encoding. Among equal widths the last one listed wins.
pub fn select_widest(files: &[VideoFile]) -> Option<&VideoFile> {
    files
        .iter()
        .filter(|f| !f.link.is_empty())
        .max_by_key(|f| f.width.unwrap_or(0))
}

/// Widest encoding of the first search hit.
fn widest_of_first(videos: &[StockVideo]) -> Option<&VideoFile> {
    videos.first().and_then(|v| select_widest(&v.video_files))
}

/// Finds vertical stock footage for a keyword, always returning something.
pub struct FootageLocator<'a> {
    client: &'a PexelsClient,
    default_term: String,
    fallback_term: String,
    placeholder_url: String,
}

impl<'a> FootageLocator<'a> {
    pub fn new(client: &'a PexelsClient, config: &PexelsConfig) -> Self {
        Self {
            client,
            default_term: config.default_term.clone(),
            fallback_term: config.fallback_term.clone(),
            placeholder_url: config.placeholder_url.clone(),
        }
    }

    /// Locate footage for `keyword`.
    ///
    /// Searches the sanitized keyword, then the fallback term, then settles for
    /// the placeholder. Provider errors count as empty results.
    pub async fn locate(&self, keyword: &str) -> FootageAsset {
        let term = sanitize_keyword(keyword, &self.default_term);
        log::info!("Searching footage for '{}'", term);

        if let Some(file) = self.search_widest(&term).await {
            return asset(file, FootageOrigin::Primary);
        }

        log::warn!(
            "No footage for '{}', retrying with '{}'",
            term,
            self.fallback_term
        );
        if let Some(file) = self.search_widest(&self.fallback_term).await {
            return asset(file, FootageOrigin::Fallback);
        }

        log::warn!("Fallback search found nothing, using placeholder footage");
        FootageAsset {
            url: self.placeholder_url.clone(),
            width: 0,
            origin: FootageOrigin::Placeholder,
        }
    }

    async fn search_widest(&self, query: &str) -> Option<VideoFile> {
        match self.client.search_portrait(query).await {
            Ok(videos) => {
                let file = widest_of_first(&videos).cloned();
                if let Some(f) = &file {
                    log::debug!("Selected {}px encoding {}", f.width.unwrap_or(0), f.link);
                }
                file
            }
            Err(e) => {
                log::warn!("Footage search for '{}' failed: {}", query, e);
                None
            }
        }
    }
}

fn asset(file: VideoFile, origin: FootageOrigin) -> FootageAsset {
    FootageAsset {
        width: file.width.unwrap_or(0),
        url: file.link,
        origin,
    }
}
