//! Caption overlays as FFmpeg `drawtext` filters.

use std::time::Duration;

use super::captions::CaptionCue;
use crate::config::VideoConfig;

/// Shown instead of a caption that cannot be drawn.
pub const PLACEHOLDER_CAPTION: &str = "…";

/// Text fill color; yellow reads well on most footage.
const FILL_COLOR: &str = "yellow";

/// Outline color drawn around each glyph.
const STROKE_COLOR: &str = "black";

/// Visual settings shared by every caption.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    pub font_file: String,
    pub font_size: u32,
    pub fill_color: String,
    pub stroke_color: String,
    pub stroke_width: u32,
    /// Characters per line before wrapping.
    pub wrap_chars: usize,
}

impl CaptionStyle {
    pub fn from_config(config: &VideoConfig) -> Self {
        Self {
            font_file: config.font_file.clone(),
            font_size: config.font_size,
            fill_color: FILL_COLOR.to_string(),
            stroke_color: STROKE_COLOR.to_string(),
            stroke_width: (config.font_size / 16).max(2),
            wrap_chars: config.wrap_chars,
        }
    }
}

/// Why a caption could not be turned into an overlay.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OverlayError {
    #[error("caption is empty")]
    EmptyText,
    #[error("caption contains unrenderable character {0:?}")]
    UnrenderableGlyph(char),
}

/// Characters the caption font cannot be expected to draw.
fn is_unrenderable(c: char) -> bool {
    if c.is_control() {
        return c != '\n';
    }
    matches!(c as u32,
        0xE000..=0xF8FF       // private use
        | 0xFE00..=0xFE0F     // variation selectors
        | 0x2600..=0x27BF     // misc symbols, dingbats
        | 0x1F000..=0x1FAFF   // emoji and pictographs
        | 0xF0000..=0x10FFFF) // supplementary private use
}

/// Break `text` into lines of at most `width` characters.
pub fn wrap_caption(text: &str, width: usize) -> String {
    let flattened = text.replace(['\r', '\n'], " ");
    let chars: Vec<char> = flattened.trim().chars().collect();
    if width == 0 {
        return chars.into_iter().collect();
    }
    chars
        .chunks(width)
        .map(|line| line.iter().collect::<String>().trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escape a value for use inside a quoted `drawtext` option.
///
/// Single quotes cannot appear inside the quoted section, so they become a
/// typographic apostrophe. Backslashes and colons are escaped for the option
/// parser.
pub fn escape_drawtext(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\'' => escaped.push('’'),
            '\\' => escaped.push_str("\\\\"),
            ':' => escaped.push_str("\\:"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn drawtext_filter(text: &str, start: Duration, end: Duration, style: &CaptionStyle) -> String {
    format!(
        "drawtext=fontfile='{}':text='{}':expansion=none:\
         fontsize={}:fontcolor={}:borderw={}:bordercolor={}:line_spacing={}:\
         x=(w-text_w)/2:y=h*5/6-text_h/2:\
         enable='between(t,{:.3},{:.3})'",
        escape_drawtext(&style.font_file),
        escape_drawtext(text),
        style.font_size,
        style.fill_color,
        style.stroke_width,
        style.stroke_color,
        style.font_size / 4,
        start.as_secs_f64(),
        end.as_secs_f64()
    )
}

/// Build the overlay filter for one cue.
///
/// Text is centered horizontally and sits mid-way through the lower third of the
/// frame, filled with a high contrast color and outlined, visible only during the cue.
pub fn render_overlay(cue: &CaptionCue, style: &CaptionStyle) -> Result<String, OverlayError> {
    if cue.text.trim().is_empty() {
        return Err(OverlayError::EmptyText);
    }
    if let Some(bad) = cue.text.chars().find(|c| is_unrenderable(*c)) {
        return Err(OverlayError::UnrenderableGlyph(bad));
    }

    let wrapped = wrap_caption(&cue.text, style.wrap_chars);
    Ok(drawtext_filter(&wrapped, cue.start, cue.end(), style))
}

/// Build overlays for every cue, swapping failures for a placeholder caption.
pub fn render_overlays(cues: &[CaptionCue], style: &CaptionStyle) -> Vec<String> {
    cues.iter()
        .enumerate()
        .map(|(i, cue)| {
            render_overlay(cue, style).unwrap_or_else(|e| {
                log::warn!("Caption {} replaced with placeholder: {}", i + 1, e);
                drawtext_filter(PLACEHOLDER_CAPTION, cue.start, cue.end(), style)
            })
        })
        .collect()
}
