//! Caption timing: split the script into sentences and give each an equal slice.

use std::time::Duration;

/// Characters that end a sentence.
const SENTENCE_TERMINATORS: &[char] = &['。', '.', '!', '?', '！', '？'];

/// One timed caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionCue {
    pub text: String,
    pub start: Duration,
    pub length: Duration,
}

impl CaptionCue {
    pub fn end(&self) -> Duration {
        self.start + self.length
    }
}

/// Split a script into sentence fragments.
///
/// Terminators are dropped along with blank fragments. A script with no
/// terminator (or only blank fragments) is returned whole as one fragment.
pub fn split_sentences(script: &str) -> Vec<String> {
    let fragments: Vec<String> = script
        .split(SENTENCE_TERMINATORS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if fragments.is_empty() {
        vec![script.trim().to_string()]
    } else {
        fragments
    }
}

/// Lay fragments end to end across `total`, each getting an equal share.
///
/// Boundaries are computed in whole nanoseconds, so cues are exactly contiguous
/// and their lengths add up to `total`.
pub fn build_cues(fragments: Vec<String>, total: Duration) -> Vec<CaptionCue> {
    let count = fragments.len() as u128;
    if count == 0 {
        return Vec::new();
    }

    let total_nanos = total.as_nanos();
    let boundary = |i: u128| -> Duration {
        let nanos = total_nanos * i / count;
        Duration::new((nanos / 1_000_000_000) as u64, (nanos % 1_000_000_000) as u32)
    };

    fragments
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let start = boundary(i as u128);
            let end = boundary(i as u128 + 1);
            CaptionCue {
                text,
                start,
                length: end - start,
            }
        })
        .collect()
}

/// Sentence cues for `script` spread over `total`.
pub fn plan_captions(script: &str, total: Duration) -> Vec<CaptionCue> {
    build_cues(split_sentences(script), total)
}
