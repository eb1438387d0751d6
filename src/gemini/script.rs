//! Script generation: prompt the model, split the reply into narration and keyword.

use std::time::Duration;

use super::client::{GeminiClient, GeminiError};
use super::retry::linear_backoff;
use crate::config::{GeminiConfig, ScriptConfig};

/// Narration script plus the footage search keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub script: String,
    pub keyword: String,
}

/// Split a model reply on the first `delimiter`.
///
/// Both halves are kept verbatim. Without a delimiter the whole reply is the
/// script and `default_keyword` is used.
pub fn parse_reply(reply: &str, delimiter: &str, default_keyword: &str) -> GenerationResult {
    let split = if delimiter.is_empty() {
        None
    } else {
        reply.split_once(delimiter)
    };

    match split {
        Some((script, keyword)) => GenerationResult {
            script: script.to_string(),
            keyword: keyword.to_string(),
        },
        None => GenerationResult {
            script: reply.to_string(),
            keyword: default_keyword.to_string(),
        },
    }
}

/// Second marks where each of the four acts starts and ends.
///
/// Hook takes the first twelfth, the first body runs to 5/12, the twist to 10/12,
/// the outro to the end. 60s gives `[0, 5, 25, 50, 60]`.
pub fn act_boundaries(duration_secs: u32) -> [u32; 5] {
    // u64 so large durations cannot overflow; each mark is at most duration_secs.
    let at = |twelfths: u64| ((u64::from(duration_secs) * twelfths + 6) / 12) as u32;
    [0, at(1), at(5), at(10), duration_secs]
}

/// Build the single prompt sent for a topic.
pub fn build_prompt(topic: &str, settings: &ScriptConfig) -> String {
    let [t0, t1, t2, t3, t4] = act_boundaries(settings.duration_secs);
    format!(
        "あなたはTikTokで人気のショート動画の構成作家です。\n\
         テーマ「{topic}」について、{lang}で読み上げる{duration}秒の、視聴者を惹きつけるナレーション台本を書いてください。\n\
         \n\
         【構成】必ず次の4部構成にし、各パートの先頭に時間の目安を書いてください。\n\
         [{t0}〜{t1}秒] フック：視聴者の手を止める一言\n\
         [{t1}〜{t2}秒] 本題1：テーマの核心\n\
         [{t2}〜{t3}秒] 展開・本題2：意外な事実やどんでん返し\n\
         [{t3}〜{t4}秒] まとめ：印象に残る締めの一言\n\
         \n\
         【出力形式】\n\
         台本を書き終えたら区切り記号「{delim}」を1回だけ書き、その後に背景動画の検索に使う簡単な{kw_lang}の単語を1つだけ書いてください。\n\
         前置きや説明は書かないでください。",
        topic = topic.trim(),
        lang = settings.narration_language,
        duration = settings.duration_secs,
        delim = settings.delimiter,
        kw_lang = settings.keyword_language,
    )
}

/// Turns a topic into a narration script and a search keyword.
pub struct ScriptGenerator<'a> {
    client: &'a GeminiClient,
    settings: &'a ScriptConfig,
    max_attempts: u32,
    backoff_step: Duration,
}

impl<'a> ScriptGenerator<'a> {
    pub fn new(client: &'a GeminiClient, settings: &'a ScriptConfig, gemini: &GeminiConfig) -> Self {
        Self {
            client,
            settings,
            max_attempts: gemini.max_attempts.max(1),
            backoff_step: gemini.backoff_step(),
        }
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, max_attempts: u32, backoff_step: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff_step = backoff_step;
        self
    }

    /// Generate a script for `topic` with `model`.
    ///
    /// Overload replies are retried up to the configured attempt count with a
    /// linearly growing delay. Any other failure is returned at once.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::EmptyTopic` for a blank topic,
    /// `GeminiError::RetriesExhausted` when every attempt was overloaded,
    /// or the first non-overload error.
    pub async fn generate(&self, topic: &str, model: &str) -> Result<GenerationResult, GeminiError> {
        if topic.trim().is_empty() {
            return Err(GeminiError::EmptyTopic);
        }

        let prompt = build_prompt(topic, self.settings);
        log::info!("Generating script for '{}' with {}", topic.trim(), model);

        for attempt in 1..=self.max_attempts {
            match self.client.generate_content(model, &prompt).await {
                Ok(reply) => {
                    let result =
                        parse_reply(&reply, &self.settings.delimiter, &self.settings.default_keyword);
                    log::info!(
                        "Script ready ({} chars), keyword '{}'",
                        result.script.chars().count(),
                        result.keyword.trim()
                    );
                    return Ok(result);
                }
                Err(GeminiError::Overloaded { .. }) => {
                    if attempt >= self.max_attempts {
                        log::error!("Model overloaded after {} attempts. Giving up.", attempt);
                        break;
                    }
                    let delay = linear_backoff(attempt, self.backoff_step);
                    log::info!(
                        "Overloaded (attempt {}/{}). Retrying in {:?}...",
                        attempt,
                        self.max_attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(GeminiError::RetriesExhausted {
            attempts: self.max_attempts,
        })
    }
}
