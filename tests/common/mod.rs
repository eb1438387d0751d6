//! Shared fakes for integration tests: an in-memory queue, a synthesizer
//! that writes a fixed payload, and a media toolkit that never runs FFmpeg.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reelsmith::compose::{MediaError, MediaToolkit, RenderPlan};
use reelsmith::config::{Config, StatusMarkers};
use reelsmith::narration::{NarrationError, NarrationSynthesizer};
use reelsmith::queue::{Column, Job, JobQueue, QueueError, QueueLookup};

// ==================== Queue ====================

/// Sheet rows held in memory; row 1 is the header.
pub struct MemoryQueue {
    rows: Mutex<HashMap<u32, HashMap<Column, String>>>,
    writes: Mutex<Vec<(u32, Column, String)>>,
    pending_marker: String,
}

impl MemoryQueue {
    pub fn new(markers: &StatusMarkers) -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
            pending_marker: markers.pending.clone(),
        }
    }

    /// Add a row with a topic and status.
    pub fn with_row(self, row: u32, topic: &str, status: &str) -> Self {
        {
            let mut rows = self.rows.lock().unwrap();
            let cells = rows.entry(row).or_default();
            cells.insert(Column::Topic, topic.to_string());
            cells.insert(Column::Status, status.to_string());
        }
        self
    }

    pub fn cell(&self, row: u32, column: Column) -> Option<String> {
        self.rows
            .lock()
            .unwrap()
            .get(&row)
            .and_then(|cells| cells.get(&column).cloned())
    }

    pub fn writes(&self) -> Vec<(u32, Column, String)> {
        self.writes.lock().unwrap().clone()
    }

    /// Every value written to `column`, in order.
    pub fn writes_to(&self, column: Column) -> Vec<String> {
        self.writes()
            .into_iter()
            .filter(|(_, c, _)| *c == column)
            .map(|(_, _, v)| v)
            .collect()
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn find_pending(&self) -> QueueLookup {
        let rows = self.rows.lock().unwrap();
        let mut row_numbers: Vec<u32> = rows.keys().copied().collect();
        row_numbers.sort_unstable();
        for row in row_numbers {
            let cells = &rows[&row];
            if cells.get(&Column::Status) == Some(&self.pending_marker) {
                let topic = cells.get(&Column::Topic).cloned().unwrap_or_default();
                return QueueLookup::JobFound(Job { topic, row });
            }
        }
        QueueLookup::NoJobPending
    }

    async fn read_cell(&self, row: u32, column: Column) -> Result<String, QueueError> {
        Ok(self.cell(row, column).unwrap_or_default())
    }

    async fn write_cell(&self, row: u32, column: Column, value: &str) -> Result<(), QueueError> {
        self.rows
            .lock()
            .unwrap()
            .entry(row)
            .or_default()
            .insert(column, value.to_string());
        self.writes
            .lock()
            .unwrap()
            .push((row, column, value.to_string()));
        Ok(())
    }
}

// ==================== Narration ====================

/// Writes a fixed payload instead of calling a speech service.
pub struct FakeSynthesizer {
    pub fail: bool,
    pub texts: Mutex<Vec<String>>,
}

impl FakeSynthesizer {
    pub fn new() -> Self {
        Self {
            fail: false,
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            texts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl NarrationSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, dest: &Path) -> Result<(), NarrationError> {
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(NarrationError::ApiError {
                status: 500,
                message: "speech service down".to_string(),
            });
        }
        tokio::fs::write(dest, b"ID3 fake narration").await?;
        Ok(())
    }
}

// ==================== Media ====================

/// What the fake saw when `render` was called.
#[derive(Debug, Clone)]
pub struct RenderCall {
    pub plan: RenderPlan,
    pub footage_existed: bool,
    pub narration_existed: bool,
    pub footage_bytes: Vec<u8>,
}

/// Measures by file extension and records render plans instead of encoding.
pub struct FakeMedia {
    pub footage_length: Duration,
    pub narration_length: Duration,
    pub fail_render: bool,
    pub measured: Mutex<Vec<PathBuf>>,
    pub renders: Mutex<Vec<RenderCall>>,
}

impl FakeMedia {
    pub fn new(footage_length: Duration, narration_length: Duration) -> Self {
        Self {
            footage_length,
            narration_length,
            fail_render: false,
            measured: Mutex::new(Vec::new()),
            renders: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_render(mut self) -> Self {
        self.fail_render = true;
        self
    }

    pub fn last_render(&self) -> Option<RenderCall> {
        self.renders.lock().unwrap().last().cloned()
    }

    pub fn measured_paths(&self) -> Vec<PathBuf> {
        self.measured.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaToolkit for FakeMedia {
    async fn media_duration(&self, path: &Path) -> Result<Duration, MediaError> {
        self.measured.lock().unwrap().push(path.to_path_buf());
        match path.extension().and_then(|e| e.to_str()) {
            Some("mp3") => Ok(self.narration_length),
            _ => Ok(self.footage_length),
        }
    }

    async fn render(&self, plan: &RenderPlan) -> Result<(), MediaError> {
        let footage_bytes = std::fs::read(&plan.footage).unwrap_or_default();
        self.renders.lock().unwrap().push(RenderCall {
            plan: plan.clone(),
            footage_existed: plan.footage.exists(),
            narration_existed: plan.narration.exists(),
            footage_bytes,
        });
        if self.fail_render {
            return Err(MediaError::ProcessFailed {
                exit_code: Some(1),
                stderr: "Invalid data found when processing input".to_string(),
            });
        }
        std::fs::write(&plan.output, b"fake mp4").map_err(MediaError::SpawnFailed)?;
        Ok(())
    }
}

// ==================== Providers ====================

/// Config pointing every HTTP provider at `server`, with millisecond back-off.
pub fn config_for(server: &MockServer, output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.gemini.api_key = Some("gemini-key".to_string());
    config.gemini.base_url = server.uri();
    config.gemini.backoff_step_secs = 0.001;
    config.pexels.api_key = Some("pexels-key".to_string());
    config.pexels.base_url = server.uri();
    config.narration.base_url = server.uri();
    config.video.output_dir = output_dir.to_path_buf();
    config
}

/// Mount a model listing with the given `(name, methods)` pairs.
pub async fn mount_models(server: &MockServer, models: &[(&str, &[&str])]) {
    let models: Vec<_> = models
        .iter()
        .map(|(name, methods)| json!({ "name": name, "supportedGenerationMethods": methods }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": models })))
        .mount(server)
        .await;
}

/// Body of a successful `generateContent` reply.
pub fn generation_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [
            { "content": { "role": "model", "parts": [ { "text": text } ] } }
        ]
    })
}

/// Body of a footage search result with one video and the given encodings.
pub fn search_result<S: AsRef<str>>(files: &[(S, u32)]) -> serde_json::Value {
    let files: Vec<_> = files
        .iter()
        .map(|(link, width)| {
            json!({ "link": AsRef::<str>::as_ref(link), "width": width, "height": width * 16 / 9 })
        })
        .collect();
    json!({ "page": 1, "per_page": 1, "videos": [ { "id": 1, "video_files": files } ] })
}

pub fn empty_search_result() -> serde_json::Value {
    json!({ "page": 1, "per_page": 1, "videos": [], "total_results": 0 })
}
