//! End-to-end pipeline runs against mock providers.
//!
//! Gemini, Pexels and the footage download are served by one mock server; the
//! queue, narration and FFmpeg are in-memory fakes from `common`.

mod common;

use std::path::Path;
use std::time::Duration;

use tempfile::{tempdir, TempDir};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{
    config_for, empty_search_result, generation_reply, mount_models, search_result, FakeMedia,
    FakeSynthesizer, MemoryQueue,
};
use reelsmith::compose::{CaptionStyle, VideoComposer};
use reelsmith::config::Config;
use reelsmith::footage::{FootageOrigin, PexelsClient};
use reelsmith::gemini::GeminiClient;
use reelsmith::job::{JobPipeline, PipelineState, RunOutcome, Stage};
use reelsmith::queue::Column;

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";
const FLASH_ONLY: &[(&str, &[&str])] = &[("models/gemini-2.5-flash", &["generateContent"])];

type Pipeline = JobPipeline<MemoryQueue, FakeSynthesizer, FakeMedia>;

struct Harness {
    server: MockServer,
    config: Config,
    output: TempDir,
    scratch: TempDir,
}

impl Harness {
    async fn start() -> Self {
        let server = MockServer::start().await;
        let output = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let config = config_for(&server, output.path());
        Self {
            server,
            config,
            output,
            scratch,
        }
    }

    fn url(&self, p: &str) -> String {
        format!("{}{}", self.server.uri(), p)
    }

    fn queue_with_topic(&self, row: u32, topic: &str) -> MemoryQueue {
        let markers = &self.config.queue.status;
        MemoryQueue::new(markers)
            .with_row(2, "済んだ話題", &markers.completed)
            .with_row(row, topic, &markers.pending)
    }

    fn pipeline(&self, queue: MemoryQueue, media: FakeMedia) -> Pipeline {
        let gemini = GeminiClient::from_config(&self.config.gemini).unwrap();
        let pexels = PexelsClient::from_config(&self.config.pexels).unwrap();
        let composer = VideoComposer::new(
            FakeSynthesizer::new(),
            media,
            CaptionStyle::from_config(&self.config.video),
            self.config.video.output_dir.clone(),
        )
        .unwrap()
        .with_scratch_dir(self.scratch.path());
        JobPipeline::new(self.config.clone(), queue, gemini, pexels, composer)
    }

    async fn mount_reply(&self, text: &str) {
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(generation_reply(text)))
            .mount(&self.server)
            .await;
    }

    async fn mount_search(&self, query: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/videos/search"))
            .and(query_param("query", query))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    async fn mount_footage(&self, p: &str) {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake footage".to_vec()))
            .mount(&self.server)
            .await;
    }
}

fn media() -> FakeMedia {
    FakeMedia::new(Duration::from_secs(15), Duration::from_secs(48))
}

fn failure_markers(config: &Config) -> [String; 2] {
    [
        config.queue.status.script_failed.clone(),
        config.queue.status.compose_failed.clone(),
    ]
}

fn assert_scratch_empty(dir: &Path) {
    assert!(std::fs::read_dir(dir).unwrap().next().is_none());
}

#[tokio::test]
async fn test_topic_to_reel_records_every_result() {
    let h = Harness::start().await;
    mount_models(&h.server, FLASH_ONLY).await;
    h.mount_reply("台本内容###cat").await;
    h.mount_search(
        "cat",
        search_result(&[
            (&h.url("/footage/cat-720.mp4"), 720),
            (&h.url("/footage/cat-1080.mp4"), 1080),
        ]),
    )
    .await;
    h.mount_footage("/footage/cat-1080.mp4").await;

    let mut pipeline = h.pipeline(h.queue_with_topic(3, "猫の歴史"), media());
    let outcome = pipeline.run().await.unwrap();

    let expected_output = h.output.path().join("reel_row3.mp4");
    match outcome {
        RunOutcome::Completed {
            row,
            output,
            model,
            keyword,
            footage,
        } => {
            assert_eq!(row, 3);
            assert_eq!(output, expected_output);
            assert_eq!(model, "gemini-2.5-flash");
            assert_eq!(keyword, "cat");
            assert_eq!(footage.width, 1080);
            assert_eq!(footage.origin, FootageOrigin::Primary);
        }
        other => panic!("expected completion, got {:?}", other),
    }
    assert_eq!(pipeline.state(), PipelineState::Recorded);

    let queue = pipeline.queue();
    assert_eq!(queue.cell(3, Column::Script).as_deref(), Some("台本内容"));
    assert_eq!(queue.cell(3, Column::Keyword).as_deref(), Some("cat"));
    assert_eq!(
        queue.cell(3, Column::FootageUrl),
        Some(h.url("/footage/cat-1080.mp4"))
    );
    assert_eq!(
        queue.cell(3, Column::OutputPath),
        Some(expected_output.display().to_string())
    );
    assert_eq!(
        queue.cell(3, Column::Status).as_deref(),
        Some(h.config.queue.status.completed.as_str())
    );
    assert!(queue.writes().iter().all(|(row, _, _)| *row == 3));
    assert!(expected_output.exists());
    assert_scratch_empty(h.scratch.path());
}

#[tokio::test]
async fn test_reply_without_delimiter_uses_default_keyword() {
    let h = Harness::start().await;
    mount_models(&h.server, FLASH_ONLY).await;
    h.mount_reply("区切りのない台本です。").await;
    h.mount_search(
        "nature",
        search_result(&[(&h.url("/footage/nature.mp4"), 1080)]),
    )
    .await;
    h.mount_footage("/footage/nature.mp4").await;

    let mut pipeline = h.pipeline(h.queue_with_topic(4, "森の音"), media());
    pipeline.run().await.unwrap();

    let queue = pipeline.queue();
    assert_eq!(
        queue.cell(4, Column::Keyword),
        Some(h.config.script.default_keyword.clone())
    );
    assert_eq!(
        queue.cell(4, Column::Script).as_deref(),
        Some("区切りのない台本です。")
    );
    assert_eq!(queue.cell(4, Column::FootageUrl), Some(h.url("/footage/nature.mp4")));
}

#[tokio::test]
async fn test_overloaded_model_is_retried_until_it_answers() {
    let h = Harness::start().await;
    mount_models(&h.server, FLASH_ONLY).await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("The model is overloaded."))
        .up_to_n_times(2)
        .expect(2)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(generation_reply("三回目の台本###owl")))
        .expect(1)
        .mount(&h.server)
        .await;
    h.mount_search("owl", search_result(&[(&h.url("/footage/owl.mp4"), 720)]))
        .await;
    h.mount_footage("/footage/owl.mp4").await;

    let mut pipeline = h.pipeline(h.queue_with_topic(5, "フクロウ"), media());
    let outcome = pipeline.run().await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));

    let queue = pipeline.queue();
    assert_eq!(queue.cell(5, Column::Script).as_deref(), Some("三回目の台本"));
    let failures = failure_markers(&h.config);
    assert!(queue
        .writes_to(Column::Status)
        .iter()
        .all(|status| !failures.contains(status)));
}

#[tokio::test]
async fn test_empty_search_uses_fallback_footage() {
    let h = Harness::start().await;
    mount_models(&h.server, FLASH_ONLY).await;
    h.mount_reply("ウーパールーパーの話。###axolotl").await;
    h.mount_search("axolotl", empty_search_result()).await;
    h.mount_search(
        &h.config.pexels.fallback_term,
        search_result(&[(&h.url("/footage/cinematic.mp4"), 1080)]),
    )
    .await;
    h.mount_footage("/footage/cinematic.mp4").await;

    let mut pipeline = h.pipeline(h.queue_with_topic(6, "ウーパールーパー"), media());
    let outcome = pipeline.run().await.unwrap();

    match outcome {
        RunOutcome::Completed { footage, .. } => {
            assert_eq!(footage.origin, FootageOrigin::Fallback)
        }
        other => panic!("expected completion, got {:?}", other),
    }
    let recorded = pipeline.queue().cell(6, Column::FootageUrl).unwrap();
    assert_eq!(recorded, h.url("/footage/cinematic.mp4"));
    assert_ne!(recorded, h.config.pexels.placeholder_url);
}

#[tokio::test]
async fn test_no_pending_row_is_nothing_to_do() {
    let h = Harness::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let markers = &h.config.queue.status;
    let queue = MemoryQueue::new(markers)
        .with_row(2, "済んだ話題", &markers.completed)
        .with_row(3, "失敗した話題", &markers.compose_failed);
    let mut pipeline = h.pipeline(queue, media());

    let outcome = pipeline.run().await.unwrap();
    assert!(matches!(outcome, RunOutcome::NothingToDo));
    assert_eq!(pipeline.state(), PipelineState::Idle);
    assert!(pipeline.queue().writes().is_empty());
}

#[tokio::test]
async fn test_generation_failure_marks_script_failed() {
    let h = Harness::start().await;
    mount_models(&h.server, FLASH_ONLY).await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid argument"))
        .expect(1)
        .mount(&h.server)
        .await;

    let mut pipeline = h.pipeline(h.queue_with_topic(7, "失敗する話題"), media());
    let outcome = pipeline.run().await.unwrap();

    match outcome {
        RunOutcome::Failed { row, stage, error } => {
            assert_eq!(row, 7);
            assert_eq!(stage, Stage::Script);
            assert!(error.contains("400"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Script));

    let queue = pipeline.queue();
    assert_eq!(
        queue.writes(),
        vec![(7, Column::Status, h.config.queue.status.script_failed.clone())]
    );
}

#[tokio::test]
async fn test_render_failure_marks_compose_failed_and_keeps_earlier_results() {
    let h = Harness::start().await;
    mount_models(&h.server, FLASH_ONLY).await;
    h.mount_reply("壊れる動画。###glitch").await;
    h.mount_search("glitch", search_result(&[(&h.url("/footage/glitch.mp4"), 720)]))
        .await;
    h.mount_footage("/footage/glitch.mp4").await;

    let mut pipeline = h.pipeline(h.queue_with_topic(8, "壊れる話題"), media().failing_render());
    let outcome = pipeline.run().await.unwrap();

    assert!(matches!(
        outcome,
        RunOutcome::Failed {
            stage: Stage::Compose,
            ..
        }
    ));
    assert_eq!(pipeline.state(), PipelineState::Failed(Stage::Compose));

    let queue = pipeline.queue();
    assert_eq!(queue.cell(8, Column::Script).as_deref(), Some("壊れる動画。"));
    assert_eq!(queue.cell(8, Column::Keyword).as_deref(), Some("glitch"));
    assert_eq!(queue.cell(8, Column::FootageUrl), Some(h.url("/footage/glitch.mp4")));
    assert_eq!(queue.cell(8, Column::OutputPath), None);
    assert_eq!(
        queue.writes_to(Column::Status),
        vec![h.config.queue.status.compose_failed.clone()]
    );
    assert_scratch_empty(h.scratch.path());
}

#[tokio::test]
async fn test_listing_failure_still_generates_with_fallback_model() {
    let h = Harness::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;
    let fallback_path = format!(
        "/v1beta/models/{}:generateContent",
        h.config.gemini.fallback_model
    );
    Mock::given(method("POST"))
        .and(path(fallback_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(generation_reply("予備モデル。###rain")))
        .expect(1)
        .mount(&h.server)
        .await;
    h.mount_search("rain", search_result(&[(&h.url("/footage/rain.mp4"), 1080)]))
        .await;
    h.mount_footage("/footage/rain.mp4").await;

    let mut pipeline = h.pipeline(h.queue_with_topic(9, "雨"), media());
    match pipeline.run().await.unwrap() {
        RunOutcome::Completed { model, .. } => assert_eq!(model, h.config.gemini.fallback_model),
        other => panic!("expected completion, got {:?}", other),
    }
}
