//! Orchestration tests against the scripted toolchain.
//!
//! Each scripted encode writes `encode <inputs>` to its output, each burn-in
//! appends a marker, and concat joins the listed files, so the final file's
//! content records exactly which segments went in and in what order.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use slideweave_common::error::SlideweaveError;
use slideweave_project_model::SegmentSpec;
use slideweave_render_engine::sequence::CONCAT_LIST_NAME;
use slideweave_render_engine::{
    SegmentStage, SequenceSynthesizer, SynthesisOptions, SynthesisStage, SynthesisWarning,
};
use slideweave_subtitles::FontSource;
use slideweave_toolchain::mock::{ScriptedToolchain, ToolKind, BURN_IN_MARKER};
use slideweave_toolchain::MediaInfo;

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root().join("inputs").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    fn segment(&self, n: usize) -> SegmentSpec {
        SegmentSpec::new(
            self.file(&format!("slide{n}.png"), "png"),
            self.file(&format!("narration{n}.mp3"), "mp3"),
        )
    }

    fn output(&self) -> PathBuf {
        self.root().join("output").join("final.mp4")
    }

    fn temp_dir(&self) -> PathBuf {
        self.root().join("temp")
    }

    fn temp_entries(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.temp_dir()) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

fn options() -> SynthesisOptions {
    SynthesisOptions {
        font: Some(FontSource::Family("Arial".to_string())),
        ..SynthesisOptions::default()
    }
}

fn synthesizer(toolchain: &Arc<ScriptedToolchain>, options: SynthesisOptions) -> SequenceSynthesizer {
    SequenceSynthesizer::with_options(toolchain.clone(), options)
}

#[test]
fn test_segments_concatenate_in_input_order_and_temp_is_cleaned() {
    let ws = Workspace::new();
    let segments: Vec<SegmentSpec> = (1..=3).map(|n| ws.segment(n)).collect();
    let toolchain = Arc::new(ScriptedToolchain::new());

    let report = synthesizer(&toolchain, options())
        .synthesize(&segments, &ws.output(), 0.0)
        .unwrap();

    let content = std::fs::read_to_string(ws.output()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    for (n, line) in (1..=3).zip(&lines) {
        assert!(line.contains(&format!("slide{n}.png")), "line {n}: {line}");
        assert!(line.contains(&format!("narration{n}.mp3")));
    }

    assert_eq!(report.segments.len(), 3);
    assert!(report
        .segments
        .iter()
        .all(|s| s.stage == SegmentStage::Encoded));
    assert!(report.warnings.is_empty());
    assert_eq!(report.total_duration_secs(), 9.0);

    assert!(ws.temp_dir().is_dir());
    assert!(ws.temp_entries().is_empty(), "left behind: {:?}", ws.temp_entries());

    let concat = toolchain.calls_of(ToolKind::Concat);
    assert_eq!(concat.len(), 1);
    assert_eq!(
        concat[0].arg_after("-i"),
        Some(ws.temp_dir().join(CONCAT_LIST_NAME).display().to_string().as_str())
    );
}

#[test]
fn test_segment_artifacts_use_one_based_names() {
    let ws = Workspace::new();
    let segments: Vec<SegmentSpec> = (1..=2).map(|n| ws.segment(n)).collect();
    let toolchain = Arc::new(ScriptedToolchain::new());

    synthesizer(&toolchain, options())
        .synthesize(&segments, &ws.output(), 0.0)
        .unwrap();

    let outputs: Vec<String> = toolchain
        .calls_of(ToolKind::Encode)
        .iter()
        .filter_map(|call| call.output().map(str::to_string))
        .collect();
    assert_eq!(
        outputs,
        vec![
            ws.temp_dir().join("segment_1.mp4").display().to_string(),
            ws.temp_dir().join("segment_2.mp4").display().to_string(),
        ]
    );
}

#[test]
fn test_failure_in_second_segment_stops_before_third() {
    let ws = Workspace::new();
    let segments: Vec<SegmentSpec> = (1..=3).map(|n| ws.segment(n)).collect();
    let toolchain =
        Arc::new(ScriptedToolchain::new().fail_encode_when("slide2.png", "Error while decoding"));

    let err = synthesizer(&toolchain, options())
        .synthesize(&segments, &ws.output(), 0.0)
        .unwrap_err();

    assert!(matches!(err, SlideweaveError::Encode { .. }));
    assert_eq!(err.diagnostic(), Some("Error while decoding"));

    let encodes = toolchain.calls_of(ToolKind::Encode);
    assert_eq!(encodes.len(), 2);
    assert!(encodes
        .iter()
        .all(|call| !call.args.iter().any(|a| a.contains("slide3.png"))));
    assert!(toolchain.calls_of(ToolKind::Concat).is_empty());

    assert!(!ws.output().exists());
    assert!(ws.temp_entries().is_empty(), "left behind: {:?}", ws.temp_entries());
}

#[test]
fn test_missing_input_fails_before_any_encode() {
    let ws = Workspace::new();
    let mut segments: Vec<SegmentSpec> = (1..=2).map(|n| ws.segment(n)).collect();
    segments[1].audio_path = ws.root().join("inputs").join("gone.mp3");
    let toolchain = Arc::new(ScriptedToolchain::new());

    let err = synthesizer(&toolchain, options())
        .synthesize(&segments, &ws.output(), 0.0)
        .unwrap_err();

    match err {
        SlideweaveError::FileNotFound { path } => assert!(path.ends_with("gone.mp3")),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(toolchain.calls().is_empty());
}

#[test]
fn test_malformed_subtitles_fail_before_any_encode() {
    let ws = Workspace::new();
    let srt = ws.file("bad.srt", "1\n00:00:01 --> 00:00:02\nhello\n");
    let segments = vec![ws.segment(1), ws.segment(2).with_subtitles(srt)];
    let toolchain = Arc::new(ScriptedToolchain::new());

    let err = synthesizer(&toolchain, options())
        .synthesize(&segments, &ws.output(), 0.0)
        .unwrap_err();

    assert!(matches!(err, SlideweaveError::Subtitle { .. }));
    assert!(toolchain.calls_of(ToolKind::Encode).is_empty());
}

#[test]
fn test_empty_sequence_is_rejected() {
    let ws = Workspace::new();
    let toolchain = Arc::new(ScriptedToolchain::new());

    let err = synthesizer(&toolchain, options())
        .synthesize(&[], &ws.output(), 0.0)
        .unwrap_err();
    assert!(matches!(err, SlideweaveError::Manifest { .. }));
    assert!(!ws.output().exists());
}

#[test]
fn test_failed_burn_in_keeps_unsubtitled_segment_and_completes() {
    let ws = Workspace::new();
    let srt = ws.file(
        "slide2.srt",
        "1\n00:00:00,000 --> 00:00:01,500\n第一句\n\n2\n00:00:01,500 --> 00:00:03,000\nIt's 10:30\n",
    );
    let segments = vec![ws.segment(1), ws.segment(2).with_subtitles(srt)];
    let toolchain = Arc::new(ScriptedToolchain::new().fail_burn_in("No such filter: 'drawtext'"));

    let report = synthesizer(&toolchain, options())
        .synthesize(&segments, &ws.output(), 0.0)
        .unwrap();

    let content = std::fs::read_to_string(ws.output()).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(!content.contains(BURN_IN_MARKER));
    assert!(content.lines().nth(1).unwrap().contains("slide2.png"));

    assert_eq!(report.segments[0].stage, SegmentStage::Encoded);
    assert!(matches!(
        report.segments[1].stage,
        SegmentStage::SubtitleFailed { .. }
    ));
    assert!(matches!(
        report.warnings.as_slice(),
        [SynthesisWarning::SubtitleBurnIn { segment: 2, .. }]
    ));
    assert!(ws.temp_entries().is_empty(), "left behind: {:?}", ws.temp_entries());
}

#[test]
fn test_successful_burn_in_is_applied_to_that_segment_only() {
    let ws = Workspace::new();
    let srt = ws.file("slide1.srt", "1\n00:00:00,000 --> 00:00:02,000\nHello\n");
    let segments = vec![ws.segment(1).with_subtitles(srt), ws.segment(2)];
    let toolchain = Arc::new(ScriptedToolchain::new());

    let report = synthesizer(&toolchain, options())
        .synthesize(&segments, &ws.output(), 0.0)
        .unwrap();

    let content = std::fs::read_to_string(ws.output()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("slide1.png"));
    assert_eq!(lines[1], BURN_IN_MARKER);
    assert!(lines[2].contains("slide2.png"));
    assert_eq!(report.segments[0].stage, SegmentStage::Subtitled);

    let burn_in: Vec<_> = toolchain
        .calls_of(ToolKind::Encode)
        .into_iter()
        .filter(|call| call.is_burn_in())
        .collect();
    assert_eq!(burn_in.len(), 1);
    let chain = burn_in[0].arg_after("-vf").unwrap();
    assert!(chain.contains("text='Hello'"));
    assert!(chain.contains("enable='between(t,0,2)'"));
    assert!(ws.temp_entries().is_empty());
}

#[test]
fn test_presenter_longer_than_audio_is_trimmed_to_audio() {
    let ws = Workspace::new();
    let presenter = ws.file("presenter.mp4", "mp4");
    let segment = ws.segment(1).with_presenter(&presenter);
    let toolchain = Arc::new(
        ScriptedToolchain::new()
            .with_duration(&segment.audio_path, 4.0)
            .with_video_info(
                &presenter,
                MediaInfo {
                    width: 1920,
                    height: 1080,
                    duration: 30.0,
                },
            ),
    );

    let report = synthesizer(&toolchain, options())
        .synthesize(&[segment], &ws.output(), 0.0)
        .unwrap();

    assert_eq!(report.total_duration_secs(), 4.0);
    let encode = &toolchain.calls_of(ToolKind::Encode)[0];
    assert_eq!(encode.arg_after("-t"), Some("4.000"));
    let graph = encode.arg_after("-filter_complex").unwrap();
    assert!(graph.contains("chromakey=0x00ff00:0.25:0.1,trim=duration=4.000"));
    assert!(graph.contains("overlay=W-w-20:H-h-20"));
    assert!(!graph.contains("tpad"));
}

#[test]
fn test_concat_failure_is_fatal_and_cleans_up() {
    let ws = Workspace::new();
    let segments: Vec<SegmentSpec> = (1..=2).map(|n| ws.segment(n)).collect();
    let toolchain = Arc::new(ScriptedToolchain::new().fail_concat("Invalid data found"));

    let err = synthesizer(&toolchain, options())
        .synthesize(&segments, &ws.output(), 0.0)
        .unwrap_err();

    assert_eq!(err.diagnostic(), Some("Invalid data found"));
    assert!(!ws.output().exists());
    assert!(ws.temp_entries().is_empty());
}

#[test]
fn test_transition_duration_has_no_effect() {
    let ws = Workspace::new();
    let segments: Vec<SegmentSpec> = (1..=2).map(|n| ws.segment(n)).collect();
    let plain = Arc::new(ScriptedToolchain::new());
    let with_transition = Arc::new(ScriptedToolchain::new());

    synthesizer(&plain, options())
        .synthesize(&segments, &ws.output(), 0.0)
        .unwrap();
    let first = std::fs::read_to_string(ws.output()).unwrap();
    synthesizer(&with_transition, options())
        .synthesize(&segments, &ws.output(), 1.5)
        .unwrap();
    let second = std::fs::read_to_string(ws.output()).unwrap();

    assert_eq!(first, second);
    let args = |t: &ScriptedToolchain| -> Vec<Vec<String>> {
        t.calls().into_iter().map(|c| c.args).collect()
    };
    assert_eq!(args(&plain), args(&with_transition));
}

#[test]
fn test_parallel_encoding_preserves_order() {
    let ws = Workspace::new();
    let segments: Vec<SegmentSpec> = (1..=5).map(|n| ws.segment(n)).collect();
    let toolchain = Arc::new(ScriptedToolchain::new());
    let opts = SynthesisOptions {
        parallelism: 2,
        ..options()
    };

    let report = synthesizer(&toolchain, opts)
        .synthesize(&segments, &ws.output(), 0.0)
        .unwrap();

    let content = std::fs::read_to_string(ws.output()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 5);
    for (n, line) in (1..=5).zip(&lines) {
        assert!(line.contains(&format!("slide{n}.png")), "line {n}: {line}");
    }
    let indices: Vec<usize> = report.segments.iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4, 5]);
    assert!(ws.temp_entries().is_empty());
}

#[test]
fn test_configured_temp_dir_is_used_and_cleaned() {
    let ws = Workspace::new();
    let scratch = ws.root().join("scratch");
    let segments = vec![ws.segment(1)];
    let toolchain = Arc::new(ScriptedToolchain::new());
    let opts = SynthesisOptions {
        temp_dir: Some(scratch.clone()),
        ..options()
    };

    synthesizer(&toolchain, opts)
        .synthesize(&segments, &ws.output(), 0.0)
        .unwrap();

    let encode = &toolchain.calls_of(ToolKind::Encode)[0];
    assert_eq!(
        encode.output(),
        Some(scratch.join("segment_1.mp4").display().to_string().as_str())
    );
    assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
    assert!(!ws.temp_dir().exists());
}

#[test]
fn test_undeletable_temp_entry_is_a_warning_not_a_failure() {
    let ws = Workspace::new();
    let segments: Vec<SegmentSpec> = (1..=2).map(|n| ws.segment(n)).collect();
    let toolchain = Arc::new(ScriptedToolchain::new().with_default_duration(2.5));

    // The unsubtitled segment never writes its staging file, so a non-empty
    // directory in its place survives until cleanup and cannot be unlinked.
    let stubborn = ws.temp_dir().join("segment_1.mp4.presub.mp4");
    std::fs::create_dir_all(&stubborn).unwrap();
    std::fs::write(stubborn.join("leftover"), b"x").unwrap();

    let report = synthesizer(&toolchain, options())
        .synthesize(&segments, &ws.output(), 0.0)
        .unwrap();

    assert!(ws.output().exists());
    assert_eq!(report.total_duration_secs(), 5.0);
    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(
        &report.warnings[0],
        SynthesisWarning::Cleanup { path, .. } if path == &stubborn
    ));
    assert_eq!(ws.temp_entries(), vec![stubborn]);
}

#[test]
fn test_progress_reports_each_stage_in_order() {
    let ws = Workspace::new();
    let segments: Vec<SegmentSpec> = (1..=2).map(|n| ws.segment(n)).collect();
    let toolchain = Arc::new(ScriptedToolchain::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    synthesizer(&toolchain, options())
        .with_progress(Box::new(move |p| sink.lock().unwrap().push(p.stage)))
        .synthesize(&segments, &ws.output(), 0.0)
        .unwrap();

    let mut stages = seen.lock().unwrap().clone();
    stages.dedup();
    assert_eq!(
        stages,
        vec![
            SynthesisStage::Validating,
            SynthesisStage::Encoding,
            SynthesisStage::Concatenating,
            SynthesisStage::CleaningUp,
            SynthesisStage::Complete,
        ]
    );
}

#[tokio::test]
async fn test_async_wrapper_runs_synthesis() {
    let ws = Workspace::new();
    let segments: Vec<SegmentSpec> = (1..=2).map(|n| ws.segment(n)).collect();
    let toolchain = Arc::new(ScriptedToolchain::new());
    let synth = Arc::new(synthesizer(&toolchain, options()));

    let report =
        slideweave_render_engine::synthesize_async(synth, segments, ws.output(), 0.0)
            .await
            .unwrap();
    assert_eq!(report.output_path, ws.output());
    assert!(ws.output().exists());
}
