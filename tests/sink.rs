//! File sinks against a real temp directory.

use scoresheet2pgn::{
    scan_transcripts, GameMetadata, PgnFileSink, RawTranscript, ScanConfig, ScanOutput,
    SinkFormat, ValidationSink,
};

fn finished_scan() -> ScanOutput {
    let transcripts = vec![
        RawTranscript {
            page: 1,
            column: 1,
            lines: vec!["1. e4 c5".into(), "2. Nf3 d6".into()],
        },
        RawTranscript {
            page: 1,
            column: 2,
            lines: vec!["3. d4 cxd4".into()],
        },
    ];
    let meta = GameMetadata {
        event: Some("Sink Test".into()),
        ..GameMetadata::default()
    };
    tokio_test::block_on(scan_transcripts(&transcripts, Some(&meta), &ScanConfig::default()))
        .expect("transcript scan")
}

#[test]
fn pgn_sink_writes_text_into_new_directories() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let path = temp.path().join("games").join("round1.pgn");
    let output = finished_scan();

    let sink = PgnFileSink::new(&path);
    tokio_test::block_on(sink.store(&output)).expect("store");

    let written = std::fs::read_to_string(&path).expect("read back");
    assert_eq!(written, output.pgn);
    assert!(written.contains("[Event \"Sink Test\"]"));
    assert!(written.contains("1. e4 c5 2. Nf3 d6 3. d4 cxd4 *"), "{written}");
    assert!(!path.with_file_name("round1.pgn.tmp").exists());
}

#[test]
fn json_sink_keeps_the_validation_report() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let path = temp.path().join("round1.json");
    let output = finished_scan();

    let sink = PgnFileSink::new(&path);
    tokio_test::block_on(sink.store(&output)).expect("store");

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("read back")).expect("json");
    assert_eq!(value["pgn"], serde_json::Value::String(output.pgn.clone()));
    assert_eq!(value["stats"]["valid"], 6);
    assert_eq!(value["validation"]["pairs"].as_array().map(Vec::len), Some(3));
    assert!(value.get("debug").is_none());
}

#[test]
fn explicit_format_overrides_extension() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let path = temp.path().join("game.txt");
    let output = finished_scan();

    let sink = PgnFileSink::new(&path).with_format(SinkFormat::Json);
    tokio_test::block_on(sink.store(&output)).expect("store");

    let text = std::fs::read_to_string(&path).expect("read back");
    assert!(text.trim_start().starts_with('{'));
}

#[test]
fn rewriting_replaces_the_previous_game() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let path = temp.path().join("game.pgn");
    std::fs::write(&path, "stale").expect("seed file");

    let output = finished_scan();
    tokio_test::block_on(PgnFileSink::new(&path).store(&output)).expect("store");
    assert_eq!(std::fs::read_to_string(&path).expect("read back"), output.pgn);
}
