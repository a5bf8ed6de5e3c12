use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{EncodeOutcome, Encoder};

const MAX_OUTPUT: u64 = 95 * 1024 * 1024;

/// Writes an executable shell script standing in for the ffmpeg binary.
fn fake_encoder(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Shell fragment that writes a fixed payload to the last argument, which
/// is where the output path sits in the encoder argv.
const WRITE_OUTPUT: &str = "for last; do :; done\nprintf fakevideo > \"$last\"";

#[tokio::test]
async fn zero_exit_with_output_is_success() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Encoder::new(
        &fake_encoder(dir.path(), WRITE_OUTPUT),
        Duration::from_secs(5),
        MAX_OUTPUT,
    );
    let output = dir.path().join("out.mp4");

    let outcome = encoder
        .encode(&dir.path().join("in.jpg"), &dir.path().join("in.mp3"), &output)
        .await;

    match outcome {
        EncodeOutcome::Success { path, size_bytes } => {
            assert_eq!(path, output);
            assert_eq!(size_bytes, 9);
            assert!(output.is_file());
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn non_zero_exit_captures_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Encoder::new(
        &fake_encoder(dir.path(), "echo boom >&2\nexit 3"),
        Duration::from_secs(5),
        MAX_OUTPUT,
    );

    let outcome = encoder
        .encode(
            &dir.path().join("in.jpg"),
            &dir.path().join("in.mp3"),
            &dir.path().join("out.mp4"),
        )
        .await;

    match outcome {
        EncodeOutcome::Failed { diagnostics } => assert!(diagnostics.contains("boom")),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn zero_exit_without_output_is_output_missing() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Encoder::new(
        &fake_encoder(dir.path(), "exit 0"),
        Duration::from_secs(5),
        MAX_OUTPUT,
    );

    let outcome = encoder
        .encode(
            &dir.path().join("in.jpg"),
            &dir.path().join("in.mp3"),
            &dir.path().join("out.mp4"),
        )
        .await;

    assert!(matches!(outcome, EncodeOutcome::OutputMissing));
}

#[tokio::test]
async fn overlong_encode_is_killed_and_reported_as_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Encoder::new(
        &fake_encoder(dir.path(), "sleep 30"),
        Duration::from_millis(200),
        MAX_OUTPUT,
    );

    let started = std::time::Instant::now();
    let outcome = encoder
        .encode(
            &dir.path().join("in.jpg"),
            &dir.path().join("in.mp3"),
            &dir.path().join("out.mp4"),
        )
        .await;

    assert!(matches!(outcome, EncodeOutcome::TimedOut));
    // The child is killed, not waited out.
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn oversized_output_is_deleted_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Encoder::new(
        &fake_encoder(dir.path(), WRITE_OUTPUT),
        Duration::from_secs(5),
        4,
    );
    let output = dir.path().join("out.mp4");

    let outcome = encoder
        .encode(&dir.path().join("in.jpg"), &dir.path().join("in.mp3"), &output)
        .await;

    match outcome {
        EncodeOutcome::OutputTooLarge { size_bytes } => assert_eq!(size_bytes, 9),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(!output.exists());
}

#[tokio::test]
async fn missing_binary_is_a_failure_not_a_panic() {
    let encoder = Encoder::new(
        Path::new("/nonexistent/ffmpeg"),
        Duration::from_secs(5),
        MAX_OUTPUT,
    );
    assert!(!encoder.is_available());

    let outcome = encoder
        .encode(
            Path::new("/tmp/in.jpg"),
            Path::new("/tmp/in.mp3"),
            Path::new("/tmp/out.mp4"),
        )
        .await;

    match outcome {
        EncodeOutcome::Failed { diagnostics } => {
            assert!(diagnostics.contains("failed to spawn"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn version_reports_the_first_line() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = Encoder::new(
        &fake_encoder(
            dir.path(),
            "echo 'ffmpeg version 6.1.1 (fake)'\necho 'built with gcc'",
        ),
        Duration::from_secs(5),
        MAX_OUTPUT,
    );

    let version = encoder.version().await.unwrap();
    assert_eq!(version, "ffmpeg version 6.1.1 (fake)");
}
