//! Full check-cycle scenarios against the fixture source.

use std::sync::Arc;
use std::time::Duration;

use semver::Version;
use skylift::config::UpdaterConfig;
use skylift::error::UpdateError;
use skylift::source::FixtureReleaseSource;
use skylift::state::UpdateState;
use skylift::test_utils::{
    RecordingProcessHost, init_test_logging, release, release_with_zip, zip_asset,
};
use skylift::updater::{CheckOutcome, Updater};

fn fixture_config() -> UpdaterConfig {
    let mut config = UpdaterConfig::new("acme", "myapp");
    config.skip_signature_validation = true;
    config.preferred_languages = vec!["en".to_string()];
    config
}

fn updater_with(source: FixtureReleaseSource, current: &str) -> Updater {
    Updater::new(fixture_config(), Version::parse(current).unwrap())
        .with_release_source(Arc::new(source))
        .with_process_host(Arc::new(RecordingProcessHost::default()))
}

#[tokio::test]
async fn full_cycle_walks_states_in_order() {
    init_test_logging(None);

    let source = FixtureReleaseSource::new().with_releases(vec![
        release_with_zip("myapp", "v1.0.0"),
        release_with_zip("myapp", "v1.2.0"),
        release_with_zip("myapp", "v1.1.0"),
    ]);
    let updater = updater_with(source, "1.0.0");

    let mut rx = updater.subscribe();
    let observer = tokio::spawn(async move {
        let mut stages = vec![rx.borrow_and_update().stage()];
        while rx.changed().await.is_ok() {
            stages.push(rx.borrow_and_update().stage());
        }
        stages
    });

    let outcome = updater.check().await.unwrap();
    let (release, bundle) = match outcome {
        CheckOutcome::UpdateReady { release, bundle } => (release, bundle),
        other => panic!("expected a staged update, got {other:?}"),
    };
    assert_eq!(release.tag, Version::new(1, 2, 0));

    // The staged bundle is a real extracted directory with an executable.
    assert!(bundle.path().is_dir());
    assert!(bundle.executable().is_some());
    assert_eq!(updater.current_state().stage(), "downloaded");

    // Watch observers see a subsequence of the canonical order, in order.
    drop(updater);
    let stages = observer.await.unwrap();
    let canonical = ["none", "detected", "downloading", "downloaded"];
    let mut last = 0;
    for stage in &stages {
        let position = canonical
            .iter()
            .position(|c| c == stage)
            .unwrap_or_else(|| panic!("unknown stage {stage}"));
        assert!(position >= last, "stages regressed: {stages:?}");
        last = position;
    }
    assert_eq!(stages.last(), Some(&"downloaded"));
}

#[tokio::test]
async fn staged_bundle_is_cleaned_up_on_drop() {
    let source =
        FixtureReleaseSource::new().with_releases(vec![release_with_zip("myapp", "v2.0.0")]);
    let updater = updater_with(source, "1.0.0");

    let outcome = updater.check().await.unwrap();
    let bundle = match outcome {
        CheckOutcome::UpdateReady { bundle, .. } => bundle,
        other => panic!("expected a staged update, got {other:?}"),
    };
    let staged_path = bundle.path().to_path_buf();
    assert!(staged_path.exists());

    // The state holds the only other reference; replacing it and dropping
    // ours removes the staging directory.
    drop(updater);
    drop(bundle);
    assert!(!staged_path.exists());
}

#[tokio::test]
async fn up_to_date_feed_reports_already_up_to_date() {
    let source = FixtureReleaseSource::new().with_releases(vec![
        release_with_zip("myapp", "v0.9.0"),
        release_with_zip("myapp", "v1.0.0"),
    ]);
    let updater = updater_with(source, "1.0.0");

    let err = updater.check().await.unwrap_err();
    assert!(matches!(err, UpdateError::AlreadyUpToDate { .. }));
    assert!(err.is_benign());
    assert!(updater.current_state().is_none());
}

#[tokio::test]
async fn newer_prerelease_filtered_down_to_running_version() {
    // Feed maximum after filtering is the running release itself, which is
    // "already up to date", not "no update".
    let mut prerelease = release_with_zip("myapp", "v1.2.0");
    prerelease.prerelease = true;
    let source = FixtureReleaseSource::new()
        .with_releases(vec![release_with_zip("myapp", "v1.0.0"), prerelease]);
    let updater = updater_with(source, "1.0.0");

    let err = updater.check().await.unwrap_err();
    assert!(matches!(err, UpdateError::AlreadyUpToDate { .. }));
}

#[tokio::test]
async fn feed_of_only_prereleases_is_no_viable_update() {
    let mut prerelease = release_with_zip("myapp", "v1.2.0");
    prerelease.prerelease = true;
    let source = FixtureReleaseSource::new().with_releases(vec![prerelease]);
    let updater = updater_with(source, "1.0.0");

    let outcome = updater.check().await.unwrap();
    assert!(matches!(outcome, CheckOutcome::NoViableUpdate));
    assert!(updater.current_state().is_none());
}

#[tokio::test]
async fn release_without_matching_asset_is_no_viable_update() {
    let source = FixtureReleaseSource::new().with_releases(vec![release(
        "v3.0.0",
        vec![zip_asset("someoneelse", "3.0.0")],
    )]);
    let updater = updater_with(source, "1.0.0");

    let outcome = updater.check().await.unwrap();
    assert!(matches!(outcome, CheckOutcome::NoViableUpdate));
}

#[tokio::test]
async fn download_failure_keeps_state_and_next_check_recovers() {
    // First source fails mid-download; the state parks at Downloading.
    let failing = FixtureReleaseSource::new()
        .with_releases(vec![release_with_zip("myapp", "v1.2.0")])
        .with_progress_steps(8)
        .failing_after(3);
    let updater = updater_with(failing, "1.0.0");

    let err = updater.check().await.unwrap_err();
    assert!(matches!(err, UpdateError::DownloadFailed { .. }));
    assert_eq!(updater.current_state().stage(), "downloading");

    // No automatic retry happened; the caller runs the next check. A second
    // updater against a healthy source models the recovered network.
    let healthy =
        FixtureReleaseSource::new().with_releases(vec![release_with_zip("myapp", "v1.2.0")]);
    let updater = updater_with(healthy, "1.0.0");
    let outcome = updater.check().await.unwrap();
    assert!(matches!(outcome, CheckOutcome::UpdateReady { .. }));
}

#[tokio::test]
async fn concurrent_checks_are_serialized_by_the_guard() {
    let source = FixtureReleaseSource::new()
        .with_releases(vec![release_with_zip("myapp", "v1.2.0")])
        .with_step_delay(Duration::from_millis(20));
    let updater = Arc::new(updater_with(source, "1.0.0"));

    let (first, second) = tokio::join!(updater.check(), updater.check());
    assert!(matches!(first, Ok(CheckOutcome::UpdateReady { .. })));
    assert!(matches!(second, Err(UpdateError::CheckInProgress)));
}

#[tokio::test]
async fn periodic_loop_stages_an_update() {
    let source =
        FixtureReleaseSource::new().with_releases(vec![release_with_zip("myapp", "v1.2.0")]);
    let mut config = fixture_config();
    config.poll_interval_secs = 1;
    let updater = Arc::new(
        Updater::new(config, Version::new(1, 0, 0))
            .with_release_source(Arc::new(source))
            .with_process_host(Arc::new(RecordingProcessHost::default())),
    );

    let handle = updater.run_periodic();
    let mut rx = updater.subscribe();

    // The first tick fires immediately; wait for the cycle to finish.
    let reached = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if rx.borrow_and_update().stage() == "downloaded" {
                break;
            }
            rx.changed().await.unwrap();
        }
    })
    .await;
    handle.abort();

    assert!(reached.is_ok(), "periodic check never staged the update");
    match updater.current_state() {
        UpdateState::Downloaded { release, .. } => {
            assert_eq!(release.tag, Version::new(1, 2, 0));
        }
        other => panic!("expected Downloaded, got {other:?}"),
    }
}

#[tokio::test]
async fn diagnostics_capture_the_cycle() {
    let source =
        FixtureReleaseSource::new().with_releases(vec![release_with_zip("myapp", "v1.2.0")]);
    let updater = updater_with(source, "1.0.0");
    updater.check().await.unwrap();

    let messages: Vec<String> = updater
        .diagnostics()
        .into_iter()
        .map(|entry| entry.message)
        .collect();
    assert!(
        messages
            .iter()
            .any(|m| m.contains("Update check started")),
        "missing check-start entry: {messages:?}"
    );
    assert!(messages.iter().any(|m| m.contains("Downloading")));
    assert!(messages.contains(&"State advanced to downloaded".to_string()));
}
