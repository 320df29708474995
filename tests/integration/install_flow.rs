//! Installation scenarios: check then stage-then-swap install.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use semver::Version;
use skylift::bundle::LocalBundle;
use skylift::config::UpdaterConfig;
use skylift::source::FixtureReleaseSource;
use skylift::test_utils::{RecordingProcessHost, release_with_zip};
use skylift::updater::{CheckOutcome, Updater};
use tempfile::TempDir;

fn installed_bundle(root: &Path, marker: &str) -> PathBuf {
    let bundle = root.join("MyApp.app");
    std::fs::create_dir_all(bundle.join("Contents/MacOS")).unwrap();
    std::fs::write(bundle.join("Contents/MacOS/MyApp"), marker).unwrap();
    bundle
}

fn updater_for(install_path: PathBuf, host: Arc<RecordingProcessHost>) -> Updater {
    let mut config = UpdaterConfig::new("acme", "myapp");
    config.skip_signature_validation = true;
    config.install_path = Some(install_path);

    let source =
        FixtureReleaseSource::new().with_releases(vec![release_with_zip("myapp", "v1.2.0")]);
    Updater::new(config, Version::new(1, 0, 0))
        .with_release_source(Arc::new(source))
        .with_process_host(host)
}

#[tokio::test]
async fn check_then_install_replaces_the_bundle_and_relaunches() {
    let root = TempDir::new().unwrap();
    let install_path = installed_bundle(root.path(), "old build");

    let host = Arc::new(RecordingProcessHost::default());
    let updater = updater_for(install_path.clone(), host.clone());

    let bundle = match updater.check().await.unwrap() {
        CheckOutcome::UpdateReady { bundle, .. } => bundle,
        other => panic!("expected a staged update, got {other:?}"),
    };
    updater.install(&bundle).await.unwrap();

    // The fixture's synthesized script replaced the old executable in place.
    let installed = std::fs::read_to_string(install_path.join("Contents/MacOS/MyApp")).unwrap();
    assert!(installed.starts_with("#!/bin/sh"));

    // The new executable was launched and termination requested, in order.
    assert_eq!(
        host.launched(),
        vec![install_path.join("Contents/MacOS/MyApp")]
    );
    assert_eq!(host.terminations(), 1);

    // The swap left no parked copy of the old version behind.
    let leftovers: Vec<_> = std::fs::read_dir(root.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains(".old-"))
        .collect();
    assert!(leftovers.is_empty(), "aside directory leaked: {leftovers:?}");
}

#[tokio::test]
async fn failed_relaunch_restores_the_old_build() {
    let root = TempDir::new().unwrap();
    let install_path = installed_bundle(root.path(), "old build");

    let host = Arc::new(RecordingProcessHost::failing());
    let updater = updater_for(install_path.clone(), host.clone());

    let bundle = match updater.check().await.unwrap() {
        CheckOutcome::UpdateReady { bundle, .. } => bundle,
        other => panic!("expected a staged update, got {other:?}"),
    };
    updater.install(&bundle).await.unwrap_err();

    // The previous version is back at the install path, untouched.
    let installed = std::fs::read_to_string(install_path.join("Contents/MacOS/MyApp")).unwrap();
    assert_eq!(installed, "old build");
    assert_eq!(host.terminations(), 0);
}

#[tokio::test]
async fn check_rejects_a_running_bundle_without_an_executable() {
    use skylift::error::UpdateError;

    let root = TempDir::new().unwrap();
    // A bundle directory with no executable in any known layout.
    let install_path = root.path().join("MyApp.app");
    std::fs::create_dir_all(install_path.join("Contents/Resources")).unwrap();

    let host = Arc::new(RecordingProcessHost::default());
    let updater = updater_for(install_path.clone(), host.clone());

    // The bundle cannot be relaunched, so the check refuses to stage an
    // update over it even though a newer release is available.
    let err = updater.check().await.unwrap_err();
    assert!(matches!(err, UpdateError::NoExecutableFound { .. }));

    // The same malformed bundle is refused at install time too, even with a
    // perfectly good candidate.
    let candidate = LocalBundle::installed(installed_bundle(
        &root.path().join("staged"),
        "#!/bin/sh\nexit 0\n",
    ));
    let err = updater.install(&candidate).await.unwrap_err();
    assert!(matches!(err, UpdateError::NoExecutableFound { .. }));
    assert!(host.launched().is_empty());
    assert_eq!(host.terminations(), 0);
}

#[cfg(not(target_os = "macos"))]
#[tokio::test]
async fn unsigned_bundles_are_rejected_without_the_skip_flag() {
    use skylift::error::UpdateError;

    let root = TempDir::new().unwrap();
    let install_path = installed_bundle(root.path(), "old build");

    let mut config = UpdaterConfig::new("acme", "myapp");
    config.install_path = Some(install_path);
    // skip_signature_validation deliberately left false.

    let source =
        FixtureReleaseSource::new().with_releases(vec![release_with_zip("myapp", "v1.2.0")]);
    let updater = Updater::new(config, Version::new(1, 0, 0))
        .with_release_source(Arc::new(source))
        .with_process_host(Arc::new(RecordingProcessHost::default()));

    // Off macOS there is no identity oracle, so both sides read unsigned and
    // the check fails at the trust gate, after download and extraction.
    let err = updater.check().await.unwrap_err();
    assert!(matches!(err, UpdateError::IdentityUnavailable { .. }));
    assert_eq!(updater.current_state().stage(), "downloading");
}
