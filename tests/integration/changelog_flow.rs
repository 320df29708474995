//! Localized release-notes resolution through the controller.

use std::sync::Arc;

use semver::Version;
use skylift::config::UpdaterConfig;
use skylift::source::FixtureReleaseSource;
use skylift::test_utils::{RecordingProcessHost, raw_asset, release_with_zip};
use skylift::updater::Updater;

const TAGGED_BODY: &str = "\
<!-- au:lang=en -->
English notes for 1.2.0.
<!-- au:end -->
<!-- au:lang=zh_Hans -->
1.2.0 的简体中文说明。
<!-- au:end -->
";

fn updater_for(source: FixtureReleaseSource, langs: &[&str]) -> Updater {
    let mut config = UpdaterConfig::new("acme", "myapp");
    config.skip_signature_validation = true;
    config.preferred_languages = langs.iter().map(|s| s.to_string()).collect();
    Updater::new(config, Version::new(1, 0, 0))
        .with_release_source(Arc::new(source))
        .with_process_host(Arc::new(RecordingProcessHost::default()))
}

#[tokio::test]
async fn body_section_resolved_for_regional_preference() {
    let mut release = release_with_zip("myapp", "v1.2.0");
    release.body = TAGGED_BODY.to_string();

    let source = FixtureReleaseSource::new().with_releases(vec![release.clone()]);
    let updater = updater_for(source, &["zh-CN", "en"]);

    // zh-CN collapses to zh-hans and matches the tagged block.
    let text = updater.localized_changelog(&release).await.unwrap();
    assert_eq!(text, "1.2.0 的简体中文说明。");
}

#[tokio::test]
async fn changelog_asset_beats_body_section() {
    let mut release = release_with_zip("myapp", "v1.2.0");
    release.body = TAGGED_BODY.to_string();
    release.assets.push(raw_asset("CHANGELOG.zh-hans.md"));

    let source = FixtureReleaseSource::new()
        .with_releases(vec![release.clone()])
        .with_asset_bytes("CHANGELOG.zh-hans.md", "Asset-file notes.".into());
    let updater = updater_for(source, &["zh-CN", "en"]);

    let text = updater.localized_changelog(&release).await.unwrap();
    assert_eq!(text, "Asset-file notes.");
}

#[tokio::test]
async fn untagged_body_returned_whole_for_any_preference() {
    let mut release = release_with_zip("myapp", "v1.2.0");
    release.body = "\nJust plain notes.\n".to_string();

    let source = FixtureReleaseSource::new().with_releases(vec![release.clone()]);
    let updater = updater_for(source, &["zh-CN", "fr"]);

    let text = updater.localized_changelog(&release).await.unwrap();
    assert_eq!(text, "Just plain notes.");
}

#[tokio::test]
async fn unmatched_preference_falls_back_to_english_section() {
    let mut release = release_with_zip("myapp", "v1.2.0");
    release.body = TAGGED_BODY.to_string();

    let source = FixtureReleaseSource::new().with_releases(vec![release.clone()]);
    let updater = updater_for(source, &["ko"]);

    let text = updater.localized_changelog(&release).await.unwrap();
    assert_eq!(text, "English notes for 1.2.0.");
}

#[tokio::test]
async fn resolution_is_idempotent_across_calls() {
    let mut release = release_with_zip("myapp", "v1.2.0");
    release.body = TAGGED_BODY.to_string();

    let source = FixtureReleaseSource::new().with_releases(vec![release.clone()]);
    let updater = updater_for(source, &["zh-CN"]);

    let first = updater.localized_changelog(&release).await.unwrap();
    let second = updater.localized_changelog(&release).await.unwrap();
    assert_eq!(first, second);
}
