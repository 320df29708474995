//! Terminal progress rendering for update checks.
//!
//! Subscribes to the updater's state channel and mirrors it onto an
//! `indicatif` progress bar: a spinner while the feed is fetched, a byte-less
//! percentage bar while `Downloading`, a final message on `Downloaded`.
//! Rendering is skipped when quiet mode is on or `SKYLIFT_NO_PROGRESS` is
//! set, so scripted runs produce clean output.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::constants::NO_PROGRESS_ENV;
use crate::state::UpdateState;

/// Whether progress rendering is enabled for this invocation.
pub fn progress_enabled(quiet: bool) -> bool {
    !quiet && std::env::var_os(NO_PROGRESS_ENV).is_none()
}

/// Mirror state transitions onto a progress bar until the channel closes.
///
/// The task ends when the sender side (the updater) is dropped; callers
/// should await the handle after the check completes so the final redraw
/// lands before any summary text.
pub fn spawn(mut rx: watch::Receiver<UpdateState>, quiet: bool) -> Option<JoinHandle<()>> {
    if !progress_enabled(quiet) {
        return None;
    }

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:30.cyan/blue}] {percent:>3}%")
            .unwrap()
            .progress_chars("━╸━"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_message("Checking for updates");

    Some(tokio::spawn(async move {
        loop {
            let state = rx.borrow_and_update().clone();
            render(&bar, &state);
            // Downloaded finishes the bar; nothing further will be drawn.
            if bar.is_finished() || rx.changed().await.is_err() {
                break;
            }
        }
        if !bar.is_finished() {
            bar.finish_and_clear();
        }
    }))
}

fn render(bar: &ProgressBar, state: &UpdateState) {
    match state {
        UpdateState::None => {}
        UpdateState::Detected { release, .. } => {
            bar.set_message(format!("Update {} detected", release.tag));
        }
        UpdateState::Downloading {
            release, fraction, ..
        } => {
            bar.set_message(format!("Downloading {}", release.tag));
            bar.set_position((fraction * 100.0).round() as u64);
        }
        UpdateState::Downloaded { release, .. } => {
            bar.set_position(100);
            bar.finish_with_message(format!("Update {} ready to install", release.tag));
        }
    }
}
