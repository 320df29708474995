//! Integration test suite for skylift
//!
//! End-to-end scenarios driving the public API against the deterministic
//! fixture source, plus smoke tests of the CLI binary. No test here touches
//! the network; downloads synthesize real archives and the full pipeline
//! (extract, validate, install) runs against temporary directories.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! Tests are organized by functionality area:
//! - **lifecycle**: Full check cycles and the observable state machine
//! - **install_flow**: Stage-then-swap installation through the controller
//! - **changelog_flow**: Localized release-notes resolution end to end
//! - **cli**: Binary smoke tests via `assert_cmd`

mod changelog_flow;
mod cli;
mod install_flow;
mod lifecycle;
