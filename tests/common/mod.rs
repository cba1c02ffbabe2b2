#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use teardown_scope::intercept::Scoped;
use teardown_scope::lab::{Journal, LabConfig, Report, Suite};
use teardown_scope::{teardown, ScopeError};

pub use teardown_scope::test_utils::init_test_logging;

/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED_5EED;

const PROPTEST_SEED_ENV: &str = "TEARDOWN_SCOPE_PROPTEST_SEED";

/// Build a ProptestConfig with deterministic seed support for CI.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    // Honor existing PROPTEST_RNG_SEED, otherwise apply our own.
    if matches!(config.rng_seed, RngSeed::Random) {
        if let Some(seed) = read_proptest_seed() {
            config.rng_seed = RngSeed::Fixed(seed);
        }
    }
    config
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }
    if std::env::var("CI").is_ok() {
        return Some(DEFAULT_PROPTEST_SEED);
    }
    None
}

/// Declares an intercepted suite with a fresh journal, runs it, and returns
/// the report together with everything the journal recorded.
pub fn run_journaled<F>(declare: F) -> (Report, Vec<String>)
where
    F: FnOnce(&mut Scoped<'_, Suite>, &Journal),
{
    run_journaled_with(LabConfig::default(), declare)
}

/// Like [`run_journaled`] with an explicit lab configuration.
pub fn run_journaled_with<F>(config: LabConfig, declare: F) -> (Report, Vec<String>)
where
    F: FnOnce(&mut Scoped<'_, Suite>, &Journal),
{
    init_test_logging();
    let journal = Journal::new();
    let mut suite = Suite::with_config(config);
    declare(&mut Scoped::new(&mut suite), &journal);
    let report = suite.run();
    (report, journal.take())
}

/// A hook or test body that logs `line` and registers a cleanup logging
/// `cleanup`. The registration result is what the body returns.
pub fn step(
    journal: &Journal,
    line: &'static str,
    cleanup: &'static str,
) -> impl FnMut() -> LocalBoxFuture<'static, Result<(), ScopeError>> + 'static {
    let journal = journal.clone();
    move || {
        let journal = journal.clone();
        async move {
            journal.log(line);
            let inner = journal.clone();
            teardown(move || inner.log(cleanup))
        }
        .boxed_local()
    }
}

/// A hook or test body that only logs `line`.
pub fn note(
    journal: &Journal,
    line: &'static str,
) -> impl FnMut() -> LocalBoxFuture<'static, ()> + 'static {
    let journal = journal.clone();
    move || {
        let journal = journal.clone();
        async move { journal.log(line) }.boxed_local()
    }
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
    };
}
