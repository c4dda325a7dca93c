//! Shared test utilities for the climate slice workspace.
//!
//! - [`FakeGridSource`]: instrumented stand-in for the remote reader
//! - deterministic raster generators
//! - common request fixtures
//!
//! Add to a crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Types from `slice-cache` only line up in integration tests (`tests/`),
//! not in `slice-cache`'s own unit tests.

pub mod fixtures;
pub mod generators;
pub mod source;

pub use fixtures::*;
pub use generators::*;
pub use source::FakeGridSource;

use slice_cache::CacheConfig;
use tempfile::TempDir;

/// Cache config rooted in a fresh temporary directory.
///
/// The directory is removed when the returned `TempDir` drops, so keep it
/// alive for the duration of the test.
pub fn temp_cache_config(memory_capacity: usize) -> (TempDir, CacheConfig) {
    let dir = tempfile::tempdir().expect("failed to create temp cache dir");
    let config = CacheConfig {
        cache_dir: dir.path().to_path_buf(),
        memory_capacity,
        disk_enabled: true,
    };
    (dir, config)
}

/// Macro for approximate floating-point equality assertions.
///
/// ```
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Wait (polling) until `$cond` holds, failing after about a second.
#[macro_export]
macro_rules! wait_until {
    ($cond:expr) => {{
        let mut satisfied = false;
        for _ in 0..200 {
            if $cond {
                satisfied = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(satisfied, "condition not met: {}", stringify!($cond));
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }
}
