//! Command-line driver that replays captured inputs against a fuzz target.
//!
//! A replay binary is a target function plus one macro call:
//!
//! ```no_run
//! fn parse(data: &[u8]) -> i32 {
//!     if data.is_empty() { -1 } else { 0 }
//! }
//!
//! fuzzreplay_cli::replay_target!(parse);
//! ```

pub mod driver;

pub use driver::{Cli, run, run_main};
pub use fuzzreplay_core;

/// Defines `main` for a replay driver around a target function and an optional
/// initialize hook.
#[macro_export]
macro_rules! replay_target {
    ($test_one_input:path) => {
        fn main() -> ::std::process::ExitCode {
            $crate::run_main($crate::fuzzreplay_core::target::FuzzTarget::new($test_one_input))
        }
    };
    ($test_one_input:path, init = $initialize:path) => {
        fn main() -> ::std::process::ExitCode {
            $crate::run_main(
                $crate::fuzzreplay_core::target::FuzzTarget::new($test_one_input)
                    .with_initialize($initialize),
            )
        }
    };
}
