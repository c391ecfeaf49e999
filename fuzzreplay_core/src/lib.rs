pub mod config;
pub mod executor;
pub mod input;
pub mod outcome;
pub mod replay;
pub mod report;
pub mod target;

pub use config::ReplayConfig;
#[cfg(unix)]
pub use executor::ForkExecutor;
pub use executor::{
    BuildError, CHILD_FLAG, Executor, IsolationKind, SpawnExecutor, build_executor, run_child,
};
pub use input::{InputFile, LoadError, LoadErrorKind};
pub use outcome::{ExitConvention, ReplayResult, TerminationStatus, classify};
pub use replay::Replayer;
pub use report::{CrashRecord, RunSummary};
pub use target::{FuzzTarget, Initialize, REJECTED_RETURN, TargetVerdict, TestOneInput};
