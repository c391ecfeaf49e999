use crate::target::{REJECTED_RETURN, TargetVerdict};
use std::fmt;

/// Exit status a forked child uses to report a rejected input.
///
/// This is [`REJECTED_RETURN`] truncated to the 8 bits a process exit status carries.
pub const FORK_REJECTED_STATUS: i32 = (REJECTED_RETURN as u8) as i32;

/// Exit codes a spawned child uses to report its verdict.
pub const CHILD_EXIT_OK: i32 = 0;
pub const CHILD_EXIT_REJECTED: i32 = 1;
pub const CHILD_EXIT_UNDEFINED: i32 = 2;

/// The outcome of replaying one input. Exactly one is assigned per loaded input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayResult {
    /// The target ran to normal completion.
    Ok,
    /// The target reported the input as invalid.
    Rejected,
    /// The target terminated abnormally, or its execution context could not be launched.
    Crashed,
    /// The outcome could not be determined.
    Undefined,
}

impl fmt::Display for ReplayResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReplayResult::Ok => "ok",
            ReplayResult::Rejected => "rejected",
            ReplayResult::Crashed => "crashed",
            ReplayResult::Undefined => "undefined",
        };
        f.write_str(label)
    }
}

/// How a disposable execution context ended, as observed by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationStatus {
    /// The context exited on its own with this code.
    Exited(i32),
    /// The context was killed by this signal.
    Signaled(i32),
    /// The context could not be started.
    LaunchFailed(String),
    /// The context ran, but its termination status could not be read back.
    StatusUnavailable(String),
}

impl fmt::Display for TerminationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationStatus::Exited(code) => write!(f, "exited with code {code}"),
            TerminationStatus::Signaled(signal) => write!(f, "terminated by signal {signal}"),
            TerminationStatus::LaunchFailed(reason) => write!(f, "launch failed: {reason}"),
            TerminationStatus::StatusUnavailable(reason) => {
                write!(f, "status unavailable: {reason}")
            }
        }
    }
}

/// Meaning of a clean exit code, which depends on the isolation strategy that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitConvention {
    /// The exit code is the target's return value truncated to 8 bits.
    /// Unrecognised codes are `Undefined`.
    Direct,
    /// The exit code is one of the `CHILD_EXIT_*` values.
    /// Anything else means the child died before reporting and is `Crashed`.
    Reserved,
}

/// Maps a termination status to a replay result.
///
/// A signal death is always `Crashed`; the exit-code rules only apply to clean exits.
pub fn classify(status: &TerminationStatus, convention: ExitConvention) -> ReplayResult {
    match status {
        TerminationStatus::Signaled(_) => ReplayResult::Crashed,
        TerminationStatus::LaunchFailed(_) => ReplayResult::Crashed,
        TerminationStatus::StatusUnavailable(_) => ReplayResult::Undefined,
        TerminationStatus::Exited(code) => match convention {
            ExitConvention::Direct => classify_direct(*code),
            ExitConvention::Reserved => classify_reserved(*code),
        },
    }
}

fn classify_direct(code: i32) -> ReplayResult {
    match code as u8 {
        0 => ReplayResult::Ok,
        status if status as i32 == FORK_REJECTED_STATUS => ReplayResult::Rejected,
        _ => ReplayResult::Undefined,
    }
}

fn classify_reserved(code: i32) -> ReplayResult {
    match code {
        CHILD_EXIT_OK => ReplayResult::Ok,
        CHILD_EXIT_REJECTED => ReplayResult::Rejected,
        CHILD_EXIT_UNDEFINED => ReplayResult::Undefined,
        _ => ReplayResult::Crashed,
    }
}

/// Exit status a forked child should terminate with for a given target return value.
///
/// Undefined returns whose low byte would alias `0` or [`FORK_REJECTED_STATUS`]
/// are reported as `1` so truncation cannot turn them into Ok or Rejected.
pub fn fork_exit_status(target_return: i32) -> i32 {
    match TargetVerdict::from_return(target_return) {
        TargetVerdict::Accepted => 0,
        TargetVerdict::Rejected => FORK_REJECTED_STATUS,
        TargetVerdict::Undefined(code) => match code as u8 {
            0 | 255 => 1,
            low => low as i32,
        },
    }
}

/// Exit code a spawned child should terminate with for a given target return value.
pub fn child_exit_code(target_return: i32) -> i32 {
    match TargetVerdict::from_return(target_return) {
        TargetVerdict::Accepted => CHILD_EXIT_OK,
        TargetVerdict::Rejected => CHILD_EXIT_REJECTED,
        TargetVerdict::Undefined(_) => CHILD_EXIT_UNDEFINED,
    }
}
