use std::ffi::OsString;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Return value a target uses to mark an input as invalid rather than buggy.
pub const REJECTED_RETURN: i32 = -1;

/// The per-input entry point of a fuzz target.
///
/// Receives the complete contents of one input and returns `0` when the input was
/// processed normally, [`REJECTED_RETURN`] when the input is not meaningful to the
/// target, or any other value for an outcome the driver cannot interpret.
pub type TestOneInput = fn(&[u8]) -> i32;

/// Optional one-time setup hook.
///
/// Called once before the first input with the replay argument vector: the
/// program name followed by every input path. The hook may rewrite the vector;
/// whatever follows the program name afterwards is what gets replayed.
pub type Initialize = fn(&mut Vec<OsString>);

/// How the driver reads a single target return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetVerdict {
    Accepted,
    Rejected,
    Undefined(i32),
}

impl TargetVerdict {
    pub fn from_return(code: i32) -> Self {
        match code {
            0 => TargetVerdict::Accepted,
            REJECTED_RETURN => TargetVerdict::Rejected,
            other => TargetVerdict::Undefined(other),
        }
    }
}

/// A fuzz target as the replay driver sees it.
///
/// ```
/// use fuzzreplay_core::target::FuzzTarget;
///
/// fn parse(data: &[u8]) -> i32 {
///     if data.is_empty() { -1 } else { 0 }
/// }
///
/// let target = FuzzTarget::new(parse);
/// assert_eq!(target.invoke(b"x"), 0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FuzzTarget {
    test_one_input: TestOneInput,
    initialize: Option<Initialize>,
}

impl FuzzTarget {
    pub const fn new(test_one_input: TestOneInput) -> Self {
        Self {
            test_one_input,
            initialize: None,
        }
    }

    pub const fn with_initialize(mut self, initialize: Initialize) -> Self {
        self.initialize = Some(initialize);
        self
    }

    pub fn has_initialize(&self) -> bool {
        self.initialize.is_some()
    }

    /// Runs the initialize hook if the target provides one.
    ///
    /// Returns whether a hook ran.
    pub fn initialize(&self, args: &mut Vec<OsString>) -> bool {
        match self.initialize {
            Some(hook) => {
                hook(args);
                true
            }
            None => false,
        }
    }

    /// Calls the target directly in the current process.
    pub fn invoke(&self, data: &[u8]) -> i32 {
        (self.test_one_input)(data)
    }

    /// Calls the target from inside a disposable process.
    ///
    /// A panic must not unwind back into driver code running in the child, so
    /// it is turned into an abort and the parent observes a signal death.
    pub fn invoke_contained(&self, data: &[u8]) -> i32 {
        match catch_unwind(AssertUnwindSafe(|| self.invoke(data))) {
            Ok(code) => code,
            Err(_) => std::process::abort(),
        }
    }
}
