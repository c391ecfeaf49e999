use crate::executor::Executor;
use crate::input::InputFile;
use crate::outcome::{ReplayResult, classify};
use crate::report::RunSummary;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Replays a list of inputs one at a time through an isolating executor.
///
/// Diagnostics go to `diag` as they happen; the summary is written once at the end.
/// Per-input failures never abort the run, and a failed write to `diag` is not
/// treated as a failure either.
pub struct Replayer<'e, W: Write> {
    executor: &'e mut dyn Executor,
    diag: W,
}

impl<'e, W: Write> Replayer<'e, W> {
    pub fn new(executor: &'e mut dyn Executor, diag: W) -> Self {
        Self { executor, diag }
    }

    /// Replays every path in order and returns the accumulated summary.
    pub fn run(&mut self, inputs: &[PathBuf]) -> RunSummary {
        tracing::debug!(
            executor = self.executor.name(),
            inputs = inputs.len(),
            "starting replay"
        );

        let mut summary = RunSummary::new();
        for path in inputs {
            self.replay_one(path, &mut summary);
        }

        if let Err(e) = summary.write_to(&mut self.diag) {
            tracing::warn!(error = %e, "failed to write summary");
        }
        summary
    }

    fn replay_one(&mut self, path: &Path, summary: &mut RunSummary) {
        let input = match InputFile::load(path) {
            Ok(input) => input,
            Err(e) => {
                summary.record_read_failure();
                let message = match e.io_error() {
                    Some(io) => io.to_string(),
                    None => e.to_string(),
                };
                self.emit(format_args!("Read error ({}): {message}", path.display()));
                return;
            }
        };

        let status = self.executor.execute_isolated(&input);
        let result = classify(&status, self.executor.exit_convention());
        tracing::debug!(path = ?input.path, %status, %result, "input replayed");

        summary.record(&input.path, input.as_bytes(), result);
        match result {
            ReplayResult::Crashed => {
                if let Some(crash) = summary.crashes.last() {
                    tracing::debug!(md5 = %crash.input_md5, "crashing input digest");
                }
                self.emit(format_args!("Crash detected: {}", path.display()));
            }
            ReplayResult::Undefined => {
                self.emit(format_args!("Undefined fuzzer result: {}", path.display()));
            }
            ReplayResult::Ok | ReplayResult::Rejected => {}
        }
    }

    fn emit(&mut self, line: std::fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.diag, "{line}") {
            tracing::warn!(error = %e, "failed to write diagnostic");
        }
    }

    pub fn into_inner(self) -> W {
        self.diag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{ExitConvention, TerminationStatus};
    use std::collections::HashMap;

    /// Answers from a fixed table keyed by input contents.
    struct ScriptedExecutor {
        by_contents: HashMap<Vec<u8>, TerminationStatus>,
        executed: Vec<PathBuf>,
    }

    impl ScriptedExecutor {
        fn new(entries: &[(&str, TerminationStatus)]) -> Self {
            Self {
                by_contents: entries
                    .iter()
                    .map(|(k, v)| (k.as_bytes().to_vec(), v.clone()))
                    .collect(),
                executed: Vec::new(),
            }
        }
    }

    impl Executor for ScriptedExecutor {
        fn name(&self) -> &'static str {
            "scripted"
        }
        fn exit_convention(&self) -> ExitConvention {
            ExitConvention::Direct
        }
        fn execute_isolated(&mut self, input: &InputFile) -> TerminationStatus {
            self.executed.push(input.path.clone());
            self.by_contents
                .get(&input.data)
                .cloned()
                .unwrap_or(TerminationStatus::Exited(0))
        }
    }

    fn write_input(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::File::create(&path)
            .and_then(|mut f| f.write_all(bytes))
            .unwrap();
        path
    }

    fn scenario_executor() -> ScriptedExecutor {
        ScriptedExecutor::new(&[
            ("good", TerminationStatus::Exited(0)),
            ("bad", TerminationStatus::Exited(255)),
            ("boom", TerminationStatus::Signaled(11)),
            ("odd", TerminationStatus::Exited(9)),
            ("lost", TerminationStatus::StatusUnavailable("ECHILD".into())),
            ("nofork", TerminationStatus::LaunchFailed("EAGAIN".into())),
        ])
    }

    #[test]
    fn ok_rejected_crashed_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_input(dir.path(), "A", b"good");
        let b = write_input(dir.path(), "B", b"bad");
        let c = write_input(dir.path(), "C", b"boom");

        let mut executor = scenario_executor();
        let mut replayer = Replayer::new(&mut executor, Vec::new());
        let summary = replayer.run(&[a, b, c.clone()]);
        let text = String::from_utf8(replayer.into_inner()).unwrap();

        assert_eq!((summary.parsed, summary.ok, summary.rejected, summary.crashed), (3, 1, 1, 1));
        assert_eq!(summary.crash_paths().collect::<Vec<_>>(), vec![c.as_path()]);
        assert!(text.contains(&format!("Crash detected: {}\n", c.display())));
        assert!(text.ends_with(&format!("-- crashes:\n- {}\n", c.display())), "{text}");
    }

    #[test]
    fn empty_input_list() {
        let mut executor = scenario_executor();
        let mut replayer = Replayer::new(&mut executor, Vec::new());
        let summary = replayer.run(&[]);
        let text = String::from_utf8(replayer.into_inner()).unwrap();

        assert_eq!(summary, RunSummary::default());
        assert!(!text.contains("-- crashes:"));
        assert!(text.contains("0 Files parsed"));
    }

    #[test]
    fn missing_file_is_read_error_not_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let good = write_input(dir.path(), "good", b"good");

        let mut executor = scenario_executor();
        let mut replayer = Replayer::new(&mut executor, Vec::new());
        let summary = replayer.run(&[missing.clone(), good.clone()]);
        let text = String::from_utf8(replayer.into_inner()).unwrap();

        assert_eq!(summary.parsed, 2);
        assert_eq!(summary.read_failures, 1);
        assert_eq!(
            (summary.ok, summary.rejected, summary.crashed, summary.undefined),
            (1, 0, 0, 0)
        );
        assert!(text.contains(&format!("Read error ({}): ", missing.display())), "{text}");
        assert_eq!(executor.executed, vec![good]);
    }

    #[test]
    fn crash_does_not_stop_later_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![
            write_input(dir.path(), "1", b"boom"),
            write_input(dir.path(), "2", b"good"),
            write_input(dir.path(), "3", b"nofork"),
            write_input(dir.path(), "4", b"bad"),
        ];

        let mut executor = scenario_executor();
        let summary = Replayer::new(&mut executor, Vec::new()).run(&paths);

        assert_eq!(executor.executed, paths);
        assert_eq!(summary.crashed, 2);
        assert_eq!(
            summary.crash_paths().collect::<Vec<_>>(),
            vec![paths[0].as_path(), paths[2].as_path()]
        );
        assert_eq!((summary.ok, summary.rejected), (1, 1));
    }

    #[test]
    fn undefined_outcomes_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let odd = write_input(dir.path(), "odd", b"odd");
        let lost = write_input(dir.path(), "lost", b"lost");

        let mut executor = scenario_executor();
        let mut replayer = Replayer::new(&mut executor, Vec::new());
        let summary = replayer.run(&[odd.clone(), lost.clone()]);
        let text = String::from_utf8(replayer.into_inner()).unwrap();

        assert_eq!(summary.undefined, 2);
        assert_eq!(summary.crashed, 0);
        assert!(text.contains(&format!("Undefined fuzzer result: {}\n", odd.display())));
        assert!(text.contains(&format!("Undefined fuzzer result: {}\n", lost.display())));
    }

    #[test]
    fn replaying_twice_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![
            write_input(dir.path(), "x", b"boom"),
            write_input(dir.path(), "y", b"bad"),
            dir.path().join("absent"),
            write_input(dir.path(), "z", b"boom"),
        ];

        let mut executor = scenario_executor();
        let mut first = Replayer::new(&mut executor, Vec::new());
        let first_summary = first.run(&paths);
        let first_text = first.into_inner();

        let mut second = Replayer::new(&mut executor, Vec::new());
        let second_summary = second.run(&paths);
        let second_text = second.into_inner();

        assert_eq!(first_summary, second_summary);
        assert_eq!(first_text, second_text);
    }
}
