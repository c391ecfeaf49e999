use crate::outcome::ReplayResult;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// An input that crashed the target, in the order it was replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashRecord {
    /// Path the input was named by on the command line or in the config file.
    pub path: PathBuf,
    /// MD5 hex digest of the input bytes, useful for spotting duplicate crashers
    /// saved under different names.
    pub input_md5: String,
}

/// Aggregate statistics for one replay run.
///
/// Owned and mutated only by the replay loop, and written out once when every
/// input has been processed. Every parsed input lands in exactly one bucket, so
///
/// `parsed == ok + rejected + crashed + undefined + read_failures`
///
/// always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of input paths processed, including ones that could not be read.
    pub parsed: usize,
    pub ok: usize,
    pub rejected: usize,
    pub crashed: usize,
    /// Inputs whose outcome could not be determined.
    pub undefined: usize,
    /// Inputs that could not be loaded and were never executed.
    pub read_failures: usize,
    /// Crashing inputs in processing order.
    pub crashes: Vec<CrashRecord>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts an input that could not be loaded.
    pub fn record_read_failure(&mut self) {
        self.parsed += 1;
        self.read_failures += 1;
    }

    /// Counts an input that was executed and classified.
    ///
    /// # Arguments
    /// * `path`: The path the input was loaded from.
    /// * `data`: The input bytes; only hashed when the result is a crash.
    /// * `result`: The classification of the execution.
    pub fn record(&mut self, path: &Path, data: &[u8], result: ReplayResult) {
        self.parsed += 1;
        match result {
            ReplayResult::Ok => self.ok += 1,
            ReplayResult::Rejected => self.rejected += 1,
            ReplayResult::Undefined => self.undefined += 1,
            ReplayResult::Crashed => {
                self.crashed += 1;
                self.crashes.push(CrashRecord {
                    path: path.to_path_buf(),
                    input_md5: format!("{:x}", md5::compute(data)),
                });
            }
        }
    }

    pub fn crash_paths(&self) -> impl Iterator<Item = &Path> {
        self.crashes.iter().map(|c| c.path.as_path())
    }

    /// Writes the end-of-run summary block.
    ///
    /// The crash list section is omitted when nothing crashed.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "\nSummary:")?;
        writeln!(out, "{} Files parsed", self.parsed)?;
        writeln!(out, "{} Files OK", self.ok)?;
        writeln!(out, "{} Files Rejected", self.rejected)?;
        writeln!(out, "{} Files crashed", self.crashed)?;

        if !self.crashes.is_empty() {
            writeln!(out, "-- crashes:")?;
            for crash in &self.crashes {
                writeln!(out, "- {}", crash.path.display())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(summary: &RunSummary) -> String {
        let mut out = Vec::new();
        summary.write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn empty_summary_has_no_crash_section() {
        let summary = RunSummary::new();
        assert_eq!(
            render(&summary),
            "\nSummary:\n0 Files parsed\n0 Files OK\n0 Files Rejected\n0 Files crashed\n"
        );
    }

    #[test]
    fn record_keeps_buckets_consistent() {
        let mut summary = RunSummary::new();
        summary.record(Path::new("a"), b"a", ReplayResult::Ok);
        summary.record(Path::new("b"), b"b", ReplayResult::Rejected);
        summary.record(Path::new("c"), b"c", ReplayResult::Crashed);
        summary.record(Path::new("d"), b"d", ReplayResult::Undefined);
        summary.record_read_failure();

        assert_eq!(summary.parsed, 5);
        assert_eq!(
            summary.parsed,
            summary.ok
                + summary.rejected
                + summary.crashed
                + summary.undefined
                + summary.read_failures
        );
        assert_eq!(summary.crash_paths().collect::<Vec<_>>(), vec![Path::new("c")]);
    }

    #[test]
    fn crash_record_carries_md5_of_input() {
        let mut summary = RunSummary::new();
        summary.record(Path::new("crash-1"), b"hello", ReplayResult::Crashed);
        assert_eq!(summary.crashes[0].input_md5, "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn crash_list_is_printed_in_processing_order() {
        let mut summary = RunSummary::new();
        summary.record(Path::new("z-last-name"), b"1", ReplayResult::Crashed);
        summary.record(Path::new("ok"), b"2", ReplayResult::Ok);
        summary.record(Path::new("a-first-name"), b"3", ReplayResult::Crashed);

        let text = render(&summary);
        assert!(text.ends_with("-- crashes:\n- z-last-name\n- a-first-name\n"), "{text}");
        assert!(text.contains("3 Files parsed\n1 Files OK\n0 Files Rejected\n2 Files crashed\n"));
    }
}
