use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

pub const SUCCESS_FILE: &str = "successWallets.txt";
pub const FAILED_FILE: &str = "failedWallets.txt";

/// Durable batch progress. Every input line lives in exactly one of the
/// three lists; all three files are rewritten in full after each wallet,
/// so a crash loses at most the in-flight wallet's outcome (that wallet
/// stays in `remaining` until its own overwrite lands).
#[derive(Debug)]
pub struct QueueState {
    wallets_file: PathBuf,
    success_file: PathBuf,
    failed_file: PathBuf,
    pub remaining: Vec<String>,
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read wallet list: {path:?}"))?;
    let normalized = raw.replace("\r\n", "\n");
    Ok(normalized
        .split('\n')
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

impl QueueState {
    /// Loads `remaining` from the wallets file and, when present, the
    /// succeeded/failed lists of an interrupted earlier run.
    pub fn load(wallets_file: &Path) -> Result<Self> {
        let dir = wallets_file.parent().unwrap_or(Path::new("."));
        let success_file = dir.join(SUCCESS_FILE);
        let failed_file = dir.join(FAILED_FILE);

        let remaining = read_lines(wallets_file)?;
        let succeeded = if success_file.exists() {
            read_lines(&success_file)?
        } else {
            Vec::new()
        };
        let failed = if failed_file.exists() {
            read_lines(&failed_file)?
        } else {
            Vec::new()
        };

        Ok(Self {
            wallets_file: wallets_file.to_path_buf(),
            success_file,
            failed_file,
            remaining,
            succeeded,
            failed,
        })
    }

    pub fn mark_succeeded(&mut self, line: &str) {
        self.take_remaining(line);
        self.succeeded.push(line.to_string());
    }

    pub fn mark_failed(&mut self, line: &str) {
        self.take_remaining(line);
        self.failed.push(line.to_string());
    }

    // first occurrence only, in case the input carries duplicate lines
    fn take_remaining(&mut self, line: &str) {
        if let Some(idx) = self.remaining.iter().position(|l| l == line) {
            self.remaining.remove(idx);
        }
    }

    /// Full overwrite of all three artifacts; no append, no journal.
    pub fn persist(&self) -> Result<()> {
        fs::write(&self.failed_file, self.failed.join("\n"))
            .context("Failed to write failed wallets file")?;
        fs::write(&self.success_file, self.succeeded.join("\n"))
            .context("Failed to write success wallets file")?;
        fs::write(&self.wallets_file, self.remaining.join("\n"))
            .context("Failed to write remaining wallets file")?;
        debug!(
            "queue persisted: {} remaining, {} succeeded, {} failed",
            self.remaining.len(),
            self.succeeded.len(),
            self.failed.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seed(dir: &Path, lines: &str) -> PathBuf {
        let path = dir.join("walletsData.txt");
        fs::write(&path, lines).unwrap();
        path
    }

    #[test]
    fn loads_lines_dropping_blanks_and_crlf() {
        let dir = tempdir().unwrap();
        let path = seed(dir.path(), "a|1\r\n\r\nb|2\nc|3\n\n");
        let queue = QueueState::load(&path).unwrap();
        assert_eq!(queue.remaining, vec!["a|1", "b|2", "c|3"]);
        assert!(queue.succeeded.is_empty());
        assert!(queue.failed.is_empty());
    }

    #[test]
    fn every_line_lives_in_exactly_one_list() {
        let dir = tempdir().unwrap();
        let path = seed(dir.path(), "a|1\nb|2\nc|3");
        let mut queue = QueueState::load(&path).unwrap();

        queue.mark_succeeded("a|1");
        queue.mark_failed("b|2");

        let mut union: Vec<&String> = queue
            .remaining
            .iter()
            .chain(queue.succeeded.iter())
            .chain(queue.failed.iter())
            .collect();
        union.sort();
        assert_eq!(union, vec!["a|1", "b|2", "c|3"]);
        assert_eq!(queue.remaining, vec!["c|3"]);
    }

    #[test]
    fn each_outcome_moves_exactly_one_entry() {
        let dir = tempdir().unwrap();
        let path = seed(dir.path(), "a|1\nb|2");
        let mut queue = QueueState::load(&path).unwrap();

        queue.mark_succeeded("a|1");
        assert_eq!(queue.remaining.len(), 1);
        assert_eq!(queue.succeeded.len(), 1);
        assert_eq!(queue.failed.len(), 0);

        queue.mark_failed("b|2");
        assert_eq!(queue.remaining.len(), 0);
        assert_eq!(queue.succeeded.len(), 1);
        assert_eq!(queue.failed.len(), 1);
    }

    #[test]
    fn duplicate_lines_leave_one_copy_behind() {
        let dir = tempdir().unwrap();
        let path = seed(dir.path(), "a|1\na|1");
        let mut queue = QueueState::load(&path).unwrap();

        queue.mark_succeeded("a|1");
        assert_eq!(queue.remaining, vec!["a|1"]);
    }

    #[test]
    fn persist_then_reload_resumes_where_it_stopped() {
        let dir = tempdir().unwrap();
        let path = seed(dir.path(), "a|1\nb|2\nc|3");

        let mut queue = QueueState::load(&path).unwrap();
        queue.mark_succeeded("b|2");
        queue.persist().unwrap();

        // simulated restart: remaining keeps the input file's relative
        // order, and the earlier outcome survives
        let resumed = QueueState::load(&path).unwrap();
        assert_eq!(resumed.remaining, vec!["a|1", "c|3"]);
        assert_eq!(resumed.succeeded, vec!["b|2"]);
        assert!(resumed.failed.is_empty());
    }

    #[test]
    fn persist_overwrites_rather_than_appends() {
        let dir = tempdir().unwrap();
        let path = seed(dir.path(), "a|1\nb|2");

        let mut queue = QueueState::load(&path).unwrap();
        queue.mark_failed("a|1");
        queue.persist().unwrap();
        queue.mark_succeeded("b|2");
        queue.persist().unwrap();

        let failed = fs::read_to_string(dir.path().join(FAILED_FILE)).unwrap();
        assert_eq!(failed, "a|1");
        let succeeded = fs::read_to_string(dir.path().join(SUCCESS_FILE)).unwrap();
        assert_eq!(succeeded, "b|2");
        let remaining = fs::read_to_string(&path).unwrap();
        assert!(remaining.is_empty());
    }
}
