use super::error::RefinementError;
use super::workspace::FileRoot;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Environment variable naming the FullProf installation directory.
pub const SOLVER_DIR_ENV: &str = "FULLPROF";

#[cfg(windows)]
const BINARY_NAME: &str = "fp2k.exe";
#[cfg(not(windows))]
const BINARY_NAME: &str = "fp2k";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs an external refinement on the files under a [`FileRoot`].
///
/// A successful return only means the process ran to completion; whether the
/// refinement converged is read from the files it leaves behind.
pub trait Solver {
    /// Runs the solver on `root`. With a `timeout`, a run that outlives it is
    /// killed and reported as [`RefinementError::Timeout`].
    fn execute(&self, root: &FileRoot, timeout: Option<Duration>) -> Result<(), RefinementError>;
}

/// Invokes FullProf's `fp2k` on the deck of a [`FileRoot`].
#[derive(Debug, Clone)]
pub struct FullprofSolver {
    binary: PathBuf,
}

impl FullprofSolver {
    /// Locates the binary through the `FULLPROF` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`RefinementError::MissingBinary`] if the variable is unset or
    /// the directory has no `fp2k`.
    pub fn from_env() -> Result<Self, RefinementError> {
        let dir = std::env::var_os(SOLVER_DIR_ENV).ok_or_else(|| RefinementError::MissingBinary {
            reason: format!("${SOLVER_DIR_ENV} is not set"),
        })?;
        Self::locate(dir)
    }

    /// Resolves `<dir>/fp2k` to an absolute path.
    pub fn locate(dir: impl AsRef<Path>) -> Result<Self, RefinementError> {
        let candidate = dir.as_ref().join(BINARY_NAME);
        let binary = fs::canonicalize(&candidate)
            .ok()
            .filter(|path| path.is_file())
            .ok_or_else(|| RefinementError::MissingBinary {
                reason: format!("'{}' does not exist", candidate.display()),
            })?;
        debug!(binary = %binary.display(), "Located FullProf.");
        Ok(Self { binary })
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl Solver for FullprofSolver {
    fn execute(&self, root: &FileRoot, timeout: Option<Duration>) -> Result<(), RefinementError> {
        let log = File::create(root.log_path())?;
        let deck = root.deck_path();
        let deck_name = deck.file_name().unwrap_or(deck.as_os_str());

        info!(deck = %deck.display(), "Running FullProf.");
        let mut child = Command::new(&self.binary)
            .arg(deck_name)
            .current_dir(root.dir())
            .stdin(Stdio::null())
            .stdout(Stdio::from(log.try_clone()?))
            .stderr(Stdio::from(log))
            .spawn()?;

        let status = match timeout {
            Some(timeout) => wait_with_timeout(&mut child, timeout)?,
            None => child.wait()?,
        };
        debug!(%status, "FullProf exited.");
        Ok(())
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus, RefinementError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            warn!(timeout_s = timeout.as_secs_f64(), "FullProf timed out; killing it.");
            // The process may exit between the poll and the kill.
            let _ = child.kill();
            child.wait()?;
            return Err(RefinementError::Timeout(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// Files a scripted run leaves behind. `None` leaves the file unwritten.
    #[derive(Debug, Clone, Default)]
    pub struct Script {
        pub summary: Option<String>,
        pub log: String,
        pub profile: Option<String>,
    }

    /// A solver that writes canned output files instead of running FullProf.
    ///
    /// Call `n` uses script `n`, repeating the last one once exhausted.
    #[derive(Debug, Default)]
    pub struct ScriptedSolver {
        scripts: Vec<Script>,
        calls: Cell<usize>,
        decks: RefCell<Vec<String>>,
        timeouts: RefCell<Vec<Option<Duration>>>,
    }

    impl ScriptedSolver {
        pub fn new(scripts: Vec<Script>) -> Self {
            Self {
                scripts,
                ..Self::default()
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.get()
        }

        /// Deck contents seen by each call.
        pub fn decks(&self) -> Vec<String> {
            self.decks.borrow().clone()
        }

        /// Timeout passed to each call.
        pub fn timeouts(&self) -> Vec<Option<Duration>> {
            self.timeouts.borrow().clone()
        }
    }

    impl Solver for ScriptedSolver {
        fn execute(&self, root: &FileRoot, timeout: Option<Duration>) -> Result<(), RefinementError> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            self.timeouts.borrow_mut().push(timeout);
            self.decks
                .borrow_mut()
                .push(fs::read_to_string(root.deck_path())?);

            let Some(script) = self.scripts.get(call).or(self.scripts.last()) else {
                return Ok(());
            };
            fs::write(root.log_path(), &script.log)?;
            fs::write(root.output_path(), "scripted run\n")?;
            if let Some(summary) = &script.summary {
                fs::write(root.summary_path(), summary)?;
            }
            if let Some(profile) = &script.profile {
                fs::write(root.result_path(), profile)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn locate_without_binary_is_missing_binary() {
        let dir = tempdir().unwrap();
        match FullprofSolver::locate(dir.path()) {
            Err(RefinementError::MissingBinary { reason }) => assert!(reason.contains(BINARY_NAME)),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn locate_finds_binary_in_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(BINARY_NAME), "").unwrap();
        let solver = FullprofSolver::locate(dir.path()).unwrap();
        assert!(solver.binary().is_absolute());
        assert!(solver.binary().ends_with(BINARY_NAME));
    }

    #[cfg(unix)]
    fn install_script(dir: &Path, body: &str) -> FullprofSolver {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(BINARY_NAME);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        FullprofSolver::locate(dir).unwrap()
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn execute_runs_in_deck_directory_and_captures_stdout() {
        let bin_dir = tempdir().unwrap();
        let work_dir = tempdir().unwrap();
        let solver = install_script(bin_dir.path(), "echo \"deck=$1\"; ls");
        let root = FileRoot::new(work_dir.path(), "sample");
        fs::write(root.deck_path(), "COMM test\n").unwrap();

        solver.execute(&root, None).unwrap();

        let log = fs::read_to_string(root.log_path()).unwrap();
        assert!(log.contains("deck=sample.pcr"));
        assert!(log.lines().any(|line| line == "sample.pcr"));
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn execute_kills_solver_after_timeout() {
        let bin_dir = tempdir().unwrap();
        let work_dir = tempdir().unwrap();
        let solver = install_script(bin_dir.path(), "exec sleep 30");
        let root = FileRoot::new(work_dir.path(), "sample");

        let started = Instant::now();
        let result = solver.execute(&root, Some(Duration::from_millis(200)));
        assert!(matches!(result, Err(RefinementError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
