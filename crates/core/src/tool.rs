//! Running external command-line tools with a timeout.

use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Poll interval while waiting for a child process.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// An external program resolved to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    name: String,
    path: PathBuf,
}

/// Captured result of a finished tool run.
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

impl Tool {
    /// Find `name` on `PATH`.
    pub fn find(name: &str) -> Result<Self> {
        Self::find_or(name, &[])
    }

    /// Find `name` on `PATH`, then at the given fallback locations.
    pub fn find_or(name: &str, fallbacks: &[&Path]) -> Result<Self> {
        if let Ok(path) = which::which(name) {
            return Ok(Self::at(name, path));
        }
        fallbacks
            .iter()
            .find(|p| p.is_file())
            .map(|p| Self::at(name, p.to_path_buf()))
            .ok_or_else(|| Error::MissingTool(name.to_string()))
    }

    /// Use the program at `path` without searching.
    pub fn at(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run with `args`, killing the child when it outlives `timeout`.
    ///
    /// A non-zero exit is reported as [`Error::ToolFailed`] with the
    /// child's stderr.
    pub fn run<I, S>(&self, args: I, timeout: Duration) -> Result<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.run_unchecked(args, timeout)?;
        if !output.status.success() {
            let stderr = output.stderr_text();
            return Err(Error::ToolFailed {
                tool: self.name.clone(),
                message: if stderr.is_empty() {
                    output.status.to_string()
                } else {
                    stderr
                },
            });
        }
        Ok(output)
    }

    /// Like [`Tool::run`], but hands back failing exits instead of erroring.
    pub fn run_unchecked<I, S>(&self, args: I, timeout: Duration) -> Result<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        log::debug!("running {} ({})", self.name, self.path.display());

        let mut child = Command::new(&self.path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::ToolFailed {
                tool: self.name.clone(),
                message: format!("failed to start: {}", e),
            })?;

        // Drain pipes concurrently so a chatty child never blocks on a full pipe.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait_with_timeout(&mut child, timeout)?;

        Ok(ToolOutput {
            status,
            stdout: join(stdout),
            stderr: join(stderr),
        })
    }

    fn wait_with_timeout(&self, child: &mut Child, timeout: Duration) -> Result<ExitStatus> {
        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if start.elapsed() > timeout {
                log::warn!("{} timed out after {:?}, killing", self.name, timeout);
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Timeout {
                    tool: self.name.clone(),
                    seconds: timeout.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn join(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool() {
        let err = Tool::find("docref-no-such-tool").unwrap_err();
        assert!(matches!(err, Error::MissingTool(name) if name == "docref-no-such-tool"));
    }

    #[test]
    fn test_fallback_location() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("fake-soffice");
        std::fs::write(&fake, b"").unwrap();

        let tool = Tool::find_or("docref-no-such-tool", &[Path::new("/nonexistent"), fake.as_path()]).unwrap();
        assert_eq!(tool.path(), fake.as_path());
    }

    #[test]
    fn test_captures_stdout() {
        let tool = Tool::find("sh").unwrap();
        let output = tool
            .run(["-c", "printf hello"], Duration::from_secs(10))
            .unwrap();
        assert_eq!(output.stdout_text(), "hello");
    }

    #[test]
    fn test_failure_reports_stderr() {
        let tool = Tool::find("sh").unwrap();
        let err = tool
            .run(["-c", "echo broken >&2; exit 3"], Duration::from_secs(10))
            .unwrap_err();
        match err {
            Error::ToolFailed { tool, message } => {
                assert_eq!(tool, "sh");
                assert_eq!(message, "broken");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_timeout_kills_child() {
        let tool = Tool::find("sh").unwrap();
        let start = Instant::now();
        let err = tool
            .run(["-c", "exec sleep 30"], Duration::from_millis(300))
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
