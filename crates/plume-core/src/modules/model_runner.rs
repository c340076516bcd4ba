//! Drives the external `plume_alone_module` binary.

use crate::common::constants::{MODEL_STDERR_CAPTURE, MODEL_STDOUT_CAPTURE, RUN_LOG_FILE};
use crate::domain::{PlumeError, PlumeResult};
use crate::modules::serialization::write_text_artifact;
use crate::modules::traits::PlumeModel;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_MODEL_BINARY: &str = "./plume_alone_module";
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(3600);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured console output of one model invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelRunLog {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

impl ModelRunLog {
    /// A run passes when the model wrote nothing to its error stream.
    pub fn passed(&self) -> bool {
        self.stderr.is_empty()
    }

    pub fn render(&self) -> String {
        format!(
            "Plume model log:\n{}\nWarning/error messages:\n{}",
            self.stdout, self.stderr
        )
    }

    pub fn write_into(&self, directory: &Path) -> PlumeResult<()> {
        write_text_artifact(&directory.join(RUN_LOG_FILE), &self.render())
    }
}

/// Runs the model as a child process with a bounded wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalPlumeModel {
    binary: PathBuf,
    timeout: Duration,
    poll_interval: Duration,
}

impl ExternalPlumeModel {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: DEFAULT_MODEL_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The child runs inside the staging directory, so relative paths are pinned to the
    /// caller's working directory first. Bare names are left for `PATH` lookup.
    fn resolved_binary(&self) -> PlumeResult<PathBuf> {
        if self.binary.is_absolute() || self.binary.components().count() == 1 {
            return Ok(self.binary.clone());
        }
        let working_dir = std::env::current_dir().map_err(|source| {
            PlumeError::io_system(
                "IO.CURRENT_DIR",
                format!("failed to read current working directory: {}", source),
            )
        })?;
        Ok(working_dir.join(&self.binary))
    }

    fn wait_bounded(&self, child: &mut std::process::Child, binary: &Path) -> PlumeResult<ExitStatus> {
        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {}
                Err(source) => {
                    return Err(PlumeError::io_system(
                        "IO.MODEL_WAIT",
                        format!(
                            "failed to wait for plume model '{}': {}",
                            binary.display(),
                            source
                        ),
                    ));
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= self.timeout {
                if let Err(source) = child.kill() {
                    warn!(error = %source, "failed to kill timed-out plume model");
                }
                if let Err(source) = child.wait() {
                    warn!(error = %source, "failed to reap timed-out plume model");
                }
                return Err(PlumeError::computation(
                    "RUN.MODEL_TIMEOUT",
                    format!(
                        "plume model '{}' did not finish within {:.1} s and was terminated",
                        binary.display(),
                        self.timeout.as_secs_f64()
                    ),
                ));
            }
            thread::sleep(self.poll_interval.min(self.timeout - elapsed));
        }
    }
}

impl Default for ExternalPlumeModel {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_BINARY)
    }
}

impl PlumeModel for ExternalPlumeModel {
    fn simulate(&self, work_dir: &Path) -> PlumeResult<ModelRunLog> {
        let binary = self.resolved_binary()?;
        let stdout_path = work_dir.join(MODEL_STDOUT_CAPTURE);
        let stderr_path = work_dir.join(MODEL_STDERR_CAPTURE);
        let stdout_file = create_capture(&stdout_path)?;
        let stderr_file = create_capture(&stderr_path)?;

        info!(binary = %binary.display(), work_dir = %work_dir.display(), "starting plume model");
        let started = Instant::now();
        let mut child = Command::new(&binary)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_file))
            .stderr(Stdio::from(stderr_file))
            .spawn()
            .map_err(|source| {
                PlumeError::io_system(
                    "IO.MODEL_SPAWN",
                    format!(
                        "failed to start plume model '{}': {}",
                        binary.display(),
                        source
                    ),
                )
            })?;

        let status = self.wait_bounded(&mut child, &binary);
        let stdout = take_capture(&stdout_path);
        let stderr = take_capture(&stderr_path);
        let elapsed = started.elapsed();
        let status = match status {
            Ok(status) => status,
            Err(error) => {
                let partial = ModelRunLog {
                    stdout,
                    stderr: format!("{}{}\n", stderr, error.message()),
                    exit_code: None,
                    elapsed,
                };
                if let Err(source) = partial.write_into(work_dir) {
                    warn!(error = %source, "failed to write partial plume model log");
                }
                return Err(error);
            }
        };

        let log = ModelRunLog {
            stdout,
            stderr,
            exit_code: status.code(),
            elapsed,
        };
        if !status.success() {
            warn!(exit_code = ?log.exit_code, "plume model exited unsuccessfully");
        }
        debug!(
            elapsed_ms = elapsed.as_millis() as u64,
            stderr_bytes = log.stderr.len(),
            "plume model finished"
        );
        Ok(log)
    }
}

fn create_capture(path: &Path) -> PlumeResult<File> {
    File::create(path).map_err(|source| {
        PlumeError::io_system(
            "IO.MODEL_CAPTURE",
            format!(
                "failed to create model output capture '{}': {}",
                path.display(),
                source
            ),
        )
    })
}

/// Reads and removes a capture file; missing or unreadable captures read as empty.
fn take_capture(path: &Path) -> String {
    let content = match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(source) => {
            warn!(path = %path.display(), error = %source, "model output capture is unreadable");
            String::new()
        }
    };
    if let Err(source) = fs::remove_file(path) {
        if source.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %source, "failed to remove model output capture");
        }
    }
    content
}

#[cfg(test)]
mod tests {
    use super::{ExternalPlumeModel, ModelRunLog};
    use crate::common::constants::{MODEL_STDERR_CAPTURE, MODEL_STDOUT_CAPTURE, RUN_LOG_FILE};
    use crate::modules::traits::PlumeModel;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn log_render_matches_archived_layout() {
        let log = ModelRunLog {
            stdout: "converged\n".to_string(),
            stderr: String::new(),
            exit_code: Some(0),
            elapsed: Duration::from_millis(5),
        };
        assert!(log.passed());
        assert_eq!(
            log.render(),
            "Plume model log:\nconverged\n\nWarning/error messages:\n"
        );

        let temp = TempDir::new().expect("tempdir should be created");
        log.write_into(temp.path()).expect("log should write");
        let written = fs::read_to_string(temp.path().join(RUN_LOG_FILE)).expect("log exists");
        assert!(written.starts_with("Plume model log:\n"));
    }

    #[test]
    fn any_stderr_output_marks_the_run_failed() {
        let log = ModelRunLog {
            stderr: "STOP: negative mixing ratio\n".to_string(),
            ..ModelRunLog::default()
        };
        assert!(!log.passed());
    }

    #[test]
    fn missing_binary_is_an_io_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        let model = ExternalPlumeModel::new(temp.path().join("no-such-model"));
        let error = model
            .simulate(temp.path())
            .expect_err("missing binary should fail");
        assert_eq!(error.placeholder(), "IO.MODEL_SPAWN");
        assert_eq!(error.exit_code(), 3);
    }

    #[cfg(unix)]
    fn write_script(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("script should write");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("script should be executable");
        path
    }

    #[cfg(unix)]
    #[test]
    fn model_runs_in_the_work_directory_and_captures_output() {
        let bin = TempDir::new().expect("tempdir should be created");
        let work = TempDir::new().expect("tempdir should be created");
        let script = write_script(
            bin.path(),
            "fake_model",
            "echo 'plume rising'\necho '0.0 1 2' > final_plume.dat",
        );

        let log = ExternalPlumeModel::new(script)
            .simulate(work.path())
            .expect("model should run");
        assert!(log.passed());
        assert_eq!(log.stdout, "plume rising\n");
        assert_eq!(log.exit_code, Some(0));
        assert!(work.path().join("final_plume.dat").is_file());
        assert!(!work.path().join(MODEL_STDOUT_CAPTURE).exists());
        assert!(!work.path().join(MODEL_STDERR_CAPTURE).exists());
    }

    #[cfg(unix)]
    #[test]
    fn stderr_output_is_captured_separately() {
        let bin = TempDir::new().expect("tempdir should be created");
        let work = TempDir::new().expect("tempdir should be created");
        let script = write_script(bin.path(), "noisy_model", "echo 'ok'\necho 'trouble' >&2");

        let log = ExternalPlumeModel::new(script)
            .simulate(work.path())
            .expect("model should run");
        assert!(!log.passed());
        assert_eq!(log.stdout, "ok\n");
        assert_eq!(log.stderr, "trouble\n");
    }

    #[cfg(unix)]
    #[test]
    fn hung_model_is_terminated_after_the_timeout() {
        let bin = TempDir::new().expect("tempdir should be created");
        let work = TempDir::new().expect("tempdir should be created");
        let script = write_script(bin.path(), "hung_model", "exec sleep 30");

        let error = ExternalPlumeModel::new(script)
            .with_timeout(Duration::from_millis(200))
            .with_poll_interval(Duration::from_millis(10))
            .simulate(work.path())
            .expect_err("hung model should time out");
        assert_eq!(error.placeholder(), "RUN.MODEL_TIMEOUT");
        assert_eq!(error.exit_code(), 4);

        let log = fs::read_to_string(work.path().join(RUN_LOG_FILE))
            .expect("partial log should be written");
        assert!(log.contains("did not finish within"));
    }
}
