//! External process execution.
//!
//! Every compiler, installer, container engine and version-control call goes
//! through [`ExecSpec::run`]. Children run in their own process group so
//! cancellation can take down the whole tree, not just the direct child.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Description of one external process invocation.
#[derive(Debug, Clone)]
pub struct ExecSpec {
    program: PathBuf,
    args: Vec<OsString>,
    dir: Option<PathBuf>,
    env: Vec<(String, String)>,
    inherit_env: bool,
    stdin: Option<Vec<u8>>,
    capture: bool,
}

/// Result of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Captured standard output; empty unless capture was requested.
    pub stdout: Vec<u8>,
    /// Captured standard error; empty unless capture was requested.
    pub stderr: Vec<u8>,
}

impl ExecOutput {
    /// Standard output as trimmed text.
    #[must_use]
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }
}

impl ExecSpec {
    /// Start describing an invocation of `program`.
    ///
    /// The child sees only the variables added with [`Self::env`] unless
    /// [`Self::inherit_env`] is called.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            dir: None,
            env: Vec::new(),
            inherit_env: false,
            stdin: None,
            capture: false,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Working directory.
    #[must_use]
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Add one environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Add several environment variables; later entries win.
    #[must_use]
    pub fn envs<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.env.extend(vars);
        self
    }

    /// Layer the explicit variables over the parent environment.
    #[must_use]
    pub fn inherit_env(mut self) -> Self {
        self.inherit_env = true;
        self
    }

    /// Feed `data` to the child's standard input.
    #[must_use]
    pub fn stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Capture standard output and error instead of streaming them.
    #[must_use]
    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Program being run.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments, in order.
    #[must_use]
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Value of an explicitly set variable (last assignment wins).
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Working directory, if set.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Shell-like rendering for logs and error messages.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|part| {
                let part = part.to_string_lossy();
                if part.is_empty() || part.contains(char::is_whitespace) {
                    format!("'{part}'")
                } else {
                    part.into_owned()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the process to completion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the process cannot be started,
    /// [`Error::CommandFailed`] on a non-zero exit and [`Error::Cancelled`]
    /// if `cancel` fires first, in which case the process group is killed.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<ExecOutput> {
        let command_line = self.display();
        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                command: command_line,
            });
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if !self.inherit_env {
            cmd.env_clear();
        }
        cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(if self.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        if self.capture {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        cmd.process_group(0);
        cmd.kill_on_drop(true);

        info!(command = %command_line, dir = ?self.dir, "Executing");
        let mut child = cmd
            .spawn()
            .map_err(|e| Error::io(e, &self.program, "spawn"))?;

        if let (Some(data), Some(mut pipe)) = (self.stdin.clone(), child.stdin.take()) {
            tokio::spawn(async move {
                if let Err(e) = pipe.write_all(&data).await {
                    debug!(error = %e, "Child closed stdin early");
                }
            });
        }
        let stdout = child.stdout.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                if let Err(e) = pipe.read_to_end(&mut buf).await {
                    debug!(error = %e, "Failed to read child stdout");
                }
                buf
            })
        });
        let stderr = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                if let Err(e) = pipe.read_to_end(&mut buf).await {
                    debug!(error = %e, "Failed to read child stderr");
                }
                buf
            })
        });

        let status = tokio::select! {
            status = child.wait() => status.map_err(|e| Error::io(e, &self.program, "wait"))?,
            () = cancel.cancelled() => {
                warn!(command = %command_line, "Cancelling process group");
                if let Some(pid) = child.id() {
                    kill_process_group(pid);
                }
                let _ = child.kill().await;
                return Err(Error::Cancelled { command: command_line });
            }
        };

        let mut output = ExecOutput::default();
        if let Some(task) = stdout {
            output.stdout = task.await.unwrap_or_default();
        }
        if let Some(task) = stderr {
            output.stderr = task.await.unwrap_or_default();
        }

        if status.success() {
            Ok(output)
        } else {
            Err(Error::CommandFailed {
                command: command_line,
                exit_code: status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// Sends SIGKILL to the child's process group.
fn kill_process_group(pid: u32) {
    let Ok(pid) = i32::try_from(pid) else {
        return;
    };
    // SAFETY: libc::kill with negative pid sends signal to entire process group.
    // The pid was obtained from a spawned child that leads its own group.
    #[expect(unsafe_code, reason = "Required for POSIX signal handling")]
    unsafe {
        libc::kill(-pid, libc::SIGKILL);
    }
}
