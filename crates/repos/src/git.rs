//! Git access behind an async trait.
//!
//! [`GitCli`] shells out to the `git` binary via `tokio::process`. The binary
//! is resolved once per client and every invocation holds a semaphore permit,
//! bounding the number of concurrently running git children.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use skills_manager_state::{Error, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, Semaphore};

/// Default cap on simultaneously running git processes.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Receives human-readable progress lines from long-running git commands.
pub type ProgressSender = mpsc::UnboundedSender<String>;

/// Local position relative to the upstream branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AheadBehind {
    pub ahead: u32,
    pub behind: u32,
}

#[cfg(test)]
use mockall::automock;

/// Version-control operations needed by the repository manager.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GitClient: Send + Sync {
    /// `git --version` output; doubles as an "is git installed" probe.
    async fn version(&self) -> Result<String>;

    /// Depth-1 clone of `url` into `dest`, forwarding progress lines.
    async fn clone_shallow(&self, url: &str, dest: &Path, progress: ProgressSender) -> Result<()>;

    async fn pull(&self, repo: &Path) -> Result<()>;

    async fn fetch(&self, repo: &Path) -> Result<()>;

    /// Commit counts between `HEAD` and its upstream.
    async fn ahead_behind(&self, repo: &Path) -> Result<AheadBehind>;
}

/// Locates the git binary: explicit override, then `PATH`, then plain `git`.
pub fn resolve_git_binary(override_path: Option<&Path>) -> PathBuf {
    if let Some(path) = override_path.filter(|p| !p.as_os_str().is_empty()) {
        return path.to_path_buf();
    }
    match which::which("git") {
        Ok(path) => path,
        Err(err) => {
            tracing::warn!(
                target: "skills_manager::repos",
                error = %err,
                "git not found on PATH, falling back to bare invocation"
            );
            PathBuf::from("git")
        }
    }
}

/// Parses `git rev-list --left-right --count` output (`<ahead>\t<behind>`).
pub fn parse_left_right_count(output: &str) -> Option<AheadBehind> {
    let mut parts = output.split_whitespace();
    let ahead = parts.next()?.parse().ok()?;
    let behind = parts.next()?.parse().ok()?;
    Some(AheadBehind { ahead, behind })
}

/// [`GitClient`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    override_path: Option<PathBuf>,
    binary: Arc<OnceLock<PathBuf>>,
    permits: Arc<Semaphore>,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(None, DEFAULT_MAX_CONCURRENT)
    }
}

impl GitCli {
    pub fn new(override_path: Option<PathBuf>, max_concurrent: usize) -> Self {
        Self {
            override_path,
            binary: Arc::new(OnceLock::new()),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// The resolved binary; the `PATH` lookup runs once, on the blocking pool.
    pub async fn binary(&self) -> PathBuf {
        if let Some(path) = self.binary.get() {
            return path.clone();
        }
        let override_path = self.override_path.clone();
        let resolved =
            tokio::task::spawn_blocking(move || resolve_git_binary(override_path.as_deref()))
                .await
                .unwrap_or_else(|_| PathBuf::from("git"));
        self.binary.get_or_init(|| resolved).clone()
    }

    async fn run(
        &self,
        args: &[&str],
        cwd: Option<&Path>,
        progress: Option<&ProgressSender>,
    ) -> Result<String> {
        let command = args.first().copied().unwrap_or_default().to_string();
        let _permit = self.permits.acquire().await.map_err(|_| Error::Git {
            command: command.clone(),
            message: "git client is shut down".into(),
        })?;

        let binary = self.binary().await;
        let mut cmd = Command::new(&binary);
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        tracing::debug!(
            target: "skills_manager::repos",
            args = ?args,
            cwd = ?cwd,
            "Spawning git"
        );
        let mut child = cmd.spawn().map_err(|e| Error::Git {
            command: command.clone(),
            message: format!("failed to spawn {}: {e}", binary.display()),
        })?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let read_stdout = async {
            let mut out = String::new();
            if let Some(mut stdout) = stdout {
                let _ = stdout.read_to_string(&mut out).await;
            }
            out
        };
        let read_stderr = async {
            let mut lines_seen = Vec::new();
            if let Some(stderr) = stderr {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    // progress meters redraw with carriage returns
                    for part in line.split('\r').map(str::trim).filter(|p| !p.is_empty()) {
                        if let Some(tx) = progress {
                            let _ = tx.send(part.to_string());
                        }
                        lines_seen.push(part.to_string());
                    }
                }
            }
            lines_seen
        };
        let (out, err_lines) = tokio::join!(read_stdout, read_stderr);

        let status = child.wait().await.map_err(|e| Error::Git {
            command: command.clone(),
            message: format!("failed to wait for git: {e}"),
        })?;
        if !status.success() {
            let message = err_lines
                .iter()
                .rev()
                .find(|l| l.starts_with("fatal:") || l.starts_with("error:"))
                .or_else(|| err_lines.last())
                .cloned()
                .unwrap_or_else(|| format!("exited with {status}"));
            return Err(Error::Git { command, message });
        }
        Ok(out)
    }
}

#[async_trait]
impl GitClient for GitCli {
    async fn version(&self) -> Result<String> {
        let out = self.run(&["--version"], None, None).await?;
        Ok(out.trim().to_string())
    }

    async fn clone_shallow(&self, url: &str, dest: &Path, progress: ProgressSender) -> Result<()> {
        let dest = dest.to_string_lossy();
        self.run(
            &["clone", "--depth", "1", "--progress", url, dest.as_ref()],
            None,
            Some(&progress),
        )
        .await
        .map(drop)
    }

    async fn pull(&self, repo: &Path) -> Result<()> {
        self.run(&["pull", "--ff-only"], Some(repo), None)
            .await
            .map(drop)
    }

    async fn fetch(&self, repo: &Path) -> Result<()> {
        self.run(&["fetch"], Some(repo), None).await.map(drop)
    }

    async fn ahead_behind(&self, repo: &Path) -> Result<AheadBehind> {
        let out = self
            .run(
                &["rev-list", "--left-right", "--count", "HEAD...@{upstream}"],
                Some(repo),
                None,
            )
            .await?;
        parse_left_right_count(&out).ok_or_else(|| Error::Git {
            command: "rev-list".into(),
            message: format!("unexpected output {:?}", out.trim()),
        })
    }
}
