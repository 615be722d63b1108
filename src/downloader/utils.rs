// Helper functions for backend implementations

use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;
use std::process::Stdio;
use std::time::SystemTime;

use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration as TokioDuration};

use super::errors::DownloadError;

/// Run command with timeout, collecting stdout and stderr
pub async fn run_output_with_timeout(
    program: &Path,
    args: Vec<String>,
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    let program_name = program.display().to_string();
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DownloadError::from(format!("Failed to start {}: {}", program_name, e)))?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
        DownloadError::ExecutionError(format!("Failed to capture stdout from {}", program_name))
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
        DownloadError::ExecutionError(format!("Failed to capture stderr from {}", program_name))
    })?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    let waited = timeout(TokioDuration::from_secs(timeout_secs), child.wait()).await;
    match waited {
        Ok(status_res) => {
            let status = status_res?;
            let stdout = join_pipe(stdout_task, "stdout").await?;
            let stderr = join_pipe(stderr_task, "stderr").await?;
            Ok(std::process::Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::NetworkTimeout(timeout_secs))
        }
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
    name: &str,
) -> Result<Vec<u8>, DownloadError> {
    task.await
        .map_err(|e| DownloadError::ExecutionError(format!("{} task failed: {}", name, e)))?
        .map_err(|e| DownloadError::Io(format!("Failed to read {}: {}", name, e)))
}

/// Find an executable in common install paths, then via `which`,
/// falling back to the bare name (resolved through PATH at spawn time).
pub fn find_binary(binary_name: &str) -> PathBuf {
    let mut common_paths = vec![
        PathBuf::from(format!("/opt/homebrew/bin/{}", binary_name)), // Homebrew on Apple Silicon
        PathBuf::from(format!("/usr/local/bin/{}", binary_name)),    // Homebrew on Intel Mac
        PathBuf::from(format!("/usr/bin/{}", binary_name)),          // System installation
    ];
    if let Some(home) = dirs::home_dir() {
        // pip install --user
        common_paths.push(home.join(".local/bin").join(binary_name));
    }

    for path in common_paths {
        if path.exists() {
            return path;
        }
    }

    if let Ok(output) = StdCommand::new("which").arg(binary_name).output() {
        if output.status.success() {
            if let Ok(path) = String::from_utf8(output.stdout) {
                let trimmed = path.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
        }
    }

    PathBuf::from(binary_name)
}

/// Most recently created regular file directly inside `dir`.
///
/// Best effort: the downloader does not report its final path, and merging
/// may rename the output. Creation time falls back to modification time on
/// filesystems without birth time.
pub fn newest_file(dir: &Path) -> Result<Option<PathBuf>, DownloadError> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let stamp = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        match &newest {
            Some((best, _)) if *best >= stamp => {}
            _ => newest = Some((stamp, entry.path())),
        }
    }

    Ok(newest.map(|(_, path)| path))
}
