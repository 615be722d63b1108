// yt-dlp backend - drives the native `yt-dlp` binary
//
// Metadata calls use `--dump-single-json`; downloads stream stdout line by
// line and turn our `--progress-template` lines into progress events. Merging is left
// to yt-dlp, which shells out to ffmpeg on its own.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tracing::{debug, info, warn};

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{DownloadRequest, ExtractorConfig, MediaInfo};
use crate::downloader::progress::{parse_progress_line, PROGRESS_TEMPLATE};
use crate::downloader::traits::{MediaBackend, ProgressSink};
use crate::downloader::utils::run_output_with_timeout;

pub struct YtDlpBackend {
    ytdlp_path: PathBuf,
}

impl YtDlpBackend {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            ytdlp_path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.ytdlp_path
    }

    /// Arguments for a metadata-only call
    pub fn info_args(url: &str, config: &ExtractorConfig) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
        ];

        if let Some(path) = &config.cookies_path {
            args.push("--cookies".to_string());
            args.push(path.to_string_lossy().to_string());
        }

        // the URL is user input; never let it parse as an option
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    /// Arguments for a download-mode call
    pub fn download_args(url: &str, request: &DownloadRequest) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            request.format.clone(),
            "-o".to_string(),
            request.output_arg(),
            "--merge-output-format".to_string(),
            request.merge_output_format.clone(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--newline".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
        ];

        if let Some(path) = &request.cookies_path {
            args.push("--cookies".to_string());
            args.push(path.to_string_lossy().to_string());
        }

        // the URL is user input; never let it parse as an option
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    /// Parse `--dump-single-json` output
    pub fn parse_json(stdout: &[u8]) -> Result<MediaInfo, DownloadError> {
        serde_json::from_slice(stdout)
            .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {}", e)))
    }
}

/// Keep the lines that explain a failure, as yt-dlp prints a lot around them
fn error_summary(stderr: &str) -> String {
    let important: Vec<&str> = stderr
        .lines()
        .map(|l| l.trim())
        .filter(|l| l.starts_with("ERROR:"))
        .collect();

    if !important.is_empty() {
        return important.join("\n");
    }

    stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("yt-dlp exited with an error")
        .trim()
        .to_string()
}

#[async_trait]
impl MediaBackend for YtDlpBackend {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn extract_info(
        &self,
        url: &str,
        config: &ExtractorConfig,
    ) -> Result<MediaInfo, DownloadError> {
        let args = Self::info_args(url, config);
        debug!(path = %self.ytdlp_path.display(), args = %args.join(" "), "Extracting formats");

        let out = run_output_with_timeout(&self.ytdlp_path, args, config.timeout_seconds).await?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            warn!(status = %out.status, "yt-dlp metadata call failed");
            return Err(DownloadError::from(error_summary(&stderr)));
        }

        let info = Self::parse_json(&out.stdout)?;
        info!(title = ?info.title, formats = info.formats.len(), "Extracted formats");
        Ok(info)
    }

    async fn download(
        &self,
        url: &str,
        request: &DownloadRequest,
        progress: &dyn ProgressSink,
    ) -> Result<(), DownloadError> {
        let args = Self::download_args(url, request);
        info!(format = %request.format, dir = %request.output_dir.display(), "Starting yt-dlp download");
        debug!(args = %args.join(" "), "yt-dlp download arguments");

        let mut child = TokioCommand::new(&self.ytdlp_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DownloadError::from(format!("Failed to start yt-dlp: {}", e)))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            DownloadError::ExecutionError("Failed to capture yt-dlp stdout".to_string())
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            DownloadError::ExecutionError("Failed to capture yt-dlp stderr".to_string())
        })?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(event) = parse_progress_line(&line) {
                progress.emit(event);
            } else if line.starts_with("[Merger]") || line.contains("Destination") {
                debug!(line = %line, "yt-dlp");
            }
        }

        let status = child.wait().await?;
        let stderr_output = stderr_task.await.unwrap_or_default();

        if status.success() {
            info!("yt-dlp download finished");
            Ok(())
        } else {
            warn!(%status, "yt-dlp download failed");
            Err(DownloadError::from(error_summary(&stderr_output)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_args_include_cookies_before_url() {
        let config = ExtractorConfig::default().with_cookies_path(Some(PathBuf::from("/tmp/c.txt")));
        let args = YtDlpBackend::info_args("https://example.com/v", &config);

        assert_eq!(args[0], "--dump-single-json");
        let pos = args.iter().position(|a| a == "--cookies").unwrap();
        assert_eq!(args[pos + 1], "/tmp/c.txt");
        assert_eq!(args.last().unwrap(), "https://example.com/v");
    }

    #[test]
    fn info_args_without_cookies() {
        let args = YtDlpBackend::info_args("https://example.com/v", &ExtractorConfig::default());
        assert!(!args.contains(&"--cookies".to_string()));
    }

    #[test]
    fn download_args_pass_specifier_verbatim() {
        let request = DownloadRequest::new("137+140", "/tmp/dl");
        let args = YtDlpBackend::download_args("https://example.com/v", &request);

        assert_eq!(&args[0..2], &["-f".to_string(), "137+140".to_string()]);
        let pos = args.iter().position(|a| a == "--merge-output-format").unwrap();
        assert_eq!(args[pos + 1], "mp4");
        let pos = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[pos + 1], "/tmp/dl/%(title)s.%(ext)s");
        assert!(args.contains(&PROGRESS_TEMPLATE.to_string()));
    }

    #[test]
    fn url_that_looks_like_an_option_stays_positional() {
        let url = "--exec=touch /tmp/x";
        let args = YtDlpBackend::info_args(url, &ExtractorConfig::default());
        assert_eq!(args[args.len() - 2], "--");
        assert_eq!(args[args.len() - 1], url);

        let args = YtDlpBackend::download_args(url, &DownloadRequest::new("22", "/tmp/dl"));
        assert_eq!(args[args.len() - 2], "--");
        assert_eq!(args[args.len() - 1], url);
    }

    #[test]
    fn parse_json_accepts_playlist_object() {
        let json = br#"{"_type": "playlist", "title": "Mix", "entries": [{"id": "a"}]}"#;
        let info = YtDlpBackend::parse_json(json).unwrap();
        assert_eq!(info.title.as_deref(), Some("Mix"));
        assert!(info.formats.is_empty());
    }

    #[test]
    fn parse_json_rejects_garbage() {
        let err = YtDlpBackend::parse_json(b"not json").unwrap_err();
        assert!(matches!(err, DownloadError::ParseError(_)));
    }

    #[test]
    fn error_summary_prefers_error_lines() {
        let stderr = "WARNING: something\nERROR: [generic] Unsupported URL: x\n";
        assert_eq!(error_summary(stderr), "ERROR: [generic] Unsupported URL: x");
        assert_eq!(error_summary("boom\n\n"), "boom");
    }

    #[tokio::test]
    async fn missing_binary_is_reported() {
        let backend = YtDlpBackend::with_path("/nonexistent/yt-dlp");
        let err = backend
            .extract_info("https://example.com/v", &ExtractorConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::ToolNotFound(_)));
    }

    #[cfg(unix)]
    mod process {
        use super::super::YtDlpBackend;
        use crate::downloader::errors::DownloadError;
        use crate::downloader::models::{DownloadRequest, ExtractorConfig, ProgressEvent};
        use crate::downloader::traits::{MediaBackend, ProgressSink};
        use std::os::unix::fs::PermissionsExt;
        use std::path::{Path, PathBuf};
        use std::sync::Mutex;

        #[derive(Default)]
        struct RecordingSink(Mutex<Vec<ProgressEvent>>);

        impl ProgressSink for RecordingSink {
            fn emit(&self, event: ProgressEvent) {
                self.0.lock().unwrap().push(event);
            }
        }

        /// Stand-in `yt-dlp` that writes its argv next to itself, then runs `body`
        fn fake_ytdlp(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("yt-dlp");
            let script = format!(
                "#!/bin/sh\nprintf '%s\\n' \"$@\" > \"$(dirname \"$0\")/argv\"\n{}\n",
                body
            );
            std::fs::write(&path, script).unwrap();
            let mut perms = std::fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).unwrap();
            path
        }

        fn recorded_argv(dir: &Path) -> Vec<String> {
            std::fs::read_to_string(dir.join("argv"))
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }

        #[tokio::test]
        async fn extract_info_never_passes_url_as_option() {
            let dir = tempfile::tempdir().unwrap();
            let backend = YtDlpBackend::with_path(fake_ytdlp(
                dir.path(),
                r#"echo '{"title": "Clip", "formats": []}'"#,
            ));

            let info = backend
                .extract_info("--exec=touch /tmp/x", &ExtractorConfig::default())
                .await
                .unwrap();
            assert_eq!(info.title.as_deref(), Some("Clip"));

            let argv = recorded_argv(dir.path());
            assert_eq!(argv[0], "--dump-single-json");
            assert_eq!(&argv[argv.len() - 2..], &["--", "--exec=touch /tmp/x"]);
        }

        #[tokio::test]
        async fn download_streams_progress_lines() {
            let dir = tempfile::tempdir().unwrap();
            let backend = YtDlpBackend::with_path(fake_ytdlp(
                dir.path(),
                "echo '[download] Destination: Clip.f137.mp4'\n\
                 echo '[progress]downloading|  50.0%|1.00MiB/s'\n\
                 echo '[progress]finished|100.0%|1.00MiB/s'",
            ));
            let sink = RecordingSink::default();

            backend
                .download(
                    "https://example.com/v",
                    &DownloadRequest::new("137+140", dir.path()),
                    &sink,
                )
                .await
                .unwrap();

            assert_eq!(
                *sink.0.lock().unwrap(),
                vec![
                    ProgressEvent::Downloading {
                        percent_str: "50.0%".to_string(),
                        speed_str: "1.00MiB/s".to_string(),
                    },
                    ProgressEvent::Finished,
                ]
            );
            let argv = recorded_argv(dir.path());
            assert_eq!(&argv[0..2], &["-f", "137+140"]);
            assert_eq!(argv.last().map(String::as_str), Some("https://example.com/v"));
        }

        #[tokio::test]
        async fn download_failure_reports_error_lines() {
            let dir = tempfile::tempdir().unwrap();
            let backend = YtDlpBackend::with_path(fake_ytdlp(
                dir.path(),
                "echo 'WARNING: slow' >&2\n\
                 echo 'ERROR: HTTP Error 403: Forbidden' >&2\n\
                 exit 1",
            ));
            let sink = RecordingSink::default();

            let err = backend
                .download(
                    "https://example.com/v",
                    &DownloadRequest::new("22", dir.path()),
                    &sink,
                )
                .await
                .unwrap_err();
            assert_eq!(
                err,
                DownloadError::ExecutionError("ERROR: HTTP Error 403: Forbidden".to_string())
            );
            assert!(sink.0.lock().unwrap().is_empty());
        }
    }
}
