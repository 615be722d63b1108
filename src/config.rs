use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use crate::downloader::utils::find_binary;

/// Server configuration, from CLI flags or environment
#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Address the page is served on
    #[arg(short, long, env = "MERGE_DL_LISTEN", default_value = "127.0.0.1:8501")]
    pub listen: SocketAddr,

    /// yt-dlp binary; located in the usual install paths when omitted
    #[arg(long, env = "YTDLP_PATH")]
    pub ytdlp_path: Option<PathBuf>,

    /// Parent directory for cookie files and download scratch directories
    #[arg(short, long, env = "MERGE_DL_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Seconds allowed for a format discovery call
    #[arg(long, default_value_t = 60)]
    pub extract_timeout: u64,

    /// Idle seconds before a session is ended and its files removed
    #[arg(long, default_value_t = 3600)]
    pub session_ttl: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8501)),
            ytdlp_path: None,
            work_dir: None,
            extract_timeout: 60,
            session_ttl: 3600,
        }
    }
}

impl Config {
    /// Parse CLI args and environment, then validate
    pub fn load() -> Result<Self> {
        let config = Config::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.extract_timeout == 0 {
            return Err(anyhow::anyhow!("extract timeout must be greater than zero"));
        }
        if self.session_ttl == 0 {
            return Err(anyhow::anyhow!("session TTL must be greater than zero"));
        }
        if let Some(dir) = &self.work_dir {
            if !dir.is_dir() {
                return Err(anyhow::anyhow!(
                    "work dir {} is not a directory",
                    dir.display()
                ));
            }
        }
        Ok(())
    }

    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn ytdlp_path(&self) -> PathBuf {
        self.ytdlp_path
            .clone()
            .unwrap_or_else(|| find_binary("yt-dlp"))
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.work_dir(), std::env::temp_dir());
    }

    #[test]
    fn parses_flags() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::try_parse_from([
            "merge-downloader",
            "--listen",
            "0.0.0.0:9000",
            "--ytdlp-path",
            "/opt/yt-dlp",
            "--work-dir",
            dir.path().to_str().unwrap(),
            "--extract-timeout",
            "15",
        ])
        .unwrap();

        assert_eq!(config.listen.port(), 9000);
        assert_eq!(config.ytdlp_path(), PathBuf::from("/opt/yt-dlp"));
        assert_eq!(config.work_dir(), dir.path());
        assert_eq!(config.extract_timeout, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_timeout_and_missing_work_dir() {
        let config = Config {
            extract_timeout: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            work_dir: Some(PathBuf::from("/definitely/not/here")),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
