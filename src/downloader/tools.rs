use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: Option<String>,
    pub path: String,
    pub is_available: bool,
}

/// Probe `<path> --version`; a failed probe marks the tool unavailable.
pub async fn probe_tool(name: &str, path: &Path) -> ToolInfo {
    let version = match Command::new(path).arg("--version").output().await {
        Ok(output) if output.status.success() => {
            let out = String::from_utf8_lossy(&output.stdout).trim().to_string();
            // some builds print a banner; the first line is the version
            out.lines().next().map(|l| l.trim().to_string())
        }
        _ => None,
    };

    ToolInfo {
        name: name.to_string(),
        is_available: version.is_some(),
        version,
        path: path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_tool_is_unavailable() {
        let info = probe_tool("yt-dlp", Path::new("/nonexistent/yt-dlp")).await;
        assert!(!info.is_available);
        assert_eq!(info.version, None);
        assert_eq!(info.path, "/nonexistent/yt-dlp");
    }
}
