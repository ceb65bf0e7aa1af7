//! Implements the `MediaResolver` trait using the `yt-dlp` command-line tool.

use std::process::{Command, Output};
use tracing::{debug, warn};

use super::track_metadata::ExtractedInfo;
use super::{MediaResolver, ResolverError, ResolverResult};

/// Resolves links and search terms by shelling out to `yt-dlp -J`.
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    program: String,
    retries: u32,
}

impl YtDlpResolver {
    pub fn new(program: impl Into<String>, retries: u32) -> Self {
        Self {
            program: program.into(),
            retries,
        }
    }

    /// Arguments for a single-JSON dump of the best audio format, without downloading.
    fn args(&self, query: &str) -> Vec<String> {
        let retries = self.retries.to_string();
        [
            "--dump-single-json",
            "--format",
            "bestaudio/best",
            "--no-playlist",
            "--quiet",
            "--no-warnings",
            "--default-search",
            "auto",
            "--no-check-certificates",
            "--source-address",
            "0.0.0.0",
            "--geo-bypass",
            "--retries",
            retries.as_str(),
            "--",
            query,
        ]
        .iter()
        .map(|arg| arg.to_string())
        .collect()
    }

    /// Convert the finished process into resolver output.
    fn parse_output(output: Output) -> ResolverResult {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ResolverError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() || stdout == "null" {
            return Ok(None);
        }

        let info: ExtractedInfo = serde_json::from_str(stdout)?;
        Ok(Some(info))
    }
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new("yt-dlp", 3)
    }
}

impl MediaResolver for YtDlpResolver {
    fn extract(&self, query: &str) -> ResolverResult {
        debug!("Running {} for query: {}", self.program, query);

        let output = Command::new(&self.program)
            .args(self.args(query))
            .output()
            .inspect_err(|e| warn!("Failed to spawn {}: {}", self.program, e))?;

        Self::parse_output(output)
    }
}
