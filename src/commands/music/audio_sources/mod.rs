//! This module defines the contract with the external audio resolver and its
//! yt-dlp implementation.
//!
//! Resolution is a synchronous, potentially slow call. Implementations may block freely;
//! the session controller always runs them on the blocking thread pool.

/// Submodule defining the resolver output and the `StreamDescriptor` chosen from it.
pub mod track_metadata;
/// Submodule implementing `MediaResolver` on top of the `yt-dlp` command-line tool.
pub mod ytdl;

use thiserror::Error;
use track_metadata::ExtractedInfo;

#[cfg(test)]
use mockall::automock;

/// Failures raised by a resolver before any media could be selected.
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Failed to run resolver: {0}")]
    Process(#[from] std::io::Error),

    #[error("Resolver exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Failed to parse resolver output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Resolver task failed: {0}")]
    Task(String),
}

/// A specialized `Result` type for resolver calls. `Ok(None)` means "nothing found".
pub type ResolverResult = Result<Option<ExtractedInfo>, ResolverError>;

/// Turns a URL or search string into media information.
#[cfg_attr(test, automock)]
pub trait MediaResolver: Send + Sync + 'static {
    /// Blocking extraction of `query`, which may be a URL or free-text search.
    fn extract(&self, query: &str) -> ResolverResult;
}

impl<F> MediaResolver for F
where
    F: Fn(&str) -> ResolverResult + Send + Sync + 'static,
{
    fn extract(&self, query: &str) -> ResolverResult {
        self(query)
    }
}
