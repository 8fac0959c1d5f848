//! GitHub API error types.
//!
//! Errors are categorised so the deploy pipeline can tell "this tag has no
//! release" apart from every other failure. Nothing is retried; the other
//! categories exist so a CI log shows what kind of failure ended the run.

use std::fmt;
use thiserror::Error;

/// The kind of GitHub API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// HTTP 404. For a tag lookup this means "no release yet".
    NotFound,

    /// HTTP 401, or 403 without rate-limit wording. Usually a bad token.
    Unauthorized,

    /// HTTP 429, or 403 mentioning a rate limit.
    RateLimited,

    /// Any other HTTP 4xx (validation failures, conflicts).
    Client,

    /// HTTP 5xx.
    Server,

    /// No response: DNS, connection or TLS failure.
    Network,

    /// Anything that could not be categorised.
    Other,
}

impl fmt::Display for GitHubErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GitHubErrorKind::NotFound => "not found",
            GitHubErrorKind::Unauthorized => "unauthorized",
            GitHubErrorKind::RateLimited => "rate limited",
            GitHubErrorKind::Client => "client error",
            GitHubErrorKind::Server => "server error",
            GitHubErrorKind::Network => "network error",
            GitHubErrorKind::Other => "error",
        };
        f.write_str(s)
    }
}

/// A categorised GitHub API error.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    pub kind: GitHubErrorKind,

    /// The HTTP status code, if available.
    pub status_code: Option<u16>,

    /// A human-readable description of the error.
    pub message: String,

    /// The underlying octocrab error, if available.
    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API {} (HTTP {}): {}", self.kind, code, self.message),
            None => write!(f, "GitHub API {}: {}", self.kind, self.message),
        }
    }
}

impl GitHubApiError {
    /// Creates an error without an octocrab source.
    pub fn without_source(kind: GitHubErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Categorizes an octocrab error.
    ///
    /// For API errors the message is the one GitHub put in the response
    /// body; octocrab's own `Display` for them is just "GitHub".
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let status_code = Self::extract_status_code(&err);
        let message = match &err {
            octocrab::Error::GitHub { source, .. } => source.message.clone(),
            other => other.to_string(),
        };
        let kind = classify(status_code, &message);

        Self {
            kind,
            status_code,
            message,
            source: Some(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == GitHubErrorKind::NotFound
    }

    /// Extracts the HTTP status code from an octocrab error, if present.
    ///
    /// API errors carry the status directly. Other variants only have a
    /// message, so the common HTTP error wordings are matched as a fallback.
    fn extract_status_code(err: &octocrab::Error) -> Option<u16> {
        if let octocrab::Error::GitHub { source, .. } = err {
            return Some(source.status_code.as_u16());
        }
        status_code_from_message(&err.to_string())
    }
}

fn classify(status_code: Option<u16>, message: &str) -> GitHubErrorKind {
    match status_code {
        Some(404) => GitHubErrorKind::NotFound,
        Some(401) => GitHubErrorKind::Unauthorized,
        Some(429) => GitHubErrorKind::RateLimited,
        Some(403) if is_rate_limit_error(message) => GitHubErrorKind::RateLimited,
        Some(403) => GitHubErrorKind::Unauthorized,
        Some(code) if (400..500).contains(&code) => GitHubErrorKind::Client,
        Some(code) if (500..600).contains(&code) => GitHubErrorKind::Server,
        Some(_) => GitHubErrorKind::Other,
        None if is_network_error(message) => GitHubErrorKind::Network,
        None => GitHubErrorKind::Other,
    }
}

/// Finds a status code in an error message.
///
/// Recognises `status: NNN` and a handful of `NNN` + reason-phrase pairs.
fn status_code_from_message(message: &str) -> Option<u16> {
    if let Some(idx) = message.find("status: ") {
        let digits: String = message[idx + 8..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(code) = digits.parse() {
            return Some(code);
        }
    }

    let lower = message.to_lowercase();
    let pairs: &[(u16, &str)] = &[
        (404, "not found"),
        (401, "unauthorized"),
        (403, "forbidden"),
        (409, "conflict"),
        (422, "unprocessable"),
        (429, "too many requests"),
        (500, "internal server error"),
        (502, "bad gateway"),
        (503, "service unavailable"),
    ];
    pairs
        .iter()
        .find(|(code, phrase)| lower.contains(&code.to_string()) && lower.contains(phrase))
        .map(|(code, _)| *code)
}

/// Checks if an error message indicates a rate limit.
fn is_rate_limit_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("rate limit")
        || message_lower.contains("secondary rate")
        || message_lower.contains("abuse detection")
}

/// Checks if an error message indicates a network-level error.
fn is_network_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("timeout")
        || message_lower.contains("connection")
        || message_lower.contains("network")
        || message_lower.contains("dns")
        || message_lower.contains("timed out")
}
