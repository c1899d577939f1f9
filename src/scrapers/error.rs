//! Acquisition error taxonomy and plain-language messages.

use thiserror::Error;

/// Low-level cause of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Timeout,
    ConnectionRefused,
    Dns,
    /// TLS or protocol failure, usually a proxy that cannot terminate HTTPS.
    Tls,
    Other,
}

/// Errors raised while resolving or fetching a business website.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("No usable website found: {0}")]
    Resolution(String),

    #[error("Network error ({kind:?}): {detail}")]
    Transport { kind: TransportKind, detail: String },

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("Blocked by anti-bot protection: {0}")]
    Blocked(String),

    #[error("Page returned no usable content: {0}")]
    NoContent(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl ScrapeError {
    pub fn transport(kind: TransportKind, detail: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            detail: detail.into(),
        }
    }

    /// Classify a reqwest error into the transport taxonomy.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::HttpStatus(status.as_u16());
        }

        let detail = error_chain(err);
        let kind = if err.is_timeout() {
            TransportKind::Timeout
        } else {
            classify_message(&detail)
        };

        Self::Transport { kind, detail }
    }

    /// Classify a free-form error message (browser navigation errors and similar).
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("timeout") || lower.contains("timed out") {
            return Self::transport(TransportKind::Timeout, message);
        }
        Self::transport(classify_message(message), message)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }

    /// Fixed plain-language explanation stored with failed attempts.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Resolution(_) => {
                "We couldn't find a website for this business. Try adding the website URL to the contact."
            }
            Self::Transport { kind, .. } => match kind {
                TransportKind::Timeout => {
                    "The website took too long to respond. It may be down or very slow right now."
                }
                TransportKind::ConnectionRefused => {
                    "The website refused the connection. The server may be offline."
                }
                TransportKind::Dns => {
                    "The website address could not be found. The domain may have expired or be misspelled."
                }
                TransportKind::Tls => {
                    "A secure connection to the website could not be established."
                }
                TransportKind::Other => {
                    "We couldn't connect to the website because of a network problem."
                }
            },
            Self::HttpStatus(status) => match status {
                401 | 403 => "The website denied access to its pages.",
                404 | 410 => "The website page could not be found (it may have moved or been removed).",
                429 => "The website is limiting requests right now. Please try again later.",
                s if *s >= 500 => "The website is having server problems right now.",
                _ => "The website returned an unexpected response.",
            },
            Self::Blocked(_) => {
                "The website uses bot protection that blocked automated access."
            }
            Self::NoContent(_) => "The website loaded but didn't contain any readable content.",
            Self::NotConfigured(_) => {
                "Website search is not configured, so this contact's website could not be looked up."
            }
            Self::InvalidState(_) => "This contact is not ready to be scraped.",
            Self::Browser(_) => "The page could not be rendered in a browser.",
            Self::Database(_) => "The scrape result could not be saved.",
        }
    }
}

/// Flatten an error and its sources into one line.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

fn classify_message(message: &str) -> TransportKind {
    let lower = message.to_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") {
        TransportKind::Timeout
    } else if lower.contains("connection refused") || lower.contains("err_connection_refused") {
        TransportKind::ConnectionRefused
    } else if lower.contains("dns")
        || lower.contains("failed to lookup address")
        || lower.contains("name or service not known")
        || lower.contains("no such host")
        || lower.contains("err_name_not_resolved")
    {
        TransportKind::Dns
    } else if lower.contains("tls")
        || lower.contains("ssl")
        || lower.contains("certificate")
        || lower.contains("handshake")
        || lower.contains("protocol")
        || lower.contains("err_tunnel_connection_failed")
    {
        TransportKind::Tls
    } else {
        TransportKind::Other
    }
}
