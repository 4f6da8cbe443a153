use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for extbundle operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Core error type for extbundle operations.
///
/// Every variant is a hard failure for the phase that produced it. The only
/// failures swallowed anywhere in the crate are sends to connections that are
/// already closing.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read manifest at {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest at {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Manifest at {path} is invalid ({} violation(s)):\n{}", .violations.len(), Violations(.violations))]
    ManifestValidation {
        path: PathBuf,
        violations: Vec<Violation>,
    },

    #[error("Failed to bind reload server on {addr}: {source}")]
    SocketBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to compile reload client: {message}")]
    ClientCompile { message: String },

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown vendor `{0}` (expected one of: chrome, firefox, opera, edge, safari)")]
    UnknownVendor(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Error for a reload server that could not bind `addr`.
    #[must_use]
    pub fn socket_bind(addr: impl fmt::Display, source: std::io::Error) -> Self {
        Self::SocketBind {
            addr: addr.to_string(),
            source,
        }
    }

    /// Socket address in a bind error, when it parses as one.
    #[must_use]
    pub fn bind_addr(&self) -> Option<SocketAddr> {
        match self {
            Self::SocketBind { addr, .. } => addr.parse().ok(),
            _ => None,
        }
    }

    /// Stable SCREAMING_SNAKE_CASE code used in JSON output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::ManifestRead { .. } => "MANIFEST_READ_FAILED",
            Self::ManifestParse { .. } => "MANIFEST_PARSE_FAILED",
            Self::ManifestValidation { .. } => "MANIFEST_INVALID",
            Self::SocketBind { .. } => "RELOAD_SOCKET_BIND_FAILED",
            Self::ClientCompile { .. } => "RELOAD_CLIENT_COMPILE_FAILED",
            Self::ConfigRead { .. } => "CONFIG_READ_FAILED",
            Self::ConfigParse { .. } => "CONFIG_PARSE_FAILED",
            Self::UnknownVendor(_) => "UNKNOWN_VENDOR",
            Self::Other(_) => "OTHER",
        }
    }
}

/// A single violated manifest rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON path of the offending value, e.g. `background.scripts[1]`.
    pub path: String,
    /// What rule was broken.
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "<root>: {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

struct Violations<'a>(&'a [Violation]);

impl fmt::Display for Violations<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {violation}")?;
        }
        Ok(())
    }
}
