use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum BridgeError {
    /// The memory-watch transport will never deliver another delta.
    TransportClosed { reason: String },
    /// A delta named a location that was never registered.
    UnknownLocation { location: String },
    /// Experience or reward data could not be written.
    Persistence { path: PathBuf, source: io::Error },
    InvalidConfig { field: &'static str, reason: String },
    Io { context: String, source: io::Error },
}

impl BridgeError {
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        BridgeError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BridgeError::Persistence {
            path: path.into(),
            source,
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        BridgeError::Io {
            context: context.into(),
            source,
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BridgeError::TransportClosed { reason } => {
                write!(formatter, "Memory watcher transport closed ({})", reason)
            }
            BridgeError::UnknownLocation { location } => {
                write!(formatter, "Received delta for unregistered location '{}'", location)
            }
            BridgeError::Persistence { path, source } => {
                write!(formatter, "Failed to persist {} ({})", path.display(), source)
            }
            BridgeError::InvalidConfig { field, reason } => {
                write!(formatter, "Invalid configuration for {}: {}", field, reason)
            }
            BridgeError::Io { context, source } => {
                write!(formatter, "{} ({})", context, source)
            }
        }
    }
}

impl Error for BridgeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BridgeError::Persistence { source, .. } | BridgeError::Io { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}
