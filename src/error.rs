//! Error types and handling for TexSlim

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for TexSlim operations
pub type Result<T> = std::result::Result<T, TexSlimError>;

/// Failure to read a bitmap header
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InspectionError {
    /// Fewer bytes than a full header were available
    #[error("truncated header: {len} of {required} bytes")]
    TruncatedHeader { len: usize, required: usize },

    /// The header does not start with the bitmap magic
    #[error("bad magic 0x{found:08x}")]
    BadMagic { found: u32 },

    /// Width or height is zero
    #[error("zero dimension {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },
}

/// Main error type for TexSlim operations
#[derive(Debug, Error)]
pub enum TexSlimError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// I/O error on a known path
    #[error("I/O error on {path:?}: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Container bytes could not be parsed
    #[error("load failed: {message}")]
    LoadError { message: String },

    /// Bitmap header could not be read
    #[error("inspection failed: {0}")]
    Inspection(#[from] InspectionError),

    /// Converter ran and exited unsuccessfully
    #[error("converter failed (exit code {exit_code:?}, file: {file:?})")]
    ToolFailure {
        exit_code: Option<i32>,
        file: Option<PathBuf>,
    },

    /// Converter could not be launched
    #[error("converter could not run: {message}")]
    ProcessError { message: String },

    /// Converter exceeded its wall-clock budget
    #[error("converter timeout after {timeout_secs}s (file: {file:?})")]
    Timeout {
        timeout_secs: u64,
        file: Option<PathBuf>,
    },

    /// Export, import or serialization in the container library failed
    #[error("container error: {message}")]
    ContainerError { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Invalid optimization parameters
    #[error("Invalid parameters: {message}")]
    InvalidParameters { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerdeError(String),

    /// Runtime errors (task joins, panics)
    #[error("System error: {message}")]
    SystemError { message: String },
}

impl TexSlimError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new load error
    pub fn load<S: Into<String>>(message: S) -> Self {
        Self::LoadError {
            message: message.into(),
        }
    }

    /// Create a new container library error
    pub fn container<S: Into<String>>(message: S) -> Self {
        Self::ContainerError {
            message: message.into(),
        }
    }

    /// Create a new process launch error
    pub fn process<S: Into<String>>(message: S) -> Self {
        Self::ProcessError {
            message: message.into(),
        }
    }

    /// Create a new converter failure error
    pub fn tool_failure(exit_code: Option<i32>, file: Option<PathBuf>) -> Self {
        Self::ToolFailure { exit_code, file }
    }

    /// Create a new timeout error
    pub fn timeout(timeout_secs: u64, file: Option<PathBuf>) -> Self {
        Self::Timeout { timeout_secs, file }
    }

    /// Create a new invalid parameters error
    pub fn invalid_parameters<S: Into<String>>(message: S) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Create a new system error
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::SystemError {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (the batch can continue)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // These only affect one file or one bitmap
            Self::IoError(_)
            | Self::FileIo { .. }
            | Self::LoadError { .. }
            | Self::Inspection(_)
            | Self::ToolFailure { .. }
            | Self::ProcessError { .. }
            | Self::Timeout { .. }
            | Self::ContainerError { .. }
            | Self::SystemError { .. } => true,

            // Bad settings would fail every file the same way
            Self::ConfigError { .. }
            | Self::InvalidParameters { .. }
            | Self::SerdeError(_) => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::IoError(e) => format!("File system error: {}", e),
            Self::FileIo { path, source } => {
                format!("File system error on {}: {}", path.display(), source)
            }
            Self::ProcessError { message } => {
                format!("Could not run the texture converter ({}). Check --texconv.", message)
            }
            Self::Timeout { timeout_secs, .. } => {
                format!("Texture converter took longer than {} seconds", timeout_secs)
            }
            other => other.to_string(),
        }
    }
}

impl From<toml::de::Error> for TexSlimError {
    fn from(err: toml::de::Error) -> Self {
        Self::SerdeError(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for TexSlimError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerdeError(format!("YAML parsing error: {}", err))
    }
}

/// Error context extension for adding file path information
pub trait ErrorContext<T> {
    /// Add file context to an error
    fn with_file_context(self, file: PathBuf) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<TexSlimError>,
{
    fn with_file_context(self, file: PathBuf) -> Result<T> {
        self.map_err(|e| match e.into() {
            TexSlimError::IoError(source) => TexSlimError::FileIo { path: file, source },
            TexSlimError::ToolFailure { exit_code, file: None } => TexSlimError::ToolFailure {
                exit_code,
                file: Some(file),
            },
            TexSlimError::Timeout { timeout_secs, file: None } => TexSlimError::Timeout {
                timeout_secs,
                file: Some(file),
            },
            other => other,
        })
    }
}
