//! Exit codes for the CLI tool.

use zipcull::Error;

/// Exit code constants
pub const SUCCESS: i32 = 0;
/// Fatal error occurred
pub const FATAL_ERROR: i32 = 2;
/// Archive could not be opened or parsed
pub const BAD_ARCHIVE: i32 = 3;
/// Requested entry does not exist
pub const NOT_FOUND: i32 = 4;
/// I/O error
pub const IO_ERROR: i32 = 5;
/// Operation declined at the confirmation prompt
pub const DECLINED: i32 = 6;
/// Ctrl+C (128 + SIGINT)
pub const USER_INTERRUPT: i32 = 130;

/// Exit code enum for structured handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    FatalError,
    BadArchive,
    NotFound,
    IoError,
    Declined,
}

impl ExitCode {
    /// Returns the numeric exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::FatalError => FATAL_ERROR,
            Self::BadArchive => BAD_ARCHIVE,
            Self::NotFound => NOT_FOUND,
            Self::IoError => IO_ERROR,
            Self::Declined => DECLINED,
        }
    }
}

/// Converts a zipcull error to an exit code
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    match error {
        Error::Io(_) => ExitCode::IoError,
        Error::ArchiveOpen { .. } => ExitCode::BadArchive,
        Error::EntryNotFound { .. } => ExitCode::NotFound,
        Error::Extraction { .. } | Error::Rewrite { .. } => ExitCode::IoError,
        Error::RewriteInProgress { .. } => ExitCode::FatalError,
        Error::PathTraversal { .. } => ExitCode::FatalError,
        // Future error variants - required by #[non_exhaustive]
        _ => ExitCode::FatalError,
    }
}
