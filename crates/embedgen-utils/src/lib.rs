pub mod atomic_write;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod paths;

pub use error::{
    ConfigError, EmbedgenError, ErrorCategory, LlmError, StageError, UserFriendlyError,
    WorkflowError,
};
pub use exit_codes::ExitCode;
pub use paths::{GuardedPath, PathError, PathGuard};
