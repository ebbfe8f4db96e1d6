//! Exit code constants for the embedgen CLI.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Run completed and persisted |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments, configuration or task input |
//! | 3 | `PATH_VIOLATION` | An artifact path failed validation |
//! | 70 | `LLM_FAILURE` | The model gateway failed |

/// Type-safe process exit code.
///
/// ```rust
/// use embedgen_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::from_i32(70), ExitCode::LLM_FAILURE);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - run completed
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - unexpected failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments, configuration or task directory error
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Artifact path rejected by the path guard
    pub const PATH_VIOLATION: ExitCode = ExitCode(3);

    /// Model gateway failure that could not be recovered
    pub const LLM_FAILURE: ExitCode = ExitCode(70);

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.0
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
