// error.rs - Error types for program construction and matching.
//
// Construction defects (broken patch lists, dangling edges) are reported as
// InternalBug; they mean the producer of the program is wrong, not the input.

use std::fmt;

/// Error type for program construction, compilation and matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegexError {
    /// The instruction graph violates a construction invariant.
    InternalBug { message: String },
    /// Repetition with `min > max`.
    InvalidRepeat { min: u32, max: u32 },
    /// Repetition count above [`crate::compile::MAX_REPEAT`].
    RepeatTooLarge(u32),
    /// The compiled program exceeds the configured instruction limit.
    ProgramTooLarge { size: usize, limit: usize },
    /// Time limit exceeded while matching.
    TimeLimitOver,
    /// Invalid argument passed to a function.
    InvalidArgument,
}

impl RegexError {
    pub(crate) fn bug(message: impl Into<String>) -> Self {
        RegexError::InternalBug {
            message: message.into(),
        }
    }

    /// Returns `true` for errors caused by a malformed program rather than
    /// by limits or arguments.
    pub fn is_internal(&self) -> bool {
        matches!(self, RegexError::InternalBug { .. })
    }
}

impl fmt::Display for RegexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegexError::InternalBug { message } => write!(f, "internal error: {}", message),
            RegexError::InvalidRepeat { min, max } => {
                write!(f, "invalid repeat range {{{},{}}}", min, max)
            }
            RegexError::RepeatTooLarge(n) => write!(f, "repeat count too large: {}", n),
            RegexError::ProgramTooLarge { size, limit } => {
                write!(f, "program too large: {} instructions (limit {})", size, limit)
            }
            RegexError::TimeLimitOver => write!(f, "time limit over"),
            RegexError::InvalidArgument => write!(f, "invalid argument"),
        }
    }
}

impl std::error::Error for RegexError {}
