use thiserror::Error;

/// Error taxonomy for the blocking pipeline.
///
/// Nothing here is retried: every variant aborts the current analysis run
/// and is surfaced to the caller with enough context (rule position, axis
/// name, fragment label) to locate the faulty input.
#[derive(Debug, Error)]
pub enum LinkageError {
    /// Caller-supplied rule, axis, link-type or column arguments are
    /// invalid or insufficient.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The execution engine failed to run a submitted fragment.
    #[error("execution of `{fragment}` failed: {reason}")]
    Execution { fragment: String, reason: String },

    /// Degenerate statistics input, e.g. a zero cartesian baseline.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),
}

impl LinkageError {
    pub fn configuration(message: impl Into<String>) -> Self {
        LinkageError::Configuration(message.into())
    }

    pub fn execution(fragment: impl Into<String>, reason: impl Into<String>) -> Self {
        LinkageError::Execution {
            fragment: fragment.into(),
            reason: reason.into(),
        }
    }

    pub fn arithmetic(message: impl Into<String>) -> Self {
        LinkageError::Arithmetic(message.into())
    }
}

pub type Result<T> = std::result::Result<T, LinkageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_context() {
        let err = LinkageError::execution("block_rule_2", "table `people` not registered");
        assert!(err.to_string().contains("block_rule_2"));
        assert!(err.to_string().contains("not registered"));

        let err = LinkageError::configuration("rule 0: empty predicate");
        assert!(err.to_string().starts_with("configuration error"));
    }
}
