//! Error types for vendorgen-native

use thiserror::Error;

/// Errors that can occur while driving native tools
#[derive(Error, Debug)]
pub enum NativeError {
    /// Invocation had no program to run
    #[error("refusing to run an empty command")]
    EmptyCommand,

    /// The program could not be started at all
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but exited unsuccessfully
    #[error("`{command}` exited with code {exit_code}:\n{output}")]
    Failed {
        command: String,
        exit_code: i32,
        output: String,
    },

    /// The program did not finish in time
    #[error("`{command}` timed out after {secs} seconds")]
    Timeout { command: String, secs: u64 },

    /// The program succeeded but printed something unusable
    #[error("unexpected output from `{command}`: {reason}")]
    UnexpectedOutput { command: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NativeError {
    /// Captured tool output, if the failure carries any.
    pub fn output(&self) -> Option<&str> {
        match self {
            NativeError::Failed { output, .. } => Some(output),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_display_includes_output() {
        let err = NativeError::Failed {
            command: "make --dry-run".to_string(),
            exit_code: 2,
            output: "make: *** No rule to make target".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("make --dry-run"));
        assert!(msg.contains("code 2"));
        assert!(msg.contains("No rule to make target"));
        assert_eq!(err.output(), Some("make: *** No rule to make target"));
    }

    #[test]
    fn test_timeout_has_no_output() {
        let err = NativeError::Timeout {
            command: "git clone".to_string(),
            secs: 5,
        };
        assert!(err.output().is_none());
        assert!(err.to_string().contains("5 seconds"));
    }
}
