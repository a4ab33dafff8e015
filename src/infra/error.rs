use thiserror::Error;

/// Failures of the process surroundings: the REST transport, telemetry setup,
/// settings and the snapshot output stream.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to write snapshot output: {0}")]
    Output(#[from] std::io::Error),
    #[error("backend transport error: {message}")]
    Http { message: String },
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl InfraError {
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Error as IoError, ErrorKind};

    use super::*;

    #[test]
    fn broken_output_pipe_names_the_snapshot() {
        let err = InfraError::from(IoError::new(ErrorKind::BrokenPipe, "pipe closed"));
        assert!(matches!(err, InfraError::Output(_)));
        assert_eq!(err.to_string(), "failed to write snapshot output: pipe closed");
    }

    #[test]
    fn transport_errors_keep_their_message() {
        let err = InfraError::http("tls handshake failed");
        assert_eq!(err.to_string(), "backend transport error: tls handshake failed");
    }
}
