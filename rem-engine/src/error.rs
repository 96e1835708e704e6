use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Measurement failed: {0}")]
    MeasurementFailure(String),

    #[error("Target generation failed: {0}")]
    GenerationFailure(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<RemError> for String {
    fn from(err: RemError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_into_message() {
        let msg: String = RemError::MeasurementFailure("probe tube blocked".to_string()).into();
        assert_eq!(msg, "Measurement failed: probe tube blocked");
    }
}
