use crate::backup::result_error::WithMsg;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Regex(#[from] regex::Error),
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),
    #[error(transparent)]
    ValidationError(#[from] validator::ValidationErrors),
    #[error(transparent)]
    SerdeYml(#[from] serde_yml::Error),
    #[error("backup destination folder is not configured")]
    DestinationUnset,
    #[error("source directory not found: {0:?}")]
    SourceNotFound(PathBuf),
    #[error("compression level {0} is out of range, expected 0-9")]
    CompressionLevelOutOfRange(u32),
    #[error("invalid cron expression: {0}")]
    InvalidCron(String),
    #[error("no cron schedule configured")]
    ScheduleUnset,
    #[error("{}:\n{}", msg, indent::indent_all_with("  ", error.to_string()))]
    WithMsg { msg: String, error: Box<Error> },
}

impl<S: Into<String>> WithMsg<S> for Error {
    fn with_msg(self, msg: S) -> Self {
        Self::WithMsg {
            msg: msg.into(),
            error: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = Error::from(io_error);

        match error {
            Error::Io(_) => (),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_error_with_msg() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = Error::from(io_error).with_msg("Custom message");

        match error {
            Error::WithMsg { msg, .. } => assert_eq!(msg, "Custom message"),
            _ => panic!("Expected WithMsg error"),
        }
    }

    #[test]
    fn test_error_with_msg_display_nests_cause() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = Error::from(io_error).with_msg("Operation failed");
        let error_str = error.to_string();

        assert!(error_str.contains("Operation failed"));
        assert!(error_str.contains("file not found"));
    }

    #[test]
    fn test_source_not_found_display() {
        let error = Error::SourceNotFound(PathBuf::from("/nonexistent/vault"));
        assert!(error.to_string().contains("/nonexistent/vault"));
    }

    #[test]
    fn test_compression_level_display() {
        let error = Error::CompressionLevelOutOfRange(12);
        let error_str = error.to_string();
        assert!(error_str.contains("12"));
        assert!(error_str.contains("0-9"));
    }
}
