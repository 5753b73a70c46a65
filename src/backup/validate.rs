//! Custom validation functions for configuration values.

use crate::backup::template;
use chrono::Utc;
use std::path::Path;
use validator::ValidationError;

pub fn validate_dir_exist<P: AsRef<Path>>(dir: P) -> Result<(), ValidationError> {
    let dir = dir.as_ref();
    if dir.exists() {
        if !dir.is_dir() {
            return Err(ValidationError::new("InvalidDirectory")
                .with_message(format!("{:?} is not a directory", dir).into()));
        }
    } else {
        return Err(ValidationError::new("InvalidDirectory")
            .with_message(format!("{:?} not found", dir).into()));
    }

    Ok(())
}

pub fn validate_cron_str<S: AsRef<str>>(cron: S) -> Result<(), ValidationError> {
    let cron = cron.as_ref();
    if cron_parser::parse(cron, &Utc::now()).is_err() {
        return Err(ValidationError::new("InvalidCron")
            .with_message(format!("Invalid cron string: {cron:?}").into()));
    }

    Ok(())
}

pub fn validate_filename_template<S: AsRef<str>>(tpl: S) -> Result<(), ValidationError> {
    let tpl = tpl.as_ref();
    if let Err(e) = template::compile(tpl) {
        return Err(ValidationError::new("InvalidTemplate")
            .with_message(format!("Template {tpl:?} does not compile: {e}").into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_dir_exist() {
        let dir = TempDir::new().unwrap();
        assert!(validate_dir_exist(dir.path()).is_ok());
        assert!(validate_dir_exist("/nonexistent/path").is_err());

        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(validate_dir_exist(&file).is_err());
    }

    #[test]
    fn test_validate_cron_str() {
        assert!(validate_cron_str("*/5 * * * *").is_ok());
        assert!(validate_cron_str("0 3 * * *").is_ok());
        assert!(validate_cron_str("every day at noon").is_err());
    }

    #[test]
    fn test_validate_filename_template() {
        assert!(validate_filename_template("{{vault}}_{{datetime}}").is_ok());
        assert!(validate_filename_template("plain").is_ok());
    }
}
