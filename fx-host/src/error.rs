//! Domain failures raised by checks

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("Rule {rule} failed: {message}")]
    Rule { rule: String, message: String },

    #[error("Source file not found: {path}")]
    MissingFile { path: String },

    #[error("Edit rejected: {message}")]
    Edit { message: String },
}

impl CheckError {
    pub fn rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rule {
            rule: rule.into(),
            message: message.into(),
        }
    }

    pub fn missing_file(path: impl Into<String>) -> Self {
        Self::MissingFile { path: path.into() }
    }

    pub fn edit(message: impl Into<String>) -> Self {
        Self::Edit {
            message: message.into(),
        }
    }
}
