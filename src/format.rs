//! Message text formatting applied before a send

use std::str::FromStr;

use crate::error::ValidationError;

/// How message content is decorated before distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageFormat {
    /// Content unchanged
    #[default]
    Plain,
    /// Content wrapped in a minimal HTML document
    Html,
}

impl MessageFormat {
    pub fn apply(&self, content: &str) -> String {
        match self {
            MessageFormat::Plain => content.to_string(),
            MessageFormat::Html => format!("<html><body>{}</body></html>", content),
        }
    }
}

impl FromStr for MessageFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(MessageFormat::Plain),
            "html" => Ok(MessageFormat::Html),
            _ => Err(ValidationError::UnknownFormat(s.to_string())),
        }
    }
}
