use thiserror::Error;

#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("Not an element node: {0}")]
    NotAnElement(String),

    #[error("Selector was not found: {0}")]
    SelectorNotFound(String),

    #[error("Selector is not unique: {0}")]
    SelectorNotUnique(String),

    #[error("Unsupported selector: {0}")]
    UnsupportedSelector(String),

    #[error("Unsupported XPath: {0}")]
    UnsupportedXPath(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Cross-origin access blocked: {0}")]
    CrossOrigin(String),

    #[error("HTML parsing failed: {0}")]
    HtmlParse(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Anyhow error: {0}")]
    AnyhowError(String),
}

pub type Result<T> = std::result::Result<T, HighlightError>;

// Convert anyhow::Error to HighlightError
impl From<anyhow::Error> for HighlightError {
    fn from(err: anyhow::Error) -> Self {
        HighlightError::AnyhowError(err.to_string())
    }
}

impl HighlightError {
    /// Errors that only affect a single element and should not abort a batch.
    pub fn is_per_element(&self) -> bool {
        matches!(
            self,
            HighlightError::NotAnElement(_)
                | HighlightError::SelectorNotFound(_)
                | HighlightError::SelectorNotUnique(_)
                | HighlightError::ElementNotFound(_)
                | HighlightError::CrossOrigin(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_element_errors_are_recoverable() {
        assert!(HighlightError::SelectorNotUnique("div".into()).is_per_element());
        assert!(HighlightError::CrossOrigin("https://ads.example".into()).is_per_element());
        assert!(!HighlightError::Snapshot("bad".into()).is_per_element());
    }

    #[test]
    fn anyhow_errors_convert() {
        let err: HighlightError = anyhow::anyhow!("boom").into();
        assert_eq!(err.to_string(), "Anyhow error: boom");
    }
}
