use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertErrorCode {
    Io,
    Parse,
    CatalogUnavailable,
    RateLimited,
    MalformedSource,
    MissingRequiredElement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertError {
    pub code: ConvertErrorCode,
    pub message: String,
}

impl ConvertError {
    pub fn new(code: ConvertErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Error for ConvertError {}
