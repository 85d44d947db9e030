//! Unified error type.

use std::fmt;

/// The error type returned by tsu-fields' fallible operations.
///
/// A request field that fails validation is *not* an `Error`: it becomes a
/// [`Stop`](crate::Outcome::Stop) carrying a response. This type surfaces
/// integration failures instead: a request whose body could not be decoded,
/// or an extractor that could not produce its field at all.
#[derive(Debug)]
pub enum Error {
    /// The body was declared as JSON but is not valid JSON.
    Json(serde_json::Error),
    /// The body was declared as a url-encoded form but is not valid UTF-8.
    Utf8(std::str::Utf8Error),
    /// An extractor could not read its field from the request.
    Extract { field: &'static str, reason: String },
}

impl Error {
    /// Builds an [`Error::Extract`] for a custom extractor.
    pub fn extract(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Extract { field, reason: reason.into() }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "json body: {e}"),
            Self::Utf8(e) => write!(f, "form body is not utf-8: {e}"),
            Self::Extract { field, reason } => write!(f, "extract {field}: {reason}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::Utf8(e) => Some(e),
            Self::Extract { .. } => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(e: std::str::Utf8Error) -> Self {
        Self::Utf8(e)
    }
}
