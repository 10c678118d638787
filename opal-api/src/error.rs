use std::sync::Arc;

pub type OpalResult<T> = Result<T, OpalError>;

/// Generic error that contains all the different kinds of errors that may occur when using the API
#[derive(Debug, Clone)]
pub enum OpalError {
    StringError(String),
    IoError(Arc<std::io::Error>),
}

impl std::error::Error for OpalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            OpalError::StringError(_) => None,
            OpalError::IoError(ref e) => Some(&**e),
        }
    }
}

impl core::fmt::Display for OpalError {
    fn fmt(
        &self,
        fmt: &mut core::fmt::Formatter,
    ) -> core::fmt::Result {
        match *self {
            OpalError::StringError(ref e) => e.fmt(fmt),
            OpalError::IoError(ref e) => e.fmt(fmt),
        }
    }
}

impl From<&str> for OpalError {
    fn from(str: &str) -> Self {
        OpalError::StringError(str.to_string())
    }
}

impl From<String> for OpalError {
    fn from(string: String) -> Self {
        OpalError::StringError(string)
    }
}

impl From<std::io::Error> for OpalError {
    fn from(error: std::io::Error) -> Self {
        OpalError::IoError(Arc::new(error))
    }
}
