//! Top-level error wrapper types.

use crate::{ConfigError, JsonError, ServerError};

/// Every error a Guildhall crate can surface.
///
/// # Examples
///
/// ```
/// use guildhall_error::{GuildhallError, JsonError};
///
/// let err: GuildhallError = JsonError::new("trailing comma").into();
/// assert!(format!("{}", err).contains("JSON Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum GuildhallErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Monitoring server error
    #[from(ServerError)]
    Server(ServerError),
}

/// Guildhall error with kind discrimination.
///
/// # Examples
///
/// ```
/// use guildhall_error::{ConfigError, GuildhallResult};
///
/// fn might_fail() -> GuildhallResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Guildhall Error: {}", _0)]
pub struct GuildhallError(Box<GuildhallErrorKind>);

impl GuildhallError {
    /// Create a new error from a kind.
    pub fn new(kind: GuildhallErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &GuildhallErrorKind {
        &self.0
    }
}

impl<T> From<T> for GuildhallError
where
    T: Into<GuildhallErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Guildhall operations.
pub type GuildhallResult<T> = std::result::Result<T, GuildhallError>;
