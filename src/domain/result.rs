//! Result type alias for PHIScribe
//!
//! This module provides a convenient Result type alias that uses ScribeError
//! as the error type.

use super::errors::ScribeError;

/// Result type alias for PHIScribe operations
///
/// # Examples
///
/// ```
/// use phiscribe::domain::result::Result;
/// use phiscribe::domain::errors::ScribeError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(ScribeError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, ScribeError>;
