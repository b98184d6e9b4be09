//! CLI command implementations
//!
//! Every command returns its process exit code: 0 success, 1 partial
//! failure, 2 configuration error, 3 every section failed, 5 fatal.

pub mod crypt;
pub mod generate;
pub mod init;
pub mod keygen;
pub mod validate;
