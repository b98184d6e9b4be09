//! Keygen command implementation

use crate::crypto::EncryptionKey;
use clap::Args;

/// Arguments for the keygen command
#[derive(Args, Debug)]
pub struct KeygenArgs {}

impl KeygenArgs {
    /// Prints a fresh key suitable for `encryption.key`
    pub async fn execute(&self) -> anyhow::Result<i32> {
        let key = EncryptionKey::generate();
        println!("{}", key.to_base64());
        Ok(0)
    }
}
