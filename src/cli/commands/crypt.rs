//! Encrypt and decrypt command implementations
//!
//! Both read stdin and write stdout, using the key from the configuration.

use crate::config::{load_config, ScribeConfig};
use crate::crypto::{read_protected, BlobCodec, FieldCipher, ProtectedField, RevealOrigin};
use anyhow::Context;
use clap::Args;
use std::io::{Read, Write};

/// Arguments for the encrypt command
#[derive(Args, Debug)]
pub struct EncryptArgs {}

/// Arguments for the decrypt command
#[derive(Args, Debug)]
pub struct DecryptArgs {
    /// Treat input as an unflagged legacy field: values that do not look
    /// encrypted, or fail to decrypt, are passed through as plaintext
    #[arg(long)]
    pub legacy: bool,
}

impl EncryptArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let Some(codec) = load_codec(config_path) else {
            return Ok(2);
        };
        let plaintext = read_stdin()?;
        let blob = codec.encrypt(&plaintext).context("Encryption failed")?;
        println!("{blob}");
        Ok(0)
    }
}

impl DecryptArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let Some(codec) = load_codec(config_path) else {
            return Ok(2);
        };
        let input = read_stdin()?;
        let blob = input.trim();

        let text = if self.legacy {
            let revealed = read_protected(&codec, &ProtectedField::legacy(blob))?;
            if revealed.origin == RevealOrigin::HeuristicPlaintextFallback {
                eprintln!("⚠️  Input looked encrypted but did not decrypt; passed through as plaintext");
            }
            revealed.text
        } else {
            match codec.decrypt(blob) {
                Ok(text) => text,
                Err(e) => {
                    eprintln!("❌ {e}");
                    return Ok(5);
                }
            }
        };

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
        Ok(0)
    }
}

fn load_codec(config_path: &str) -> Option<FieldCipher> {
    let config: ScribeConfig = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {e}");
            return None;
        }
    };
    match config.encryption.encryption_key() {
        Ok(key) => Some(FieldCipher::new(&key)),
        Err(e) => {
            eprintln!("❌ {e}");
            None
        }
    }
}

fn read_stdin() -> anyhow::Result<String> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read stdin")?;
    Ok(input)
}
