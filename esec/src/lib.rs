//! esec: encrypted secrets in dotenv, JSON, YAML and TOML files.
//!
//! Documents carry their public key in an `ESEC_PUBLIC_KEY` field. Every
//! other string value is replaced by an `ESEC[...]` envelope; keys,
//! structure, comments and non-string values are left as written.
//!
//! ```no_run
//! # async fn run() -> esec::EsecResult<()> {
//! use std::path::Path;
//!
//! let changed = esec::encrypt_file_in_place(Path::new(".ejson.prod")).await?;
//! let plain = esec::decrypt_file(Path::new(".ejson.prod"), Path::new("."), "prod", None).await?;
//! # let _ = (changed, plain);
//! # Ok(())
//! # }
//! ```

pub mod config;
mod engine;
mod error;
pub mod naming;
pub mod telemetry;

pub use config::EsecConfig;
pub use engine::{
    Esec, decrypt_document, decrypt_file, decrypt_with_key, encrypt_document, encrypt_file,
    encrypt_file_in_place,
};
pub use error::{EsecError, EsecResult};
pub use naming::{environment_from_filename, file_for_environment, validate_environment_name};

pub use esec_crypto::{Keypair, PrivateKey, generate_keypair};
pub use esec_format::Format;
pub use esec_keyring::{
    EnvProvider, MapEnv, ProcessEnv, keyring_line, resolve_private_key,
    sniff_environment_from_keyring, sniff_environment_name,
};
