//! Private key resolution for esec.
//!
//! A decryption key is looked up in order:
//! 1. a key supplied by the caller
//! 2. `ESEC_PRIVATE_KEY` / `ESEC_PRIVATE_KEY_<ENV>` in the environment
//! 3. the same name in `<key_dir>/.esec-keyring`
//!
//! Environment access goes through [`EnvProvider`]; the free functions use
//! the real process environment.

mod env;
mod error;
pub mod keyring;
mod resolve;

pub use env::{EnvProvider, MapEnv, ProcessEnv};
pub use error::{KeyringError, KeyringResult};
pub use keyring::{
    KEYRING_FILE, Keyring, PRIVATE_KEY_PREFIX, environment_from_key_name, keyring_line,
    lookup_name, validate_key_dir,
};
pub use resolve::{
    KeyResolver, resolve_private_key, sniff_environment_from_keyring, sniff_environment_name,
};
