//! Security module
//!
//! API key storage through the OS keyring.

pub mod keyring;

pub use keyring::{get_api_key, has_api_key, set_api_key};
