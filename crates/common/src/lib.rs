//! Shared types and utilities for the relay: configuration, error taxonomy,
//! the HTTP Signature codec, ID generation, and password hashing.

pub mod config;
pub mod crypto;
pub mod error;
pub mod id;
pub mod logging;
pub mod password;
pub mod signature;

pub use config::Config;
pub use crypto::{generate_rsa_keypair, RsaKeypair};
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use logging::LogFilterHandle;
pub use password::{hash_password, verify_password};
pub use signature::{
    build_signing_string, calculate_digest, sign_request, verify_digest, verify_signature,
    HttpSignature, SignatureError,
};
