//! Intent encoding and signing for ERC-4337 user operations.
//!
//! The pipeline turns an [`Intent`](aa_intent_types::Intent) into a signed operation:
//!
//! 1. [`intent`] encodes the intent's own field set (`jobParameters`);
//! 2. [`assembler`] wraps it in the job-executor call and the account envelope (`callData`);
//! 3. [`paymaster`] authorizes sponsorship when the selected network pays for gas;
//! 4. [`hasher`] packs the operation and computes the signing hash;
//! 5. [`signer`] signs it.
//!
//! [`auth`] builds the separate session login payload. [`IntentEngine`] runs the whole flow against
//! a [`NetworkSelection`](aa_intent_types::NetworkSelection) snapshot.
//!
//! Everything is synchronous and pure apart from the caller's key material; outputs are lowercase
//! `0x` hex.

pub mod abi;
pub mod assembler;
pub mod auth;
pub mod config;
pub mod engine;
pub mod errors;
pub mod hash;
pub mod hasher;
pub mod intent;
pub mod operation;
pub mod paymaster;
pub mod signer;
pub mod utils;


pub use assembler::SponsorshipDescriptor;
pub use auth::{AuthPayload, SessionCredentials, SessionData};
pub use config::EngineConfig;
pub use engine::IntentEngine;
pub use errors::{CryptoError, EncodingError, Error, ProtocolError, Result, ValidationError};
pub use operation::SignedOperation;
pub use paymaster::Validity;
pub use signer::SigningKey;
