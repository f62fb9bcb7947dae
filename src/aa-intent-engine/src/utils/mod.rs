//! Shared utilities for the engine.
//!
//! Everything here is deterministic and allocation-light; every packer goes through `bytes`.

pub mod bytes;
pub mod crypto;
