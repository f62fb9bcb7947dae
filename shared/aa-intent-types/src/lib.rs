//! Shared types for intents, user operations and network snapshots (engine/transport).

pub mod context;
pub mod intent;
pub mod operation;

pub use context::{GasQuote, NetworkPolicy, NetworkSelection, SessionContext};
pub use intent::{Intent, IntentError, NftType};
pub use operation::UnsignedOperation;
