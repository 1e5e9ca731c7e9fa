//! # evnex-bridge-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `EvnexApi`: the vendor cloud API
//!   - `TokenStore`: persisted session tokens
//!   - `EntityRegistry` / `IntegrationContext`: the host's device and entity registry
//! - Define the **driving/inbound port** `Integration` and its Evnex implementation
//! - Run the **refresh cycle** and publish its snapshot through the coordinator
//! - Describe every entity as a row in a data-driven table (`entities`)
//! - Provide **in-process infrastructure** (in-memory registry) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `evnex-bridge-domain` only (plus `tokio` for sync and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod entities;
pub mod memory_registry;
pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
