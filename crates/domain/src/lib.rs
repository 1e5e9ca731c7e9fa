//! # evnex-bridge-domain
//!
//! Pure domain model for the Evnex charger bridge.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Entities** (sensor, switch, number and button state holders)
//! - Define **Devices** (an organisation or a charger exposing entities)
//! - Define the **Snapshot** (the keyed result of one refresh cycle)
//! - Define the **token triple** persisted between restarts
//! - Define the versioned **unique id migration** (pure `old -> new` rewrite)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod entity;
pub mod migration;
pub mod snapshot;
pub mod token;
