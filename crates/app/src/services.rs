//! Application services: use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod coordinator;
pub mod evnex_integration;
pub mod migration;
pub mod refresh;
