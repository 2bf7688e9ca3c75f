//! Common types module for the dispatch coordinator.
//!
//! This module defines the core data types and structures shared by every
//! crate in the workspace. It provides a centralized location for domain
//! entities, status vocabularies and event types to ensure all actors
//! agree on the shape of the records they mutate.

/// Actor roles participating in the order lifecycle.
pub mod actor;
/// Delivery address and coordinate types.
pub mod address;
/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Event types for change notifications between observers.
pub mod events;
/// Order and order item types with the delivery status vocabulary.
pub mod order;
/// Delivery partner and vendor profile types.
pub mod profile;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Delivery request types with the request status vocabulary.
pub mod request;
/// Storage namespace keys for persisted collections.
pub mod storage;
/// Position tracking types.
pub mod tracking;
/// Configuration validation types for type-safe TOML configs.
pub mod validation;

// Re-export all types for convenient access
pub use actor::*;
pub use address::*;
pub use api::*;
pub use events::*;
pub use order::*;
pub use profile::*;
pub use registry::*;
pub use request::*;
pub use storage::*;
pub use tracking::*;
pub use validation::*;
