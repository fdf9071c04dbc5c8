//! social-publish domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `lifecycle`: Publication status state machine
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `formatting`: Per-platform caption rules
//! - `demo`: Sandboxed outcomes for demo tenants
//! - `registry`: Channel type to provider resolution
//! - `usecases`: Application use cases / business logic

pub mod demo;
pub mod formatting;
pub mod lifecycle;
pub mod model;
pub mod ports;
pub mod registry;
pub mod usecases;

pub use lifecycle::{LifecycleError, PublicationEvent, PublicationStatus};
pub use model::*;
pub use ports::*;
pub use registry::ProviderRegistry;
