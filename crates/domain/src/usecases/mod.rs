//! Application use cases / business logic

pub mod publish;
pub mod sweep;

pub use publish::{PublishError, PublishOrchestrator};
pub use sweep::{PendingSweep, SweepConfig, SweepEntry};
