//! Command implementations

pub mod channels;
pub mod config;
pub mod doctor;
pub mod publications;
pub mod publish;
pub mod publish_pending;
