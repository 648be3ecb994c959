//! # Capsule Core
//!
//! The domain layer of the Capsule publishing service.
//! This crate contains pure business logic with zero infrastructure dependencies:
//! the post lifecycle state machine, the visibility resolver, the engagement
//! ledger, and the publication sweep, all speaking to the outside world through
//! the ports in [`ports`].

pub mod domain;
pub mod error;
pub mod lifecycle;
pub mod ports;
pub mod service;
pub mod visibility;

pub use error::DomainError;
pub use service::PostService;
