//! Core types for the tas heap simulator.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! arena-relative identifiers handed across the engine boundary and the
//! error taxonomy shared by the engine, the test tooling and the driver.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;

pub use error::{AllocError, ConfigError, ContractViolation};
pub use id::{BlockRef, Payload};
