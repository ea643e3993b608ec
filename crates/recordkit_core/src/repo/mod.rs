//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the generic ten-operation data access contract.
//! - Isolate SQLite query details from calling code.
//!
//! # Invariants
//! - Repository writes consult `Record::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`,
//!   `GlobalUpdateBlocked`) in addition to DB transport errors.

pub mod record_repo;
