//! Career application intake: a multi-step wizard that accumulates one
//! application record, gates every step on declarative validation, and hands
//! the finished record to the persistence backend.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
