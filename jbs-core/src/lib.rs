//! Core types for the jbs site backend.
//!
//! This crate holds everything the HTTP server needs that is not HTTP:
//! - `booking` for the booking record, manage tokens and the status resolver
//! - `slot` for session timing and calendar conflict detection
//! - `remote` for the record database, calendar, meeting, email and
//!   human-verification clients
//! - `store` for the persistence seams implemented by the server

pub mod booking;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod email;
pub mod error;
pub mod rate_limit;
pub mod remote;
pub mod slot;
pub mod store;
pub mod validation;
pub mod workshop;

pub use error::{JbsError, JbsResult};
