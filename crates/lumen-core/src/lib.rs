//! Core types, rules and services for the Lumen learning portal.
//!
//! This crate has no HTTP or database dependencies. Storage backends
//! implement [`store::ProgressStore`]; the services in [`portal`] drive the
//! progress/unlock state machine on top of it.

pub mod aggregate;
pub mod catalog;
pub mod enrollment;
pub mod error;
pub mod gate;
pub mod portal;
pub mod progress;
pub mod scoring;
pub mod store;
pub mod tracker;
pub mod unlock;

pub use error::{Error, Result};
pub use portal::Portal;
