//! # Domain Models
//!
//! Pure configuration types and constants shared by every crate of the workspace.
//! Keep it lean: no I/O, networking, or heavy logic, just data and simple helpers.

pub mod config;
pub mod constants;
pub mod registry;
