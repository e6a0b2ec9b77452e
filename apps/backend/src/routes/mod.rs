//! HTTP handlers, one module per resource.

pub mod progress;
pub mod questions;
pub mod recommendations;
pub mod sessions;
