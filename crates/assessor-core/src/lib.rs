//! assessor-core: Module orchestration and dual-attempt scoring engine.
//!
//! This crate defines the curriculum registry, the sequential module
//! executor, scoring and leveling, and the retake comparison that the rest
//! of assessor builds on.

pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod registry;
pub mod retake;
pub mod scoring;
pub mod scripted;
pub mod store;
pub mod traits;
