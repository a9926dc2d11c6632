//! Domain layer
//!
//! Contains pure business logic with no external dependencies.
//! - `entities`: Domain models and their lifecycles
//! - `scoring`: Trust score and report priority calculations
//! - `ports`: Trait definitions for external dependencies

pub mod entities;
pub mod ports;
pub mod scoring;
