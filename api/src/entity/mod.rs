//! SeaORM entities
//!
//! Table mappings for the moderation schema. Enum-valued columns are stored
//! as their snake_case strings and parsed in the PostgreSQL adapters.

pub mod moderated_users;
pub mod panic_activations;
pub mod reports;
pub mod safety_scores;
pub mod verification_requests;
pub mod verified_badges;
