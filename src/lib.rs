//! Validation, normalization and storage for Lotto 6aus49 data: draw
//! records, contact form messages, simulation parameters, and the saved
//! analyses and simulations built on them.
//!
//! Record schemas take a raw field map as submitted by a form or API call
//! and either return a normalized, typed record or a [`ValidationError`]
//! listing every offending field. The simulation parameter check is a plain
//! predicate instead; see [`simulation::validate`].

pub mod analysis;
pub mod config;
pub mod contact;
pub mod database;
pub mod draw;
pub mod error;
pub mod import;
pub mod simulation;
pub mod user;
pub mod utils;
pub mod validators;

pub use analysis::{AnalysisRecord, AnalysisType};
pub use contact::{ContactMessage, ContactSchema};
pub use draw::{Draw, DrawDay, DrawSchema, DrawUpdate};
pub use error::{ErrorKind, FieldError, RuleViolation, StoreError, StoreResult, ValidationError};
pub use simulation::{
    SimulationParameters, SimulationRecord, SimulationResult, SimulationType, Weights,
};
pub use user::{Requester, User};

/// Raw input as submitted: field name to JSON value.
pub type Fields = serde_json::Map<String, serde_json::Value>;
