//! The engine-wide error taxonomy.
//!
//! Configuration errors (empty universe, malformed definition, cyclic
//! hierarchy) abort the affected definition. Coverage errors abort a single
//! (definition, geography, month) triple; sibling months proceed. Data and
//! consistency problems are not errors here at all: they become structured
//! QA findings (see `validation`).

use crate::store::{DefinitionId, Geography, ItemId, Month};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum EngineError {
    #[error("Definition '{definition}' selects no weight in geography '{geography}'")]
    EmptyUniverse {
        definition: DefinitionId,
        geography: Geography,
    },

    #[error("Definition '{definition}' does not apply to geography '{geography}'")]
    GeographyNotApplicable {
        definition: DefinitionId,
        geography: Geography,
    },

    #[error("Malformed definition '{definition}': {reason}")]
    MalformedDefinition {
        definition: DefinitionId,
        reason: String,
    },

    #[error("Malformed month '{text}': expected YYYY-MM")]
    MalformedMonth { text: String },

    #[error("Duplicate item id '{item}'")]
    DuplicateItem { item: ItemId },

    #[error("Duplicate series point for item '{item}', geography '{geography}', month {month}")]
    DuplicateSeriesPoint {
        item: ItemId,
        geography: Geography,
        month: Month,
    },

    #[error("Non-positive index level {level} for item '{item}' at {month}")]
    InvalidLevel {
        item: ItemId,
        month: Month,
        level: f64,
    },

    #[error(
        "Coverage {coverage:.4} below floor {floor:.2} for definition '{definition}', \
         geography '{geography}', month {month}"
    )]
    InsufficientCoverage {
        definition: DefinitionId,
        geography: Geography,
        month: Month,
        coverage: f64,
        floor: f64,
    },

    #[error("No ancestor index available to impute item '{item}' at {month}")]
    ImputationExhausted { item: ItemId, month: Month },

    #[error("Index level for {needed} not computed; rate at {month} is not yet computable")]
    InsufficientHistory { month: Month, needed: Month },

    #[error("Legacy series level at link month {month} is zero or missing")]
    DivideByZeroLink { month: Month },
}
