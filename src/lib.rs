// FFI Facade: The main entry point for Python.
// This file declares the engine modules and uses `pyo3` to define the
// `_core` Python module consumed by the dashboard layer.

pub mod analysis;
pub mod bindings;
pub mod compute;
pub mod config;
pub mod display;
pub mod error;
pub mod store;
pub mod universe;
pub mod validation;

pub use analysis::{ContributionSet, LinkedSeries, WedgeReport};
pub use compute::{
    CoverageRecord, Engine, IndexSeries, MissingDataPolicy, MonthRecord, QualityFlag, SeriesResult,
};
pub use error::EngineError;
pub use store::{Geography, Item, ItemId, Month, ReferenceTables, TablesBuilder};
pub use universe::{Definition, ResolvedUniverse};
pub use validation::{QaReport, QaValidator};

use pyo3::prelude::*;

/// A simple function to confirm the Rust core is callable from Python.
#[pyfunction]
fn rust_core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Defines the `_core` Python module. The name indicates an internal,
/// compiled component of the dashboard distribution.
#[pymodule]
fn _core(_py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(rust_core_version, m)?)?;
    m.add_class::<bindings::python::PyTables>()?;
    m.add_function(wrap_pyfunction!(bindings::python::compute, m)?)?;
    m.add_function(wrap_pyfunction!(bindings::python::wedge_report, m)?)?;
    m.add_function(wrap_pyfunction!(bindings::python::link_series, m)?)?;
    Ok(())
}
