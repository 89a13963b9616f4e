//! pyo3 facade for the dashboard layer.
//!
//! The Python side owns file loading, scraping and rendering; it feeds
//! rows in here and gets plain JSON records back. No engine-internal
//! handles cross the boundary.

use crate::compute::engine::{Engine, SeriesResult};
use crate::compute::inflation::IndexSeries;
use crate::store::{
    Geography, HierarchyCode, HierarchyLevel, HierarchyNode, Item, ItemId, Month, ReferenceTables,
    SeriesPoint, TablesBuilder,
};
use crate::validation::QaValidator;
use crate::{analysis, config, display};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::collections::HashMap;

fn value_err(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_month(text: &str) -> PyResult<Month> {
    text.parse().map_err(value_err)
}

fn parse_level(text: &str) -> PyResult<HierarchyLevel> {
    match text {
        "division" => Ok(HierarchyLevel::Division),
        "group" => Ok(HierarchyLevel::Group),
        "class" => Ok(HierarchyLevel::Class),
        other => Err(PyValueError::new_err(format!("unknown level '{other}'"))),
    }
}

#[pyclass(name = "_Tables")]
#[derive(Debug, Default)]
pub struct PyTables {
    builder: Option<TablesBuilder>,
    tables: Option<ReferenceTables>,
}

impl PyTables {
    fn builder_mut(&mut self) -> PyResult<&mut TablesBuilder> {
        self.builder
            .as_mut()
            .ok_or_else(|| PyRuntimeError::new_err("tables already sealed"))
    }

    pub(crate) fn tables(&self) -> PyResult<&ReferenceTables> {
        self.tables
            .as_ref()
            .ok_or_else(|| PyRuntimeError::new_err("tables not sealed; call finish() first"))
    }
}

#[pymethods]
impl PyTables {
    #[new]
    pub fn new(base_month: &str) -> PyResult<Self> {
        Ok(Self {
            builder: Some(TablesBuilder::new(parse_month(base_month)?)),
            tables: None,
        })
    }

    #[pyo3(signature = (id, name, hierarchy, tags, priority, available, weights))]
    pub fn add_item(
        &mut self,
        id: String,
        name: String,
        hierarchy: String,
        tags: Vec<String>,
        priority: u32,
        available: bool,
        weights: HashMap<String, f64>,
    ) -> PyResult<()> {
        self.builder_mut()?.add_item(Item {
            id: ItemId(id),
            name,
            hierarchy: HierarchyCode(hierarchy),
            tags: tags.into_iter().collect(),
            priority,
            available,
            weights: weights
                .into_iter()
                .map(|(geo, w)| (Geography(geo), w))
                .collect(),
        });
        Ok(())
    }

    #[pyo3(signature = (item, geography, month, level, provisional=false))]
    pub fn add_point(
        &mut self,
        item: String,
        geography: String,
        month: &str,
        level: Option<f64>,
        provisional: bool,
    ) -> PyResult<()> {
        let month = parse_month(month)?;
        self.builder_mut()?
            .add_point(
                ItemId(item),
                Geography(geography),
                month,
                SeriesPoint { level, provisional },
            )
            .map_err(value_err)?;
        Ok(())
    }

    #[pyo3(signature = (level, code, name, parent, child_count))]
    pub fn add_node(
        &mut self,
        level: &str,
        code: String,
        name: String,
        parent: Option<String>,
        child_count: u32,
    ) -> PyResult<()> {
        let level = parse_level(level)?;
        self.builder_mut()?.add_node(HierarchyNode {
            level,
            code: HierarchyCode(code),
            name,
            parent: parent.map(HierarchyCode),
            child_count,
        });
        Ok(())
    }

    /// Seals the snapshot; further row inserts are rejected.
    pub fn finish(&mut self) -> PyResult<()> {
        let builder = self
            .builder
            .take()
            .ok_or_else(|| PyRuntimeError::new_err("tables already sealed"))?;
        self.tables = Some(builder.finish().map_err(value_err)?);
        Ok(())
    }

    /// Renders the static QA report over the sealed tables.
    pub fn qa_report(&self) -> PyResult<String> {
        let report = QaValidator::new(self.tables()?).validate_tables();
        Ok(display::format_report(&report))
    }
}

/// Runs the batch engine and returns all series, records and QA findings
/// as one JSON document.
#[pyfunction]
pub fn compute(
    tables: &PyTables,
    definitions_json: &str,
    geographies: Vec<String>,
    months: Vec<String>,
) -> PyResult<String> {
    let tables = tables.tables()?;
    let definitions = config::parse_definitions(definitions_json).map_err(value_err)?;
    let geographies: Vec<Geography> = geographies.into_iter().map(Geography).collect();
    let months = months
        .iter()
        .map(|m| parse_month(m))
        .collect::<PyResult<Vec<_>>>()?;

    let mut results = Engine::new(tables).run(&definitions, &geographies, &months);
    let qa = QaValidator::new(tables).review_all(&mut results);

    serde_json::to_string(&serde_json::json!({ "series": results, "qa": qa }))
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

/// Computes the headline-versus-core wedge for one geography and month,
/// attributed at the given hierarchy level. `definitions_json` must hold
/// exactly two documents: the headline first, then the core variant.
#[pyfunction]
pub fn wedge_report(
    tables: &PyTables,
    definitions_json: &str,
    geography: &str,
    months: Vec<String>,
    target_month: &str,
    level: &str,
) -> PyResult<String> {
    let tables = tables.tables()?;
    let definitions = config::parse_definitions(definitions_json).map_err(value_err)?;
    if definitions.len() != 2 {
        return Err(PyValueError::new_err(
            "expected exactly two definitions: headline then core",
        ));
    }
    let geography = Geography(geography.to_string());
    let months = months
        .iter()
        .map(|m| parse_month(m))
        .collect::<PyResult<Vec<_>>>()?;
    let target = parse_month(target_month)?;
    let level = parse_level(level)?;

    let results = Engine::new(tables).run(&definitions, &[geography], &months);
    let [headline_result, core_result] = results.as_slice() else {
        return Err(PyValueError::new_err(
            "a definition does not apply to the requested geography",
        ));
    };
    let contribution_set = |result: &SeriesResult| {
        result
            .months
            .iter()
            .find(|record| record.month == target)
            .and_then(|record| record.contributions.clone())
            .ok_or_else(|| {
                PyValueError::new_err(format!(
                    "no contribution set for '{}' at {target}",
                    result.definition
                ))
            })
    };
    let headline = contribution_set(headline_result)?;
    let core = contribution_set(core_result)?;

    let report = analysis::analyze_wedge(tables, &headline, &core, level);
    serde_json::to_string(&report).map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

/// Splices a legacy series onto a new-base series at the link month.
#[pyfunction]
pub fn link_series(
    legacy: Vec<(String, f64)>,
    new: Vec<(String, f64)>,
    link_month: &str,
) -> PyResult<String> {
    let build = |rows: Vec<(String, f64)>| -> PyResult<IndexSeries> {
        let mut series = IndexSeries::new();
        for (month, level) in rows {
            series.insert(parse_month(&month)?, level);
        }
        Ok(series)
    };
    let linked = analysis::link(&build(legacy)?, &build(new)?, parse_month(link_month)?)
        .map_err(value_err)?;
    serde_json::to_string(&linked).map_err(|e| PyRuntimeError::new_err(e.to_string()))
}
