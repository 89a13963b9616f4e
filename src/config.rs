//! Definition-document parsing.
//!
//! Definitions arrive as structured JSON documents from the configuration
//! loader (an external collaborator). Parsing is strict: unknown policy
//! names and hierarchy codes of the wrong granularity are configuration
//! errors for that definition, surfaced immediately.

use crate::compute::resolver::MissingDataPolicy;
use crate::error::EngineError;
use crate::store::{DefinitionId, Geography, HierarchyCode, HierarchyLevel, ItemId};
use crate::universe::{Definition, InclusionRule, RulePattern};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct DefinitionDoc {
    id: String,
    name: String,
    #[serde(default)]
    geographies: Vec<String>,
    include: IncludeDoc,
    #[serde(default)]
    exclude: RuleListDoc,
    #[serde(default)]
    policy: Option<String>,
    #[serde(default)]
    min_coverage: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct IncludeDoc {
    mode: String,
    #[serde(flatten)]
    lists: RuleListDoc,
}

#[derive(Debug, Default, Deserialize)]
struct RuleListDoc {
    #[serde(default)]
    ids: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    divisions: Vec<String>,
    #[serde(default)]
    groups: Vec<String>,
    #[serde(default)]
    classes: Vec<String>,
}

/// Parses a JSON array of definition documents.
pub fn parse_definitions(json: &str) -> Result<Vec<Definition>, EngineError> {
    let docs: Vec<DefinitionDoc> =
        serde_json::from_str(json).map_err(|e| EngineError::MalformedDefinition {
            definition: DefinitionId("<config>".into()),
            reason: e.to_string(),
        })?;
    docs.into_iter().map(build).collect()
}

fn build(doc: DefinitionDoc) -> Result<Definition, EngineError> {
    let id = DefinitionId(doc.id.clone());
    let malformed = |reason: String| EngineError::MalformedDefinition {
        definition: id.clone(),
        reason,
    };

    let include = match doc.include.mode.as_str() {
        "all" => InclusionRule::All,
        "list" => InclusionRule::AnyOf(patterns(&doc.include.lists, &id)?),
        other => return Err(malformed(format!("unknown inclusion mode '{other}'"))),
    };

    let policy = match doc.policy.as_deref() {
        None => MissingDataPolicy::default(),
        Some("drop_and_renormalize") => MissingDataPolicy::DropAndRenormalize,
        Some("carry_forward") => MissingDataPolicy::CarryForward,
        Some("impute_parent") => MissingDataPolicy::ImputeParent,
        Some(other) => return Err(malformed(format!("unknown missing-data policy '{other}'"))),
    };

    if let Some(floor) = doc.min_coverage {
        if !(0.0..=1.0).contains(&floor) {
            return Err(malformed(format!("minimum coverage {floor} outside 0..=1")));
        }
    }

    Ok(Definition {
        id: id.clone(),
        name: doc.name,
        include,
        exclude: patterns(&doc.exclude, &id)?,
        geographies: doc.geographies.into_iter().map(Geography).collect(),
        policy,
        min_coverage: doc.min_coverage,
    })
}

fn patterns(lists: &RuleListDoc, id: &DefinitionId) -> Result<Vec<RulePattern>, EngineError> {
    let mut out = Vec::new();
    out.extend(lists.ids.iter().map(|i| RulePattern::Id(ItemId(i.clone()))));
    out.extend(lists.tags.iter().map(|t| RulePattern::Tag(t.clone())));
    for (codes, level) in [
        (&lists.divisions, HierarchyLevel::Division),
        (&lists.groups, HierarchyLevel::Group),
        (&lists.classes, HierarchyLevel::Class),
    ] {
        for code in codes {
            let code = HierarchyCode(code.clone());
            if HierarchyLevel::of_code(&code) != Some(level) {
                return Err(EngineError::MalformedDefinition {
                    definition: id.clone(),
                    reason: format!("code '{code}' is not a {level:?} code"),
                });
            }
            out.push(RulePattern::Hierarchy(code));
        }
    }
    Ok(out)
}
