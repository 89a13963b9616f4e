//! Hierarchy-table integrity: acyclicity, parent resolution, item-code
//! resolution, child counts.

use crate::store::{HierarchyLevel, ReferenceTables};
use crate::validation::finding::{FindingKind, QaFinding, Severity};
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::DiGraph;
use std::collections::{BTreeMap, HashMap};

pub(crate) fn check(tables: &ReferenceTables) -> Vec<QaFinding> {
    let mut findings = Vec::new();

    let nodes: Vec<_> = tables.nodes().collect();
    if nodes.is_empty() {
        // Nothing to validate against; rollups derive membership from
        // item codes alone.
        return findings;
    }

    // Parent-code relation as a directed graph, parent -> child.
    let mut graph: DiGraph<(), ()> = DiGraph::new();
    let mut indices = HashMap::new();
    for node in &nodes {
        let idx = graph.add_node(());
        indices.insert(node.code.clone(), idx);
    }
    let mut child_counts: BTreeMap<_, u32> = BTreeMap::new();
    for node in &nodes {
        let Some(parent) = &node.parent else {
            continue;
        };
        *child_counts.entry(parent.clone()).or_insert(0) += 1;
        match indices.get(parent) {
            Some(&parent_idx) => {
                graph.add_edge(parent_idx, indices[&node.code], ());
            }
            None => findings.push(QaFinding {
                severity: Severity::Fatal,
                kind: FindingKind::MissingParent,
                subject: node.code.to_string(),
                message: format!("parent code '{parent}' not present in the hierarchy table"),
            }),
        }
    }

    if is_cyclic_directed(&graph) {
        findings.push(QaFinding {
            severity: Severity::Fatal,
            kind: FindingKind::HierarchyCycle,
            subject: "hierarchy".to_string(),
            message: "parent-code relation contains a cycle".to_string(),
        });
    }

    for node in &nodes {
        let actual = child_counts.get(&node.code).copied().unwrap_or(0);
        // Leaf-adjacent class nodes count items, which the table does not
        // enumerate; only intermediate counts are checkable.
        if node.level != HierarchyLevel::Class && node.child_count != actual {
            findings.push(QaFinding {
                severity: Severity::Data,
                kind: FindingKind::ChildCountMismatch,
                subject: node.code.to_string(),
                message: format!("child count {} recorded, {} present", node.child_count, actual),
            });
        }
    }

    // Every item code must resolve to exactly one node per level.
    for item in tables.items() {
        for level in [
            HierarchyLevel::Class,
            HierarchyLevel::Group,
            HierarchyLevel::Division,
        ] {
            let code = item.hierarchy.truncate(level);
            if tables.node(level, &code).is_none() {
                findings.push(QaFinding {
                    severity: Severity::Data,
                    kind: FindingKind::UnresolvedItemCode,
                    subject: item.id.to_string(),
                    message: format!("code '{code}' has no {level:?} node"),
                });
            }
        }
    }

    findings
}
