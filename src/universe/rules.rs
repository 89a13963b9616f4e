//! Rule patterns: the predicate side of universe selection.
//!
//! A single tagged-variant type covers all three ways a definition may name
//! items (explicit id, free-text tag, hierarchy-code prefix). Inclusion is
//! predicate union, exclusion is predicate difference; no rule carries
//! state, so evaluation order never matters.

use crate::store::{HierarchyCode, Item, ItemId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RulePattern {
    /// Exact item-id match.
    Id(ItemId),
    /// Tag-set membership.
    Tag(String),
    /// Segment-wise prefix match at division/group/class granularity.
    Hierarchy(HierarchyCode),
}

impl RulePattern {
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            RulePattern::Id(id) => &item.id == id,
            RulePattern::Tag(tag) => item.tags.contains(tag),
            RulePattern::Hierarchy(prefix) => prefix.is_prefix_of(&item.hierarchy),
        }
    }
}

/// OR across patterns, short-circuiting per item.
pub fn any_matches(patterns: &[RulePattern], item: &Item) -> bool {
    patterns.iter().any(|p| p.matches(item))
}
