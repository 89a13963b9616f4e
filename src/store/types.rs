use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// Unique dotted item code (e.g. "01.1.1.1.1.01").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An independent weighting and index scope (e.g. "Combined", "Rural").
/// Computations never mix values across geographies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Geography(pub String);

impl fmt::Display for Geography {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a configured index variant (e.g. "headline", "core-ex-fuel").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DefinitionId(pub String);

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A calendar month stored as `year * 12 + month0` so that lag arithmetic
/// is a plain subtraction. Renders and parses as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Month(pub u32);

impl Month {
    pub fn new(year: u32, month: u32) -> Option<Self> {
        if month == 0 || month > 12 {
            return None;
        }
        Some(Self(year * 12 + (month - 1)))
    }

    pub fn year(&self) -> u32 {
        self.0 / 12
    }

    /// 1-based calendar month.
    pub fn month(&self) -> u32 {
        self.0 % 12 + 1
    }

    /// The month `lag` months earlier, or None before year 0.
    pub fn minus(&self, lag: u32) -> Option<Month> {
        self.0.checked_sub(lag).map(Month)
    }

    pub fn next(&self) -> Month {
        Month(self.0 + 1)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for Month {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || EngineError::MalformedMonth { text: s.to_string() };
        let (y, m) = s.split_once('-').ok_or_else(malformed)?;
        let year: u32 = y.parse().map_err(|_| malformed())?;
        let month: u32 = m.parse().map_err(|_| malformed())?;
        Month::new(year, month).ok_or_else(malformed)
    }
}

impl Serialize for Month {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The three aggregation levels of the classification tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HierarchyLevel {
    Division,
    Group,
    Class,
}

impl HierarchyLevel {
    /// Number of dotted segments a code at this level carries.
    pub fn segments(&self) -> usize {
        match self {
            HierarchyLevel::Division => 1,
            HierarchyLevel::Group => 2,
            HierarchyLevel::Class => 3,
        }
    }

    /// Level inferred from a code's segment count.
    pub fn of_code(code: &HierarchyCode) -> Option<HierarchyLevel> {
        match code.0.split('.').count() {
            1 => Some(HierarchyLevel::Division),
            2 => Some(HierarchyLevel::Group),
            3 => Some(HierarchyLevel::Class),
            _ => None,
        }
    }
}

/// A dotted classification code. Items carry the full code; truncating it
/// yields the enclosing class, group and division codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HierarchyCode(pub String);

impl HierarchyCode {
    /// The enclosing code at the given level (first 1/2/3 segments).
    pub fn truncate(&self, level: HierarchyLevel) -> HierarchyCode {
        let n = level.segments();
        HierarchyCode(self.0.split('.').take(n).collect::<Vec<_>>().join("."))
    }

    /// Segment-wise prefix match: "01.1" is a prefix of "01.1.1.1.1.01"
    /// but "1" is not a prefix of "11.2".
    pub fn is_prefix_of(&self, other: &HierarchyCode) -> bool {
        let mut own = self.0.split('.');
        let mut theirs = other.0.split('.');
        loop {
            match (own.next(), theirs.next()) {
                (None, _) => return true,
                (Some(_), None) => return false,
                (Some(a), Some(b)) if a != b => return false,
                _ => {}
            }
        }
    }
}

impl fmt::Display for HierarchyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One basket item from the weights table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// Full dotted classification code (division.group.class...).
    pub hierarchy: HierarchyCode,
    pub tags: BTreeSet<String>,
    pub priority: u32,
    /// Only flagged items participate in the published basket; the
    /// per-geography weight-sum invariant covers flagged items only.
    pub available: bool,
    /// Absolute weight per geography, 0..=100.
    pub weights: BTreeMap<Geography, f64>,
}

impl Item {
    pub fn weight(&self, geography: &Geography) -> Option<f64> {
        self.weights.get(geography).copied()
    }
}

/// One observation from the time-series table. `level == None` is the
/// explicit missing marker; a stored level is always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub level: Option<f64>,
    pub provisional: bool,
}

/// One row of the hierarchy table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub level: HierarchyLevel,
    pub code: HierarchyCode,
    pub name: String,
    /// None at the division (root) level.
    pub parent: Option<HierarchyCode>,
    pub child_count: u32,
}
