//! Derived analytics over computed index levels: contribution
//! decomposition, wedge attribution, and legacy-series linking.

pub mod contributions;
pub mod linking;
pub mod wedge;

pub use contributions::{
    decompose_yoy, group_contributions, ContributionRecord, ContributionSet, GroupContribution,
    CONTRIBUTION_TOLERANCE_PP,
};
pub use linking::{link, LinkedSeries};
pub use wedge::{analyze as analyze_wedge, WedgeGroup, WedgeReport};
