//! Splicing a legacy base-year series onto a new base-year series.
//!
//! Both constituent series must be fully computed before linking: a data
//! dependency, not a lock. Rates taken on the linked series never mix raw
//! old and new levels, so there is no discontinuity at the link month.

use crate::compute::inflation::IndexSeries;
use crate::error::EngineError;
use crate::store::Month;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedSeries {
    pub link_month: Month,
    /// LF = I_new(T*) / I_old(T*).
    pub factor: f64,
    pub series: IndexSeries,
}

/// Links `legacy` onto `new` at `link_month`.
///
/// Levels before the link month are the legacy levels rescaled by the link
/// factor; levels from the link month onward are the new series verbatim.
pub fn link(
    legacy: &IndexSeries,
    new: &IndexSeries,
    link_month: Month,
) -> Result<LinkedSeries, EngineError> {
    let old_level = match legacy.level(link_month) {
        Some(level) if level > 0.0 => level,
        _ => return Err(EngineError::DivideByZeroLink { month: link_month }),
    };
    let new_level = new
        .level(link_month)
        .ok_or(EngineError::InsufficientHistory {
            month: link_month,
            needed: link_month,
        })?;
    let factor = new_level / old_level;

    let mut series = IndexSeries::new();
    for (month, level) in legacy.iter() {
        if month < link_month {
            series.insert(month, level * factor);
        }
    }
    for (month, level) in new.iter() {
        if month >= link_month {
            series.insert(month, level);
        }
    }

    Ok(LinkedSeries {
        link_month,
        factor,
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grow(series: &mut IndexSeries, start: Month, first: f64, rate: f64, months: u32) {
        let mut level = first;
        let mut month = start;
        for _ in 0..months {
            series.insert(month, level);
            level *= 1.0 + rate;
            month = month.next();
        }
    }

    #[test]
    fn test_link_factor_and_splice() {
        let start_old = Month::new(2023, 1).unwrap();
        let link_month = Month::new(2024, 1).unwrap();
        let mut legacy = IndexSeries::new();
        let mut new = IndexSeries::new();
        // Legacy runs 2023-01..2024-06 ending around 120; the new series
        // rebases to 100 at 2024-01.
        grow(&mut legacy, start_old, 115.0, 0.004, 18);
        grow(&mut new, link_month, 100.0, 0.004, 18);

        let linked = link(&legacy, &new, link_month).unwrap();
        let old_at_link = legacy.level(link_month).unwrap();
        assert!((linked.factor - 100.0 / old_at_link).abs() < 1e-12);

        // At the link month, the linked level is the new level verbatim.
        assert_eq!(linked.series.level(link_month), Some(100.0));
        // Before it, legacy levels are rescaled.
        let m0 = Month::new(2023, 6).unwrap();
        let rescaled = legacy.level(m0).unwrap() * linked.factor;
        assert_eq!(linked.series.level(m0), Some(rescaled));
    }

    /// YoY at the link month must equal the new-series level against the
    /// rescaled legacy base, with no jump from mixing raw bases.
    #[test]
    fn test_linking_continuity_of_yoy() {
        let start_old = Month::new(2023, 1).unwrap();
        let link_month = Month::new(2024, 1).unwrap();
        let mut legacy = IndexSeries::new();
        let mut new = IndexSeries::new();
        grow(&mut legacy, start_old, 115.0, 0.005, 13);
        grow(&mut new, link_month, 100.0, 0.005, 13);

        let linked = link(&legacy, &new, link_month).unwrap();
        let yoy = linked.series.yoy(link_month).unwrap();
        let base = legacy.level(Month::new(2023, 1).unwrap()).unwrap() * linked.factor;
        let expected = (100.0 / base - 1.0) * 100.0;
        assert!((yoy - expected).abs() < 1e-12);

        // A YoY window straddling the splice also draws only linked levels.
        let mid = Month::new(2024, 6).unwrap();
        assert!(linked.series.yoy(mid).is_ok());
    }

    #[test]
    fn test_missing_or_zero_legacy_level_fails() {
        let link_month = Month::new(2024, 1).unwrap();
        let legacy = IndexSeries::new();
        let mut new = IndexSeries::new();
        new.insert(link_month, 100.0);
        let err = link(&legacy, &new, link_month).unwrap_err();
        assert!(matches!(err, EngineError::DivideByZeroLink { .. }));
    }

    #[test]
    fn test_missing_new_level_fails() {
        let link_month = Month::new(2024, 1).unwrap();
        let mut legacy = IndexSeries::new();
        legacy.insert(link_month, 120.0);
        let new = IndexSeries::new();
        let err = link(&legacy, &new, link_month).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientHistory { .. }));
    }
}
