//! The clock radix table: how a flat millisecond count splits into unit hands.
//!
//! The table is an ordered list of `(unit, radix, bits)` entries, finest unit
//! first. A unit's place-value `base` is the millisecond size of the finest
//! unit multiplied by the radix of every finer entry before it.

use crate::error::CountdownError;
use serde::Deserialize;
use tracing::warn;

/// Millisecond size of the finest unit in the table (tenths of a second).
pub const FINEST_UNIT_MS: i64 = 100;

/// Place-value base handed to a unit the table does not know.
pub const UNMATCHED_BASE: i64 = 100;

/// Digit width handed to a unit the table does not know.
pub const UNMATCHED_BITS: usize = 2;

/// One entry of the radix table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnitRadix {
    /// The unit symbol as it appears in template placeholders (e.g. `"h"`).
    pub unit: String,
    /// Modulus applied after dividing the remaining time by the unit's base.
    pub radix: i64,
    /// Number of decimal digits rendered for this unit.
    pub bits: usize,
}

impl UnitRadix {
    pub fn new(unit: impl Into<String>, radix: i64, bits: usize) -> Self {
        Self {
            unit: unit.into(),
            radix,
            bits,
        }
    }
}

/// Where a unit sits in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub base: i64,
    pub radix: i64,
    pub bits: usize,
    /// `false` when the unit was absent from the table and the fallback applies.
    pub matched: bool,
}

impl Placement {
    /// The fallback placement: fixed base, no wrap-around, two digits.
    pub fn unmatched() -> Self {
        Self {
            base: UNMATCHED_BASE,
            radix: i64::MAX,
            bits: UNMATCHED_BITS,
            matched: false,
        }
    }
}

/// An ordered, non-empty list of unit radices, finest unit first.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<UnitRadix>")]
pub struct RadixTable(Vec<UnitRadix>);

impl RadixTable {
    /// Builds a table from entries ordered finest first.
    pub fn new(units: Vec<UnitRadix>) -> Result<Self, CountdownError> {
        if units.is_empty() {
            return Err(CountdownError::EmptyRadixTable);
        }
        if let Some(bad) = units.iter().find(|u| u.radix < 1 || u.bits == 0) {
            return Err(CountdownError::InvalidRadix {
                unit: bad.unit.clone(),
            });
        }
        Ok(Self(units))
    }

    pub fn units(&self) -> &[UnitRadix] {
        &self.0
    }

    /// Computes the place-value parameters for `unit`.
    ///
    /// Units missing from the table degrade to [`Placement::unmatched`] instead
    /// of failing.
    pub fn placement(&self, unit: &str) -> Placement {
        let mut base = FINEST_UNIT_MS;
        for entry in &self.0 {
            if entry.unit == unit {
                return Placement {
                    base,
                    radix: entry.radix,
                    bits: entry.bits,
                    matched: true,
                };
            }
            base = base.saturating_mul(entry.radix);
        }
        warn!(
            "Unit '{}' is not in the clock radix table; using the fallback base.",
            unit
        );
        Placement::unmatched()
    }

    /// Whether `unit` is a known unit finer than one second.
    pub fn is_sub_second(&self, unit: &str) -> bool {
        let mut base = FINEST_UNIT_MS;
        for entry in &self.0 {
            if entry.unit == unit {
                return base < 1000;
            }
            base = base.saturating_mul(entry.radix);
        }
        false
    }
}

impl TryFrom<Vec<UnitRadix>> for RadixTable {
    type Error = CountdownError;

    fn try_from(units: Vec<UnitRadix>) -> Result<Self, Self::Error> {
        Self::new(units)
    }
}

impl Default for RadixTable {
    /// Tenths, seconds, minutes, hours and days (days wrap at 100).
    fn default() -> Self {
        Self(vec![
            UnitRadix::new("u", 10, 1),
            UnitRadix::new("s", 60, 2),
            UnitRadix::new("m", 60, 2),
            UnitRadix::new("h", 24, 2),
            UnitRadix::new("d", 100, 2),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_bases() {
        let table = RadixTable::default();
        assert_eq!(table.placement("u").base, 100);
        assert_eq!(table.placement("s").base, 1_000);
        assert_eq!(table.placement("m").base, 60_000);
        assert_eq!(table.placement("h").base, 3_600_000);
        assert_eq!(table.placement("d").base, 86_400_000);
    }

    #[test]
    fn test_placement_carries_radix_and_bits() {
        let table = RadixTable::default();
        let hours = table.placement("h");
        assert_eq!(hours.radix, 24);
        assert_eq!(hours.bits, 2);
        assert!(hours.matched);
        assert_eq!(table.placement("u").bits, 1);
    }

    #[test]
    fn test_unmatched_unit_falls_back() {
        let table = RadixTable::default();
        let placement = table.placement("w");
        assert_eq!(placement, Placement::unmatched());
        assert_eq!(placement.base, UNMATCHED_BASE);
        assert!(!placement.matched);
    }

    #[test]
    fn test_sub_second_detection() {
        let table = RadixTable::default();
        assert!(table.is_sub_second("u"));
        assert!(!table.is_sub_second("s"));
        assert!(!table.is_sub_second("d"));
        assert!(!table.is_sub_second("missing"));
    }

    #[test]
    fn test_custom_table_minutes_and_seconds() {
        let table = RadixTable::new(vec![
            UnitRadix::new("t", 10, 1),
            UnitRadix::new("s", 60, 2),
            UnitRadix::new("m", 1000, 3),
        ])
        .unwrap();
        assert_eq!(table.placement("t").base, 100);
        assert_eq!(table.placement("s").base, 1_000);
        assert_eq!(table.placement("m").base, 60_000);
        assert_eq!(table.placement("m").bits, 3);
    }

    #[test]
    fn test_rejects_empty_and_invalid_tables() {
        assert!(matches!(
            RadixTable::new(Vec::new()),
            Err(CountdownError::EmptyRadixTable)
        ));
        assert!(matches!(
            RadixTable::new(vec![UnitRadix::new("s", 0, 2)]),
            Err(CountdownError::InvalidRadix { unit }) if unit == "s"
        ));
        assert!(matches!(
            RadixTable::new(vec![UnitRadix::new("s", 60, 0)]),
            Err(CountdownError::InvalidRadix { .. })
        ));
    }
}
