//! Template scanning: placeholders in, hand markup and hand registrations out.
//!
//! A scan is a pure function of the template, the placeholder pattern and the
//! radix table. The tick frequency the template needs is reported as part of
//! the output rather than written into the engine mid-scan.

use crate::common::{EXTENDED_SECONDS, SECONDS_UNIT, SUB_SECOND_UNIT};
use crate::components::markup;
use crate::radix::RadixTable;
use regex::{Captures, Regex};

/// Tick frequency for templates that only show whole seconds or coarser.
pub const DEFAULT_FREQUENCY_MS: i64 = 1000;

/// Tick frequency for templates that show sub-second units.
pub const PRECISE_FREQUENCY_MS: i64 = 100;

/// A hand registered by the scanner, in template order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandSpec {
    pub unit: String,
}

impl HandSpec {
    fn new(unit: &str) -> Self {
        Self {
            unit: unit.to_string(),
        }
    }
}

/// Result of scanning a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutput {
    /// The template with every placeholder replaced by hand markup.
    pub markup: String,
    /// One entry per placeholder (two for `s-ext`), in order of appearance.
    pub hands: Vec<HandSpec>,
    /// Tick frequency in milliseconds required to display the hands.
    pub frequency: i64,
}

/// Scans `template` once, replacing each match of `pattern`.
///
/// The unit is taken from capture group 1, or the whole match if the pattern
/// has no group.
pub fn scan(template: &str, pattern: &Regex, table: &RadixTable) -> ScanOutput {
    let mut hands = Vec::new();
    let mut precise = false;

    let markup = pattern
        .replace_all(template, |caps: &Captures<'_>| {
            let unit = caps
                .get(1)
                .or_else(|| caps.get(0))
                .map_or("", |m| m.as_str());

            if unit == EXTENDED_SECONDS {
                precise = true;
                hands.push(HandSpec::new(SECONDS_UNIT));
                hands.push(HandSpec::new(SUB_SECOND_UNIT));
                let cell = format!(
                    "{}{}{}",
                    markup::handlet(SECONDS_UNIT),
                    markup::point(),
                    markup::handlet(SUB_SECOND_UNIT)
                );
                return markup::hand(&cell, unit);
            }

            precise |= table.is_sub_second(unit);
            hands.push(HandSpec::new(unit));
            markup::hand("", unit)
        })
        .into_owned();

    ScanOutput {
        markup,
        hands,
        frequency: if precise {
            PRECISE_FREQUENCY_MS
        } else {
            DEFAULT_FREQUENCY_MS
        },
    }
}
