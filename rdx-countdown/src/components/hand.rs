//! Per-unit hand state.

use crate::common::NodeId;
use crate::components::scanner::HandSpec;
use crate::radix::RadixTable;

/// One unit of the clock face (hours, seconds, ...) and the node it paints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hand {
    /// Unit symbol, e.g. `"m"`.
    pub unit: String,
    /// Render node this hand writes to, if the surface resolved one.
    pub node: Option<NodeId>,
    /// Milliseconds represented by one step of this hand.
    pub base: i64,
    pub radix: i64,
    /// Digit width.
    pub bits: usize,
    pub value: i64,
    /// Value before the latest reflow. `None` right after the first reflow.
    pub last_value: Option<i64>,
    primed: bool,
}

impl Hand {
    pub fn new(spec: &HandSpec, table: &RadixTable, node: Option<NodeId>) -> Self {
        let placement = table.placement(&spec.unit);
        Self {
            unit: spec.unit.clone(),
            node,
            base: placement.base,
            radix: placement.radix,
            bits: placement.bits,
            value: 0,
            last_value: None,
            primed: false,
        }
    }

    /// Recomputes the value for `left` milliseconds, remembering the previous one.
    pub fn update(&mut self, left: i64) {
        self.last_value = self.primed.then_some(self.value);
        self.value = value_at(left, self.base, self.radix);
        self.primed = true;
    }

    /// Whether the latest reflow changed what this hand displays.
    pub fn changed(&self) -> bool {
        self.last_value != Some(self.value)
    }
}

/// `floor(left / base) mod radix`, with the remainder taking the sign of the
/// dividend so negative inputs stay negative (and later render as zeros).
pub fn value_at(left: i64, base: i64, radix: i64) -> i64 {
    left.div_euclid(base) % radix
}
