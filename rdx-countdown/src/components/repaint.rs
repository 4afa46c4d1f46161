//! Diffed repaint of hand values into a render surface.

use crate::components::hand::Hand;
use crate::components::markup;
use crate::components::surface::RenderSurface;

/// Splits `value` into exactly `bits` decimal digits, most significant first.
///
/// Negative values render as all zeros; digits beyond `bits` are dropped.
pub fn to_digitals(value: i64, bits: usize) -> Vec<u8> {
    let mut value = value.max(0);
    let mut digits = vec![0u8; bits];
    for slot in digits.iter_mut().rev() {
        *slot = (value % 10) as u8;
        value /= 10;
    }
    digits
}

/// Digit markup for one hand.
pub fn hand_markup(hand: &Hand) -> String {
    to_digitals(hand.value, hand.bits)
        .into_iter()
        .map(markup::digital)
        .collect()
}

/// Writes every changed hand to its node and returns how many were written.
///
/// Hands whose value did not change since the previous reflow, and hands
/// without a node, are skipped.
pub fn repaint(hands: &[Hand], surface: &mut dyn RenderSurface) -> usize {
    let mut written = 0;
    for hand in hands.iter().filter(|hand| hand.changed()) {
        if let Some(node) = hand.node {
            surface.write(node, hand_markup(hand));
            written += 1;
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::scanner::HandSpec;
    use crate::components::surface::MarkupSurface;
    use crate::radix::RadixTable;

    #[test]
    fn test_to_digitals_pads_and_truncates() {
        assert_eq!(to_digitals(5, 2), vec![0, 5]);
        assert_eq!(to_digitals(59, 2), vec![5, 9]);
        assert_eq!(to_digitals(123, 2), vec![2, 3]);
        assert_eq!(to_digitals(7, 4), vec![0, 0, 0, 7]);
        assert_eq!(to_digitals(0, 1), vec![0]);
        assert!(to_digitals(42, 0).is_empty());
    }

    #[test]
    fn test_to_digitals_clamps_negative_values() {
        assert_eq!(to_digitals(-1, 2), vec![0, 0]);
        assert_eq!(to_digitals(i64::MIN, 3), vec![0, 0, 0]);
    }

    fn mounted(units: &[&str]) -> (MarkupSurface, Vec<Hand>) {
        let table = RadixTable::default();
        let mut surface = MarkupSurface::new();
        let source: String = units.iter().map(|u| markup::hand("", u)).collect();
        surface.mount(&source);
        let hands = units
            .iter()
            .map(|u| {
                let spec = HandSpec {
                    unit: u.to_string(),
                };
                Hand::new(&spec, &table, surface.resolve(u))
            })
            .collect();
        (surface, hands)
    }

    #[test]
    fn test_repaint_writes_only_changed_hands() {
        let (mut surface, mut hands) = mounted(&["m", "s"]);

        hands.iter_mut().for_each(|h| h.update(90_000));
        assert_eq!(repaint(&hands, &mut surface), 2);
        assert_eq!(surface.text(), "0130");

        hands.iter_mut().for_each(|h| h.update(89_000));
        assert_eq!(repaint(&hands, &mut surface), 1);
        assert_eq!(surface.text(), "0129");
        assert_eq!(surface.writes(), 3);
    }

    #[test]
    fn test_repaint_skips_hands_without_node() {
        let (mut surface, _) = mounted(&["s"]);
        let mut orphan = Hand::new(
            &HandSpec {
                unit: "m".to_string(),
            },
            &RadixTable::default(),
            None,
        );
        orphan.update(60_000);
        assert_eq!(repaint(&[orphan], &mut surface), 0);
        assert_eq!(surface.writes(), 0);
    }

    #[test]
    fn test_hand_markup() {
        let (_, mut hands) = mounted(&["s"]);
        hands[0].update(7_000);
        assert_eq!(
            hand_markup(&hands[0]),
            format!("{}{}", markup::digital(0), markup::digital(7))
        );
    }
}
