//! Markup fragments for hands and digits.
//!
//! Every fragment is a `span`. Hand containers carry `hand hand-{unit}`,
//! cells inside an extended-seconds container carry `handlet hand-{unit}`,
//! and digits carry `digital digital-{d}`.

pub fn hand(content: &str, unit: &str) -> String {
    span(&format!("hand hand-{unit}"), content)
}

pub fn handlet(unit: &str) -> String {
    span(&format!("handlet hand-{unit}"), "")
}

pub fn digital(digit: u8) -> String {
    span(&format!("digital digital-{digit}"), &digit.to_string())
}

/// The decimal separator between seconds and sub-seconds.
pub fn point() -> String {
    span("digital digital-point", ".")
}

fn span(class: &str, content: &str) -> String {
    format!("<span class=\"{class}\">{content}</span>")
}
