//! Lambda state labels.

use std::fmt;

/// Identifier of an alchemical state
///
/// The coupling value is rounded to two decimal places and kept as text. This text is what
/// joins windows to each other and tables from different files to each other, so two values
/// that round to the same two decimals name the same state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateLabel(String);

impl StateLabel {
    /// Label for the state with coupling value `value`
    pub fn from_value(value: f64) -> Self {
        Self(format!("{:.2}", value))
    }

    /// The label as text, e.g. `"0.25"`
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<f64> for StateLabel {
    fn from(value: f64) -> Self {
        Self::from_value(value)
    }
}

impl AsRef<str> for StateLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for StateLabel {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StateLabel {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for StateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_two_decimals() {
        assert_eq!(StateLabel::from_value(0.0), "0.00");
        assert_eq!(StateLabel::from_value(1.0), "1.00");
        assert_eq!(StateLabel::from_value(0.25), "0.25");
        assert_eq!(StateLabel::from(0.5).as_str(), "0.50");
    }

    #[test]
    fn values_within_rounding_share_a_label() {
        assert_eq!(StateLabel::from_value(0.001), StateLabel::from_value(0.004));
        assert_eq!(StateLabel::from_value(0.004), "0.00");
        assert_ne!(StateLabel::from_value(0.1), StateLabel::from_value(0.11));
    }

    #[test]
    fn displays_as_text() {
        assert_eq!(StateLabel::from_value(0.05).to_string(), "0.05");
        assert_eq!(format!("{:>6}", StateLabel::from_value(1.0)), "  1.00");
    }
}
