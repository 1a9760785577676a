use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PrizeTreeError;

/// Node identifiers are opaque strings (gene or feature names, possibly
/// aliased with an `_suffix`).
pub type NodeId = String;

/// How an edge weight is turned into a solver cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CostMode {
    /// `cost(w) = w`
    Weight,
    /// `cost(w) = 1 - w^2`
    OneMinusWeightSquared,
}

impl Default for CostMode {
    fn default() -> Self {
        CostMode::Weight
    }
}

impl CostMode {
    pub fn cost(self, weight: f64) -> f64 {
        match self {
            CostMode::Weight => weight,
            CostMode::OneMinusWeightSquared => 1.0 - weight * weight,
        }
    }
}

impl fmt::Display for CostMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CostMode::Weight => "weight",
            CostMode::OneMinusWeightSquared => "1-weightsqd",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for CostMode {
    type Err = PrizeTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weight" => Ok(CostMode::Weight),
            "1-weightsqd" => Ok(CostMode::OneMinusWeightSquared),
            other => Err(PrizeTreeError::Config(format!(
                "unsupported cost mode \"{}\"",
                other
            ))),
        }
    }
}

impl TryFrom<String> for CostMode {
    type Error = PrizeTreeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CostMode> for String {
    fn from(mode: CostMode) -> String {
        mode.to_string()
    }
}

/// Polarity of the artificial prize formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// `-lambda * (1 - freq)^alpha` over every network node.
    Negative,
    /// `lambda * freq^alpha` over nodes with a frequency entry.
    Positive,
    /// No base artificial prizes are produced.
    None,
}

/// Artificial prize mode, resolved once at configuration time from a
/// combinable mode string. The string vocabulary is polarity
/// ("negative" / "positive") times proportionality ("proportional"),
/// matched by substring containment, so values such as
/// "negative-proportional" are valid. A string containing neither
/// polarity keyword yields no base prizes; this is a benign degenerate
/// case, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PrizeMode {
    raw: String,
    pub negative: bool,
    pub positive: bool,
    pub proportional: bool,
}

impl PrizeMode {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Negative takes precedence when both polarity keywords are present.
    pub fn polarity(&self) -> Polarity {
        if self.negative {
            Polarity::Negative
        } else if self.positive {
            Polarity::Positive
        } else {
            Polarity::None
        }
    }
}

impl Default for PrizeMode {
    fn default() -> Self {
        "positive".into()
    }
}

impl From<&str> for PrizeMode {
    fn from(s: &str) -> Self {
        PrizeMode {
            raw: s.to_string(),
            negative: s.contains("negative"),
            positive: s.contains("positive"),
            proportional: s.contains("proportional"),
        }
    }
}

impl From<String> for PrizeMode {
    fn from(s: String) -> Self {
        s.as_str().into()
    }
}

impl From<PrizeMode> for String {
    fn from(mode: PrizeMode) -> String {
        mode.raw
    }
}

impl fmt::Display for PrizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_mode_parses_known_strings() {
        assert_eq!("weight".parse::<CostMode>().unwrap(), CostMode::Weight);
        assert_eq!(
            "1-weightsqd".parse::<CostMode>().unwrap(),
            CostMode::OneMinusWeightSquared
        );
    }

    #[test]
    fn cost_mode_rejects_unknown_strings() {
        assert!("1-weight".parse::<CostMode>().is_err());
        assert!("".parse::<CostMode>().is_err());
    }

    #[test]
    fn cost_mode_formulas() {
        assert_eq!(CostMode::Weight.cost(0.5), 0.5);
        assert_eq!(CostMode::OneMinusWeightSquared.cost(0.5), 0.75);
        // symmetric in the weight
        assert_eq!(
            CostMode::OneMinusWeightSquared.cost(0.3),
            CostMode::OneMinusWeightSquared.cost(-0.3)
        );
    }

    #[test]
    fn prize_mode_combinable_keywords() {
        let mode = PrizeMode::from("negative-proportional");
        assert!(mode.negative);
        assert!(!mode.positive);
        assert!(mode.proportional);
        assert_eq!(mode.polarity(), Polarity::Negative);
    }

    #[test]
    fn prize_mode_negative_wins_over_positive() {
        let mode = PrizeMode::from("negative-positive");
        assert_eq!(mode.polarity(), Polarity::Negative);
    }

    #[test]
    fn prize_mode_neither_keyword_is_benign() {
        let mode = PrizeMode::from("off");
        assert_eq!(mode.polarity(), Polarity::None);
        assert!(!mode.proportional);
        assert_eq!(mode.as_str(), "off");
    }
}
