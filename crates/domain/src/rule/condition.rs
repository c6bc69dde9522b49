//! Condition: a single-metric threshold comparison.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Comparison applied as `value OP threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    /// Exact floating-point equality.
    #[serde(rename = "=")]
    Equal,
}

impl Operator {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::LessOrEqual => "<=",
            Self::GreaterOrEqual => ">=",
            Self::Equal => "=",
        }
    }

    /// Apply the comparison.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn compare(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::LessThan => value < threshold,
            Self::GreaterThan => value > threshold,
            Self::LessOrEqual => value <= threshold,
            Self::GreaterOrEqual => value >= threshold,
            // Sensor noise rarely lands on the exact threshold; kept as stored rules expect.
            Self::Equal => value == threshold,
        }
    }
}

impl FromStr for Operator {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<" => Ok(Self::LessThan),
            ">" => Ok(Self::GreaterThan),
            "<=" => Ok(Self::LessOrEqual),
            ">=" => Ok(Self::GreaterOrEqual),
            "=" => Ok(Self::Equal),
            other => Err(ValidationError::UnknownOperator(other.to_string())),
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The predicate of a rule: `<metric> <operator> <threshold>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub metric: String,
    pub operator: Operator,
    pub threshold: f64,
}

impl Condition {
    #[must_use]
    pub fn new(metric: impl Into<String>, operator: Operator, threshold: f64) -> Self {
        Self {
            metric: metric.into(),
            operator,
            threshold,
        }
    }

    /// Whether `value` satisfies this condition.
    #[must_use]
    pub fn is_met(&self, value: f64) -> bool {
        self.operator.compare(value, self.threshold)
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.metric, self.operator, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_fire_greater_than_only_strictly_above_threshold() {
        let c = Condition::new("temperature", Operator::GreaterThan, 30.0);
        assert!(c.is_met(31.0));
        assert!(!c.is_met(29.0));
        assert!(!c.is_met(30.0));
    }

    #[test]
    fn should_compare_with_every_operator() {
        assert!(Operator::LessThan.compare(1.0, 2.0));
        assert!(!Operator::LessThan.compare(2.0, 2.0));
        assert!(Operator::LessOrEqual.compare(2.0, 2.0));
        assert!(Operator::GreaterOrEqual.compare(2.0, 2.0));
        assert!(!Operator::GreaterOrEqual.compare(1.9, 2.0));
    }

    #[test]
    fn should_use_exact_equality_for_equal_operator() {
        assert!(Operator::Equal.compare(30.0, 30.0));
        assert!(!Operator::Equal.compare(30.000_001, 30.0));
        assert!(!Operator::Equal.compare(0.1 + 0.2, 0.3));
    }

    #[test]
    fn should_parse_operator_symbols() {
        for op in [
            Operator::LessThan,
            Operator::GreaterThan,
            Operator::LessOrEqual,
            Operator::GreaterOrEqual,
            Operator::Equal,
        ] {
            assert_eq!(op.symbol().parse::<Operator>().unwrap(), op);
        }
    }

    #[test]
    fn should_reject_unknown_operator() {
        assert_eq!(
            "!=".parse::<Operator>(),
            Err(ValidationError::UnknownOperator("!=".to_string()))
        );
    }

    #[test]
    fn should_serialize_operator_as_symbol() {
        assert_eq!(
            serde_json::to_string(&Operator::GreaterOrEqual).unwrap(),
            "\">=\""
        );
    }

    #[test]
    fn should_display_condition() {
        let c = Condition::new("humidity", Operator::LessThan, 40.5);
        assert_eq!(c.to_string(), "humidity < 40.5");
    }
}
