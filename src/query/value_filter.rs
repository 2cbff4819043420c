use crate::model::SensorMetric;
use std::fmt;

/// Numeric range compiled from an operator filter. Open-ended comparisons
/// use ±infinity; infinite bounds are omitted from storage predicates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueRange {
    pub from: f64,
    pub to: f64,
    pub include_from: bool,
    pub include_to: bool,
}

impl ValueRange {
    /// True when `v` falls inside the range, honoring bound inclusivity.
    pub fn contains(&self, v: f64) -> bool {
        let lower_ok = if self.include_from { v >= self.from } else { v > self.from };
        let upper_ok = if self.include_to { v <= self.to } else { v < self.to };
        lower_ok && upper_ok
    }
}

/// Value filter compilation failures. Surfaced as rejected requests.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
    /// A value filter requires a concrete metric, not ALL.
    MetricRequired,
    /// The operator needs an operand that was not supplied.
    MissingValue(&'static str),
    /// `between` with from > to.
    InvertedBounds { from: f64, to: f64 },
    UnsupportedOperator(String),
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::MetricRequired => {
                write!(f, "a concrete sensor metric is required when filtering by value")
            }
            FilterError::MissingValue(op) => {
                write!(f, "operator '{}' requires a comparison value", op)
            }
            FilterError::InvertedBounds { from, to } => {
                write!(f, "'between' lower bound {} exceeds upper bound {}", from, to)
            }
            FilterError::UnsupportedOperator(op) => {
                write!(
                    f,
                    "unsupported operator '{}'. Supported: eq, gt, gte, lt, lte, between",
                    op
                )
            }
        }
    }
}

impl std::error::Error for FilterError {}

/// Compile an operator + operand(s) + optional tolerance into a range.
///
/// `eq` always compiles to a symmetric closed interval — repeated
/// float storage/retrieval rarely compares bit-exact, so literal equality
/// would miss values the caller considers equal. The default tolerance is
/// metric-dependent; an explicit non-negative tolerance overrides it.
pub fn compile_value_filter(
    op: &str,
    value: Option<f64>,
    value_to: Option<f64>,
    tolerance: Option<f64>,
    metric: SensorMetric,
) -> Result<ValueRange, FilterError> {
    if metric == SensorMetric::All {
        return Err(FilterError::MetricRequired);
    }

    let op = op.trim().to_ascii_lowercase();
    match op.as_str() {
        "between" => {
            let from = value.ok_or(FilterError::MissingValue("between"))?;
            let to = value_to.ok_or(FilterError::MissingValue("between"))?;
            if from > to {
                return Err(FilterError::InvertedBounds { from, to });
            }
            Ok(ValueRange { from, to, include_from: true, include_to: true })
        }
        "eq" => {
            let v = value.ok_or(FilterError::MissingValue("eq"))?;
            let tol = resolve_tolerance(metric, tolerance);
            Ok(ValueRange { from: v - tol, to: v + tol, include_from: true, include_to: true })
        }
        "gt" => {
            let v = value.ok_or(FilterError::MissingValue("gt"))?;
            Ok(ValueRange { from: v, to: f64::INFINITY, include_from: false, include_to: false })
        }
        "gte" => {
            let v = value.ok_or(FilterError::MissingValue("gte"))?;
            Ok(ValueRange { from: v, to: f64::INFINITY, include_from: true, include_to: false })
        }
        "lt" => {
            let v = value.ok_or(FilterError::MissingValue("lt"))?;
            Ok(ValueRange {
                from: f64::NEG_INFINITY,
                to: v,
                include_from: false,
                include_to: false,
            })
        }
        "lte" => {
            let v = value.ok_or(FilterError::MissingValue("lte"))?;
            Ok(ValueRange { from: f64::NEG_INFINITY, to: v, include_from: false, include_to: true })
        }
        _ => Err(FilterError::UnsupportedOperator(op)),
    }
}

/// Default `eq` slack per metric: light sensors report in lux with far more
/// jitter than temperature/humidity.
fn resolve_tolerance(metric: SensorMetric, tolerance: Option<f64>) -> f64 {
    if let Some(t) = tolerance {
        if t >= 0.0 {
            return t;
        }
    }
    match metric {
        SensorMetric::Temperature | SensorMetric::Humidity => 0.1,
        SensorMetric::Light => 1.0,
        SensorMetric::All => 0.0,
    }
}
