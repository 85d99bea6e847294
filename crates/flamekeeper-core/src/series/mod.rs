//! Numeric control-value series and the providers that fetch them.

mod provider;

pub use provider::{ApiClient, FileSeries, SeriesProvider};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered, read-only sequence of control values.
///
/// Built from loosely typed JSON: numbers pass through, numeric strings are
/// parsed, everything else counts as `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Value>", into = "Vec<f64>")]
pub struct NumericSeries(Vec<f64>);

impl NumericSeries {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn from_json_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        Self(values.into_iter().map(coerce).collect())
    }

    /// Accepts a bare array, or an object carrying the array under
    /// `values` or `data`.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let array = match payload {
            Value::Array(items) => items,
            Value::Object(map) => map
                .get("values")
                .or_else(|| map.get("data"))
                .and_then(Value::as_array)?,
            _ => return None,
        };
        Some(Self::from_json_values(array))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Value>> for NumericSeries {
    fn from(values: Vec<Value>) -> Self {
        Self::from_json_values(&values)
    }
}

impl From<NumericSeries> for Vec<f64> {
    fn from(series: NumericSeries) -> Self {
        series.0
    }
}

impl From<Vec<f64>> for NumericSeries {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Coerce one JSON value to a number. Non-numeric input yields `0.0`.
pub fn coerce(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_strings_and_junk() {
        let series = NumericSeries::from(vec![json!(1), json!(" 2.5 "), json!("abc"), json!(null)]);
        assert_eq!(series.as_slice(), &[1.0, 2.5, 0.0, 0.0]);
    }

    #[test]
    fn nan_and_infinity_strings_count_as_zero() {
        assert_eq!(coerce(&json!("NaN")), 0.0);
        assert_eq!(coerce(&json!("inf")), 0.0);
    }

    #[test]
    fn payload_shapes() {
        let bare = NumericSeries::from_payload(&json!([1, 2])).unwrap();
        let wrapped = NumericSeries::from_payload(&json!({ "values": ["1", 2] })).unwrap();
        let data = NumericSeries::from_payload(&json!({ "data": [1, "2"] })).unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(bare, data);
        assert!(NumericSeries::from_payload(&json!({ "other": [1] })).is_none());
        assert!(NumericSeries::from_payload(&json!(3)).is_none());
    }

    #[test]
    fn deserializes_mixed_array() {
        let series: NumericSeries = serde_json::from_str(r#"[3, "4", true]"#).unwrap();
        assert_eq!(series.as_slice(), &[3.0, 4.0, 0.0]);
    }
}
