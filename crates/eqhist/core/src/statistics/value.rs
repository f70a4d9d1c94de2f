// Eqhist
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Typed value domains a histogram can be built over.
//!
//! Every domain supplies a total order, a pair of distance functions used to
//! interpolate inside a bucket, and a JSON endpoint encoding.

use base64::{Engine as _, engine::general_purpose};
use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::histogram::{HistogramError, HistogramResult};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const DATETIME_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";
const BYTES_PREFIX: &str = "base64:type254:";

/// Data type discriminator carried by histograms and their documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int,
    Uint,
    Double,
    String,
    Bytes,
    Date,
    Datetime,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Uint => "uint",
            DataType::Double => "double",
            DataType::String => "string",
            DataType::Bytes => "bytes",
            DataType::Date => "date",
            DataType::Datetime => "datetime",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = HistogramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(DataType::Int),
            "uint" => Ok(DataType::Uint),
            "double" => Ok(DataType::Double),
            "string" => Ok(DataType::String),
            "bytes" => Ok(DataType::Bytes),
            "date" => Ok(DataType::Date),
            "datetime" => Ok(DataType::Datetime),
            other => Err(HistogramError::schema(format!("unknown data type '{other}'"))),
        }
    }
}

/// A value type that histograms can be built over.
///
/// `compare` must be a total order and must be the same comparator used at
/// build time and at probe time. `distance_below(lo, hi, v)` is the fraction
/// of `[lo, hi]` strictly below `v`, `distance_above` the fraction strictly
/// above it. Both return values in `[0, 1]` and are monotone in `v`.
pub trait HistogramValue: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    fn compare(&self, other: &Self) -> Ordering;

    fn distance_below(lo: &Self, hi: &Self, value: &Self) -> f64;

    fn distance_above(lo: &Self, hi: &Self, value: &Self) -> f64;

    /// Encodes the value as a histogram document endpoint.
    fn to_json(&self) -> Value;

    /// Decodes a histogram document endpoint.
    fn from_json(value: &Value) -> HistogramResult<Self>;

    /// Parses a textual literal, as typed on a command line.
    fn parse_literal(literal: &str) -> HistogramResult<Self>;

    /// Rejects values that have no document endpoint form.
    fn check_domain(&self) -> Result<(), String> {
        Ok(())
    }

    fn value_eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }

    fn value_lt(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Less
    }
}

fn unit(x: f64) -> f64 {
    if x.is_nan() { 0.5 } else { x.clamp(0.0, 1.0) }
}

/// Position inside a discrete closed interval holding `hi - lo + 1` points.
fn discrete_fraction(lo: i128, hi: i128, value: i128, below: bool) -> f64 {
    if hi < lo {
        return 0.0;
    }
    let points = (hi - lo) as f64 + 1.0;
    let n = if below { value - lo } else { hi - value };
    unit(n as f64 / points)
}

fn continuous_fraction(lo: f64, hi: f64, value: f64, below: bool) -> f64 {
    let width = hi - lo;
    if !(width > 0.0) {
        return 0.0;
    }
    let n = if below { value - lo } else { hi - value };
    unit(n / width)
}

/// First eight bytes as a big-endian integer, zero padded.
fn prefix_key(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let len = bytes.len().min(8);
    buf[..len].copy_from_slice(&bytes[..len]);
    u64::from_be_bytes(buf)
}

fn prefix_fraction(lo: &[u8], hi: &[u8], value: &[u8], below: bool) -> f64 {
    let (lo_key, hi_key) = (prefix_key(lo), prefix_key(hi));
    if hi_key <= lo_key {
        // Endpoints share a prefix; only the endpoints themselves are placed exactly.
        let position = if value <= lo {
            0.0
        } else if value >= hi {
            1.0
        } else {
            0.5
        };
        return if below { position } else { 1.0 - position };
    }
    let (lo, hi, value) = (lo_key, hi_key, prefix_key(value));
    let width = (hi - lo) as f64;
    let n = if below { value.saturating_sub(lo) } else { hi.saturating_sub(value) };
    unit(n as f64 / width)
}

fn expect_str<'a>(value: &'a Value, data_type: DataType) -> HistogramResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| HistogramError::schema(format!("expected a string endpoint for {data_type}, got {value}")))
}

fn invalid_literal(literal: &str, data_type: DataType) -> HistogramError {
    HistogramError::InvalidInput(format!("'{literal}' is not a valid {data_type} literal"))
}

impl HistogramValue for i64 {
    const DATA_TYPE: DataType = DataType::Int;

    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn distance_below(lo: &Self, hi: &Self, value: &Self) -> f64 {
        discrete_fraction(*lo as i128, *hi as i128, *value as i128, true)
    }

    fn distance_above(lo: &Self, hi: &Self, value: &Self) -> f64 {
        discrete_fraction(*lo as i128, *hi as i128, *value as i128, false)
    }

    fn to_json(&self) -> Value {
        Value::from(*self)
    }

    fn from_json(value: &Value) -> HistogramResult<Self> {
        match value {
            Value::Number(n) => n.as_i64().ok_or_else(|| HistogramError::out_of_range(format!("{n} does not fit a signed 64-bit integer"))),
            other => Err(HistogramError::schema(format!("expected an integer endpoint, got {other}"))),
        }
    }

    fn parse_literal(literal: &str) -> HistogramResult<Self> {
        literal.trim().parse().map_err(|_| invalid_literal(literal, Self::DATA_TYPE))
    }
}

impl HistogramValue for u64 {
    const DATA_TYPE: DataType = DataType::Uint;

    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn distance_below(lo: &Self, hi: &Self, value: &Self) -> f64 {
        discrete_fraction(*lo as i128, *hi as i128, *value as i128, true)
    }

    fn distance_above(lo: &Self, hi: &Self, value: &Self) -> f64 {
        discrete_fraction(*lo as i128, *hi as i128, *value as i128, false)
    }

    fn to_json(&self) -> Value {
        Value::from(*self)
    }

    fn from_json(value: &Value) -> HistogramResult<Self> {
        match value {
            Value::Number(n) => n.as_u64().ok_or_else(|| HistogramError::out_of_range(format!("{n} does not fit an unsigned 64-bit integer"))),
            other => Err(HistogramError::schema(format!("expected an integer endpoint, got {other}"))),
        }
    }

    fn parse_literal(literal: &str) -> HistogramResult<Self> {
        literal.trim().parse().map_err(|_| invalid_literal(literal, Self::DATA_TYPE))
    }
}

impl HistogramValue for f64 {
    const DATA_TYPE: DataType = DataType::Double;

    fn compare(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }

    fn distance_below(lo: &Self, hi: &Self, value: &Self) -> f64 {
        continuous_fraction(*lo, *hi, *value, true)
    }

    fn distance_above(lo: &Self, hi: &Self, value: &Self) -> f64 {
        continuous_fraction(*lo, *hi, *value, false)
    }

    fn to_json(&self) -> Value {
        // Non-finite doubles never reach a histogram, see `check_domain`.
        serde_json::Number::from_f64(*self).map(Value::Number).unwrap_or(Value::Null)
    }

    fn from_json(value: &Value) -> HistogramResult<Self> {
        match value {
            Value::Number(n) => match n.as_f64() {
                Some(v) if v.is_finite() => Ok(v),
                _ => Err(HistogramError::out_of_range(format!("{n} is not a finite double"))),
            },
            Value::Null => Err(HistogramError::out_of_range("non-finite double endpoint")),
            other => Err(HistogramError::schema(format!("expected a numeric endpoint, got {other}"))),
        }
    }

    fn parse_literal(literal: &str) -> HistogramResult<Self> {
        let value: f64 = literal.trim().parse().map_err(|_| invalid_literal(literal, Self::DATA_TYPE))?;
        value.check_domain().map_err(HistogramError::out_of_range)?;
        Ok(value)
    }

    fn check_domain(&self) -> Result<(), String> {
        if self.is_finite() { Ok(()) } else { Err(format!("{self} is not a finite double")) }
    }
}

impl HistogramValue for String {
    const DATA_TYPE: DataType = DataType::String;

    fn compare(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }

    fn distance_below(lo: &Self, hi: &Self, value: &Self) -> f64 {
        prefix_fraction(lo.as_bytes(), hi.as_bytes(), value.as_bytes(), true)
    }

    fn distance_above(lo: &Self, hi: &Self, value: &Self) -> f64 {
        prefix_fraction(lo.as_bytes(), hi.as_bytes(), value.as_bytes(), false)
    }

    fn to_json(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_json(value: &Value) -> HistogramResult<Self> {
        expect_str(value, Self::DATA_TYPE).map(str::to_string)
    }

    fn parse_literal(literal: &str) -> HistogramResult<Self> {
        Ok(literal.to_string())
    }
}

impl HistogramValue for Vec<u8> {
    const DATA_TYPE: DataType = DataType::Bytes;

    fn compare(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }

    fn distance_below(lo: &Self, hi: &Self, value: &Self) -> f64 {
        prefix_fraction(lo, hi, value, true)
    }

    fn distance_above(lo: &Self, hi: &Self, value: &Self) -> f64 {
        prefix_fraction(lo, hi, value, false)
    }

    fn to_json(&self) -> Value {
        Value::String(format!("{BYTES_PREFIX}{}", general_purpose::STANDARD.encode(self)))
    }

    fn from_json(value: &Value) -> HistogramResult<Self> {
        let s = expect_str(value, Self::DATA_TYPE)?;
        let encoded = s
            .strip_prefix("base64:type")
            .and_then(|rest| rest.split_once(':'))
            .map(|(_, payload)| payload)
            .ok_or_else(|| HistogramError::schema(format!("binary endpoint '{s}' lacks a base64 prefix")))?;
        general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| HistogramError::out_of_range(format!("invalid base64 endpoint: {e}")))
    }

    fn parse_literal(literal: &str) -> HistogramResult<Self> {
        if literal.starts_with("base64:") {
            Self::from_json(&Value::String(literal.to_string())).map_err(|_| invalid_literal(literal, Self::DATA_TYPE))
        } else {
            Ok(literal.as_bytes().to_vec())
        }
    }
}

impl HistogramValue for NaiveDateTime {
    const DATA_TYPE: DataType = DataType::Datetime;

    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn distance_below(lo: &Self, hi: &Self, value: &Self) -> f64 {
        discrete_fraction(micros(lo), micros(hi), micros(value), true)
    }

    fn distance_above(lo: &Self, hi: &Self, value: &Self) -> f64 {
        discrete_fraction(micros(lo), micros(hi), micros(value), false)
    }

    fn to_json(&self) -> Value {
        Value::String(self.format(DATETIME_FORMAT).to_string())
    }

    fn from_json(value: &Value) -> HistogramResult<Self> {
        let s = expect_str(value, Self::DATA_TYPE)?;
        NaiveDateTime::parse_from_str(s, DATETIME_PARSE_FORMAT).map_err(|e| HistogramError::out_of_range(format!("'{s}' is not a valid datetime: {e}")))
    }

    fn parse_literal(literal: &str) -> HistogramResult<Self> {
        let literal = literal.trim();
        NaiveDateTime::parse_from_str(literal, DATETIME_PARSE_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(literal, "%Y-%m-%dT%H:%M:%S%.f"))
            .map_err(|_| invalid_literal(literal, Self::DATA_TYPE))
    }
}

fn micros(value: &NaiveDateTime) -> i128 {
    value.and_utc().timestamp_micros() as i128
}

impl HistogramValue for NaiveDate {
    const DATA_TYPE: DataType = DataType::Date;

    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn distance_below(lo: &Self, hi: &Self, value: &Self) -> f64 {
        discrete_fraction(days(lo), days(hi), days(value), true)
    }

    fn distance_above(lo: &Self, hi: &Self, value: &Self) -> f64 {
        discrete_fraction(days(lo), days(hi), days(value), false)
    }

    fn to_json(&self) -> Value {
        Value::String(self.format(DATE_FORMAT).to_string())
    }

    fn from_json(value: &Value) -> HistogramResult<Self> {
        let s = expect_str(value, Self::DATA_TYPE)?;
        NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| HistogramError::out_of_range(format!("'{s}' is not a valid date: {e}")))
    }

    fn parse_literal(literal: &str) -> HistogramResult<Self> {
        NaiveDate::parse_from_str(literal.trim(), DATE_FORMAT).map_err(|_| invalid_literal(literal, Self::DATA_TYPE))
    }
}

fn days(value: &NaiveDate) -> i128 {
    use chrono::Datelike;
    value.num_days_from_ce() as i128
}
