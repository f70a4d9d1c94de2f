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

use std::fmt;
use std::str::FromStr;

use super::equi_height::EquiHeight;
use super::error::HistogramError;
use crate::statistics::value::HistogramValue;

/// A single-column predicate whose selectivity a histogram can estimate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate<T> {
    Eq(T),
    Ne(T),
    Lt(T),
    Le(T),
    Gt(T),
    Ge(T),
    Between(T, T),
    NotBetween(T, T),
    In(Vec<T>),
    NotIn(Vec<T>),
    IsNull,
    IsNotNull,
}

/// Comparison operator with a single operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn with<T>(self, value: T) -> Predicate<T> {
        match self {
            Comparison::Eq => Predicate::Eq(value),
            Comparison::Ne => Predicate::Ne(value),
            Comparison::Lt => Predicate::Lt(value),
            Comparison::Le => Predicate::Le(value),
            Comparison::Gt => Predicate::Gt(value),
            Comparison::Ge => Predicate::Ge(value),
        }
    }
}

impl FromStr for Comparison {
    type Err = HistogramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" | "=" => Ok(Comparison::Eq),
            "ne" | "!=" | "<>" => Ok(Comparison::Ne),
            "lt" | "<" => Ok(Comparison::Lt),
            "le" | "<=" => Ok(Comparison::Le),
            "gt" | ">" => Ok(Comparison::Gt),
            "ge" | ">=" => Ok(Comparison::Ge),
            other => Err(HistogramError::InvalidInput(format!("unknown comparison operator '{other}'"))),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Comparison::Eq => "=",
            Comparison::Ne => "<>",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        };
        f.write_str(symbol)
    }
}

impl<T: HistogramValue> EquiHeight<T> {
    /// Estimated fraction of all rows, nulls included, satisfying `predicate`.
    pub fn selectivity(&self, predicate: &Predicate<T>) -> f64 {
        match predicate {
            Predicate::Eq(v) => self.equal_to(v),
            Predicate::Ne(v) => self.not_equal_to(v),
            Predicate::Lt(v) => self.less_than(v),
            Predicate::Le(v) => self.less_than_or_equal(v),
            Predicate::Gt(v) => self.greater_than(v),
            Predicate::Ge(v) => self.greater_than_or_equal(v),
            Predicate::Between(lo, hi) => self.between(lo, hi),
            Predicate::NotBetween(lo, hi) => self.not_between(lo, hi),
            Predicate::In(values) => self.in_list(values),
            Predicate::NotIn(values) => self.not_in_list(values),
            Predicate::IsNull => self.is_null(),
            Predicate::IsNotNull => self.is_not_null(),
        }
    }
}
