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

//! Column Statistics
//!
//! Equi-height histograms for cost-based selectivity estimation.
//!
//! # Core Components
//!
//! ## Value Maps
//! - Ordered `(value, count)` pairs drawn from a (possibly sampled) column
//! - Null observations and the sampling rate travel with the map
//!
//! ## Histogram Construction
//! - Bucket sizing by binary search over the maximum composite bucket size
//! - Greedy single-pass bucket packing with heavy values kept as singletons
//! - Guaranteed-Error Estimator for distinct values under sampling
//!
//! ## Selectivity Estimation
//! - `=`, `<>`, `<`, `<=`, `>`, `>=`, `BETWEEN`, `IN` and null tests
//! - Results bounded to the non-null fraction of the column
//!
//! ## Persistence
//! - JSON histogram documents with full invariant checking
//! - Compact binary form for trusted round trips
//!
//! # Usage
//!
//! ```rust
//! use eqhist_core::statistics::{EquiHeight, ValueMap};
//!
//! let values = ValueMap::from_sorted(vec![(1i64, 1), (2, 1), (3, 97), (4, 1)], 0, 1.0).unwrap();
//! let histogram = EquiHeight::build(&values, 4).unwrap();
//!
//! assert!((histogram.equal_to(&3) - 0.97).abs() < 1e-9);
//! assert!((histogram.less_than(&3) - 0.02).abs() < 1e-9);
//!
//! let doc = histogram.to_document();
//! let restored = EquiHeight::<i64>::from_document(&doc, false).unwrap();
//! assert_eq!(restored, histogram);
//! ```

pub mod collector;
pub mod histogram;
pub mod value;
pub mod value_map;

// Re-export commonly used types
pub use collector::{StatisticsCollector, StatisticsConfig, StatisticsError, StatisticsResult};
pub use histogram::{AnyHistogram, Bucket, Comparison, EquiHeight, HistogramError, HistogramResult, Predicate};
pub use value::{DataType, HistogramValue};
pub use value_map::ValueMap;
