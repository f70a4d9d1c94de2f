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

//! Equi-height histograms
//!
//! Construction runs in two steps. The [`sizer`] picks the smallest maximum
//! composite bucket size `K` for which a greedy pack fits in the requested
//! number of buckets, then the [`builder`] walks the value map once and emits
//! buckets no larger than `K`. A value whose own count exceeds `K` always
//! ends up alone in a singleton bucket, and once every remaining value can
//! have a bucket of its own the builder stops packing.
//!
//! Selectivity estimation binary searches the buckets and interpolates inside
//! the matching one with the value type's distance functions.

pub mod any;
pub mod bucket;
pub mod builder;
pub mod document;
pub mod equi_height;
pub mod error;
pub mod predicate;
pub mod sizer;

pub use any::AnyHistogram;
pub use bucket::Bucket;
pub use builder::estimate_ndv;
pub use document::MASS_TOLERANCE;
pub use equi_height::{EquiHeight, HISTOGRAM_TYPE, MAX_BUCKETS};
pub use error::{HistogramError, HistogramResult};
pub use predicate::{Comparison, Predicate};
pub use sizer::find_bucket_size;
