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

use std::collections::TryReserveError;
use thiserror::Error;

/// Errors that can occur during histogram operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HistogramError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Allocation failure: {0}")]
    AllocationFailure(String),
    #[error("Malformed histogram document: {0}")]
    SerializationSchema(String),
    #[error("Histogram document violates invariant: {0}")]
    SerializationInvariant(String),
    #[error("Value out of range: {0}")]
    SerializationValueOutOfRange(String),
}

pub type HistogramResult<T> = Result<T, HistogramError>;

impl From<TryReserveError> for HistogramError {
    fn from(err: TryReserveError) -> Self {
        HistogramError::AllocationFailure(err.to_string())
    }
}

impl HistogramError {
    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        HistogramError::SerializationSchema(msg.into())
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        HistogramError::SerializationInvariant(msg.into())
    }

    pub(crate) fn out_of_range(msg: impl Into<String>) -> Self {
        HistogramError::SerializationValueOutOfRange(msg.into())
    }
}
