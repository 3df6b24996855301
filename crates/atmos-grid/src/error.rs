//! Error types for atmospheric grids.

use thiserror::Error;

use crate::fields::GridField;

pub type GridResult<T> = Result<T, GridError>;

#[derive(Error, Debug)]
pub enum GridError {
    /// The raw file could not be decoded.
    #[error("failed to decode grid: {0}")]
    Decode(String),

    /// The two source grids disagree on an axis.
    #[error("axis mismatch on {axis}: {detail}")]
    AxisMismatch { axis: &'static str, detail: String },

    /// A field required to build the grid is absent.
    #[error("missing field {field} {detail}")]
    MissingField { field: GridField, detail: String },

    /// A field was requested that the grid does not carry.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Value buffer length does not match the declared axes.
    #[error("shape error: {0}")]
    Shape(String),
}
