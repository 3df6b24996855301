//! Texture encoding errors.

use thiserror::Error;

pub type TextureResult<T> = Result<T, TextureError>;

#[derive(Error, Debug)]
pub enum TextureError {
    /// Image could not be produced from the grid.
    #[error("texture encoding failed: {0}")]
    Encode(String),

    /// Encoded image could not be written.
    #[error("texture storage failed: {0}")]
    Storage(#[from] aq_common::AqError),
}

impl From<atmos_grid::GridError> for TextureError {
    fn from(err: atmos_grid::GridError) -> Self {
        TextureError::Encode(err.to_string())
    }
}
