pub mod buffers;
pub mod builder;
pub mod colormap;
pub mod core;
pub mod render;
pub mod runtime;
pub mod wasm_api;

use thiserror::Error;

/// Failure kinds raised while decoding buffers or constructing a scene.
///
/// Construction either fully succeeds or returns the first of these wrapped in
/// an [`error_stack::Report`] carrying the object/buffer context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("missing buffer: {0}")]
    MissingBuffer(String),

    #[error("unsupported dtype: {0}")]
    UnsupportedDtype(String),

    #[error("{kind} object missing {role} buffer")]
    MissingGeometryInput { kind: String, role: String },

    #[error("surface_grid metadata missing grid shape")]
    MissingGridMetadata,

    #[error("unsupported object type: {0}")]
    UnsupportedObjectType(String),

    #[error("buffer {name}: {len} bytes is not a multiple of the {dtype} element size")]
    InvalidByteLength {
        name: String,
        dtype: String,
        len: usize,
    },

    #[error("positions buffer {0} does not hold xyz triples")]
    MalformedPositions(String),

    #[error("values buffer {key} has {values} entries for {vertices} vertices")]
    ValueCountMismatch {
        key: String,
        values: usize,
        vertices: usize,
    },

    #[error("faces buffer {0} is not a list of in-range vertex index triples")]
    InvalidFaces(String),

    #[error("surface grid {nu}x{nv} needs {} vertices, got {vertices}", nu * nv)]
    GridShapeMismatch {
        nu: usize,
        nv: usize,
        vertices: usize,
    },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

pub type Result<T> = std::result::Result<T, error_stack::Report<SceneError>>;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

pub mod prelude {
    pub use crate::buffers::*;
    pub use crate::builder::*;
    pub use crate::colormap::*;
    pub use crate::core::*;
    pub use crate::render::*;
    pub use crate::runtime::*;
    pub use crate::{Result, SceneError};
}
