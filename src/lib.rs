//! MaskPick — hover over an image to highlight precomputed masks, click to
//! keep them, export the result as PNG.
//!
//! The library holds everything except the window and the command line:
//! the resolution/compositing [`engine`], the mask [`service`] clients,
//! image [`io`], [`settings`] and the session [`logger`].

pub mod logger;

pub mod document;
pub mod engine;
pub mod error;
pub mod io;
pub mod service;
pub mod settings;

pub use document::ImageDocument;
pub use error::{Error, Result};
