//! Script-aware OCR for photographed or scanned words.
//!
//! Given image bytes and a declared script, `lipi` picks a script-tuned
//! preprocessing strategy, runs a recognition backend and returns the
//! extracted text. See [`ocr::OcrProvider`] for the entry point.

pub mod config;
pub mod error;
pub mod ocr;

pub use error::{LipiError, Result};
pub use ocr::{OcrProvider, RawImage, Script};
