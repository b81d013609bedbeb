//! Script-aware OCR pipeline
//!
//! Turns an uploaded word image plus a declared script into plain text:
//!
//! 1. `ScriptRegistry` resolves the script to a preprocessing `Strategy` and
//!    per-engine language codes. Unknown scripts are rejected before any
//!    pixel work.
//! 2. `ImageDecoder` sniffs the format, decodes, and applies size limits.
//! 3. The `Strategy` produces a binary grayscale image tuned to the script.
//! 4. One recognition backend reads it:
//!    - `CrnnReader`: per-language ONNX line recognizer (Indic scripts)
//!    - `TesseractReader`: Latin text via leptess
//!    - `OcrSpaceClient`: the hosted OCR.space API
//! 5. `normalize` joins the fragments into the returned string.
//!
//! # Configuration
//!
//! Backend choice follows `OcrConfig::model` (see `config.rs`):
//! - `local`: neural reader for Indic scripts, Tesseract for Latin
//! - `local/neural`, `local/tesseract`: force one local engine
//! - `ocrspace`: remote service, requires `api_key`
//!
//! Local models load lazily, once per language code, and stay cached until
//! `OcrProvider::shutdown`.
//!
//! # Usage
//!
//! ```rust,ignore
//! let ocr = OcrProvider::new(&config.ocr)?;
//! let text = ocr.extract(&RawImage::new(bytes, "word.png", None), "Hindi").await?;
//! ```

mod api;
mod cache;
mod decoder;
mod engine;
mod neural;
mod normalize;
mod preprocessing;
mod provider;
mod registry;
mod script;
mod tesseract;

pub use api::{OcrSpaceClient, Upload, DEFAULT_ENDPOINT};
pub use cache::{Loader, ModelCache};
pub use decoder::{decode, encode_png, ImageDecoder, RawImage};
pub use engine::{
    EngineKind, EngineSelector, Fragment, RecognitionRequest, RecognitionResult, ReaderLoader,
    TextReader,
};
pub use neural::CrnnReader;
pub use normalize::normalize;
pub use preprocessing::Strategy;
pub use provider::OcrProvider;
pub use registry::{RegistryEntry, ScriptRegistry, LATIN_CODE};
pub use script::Script;
pub use tesseract::TesseractReader;
