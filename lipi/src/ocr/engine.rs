use std::fmt;

use image::GrayImage;

use crate::config::parse_provider_model;
use crate::error::{LipiError, Result};

use super::decoder::RawImage;
use super::script::Script;

/// The three recognition backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    /// Hosted OCR service reached over HTTP.
    RemoteService,
    /// In-process CRNN/CTC line recognizer, one model per language.
    LocalNeural,
    /// In-process Tesseract, Latin only.
    LocalTraditional,
}

impl EngineKind {
    pub fn name(self) -> &'static str {
        match self {
            EngineKind::RemoteService => "remote-service",
            EngineKind::LocalNeural => "local-neural",
            EngineKind::LocalTraditional => "local-traditional",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which backend family the configured `model` selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineSelector {
    /// Neural for Indic scripts, Tesseract for Latin.
    Local,
    LocalNeural,
    LocalTraditional,
    Remote,
}

impl EngineSelector {
    pub fn from_model(model: &str) -> Self {
        let (provider, variant) = parse_provider_model(model);
        if provider.eq_ignore_ascii_case("ocrspace") {
            return EngineSelector::Remote;
        }
        match variant.to_lowercase().as_str() {
            "neural" | "crnn" => EngineSelector::LocalNeural,
            "tesseract" | "traditional" => EngineSelector::LocalTraditional,
            _ => EngineSelector::Local,
        }
    }

    pub fn engine_for(self, script: Script) -> Result<EngineKind> {
        match self {
            EngineSelector::Remote => Ok(EngineKind::RemoteService),
            EngineSelector::LocalNeural => Ok(EngineKind::LocalNeural),
            EngineSelector::Local if script.is_latin() => Ok(EngineKind::LocalTraditional),
            EngineSelector::Local => Ok(EngineKind::LocalNeural),
            EngineSelector::LocalTraditional if script.is_latin() => {
                Ok(EngineKind::LocalTraditional)
            }
            EngineSelector::LocalTraditional => Err(LipiError::UnsupportedScript(format!(
                "{script} is not readable by {}, which only handles Latin text",
                EngineKind::LocalTraditional
            ))),
        }
    }
}

/// One piece of recognized text, in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub confidence: Option<f32>,
}

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence: Some(confidence),
        }
    }
}

/// What a backend produced. An empty fragment list means no text was found,
/// which is not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub engine: EngineKind,
    pub fragments: Vec<Fragment>,
}

impl RecognitionResult {
    pub fn empty(engine: EngineKind) -> Self {
        Self {
            engine,
            fragments: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Input handed to a backend: the caller's original upload, the
/// preprocessed matrix, and the engine-specific language code.
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    pub engine: EngineKind,
    pub original: RawImage,
    pub processed: GrayImage,
    pub code: &'static str,
}

/// A loaded local recognizer. Reading blocks, so callers run it on the
/// blocking pool.
pub trait TextReader: Send + Sync {
    fn read(&self, image: &GrayImage) -> Result<Vec<Fragment>>;
}

/// Builds the reader for one language code.
pub type ReaderLoader = super::cache::Loader<dyn TextReader>;

/// Preprocessed images carry foreground as 255. Local recognizers are
/// trained on dark ink over light paper, so flip them back.
pub(crate) fn ink_on_paper(image: &GrayImage) -> GrayImage {
    let mut flipped = image.clone();
    image::imageops::invert(&mut flipped);
    flipped
}
