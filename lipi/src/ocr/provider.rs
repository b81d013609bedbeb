use std::sync::Arc;
use std::time::Duration;

use image::GrayImage;
use tracing::{debug, info, warn};

use crate::config::OcrConfig;
use crate::error::{LipiError, Result};

use super::api::{OcrSpaceClient, Upload};
use super::cache::ModelCache;
use super::decoder::{encode_png, ImageDecoder, RawImage};
use super::engine::{
    EngineKind, EngineSelector, Fragment, RecognitionRequest, RecognitionResult, ReaderLoader,
    TextReader,
};
use super::normalize::normalize;
use super::registry::{RegistryEntry, ScriptRegistry};
use super::{neural, tesseract};

type ReaderCache = Arc<ModelCache<dyn TextReader>>;

#[derive(Clone)]
enum OcrBackend {
    Local {
        neural: ReaderCache,
        traditional: ReaderCache,
    },
    Remote {
        client: OcrSpaceClient,
    },
    Unavailable {
        reason: String,
    },
}

/// Entry point of the extraction pipeline.
///
/// Clones share the same loaded models and HTTP client.
#[derive(Clone)]
pub struct OcrProvider {
    backend: OcrBackend,
    selector: EngineSelector,
    decoder: ImageDecoder,
    config: OcrConfig,
}

impl OcrProvider {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let selector = EngineSelector::from_model(&config.model);

        let backend = match selector {
            EngineSelector::Remote => match OcrSpaceClient::new(config) {
                Ok(client) => OcrBackend::Remote { client },
                Err(e) => {
                    let reason = format!("OCR.space backend unavailable: {e}");
                    warn!("{}", reason);
                    OcrBackend::Unavailable { reason }
                }
            },
            _ => {
                info!(
                    model = %config.model,
                    model_dir = %config.model_dir,
                    "Local OCR backend initialized; models load on first use"
                );
                Self::local_backend(
                    neural::loader(config.model_dir.clone()),
                    tesseract::loader(),
                )
            }
        };

        Ok(Self {
            backend,
            selector,
            decoder: ImageDecoder::from_config(config),
            config: config.clone(),
        })
    }

    /// Local provider whose readers come from the given loaders instead of
    /// model files. A remote `model` selection is treated as `local`.
    pub fn with_reader_loaders(
        config: &OcrConfig,
        neural: ReaderLoader,
        traditional: ReaderLoader,
    ) -> Self {
        let selector = match EngineSelector::from_model(&config.model) {
            EngineSelector::Remote => EngineSelector::Local,
            other => other,
        };

        Self {
            backend: Self::local_backend(neural, traditional),
            selector,
            decoder: ImageDecoder::from_config(config),
            config: config.clone(),
        }
    }

    fn local_backend(neural: ReaderLoader, traditional: ReaderLoader) -> OcrBackend {
        OcrBackend::Local {
            neural: Arc::new(ModelCache::new(EngineKind::LocalNeural, neural)),
            traditional: Arc::new(ModelCache::new(EngineKind::LocalTraditional, traditional)),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }

    pub fn selector(&self) -> EngineSelector {
        self.selector
    }

    /// Extract text from `image` written in `script`.
    ///
    /// Returns an empty string when the image holds no recognizable text.
    pub async fn extract(&self, image: &RawImage, script: &str) -> Result<String> {
        let timeout_duration = Duration::from_secs(self.config.timeout_secs);

        match tokio::time::timeout(timeout_duration, self.extract_internal(image, script)).await {
            Ok(inner_result) => inner_result,
            Err(_) => {
                warn!(script, timeout_secs = self.config.timeout_secs, "OCR timed out");
                Err(LipiError::Timeout(self.config.timeout_secs))
            }
        }
    }

    async fn extract_internal(&self, image: &RawImage, script: &str) -> Result<String> {
        let registry = ScriptRegistry::global();
        let entry = registry.lookup_name(script)?;
        let engine = self.selector.engine_for(entry.script)?;

        if let OcrBackend::Unavailable { reason } = &self.backend {
            return Err(LipiError::unavailable(engine, reason.clone()));
        }

        let processed = self
            .run_strategy(image, entry)
            .await
            .map_err(|e| e.in_context(entry.script, engine))?;

        // The code comes from the registry itself, so this only fails if an
        // entry's codes and the engine vocabulary fall out of step.
        let code = entry.engine_code(engine);
        registry.validate_code(engine, code)?;

        let result = self
            .recognize(RecognitionRequest {
                engine,
                original: image.clone(),
                processed,
                code,
            })
            .await?;

        let text = normalize(&result.fragments);
        info!(
            script = %entry.script,
            engine = %engine,
            fragments = result.fragments.len(),
            chars = text.chars().count(),
            "Extraction complete"
        );
        Ok(text)
    }

    /// Decode and enhance `image` exactly as `extract` would, without
    /// recognizing it.
    pub async fn preprocess(&self, image: &RawImage, script: &str) -> Result<GrayImage> {
        let entry = ScriptRegistry::global().lookup_name(script)?;
        let processed = self.run_strategy(image, entry).await;
        match self.selector.engine_for(entry.script) {
            Ok(engine) => processed.map_err(|e| e.in_context(entry.script, engine)),
            Err(_) => processed,
        }
    }

    async fn run_strategy(&self, image: &RawImage, entry: RegistryEntry) -> Result<GrayImage> {
        let decoder = self.decoder;
        let raw = image.clone();
        let strategy = entry.strategy;

        let processed = tokio::task::spawn_blocking(move || {
            let decoded = decoder.decode(raw.bytes())?;
            Ok::<_, LipiError>(strategy.apply(&decoded))
        })
        .await
        .map_err(|e| LipiError::InvalidImage(format!("preprocessing task panicked: {e}")))??;

        debug!(
            strategy = strategy.name(),
            width = processed.width(),
            height = processed.height(),
            "Preprocessed image"
        );
        Ok(processed)
    }

    async fn recognize(&self, request: RecognitionRequest) -> Result<RecognitionResult> {
        let engine = request.engine;
        let fragments = match (&self.backend, engine) {
            (OcrBackend::Remote { client }, EngineKind::RemoteService) => {
                let upload = if self.config.upload_preprocessed {
                    Upload {
                        bytes: encode_png(&request.processed)?,
                        file_name: "preprocessed.png".to_string(),
                        mime_type: "image/png".to_string(),
                    }
                } else {
                    Upload {
                        bytes: request.original.bytes().to_vec(),
                        file_name: request.original.file_name().to_string(),
                        mime_type: request.original.mime_type().to_string(),
                    }
                };
                client.recognize(upload, request.code).await?
            }
            (OcrBackend::Local { neural, .. }, EngineKind::LocalNeural) => {
                read_local(neural, request).await?
            }
            (OcrBackend::Local { traditional, .. }, EngineKind::LocalTraditional) => {
                read_local(traditional, request).await?
            }
            (OcrBackend::Unavailable { reason }, _) => {
                return Err(LipiError::unavailable(engine, reason.clone()))
            }
            _ => {
                return Err(LipiError::unavailable(
                    engine,
                    "engine is not part of the configured backend",
                ))
            }
        };

        Ok(RecognitionResult { engine, fragments })
    }

    /// Load the reader for `script` ahead of the first extraction.
    pub async fn warm_up(&self, script: &str) -> Result<()> {
        let entry = ScriptRegistry::global().lookup_name(script)?;
        let engine = self.selector.engine_for(entry.script)?;
        let code = entry.engine_code(engine);

        match (&self.backend, engine) {
            (OcrBackend::Local { neural, .. }, EngineKind::LocalNeural) => {
                neural.get(code).await.map(|_| ())
            }
            (OcrBackend::Local { traditional, .. }, EngineKind::LocalTraditional) => {
                traditional.get(code).await.map(|_| ())
            }
            (OcrBackend::Unavailable { reason }, _) => {
                Err(LipiError::unavailable(engine, reason.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Release every loaded local model.
    pub fn shutdown(&self) {
        if let OcrBackend::Local {
            neural,
            traditional,
        } = &self.backend
        {
            neural.clear();
            traditional.clear();
        }
        info!("OCR provider shut down");
    }
}

async fn read_local(
    cache: &ModelCache<dyn TextReader>,
    request: RecognitionRequest,
) -> Result<Vec<Fragment>> {
    let engine = cache.engine();
    let reader = cache.get(request.code).await?;

    tokio::task::spawn_blocking(move || reader.read(&request.processed))
        .await
        .map_err(|e| LipiError::ocr(engine, format!("OCR task panicked: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(model: &str, api_key: Option<&str>) -> OcrConfig {
        OcrConfig {
            model: model.to_string(),
            api_key: api_key.map(String::from),
            base_url: None,
            model_dir: "models".to_string(),
            timeout_secs: 60,
            max_image_dimension: 4096,
            min_image_dimension: 8,
            upload_preprocessed: false,
        }
    }

    fn unavailable_provider() -> OcrProvider {
        let config = make_config("ocrspace", None);
        OcrProvider {
            backend: OcrBackend::Unavailable {
                reason: "Test unavailable".to_string(),
            },
            selector: EngineSelector::Remote,
            decoder: ImageDecoder::from_config(&config),
            config,
        }
    }

    #[test]
    fn test_ocrspace_without_api_key_falls_back_to_unavailable() {
        let provider = OcrProvider::new(&make_config("ocrspace", None)).unwrap();
        assert!(!provider.is_available());
    }

    #[test]
    fn test_ocrspace_with_api_key_is_available() {
        let provider = OcrProvider::new(&make_config("ocrspace", Some("k"))).unwrap();
        assert!(provider.is_available());
        assert_eq!(provider.selector(), EngineSelector::Remote);
    }

    #[test]
    fn test_local_provider_defers_model_loading() {
        let provider = OcrProvider::new(&make_config("local", None)).unwrap();
        assert!(provider.is_available());
        assert_eq!(provider.selector(), EngineSelector::Local);
    }

    #[tokio::test]
    async fn test_unavailable_returns_error() {
        let provider = unavailable_provider();
        let result = provider.extract(&RawImage::from_bytes(vec![1u8]), "Hindi").await;
        assert!(matches!(
            result,
            Err(LipiError::EngineUnavailable {
                engine: EngineKind::RemoteService,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_unknown_script_wins_over_unavailable_backend() {
        let provider = unavailable_provider();
        let result = provider.extract(&RawImage::from_bytes(vec![1u8]), "Klingon").await;
        assert!(matches!(result, Err(LipiError::UnsupportedScript(_))));
    }

    #[tokio::test]
    async fn test_tesseract_only_rejects_indic_script_before_decoding() {
        let provider = OcrProvider::new(&make_config("local/tesseract", None)).unwrap();
        let result = provider.extract(&RawImage::from_bytes(Vec::new()), "Kannada").await;
        assert!(matches!(result, Err(LipiError::UnsupportedScript(_))));
    }

    #[tokio::test]
    async fn test_missing_neural_model_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = make_config("local", None);
        config.model_dir = dir.path().display().to_string();
        let provider = OcrProvider::new(&config).unwrap();

        let err = provider.warm_up("Tamil").await.unwrap_err();
        assert!(matches!(
            err,
            LipiError::EngineUnavailable {
                engine: EngineKind::LocalNeural,
                ..
            }
        ));
    }

    #[test]
    fn test_provider_clone() {
        let provider = OcrProvider::new(&make_config("ocrspace", None)).unwrap();
        let cloned = provider.clone();
        assert_eq!(provider.is_available(), cloned.is_available());
    }
}
