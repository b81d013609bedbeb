use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Backend selector: `local`, `local/neural`, `local/tesseract` or `ocrspace`.
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// Root of the per-language recognizer models (`<model_dir>/<code>/rec.onnx`).
    pub model_dir: String,
    pub timeout_secs: u64,
    pub max_image_dimension: u32,
    pub min_image_dimension: u32,
    /// Send the preprocessed PNG to the remote service instead of the original upload.
    pub upload_preprocessed: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model: "local".to_string(),
            api_key: None,
            base_url: None,
            model_dir: "models".to_string(),
            timeout_secs: 30,
            max_image_dimension: 4096,
            min_image_dimension: 8,
            upload_preprocessed: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let defaults = OcrConfig::default();

        Self {
            ocr: OcrConfig {
                model: env::var("OCR_MODEL").unwrap_or(defaults.model),
                api_key: env::var("OCR_API_KEY").ok().filter(|k| !k.is_empty()),
                base_url: env::var("OCR_BASE_URL").ok(),
                model_dir: env::var("OCR_MODEL_DIR").unwrap_or(defaults.model_dir),
                timeout_secs: parse_env_or("OCR_TIMEOUT", defaults.timeout_secs),
                max_image_dimension: parse_env_or(
                    "OCR_MAX_DIMENSION",
                    defaults.max_image_dimension,
                ),
                min_image_dimension: parse_env_or(
                    "OCR_MIN_DIMENSION",
                    defaults.min_image_dimension,
                ),
                upload_preprocessed: parse_env_or(
                    "OCR_UPLOAD_PREPROCESSED",
                    defaults.upload_preprocessed,
                ),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known OCR backend providers
const KNOWN_PROVIDERS: &[&str] = &["local", "ocrspace"];

/// Parse a backend selector into (provider, variant) tuple.
pub fn parse_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    if KNOWN_PROVIDERS.contains(&model.to_lowercase().as_str()) {
        return (model, "");
    }
    // Default to a local variant
    ("local", model)
}
