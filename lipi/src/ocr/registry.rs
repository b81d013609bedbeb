use crate::error::{LipiError, Result};

use super::engine::EngineKind;
use super::preprocessing::Strategy;
use super::script::Script;

/// Language code the traditional engine always runs with.
pub const LATIN_CODE: &str = "eng";

/// Everything the pipeline needs to know about one script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryEntry {
    pub script: Script,
    pub strategy: Strategy,
    /// ISO 639-1 code naming the neural reader's model directory.
    pub neural_code: &'static str,
    /// ISO 639-2 code understood by the OCR service.
    pub service_code: &'static str,
}

impl RegistryEntry {
    pub fn engine_code(&self, engine: EngineKind) -> &'static str {
        match engine {
            EngineKind::LocalNeural => self.neural_code,
            EngineKind::LocalTraditional => LATIN_CODE,
            EngineKind::RemoteService => self.service_code,
        }
    }
}

/// Process-wide, read-only mapping from script to strategy and engine codes.
#[derive(Debug)]
pub struct ScriptRegistry {
    _sealed: (),
}

static REGISTRY: ScriptRegistry = ScriptRegistry { _sealed: () };

impl ScriptRegistry {
    pub fn global() -> &'static ScriptRegistry {
        &REGISTRY
    }

    pub fn lookup(&self, script: Script) -> RegistryEntry {
        let (strategy, neural_code, service_code) = match script {
            Script::Hindi => (Strategy::Devanagari, "hi", "hin"),
            Script::Marathi => (Strategy::Devanagari, "mr", "mar"),
            Script::Tamil => (Strategy::Tamil, "ta", "tam"),
            Script::Malayalam => (Strategy::Malayalam, "ml", "mal"),
            Script::Kannada => (Strategy::Kannada, "kn", "kan"),
            Script::Telugu => (Strategy::Telugu, "te", "tel"),
            Script::Bengali => (Strategy::Bengali, "bn", "ben"),
            Script::Odia => (Strategy::Odia, "or", "ori"),
            Script::Punjabi => (Strategy::Punjabi, "pa", "pan"),
            Script::Gujarati => (Strategy::Gujarati, "gu", "guj"),
            Script::Generic => (Strategy::Generic, "en", LATIN_CODE),
        };

        RegistryEntry {
            script,
            strategy,
            neural_code,
            service_code,
        }
    }

    /// Look up a script by the name a user selected.
    pub fn lookup_name(&self, name: &str) -> Result<RegistryEntry> {
        let script = name.parse::<Script>()?;
        Ok(self.lookup(script))
    }

    pub fn entries(&self) -> impl Iterator<Item = RegistryEntry> + '_ {
        Script::ALL.into_iter().map(move |script| self.lookup(script))
    }

    /// Reject a language code outside the engine's vocabulary before dispatch.
    pub fn validate_code(&self, engine: EngineKind, code: &str) -> Result<()> {
        if self.entries().any(|entry| entry.engine_code(engine) == code) {
            Ok(())
        } else {
            Err(LipiError::UnsupportedScript(format!(
                "language code '{code}' is not known to {engine}"
            )))
        }
    }
}
