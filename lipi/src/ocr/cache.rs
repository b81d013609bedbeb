use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{LipiError, Result};

use super::engine::EngineKind;

/// Constructs the model for one language code. Runs on the blocking pool.
pub type Loader<M> = Arc<dyn Fn(&str) -> Result<Arc<M>> + Send + Sync>;

type Slot<M> = Arc<OnceCell<Arc<M>>>;

/// Lazily built, shared models keyed by language code.
///
/// Concurrent first requests for the same code wait on a single
/// construction; different codes load independently. A failed load leaves
/// its slot empty so the next request tries again.
pub struct ModelCache<M: ?Sized> {
    engine: EngineKind,
    loader: Loader<M>,
    slots: Mutex<HashMap<String, Slot<M>>>,
}

impl<M> ModelCache<M>
where
    M: ?Sized + Send + Sync + 'static,
{
    pub fn new(engine: EngineKind, loader: Loader<M>) -> Self {
        Self {
            engine,
            loader,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    fn slot(&self, code: &str) -> Slot<M> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(code.to_string()).or_default())
    }

    pub async fn get(&self, code: &str) -> Result<Arc<M>> {
        let slot = self.slot(code);

        let model = slot
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                let owned_code = code.to_string();
                info!(engine = %self.engine, code, "Loading recognition model");

                let loaded = tokio::task::spawn_blocking(move || loader(&owned_code))
                    .await
                    .map_err(|e| {
                        LipiError::unavailable(self.engine, format!("model load task failed: {e}"))
                    })?;

                match &loaded {
                    Ok(_) => info!(engine = %self.engine, code, "Recognition model ready"),
                    Err(e) => warn!(engine = %self.engine, code, error = %e, "Model load failed"),
                }
                loaded
            })
            .await?;

        debug!(engine = %self.engine, code, "Model resolved");
        Ok(Arc::clone(model))
    }

    /// Codes whose model finished loading, sorted.
    pub fn loaded_codes(&self) -> Vec<String> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let mut codes: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(code, _)| code.clone())
            .collect();
        codes.sort();
        codes
    }

    /// Drop every loaded model. Requests already holding a model keep it
    /// until they finish.
    pub fn clear(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let dropped = slots.len();
        slots.clear();
        info!(engine = %self.engine, dropped, "Model cache cleared");
    }
}

impl<M: ?Sized> std::fmt::Debug for ModelCache<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
