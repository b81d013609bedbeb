use std::sync::Arc;

use image::GrayImage;
use leptess::{LepTess, Variable};
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{LipiError, Result};

use super::decoder::encode_png;
use super::engine::{ink_on_paper, EngineKind, Fragment, ReaderLoader, TextReader};

const ENGINE: EngineKind = EngineKind::LocalTraditional;

/// Page segmentation mode 7: treat the image as a single text line.
const SINGLE_LINE_PSM: &str = "7";

/// Tesseract handle for one language. The handle is not thread-safe, so
/// each reader serializes its own calls.
pub struct TesseractReader {
    tesseract: Mutex<LepTess>,
}

pub fn loader() -> ReaderLoader {
    Arc::new(|code: &str| {
        let reader = TesseractReader::new(code)?;
        Ok(Arc::new(reader) as Arc<dyn TextReader>)
    })
}

impl TesseractReader {
    pub fn new(language: &str) -> Result<Self> {
        let mut lt = LepTess::new(None, language).map_err(|e| {
            LipiError::unavailable(ENGINE, format!("Tesseract not available: {e}"))
        })?;
        lt.set_variable(Variable::TesseditPagesegMode, SINGLE_LINE_PSM)
            .map_err(|e| {
                LipiError::unavailable(ENGINE, format!("failed to set segmentation mode: {e:?}"))
            })?;

        info!(language, "Tesseract OCR initialized");
        Ok(Self {
            tesseract: Mutex::new(lt),
        })
    }
}

impl TextReader for TesseractReader {
    fn read(&self, image: &GrayImage) -> Result<Vec<Fragment>> {
        let png = encode_png(&ink_on_paper(image))?;

        let mut lt = self.tesseract.blocking_lock();
        lt.set_image_from_mem(&png)
            .map_err(|e| LipiError::ocr(ENGINE, format!("Failed to set image: {e}")))?;
        let text = lt
            .get_utf8_text()
            .map_err(|e| LipiError::ocr(ENGINE, format!("Failed to extract text: {e}")))?;

        Ok(vec![Fragment::new(text)])
    }
}
