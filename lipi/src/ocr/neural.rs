//! CRNN text-line recognizer run through ONNX Runtime.
//!
//! Each language code has its own model directory holding `rec.onnx` and a
//! `dict.txt` with one symbol per line. The word image is cut into text
//! lines by horizontal projection and each line is decoded with greedy CTC.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use image::imageops::FilterType;
use image::GrayImage;
use ndarray::{Array4, ArrayViewD, IxDyn};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

use crate::error::{LipiError, Result};

use super::engine::{ink_on_paper, EngineKind, Fragment, ReaderLoader, TextReader};

pub const MODEL_FILE: &str = "rec.onnx";
pub const DICTIONARY_FILE: &str = "dict.txt";

/// Height every line is resized to before inference.
pub const INPUT_HEIGHT: u32 = 48;
const MIN_INPUT_WIDTH: u32 = 4;
const MAX_INPUT_WIDTH: u32 = 3200;

/// Rows with fewer foreground pixels than this count as background.
const MIN_ROW_INK: u32 = 1;
/// Runs shorter than this are treated as noise, not lines.
const MIN_LINE_HEIGHT: u32 = 3;
const LINE_PADDING: u32 = 2;

const ENGINE: EngineKind = EngineKind::LocalNeural;

pub struct CrnnReader {
    session: Mutex<Session>,
    dictionary: Vec<String>,
    input_name: String,
}

impl std::fmt::Debug for CrnnReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrnnReader")
            .field("dictionary_size", &self.dictionary.len())
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

/// Loader for the model cache: `<model_dir>/<code>/rec.onnx`.
pub fn loader(model_dir: impl Into<PathBuf>) -> ReaderLoader {
    let model_dir = model_dir.into();
    Arc::new(move |code: &str| {
        let reader = CrnnReader::load(&model_dir.join(code))?;
        Ok(Arc::new(reader) as Arc<dyn TextReader>)
    })
}

impl CrnnReader {
    pub fn load(dir: &Path) -> Result<Self> {
        let model_path = dir.join(MODEL_FILE);
        let dict_path = dir.join(DICTIONARY_FILE);

        if !model_path.exists() {
            return Err(LipiError::unavailable(
                ENGINE,
                format!("recognizer model not found: {}", model_path.display()),
            ));
        }
        if !dict_path.exists() {
            return Err(LipiError::unavailable(
                ENGINE,
                format!("character dictionary not found: {}", dict_path.display()),
            ));
        }

        let dictionary = load_dictionary(&dict_path)?;

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(2))
            .and_then(|b| b.commit_from_file(&model_path))
            .map_err(|e| {
                LipiError::unavailable(
                    ENGINE,
                    format!("failed to load {}: {e}", model_path.display()),
                )
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        info!(
            model = %model_path.display(),
            symbols = dictionary.len(),
            "Neural recognizer loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            dictionary,
            input_name,
        })
    }

    fn recognize_line(&self, line: &GrayImage) -> Result<Option<Fragment>> {
        let input = line_tensor(line);
        let value = Tensor::from_array(input)
            .map_err(|e| LipiError::ocr(ENGINE, format!("failed to build input tensor: {e}")))?;

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => value])
            .map_err(|e| LipiError::ocr(ENGINE, format!("inference failed: {e}")))?;

        let probabilities = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| LipiError::ocr(ENGINE, format!("unexpected output tensor: {e}")))?;

        ctc_greedy_decode(probabilities, &self.dictionary)
    }
}

impl TextReader for CrnnReader {
    fn read(&self, image: &GrayImage) -> Result<Vec<Fragment>> {
        let lines = split_lines(image);
        debug!(lines = lines.len(), "Split word image into lines");

        let paper = ink_on_paper(image);
        let mut fragments = Vec::with_capacity(lines.len());
        for (top, bottom) in lines {
            let crop =
                image::imageops::crop_imm(&paper, 0, top, paper.width(), bottom - top).to_image();
            if let Some(fragment) = self.recognize_line(&crop)? {
                fragments.push(fragment);
            }
        }
        Ok(fragments)
    }
}

/// Index 0 is the CTC blank. A space is appended when the file lacks one.
fn load_dictionary(path: &Path) -> Result<Vec<String>> {
    let unreadable = |e: std::io::Error| {
        LipiError::unavailable(ENGINE, format!("failed to read {}: {e}", path.display()))
    };

    let file = File::open(path).map_err(unreadable)?;
    let mut dictionary = vec![String::new()];

    for line in BufReader::new(file).lines() {
        let line = line.map_err(unreadable)?;
        let symbol = line.trim_end_matches(['\r', '\n']);
        if !symbol.is_empty() {
            dictionary.push(symbol.to_string());
        }
    }

    if !dictionary.iter().any(|s| s == " ") {
        dictionary.push(" ".to_string());
    }

    if dictionary.len() < 3 {
        return Err(LipiError::unavailable(
            ENGINE,
            format!("character dictionary is empty: {}", path.display()),
        ));
    }

    Ok(dictionary)
}

/// Row ranges `[top, bottom)` that contain foreground, top to bottom.
pub(crate) fn split_lines(binary: &GrayImage) -> Vec<(u32, u32)> {
    let (width, height) = binary.dimensions();
    let ink: Vec<bool> = (0..height)
        .map(|y| {
            let row_ink = (0..width).filter(|&x| binary.get_pixel(x, y)[0] > 0).count();
            row_ink as u32 >= MIN_ROW_INK
        })
        .collect();

    let mut lines = Vec::new();
    let mut start = None;
    for (y, &has_ink) in ink.iter().chain(std::iter::once(&false)).enumerate() {
        let y = y as u32;
        match (has_ink, start) {
            (true, None) => start = Some(y),
            (false, Some(top)) => {
                if y - top >= MIN_LINE_HEIGHT {
                    lines.push((
                        top.saturating_sub(LINE_PADDING),
                        (y + LINE_PADDING).min(height),
                    ));
                }
                start = None;
            }
            _ => {}
        }
    }
    lines
}

/// Resize to the model height, scale to [-1, 1] and repeat across three
/// channels: `[1, 3, 48, W]`.
fn line_tensor(line: &GrayImage) -> Array4<f32> {
    let (width, height) = line.dimensions();
    let scaled_width = ((width as f32 * INPUT_HEIGHT as f32 / height.max(1) as f32).ceil() as u32)
        .clamp(MIN_INPUT_WIDTH, MAX_INPUT_WIDTH);
    let resized = image::imageops::resize(line, scaled_width, INPUT_HEIGHT, FilterType::Triangle);

    let mut tensor = Array4::<f32>::zeros((1, 3, INPUT_HEIGHT as usize, scaled_width as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let value = (pixel[0] as f32 / 255.0 - 0.5) / 0.5;
        for channel in 0..3 {
            tensor[[0, channel, y as usize, x as usize]] = value;
        }
    }
    tensor
}

/// Best-path decoding: take the arg-max class per timestep, collapse
/// repeats, drop blanks. Returns `None` when nothing but blanks was emitted.
fn ctc_greedy_decode(
    output: ArrayViewD<'_, f32>,
    dictionary: &[String],
) -> Result<Option<Fragment>> {
    let shape = output.shape().to_vec();
    let (steps, classes) = match shape.as_slice() {
        [1, steps, classes] => (*steps, *classes),
        [steps, classes] => (*steps, *classes),
        _ => {
            return Err(LipiError::ocr(
                ENGINE,
                format!("unexpected output shape {shape:?}"),
            ))
        }
    };

    let at = |t: usize, c: usize| {
        if shape.len() == 3 {
            output[IxDyn(&[0, t, c])]
        } else {
            output[IxDyn(&[t, c])]
        }
    };

    let mut text = String::new();
    let mut confidences = Vec::new();
    let mut previous = 0usize;

    for t in 0..steps {
        let (best, prob) = (0..classes).fold((0usize, f32::NEG_INFINITY), |(bi, bp), c| {
            let p = at(t, c);
            if p > bp {
                (c, p)
            } else {
                (bi, bp)
            }
        });

        if best != 0 && best != previous {
            if let Some(symbol) = dictionary.get(best) {
                text.push_str(symbol);
                confidences.push(prob);
            }
        }
        previous = best;
    }

    if confidences.is_empty() {
        return Ok(None);
    }

    let confidence = confidences.iter().sum::<f32>() / confidences.len() as f32;
    Ok(Some(Fragment::with_confidence(text, confidence.clamp(0.0, 1.0))))
}
