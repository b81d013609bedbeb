#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use lipi::config::OcrConfig;
use lipi::ocr::{Fragment, ReaderLoader, TextReader};

pub fn test_config(model: &str) -> OcrConfig {
    OcrConfig {
        model: model.to_string(),
        api_key: None,
        base_url: None,
        model_dir: "models".to_string(),
        timeout_secs: 10,
        max_image_dimension: 4096,
        min_image_dimension: 8,
        upload_preprocessed: false,
    }
}

pub fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), format)
        .expect("Failed to encode fixture image");
    bytes
}

/// A light page with three dark, stroke-like blocks under a head line.
pub fn word_image() -> DynamicImage {
    let mut rgb = RgbImage::from_pixel(180, 64, Rgb([236, 234, 228]));
    let mut paint = |xs: std::ops::Range<u32>, ys: std::ops::Range<u32>| {
        for y in ys {
            for x in xs.clone() {
                rgb.put_pixel(x, y, Rgb([28, 26, 30]));
            }
        }
    };
    paint(16..164, 12..16);
    paint(30..40, 12..52);
    paint(80..90, 12..52);
    paint(130..140, 12..52);
    DynamicImage::ImageRgb8(rgb)
}

pub fn word_png() -> Vec<u8> {
    encode(&word_image(), ImageFormat::Png)
}

pub fn blank_png() -> Vec<u8> {
    encode(
        &DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 32, Luma([255]))),
        ImageFormat::Png,
    )
}

/// Reader that reports which language code it was built for.
pub struct EchoReader {
    code: String,
    delay: Duration,
}

impl TextReader for EchoReader {
    fn read(&self, image: &GrayImage) -> lipi::Result<Vec<Fragment>> {
        assert!(
            image.pixels().all(|p| p[0] == 0 || p[0] == 255),
            "reader expects a binarized image"
        );
        std::thread::sleep(self.delay);
        Ok(vec![
            Fragment::new(format!("  {}  ", self.code)),
            Fragment::new(""),
            Fragment::with_confidence("ok\n", 0.9),
        ])
    }
}

/// Records every construction so tests can assert on load counts.
#[derive(Clone, Default)]
pub struct LoadLog {
    count: Arc<AtomicUsize>,
    codes: Arc<Mutex<Vec<String>>>,
}

impl LoadLog {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn codes(&self) -> Vec<String> {
        self.codes.lock().unwrap().clone()
    }

    fn record(&self, code: &str) -> usize {
        self.codes.lock().unwrap().push(code.to_string());
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }
}

pub fn echo_loader(log: LoadLog, load_delay: Duration, read_delay: Duration) -> ReaderLoader {
    Arc::new(move |code: &str| {
        log.record(code);
        std::thread::sleep(load_delay);
        Ok(Arc::new(EchoReader {
            code: code.to_string(),
            delay: read_delay,
        }) as Arc<dyn TextReader>)
    })
}

/// Fails the first `failures` constructions, then behaves like `echo_loader`.
pub fn flaky_loader(log: LoadLog, failures: usize) -> ReaderLoader {
    Arc::new(move |code: &str| {
        if log.record(code) <= failures {
            return Err(lipi::LipiError::unavailable(
                lipi::ocr::EngineKind::LocalNeural,
                "model file is being replaced",
            ));
        }
        Ok(Arc::new(EchoReader {
            code: code.to_string(),
            delay: Duration::ZERO,
        }) as Arc<dyn TextReader>)
    })
}

pub fn quick_loader(log: LoadLog) -> ReaderLoader {
    echo_loader(log, Duration::ZERO, Duration::ZERO)
}
