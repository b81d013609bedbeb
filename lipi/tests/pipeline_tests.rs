mod common;

use std::time::Duration;

use lipi::ocr::{decode, OcrProvider, RawImage, Script, ScriptRegistry, Strategy};
use lipi::LipiError;
use pretty_assertions::assert_eq;

use common::{blank_png, echo_loader, quick_loader, test_config, word_png, LoadLog};

fn local_provider(model: &str) -> (OcrProvider, LoadLog, LoadLog) {
    let neural = LoadLog::default();
    let traditional = LoadLog::default();
    let provider = OcrProvider::with_reader_loaders(
        &test_config(model),
        quick_loader(neural.clone()),
        quick_loader(traditional.clone()),
    );
    (provider, neural, traditional)
}

#[tokio::test]
async fn test_hindi_routes_to_neural_reader_with_hindi_code() {
    let (provider, neural, traditional) = local_provider("local");
    let image = RawImage::new(word_png(), "word.png", None);

    let text = provider.extract(&image, "Hindi").await.unwrap();

    assert_eq!(text, "hi ok");
    assert_eq!(neural.codes(), vec!["hi"]);
    assert_eq!(traditional.count(), 0);
}

#[tokio::test]
async fn test_marathi_shares_strategy_but_not_model() {
    let (provider, neural, _) = local_provider("local");
    let image = RawImage::new(word_png(), "word.png", None);

    provider.extract(&image, "Hindi").await.unwrap();
    provider.extract(&image, "Marathi").await.unwrap();

    assert_eq!(neural.codes(), vec!["hi", "mr"]);
}

#[tokio::test]
async fn test_generic_routes_to_traditional_engine() {
    let (provider, neural, traditional) = local_provider("local");
    let image = RawImage::new(word_png(), "word.png", None);

    let text = provider.extract(&image, "English").await.unwrap();

    assert_eq!(text, "eng ok");
    assert_eq!(traditional.codes(), vec!["eng"]);
    assert_eq!(neural.count(), 0);
}

#[tokio::test]
async fn test_forced_neural_reads_generic_with_english_model() {
    let (provider, neural, traditional) = local_provider("local/neural");
    let image = RawImage::new(word_png(), "word.png", None);

    let text = provider.extract(&image, "Generic").await.unwrap();

    assert_eq!(text, "en ok");
    assert_eq!(neural.codes(), vec!["en"]);
    assert_eq!(traditional.count(), 0);
}

#[tokio::test]
async fn test_empty_input_is_invalid_image() {
    let (provider, neural, _) = local_provider("local");
    let image = RawImage::new(Vec::new(), "empty.png", None);

    let err = provider.extract(&image, "Tamil").await.unwrap_err();

    match err {
        LipiError::InvalidImage(msg) => {
            assert!(msg.contains("Tamil via local-neural"), "{msg}");
        }
        other => panic!("expected InvalidImage, got {other:?}"),
    }
    assert_eq!(neural.count(), 0, "no model should load for a bad image");
}

#[tokio::test]
async fn test_garbage_bytes_are_invalid_image() {
    let (provider, _, _) = local_provider("local");
    let image = RawImage::new(b"definitely not an image".to_vec(), "word.png", None);

    let result = provider.extract(&image, "Bengali").await;
    assert!(matches!(result, Err(LipiError::InvalidImage(_))));
}

#[tokio::test]
async fn test_unknown_script_is_rejected_regardless_of_image() {
    let (provider, neural, traditional) = local_provider("local");

    for bytes in [word_png(), Vec::new()] {
        let image = RawImage::new(bytes, "word.png", None);
        let err = provider.extract(&image, "Klingon").await.unwrap_err();
        assert!(matches!(err, LipiError::UnsupportedScript(ref s) if s == "Klingon"));
    }
    assert_eq!(neural.count() + traditional.count(), 0);
}

#[tokio::test]
async fn test_tiny_image_is_rejected() {
    let (provider, _, _) = local_provider("local");
    let tiny = common::encode(
        &image::DynamicImage::new_luma8(4, 4),
        image::ImageFormat::Png,
    );

    let err = provider
        .extract(&RawImage::new(tiny, "tiny.png", None), "Odia")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("too small"), "{err}");
}

#[tokio::test]
async fn test_caller_image_is_untouched() {
    let (provider, _, _) = local_provider("local");
    let bytes = word_png();
    let image = RawImage::new(bytes.clone(), "word.png", None);

    provider.extract(&image, "Gujarati").await.unwrap();
    provider.extract(&image, "Gujarati").await.unwrap();

    assert_eq!(image.bytes(), bytes.as_slice());
}

#[tokio::test]
async fn test_preprocess_is_deterministic_and_matches_strategy() {
    let (provider, _, _) = local_provider("local");
    let image = RawImage::new(word_png(), "word.png", None);

    let first = provider.preprocess(&image, "Hindi").await.unwrap();
    let second = provider.preprocess(&image, "Hindi").await.unwrap();
    assert_eq!(first.as_raw(), second.as_raw());

    let direct = Strategy::Devanagari.apply(&decode(&word_png()).unwrap());
    assert_eq!(first.as_raw(), direct.as_raw());
}

#[tokio::test]
async fn test_every_script_extracts_through_its_own_code() {
    let (provider, neural, traditional) = local_provider("local");
    let image = RawImage::new(word_png(), "word.png", None);

    for entry in ScriptRegistry::global().entries() {
        let text = provider.extract(&image, entry.script.name()).await.unwrap();
        let expected_code = if entry.script == Script::Generic {
            "eng"
        } else {
            entry.neural_code
        };
        assert_eq!(text, format!("{expected_code} ok"), "{}", entry.script);
    }

    assert_eq!(neural.count(), Script::ALL.len() - 1);
    assert_eq!(traditional.count(), 1);
}

#[tokio::test]
async fn test_blank_page_still_reaches_reader() {
    let (provider, neural, _) = local_provider("local");
    let image = RawImage::new(blank_png(), "blank.png", None);

    let text = provider.extract(&image, "Telugu").await.unwrap();
    assert_eq!(text, "te ok");
    assert_eq!(neural.codes(), vec!["te"]);
}

#[tokio::test]
async fn test_slow_reader_times_out() {
    let mut config = test_config("local");
    config.timeout_secs = 1;
    let provider = OcrProvider::with_reader_loaders(
        &config,
        echo_loader(LoadLog::default(), Duration::ZERO, Duration::from_millis(1500)),
        quick_loader(LoadLog::default()),
    );

    let err = provider
        .extract(&RawImage::new(word_png(), "word.png", None), "Kannada")
        .await
        .unwrap_err();

    assert!(matches!(err, LipiError::Timeout(1)));
    assert!(err.is_retryable());
}

/// Renders a Devanagari word with a real font and reads it with real models.
///
/// Needs `LIPI_MODEL_DIR` (containing `hi/rec.onnx` and `hi/dict.txt`) and
/// `LIPI_DEVANAGARI_FONT` pointing at a Devanagari TTF/OTF.
#[tokio::test]
#[ignore]
async fn test_devanagari_word_reads_back_as_devanagari() {
    use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
    use image::{GrayImage, Luma};

    let model_dir = std::env::var("LIPI_MODEL_DIR").expect("LIPI_MODEL_DIR not set");
    let font_path = std::env::var("LIPI_DEVANAGARI_FONT").expect("LIPI_DEVANAGARI_FONT not set");
    let font = FontVec::try_from_vec(std::fs::read(font_path).unwrap()).unwrap();

    let scale = PxScale::from(64.0);
    let scaled = font.as_scaled(scale);
    let mut canvas = GrayImage::from_pixel(320, 110, Luma([255]));
    let mut caret = 16.0;
    for ch in "कमल".chars() {
        let mut glyph = scaled.scaled_glyph(ch);
        glyph.position = point(caret, 20.0 + scaled.ascent());
        caret += scaled.h_advance(glyph.id);
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|x, y, coverage| {
                let px = bounds.min.x as i32 + x as i32;
                let py = bounds.min.y as i32 + y as i32;
                if px >= 0 && py >= 0 && (px as u32) < 320 && (py as u32) < 110 {
                    let ink = (255.0 * (1.0 - coverage)) as u8;
                    let current = canvas.get_pixel(px as u32, py as u32)[0];
                    canvas.put_pixel(px as u32, py as u32, Luma([current.min(ink)]));
                }
            });
        }
    }

    let bytes = common::encode(
        &image::DynamicImage::ImageLuma8(canvas),
        image::ImageFormat::Png,
    );
    let mut config = test_config("local");
    config.model_dir = model_dir;
    let provider = OcrProvider::new(&config).unwrap();

    let text = provider
        .extract(&RawImage::new(bytes, "kamal.png", None), "Hindi")
        .await
        .unwrap();

    let block = Script::Hindi.unicode_block().unwrap();
    assert!(!text.is_empty());
    assert!(
        text.chars()
            .filter(|c| !c.is_whitespace())
            .all(|c| block.contains(&c)),
        "unexpected characters in {text:?}"
    );
}
