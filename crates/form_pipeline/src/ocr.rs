//! OCR module
//!
//! Wraps Tesseract behind the [`OcrEngine`] trait. The default backend runs
//! the `tesseract` executable named in the configuration; with the
//! `leptess` feature the library can be linked in-process instead.

use crate::config::{OcrBackend, OcrConfig};
use crate::error::OcrError;
use image::GrayImage;
use std::process::Command;
use tracing::debug;

/// Something that turns a binary image into text
pub trait OcrEngine {
    /// Recognize the text in `image`, preserving line breaks
    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError>;

    /// Recognized text as lines in reading order
    fn recognize_lines(&self, image: &GrayImage) -> Result<Vec<String>, OcrError> {
        Ok(self.recognize(image)?.lines().map(str::to_string).collect())
    }
}

/// Build the engine selected by `config`
pub fn engine_from_config(config: &OcrConfig) -> Result<Box<dyn OcrEngine>, OcrError> {
    match config.backend {
        OcrBackend::Cli => Ok(Box::new(TesseractCli::new(config.clone()))),
        #[cfg(feature = "leptess")]
        OcrBackend::Leptess => Ok(Box::new(LeptessEngine::new(config.clone()))),
        #[cfg(not(feature = "leptess"))]
        OcrBackend::Leptess => Err(OcrError::EngineUnavailable(
            "built without the `leptess` feature".to_string(),
        )),
    }
}

/// Runs the tesseract executable once per image
pub struct TesseractCli {
    config: OcrConfig,
}

impl TesseractCli {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    fn command(&self, input: &std::path::Path) -> Command {
        let mut cmd = Command::new(&self.config.tesseract_cmd);
        cmd.arg(input)
            .arg("stdout")
            .args(["-l", &self.config.language])
            .args(self.config.args.split_whitespace());
        cmd
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
        // Tesseract reads from a file, so hand it a PNG in a scratch directory
        let tmpdir = tempfile::TempDir::with_prefix("orderscan")?;
        let input_path = tmpdir.path().join("input.png");
        image.save_with_format(&input_path, image::ImageFormat::Png)?;

        let mut cmd = self.command(&input_path);
        debug!(?cmd, "Running tesseract");

        let output = match cmd.output() {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OcrError::EngineUnavailable(format!(
                    "{} not found; install tesseract-ocr or set ocr.tesseract_cmd",
                    self.config.tesseract_cmd.display()
                )));
            }
            Err(e) => return Err(OcrError::Io(e)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Failed(format!(
                "{} exited with {}: {}",
                self.config.tesseract_cmd.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// In-process Tesseract via leptess
#[cfg(feature = "leptess")]
pub struct LeptessEngine {
    config: OcrConfig,
}

#[cfg(feature = "leptess")]
impl LeptessEngine {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }
}

#[cfg(feature = "leptess")]
impl OcrEngine for LeptessEngine {
    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
        use leptess::{LepTess, Variable};

        let mut tesseract = LepTess::new(None, &self.config.language).map_err(|e| {
            OcrError::EngineUnavailable(format!("failed to initialize Tesseract: {e}"))
        })?;

        if let Some(psm) = self.config.page_seg_mode() {
            tesseract
                .set_variable(Variable::TesseditPagesegMode, &psm.to_string())
                .map_err(|e| OcrError::Failed(format!("cannot set page segmentation mode: {e}")))?;
        }

        // leptess wants an encoded image, not raw pixels
        let mut png_bytes = Vec::new();
        image.write_to(
            &mut std::io::Cursor::new(&mut png_bytes),
            image::ImageFormat::Png,
        )?;

        tesseract
            .set_image_from_mem(&png_bytes)
            .map_err(|e| OcrError::Failed(format!("failed to load image: {e}")))?;

        tesseract
            .get_utf8_text()
            .map_err(|e| OcrError::Failed(format!("failed to extract text: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};
    use std::path::PathBuf;

    struct Fixed(&'static str);

    impl OcrEngine for Fixed {
        fn recognize(&self, _image: &GrayImage) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_recognize_lines_splits_in_order() {
        let img = ImageBuffer::from_pixel(4, 4, Luma([0u8]));
        let lines = Fixed("first\nsecond\r\n\nthird").recognize_lines(&img).unwrap();
        assert_eq!(lines, vec!["first", "second", "", "third"]);
    }

    #[test]
    fn test_cli_command_line() {
        let engine = TesseractCli::new(OcrConfig::default());
        let cmd = engine.command(std::path::Path::new("/tmp/input.png"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();

        assert_eq!(cmd.get_program(), "tesseract");
        assert_eq!(
            args,
            vec!["/tmp/input.png", "stdout", "-l", "eng", "--oem", "3", "--psm", "6"]
        );
    }

    #[test]
    fn test_missing_executable_is_engine_unavailable() {
        let config = OcrConfig {
            tesseract_cmd: PathBuf::from("/nonexistent/bin/tesseract-missing"),
            ..OcrConfig::default()
        };
        let img = ImageBuffer::from_pixel(10, 10, Luma([255u8]));
        let err = TesseractCli::new(config).recognize(&img).unwrap_err();
        assert!(matches!(err, OcrError::EngineUnavailable(_)));
    }

    #[test]
    fn test_blank_image_yields_no_text_or_tesseract_error() {
        let img = ImageBuffer::from_pixel(100, 100, Luma([255u8]));
        match TesseractCli::new(OcrConfig::default()).recognize(&img) {
            Ok(text) => assert!(text.trim().is_empty()),
            Err(e) => assert!(e.to_string().to_lowercase().contains("tesseract")),
        }
    }

    #[cfg(not(feature = "leptess"))]
    #[test]
    fn test_leptess_backend_requires_feature() {
        let config = OcrConfig {
            backend: OcrBackend::Leptess,
            ..OcrConfig::default()
        };
        assert!(matches!(
            engine_from_config(&config),
            Err(OcrError::EngineUnavailable(_))
        ));
    }
}
