//! Batch processing of a folder of form images
//!
//! image file -> preprocess -> OCR -> field parser -> record store.
//! One bad image never stops the batch: decode failures skip the file and
//! OCR failures count as an empty extraction.

use crate::config::Config;
use crate::error::{OcrError, PreprocessError};
use crate::ocr::{engine_from_config, OcrEngine};
use crate::parser::FieldParser;
use crate::preprocess::load_and_preprocess;
use crate::store::RecordStore;
use crate::types::Record;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// What happened to one image
#[derive(Debug)]
pub enum ImageOutcome {
    /// At least one field was read
    Extracted(Record),
    /// Nothing usable came out; `ocr_error` is set when the engine failed
    Empty { ocr_error: Option<OcrError> },
    /// The file could not be decoded and was skipped
    Skipped(PreprocessError),
}

impl ImageOutcome {
    pub fn record(&self) -> Option<&Record> {
        match self {
            ImageOutcome::Extracted(record) => Some(record),
            _ => None,
        }
    }
}

/// Summary of one processing run
#[derive(Debug, Default)]
pub struct BatchReport {
    pub images_found: usize,
    /// Records appended to the store
    pub saved: usize,
    /// Rows in the store after the run, if it was written
    pub total_rows: Option<usize>,
    pub empty: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// The configured processing pipeline
pub struct Pipeline {
    config: Config,
    engine: Box<dyn OcrEngine>,
    parser: FieldParser,
    store: RecordStore,
}

impl Pipeline {
    /// Build a pipeline using the OCR backend named in `config`
    pub fn new(config: Config) -> Result<Self> {
        let engine = engine_from_config(&config.ocr).context("Failed to set up OCR engine")?;
        Ok(Self::with_engine(config, engine))
    }

    /// Build a pipeline around an already constructed OCR engine
    pub fn with_engine(config: Config, engine: Box<dyn OcrEngine>) -> Self {
        let parser = FieldParser::new(&config.parser);
        let store = RecordStore::new(config.store_path.clone());
        Self {
            config,
            engine,
            parser,
            store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Create the image folder if needed; returns true if it was created
    pub fn ensure_image_folder(&self) -> Result<bool> {
        let folder = &self.config.image_folder;
        if folder.is_dir() {
            return Ok(false);
        }
        std::fs::create_dir_all(folder)
            .with_context(|| format!("Failed to create image folder {}", folder.display()))?;
        info!(path = %folder.display(), "Created image folder");
        Ok(true)
    }

    /// Image files directly inside the image folder, sorted by name
    pub fn find_images(&self) -> Vec<PathBuf> {
        let folder = &self.config.image_folder;
        if !folder.is_dir() {
            warn!(path = %folder.display(), "Image folder does not exist");
            return Vec::new();
        }

        WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable folder entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| self.config.is_image_path(path))
            .collect()
    }

    /// Run one image through preprocessing, OCR and parsing
    pub fn process_image(&self, path: &Path) -> ImageOutcome {
        let binary = match load_and_preprocess(path, &self.config.preprocess) {
            Ok(img) => img,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping image");
                return ImageOutcome::Skipped(e);
            }
        };

        let lines = match self.engine.recognize_lines(&binary) {
            Ok(lines) => lines,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "OCR failed");
                return ImageOutcome::Empty { ocr_error: Some(e) };
            }
        };
        debug!(path = %path.display(), lines = lines.len(), "OCR finished");

        let record = self.parser.parse(&lines);
        if !record.has_values() {
            info!(path = %path.display(), "No data extracted");
            ImageOutcome::Empty { ocr_error: None }
        } else {
            debug!(path = %path.display(), fields = record.len(), "Extracted fields");
            ImageOutcome::Extracted(record)
        }
    }

    /// Process every image in the folder and append the results to the store
    ///
    /// `on_image` is called after each image with its outcome. The store is
    /// only written when at least one record was extracted.
    pub fn process_folder(
        &self,
        mut on_image: impl FnMut(&Path, &ImageOutcome),
    ) -> Result<BatchReport> {
        let images = self.find_images();
        let mut report = BatchReport {
            images_found: images.len(),
            ..BatchReport::default()
        };
        info!(
            folder = %self.config.image_folder.display(),
            count = images.len(),
            "Found images"
        );

        let mut records = Vec::new();
        for path in images {
            let outcome = self.process_image(&path);
            on_image(&path, &outcome);
            match outcome {
                ImageOutcome::Extracted(record) => records.push(record),
                ImageOutcome::Empty { .. } => report.empty.push(path),
                ImageOutcome::Skipped(_) => report.skipped.push(path),
            }
        }

        if !records.is_empty() {
            let total = self.store.append(&records).with_context(|| {
                format!("Failed to save records to {}", self.store.path().display())
            })?;
            report.saved = records.len();
            report.total_rows = Some(total);
        }

        Ok(report)
    }
}
