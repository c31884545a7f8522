//! Core pipeline for orderscan
//!
//! This crate provides the processing logic for digitizing scanned
//! service-order forms: image cleanup, Tesseract OCR, key-value field
//! parsing and an xlsx-backed record table that can be listed and
//! searched.
//!
//! Copyright (c) 2025 Michael A Wright

pub mod config;
pub mod error;
pub mod ocr;
pub mod parser;
pub mod pipeline;
pub mod preprocess;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, OcrError, PreprocessError, StoreError};
pub use pipeline::{BatchReport, ImageOutcome, Pipeline};
pub use store::RecordStore;
pub use types::*;
