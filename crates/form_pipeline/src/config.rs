//! Pipeline configuration
//!
//! Everything that used to be a process-wide constant (folders, the
//! tesseract executable, the OCR-error corrections) lives here and is
//! handed to each component explicitly.

use crate::error::ConfigError;
use crate::types::SearchScope;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "orderscan.toml";

/// Field name given to a bare identifier line seen before any field
pub const DEFAULT_ID_FIELD: &str = "Service Order ID";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder scanned (non-recursively) for form images
    pub image_folder: PathBuf,
    /// File extensions treated as images, compared case-insensitively
    pub image_extensions: Vec<String>,
    /// Spreadsheet file holding all records
    pub store_path: PathBuf,
    /// Cells examined by a search
    pub search_scope: SearchScope,
    pub ocr: OcrConfig,
    pub preprocess: PreprocessConfig,
    pub parser: ParserConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_folder: PathBuf::from("images"),
            image_extensions: vec!["jpg".to_string(), "png".to_string()],
            store_path: PathBuf::from("service_orders.xlsx"),
            search_scope: SearchScope::default(),
            ocr: OcrConfig::default(),
            preprocess: PreprocessConfig::default(),
            parser: ParserConfig::default(),
        }
    }
}

/// Which OCR implementation to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackend {
    /// Spawn the tesseract executable
    #[default]
    Cli,
    /// Link libtesseract in-process (requires the `leptess` feature)
    Leptess,
}

/// OCR engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub backend: OcrBackend,
    /// Executable used by the CLI backend
    pub tesseract_cmd: PathBuf,
    pub language: String,
    /// Extra arguments, whitespace separated (engine and page segmentation mode)
    pub args: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackend::default(),
            tesseract_cmd: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            args: "--oem 3 --psm 6".to_string(),
        }
    }
}

impl OcrConfig {
    /// Page segmentation mode from `--psm N` in `args`, if present
    pub fn page_seg_mode(&self) -> Option<u32> {
        let mut parts = self.args.split_whitespace();
        while let Some(part) = parts.next() {
            if part == "--psm" {
                return parts.next().and_then(|n| n.parse().ok());
            }
        }
        None
    }
}

/// Noise reduction applied before thresholding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Blur {
    /// Median filter over a (2r+1)x(2r+1) window
    Median { radius: u32 },
    Gaussian { sigma: f32 },
    None,
}

impl Default for Blur {
    fn default() -> Self {
        Blur::Median { radius: 1 }
    }
}

/// Binarization method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Threshold {
    /// Single global level chosen by Otsu's method
    #[default]
    Otsu,
    /// Local mean over a (2r+1)x(2r+1) block
    Adaptive { block_radius: u32 },
}

/// Image preprocessing settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub blur: Blur,
    pub threshold: Threshold,
    /// Make dark ink the foreground (255) and paper the background (0)
    pub invert: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            blur: Blur::default(),
            threshold: Threshold::default(),
            invert: true,
        }
    }
}

/// One known OCR misreading and its replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub from: String,
    pub to: String,
}

impl Correction {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// The replacement contains the pattern again (`Dat` -> `Date`)
    pub fn is_self_containing(&self) -> bool {
        !self.from.is_empty() && self.to.contains(&self.from)
    }
}

/// Field parser settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub id_field: String,
    /// Glyphs removed from every line (checkbox marks)
    pub ignored_symbols: Vec<String>,
    /// Applied in order to every value
    pub corrections: Vec<Correction>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
            ignored_symbols: vec!["✔".to_string(), "✓".to_string(), "☑".to_string()],
            corrections: vec![
                Correction::new("_", " "),
                Correction::new("Ovminq", "Owning"),
                Correction::new("Dalo", "Date"),
                Correction::new("...", ""),
            ],
        }
    }
}

impl Config {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw, path)?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Load `path` if given, else `orderscan.toml` in `dir` if present, else defaults
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            debug!(path = %candidate.display(), "No config file; using defaults");
            Ok(Self::default())
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "image_extensions must name at least one extension".to_string(),
            ));
        }
        if self.parser.id_field.trim().is_empty() {
            return Err(ConfigError::Invalid("parser.id_field is empty".to_string()));
        }
        if self.parser.corrections.iter().any(|c| c.from.is_empty()) {
            return Err(ConfigError::Invalid(
                "parser.corrections entries need a non-empty `from`".to_string(),
            ));
        }
        if let Threshold::Adaptive { block_radius: 0 } = self.preprocess.threshold {
            return Err(ConfigError::Invalid(
                "preprocess.threshold.block_radius must be at least 1".to_string(),
            ));
        }
        if let Blur::Gaussian { sigma } = self.preprocess.blur {
            if sigma <= 0.0 || !sigma.is_finite() {
                return Err(ConfigError::Invalid(
                    "preprocess.blur.sigma must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Whether `path` has one of the configured image extensions
    pub fn is_image_path(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.image_extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_order_layout() {
        let config = Config::default();
        assert_eq!(config.store_path, PathBuf::from("service_orders.xlsx"));
        assert_eq!(config.ocr.args, "--oem 3 --psm 6");
        assert_eq!(config.ocr.page_seg_mode(), Some(6));
        assert_eq!(config.preprocess.blur, Blur::Median { radius: 1 });
        assert_eq!(config.preprocess.threshold, Threshold::Otsu);
        assert!(config.preprocess.invert);
        assert_eq!(config.search_scope, SearchScope::AllColumns);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let raw = r#"
            image_folder = "scans"
            search_scope = "first_column"

            [ocr]
            tesseract_cmd = "/usr/local/bin/tesseract"

            [preprocess.threshold]
            kind = "adaptive"
            block_radius = 15

            [[parser.corrections]]
            from = "0rder"
            to = "Order"
        "#;
        let config = Config::from_toml_str(raw, Path::new("test.toml")).unwrap();

        assert_eq!(config.image_folder, PathBuf::from("scans"));
        assert_eq!(config.search_scope, SearchScope::FirstColumn);
        assert_eq!(config.ocr.tesseract_cmd, PathBuf::from("/usr/local/bin/tesseract"));
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(
            config.preprocess.threshold,
            Threshold::Adaptive { block_radius: 15 }
        );
        assert_eq!(config.preprocess.blur, Blur::Median { radius: 1 });
        assert_eq!(config.parser.corrections, vec![Correction::new("0rder", "Order")]);
        assert_eq!(config.parser.id_field, DEFAULT_ID_FIELD);
    }

    #[test]
    fn test_example_file_spells_out_defaults() {
        let raw = include_str!("../../../orderscan.example.toml");
        let config = Config::from_toml_str(raw, Path::new("orderscan.example.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = Config::from_toml_str("image_folder = [", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validate_rejects_empty_correction() {
        let mut config = Config::default();
        config.parser.corrections.push(Correction::new("", "x"));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_self_containing_correction_accepted() {
        let raw = "[parser]\ncorrections = [{ from = \"Dat\", to = \"Date\" }]\n";
        let config = Config::from_toml_str(raw, Path::new("t.toml")).unwrap();
        assert!(config.parser.corrections[0].is_self_containing());
        assert!(!Correction::new("Dalo", "Date").is_self_containing());
    }

    #[test]
    fn test_validate_rejects_zero_block_radius() {
        let mut config = Config::default();
        config.preprocess.threshold = Threshold::Adaptive { block_radius: 0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_image_path_case_insensitive() {
        let config = Config::default();
        assert!(config.is_image_path(Path::new("a/form.jpg")));
        assert!(config.is_image_path(Path::new("a/FORM.PNG")));
        assert!(!config.is_image_path(Path::new("a/notes.txt")));
        assert!(!config.is_image_path(Path::new("a/noext")));
    }

    #[test]
    fn test_discover_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::discover(None, dir.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_discover_reads_file_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "store_path = \"orders.xlsx\"\n",
        )
        .unwrap();
        let config = Config::discover(None, dir.path()).unwrap();
        assert_eq!(config.store_path, PathBuf::from("orders.xlsx"));
    }

    #[test]
    fn test_load_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
