//! Interactive menu loop
//!
//! Reads one line per choice from `input` and writes everything the user
//! sees to `output`. End of input behaves like choosing exit.

use form_pipeline::{ImageOutcome, Pipeline, StoreError, Table};
use std::io::{self, BufRead, Write};
use std::path::Path;

const RULE: &str = "========================================";

/// A menu entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Process,
    View,
    Search,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuChoice::Process),
            "2" => Some(MenuChoice::View),
            "3" => Some(MenuChoice::Search),
            "4" => Some(MenuChoice::Exit),
            _ => None,
        }
    }
}

pub struct Shell<'a, R, W> {
    pipeline: &'a Pipeline,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Shell<'a, R, W> {
    pub fn new(pipeline: &'a Pipeline, input: R, output: W) -> Self {
        Self {
            pipeline,
            input,
            output,
        }
    }

    /// Run until the user exits or input ends
    pub fn run(&mut self) -> io::Result<()> {
        writeln!(self.output, "\nService Order Processing Bot initialized")?;
        match self.pipeline.ensure_image_folder() {
            Ok(true) => writeln!(
                self.output,
                "Created images folder at: {}",
                self.pipeline.config().image_folder.display()
            )?,
            Ok(false) => {}
            Err(e) => writeln!(self.output, "Warning: {e:#}")?,
        }

        loop {
            self.show_menu()?;
            let Some(line) = self.prompt("\nSelect an option (1-4): ")? else {
                break;
            };

            match MenuChoice::parse(&line) {
                Some(MenuChoice::Process) => self.process_images()?,
                Some(MenuChoice::View) => self.view_records()?,
                Some(MenuChoice::Search) => self.search_order()?,
                Some(MenuChoice::Exit) => break,
                None => writeln!(self.output, "\nInvalid option. Please choose 1-4")?,
            }
        }

        writeln!(self.output, "\nExiting the bot. Goodbye!")?;
        self.output.flush()
    }

    fn show_menu(&mut self) -> io::Result<()> {
        writeln!(self.output, "\n{RULE}")?;
        writeln!(self.output, "Service Order Processing Bot")?;
        writeln!(self.output, "{RULE}")?;
        writeln!(self.output, "1. Process Service Order Images")?;
        writeln!(self.output, "2. View All Records")?;
        writeln!(self.output, "3. Search for a Service Order")?;
        writeln!(self.output, "4. Exit")?;
        writeln!(self.output, "{RULE}")
    }

    /// Print `message` and read one line; `None` at end of input
    fn prompt(&mut self, message: &str) -> io::Result<Option<String>> {
        write!(self.output, "{message}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn process_images(&mut self) -> io::Result<()> {
        let pipeline = self.pipeline;
        let folder = pipeline.config().image_folder.display().to_string();
        let out = &mut self.output;

        let mut write_error = None;
        let result = pipeline.process_folder(|path, outcome| {
            if write_error.is_none() {
                if let Err(e) = report_image(&mut *out, path, outcome) {
                    write_error = Some(e);
                }
            }
        });
        if let Some(e) = write_error {
            return Err(e);
        }

        let report = match result {
            Ok(report) => report,
            Err(e) => return writeln!(out, "\nError: {e:#}"),
        };

        if report.images_found == 0 {
            writeln!(out, "No images found in {folder}")
        } else if report.saved == 0 {
            writeln!(out, "\nNo valid data extracted from any images")
        } else {
            writeln!(
                out,
                "\nSuccessfully processed {} of {} images. Data saved to {}",
                report.saved,
                report.images_found,
                pipeline.store().path().display()
            )
        }
    }

    /// Load the store for view/search, printing why it is unavailable
    fn load_table(&mut self) -> io::Result<Option<Table>> {
        match self.pipeline.store().load_existing() {
            Ok(table) => Ok(Some(table)),
            Err(StoreError::Missing { .. }) => {
                writeln!(self.output, "\nDatabase file not found. Please process images first")?;
                Ok(None)
            }
            Err(e) => {
                writeln!(self.output, "\nError: {e}")?;
                Ok(None)
            }
        }
    }

    fn view_records(&mut self) -> io::Result<()> {
        let Some(table) = self.load_table()? else {
            return Ok(());
        };
        if table.is_empty() {
            return writeln!(self.output, "\nNo records found in the database");
        }
        writeln!(self.output, "\nAll Service Orders:")?;
        write!(self.output, "{table}")
    }

    fn search_order(&mut self) -> io::Result<()> {
        let Some(table) = self.load_table()? else {
            return Ok(());
        };
        if table.is_empty() {
            return writeln!(self.output, "\nNo records available to search");
        }

        let Some(needle) = self.prompt("\nEnter Service Order ID to search: ")? else {
            return Ok(());
        };
        if needle.is_empty() {
            return writeln!(self.output, "Please enter a valid Service Order ID");
        }

        let hits = table.search(&needle, self.pipeline.config().search_scope);
        if hits.is_empty() {
            writeln!(self.output, "\nNo records found for Service Order ID: {needle}")
        } else {
            writeln!(self.output, "\nMatching Record(s):")?;
            write!(self.output, "{hits}")
        }
    }
}

fn report_image(out: &mut impl Write, path: &Path, outcome: &ImageOutcome) -> io::Result<()> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    writeln!(out, "\nProcessing {name}...")?;
    match outcome {
        ImageOutcome::Extracted(record) => {
            writeln!(out, "Extracted data:")?;
            for (key, value) in record.iter() {
                writeln!(out, "  {key}: {value}")?;
            }
            Ok(())
        }
        ImageOutcome::Empty { ocr_error: Some(e) } => {
            writeln!(out, "OCR failed for {name}: {e}")?;
            writeln!(out, "No data extracted from {name}")
        }
        ImageOutcome::Empty { ocr_error: None } => writeln!(out, "No data extracted from {name}"),
        ImageOutcome::Skipped(e) => writeln!(out, "Skipped {name}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_pipeline::ocr::OcrEngine;
    use form_pipeline::{Config, OcrError, Record, RecordStore};
    use image::{GrayImage, ImageBuffer, Rgb};

    struct FixedText(&'static str);

    impl OcrEngine for FixedText {
        fn recognize(&self, _image: &GrayImage) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    fn pipeline_in(dir: &Path, text: &'static str) -> Pipeline {
        let config = Config {
            image_folder: dir.join("images"),
            store_path: dir.join("service_orders.xlsx"),
            ..Config::default()
        };
        Pipeline::with_engine(config, Box::new(FixedText(text)))
    }

    fn run(pipeline: &Pipeline, input: &str) -> String {
        let mut output = Vec::new();
        Shell::new(pipeline, input.as_bytes(), &mut output)
            .run()
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    fn seed(pipeline: &Pipeline, rows: &[&[(&str, &str)]]) {
        let records: Vec<Record> = rows.iter().map(|r| r.iter().copied().collect()).collect();
        RecordStore::new(pipeline.config().store_path.clone())
            .append(&records)
            .unwrap();
    }

    #[test]
    fn test_menu_choice_parse() {
        assert_eq!(MenuChoice::parse(" 1 "), Some(MenuChoice::Process));
        assert_eq!(MenuChoice::parse("4"), Some(MenuChoice::Exit));
        assert_eq!(MenuChoice::parse("5"), None);
        assert_eq!(MenuChoice::parse(""), None);
    }

    #[test]
    fn test_exit_and_folder_creation() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(dir.path(), "");
        let out = run(&pipeline, "4\n");

        assert!(out.contains("Created images folder at:"));
        assert!(out.contains("1. Process Service Order Images"));
        assert!(out.contains("Goodbye!"));
        assert!(dir.path().join("images").is_dir());
    }

    #[test]
    fn test_end_of_input_exits() {
        let dir = tempfile::tempdir().unwrap();
        let out = run(&pipeline_in(dir.path(), ""), "");
        assert!(out.contains("Goodbye!"));
    }

    #[test]
    fn test_invalid_choice_reprompts() {
        let dir = tempfile::tempdir().unwrap();
        let out = run(&pipeline_in(dir.path(), ""), "9\n4\n");
        assert!(out.contains("Invalid option. Please choose 1-4"));
        assert_eq!(out.matches("4. Exit").count(), 2);
    }

    #[test]
    fn test_view_and_search_before_processing() {
        let dir = tempfile::tempdir().unwrap();
        let out = run(&pipeline_in(dir.path(), ""), "2\n3\n4\n");
        assert_eq!(
            out.matches("Database file not found. Please process images first").count(),
            2
        );
    }

    #[test]
    fn test_process_empty_folder() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(dir.path(), "");
        let out = run(&pipeline, "1\n4\n");
        assert!(out.contains("No images found in"));
        assert!(!pipeline.store().exists());
    }

    #[test]
    fn test_process_then_view_and_search() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(
            dir.path(),
            "Service Order ID: SO-100\nOwning Date: Ovminq Dalo 01/01/24\n",
        );
        std::fs::create_dir_all(dir.path().join("images")).unwrap();
        ImageBuffer::from_pixel(30, 30, Rgb([250u8, 250u8, 250u8]))
            .save(dir.path().join("images/form.png"))
            .unwrap();

        let out = run(&pipeline, "1\n2\n3\nSO-100\n3\nSO-999\n4\n");

        assert!(out.contains("Processing form.png..."));
        assert!(out.contains("  Owning Date: Owning Date 01/01/24"));
        assert!(out.contains("Successfully processed 1 of 1 images"));
        assert!(out.contains("All Service Orders:"));
        assert!(out.contains("Matching Record(s):"));
        assert!(out.contains("No records found for Service Order ID: SO-999"));
    }

    #[test]
    fn test_search_rejects_blank_needle() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(dir.path(), "");
        seed(&pipeline, &[&[("Service Order ID", "SO-1")]]);

        let out = run(&pipeline, "3\n   \n4\n");
        assert!(out.contains("Please enter a valid Service Order ID"));
    }

    #[test]
    fn test_view_lists_rows() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(dir.path(), "");
        seed(
            &pipeline,
            &[
                &[("Service Order ID", "SO-1"), ("City", "Oslo")],
                &[("Service Order ID", "SO-2")],
            ],
        );

        let out = run(&pipeline, "2\n4\n");
        assert!(out.contains("Service Order ID  City"));
        assert!(out.contains("SO-1              Oslo"));
        assert!(out.contains("SO-2"));
    }
}
