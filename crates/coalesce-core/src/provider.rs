//! Capabilities the operations call through to obtain paths and consent.
//!
//! Interactive callers plug in the prompt-based providers; scripted callers
//! use [`StaticPaths`] with [`AssumeYes`] or [`AssumeNo`].

use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Answers "may I proceed?" before a destructive or writing run.
pub trait ConfirmationProvider {
    /// Ask the user to confirm `prompt`. `Ok(false)` means do not proceed.
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Supplies the source roots and destination of a run.
pub trait PathProvider {
    /// Destination directory, if the provider has one.
    fn destination(&mut self) -> Result<Option<PathBuf>>;

    /// Source roots in processing order.
    fn source_roots(&mut self) -> Result<Vec<PathBuf>>;
}

/// Always confirms.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl ConfirmationProvider for AssumeYes {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Never confirms; runs stay in listing/plan mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeNo;

impl ConfirmationProvider for AssumeNo {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Asks on a line-oriented reader, typically stdin.
///
/// Only `yes` or `y` (any case) count as confirmation.
pub struct PromptConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
    /// Create a prompt reading answers from `input` and writing to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> ConfirmationProvider for PromptConfirm<R, W> {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        write!(self.output, "{prompt} (yes/no): ").map_err(prompt_err)?;
        self.output.flush().map_err(prompt_err)?;

        let answer = read_trimmed_line(&mut self.input)?;
        Ok(matches!(answer.to_lowercase().as_str(), "yes" | "y"))
    }
}

/// Paths fixed up front, from the command line or a config file.
#[derive(Debug, Clone, Default)]
pub struct StaticPaths {
    destination: Option<PathBuf>,
    sources: Vec<PathBuf>,
}

impl StaticPaths {
    /// Create a provider returning the given paths.
    pub fn new(destination: Option<PathBuf>, sources: Vec<PathBuf>) -> Self {
        Self {
            destination,
            sources,
        }
    }
}

impl PathProvider for StaticPaths {
    fn destination(&mut self) -> Result<Option<PathBuf>> {
        Ok(self.destination.clone())
    }

    fn source_roots(&mut self) -> Result<Vec<PathBuf>> {
        Ok(self.sources.clone())
    }
}

/// Asks for the destination, then for source folders one per line until an
/// empty line. Folders that do not exist are rejected and asked again.
pub struct PromptPaths<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptPaths<R, W> {
    /// Create a prompt reading answers from `input` and writing to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question}").map_err(prompt_err)?;
        self.output.flush().map_err(prompt_err)?;
        read_trimmed_line(&mut self.input)
    }
}

impl<R: BufRead, W: Write> PathProvider for PromptPaths<R, W> {
    fn destination(&mut self) -> Result<Option<PathBuf>> {
        let answer = self.ask("Enter destination folder path for consolidated files: ")?;
        Ok((!answer.is_empty()).then(|| PathBuf::from(answer)))
    }

    fn source_roots(&mut self) -> Result<Vec<PathBuf>> {
        writeln!(
            self.output,
            "Enter source folders (one per line, empty line to finish):"
        )
        .map_err(prompt_err)?;

        let mut sources = Vec::new();
        loop {
            let answer = self.ask("Source folder: ")?;
            if answer.is_empty() {
                break;
            }
            let path = PathBuf::from(&answer);
            if path.is_dir() {
                writeln!(self.output, "  Added: {answer}").map_err(prompt_err)?;
                sources.push(path);
            } else {
                writeln!(self.output, "  Folder not found: {answer}").map_err(prompt_err)?;
            }
        }
        Ok(sources)
    }
}

/// Read one line; end of input reads as an empty answer.
fn read_trimmed_line<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    input.read_line(&mut line).map_err(prompt_err)?;
    Ok(line.trim().to_string())
}

fn prompt_err(source: std::io::Error) -> Error {
    Error::Prompt { source }
}
