//! Fenced code blocks: copying through the terminal clipboard and
//! previewing HTML in a browser from a sandboxed temp file.

use std::io::{self, Write};
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as base64_engine, Engine};
use tempfile::NamedTempFile;

use crate::error::ChatError;

/// Restricts a previewed page to inline scripts and styles: no network access.
const PREVIEW_POLICY: &str = "<meta http-equiv=\"Content-Security-Policy\" \
    content=\"default-src 'none'; script-src 'unsafe-inline'; style-src 'unsafe-inline'; img-src data:\">";

/// How a code block is currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// The raw source.
    Source,
    /// The rendered HTML page.
    Preview,
}

/// A fenced code block from a model reply.
#[derive(Debug)]
pub struct CodeBlock {
    language: String,
    code: String,
    copied: bool,
    preview: Option<HtmlPreview>,
}

impl CodeBlock {
    /// Creates a block; an empty language becomes `text` and one trailing
    /// newline is removed from the code.
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        let language = language.into();
        let mut code = code.into();
        if code.ends_with('\n') {
            code.pop();
        }
        Self {
            language: if language.trim().is_empty() {
                "text".to_string()
            } else {
                language.trim().to_string()
            },
            code,
            copied: false,
            preview: None,
        }
    }

    /// The language label.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// The source exactly as the model wrote it.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Only HTML blocks can be previewed.
    pub fn is_html(&self) -> bool {
        self.language.eq_ignore_ascii_case("html")
    }

    /// The current view mode.
    pub fn view_mode(&self) -> ViewMode {
        if self.preview.is_some() {
            ViewMode::Preview
        } else {
            ViewMode::Source
        }
    }

    /// Switches to the rendered preview, writing the page if needed.
    ///
    /// # Errors
    ///
    /// Fails for non-HTML blocks or if the preview file cannot be written.
    pub fn show_preview(&mut self) -> Result<&HtmlPreview, ChatError> {
        if !self.is_html() {
            return Err(ChatError::new(format!(
                "Preview is only available for HTML blocks, this one is {}",
                self.language
            )));
        }
        let preview = match self.preview.take() {
            Some(preview) => preview,
            None => HtmlPreview::open(&self.code)?,
        };
        Ok(self.preview.insert(preview))
    }

    /// Switches back to the source view, discarding the preview page.
    pub fn show_source(&mut self) {
        self.preview = None;
    }

    /// The open preview, if in preview mode.
    pub fn preview(&self) -> Option<&HtmlPreview> {
        self.preview.as_ref()
    }

    /// Marks the block as copied and returns the original source.
    pub fn copy(&mut self) -> &str {
        self.copied = true;
        &self.code
    }

    /// Returns `true` if the block was copied since the last reset.
    pub fn is_copied(&self) -> bool {
        self.copied
    }

    /// Clears the copied indicator.
    pub fn reset_copied(&mut self) {
        self.copied = false;
    }

    /// The OSC 52 escape sequence putting the source on the terminal's clipboard.
    pub fn osc52(&self) -> String {
        format!("\x1b]52;c;{}\x07", base64_engine.encode(&self.code))
    }
}

/// A rendered HTML page in a private temporary file, removed on drop.
#[derive(Debug)]
pub struct HtmlPreview {
    file: NamedTempFile,
}

impl HtmlPreview {
    /// Writes `html` behind a restrictive content security policy.
    pub fn open(html: &str) -> io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("multimodal-preview-")
            .suffix(".html")
            .tempfile()?;
        writeln!(file, "{PREVIEW_POLICY}")?;
        file.write_all(html.as_bytes())?;
        file.flush()?;
        Ok(Self { file })
    }

    /// Where the page lives.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// A `file://` URL for opening the page in a browser.
    pub fn url(&self) -> String {
        format!("file://{}", self.path().display())
    }
}
