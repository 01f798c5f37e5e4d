//! Boundary adapters: system clipboard and file output.

use crate::docx::package::DocxError;
use crate::docx::{package, Paragraph};
use anyhow::Context;
use std::fs;
use std::path::Path;

/// Minimal clipboard surface, so the fallback policy is testable apart from
/// the system clipboard.
pub(crate) trait ClipboardSink {
    type Err: std::fmt::Display;

    fn write_html(&mut self, html: &str, alt_text: &str) -> Result<(), Self::Err>;
    fn write_text(&mut self, text: &str) -> Result<(), Self::Err>;
}

impl ClipboardSink for arboard::Clipboard {
    type Err = arboard::Error;

    fn write_html(&mut self, html: &str, alt_text: &str) -> Result<(), arboard::Error> {
        self.set_html(html, Some(alt_text))
    }

    fn write_text(&mut self, text: &str) -> Result<(), arboard::Error> {
        self.set_text(text)
    }
}

/// Places HTML on the system clipboard with a plain-text alternate, so the
/// paste target can pick whichever flavor it understands. A clipboard that
/// rejects the HTML flavor degrades to a plain-text write; the operation
/// counts as successful if either write lands, and `false` means nothing
/// reached the clipboard. Never panics: clipboard access is an environment
/// concern, not a conversion failure.
pub fn copy_word_html(html: &str, plain_text: &str) -> bool {
    let mut clipboard = match arboard::Clipboard::new() {
        Ok(clipboard) => clipboard,
        Err(err) => {
            log::warn!("clipboard unavailable: {err}");
            return false;
        }
    };
    copy_with_fallback(&mut clipboard, html, plain_text)
}

fn copy_with_fallback<S: ClipboardSink>(sink: &mut S, html: &str, plain_text: &str) -> bool {
    match sink.write_html(html, plain_text) {
        Ok(()) => true,
        Err(err) => {
            log::warn!("HTML clipboard flavor rejected, falling back to text: {err}");
            match sink.write_text(plain_text) {
                Ok(()) => true,
                Err(err) => {
                    log::warn!("plain-text clipboard fallback failed: {err}");
                    false
                }
            }
        }
    }
}

/// Serializes the document and writes it to `path`.
pub fn save_docx(path: &Path, paragraphs: &[Paragraph]) -> anyhow::Result<()> {
    let bytes = docx_bytes(paragraphs)?;
    fs::write(path, bytes).with_context(|| format!("could not write {}", path.display()))?;
    Ok(())
}

/// Serializes the document to docx bytes without touching the filesystem.
pub fn docx_bytes(paragraphs: &[Paragraph]) -> Result<Vec<u8>, DocxError> {
    package::write_docx(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::build_document;
    use crate::tokenize;

    struct FakeClipboard {
        html_fails: bool,
        text_fails: bool,
        text_written: Option<String>,
    }

    impl FakeClipboard {
        fn new(html_fails: bool, text_fails: bool) -> Self {
            FakeClipboard {
                html_fails,
                text_fails,
                text_written: None,
            }
        }
    }

    impl ClipboardSink for FakeClipboard {
        type Err = String;

        fn write_html(&mut self, _html: &str, _alt_text: &str) -> Result<(), String> {
            if self.html_fails {
                Err("no html flavor".to_string())
            } else {
                Ok(())
            }
        }

        fn write_text(&mut self, text: &str) -> Result<(), String> {
            if self.text_fails {
                Err("no clipboard".to_string())
            } else {
                self.text_written = Some(text.to_string());
                Ok(())
            }
        }
    }

    #[test]
    fn html_write_succeeds_without_fallback() {
        let mut clipboard = FakeClipboard::new(false, false);
        assert!(copy_with_fallback(&mut clipboard, "<b>x</b>", "x"));
        assert_eq!(clipboard.text_written, None);
    }

    #[test]
    fn plain_text_fallback_counts_as_success() {
        let mut clipboard = FakeClipboard::new(true, false);
        assert!(copy_with_fallback(&mut clipboard, "<b>x</b>", "x"));
        assert_eq!(clipboard.text_written.as_deref(), Some("x"));
    }

    #[test]
    fn both_writes_failing_reports_failure() {
        let mut clipboard = FakeClipboard::new(true, true);
        assert!(!copy_with_fallback(&mut clipboard, "<b>x</b>", "x"));
    }

    #[test]
    fn save_docx_writes_a_zip_file() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("mathdown-test-{}.docx", crate::token::new_id()));

        let doc = build_document(&tokenize("hello $x$"));
        save_docx(&path, &doc).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], b"PK");
        fs::remove_file(&path).ok();
    }
}
