use anyhow::{Context, Result, bail};
use arboard::Clipboard;

/// Maximum clipboard size (10MB)
const MAX_CLIPBOARD_SIZE: usize = 10 * 1024 * 1024;

/// Destination of the `copy` command (allows swapping the system clipboard out in tests)
pub trait ClipboardProvider {
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// System clipboard through arboard, opened on first use so headless sessions only fail when
/// something is actually copied
#[derive(Default)]
pub struct SystemClipboard {
    clipboard: Option<Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardProvider for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        if self.clipboard.is_none() {
            self.clipboard = Some(Clipboard::new().context("Failed to initialize clipboard")?);
        }
        if let Some(clipboard) = &mut self.clipboard {
            clipboard.set_text(text).context("Failed to set clipboard contents")?;
        }
        Ok(())
    }
}

/// Keeps the last copied text in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    text: Option<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

impl ClipboardProvider for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        self.text = Some(text.to_string());
        Ok(())
    }
}

/// Validates clipboard text without accessing the clipboard
fn validate_clipboard_text(text: &str) -> Result<()> {
    if text.is_empty() {
        bail!("Cannot copy empty text to clipboard");
    }

    if text.len() > MAX_CLIPBOARD_SIZE {
        bail!("Text too large for clipboard ({} bytes, max {})", text.len(), MAX_CLIPBOARD_SIZE);
    }

    Ok(())
}

/// Validate `text`, then hand it to `provider`.
///
/// # Errors
/// Returns error if:
/// - Text is empty
/// - Text is too large for clipboard (>10MB)
/// - The provider fails (clipboard locked, access denied, no display in a headless session)
pub fn copy_with_provider(text: &str, provider: &mut dyn ClipboardProvider) -> Result<()> {
    validate_clipboard_text(text)?;
    provider.set_text(text)
}
