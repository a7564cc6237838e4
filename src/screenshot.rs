//! Screenshot queue access and batch loading.
//!
//! Capture and storage belong to the host application; this crate only sees
//! them through [`ScreenshotSource`]. [`load_batch`] turns the current queue
//! into base64-encoded [`ScreenshotInput`]s, silently dropping files that
//! vanished since they were queued.

use crate::error::{PipelineError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One screenshot, read and encoded for a provider call.
#[derive(Clone, PartialEq, Eq)]
pub struct ScreenshotInput {
    /// Where the screenshot was read from.
    pub path: PathBuf,
    /// MIME type inferred from the file extension.
    pub mime_type: &'static str,
    /// Standard base64 encoding of the file contents.
    pub image_base64: String,
}

impl ScreenshotInput {
    /// Encode raw image bytes read from `path`.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: &[u8]) -> Self {
        let path = path.into();
        Self {
            mime_type: mime_type_for(&path),
            image_base64: STANDARD.encode(bytes),
            path,
        }
    }
}

impl std::fmt::Debug for ScreenshotInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenshotInput")
            .field("path", &self.path)
            .field("mime_type", &self.mime_type)
            .field("base64_len", &self.image_base64.len())
            .finish()
    }
}

/// MIME type for an image path, by extension. Unknown extensions are sent as PNG.
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

/// Access to the host application's screenshot queues.
pub trait ScreenshotSource: Send + Sync {
    /// Paths in the primary queue, oldest first.
    fn list_queued(&self) -> Vec<PathBuf>;

    /// Read the bytes of one queued screenshot.
    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    /// Empty the secondary (follow-up/debug) queue.
    fn clear_secondary_queue(&self);
}

/// Load the primary queue as an ordered batch ready for extraction.
///
/// Paths that no longer exist, or can no longer be read, are dropped with a
/// warning. Returns [`PipelineError::NoScreenshots`] when nothing is left.
pub fn load_batch(source: &dyn ScreenshotSource) -> Result<Vec<ScreenshotInput>> {
    let queued = source.list_queued();
    let mut batch = Vec::with_capacity(queued.len());

    for path in queued {
        if !path.exists() {
            log::warn!("[SCREENSHOTS] Dropping missing screenshot {}", path.display());
            continue;
        }
        match source.read_bytes(&path) {
            Ok(bytes) => batch.push(ScreenshotInput::from_bytes(path, &bytes)),
            Err(e) => {
                log::warn!(
                    "[SCREENSHOTS] Dropping unreadable screenshot {}: {}",
                    path.display(),
                    e
                );
            }
        }
    }

    if batch.is_empty() {
        return Err(PipelineError::NoScreenshots);
    }
    log::debug!("[SCREENSHOTS] Loaded batch of {} screenshot(s)", batch.len());
    Ok(batch)
}

#[derive(Debug, Default)]
struct Queues {
    primary: Vec<PathBuf>,
    secondary: Vec<PathBuf>,
}

/// A simple in-memory [`ScreenshotSource`] over files on disk.
///
/// # Example
///
/// ```
/// use screen_solve::screenshot::{QueueScreenshotSource, ScreenshotSource};
///
/// let source = QueueScreenshotSource::new();
/// source.push("/tmp/shot-1.png");
/// assert_eq!(source.list_queued().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct QueueScreenshotSource {
    queues: Mutex<Queues>,
}

impl QueueScreenshotSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a path to the primary queue.
    pub fn push(&self, path: impl Into<PathBuf>) {
        self.lock().primary.push(path.into());
    }

    /// Append a path to the secondary queue.
    pub fn push_secondary(&self, path: impl Into<PathBuf>) {
        self.lock().secondary.push(path.into());
    }

    /// Paths in the secondary queue.
    pub fn secondary(&self) -> Vec<PathBuf> {
        self.lock().secondary.clone()
    }

    /// Remove a path from both queues. Returns whether it was queued.
    pub fn remove(&self, path: &Path) -> bool {
        let mut queues = self.lock();
        let before = queues.primary.len() + queues.secondary.len();
        queues.primary.retain(|p| p != path);
        queues.secondary.retain(|p| p != path);
        before != queues.primary.len() + queues.secondary.len()
    }

    /// Empty both queues.
    pub fn clear(&self) {
        let mut queues = self.lock();
        queues.primary.clear();
        queues.secondary.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Queues> {
        self.queues.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ScreenshotSource for QueueScreenshotSource {
    fn list_queued(&self) -> Vec<PathBuf> {
        self.lock().primary.clone()
    }

    fn clear_secondary_queue(&self) {
        self.lock().secondary.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio_test::assert_err;

    fn write_png(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn test_mime_type_by_extension() {
        assert_eq!(mime_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_type_for(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_type_for(Path::new("no_extension")), "image/png");
    }

    #[test]
    fn test_load_batch_encodes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let source = QueueScreenshotSource::new();
        source.push(write_png(&dir, "1.png", b"first"));
        source.push(write_png(&dir, "2.jpg", b"second"));

        let batch = load_batch(&source).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].image_base64, STANDARD.encode(b"first"));
        assert_eq!(batch[0].mime_type, "image/png");
        assert_eq!(batch[1].image_base64, STANDARD.encode(b"second"));
        assert_eq!(batch[1].mime_type, "image/jpeg");
    }

    #[test]
    fn test_load_batch_drops_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = QueueScreenshotSource::new();
        source.push(dir.path().join("gone.png"));
        source.push(write_png(&dir, "kept.png", b"kept"));

        let batch = load_batch(&source).unwrap();
        assert_eq!(batch.len(), 1);
        assert!(batch[0].path.ends_with("kept.png"));
    }

    #[test]
    fn test_load_batch_all_missing_is_no_screenshots() {
        let dir = tempfile::tempdir().unwrap();
        let source = QueueScreenshotSource::new();
        source.push(dir.path().join("gone-1.png"));
        source.push(dir.path().join("gone-2.png"));

        let err = assert_err!(load_batch(&source));
        assert!(matches!(err, PipelineError::NoScreenshots));
    }

    #[test]
    fn test_load_batch_empty_queue() {
        let source = QueueScreenshotSource::new();
        assert!(matches!(load_batch(&source), Err(PipelineError::NoScreenshots)));
    }

    #[test]
    fn test_queue_management() {
        let source = QueueScreenshotSource::new();
        source.push("/a.png");
        source.push_secondary("/b.png");
        assert!(source.remove(Path::new("/a.png")));
        assert!(!source.remove(Path::new("/a.png")));

        source.clear_secondary_queue();
        assert!(source.secondary().is_empty());
        assert!(source.list_queued().is_empty());
    }

    #[test]
    fn test_debug_omits_image_data() {
        let input = ScreenshotInput::from_bytes("/x.png", b"secret-bytes");
        let debug_output = format!("{:?}", input);
        assert!(!debug_output.contains(&input.image_base64));
        assert!(debug_output.contains("base64_len"));
    }
}
