//! Directory-backed media source
//!
//! Desktop hosts have no media database, so the library is whatever photo and
//! video files live under a set of root directories.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::{DynAsyncRead, LocalItem, LocalMediaSource},
};
use tokio::fs;
use tracing::{debug, instrument, warn};

/// Extensions recognised as media, with the MIME type sent on upload.
const MEDIA_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
    ("dng", "image/x-adobe-dng"),
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mov", "video/quicktime"),
    ("3gp", "video/3gpp"),
    ("webm", "video/webm"),
    ("mkv", "video/x-matroska"),
];

/// MIME type for a media file path, `None` if the extension is not media.
pub fn media_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    MEDIA_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// Media source walking one or more root directories.
///
/// Traversal is depth-first. Within a directory, files are listed before
/// subdirectories and both are sorted by file name, so the resulting order is
/// stable while the tree is unchanged. Hidden entries and symlinks are skipped.
#[derive(Debug, Clone)]
pub struct DirectoryMediaSource {
    roots: Vec<PathBuf>,
}

impl DirectoryMediaSource {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Source over the user's picture and video directories, when the
    /// platform defines them.
    pub fn with_default_roots() -> Self {
        let roots = [dirs::picture_dir(), dirs::video_dir()]
            .into_iter()
            .flatten()
            .collect();
        Self::new(roots)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    async fn walk_root(&self, root: &Path, items: &mut Vec<LocalItem>) -> Result<()> {
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = Vec::new();
            let mut reader = fs::read_dir(&dir).await.map_err(|e| map_open_error(&dir, e))?;
            while let Some(entry) = reader.next_entry().await? {
                entries.push(entry);
            }
            entries.sort_by_key(|entry| entry.file_name());

            let mut subdirs = Vec::new();
            for entry in entries {
                let file_name = entry.file_name();
                let Some(name) = file_name.to_str() else {
                    warn!(path = ?entry.path(), "Skipping entry with non UTF-8 name");
                    continue;
                };
                if name.starts_with('.') {
                    continue;
                }

                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    subdirs.push(path);
                } else if file_type.is_file() {
                    if let Some(content_type) = media_content_type(&path) {
                        let size = entry.metadata().await?.len();
                        items.push(LocalItem::new(
                            name,
                            size,
                            content_type,
                            path.to_string_lossy(),
                        ));
                    }
                }
            }

            // Reverse so the alphabetically first subdirectory is visited next.
            pending.extend(subdirs.into_iter().rev());
        }

        Ok(())
    }
}

fn map_open_error(path: &Path, e: std::io::Error) -> BridgeError {
    if e.kind() == ErrorKind::NotFound {
        BridgeError::NotFound(path.display().to_string())
    } else {
        BridgeError::OperationFailed(format!("Cannot read {}: {}", path.display(), e))
    }
}

#[async_trait]
impl LocalMediaSource for DirectoryMediaSource {
    #[instrument(skip(self), fields(roots = self.roots.len()))]
    async fn enumerate_items(&self) -> Result<Vec<LocalItem>> {
        let mut items = Vec::new();
        for root in &self.roots {
            self.walk_root(root, &mut items).await?;
        }
        debug!(count = items.len(), "Enumerated local media");
        Ok(items)
    }

    async fn open_stream(&self, item: &LocalItem) -> Result<Box<DynAsyncRead>> {
        let path = Path::new(&item.locator);
        let file = fs::File::open(path)
            .await
            .map_err(|e| map_open_error(path, e))?;
        debug!(path = ?path, "Opened media file for reading");
        Ok(Box::new(file))
    }
}
