use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::{
    error::{AnnotationError, Result},
    types::DatasetEntry,
};

/// File extensions used to pair annotation files with their images
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryOptions {
    pub annotation_extension: String,
    pub image_extension: String,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            annotation_extension: "json".to_string(),
            image_extension: "png".to_string(),
        }
    }
}

/// Find every annotation file under `root` and pair it with its image.
///
/// The image path is the annotation path with its extension swapped. Entries
/// come out in depth-first order with each directory's contents sorted by
/// file name, so the same tree always yields the same sequence.
pub fn discover(root: impl AsRef<Path>, options: &DiscoveryOptions) -> Result<Vec<DatasetEntry>> {
    let root = root.as_ref();
    let mut entries = Vec::new();

    for item in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let item = match item {
            Ok(item) => item,
            // an unreadable root is fatal, anything below it is skipped
            Err(err) if err.depth() > 0 => {
                warn!(error = %err, "Skipping unreadable dataset path");
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        let path = item.path();
        if !item.file_type().is_file() || !has_extension(path, &options.annotation_extension) {
            continue;
        }

        let image_path = path.with_extension(&options.image_extension);
        if !image_path.is_file() {
            warn!(annotation = %path.display(), image = %image_path.display(), "Image for annotation file not found");
        }
        entries.push(DatasetEntry::new(image_path, path));
    }

    info!(root = %root.display(), entries = entries.len(), "Discovered dataset");
    Ok(entries)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(extension)
}

/// Ordered dataset entries with a current position.
///
/// Moving the position goes through a reload callback; the position only
/// changes when the callback succeeds, so the cursor never points at an
/// entry that failed to load.
#[derive(Debug, Clone)]
pub struct DatasetCursor {
    entries: Vec<DatasetEntry>,
    position: usize,
}

impl DatasetCursor {
    pub fn new(entries: Vec<DatasetEntry>) -> Self {
        Self { entries, position: 0 }
    }

    /// Discover `root` and position the cursor on the first entry
    pub fn discover(root: impl AsRef<Path>, options: &DiscoveryOptions) -> Result<Self> {
        Ok(Self::new(discover(root, options)?))
    }

    pub fn entries(&self) -> &[DatasetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_first(&self) -> bool {
        self.position == 0
    }

    pub fn is_last(&self) -> bool {
        self.position + 1 >= self.entries.len()
    }

    pub fn current(&self) -> Result<&DatasetEntry> {
        self.entries.get(self.position).ok_or(AnnotationError::EmptyDataset)
    }

    /// Move to the next entry; returns `Ok(false)` without calling `reload` at the last entry
    pub fn advance<F, E>(&mut self, reload: F) -> std::result::Result<bool, E>
    where
        F: FnOnce(&DatasetEntry) -> std::result::Result<(), E>,
    {
        if self.is_last() {
            return Ok(false);
        }
        self.move_to(self.position + 1, reload)
    }

    /// Move to the previous entry; returns `Ok(false)` without calling `reload` at index 0
    pub fn retreat<F, E>(&mut self, reload: F) -> std::result::Result<bool, E>
    where
        F: FnOnce(&DatasetEntry) -> std::result::Result<(), E>,
    {
        if self.is_first() {
            return Ok(false);
        }
        self.move_to(self.position - 1, reload)
    }

    /// Jump to `index`, reloading even when it is the current position
    pub fn seek<F>(&mut self, index: usize, reload: F) -> Result<()>
    where
        F: FnOnce(&DatasetEntry) -> Result<()>,
    {
        if index >= self.entries.len() {
            return Err(AnnotationError::EntryOutOfRange { index, len: self.entries.len() });
        }
        self.move_to(index, reload).map(|_| ())
    }

    fn move_to<F, E>(&mut self, index: usize, reload: F) -> std::result::Result<bool, E>
    where
        F: FnOnce(&DatasetEntry) -> std::result::Result<(), E>,
    {
        reload(&self.entries[index])?;
        self.position = index;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn cursor(n: usize) -> DatasetCursor {
        DatasetCursor::new(
            (0..n)
                .map(|i| DatasetEntry::new(format!("{i}.png"), format!("{i}.json")))
                .collect(),
        )
    }

    fn ok(_: &DatasetEntry) -> std::result::Result<(), ()> {
        Ok(())
    }

    #[test]
    fn test_empty_cursor() {
        let mut cursor = cursor(0);
        assert!(matches!(cursor.current(), Err(AnnotationError::EmptyDataset)));
        assert_eq!(cursor.advance(ok), Ok(false));
        assert_eq!(cursor.retreat(ok), Ok(false));
    }

    #[test]
    fn test_clamped_navigation() {
        let mut cursor = cursor(3);
        assert_eq!(cursor.retreat(ok), Ok(false));
        assert_eq!(cursor.position(), 0);

        let mut reloaded = Vec::new();
        for _ in 0..5 {
            cursor
                .advance(|entry| {
                    reloaded.push(entry.annotation_path.clone());
                    Ok::<_, ()>(())
                })
                .unwrap();
        }
        assert_eq!(cursor.position(), 2);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(cursor.current().unwrap().annotation_path, Path::new("2.json"));

        assert_eq!(cursor.retreat(ok), Ok(true));
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn test_failed_reload_keeps_position() {
        let mut cursor = cursor(2);
        assert_eq!(cursor.advance(|_| Err("broken")), Err("broken"));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_seek() {
        let mut cursor = cursor(3);
        cursor.seek(2, |_| Ok(())).unwrap();
        assert_eq!(cursor.position(), 2);
        assert!(matches!(
            cursor.seek(3, |_| Ok(())),
            Err(AnnotationError::EntryOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_discover_pairs_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b")).unwrap();
        for name in ["b/z.json", "b/z.png", "c.json", "c.png", "a.json", "notes.txt", "a.png"] {
            fs::write(root.join(name), "").unwrap();
        }

        let entries = discover(root, &DiscoveryOptions::default()).unwrap();
        let annotations: Vec<_> = entries
            .iter()
            .map(|e| e.annotation_path.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            annotations,
            vec![Path::new("a.json"), Path::new("b/z.json"), Path::new("c.json")]
        );
        assert_eq!(entries[1].image_path, root.join("b/z.png"));
    }

    #[test]
    fn test_discover_custom_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x.ann"), "").unwrap();
        fs::write(dir.path().join("y.json"), "").unwrap();

        let options = DiscoveryOptions {
            annotation_extension: "ann".to_string(),
            image_extension: "jpg".to_string(),
        };
        let entries = discover(dir.path(), &options).unwrap();
        assert_eq!(entries, vec![DatasetEntry::new(dir.path().join("x.jpg"), dir.path().join("x.ann"))]);
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_skips_symlink_loop() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("a.json"), "").unwrap();
        fs::write(root.join("a.png"), "").unwrap();
        fs::write(root.join("sub/b.json"), "").unwrap();
        std::os::unix::fs::symlink(root, root.join("sub/loop")).unwrap();

        let entries = discover(root, &DiscoveryOptions::default()).unwrap();
        assert_eq!(
            entries,
            vec![
                DatasetEntry::new(root.join("a.png"), root.join("a.json")),
                DatasetEntry::new(root.join("sub/b.png"), root.join("sub/b.json")),
            ]
        );
    }

    #[test]
    fn test_discover_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover(dir.path().join("nope"), &DiscoveryOptions::default()).err().unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::Io);
    }
}
