//! Client-side holding area for files selected before upload.

use std::path::{Path, PathBuf};

use crate::core::errors::{ClientError, ClientResult};

/// A file the user selected for upload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StagedFile {
    /// Location of the file on disk.
    pub path: PathBuf,
    /// Name shown to the user and sent as the multipart file name.
    pub name: String,
}

impl StagedFile {
    /// Stage a file under its own file name.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path.file_name().map_or_else(
            || path.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        );
        Self { path, name }
    }

    /// Stage a file under an explicit display name.
    #[must_use]
    pub fn with_name(path: impl AsRef<Path>, name: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            name: name.into(),
        }
    }
}

/// Ordered buffer of staged files.
///
/// Duplicates are allowed; nothing is validated here (size and type limits
/// belong to the backend).
#[derive(Clone, Debug, Default)]
pub struct StagingBuffer {
    files: Vec<StagedFile>,
}

impl StagingBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Append files, keeping their order.
    pub fn add(&mut self, files: impl IntoIterator<Item = StagedFile>) {
        self.files.extend(files);
    }

    /// Remove the file at `index`, shifting later files down.
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` if no file is staged at `index`.
    pub fn remove(&mut self, index: usize) -> ClientResult<StagedFile> {
        if index >= self.files.len() {
            return Err(ClientError::IndexOutOfRange {
                index,
                len: self.files.len(),
            });
        }
        Ok(self.files.remove(index))
    }

    /// Drop every staged file.
    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// Number of staged files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Staged files in order.
    #[must_use]
    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    /// Iterate over staged files in order.
    pub fn iter(&self) -> std::slice::Iter<'_, StagedFile> {
        self.files.iter()
    }

    /// Display names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a StagingBuffer {
    type Item = &'a StagedFile;
    type IntoIter = std::slice::Iter<'a, StagedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged(names: &[&str]) -> Vec<StagedFile> {
        names.iter().map(|n| StagedFile::new(format!("/docs/{n}"))).collect()
    }

    #[test]
    fn test_add_preserves_order_and_duplicates() {
        let mut buffer = StagingBuffer::new();
        buffer.add(staged(&["a.pdf", "b.pdf"]));
        buffer.add(staged(&["a.pdf"]));

        assert_eq!(buffer.names(), vec!["a.pdf", "b.pdf", "a.pdf"]);
        assert_eq!(buffer.files()[0].path, PathBuf::from("/docs/a.pdf"));
        assert_eq!(buffer.iter().filter(|f| f.name == "a.pdf").count(), 2);
        let mut seen = 0;
        for file in &buffer {
            assert!(file.path.starts_with("/docs"));
            seen += 1;
        }
        assert_eq!(seen, 3);
    }

    #[test]
    fn test_remove_shifts_indices() {
        let mut buffer = StagingBuffer::new();
        buffer.add(staged(&["a.pdf", "b.pdf", "c.pdf"]));

        let removed = buffer.remove(1).unwrap();
        assert_eq!(removed.name, "b.pdf");
        assert_eq!(buffer.names(), vec!["a.pdf", "c.pdf"]);

        buffer.remove(1).unwrap();
        assert_eq!(buffer.names(), vec!["a.pdf"]);
    }

    #[test]
    fn test_remove_out_of_range_is_an_error() {
        let mut buffer = StagingBuffer::new();
        buffer.add(staged(&["a.pdf"]));

        let err = buffer.remove(1).unwrap_err();
        assert!(matches!(err, ClientError::IndexOutOfRange { index: 1, len: 1 }));
        assert_eq!(buffer.len(), 1);

        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.remove(0).is_err());
    }

    #[test]
    fn test_interleaved_add_remove_keeps_relative_order() {
        // Track insertion sequence numbers alongside the buffer and compare
        // after every operation.
        let ops: &[(bool, usize)] = &[
            (true, 0),
            (true, 1),
            (true, 2),
            (false, 1),
            (true, 3),
            (false, 0),
            (true, 4),
            (true, 5),
            (false, 2),
            (false, 7),
            (true, 6),
            (false, 0),
        ];
        let mut buffer = StagingBuffer::new();
        let mut model: Vec<usize> = Vec::new();

        for &(is_add, value) in ops {
            if is_add {
                buffer.add([StagedFile::with_name("/docs/x", value.to_string())]);
                model.push(value);
            } else if value < model.len() {
                buffer.remove(value).unwrap();
                model.remove(value);
            } else {
                assert!(buffer.remove(value).is_err());
            }
            let expected: Vec<String> = model.iter().map(ToString::to_string).collect();
            assert_eq!(buffer.names(), expected);
        }

        assert!(model.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_display_name_falls_back_to_path() {
        let file = StagedFile::new("/");
        assert_eq!(file.name, "/");
    }
}
