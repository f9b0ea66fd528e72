//! Output sinks for extracted images.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Destination for named image payloads.
pub trait OutputSink {
    /// Write one file and return where it landed.
    ///
    /// A failure here costs only this file; the run continues.
    fn write(&mut self, filename: &str, data: &[u8]) -> Result<PathBuf>;
}

/// Writes files into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    created: bool,
}

impl DirectorySink {
    /// Create a sink targeting `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            created: false,
        }
    }

    /// The target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl OutputSink for DirectorySink {
    fn write(&mut self, filename: &str, data: &[u8]) -> Result<PathBuf> {
        let persist = |source| Error::Persist {
            filename: filename.to_string(),
            source,
        };

        if !self.created {
            fs::create_dir_all(&self.dir).map_err(persist)?;
            self.created = true;
        }

        let path = self.dir.join(filename);
        fs::write(&path, data).map_err(persist)?;
        log::debug!("Wrote {} ({} bytes)", path.display(), data.len());
        Ok(path)
    }
}

/// Keeps files in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: Vec<(String, Vec<u8>)>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Written files in order.
    pub fn files(&self) -> &[(String, Vec<u8>)] {
        &self.files
    }

    /// Written filenames in order.
    pub fn filenames(&self) -> Vec<&str> {
        self.files.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Payload of a written file.
    pub fn get(&self, filename: &str) -> Option<&[u8]> {
        self.files
            .iter()
            .find(|(name, _)| name == filename)
            .map(|(_, data)| data.as_slice())
    }
}

impl OutputSink for MemorySink {
    fn write(&mut self, filename: &str, data: &[u8]) -> Result<PathBuf> {
        self.files.push((filename.to_string(), data.to_vec()));
        Ok(PathBuf::from(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_sink_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("nested").join("images");
        let mut sink = DirectorySink::new(&out);

        let path = sink.write("CRL-M-1.png", &[1, 2, 3]).unwrap();
        assert_eq!(path, out.join("CRL-M-1.png"));
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_directory_sink_failure_is_persist_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, b"x").unwrap();

        // A regular file where the directory should be.
        let mut sink = DirectorySink::new(&blocker);
        let err = sink.write("CRL-M-1.png", &[0]).unwrap_err();
        assert!(matches!(err, Error::Persist { ref filename, .. } if filename == "CRL-M-1.png"));
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.write("a.png", &[1]).unwrap();
        sink.write("b.jpg", &[2, 3]).unwrap();
        assert_eq!(sink.filenames(), vec!["a.png", "b.jpg"]);
        assert_eq!(sink.get("b.jpg"), Some(&[2u8, 3][..]));
    }
}
