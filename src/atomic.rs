use std::{
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// A backing-store file that is only ever replaced whole.
///
/// Writes go to a temporary file next to the target which is then renamed
/// over it, so an interrupted write leaves the previous content in place.
#[derive(Debug, Clone)]
pub struct AtomicFile {
    path: PathBuf,
}

impl AtomicFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file, `None` if it does not exist.
    pub async fn read(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::read(&self.path, err)),
        }
    }

    /// Replaces the file with `contents`, creating parent directories.
    pub async fn write(&self, contents: String) -> Result<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, contents.as_bytes()))
            .await
            .map_err(|err| Error::persist(&self.path, std::io::Error::other(err)))?
            .map_err(|err| Error::persist(&self.path, err))
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;

    tmp.persist(path)?;

    Ok(())
}

/// Leading comment block of a document, up to the first line holding data.
pub(crate) fn comment_header(contents: &str) -> String {
    let mut header = String::new();
    for line in contents.lines() {
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with('#') {
            break;
        }
        header.push_str(line);
        header.push('\n');
    }

    // the blank lines directly above the data belong to the data
    let kept = header.trim_end().len();
    header.truncate(kept);
    if !header.is_empty() {
        header.push_str("\n\n");
    }
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = AtomicFile::new(dir.path().join("absent.toml"));
        assert_eq!(file.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn write_creates_parents_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = AtomicFile::new(dir.path().join("nested/state/config.toml"));

        file.write("a = 1\n".to_string()).await.unwrap();
        file.write("a = 2\n".to_string()).await.unwrap();

        assert_eq!(file.read().await.unwrap().as_deref(), Some("a = 2\n"));
        let entries = std::fs::read_dir(dir.path().join("nested/state")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn header_stops_at_first_data_line() {
        let text = "# title\n#\n# more\n\nversion = 1\n# trailing\n";
        assert_eq!(comment_header(text), "# title\n#\n# more\n\n");
        assert_eq!(comment_header("version = 1\n"), "");
    }
}
