//! Script source files on disk

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// A Lua source file and the modification time it was read at
#[derive(Debug, Clone)]
pub struct ScriptFile {
    /// Path to the script file
    pub path: PathBuf,
    /// Source text as last read
    pub source: String,
    /// Last modification time
    pub modified: Option<SystemTime>,
}

impl ScriptFile {
    /// Read a script from disk
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(Error::ScriptNotFound(path.display().to_string()));
        }
        let source = std::fs::read_to_string(&path)?;
        let modified = modified_time(&path);
        debug!(path = %path.display(), bytes = source.len(), "loaded script");
        Ok(Self {
            path,
            source,
            modified,
        })
    }

    /// Chunk name used in error messages: the file name
    pub fn chunk_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Check if the file has been modified since it was read
    pub fn is_modified(&self) -> bool {
        match (self.modified, modified_time(&self.path)) {
            (Some(original), Some(current)) => current > original,
            _ => false,
        }
    }

    /// Re-read the file if it changed; returns whether it did
    pub fn reload_if_modified(&mut self) -> Result<bool> {
        if !self.is_modified() {
            return Ok(false);
        }
        self.reload()?;
        Ok(true)
    }

    /// Re-read the file unconditionally
    pub fn reload(&mut self) -> Result<()> {
        self.source = std::fs::read_to_string(&self.path)?;
        self.modified = modified_time(&self.path);
        debug!(path = %self.path.display(), "reloaded script");
        Ok(())
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_reads_source() {
        let mut file = tempfile::Builder::new().suffix(".lua").tempfile().unwrap();
        write!(file, "return 1").unwrap();
        let script = ScriptFile::load(file.path()).unwrap();
        assert_eq!(script.source, "return 1");
        assert!(script.chunk_name().ends_with(".lua"));
        assert!(!script.is_modified());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ScriptFile::load(dir.path().join("nope.lua")).unwrap_err();
        assert!(matches!(err, Error::ScriptNotFound(_)));
    }

    #[test]
    fn test_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.lua");
        std::fs::write(&path, "return 1").unwrap();
        let mut script = ScriptFile::load(&path).unwrap();

        std::fs::write(&path, "return 2").unwrap();
        script.reload().unwrap();
        assert_eq!(script.source, "return 2");
        assert_eq!(script.chunk_name(), "panel.lua");
    }
}
