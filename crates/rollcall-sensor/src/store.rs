//! Local template file store.
//!
//! One file per enrolled student, `<student id>.dat`, holding the raw
//! sensor template bytes. Files are created by successful enrollment,
//! read by every verification scan, and never mutated afterwards;
//! deletion is handled outside the agent.

use crate::error::Result;
use rollcall_core::StudentId;
use std::path::{Path, PathBuf};

/// Template file extension.
const TEMPLATE_EXT: &str = "dat";

/// Directory-backed store of fingerprint templates.
///
/// Listing is sorted by student id, which fixes the verification scan
/// order across platforms and filesystems.
///
/// # Examples
///
/// ```no_run
/// use rollcall_core::StudentId;
/// use rollcall_sensor::TemplateStore;
///
/// # async fn example() -> rollcall_sensor::Result<()> {
/// let store = TemplateStore::open("fingerprint_templates").await?;
/// let student = StudentId::new("s-001").unwrap();
///
/// store.write(&student, &[1, 2, 3]).await?;
/// assert!(store.contains(&student).await);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    /// Open the store, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// The backing directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, student: &StudentId) -> PathBuf {
        self.dir
            .join(format!("{}.{TEMPLATE_EXT}", student.as_str()))
    }

    /// Persist `template` for `student`, replacing any previous file.
    ///
    /// # Errors
    ///
    /// Returns an error on any filesystem failure.
    pub async fn write(&self, student: &StudentId, template: &[u8]) -> Result<()> {
        tokio::fs::write(self.path_for(student), template).await?;
        Ok(())
    }

    /// Read the stored template for `student`.
    ///
    /// # Errors
    ///
    /// Returns an error if no template exists or the file is unreadable.
    pub async fn read(&self, student: &StudentId) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.path_for(student)).await?)
    }

    /// Whether a template exists for `student`.
    pub async fn contains(&self, student: &StudentId) -> bool {
        tokio::fs::try_exists(self.path_for(student))
            .await
            .unwrap_or(false)
    }

    /// Enrolled student ids, sorted.
    ///
    /// Files that do not look like template files (wrong extension, stem
    /// that is not a valid student id) are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub async fn list(&self) -> Result<Vec<StudentId>> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(&format!(".{TEMPLATE_EXT}")) else {
                continue;
            };
            if let Ok(id) = StudentId::new(stem) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Number of stored templates.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }
}
