//! Daily-note timeline entries.
//!
//! One markdown file per day under the memory directory; each checkpoint
//! that carries note material appends a timestamped section.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;

use crate::error::Result;
use crate::services::store;

pub struct DailyNotes {
    memory_dir: PathBuf,
}

impl DailyNotes {
    pub fn new(memory_dir: impl Into<PathBuf>) -> Self {
        Self {
            memory_dir: memory_dir.into(),
        }
    }

    pub fn note_path(&self, now: DateTime<Utc>) -> PathBuf {
        self.memory_dir
            .join(format!("{}.md", now.format("%Y-%m-%d")))
    }

    /// Append a checkpoint entry to today's note, creating the file with a
    /// date header on first write.
    pub async fn append(&self, entry: &str, now: DateTime<Utc>) -> Result<PathBuf> {
        let path = self.note_path(now);

        let mut content = match fs::read_to_string(&path).await {
            Ok(existing) => existing,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                format!("# {}\n", now.format("%Y-%m-%d"))
            }
            Err(e) => return Err(e.into()),
        };

        content.push_str(&format!(
            "\n## {} - Checkpoint\n{}\n",
            now.format("%H:%M"),
            entry
        ));

        store::write_atomic(&path, &content).await?;
        Ok(path)
    }

    pub fn memory_dir(&self) -> &Path {
        &self.memory_dir
    }
}
