//! Snapshot persistence (§4.3).
//!
//! Each platform's full inventory is a single JSON file, replaced whole on
//! every full crawl and read back whole by the matcher and by `/status`.
//! Grounded on the teacher's `strategy/config_storage.rs` shape (a thin
//! struct wrapping serialize/deserialize with a `[DATA STORE]`-prefixed
//! log line per operation) but backed by the filesystem instead of an
//! in-memory map, since persistence across restarts is a spec invariant
//! here. Writes go through a temp file + rename so a reader never
//! observes a half-written snapshot.

use std::path::{Path, PathBuf};

use crate::engine::settings::Settings;
use crate::engine::types::{Opportunity, OpportunityList, OpportunityListMetadata, Platform, Snapshot};
use crate::utils::ts_hm;
use crate::DynError;

pub struct DataStore {
    dir: PathBuf,
}

impl DataStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, platform: Platform) -> PathBuf {
        self.dir.join(format!("snapshot_{}.json", platform.as_str().to_lowercase()))
    }

    fn opportunities_path(&self) -> PathBuf {
        self.dir.join("opportunities.json")
    }

    /// Writes `snapshot.tmp` then renames over the target path. `rename`
    /// is atomic on the same filesystem, so a process killed mid-write
    /// leaves either the old file or the new one, never a partial file.
    pub async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), DynError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let final_path = self.path_for(snapshot.metadata.platform);
        let tmp_path = final_path.with_extension("tmp");

        let body = serde_json::to_vec(snapshot)?;
        tokio::fs::write(&tmp_path, &body).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;

        println!(
            "[{}] [DATA STORE] saved {} items for platform {}",
            ts_hm(),
            snapshot.items.len(),
            snapshot.metadata.platform.as_str()
        );
        Ok(())
    }

    pub async fn load_snapshot(&self, platform: Platform) -> Result<Option<Snapshot>, DynError> {
        let path = self.path_for(platform);
        if !path.exists() {
            return Ok(None);
        }
        let body = tokio::fs::read(&path).await?;
        let snapshot: Snapshot = serde_json::from_slice(&body)?;
        Ok(Some(snapshot))
    }

    /// Persists the latest ranked opportunity list, the surface `GET
    /// /opportunities` serves after a restart before the first run
    /// completes. Same atomic temp-file-then-rename discipline as
    /// snapshots.
    pub async fn save_opportunities(
        &self,
        opportunities: &[Opportunity],
        settings: &Settings,
        generated_at: i64,
    ) -> Result<(), DynError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let list = OpportunityList {
            metadata: OpportunityListMetadata {
                total_count: opportunities.len(),
                generated_at,
                filter_config: settings.clone(),
            },
            items: opportunities.to_vec(),
        };

        let final_path = self.opportunities_path();
        let tmp_path = final_path.with_extension("tmp");
        let body = serde_json::to_vec(&list)?;
        tokio::fs::write(&tmp_path, &body).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;

        println!("[{}] [DATA STORE] saved {} opportunities", ts_hm(), list.items.len());
        Ok(())
    }

    pub async fn load_opportunities(&self) -> Result<Option<OpportunityList>, DynError> {
        let path = self.opportunities_path();
        if !path.exists() {
            return Ok(None);
        }
        let body = tokio::fs::read(&path).await?;
        let list: OpportunityList = serde_json::from_slice(&body)?;
        Ok(Some(list))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
