use crate::domain::{NewRelease, PublishedAsset, ReleaseRecord};
use crate::error::{ReleaseError, Result};
use crate::hosting::ReleaseHost;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct HostState {
    releases: Vec<ReleaseRecord>,
    next_id: u64,
    creates: usize,
    uploads: usize,
    fail_creates: bool,
    fail_uploads: bool,
}

/// In-memory release host for tests
#[derive(Debug, Default)]
pub struct InMemoryHost {
    state: Mutex<HostState>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Seed a release, as if a previous run created it
    pub fn insert_release(&self, tag_name: &str) -> ReleaseRecord {
        let mut state = self.state();
        state.next_id += 1;
        let record = ReleaseRecord {
            id: state.next_id,
            tag_name: tag_name.to_string(),
            title: format!("Release {}", tag_name),
            notes: String::new(),
            assets: Vec::new(),
            latest: false,
        };
        state.releases.push(record.clone());
        record
    }

    pub fn set_fail_creates(&self, fail: bool) {
        self.state().fail_creates = fail;
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.state().fail_uploads = fail;
    }

    pub fn releases(&self) -> Vec<ReleaseRecord> {
        self.state().releases.clone()
    }

    /// Number of releases actually created through the API
    pub fn create_count(&self) -> usize {
        self.state().creates
    }

    pub fn upload_count(&self) -> usize {
        self.state().uploads
    }
}

impl ReleaseHost for InMemoryHost {
    fn find_release(&self, tag_name: &str) -> Result<Option<ReleaseRecord>> {
        Ok(self
            .state()
            .releases
            .iter()
            .find(|r| r.tag_name == tag_name)
            .cloned())
    }

    fn create_release(&self, release: &NewRelease) -> Result<ReleaseRecord> {
        let mut state = self.state();
        if let Some(existing) = state.releases.iter().find(|r| r.tag_name == release.tag_name) {
            return Ok(existing.clone());
        }
        if state.fail_creates {
            return Err(ReleaseError::hosting("release creation rejected"));
        }

        state.next_id += 1;
        state.creates += 1;
        if release.latest {
            for r in state.releases.iter_mut() {
                r.latest = false;
            }
        }
        let record = ReleaseRecord {
            id: state.next_id,
            tag_name: release.tag_name.clone(),
            title: release.title.clone(),
            notes: release.notes.clone(),
            assets: Vec::new(),
            latest: release.latest,
        };
        state.releases.push(record.clone());
        Ok(record)
    }

    fn upload_asset(&self, release: &ReleaseRecord, asset: &PublishedAsset) -> Result<()> {
        let mut state = self.state();
        if state.fail_uploads {
            return Err(ReleaseError::hosting("upload rejected"));
        }
        state.uploads += 1;

        let record = state
            .releases
            .iter_mut()
            .find(|r| r.id == release.id)
            .ok_or_else(|| ReleaseError::hosting(format!("no release with id {}", release.id)))?;
        record.assets.retain(|name| name != &asset.name);
        record.assets.push(asset.name.clone());
        Ok(())
    }
}
