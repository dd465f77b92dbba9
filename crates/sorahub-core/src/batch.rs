//! Batch session: registry + settings + sequential scheduler.
//!
//! [`BatchConverter`] is the single owned entry point; there is no
//! ambient state. Exactly one writer (the scheduler) mutates item
//! state/progress/artifact fields, and it visits items strictly in
//! registry order, one at a time. A single item's failure is recorded
//! on that item and never aborts the batch.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use crate::error::Result;
use crate::pipeline;
use crate::registry::{InputFile, ItemId, Registry};
use crate::settings::{ConversionSettings, SettingsPatch, TargetFormat};

/// Fixed download name for the merged PDF.
pub const PDF_DOWNLOAD_NAME: &str = "SoraHub_images.pdf";

/// Counts for one `convert_all` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchRunStats {
    /// Items that reached Completed this run
    pub succeeded: usize,

    /// Items that reached Failed this run
    pub failed: usize,

    /// Items skipped because they were already Completed
    pub skipped: usize,
}

/// Download name for a converted item: the original name with its
/// extension stripped (whatever its case), `_converted`, and the
/// target format's extension.
pub fn download_file_name(original_name: &str, format: TargetFormat) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(original_name);
    format!("{stem}_converted.{}", format.file_extension())
}

/// Owned batch-conversion session.
#[derive(Debug, Default)]
pub struct BatchConverter {
    registry: Registry,
    settings: ConversionSettings,
    running: bool,
}

impl BatchConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with non-default settings.
    pub fn with_settings(settings: ConversionSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            registry: Registry::new(),
            settings,
            running: false,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn settings(&self) -> &ConversionSettings {
        &self.settings
    }

    /// Whether a batch run is in flight. Not a cancellation mechanism;
    /// it only gates re-entrant batch triggers.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Add image inputs to the end of the registry. Non-image inputs
    /// are filtered out.
    pub fn add_items(&mut self, inputs: Vec<InputFile>) -> Vec<ItemId> {
        self.registry.add_items(inputs)
    }

    pub fn remove_item(&mut self, id: ItemId) -> Result<()> {
        self.registry.remove(id)
    }

    pub fn clear(&mut self) {
        self.registry.clear();
    }

    pub fn reorder(&mut self, id: ItemId, target_id: ItemId) -> Result<()> {
        self.registry.reorder(id, target_id)
    }

    /// Merge a partial settings update. Already-completed items keep
    /// the artifacts produced under the settings in force at the time.
    pub fn update_settings(&mut self, patch: SettingsPatch) -> Result<()> {
        self.settings.apply(patch)
    }

    /// Convert every Pending or Failed item, in registry order, one at
    /// a time. Completed items are skipped, so a partial re-run is
    /// idempotent. Settings are snapshotted at entry.
    pub async fn convert_all(&mut self) -> BatchRunStats {
        let mut stats = BatchRunStats::default();
        if self.running || self.registry.is_empty() {
            return stats;
        }
        self.running = true;
        let settings = self.settings.clone();
        let start = Instant::now();

        for id in self.registry.ids() {
            let source = match self.registry.get(id) {
                Some(item) if item.is_completed() => {
                    stats.skipped += 1;
                    continue;
                }
                Some(item) => item.source().clone(),
                None => continue,
            };

            self.registry.begin_processing(id);
            let registry = &mut self.registry;
            match pipeline::convert_image(&source, &settings, |p| registry.set_progress(id, p))
                .await
            {
                Ok(artifact) => {
                    self.registry.complete(id, artifact);
                    stats.succeeded += 1;
                }
                Err(e) => {
                    tracing::warn!("item {} ({:?}) failed: {}", id, source.name(), e);
                    self.registry.fail(id, e.to_string());
                    stats.failed += 1;
                }
            }
        }

        self.running = false;
        tracing::debug!(
            "batch finished in {:?}: {} converted, {} failed, {} skipped",
            start.elapsed(),
            stats.succeeded,
            stats.failed,
            stats.skipped
        );
        stats
    }

    /// Suggested download name for an item. Uses the artifact's format
    /// tag when the item is completed, otherwise the format the next
    /// run would produce.
    pub fn download_name(&self, id: ItemId) -> Result<String> {
        let item = self
            .registry
            .get(id)
            .ok_or(crate::error::ConvertError::ReferenceNotFound(id))?;
        let format = item
            .artifact()
            .map(|a| a.format())
            .unwrap_or(self.settings.format);
        Ok(download_file_name(item.name(), format))
    }

    /// Merge the completed artifacts, in registry order, into one
    /// multi-page PDF. Fails when nothing is completed.
    pub fn assemble_pdf(&self) -> Result<Vec<u8>> {
        crate::pdf::assemble(self.registry.iter().filter_map(|item| item.artifact()))
    }
}
