//! Ordered registry of batch items.
//!
//! The registry owns every item for its whole lifetime: items are
//! created by [`Registry::add_items`], mutated by the scheduler
//! (state/progress/artifact) or by reorder/remove, and destroyed by
//! [`Registry::remove`] / [`Registry::clear`]. Registry order is
//! semantically significant: it is the display order and the PDF page
//! order.
//!
//! Each item carries a [`PreviewHandle`] sharing the source's backing
//! allocation. The registry is the handle's sole owner and releases it
//! when the item leaves the registry, so preview memory never outlives
//! the item.

use std::fmt;
use std::sync::Arc;

use crate::error::{ConvertError, Result};
use crate::settings::TargetFormat;

/// Opaque item identifier, stable for the item's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file-like input: name, media type, raw bytes.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }
}

/// Raw source bytes plus identification. Cheap to clone: the byte
/// buffer is shared with the item's preview handle.
#[derive(Clone)]
pub struct SourceImage {
    name: String,
    media_type: String,
    bytes: Arc<[u8]>,
}

impl SourceImage {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Handle backing an item's on-screen preview. Shares the source's
/// byte allocation; releasing the handle drops that share.
pub struct PreviewHandle {
    bytes: Arc<[u8]>,
    media_type: String,
}

impl PreviewHandle {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    fn release(self) {
        tracing::trace!("released preview ({} bytes)", self.bytes.len());
    }
}

/// The encoded output produced for a completed item.
#[derive(Debug, Clone)]
pub struct Artifact {
    format: TargetFormat,
    bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(format: TargetFormat, bytes: Vec<u8>) -> Self {
        Self { format, bytes }
    }

    pub fn format(&self) -> TargetFormat {
        self.format
    }

    pub fn media_type(&self) -> &'static str {
        self.format.media_type()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Per-item state machine. The artifact lives inside `Completed` and
/// the message inside `Failed`, so "artifact present iff completed"
/// and "message present iff failed" cannot be violated.
#[derive(Debug, Clone)]
pub enum ItemState {
    Pending,
    Processing,
    Completed(Artifact),
    Failed { message: String },
}

impl ItemState {
    /// Lowercase state name for display and reports.
    pub fn name(&self) -> &'static str {
        match self {
            ItemState::Pending => "pending",
            ItemState::Processing => "processing",
            ItemState::Completed(_) => "completed",
            ItemState::Failed { .. } => "failed",
        }
    }
}

/// One image in the batch.
#[derive(Debug)]
pub struct ImageItem {
    id: ItemId,
    source: SourceImage,
    preview: Option<PreviewHandle>,
    state: ItemState,
    progress: u8,
    original_size: u64,
}

impl ImageItem {
    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.preview.as_ref()
    }

    pub fn state(&self) -> &ItemState {
        &self.state
    }

    /// Progress 0-100, monotonically non-decreasing within one
    /// processing attempt.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn original_size(&self) -> u64 {
        self.original_size
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match &self.state {
            ItemState::Completed(artifact) => Some(artifact),
            _ => None,
        }
    }

    pub fn converted_size(&self) -> Option<u64> {
        self.artifact().map(Artifact::len)
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            ItemState::Failed { message } => Some(message),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, ItemState::Completed(_))
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Ordered collection of image items.
#[derive(Debug, Default)]
pub struct Registry {
    items: Vec<ImageItem>,
    next_id: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add inputs whose media type begins with `image/`, in input
    /// order, at the end of the sequence. Non-image inputs are
    /// silently filtered out. Returns the ids of the added items.
    pub fn add_items(&mut self, inputs: Vec<InputFile>) -> Vec<ItemId> {
        let mut added = Vec::new();
        for input in inputs {
            if !input.media_type.starts_with("image/") {
                tracing::debug!("skipping non-image input {:?}", input.name);
                continue;
            }
            let id = ItemId(self.next_id);
            self.next_id += 1;
            let bytes: Arc<[u8]> = input.bytes.into();
            let original_size = bytes.len() as u64;
            let preview = PreviewHandle {
                bytes: Arc::clone(&bytes),
                media_type: input.media_type.clone(),
            };
            self.items.push(ImageItem {
                id,
                source: SourceImage {
                    name: input.name,
                    media_type: input.media_type,
                    bytes,
                },
                preview: Some(preview),
                state: ItemState::Pending,
                progress: 0,
                original_size,
            });
            added.push(id);
        }
        added
    }

    /// Release the item's preview and remove it from the sequence.
    pub fn remove(&mut self, id: ItemId) -> Result<()> {
        let index = self.index_of(id)?;
        let mut item = self.items.remove(index);
        if let Some(preview) = item.preview.take() {
            preview.release();
        }
        Ok(())
    }

    /// Release all previews and empty the sequence.
    pub fn clear(&mut self) {
        for item in &mut self.items {
            if let Some(preview) = item.preview.take() {
                preview.release();
            }
        }
        self.items.clear();
    }

    /// Move the item `id` to the position currently held by
    /// `target_id`, shifting the items in between. A pure permutation:
    /// the id set and the length are unchanged. Equal ids are a no-op.
    pub fn reorder(&mut self, id: ItemId, target_id: ItemId) -> Result<()> {
        if id == target_id {
            return Ok(());
        }
        let from = self.index_of(id)?;
        let to = self.index_of(target_id)?;
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageItem> {
        self.items.iter()
    }

    pub fn get(&self, id: ItemId) -> Option<&ImageItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Item ids in registry order.
    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }

    // Scheduler-side state transitions. Each attempt re-enters
    // Processing with progress reset to 0.

    pub(crate) fn begin_processing(&mut self, id: ItemId) {
        if let Some(item) = self.get_mut(id) {
            item.state = ItemState::Processing;
            item.progress = 0;
        }
    }

    pub(crate) fn set_progress(&mut self, id: ItemId, progress: u8) {
        if let Some(item) = self.get_mut(id) {
            // Monotonic within an attempt
            item.progress = item.progress.max(progress.min(100));
        }
    }

    pub(crate) fn complete(&mut self, id: ItemId, artifact: Artifact) {
        if let Some(item) = self.get_mut(id) {
            item.progress = 100;
            item.state = ItemState::Completed(artifact);
        }
    }

    pub(crate) fn fail(&mut self, id: ItemId, message: String) {
        if let Some(item) = self.get_mut(id) {
            item.state = ItemState::Failed { message };
        }
    }

    // Derived stats, pure functions over current state.

    pub fn total_original_size(&self) -> u64 {
        self.items.iter().map(|item| item.original_size).sum()
    }

    pub fn total_converted_size(&self) -> u64 {
        self.items
            .iter()
            .filter_map(ImageItem::converted_size)
            .sum()
    }

    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_completed()).count()
    }

    pub fn all_completed(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(ImageItem::is_completed)
    }

    fn get_mut(&mut self, id: ItemId) -> Option<&mut ImageItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    fn index_of(&self, id: ItemId) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.id == id)
            .ok_or(ConvertError::ReferenceNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str) -> InputFile {
        InputFile::new(name, "image/png", vec![0u8; 16])
    }

    fn seeded(names: &[&str]) -> (Registry, Vec<ItemId>) {
        let mut registry = Registry::new();
        let ids = registry.add_items(names.iter().map(|n| input(n)).collect());
        (registry, ids)
    }

    #[test]
    fn test_add_filters_non_images() {
        let mut registry = Registry::new();
        let added = registry.add_items(vec![
            input("a.png"),
            InputFile::new("notes.txt", "text/plain", vec![1, 2, 3]),
            input("b.png"),
        ]);
        assert_eq!(added.len(), 2);
        assert_eq!(registry.len(), 2);
        let names: Vec<_> = registry.iter().map(|i| i.name().to_string()).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_new_items_are_pending_with_preview() {
        let (registry, ids) = seeded(&["a.png"]);
        let item = registry.get(ids[0]).unwrap();
        assert_eq!(item.state().name(), "pending");
        assert_eq!(item.progress(), 0);
        assert_eq!(item.original_size(), 16);
        assert!(item.preview().is_some());
        assert!(item.artifact().is_none());
        assert!(item.error_message().is_none());
    }

    #[test]
    fn test_remove_absent_id_is_an_error() {
        let (mut registry, ids) = seeded(&["a.png"]);
        registry.remove(ids[0]).unwrap();
        assert!(matches!(
            registry.remove(ids[0]),
            Err(ConvertError::ReferenceNotFound(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clear_releases_everything() {
        let (mut registry, _) = seeded(&["a.png", "b.png", "c.png"]);
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.total_original_size(), 0);
    }

    #[test]
    fn test_reorder_is_a_pure_permutation() {
        let (mut registry, ids) = seeded(&["a.png", "b.png", "c.png", "d.png"]);
        registry.reorder(ids[3], ids[0]).unwrap();

        let after = registry.ids();
        assert_eq!(after, vec![ids[3], ids[0], ids[1], ids[2]]);
        // Same id set, same length
        let mut sorted = after.clone();
        sorted.sort();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_reorder_moves_forward_with_shift() {
        let (mut registry, ids) = seeded(&["a.png", "b.png", "c.png", "d.png"]);
        registry.reorder(ids[0], ids[2]).unwrap();
        assert_eq!(registry.ids(), vec![ids[1], ids[2], ids[0], ids[3]]);
    }

    #[test]
    fn test_reorder_same_id_is_a_noop() {
        let (mut registry, ids) = seeded(&["a.png", "b.png"]);
        registry.reorder(ids[1], ids[1]).unwrap();
        assert_eq!(registry.ids(), ids);
    }

    #[test]
    fn test_reorder_absent_id_is_an_error() {
        let (mut registry, ids) = seeded(&["a.png", "b.png"]);
        let ghost = ids[0];
        registry.remove(ghost).unwrap();
        assert!(registry.reorder(ghost, ids[1]).is_err());
        assert!(registry.reorder(ids[1], ghost).is_err());
    }

    #[test]
    fn test_state_transitions_and_invariants() {
        let (mut registry, ids) = seeded(&["a.png", "b.png"]);
        let id = ids[0];

        registry.begin_processing(id);
        registry.set_progress(id, 40);
        // Monotonic: a lower checkpoint never moves progress backwards
        registry.set_progress(id, 20);
        assert_eq!(registry.get(id).unwrap().progress(), 40);

        registry.complete(id, Artifact::new(TargetFormat::Png, vec![9; 30]));
        let item = registry.get(id).unwrap();
        assert!(item.is_completed());
        assert_eq!(item.progress(), 100);
        assert_eq!(item.converted_size(), Some(30));
        assert!(item.error_message().is_none());

        registry.begin_processing(ids[1]);
        registry.fail(ids[1], "decode error".into());
        let failed = registry.get(ids[1]).unwrap();
        assert_eq!(failed.error_message(), Some("decode error"));
        assert!(failed.artifact().is_none());
        assert!(failed.converted_size().is_none());
    }

    #[test]
    fn test_retry_resets_progress() {
        let (mut registry, ids) = seeded(&["a.png"]);
        registry.begin_processing(ids[0]);
        registry.set_progress(ids[0], 60);
        registry.fail(ids[0], "encode error".into());

        registry.begin_processing(ids[0]);
        assert_eq!(registry.get(ids[0]).unwrap().progress(), 0);
        assert_eq!(registry.get(ids[0]).unwrap().state().name(), "processing");
    }

    #[test]
    fn test_derived_stats() {
        let (mut registry, ids) = seeded(&["a.png", "b.png"]);
        assert_eq!(registry.total_original_size(), 32);
        assert_eq!(registry.completed_count(), 0);
        assert!(!registry.all_completed());

        registry.complete(ids[0], Artifact::new(TargetFormat::Jpeg, vec![0; 10]));
        assert_eq!(registry.total_converted_size(), 10);
        assert!(!registry.all_completed());

        registry.complete(ids[1], Artifact::new(TargetFormat::Jpeg, vec![0; 5]));
        assert_eq!(registry.total_converted_size(), 15);
        assert_eq!(registry.completed_count(), 2);
        assert!(registry.all_completed());
    }

    #[test]
    fn test_all_completed_false_when_empty() {
        let registry = Registry::new();
        assert!(!registry.all_completed());
    }
}
