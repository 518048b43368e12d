use std::path::PathBuf;

use mask::BinaryMask;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use tracing::info;

use crate::{
    dataset::DatasetCursor,
    error::{AnnotationError, Result},
    store::AnnotationStore,
    types::DEFAULT_CATEGORY_ID,
    viewer::{DraftLayer, Layer, ViewModel, Viewer, BOXES_LAYER, LABELS_LAYER},
};

#[derive(
    Debug, Clone,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq
)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionCommand {
    /// Load the next image of the dataset
    NextImage,
    /// Load the previous image of the dataset
    PreviousImage,
    /// Start splitting an instance into new instances
    StartLabeling {
        instance_id: usize,
        #[schemars(range(min = 0))]
        new_instances: usize,
    },
    /// Replace the current draft with a mask read from an image file
    SetDraft { mask_path: PathBuf },
    /// Move to the next draft
    NextDraft,
    /// Move to the previous draft
    PreviousDraft,
    /// Write the drafts back as new instances
    Finish,
    /// Drop the drafts without changing the annotations
    Cancel,
}

impl SessionCommand {
    /// Get the JSON schema for all commands
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SessionCommand)
    }

    /// Get a list of all available command names
    pub fn command_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    /// Get a description of the command
    pub fn description(&self) -> &'static str {
        match self {
            Self::NextImage => "Load the next image of the dataset",
            Self::PreviousImage => "Load the previous image of the dataset",
            Self::StartLabeling { .. } => "Start splitting an instance into new instances",
            Self::SetDraft { .. } => "Replace the current draft with a mask read from an image file",
            Self::NextDraft => "Move to the next draft",
            Self::PreviousDraft => "Move to the previous draft",
            Self::Finish => "Write the drafts back as new instances",
            Self::Cancel => "Drop the drafts without changing the annotations",
        }
    }
}

/// Drafts of the new instances replacing one instance
#[derive(Debug, Clone, PartialEq)]
pub struct LabelingState {
    instance_id: usize,
    drafts: Vec<BinaryMask>,
    current: usize,
}

impl LabelingState {
    /// Every draft starts as a copy of the instance being split
    pub fn new(instance_id: usize, source: &BinaryMask, new_instances: usize) -> Self {
        Self {
            instance_id,
            drafts: vec![source.clone(); new_instances],
            current: 0,
        }
    }

    pub fn instance_id(&self) -> usize {
        self.instance_id
    }

    pub fn drafts(&self) -> &[BinaryMask] {
        &self.drafts
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_draft(&self) -> Option<&BinaryMask> {
        self.drafts.get(self.current)
    }

    pub fn can_next(&self) -> bool {
        self.current + 1 < self.drafts.len()
    }

    pub fn can_previous(&self) -> bool {
        self.current > 0
    }

    pub fn next(&mut self) -> bool {
        if self.can_next() {
            self.current += 1;
            return true;
        }
        false
    }

    pub fn previous(&mut self) -> bool {
        if self.can_previous() {
            self.current -= 1;
            return true;
        }
        false
    }

    /// Replace the current draft; ignored when there are no drafts
    pub fn set_current(&mut self, mask: BinaryMask) {
        if let Some(draft) = self.drafts.get_mut(self.current) {
            *draft = mask;
        }
    }
}

/// Interaction mode of the session
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Mode {
    #[default]
    Idle,
    Labeling(LabelingState),
}

impl Mode {
    fn describe(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Labeling(_) => "labeling",
        }
    }
}

/// Owns the dataset cursor, the loaded image and the viewer.
///
/// Every state change is followed by a fresh [`ViewModel`] handed to the viewer.
pub struct Session<V: Viewer> {
    cursor: DatasetCursor,
    store: AnnotationStore,
    mode: Mode,
    viewer: V,
    default_category_id: u64,
}

impl<V: Viewer> Session<V> {
    /// Load the cursor's current entry and show it
    pub fn open(cursor: DatasetCursor, viewer: V) -> Result<Self> {
        Self::open_with_category(cursor, viewer, DEFAULT_CATEGORY_ID)
    }

    pub fn open_with_category(cursor: DatasetCursor, viewer: V, default_category_id: u64) -> Result<Self> {
        let store = AnnotationStore::load_entry(cursor.current()?)?.with_default_category(default_category_id);
        let mut session = Self {
            cursor,
            store,
            mode: Mode::Idle,
            viewer,
            default_category_id,
        };
        session.refresh()?;
        Ok(session)
    }

    pub fn cursor(&self) -> &DatasetCursor {
        &self.cursor
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut V {
        &mut self.viewer
    }

    pub fn into_viewer(self) -> V {
        self.viewer
    }

    /// Build the view for the current state
    pub fn view_model(&self) -> Result<ViewModel<'_>> {
        build_view(&self.cursor, &self.store, &self.mode)
    }

    /// Present the current state to the viewer
    pub fn refresh(&mut self) -> Result<()> {
        let view = build_view(&self.cursor, &self.store, &self.mode)?;
        self.viewer.present(&view)
    }

    /// Jump to a dataset entry (idle only)
    pub fn go_to(&mut self, index: usize) -> Result<()> {
        self.require_idle("go_to")?;
        let store = &mut self.store;
        let category = self.default_category_id;
        self.cursor.seek(index, |entry| {
            *store = AnnotationStore::load_entry(entry)?.with_default_category(category);
            Ok(())
        })?;
        self.refresh()
    }

    /// Load the next image; returns `false` at the last entry (idle only)
    pub fn next_image(&mut self) -> Result<bool> {
        self.require_idle("next_image")?;
        let store = &mut self.store;
        let category = self.default_category_id;
        let moved = self.cursor.advance(|entry| {
            *store = AnnotationStore::load_entry(entry)?.with_default_category(category);
            Ok::<_, AnnotationError>(())
        })?;
        if moved {
            self.refresh()?;
        }
        Ok(moved)
    }

    /// Load the previous image; returns `false` at the first entry (idle only)
    pub fn previous_image(&mut self) -> Result<bool> {
        self.require_idle("previous_image")?;
        let store = &mut self.store;
        let category = self.default_category_id;
        let moved = self.cursor.retreat(|entry| {
            *store = AnnotationStore::load_entry(entry)?.with_default_category(category);
            Ok::<_, AnnotationError>(())
        })?;
        if moved {
            self.refresh()?;
        }
        Ok(moved)
    }

    /// Begin splitting `instance_id` into `new_instances` drafts (idle only)
    pub fn start_labeling(&mut self, instance_id: usize, new_instances: usize) -> Result<()> {
        self.require_idle("start_labeling")?;
        let n_labels = self.store.n_labels();
        let source = self
            .store
            .instance_masks()
            .get(instance_id)
            .ok_or(AnnotationError::InstanceOutOfRange { instance_id, n_labels })?;

        self.mode = Mode::Labeling(LabelingState::new(instance_id, source, new_instances));
        info!(instance_id, new_instances, "Started labeling");
        self.refresh()
    }

    /// Replace the current draft with an edited mask (labeling only)
    pub fn set_draft(&mut self, mask: BinaryMask) -> Result<()> {
        let (width, height) = self.store.image().dimensions();
        let state = self.labeling_mut("set_draft")?;
        if state.current_draft().is_none() {
            return Err(AnnotationError::InvalidCommand {
                command: "set_draft",
                mode: "labeling without drafts",
            });
        }
        mask.ensure_dimensions(width, height)?;
        state.set_current(mask);
        self.refresh()
    }

    /// Move to the next draft, keeping the viewer's edits (labeling only)
    pub fn next_draft(&mut self) -> Result<bool> {
        self.labeling_mut("next_draft")?;
        self.pull_draft()?;
        let moved = self.labeling_mut("next_draft")?.next();
        if moved {
            self.refresh()?;
        }
        Ok(moved)
    }

    /// Move to the previous draft, keeping the viewer's edits (labeling only)
    pub fn previous_draft(&mut self) -> Result<bool> {
        self.labeling_mut("previous_draft")?;
        self.pull_draft()?;
        let moved = self.labeling_mut("previous_draft")?.previous();
        if moved {
            self.refresh()?;
        }
        Ok(moved)
    }

    /// Replace the instance with the drafts, persist, and return to idle.
    ///
    /// If the update fails the drafts are kept and the session stays in labeling mode.
    pub fn finish(&mut self) -> Result<()> {
        self.labeling_mut("finish")?;
        self.pull_draft()?;

        let state = match std::mem::take(&mut self.mode) {
            Mode::Labeling(state) => state,
            Mode::Idle => unreachable!("mode checked above"),
        };
        if let Err(err) = self.store.update_instance(state.instance_id(), state.drafts()) {
            self.mode = Mode::Labeling(state);
            return Err(err);
        }

        info!(
            instance_id = state.instance_id(),
            new_instances = state.drafts().len(),
            "Finished labeling"
        );
        self.refresh()
    }

    /// Drop the drafts and return to idle (labeling only)
    pub fn cancel(&mut self) -> Result<()> {
        self.labeling_mut("cancel")?;
        self.mode = Mode::Idle;
        info!("Cancelled labeling");
        self.refresh()
    }

    /// Run one command
    pub fn execute(&mut self, command: SessionCommand) -> Result<()> {
        match command {
            SessionCommand::NextImage => self.next_image().map(|_| ()),
            SessionCommand::PreviousImage => self.previous_image().map(|_| ()),
            SessionCommand::StartLabeling { instance_id, new_instances } => {
                self.start_labeling(instance_id, new_instances)
            }
            SessionCommand::SetDraft { mask_path } => {
                let mask = BinaryMask::load_image(&mask_path)?;
                self.set_draft(mask)
            }
            SessionCommand::NextDraft => self.next_draft().map(|_| ()),
            SessionCommand::PreviousDraft => self.previous_draft().map(|_| ()),
            SessionCommand::Finish => self.finish(),
            SessionCommand::Cancel => self.cancel(),
        }
    }

    /// Copy the viewer's edited draft layer into the current draft
    fn pull_draft(&mut self) -> Result<()> {
        if let Some(mask) = self.viewer.read_draft()? {
            let (width, height) = self.store.image().dimensions();
            mask.ensure_dimensions(width, height)?;
            self.labeling_mut("pull_draft")?.set_current(mask);
        }
        Ok(())
    }

    fn require_idle(&self, command: &'static str) -> Result<()> {
        match self.mode {
            Mode::Idle => Ok(()),
            Mode::Labeling(_) => Err(AnnotationError::InvalidCommand {
                command,
                mode: self.mode.describe(),
            }),
        }
    }

    fn labeling_mut(&mut self, command: &'static str) -> Result<&mut LabelingState> {
        match &mut self.mode {
            Mode::Labeling(state) => Ok(state),
            Mode::Idle => Err(AnnotationError::InvalidCommand { command, mode: "idle" }),
        }
    }
}

fn build_view<'a>(cursor: &'a DatasetCursor, store: &'a AnnotationStore, mode: &'a Mode) -> Result<ViewModel<'a>> {
    let draft = match mode {
        Mode::Idle => None,
        Mode::Labeling(state) => state.current_draft().map(|mask| DraftLayer {
            index: state.current_index(),
            total: state.drafts().len(),
            instance_id: state.instance_id(),
            mask,
        }),
    };
    // labels and boxes are hidden while drafts are being drawn
    let overlays_visible = matches!(mode, Mode::Idle);

    Ok(ViewModel {
        entry: cursor.current()?,
        position: cursor.position(),
        dataset_len: cursor.len(),
        image: store.image(),
        labels: Layer {
            name: LABELS_LAYER,
            visible: overlays_visible,
            data: store.label_map(),
        },
        boxes: Layer {
            name: BOXES_LAYER,
            visible: overlays_visible,
            data: store.display_geometry(),
        },
        draft,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labeling_state_navigation() {
        let source = BinaryMask::from_fn(4, 4, |x, _| x < 2);
        let mut state = LabelingState::new(3, &source, 3);

        assert_eq!(state.drafts().len(), 3);
        assert!(state.drafts().iter().all(|d| d == &source));
        assert!(!state.can_previous());
        assert!(state.can_next());

        assert!(state.next());
        assert!(state.next());
        assert!(!state.next());
        assert_eq!(state.current_index(), 2);
        assert!(!state.can_next());
        assert!(state.can_previous());

        state.set_current(BinaryMask::new(4, 4));
        assert!(state.drafts()[2].is_blank());
        assert!(!state.drafts()[0].is_blank());
    }

    #[test]
    fn test_labeling_without_drafts() {
        let mut state = LabelingState::new(0, &BinaryMask::new(2, 2), 0);
        assert!(state.current_draft().is_none());
        assert!(!state.next());
        assert!(!state.previous());
        state.set_current(BinaryMask::new(2, 2));
        assert!(state.drafts().is_empty());
    }

    #[test]
    fn test_command_serialization() {
        let command = SessionCommand::StartLabeling { instance_id: 2, new_instances: 3 };
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "start_labeling", "params": {"instance_id": 2, "new_instances": 3}})
        );

        let parsed: SessionCommand = serde_json::from_str(r#"{"type": "finish"}"#).unwrap();
        assert_eq!(parsed, SessionCommand::Finish);
        assert_eq!(parsed.to_string(), "finish");
    }

    #[test]
    fn test_command_catalogue() {
        assert!(SessionCommand::command_names().contains(&"set_draft"));
        assert_eq!(SessionCommand::command_names().len(), 8);
        assert!(!SessionCommand::Cancel.description().is_empty());

        let schema = serde_json::to_value(SessionCommand::schema()).unwrap();
        assert!(schema.get("oneOf").is_some() || schema.get("anyOf").is_some());
    }
}
