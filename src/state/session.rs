//! The annotation session: one document, one page, its boxes and the
//! pointer state machine that edits them.
//!
//! Every operation goes through [`Session`]. Discrete mutations record a
//! history snapshot before they touch the store and re-run the validator
//! once they are done, handing the report to subscribed observers.

use std::fmt;

use serde_json::Value;

use super::interaction::{
    ArmedField, DisplayOptions, Interaction, Key, KeyCommand, Modifiers, PointerButton,
    PointerEvent,
};
use crate::config::AnnotatorConfig;
use crate::data::PageImage;
use crate::format::formats::LabelsFormat;
use crate::format::{ExportData, ExportFormat, FormatError};
use crate::geometry::{
    clamp_to_image, from_corners, hit_test_handle, move_by, resize, BBox, Handle, ImageBounds,
    Point,
};
use crate::model::{
    Annotation, AnnotationId, AnnotationStore, Confidence, Document, DocumentError, FieldPath,
};
use crate::ocr::{OcrRequest, OcrResult};
use crate::undo::History;
use crate::validation::{validate, ValidationReport};
use crate::viewport::Viewport;

/// Callback run with every fresh validation report.
pub type ValidationObserver = Box<dyn FnMut(&ValidationReport)>;

/// Editing session over one invoice page.
pub struct Session {
    document: Document,
    store: AnnotationStore,
    history: History,
    viewport: Viewport,
    /// Authoritative clamp region; the default page size until an image loads
    bounds: ImageBounds,
    default_bounds: ImageBounds,
    image_filename: Option<String>,
    selected: Option<AnnotationId>,
    armed: Option<ArmedField>,
    interaction: Interaction,
    report: ValidationReport,
    observers: Vec<ValidationObserver>,
    min_box_size: i32,
    display: DisplayOptions,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("annotations", &self.store.len())
            .field("bounds", &self.bounds)
            .field("image_filename", &self.image_filename)
            .field("selected", &self.selected)
            .field("armed", &self.armed.as_ref().map(|a| a.label.to_string()))
            .field("interaction", &self.interaction.name())
            .field("undo_steps", &self.history.undo_count())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Session with default settings and an empty document.
    pub fn new() -> Self {
        Self::with_config(&AnnotatorConfig::new())
    }

    pub fn with_config(config: &AnnotatorConfig) -> Self {
        let viewport = Viewport::identity()
            .with_zoom_limits(config.min_zoom, config.max_zoom)
            .with_handle_size(config.handle_size);
        let bounds = config.default_bounds();
        let document = Document::default();
        let store = AnnotationStore::new();
        let report = validate(&document, &store, bounds);
        Self {
            document,
            store,
            history: History::with_config(config.history()),
            viewport,
            bounds,
            default_bounds: bounds,
            image_filename: None,
            selected: None,
            armed: None,
            interaction: Interaction::Idle,
            report,
            observers: Vec::new(),
            min_box_size: config.min_box_size,
            display: DisplayOptions::default(),
        }
    }

    /// Register a callback for validation reports. It is called right away
    /// with the current report.
    pub fn subscribe(&mut self, mut observer: ValidationObserver) {
        observer(&self.report);
        self.observers.push(observer);
    }

    // === Accessors ===

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Mutable view transform (wheel zoom, programmatic pan).
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn bounds(&self) -> ImageBounds {
        self.bounds
    }

    pub fn image_filename(&self) -> Option<&str> {
        self.image_filename.as_deref()
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected
    }

    pub fn selected_annotation(&self) -> Option<&Annotation> {
        self.selected.and_then(|id| self.store.find(id))
    }

    pub fn armed(&self) -> Option<&ArmedField> {
        self.armed.as_ref()
    }

    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    /// Latest validation report.
    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    pub fn display(&self) -> DisplayOptions {
        self.display
    }

    // === Arming ===

    /// Arm a template for the next box. Indexed templates get the lowest
    /// free line index; scalar templates are armed as-is.
    pub fn arm(&mut self, template: &FieldPath) -> FieldPath {
        let label = if template.is_indexed() {
            template.with_index(self.store.next_index_for_template(template))
        } else {
            template.clone()
        };
        self.arm_label(label)
    }

    /// Arm an indexed template at an explicit line index.
    pub fn arm_at(&mut self, template: &FieldPath, index: usize) -> FieldPath {
        let label = if template.is_indexed() {
            template.with_index(index)
        } else {
            template.clone()
        };
        self.arm_label(label)
    }

    fn arm_label(&mut self, label: FieldPath) -> FieldPath {
        log::debug!("🎯 Armed {}", label);
        self.armed = Some(ArmedField::new(label.clone()));
        label
    }

    /// Move the armed line-item field to another index. Returns the new
    /// label, or `None` when nothing line-item is armed.
    pub fn set_armed_index(&mut self, index: usize) -> Option<FieldPath> {
        let armed = self.armed.as_ref().filter(|a| a.is_line_item())?;
        let label = armed.label.with_index(index);
        Some(self.arm_label(label))
    }

    pub fn disarm(&mut self) {
        if self.armed.take().is_some() {
            log::debug!("🎯 Disarmed");
        }
    }

    // === Pointer input ===

    /// Pointer pressed on the canvas.
    pub fn pointer_down(&mut self, event: PointerEvent) {
        if !self.interaction.is_idle() {
            return;
        }
        if event.starts_pan() {
            self.interaction = Interaction::Panning {
                last: event.position,
            };
            return;
        }
        if event.button != PointerButton::Primary {
            return;
        }

        let p = self.viewport.to_image_space(event.position);

        if let Some((id, bbox)) = self.selected_box() {
            if let Some(handle) = hit_test_handle(bbox, p, self.viewport.handle_tolerance()) {
                self.history.begin(&self.store);
                self.interaction = Interaction::Resizing {
                    annotation_id: id,
                    original: bbox,
                    handle,
                };
                log::debug!("↔️ Resizing {} from {}", id, handle.name());
                return;
            }
        }

        if let Some(hit) = self.store.hit_test(p) {
            if self.selected == Some(hit) {
                if let Some(ann) = self.store.find(hit) {
                    let original = ann.bbox;
                    self.history.begin(&self.store);
                    self.interaction = Interaction::Moving {
                        annotation_id: hit,
                        original,
                        grab: p,
                    };
                    log::debug!("✋ Moving {}", hit);
                }
            } else {
                self.selected = Some(hit);
                log::debug!("Selected {}", hit);
            }
            return;
        }

        if self.armed.is_some() {
            self.history.begin(&self.store);
            self.interaction = Interaction::Creating {
                anchor: p,
                current: p,
            };
        }
    }

    /// Pointer moved over the canvas.
    pub fn pointer_move(&mut self, event: PointerEvent) {
        let p = self.viewport.to_image_space(event.position);
        match self.interaction {
            Interaction::Idle => {}
            Interaction::Creating { anchor, .. } => {
                self.interaction = Interaction::Creating { anchor, current: p };
            }
            Interaction::Moving {
                annotation_id,
                original,
                grab,
            } => {
                let bbox = move_by(original, p.delta_from(grab), self.bounds);
                if let Some(ann) = self.store.find_mut(annotation_id) {
                    ann.bbox = bbox;
                }
            }
            Interaction::Resizing {
                annotation_id,
                original,
                handle,
            } => {
                let bbox = resize(original, handle, p, self.bounds);
                if let Some(ann) = self.store.find_mut(annotation_id) {
                    ann.bbox = bbox;
                }
            }
            Interaction::Panning { last } => {
                let delta = event.position.delta_from(last);
                self.viewport.pan_by(delta.x, delta.y);
                self.interaction = Interaction::Panning {
                    last: event.position,
                };
            }
        }
    }

    /// Pointer released. Returns the id of a newly created annotation.
    pub fn pointer_up(&mut self, event: PointerEvent) -> Option<AnnotationId> {
        self.pointer_move(event);
        self.finish_interaction(true)
    }

    /// Pointer left the canvas. A creation in progress is dropped; a move or
    /// resize keeps what was already applied.
    pub fn pointer_leave(&mut self) {
        self.finish_interaction(false);
    }

    /// Clamped rectangle of the box being drawn.
    pub fn preview(&self) -> Option<BBox> {
        self.interaction
            .creation_rect()
            .map(|rect| clamp_to_image(rect, self.bounds))
    }

    /// Handle of the selected box under a screen position, for cursor hints.
    pub fn handle_under(&self, screen: Point) -> Option<Handle> {
        let (_, bbox) = self.selected_box()?;
        let p = self.viewport.to_image_space(screen);
        hit_test_handle(bbox, p, self.viewport.handle_tolerance())
    }

    fn selected_box(&self) -> Option<(AnnotationId, BBox)> {
        self.selected_annotation().map(|a| (a.id, a.bbox))
    }

    fn finish_interaction(&mut self, commit: bool) -> Option<AnnotationId> {
        match std::mem::take(&mut self.interaction) {
            Interaction::Idle | Interaction::Panning { .. } => None,
            Interaction::Creating { anchor, current } => {
                let created = if commit {
                    self.commit_creation(anchor, current)
                } else {
                    None
                };
                if created.is_none() {
                    self.history.discard_last();
                }
                created
            }
            Interaction::Moving {
                annotation_id,
                original,
                ..
            }
            | Interaction::Resizing {
                annotation_id,
                original,
                ..
            } => {
                let changed = self
                    .store
                    .find(annotation_id)
                    .is_some_and(|a| a.bbox != original);
                if changed {
                    self.revalidate();
                } else {
                    self.history.discard_last();
                }
                None
            }
        }
    }

    /// Abandon a box being drawn along with its snapshot.
    fn drop_draft(&mut self) -> bool {
        if !matches!(self.interaction, Interaction::Creating { .. }) {
            return false;
        }
        self.interaction = Interaction::Idle;
        self.history.discard_last();
        log::debug!("Draft box dropped");
        true
    }

    fn commit_creation(&mut self, anchor: Point, current: Point) -> Option<AnnotationId> {
        let armed = self.armed.as_ref()?;
        let rect = clamp_to_image(from_corners(anchor, current), self.bounds);
        if rect.w < self.min_box_size || rect.h < self.min_box_size {
            log::debug!("Dropped {}x{} box below minimum size", rect.w, rect.h);
            return None;
        }

        let value = self.document.text_at(&armed.label);
        let annotation = Annotation::new(armed.label.clone(), rect, armed.color).with_value(value);
        let label = annotation.label.clone();
        match self.store.add(annotation) {
            Ok(id) => {
                self.selected = Some(id);
                log::info!("➕ Created {} at {:?}", label, rect);
                self.revalidate();
                Some(id)
            }
            Err(e) => {
                log::warn!("Failed to add annotation: {}", e);
                None
            }
        }
    }

    // === Keyboard ===

    /// Handle a key press. Returns the command it triggered, if any.
    pub fn handle_key(&mut self, key: Key, modifiers: Modifiers) -> Option<KeyCommand> {
        let command = KeyCommand::from_key(key, modifiers)?;
        self.apply_command(command);
        Some(command)
    }

    pub fn apply_command(&mut self, command: KeyCommand) {
        match command {
            KeyCommand::Cancel => {
                self.drop_draft();
                self.disarm();
            }
            KeyCommand::Undo => {
                self.undo();
            }
            KeyCommand::Redo => {
                self.redo();
            }
            KeyCommand::Delete => {
                self.delete_selected();
            }
            KeyCommand::ToggleLabels => self.display.labels = !self.display.labels,
            KeyCommand::ToggleBorders => self.display.borders = !self.display.borders,
            KeyCommand::ToggleFills => self.display.fills = !self.display.fills,
        }
    }

    // === Editing ===

    /// Step back one discrete action. Returns false when there is nothing
    /// to undo.
    ///
    /// A box still being drawn is the pending action, so it is dropped
    /// instead. A move or resize in flight ends first and is then undone.
    pub fn undo(&mut self) -> bool {
        if self.drop_draft() {
            return true;
        }
        self.finish_interaction(false);
        match self.history.undo(&self.store) {
            Some(previous) => {
                self.store = previous;
                self.selected = None;
                self.revalidate();
                true
            }
            None => false,
        }
    }

    /// Re-apply an undone action.
    pub fn redo(&mut self) -> bool {
        self.drop_draft();
        self.finish_interaction(false);
        match self.history.redo(&self.store) {
            Some(next) => {
                self.store = next;
                self.selected = None;
                self.revalidate();
                true
            }
            None => false,
        }
    }

    /// Delete the selected annotation as one undoable action. A drag in
    /// flight ends first so it keeps its own history step.
    pub fn delete_selected(&mut self) -> Option<Annotation> {
        self.finish_interaction(false);
        let id = self.selected.take()?;
        self.store.find(id)?;
        self.history.begin(&self.store);
        let removed = self.store.remove(id);
        if let Some(ann) = &removed {
            log::info!("🗑️ Deleted {} ({})", ann.label, id);
        }
        self.revalidate();
        removed
    }

    /// Select an annotation by id, or clear the selection. Unknown ids are
    /// ignored.
    pub fn select(&mut self, id: Option<AnnotationId>) -> bool {
        match id {
            Some(id) if self.store.find(id).is_none() => false,
            _ => {
                self.selected = id;
                true
            }
        }
    }

    pub fn set_confidence(&mut self, id: AnnotationId, confidence: Confidence) -> bool {
        let Some(ann) = self.store.find_mut(id) else {
            return false;
        };
        ann.confidence = confidence;
        self.revalidate();
        true
    }

    /// Replace the captured text of one annotation.
    pub fn set_value(&mut self, id: AnnotationId, value: impl Into<String>) -> bool {
        let Some(ann) = self.store.find_mut(id) else {
            return false;
        };
        ann.value = value.into();
        self.revalidate();
        true
    }

    // === Loading ===

    /// Replace the document from JSON text. Existing annotations are kept.
    /// On error the session is unchanged.
    pub fn load_document(&mut self, json: &str) -> Result<(), DocumentError> {
        let document = Document::from_json(json)?;
        self.set_document(document);
        Ok(())
    }

    pub fn set_document(&mut self, document: Document) {
        self.document = document;
        log::info!(
            "📄 Loaded document with {} line items",
            self.document.line_item_count()
        );
        self.revalidate();
    }

    pub fn set_image_bounds(&mut self, bounds: ImageBounds) {
        self.bounds = bounds;
        self.revalidate();
    }

    /// Take the page's name and size from a decoded image.
    pub fn load_page(&mut self, page: &PageImage) {
        self.image_filename = Some(page.filename.clone());
        self.set_image_bounds(page.bounds());
    }

    /// Fit the page into a canvas of the given size.
    pub fn fit_view(&mut self, canvas_width: f64, canvas_height: f64) {
        self.viewport.fit(canvas_width, canvas_height, self.bounds);
    }

    /// Clear annotations, selection, the armed field, history and display
    /// toggles. The document and page stay loaded.
    pub fn reset(&mut self) {
        self.store.clear();
        self.selected = None;
        self.armed = None;
        self.interaction = Interaction::Idle;
        self.history.clear();
        self.display = DisplayOptions::default();
        log::info!("Session reset");
        self.revalidate();
    }

    // === Recognition ===

    /// Build a recognition request for one annotation.
    pub fn ocr_request(&self, id: AnnotationId, page: &PageImage) -> Option<OcrRequest> {
        let ann = self.store.find(id)?;
        Some(OcrRequest {
            annotation_id: id,
            label: ann.label.clone(),
            region: page.crop(&ann.bbox),
        })
    }

    /// Requests for every annotation, in creation order.
    pub fn ocr_requests(&self, page: &PageImage) -> Vec<OcrRequest> {
        self.store
            .iter()
            .filter_map(|a| self.ocr_request(a.id, page))
            .collect()
    }

    /// Write a recognition result into the annotation and the document.
    /// Results for annotations that no longer exist are dropped.
    pub fn apply_recognition(&mut self, result: OcrResult) -> bool {
        let Some(ann) = self.store.find_mut(result.annotation_id) else {
            log::warn!(
                "Dropping recognition result for deleted annotation {} ({})",
                result.annotation_id,
                result.label
            );
            return false;
        };
        ann.value = result.text.clone();
        let label = ann.label.clone();

        if let Err(e) = self.document.write(&label, Value::String(result.text)) {
            log::warn!("Could not write recognized text to {}: {}", label, e);
        }
        self.revalidate();
        true
    }

    // === Import / export ===

    /// Replace all annotations with those from a labels file, as one
    /// undoable action. On error the session is unchanged.
    pub fn import_labels(&mut self, bytes: &[u8]) -> Result<usize, FormatError> {
        let annotations = LabelsFormat.import_from_bytes(bytes)?;
        let store = AnnotationStore::from_annotations(annotations)?;

        self.history.begin(&self.store);
        self.store = store;
        self.selected = None;
        self.interaction = Interaction::Idle;
        log::info!("Imported {} annotations", self.store.len());
        self.revalidate();
        Ok(self.store.len())
    }

    /// Snapshot of everything an exporter needs. Attach the page image with
    /// [`ExportData::with_image`] for the annotated export.
    pub fn export_data(&self) -> ExportData<'_> {
        ExportData::new(
            self.image_filename.as_deref(),
            self.bounds,
            &self.document,
            &self.store,
        )
        .with_display(self.display)
        .with_selected(self.selected)
    }

    /// Bounds used before any image is loaded.
    pub fn default_bounds(&self) -> ImageBounds {
        self.default_bounds
    }

    fn revalidate(&mut self) {
        self.report = validate(&self.document, &self.store, self.bounds);
        for observer in &mut self.observers {
            observer(&self.report);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use image::{DynamicImage, Rgb, RgbImage};

    use super::*;

    fn path(label: &str) -> FieldPath {
        FieldPath::parse(label).unwrap()
    }

    /// Drag with the primary button from `from` to `to` (screen space).
    fn drag(session: &mut Session, from: (f64, f64), to: (f64, f64)) -> Option<AnnotationId> {
        session.pointer_down(PointerEvent::primary(from.0, from.1));
        session.pointer_move(PointerEvent::primary(to.0, to.1));
        session.pointer_up(PointerEvent::primary(to.0, to.1))
    }

    fn session_with_box(label: &str, bbox: BBox) -> (Session, AnnotationId) {
        let mut session = Session::new();
        session.arm(&path(label));
        let id = drag(
            &mut session,
            (f64::from(bbox.x), f64::from(bbox.y)),
            (f64::from(bbox.right()), f64::from(bbox.bottom())),
        )
        .unwrap();
        (session, id)
    }

    fn store_json(session: &Session) -> String {
        serde_json::to_string(session.annotations()).unwrap()
    }

    #[test]
    fn test_reversed_drag_creates_normalized_box() {
        let mut session = Session::new();
        session.arm(&path("buyer.company_name"));
        let id = drag(&mut session, (500.0, 500.0), (10.0, 10.0)).unwrap();

        let ann = session.annotations().find(id).unwrap();
        assert_eq!(ann.bbox, BBox::new(10, 10, 490, 490));
        assert_eq!(ann.group_color, "#2563EB");
        assert_eq!(ann.confidence, Confidence::Exact);
        assert_eq!(session.selected(), Some(id));
        assert!(session.interaction().is_idle());
    }

    #[test]
    fn test_arming_line_template_walks_indices() {
        let template = path("invoice.line_items[i].product_name");
        let mut session = Session::new();

        let first = session.arm(&template);
        assert_eq!(first.to_string(), "invoice.line_items[0].product_name");
        drag(&mut session, (10.0, 10.0), (60.0, 30.0)).unwrap();

        let second = session.arm(&template);
        assert_eq!(second.to_string(), "invoice.line_items[1].product_name");
    }

    #[test]
    fn test_arming_scalar_is_idempotent() {
        let mut session = Session::new();
        let a = session.arm(&path("seller.gstin"));
        drag(&mut session, (10.0, 10.0), (60.0, 30.0)).unwrap();
        let b = session.arm(&path("seller.gstin"));
        assert_eq!(a, b);
        assert_eq!(session.armed().map(|f| f.color), Some("#EF4444"));
    }

    #[test]
    fn test_set_armed_index_and_disarm() {
        let mut session = Session::new();
        assert_eq!(session.set_armed_index(3), None);

        session.arm(&path("invoice.line_items[i].unit"));
        let label = session.set_armed_index(4).unwrap();
        assert_eq!(label.to_string(), "invoice.line_items[4].unit");

        session.arm(&path("invoice.date"));
        assert_eq!(session.set_armed_index(2), None);

        session.disarm();
        assert!(session.armed().is_none());
    }

    #[test]
    fn test_small_box_is_discarded_without_history() {
        let mut session = Session::new();
        session.arm(&path("invoice.date"));
        assert!(drag(&mut session, (100.0, 100.0), (101.0, 140.0)).is_none());

        assert!(session.annotations().is_empty());
        assert!(!session.history().can_undo());
    }

    #[test]
    fn test_press_without_armed_field_is_noop() {
        let mut session = Session::new();
        assert!(drag(&mut session, (10.0, 10.0), (80.0, 80.0)).is_none());
        assert!(session.annotations().is_empty());
        assert!(!session.history().can_undo());
    }

    #[test]
    fn test_creation_clamped_to_image() {
        let mut session = Session::new();
        session.set_image_bounds(ImageBounds::new(200, 100));
        session.arm(&path("invoice.bill_no"));
        session.pointer_down(PointerEvent::primary(150.0, 50.0));
        session.pointer_move(PointerEvent::primary(300.0, 300.0));
        assert_eq!(session.preview(), Some(BBox::new(150, 50, 50, 50)));

        let id = session
            .pointer_up(PointerEvent::primary(300.0, 300.0))
            .unwrap();
        assert_eq!(
            session.annotations().find(id).map(|a| a.bbox),
            Some(BBox::new(150, 50, 50, 50))
        );
    }

    #[test]
    fn test_value_prefilled_from_document() {
        let mut session = Session::new();
        session
            .load_document(r#"{"invoice": {"line_items": [{"quantity": 12}]}}"#)
            .unwrap();
        session.arm(&path("invoice.line_items[i].quantity"));
        let id = drag(&mut session, (10.0, 10.0), (40.0, 40.0)).unwrap();

        assert_eq!(session.annotations().find(id).unwrap().value, "12");
    }

    #[test]
    fn test_click_selects_then_drag_moves() {
        let (mut session, id) = session_with_box("invoice.date", BBox::new(100, 100, 50, 50));
        session.select(None);

        // First press only selects
        session.pointer_down(PointerEvent::primary(120.0, 120.0));
        assert_eq!(session.selected(), Some(id));
        assert!(session.interaction().is_idle());
        let undo_steps = session.history().undo_count();

        session.pointer_down(PointerEvent::primary(120.0, 120.0));
        assert_eq!(session.interaction().name(), "moving");
        session.pointer_move(PointerEvent::primary(125.0, 122.0));
        session.pointer_up(PointerEvent::primary(130.0, 125.0));

        assert_eq!(
            session.annotations().find(id).map(|a| a.bbox),
            Some(BBox::new(110, 105, 50, 50))
        );
        assert_eq!(session.history().undo_count(), undo_steps + 1);
    }

    #[test]
    fn test_move_stays_inside_image() {
        let (mut session, id) = session_with_box("invoice.date", BBox::new(100, 100, 50, 50));
        drag(&mut session, (120.0, 120.0), (2000.0, -500.0));

        assert_eq!(
            session.annotations().find(id).map(|a| a.bbox),
            Some(BBox::new(950, 0, 50, 50))
        );
    }

    #[test]
    fn test_click_without_movement_records_nothing() {
        let (mut session, _) = session_with_box("invoice.date", BBox::new(100, 100, 50, 50));
        let before = session.history().undo_count();

        session.pointer_down(PointerEvent::primary(120.0, 120.0));
        session.pointer_up(PointerEvent::primary(120.0, 120.0));
        assert_eq!(session.history().undo_count(), before);
    }

    #[test]
    fn test_resize_from_corner_handle() {
        let (mut session, id) = session_with_box("invoice.date", BBox::new(100, 100, 50, 50));
        assert_eq!(session.handle_under(Point::new(151.0, 149.0)), Some(Handle::SE));

        session.pointer_down(PointerEvent::primary(150.0, 150.0));
        assert_eq!(session.interaction().name(), "resizing");
        session.pointer_up(PointerEvent::primary(200.0, 180.0));

        assert_eq!(
            session.annotations().find(id).map(|a| a.bbox),
            Some(BBox::new(100, 100, 100, 80))
        );
    }

    #[test]
    fn test_handle_tolerance_shrinks_with_zoom() {
        let (mut session, _) = session_with_box("invoice.date", BBox::new(100, 100, 50, 50));
        session.viewport_mut().zoom_at(Point::new(0.0, 0.0), 3.0);

        // Screen (465, 465) is image (155, 155), outside the 2px tolerance
        assert_eq!(session.handle_under(Point::new(465.0, 465.0)), None);
        assert_eq!(session.handle_under(Point::new(453.0, 453.0)), Some(Handle::SE));
    }

    #[test]
    fn test_undo_all_then_redo_all() {
        let mut session = Session::new();
        let empty = store_json(&session);

        session.arm(&path("buyer.company_name"));
        let first = drag(&mut session, (10.0, 10.0), (100.0, 40.0)).unwrap();
        session.arm(&path("invoice.line_items[i].unit"));
        drag(&mut session, (10.0, 200.0), (60.0, 220.0)).unwrap();
        session.select(Some(first));
        drag(&mut session, (20.0, 20.0), (40.0, 50.0));
        let final_state = store_json(&session);
        session.delete_selected().unwrap();
        let after_delete = store_json(&session);

        let steps = session.history().undo_count();
        assert_eq!(steps, 4);
        for _ in 0..steps {
            assert!(session.undo());
        }
        assert!(!session.undo());
        assert_eq!(store_json(&session), empty);
        assert_eq!(session.selected(), None);

        for _ in 0..steps - 1 {
            assert!(session.redo());
        }
        assert_eq!(store_json(&session), final_state);
        assert!(session.redo());
        assert_eq!(store_json(&session), after_delete);
        assert!(!session.redo());
    }

    #[test]
    fn test_delete_during_move_keeps_both_steps() {
        let (mut session, id) = session_with_box("invoice.date", BBox::new(100, 100, 50, 50));
        session.pointer_down(PointerEvent::primary(120.0, 120.0));
        session.pointer_move(PointerEvent::primary(150.0, 130.0));

        session.handle_key(Key::Delete, Modifiers::NONE);
        assert!(session.annotations().is_empty());
        assert!(session.interaction().is_idle());
        session.pointer_up(PointerEvent::primary(150.0, 130.0));
        assert_eq!(session.history().undo_count(), 3);

        assert!(session.undo());
        assert_eq!(
            session.annotations().find(id).map(|a| a.bbox),
            Some(BBox::new(130, 110, 50, 50))
        );
        assert!(session.undo());
        assert_eq!(
            session.annotations().find(id).map(|a| a.bbox),
            Some(BBox::new(100, 100, 50, 50))
        );
    }

    #[test]
    fn test_delete_during_resize_keeps_both_steps() {
        let (mut session, id) = session_with_box("invoice.date", BBox::new(100, 100, 50, 50));
        session.pointer_down(PointerEvent::primary(150.0, 150.0));
        assert_eq!(session.interaction().name(), "resizing");
        session.pointer_move(PointerEvent::primary(180.0, 170.0));

        session.delete_selected().unwrap();
        session.pointer_up(PointerEvent::primary(180.0, 170.0));

        assert!(session.undo());
        assert_eq!(
            session.annotations().find(id).map(|a| a.bbox),
            Some(BBox::new(100, 100, 80, 70))
        );
    }

    #[test]
    fn test_undo_while_drawing_drops_only_the_draft() {
        let (mut session, id) = session_with_box("invoice.date", BBox::new(10, 10, 50, 50));
        session.pointer_down(PointerEvent::primary(200.0, 200.0));
        session.pointer_move(PointerEvent::primary(260.0, 240.0));
        assert_eq!(session.interaction().name(), "creating");

        assert_eq!(
            session.handle_key(Key::Z, Modifiers::CTRL),
            Some(KeyCommand::Undo)
        );
        assert!(session.interaction().is_idle());
        assert!(session.annotations().find(id).is_some());
        assert_eq!(session.history().undo_count(), 1);
        assert!(!session.history().can_redo());

        // Release after the undo commits nothing
        assert_eq!(session.pointer_up(PointerEvent::primary(260.0, 240.0)), None);
        assert_eq!(session.annotations().len(), 1);

        assert!(session.undo());
        assert!(session.annotations().is_empty());
    }

    #[test]
    fn test_undo_while_moving_reverts_the_move() {
        let (mut session, id) = session_with_box("invoice.date", BBox::new(100, 100, 50, 50));
        session.pointer_down(PointerEvent::primary(120.0, 120.0));
        session.pointer_move(PointerEvent::primary(150.0, 120.0));

        assert!(session.undo());
        assert!(session.interaction().is_idle());
        assert_eq!(
            session.annotations().find(id).map(|a| a.bbox),
            Some(BBox::new(100, 100, 50, 50))
        );
        assert!(session.redo());
        assert_eq!(
            session.annotations().find(id).map(|a| a.bbox),
            Some(BBox::new(130, 100, 50, 50))
        );
    }

    #[test]
    fn test_new_action_clears_redo() {
        let (mut session, _) = session_with_box("invoice.date", BBox::new(10, 10, 50, 50));
        session.undo();
        assert!(session.history().can_redo());

        session.arm(&path("invoice.bill_no"));
        drag(&mut session, (100.0, 100.0), (150.0, 150.0)).unwrap();
        assert!(!session.history().can_redo());
    }

    #[test]
    fn test_pointer_leave_discards_creation() {
        let mut session = Session::new();
        session.arm(&path("invoice.date"));
        session.pointer_down(PointerEvent::primary(10.0, 10.0));
        session.pointer_move(PointerEvent::primary(200.0, 200.0));
        session.pointer_leave();

        assert!(session.annotations().is_empty());
        assert!(session.interaction().is_idle());
        assert!(!session.history().can_undo());
    }

    #[test]
    fn test_pointer_leave_keeps_move() {
        let (mut session, id) = session_with_box("invoice.date", BBox::new(100, 100, 50, 50));
        session.pointer_down(PointerEvent::primary(120.0, 120.0));
        session.pointer_move(PointerEvent::primary(140.0, 120.0));
        session.pointer_leave();

        assert_eq!(
            session.annotations().find(id).map(|a| a.bbox),
            Some(BBox::new(120, 100, 50, 50))
        );
        assert!(session.interaction().is_idle());
    }

    #[test]
    fn test_panning_moves_view_only() {
        let (mut session, id) = session_with_box("invoice.date", BBox::new(100, 100, 50, 50));
        let before = store_json(&session);

        session.pointer_down(PointerEvent::middle(0.0, 0.0));
        session.pointer_move(PointerEvent::middle(30.0, -10.0));
        session.pointer_up(PointerEvent::middle(40.0, -20.0));
        assert_eq!((session.viewport().pan_x, session.viewport().pan_y), (40.0, -20.0));

        session.pointer_down(PointerEvent::primary(0.0, 0.0).with_modifiers(Modifiers::SHIFT));
        assert_eq!(session.interaction().name(), "panning");
        session.pointer_leave();

        assert_eq!(store_json(&session), before);
        assert_eq!(session.selected(), Some(id));
    }

    #[test]
    fn test_screen_points_go_through_viewport() {
        let mut session = Session::new();
        session.viewport_mut().zoom = 2.0;
        session.viewport_mut().pan_by(10.0, 10.0);
        session.arm(&path("invoice.date"));
        let id = drag(&mut session, (30.0, 30.0), (110.0, 70.0)).unwrap();

        assert_eq!(
            session.annotations().find(id).map(|a| a.bbox),
            Some(BBox::new(10, 10, 40, 20))
        );
    }

    #[test]
    fn test_keyboard_commands() {
        let (mut session, _) = session_with_box("invoice.date", BBox::new(10, 10, 50, 50));

        assert_eq!(
            session.handle_key(Key::Delete, Modifiers::NONE),
            Some(KeyCommand::Delete)
        );
        assert!(session.annotations().is_empty());

        session.handle_key(Key::Z, Modifiers::CTRL);
        assert_eq!(session.annotations().len(), 1);
        session.handle_key(Key::Y, Modifiers::CTRL);
        assert!(session.annotations().is_empty());

        session.handle_key(Key::F, Modifiers::NONE);
        session.handle_key(Key::B, Modifiers::NONE);
        assert_eq!(
            session.display(),
            DisplayOptions {
                labels: true,
                borders: false,
                fills: true
            }
        );
        assert_eq!(session.handle_key(Key::Other, Modifiers::NONE), None);
    }

    #[test]
    fn test_escape_cancels_creation_and_disarms() {
        let mut session = Session::new();
        session.arm(&path("invoice.date"));
        session.pointer_down(PointerEvent::primary(10.0, 10.0));
        session.handle_key(Key::Escape, Modifiers::NONE);

        assert!(session.interaction().is_idle());
        assert!(session.armed().is_none());
        assert!(!session.history().can_undo());
        assert!(session
            .pointer_up(PointerEvent::primary(100.0, 100.0))
            .is_none());
    }

    #[test]
    fn test_delete_without_selection() {
        let mut session = Session::new();
        assert!(session.delete_selected().is_none());
        assert!(!session.history().can_undo());
    }

    #[test]
    fn test_select_unknown_id_is_ignored() {
        let (mut session, id) = session_with_box("invoice.date", BBox::new(10, 10, 50, 50));
        assert!(!session.select(Some(uuid::Uuid::new_v4())));
        assert_eq!(session.selected(), Some(id));
        assert!(session.select(None));
        assert_eq!(session.selected(), None);
    }

    #[test]
    fn test_observers_see_every_mutation() {
        let seen: Rc<RefCell<Vec<usize>>> = Rc::default();
        let mut session = Session::new();
        session
            .load_document(r#"{"buyer": {"company_name": "ABC"}}"#)
            .unwrap();
        let sink = Rc::clone(&seen);
        session.subscribe(Box::new(move |report| {
            sink.borrow_mut().push(report.warnings.len());
        }));
        assert_eq!(*seen.borrow(), vec![1]);

        session.arm(&path("buyer.company_name"));
        drag(&mut session, (10.0, 10.0), (80.0, 30.0)).unwrap();
        assert_eq!(seen.borrow().last(), Some(&0));

        session.undo();
        assert_eq!(seen.borrow().last(), Some(&1));
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn test_validation_scenario() {
        let mut session = Session::new();
        session
            .load_document(
                r#"{"buyer": {"company_name": "ABC"}, "seller": {"gstin": null}}"#,
            )
            .unwrap();
        let report = session.report();

        assert!(report.omitted.contains(&"seller.gstin".to_string()));
        assert!(report
            .warnings
            .contains(&"buyer.company_name has 0 boxes".to_string()));
    }

    #[test]
    fn test_malformed_document_leaves_session_unchanged() {
        let mut session = Session::new();
        session.load_document(r#"{"invoice": {"bill_no": "7"}}"#).unwrap();
        let before = session.document().clone();

        assert!(session.load_document("{not json").is_err());
        assert!(matches!(
            session.load_document("[1, 2]"),
            Err(DocumentError::NotAnObject)
        ));
        assert_eq!(session.document(), &before);
    }

    #[test]
    fn test_loading_document_keeps_annotations() {
        let (mut session, id) = session_with_box("invoice.date", BBox::new(10, 10, 50, 50));
        session.load_document("{}").unwrap();
        assert!(session.annotations().find(id).is_some());
    }

    #[test]
    fn test_recognition_write_back() {
        let (mut session, id) =
            session_with_box("invoice.line_items[i].unit", BBox::new(10, 10, 50, 50));
        let label = path("invoice.line_items[0].unit");
        let applied = session.apply_recognition(OcrResult {
            annotation_id: id,
            label: label.clone(),
            text: "kg".into(),
        });

        assert!(applied);
        assert_eq!(session.annotations().find(id).unwrap().value, "kg");
        assert_eq!(session.document().text_at(&label), "kg");
    }

    #[test]
    fn test_recognition_for_deleted_box_is_dropped() {
        let (mut session, id) = session_with_box("invoice.date", BBox::new(10, 10, 50, 50));
        session.delete_selected().unwrap();
        let doc = session.document().clone();

        let applied = session.apply_recognition(OcrResult {
            annotation_id: id,
            label: path("invoice.date"),
            text: "2025-01-01".into(),
        });
        assert!(!applied);
        assert_eq!(session.document(), &doc);
        assert!(session.annotations().is_empty());
    }

    #[test]
    fn test_ocr_requests_crop_each_box() {
        let (mut session, id) = session_with_box("invoice.date", BBox::new(10, 10, 50, 20));
        let page = PageImage::new(
            "scan.png",
            DynamicImage::ImageRgb8(RgbImage::from_pixel(1000, 1400, Rgb([255, 255, 255]))),
        );
        session.load_page(&page);

        let requests = session.ocr_requests(&page);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].annotation_id, id);
        assert_eq!((requests[0].region.width(), requests[0].region.height()), (50, 20));
        assert!(session.ocr_request(uuid::Uuid::new_v4(), &page).is_none());
    }

    #[test]
    fn test_set_value_and_confidence() {
        let (mut session, id) = session_with_box("invoice.date", BBox::new(10, 10, 50, 50));
        assert!(session.set_value(id, "01/02/2025"));
        assert!(session.set_confidence(id, Confidence::Unsure));
        assert!(!session.set_confidence(uuid::Uuid::new_v4(), Confidence::Low));

        let ann = session.annotations().find(id).unwrap();
        assert_eq!(ann.value, "01/02/2025");
        assert_eq!(ann.confidence, Confidence::Unsure);
    }

    #[test]
    fn test_import_labels_replaces_store() {
        let (source, _) = session_with_box("invoice.bill_no", BBox::new(5, 5, 20, 20));
        let (bytes, _) = LabelsFormat.export_to_bytes(&source.export_data()).unwrap();

        let (mut session, _) = session_with_box("invoice.date", BBox::new(10, 10, 50, 50));
        assert_eq!(session.import_labels(&bytes).unwrap(), 1);
        assert_eq!(session.annotations().as_slice(), source.annotations().as_slice());
        assert_eq!(session.selected(), None);

        // Import is one undoable step
        session.undo();
        assert_eq!(session.annotations().iter().next().unwrap().label.to_string(), "invoice.date");
    }

    #[test]
    fn test_bad_import_leaves_store_unchanged() {
        let (mut session, _) = session_with_box("invoice.date", BBox::new(10, 10, 50, 50));
        let before = store_json(&session);
        let undo_steps = session.history().undo_count();

        assert!(session.import_labels(br#"{"image": {}}"#).is_err());
        assert!(session
            .import_labels(br#"{"annotations": [{"label": "a[0]", "bbox": [0,0,1,1]}]}"#)
            .is_err());
        assert_eq!(store_json(&session), before);
        assert_eq!(session.history().undo_count(), undo_steps);
    }

    #[test]
    fn test_reset() {
        let (mut session, _) = session_with_box("invoice.date", BBox::new(10, 10, 50, 50));
        session.load_document(r#"{"invoice": {"date": "x"}}"#).unwrap();
        session.handle_key(Key::F, Modifiers::NONE);
        session.reset();

        assert!(session.annotations().is_empty());
        assert!(session.armed().is_none());
        assert!(session.selected().is_none());
        assert!(!session.history().can_undo());
        assert_eq!(session.display(), DisplayOptions::default());
        assert_eq!(session.document().text_at(&path("invoice.date")), "x");
    }

    #[test]
    fn test_fit_view_centres_page() {
        let mut session = Session::new();
        session.fit_view(500.0, 1400.0);
        let vp = session.viewport();
        assert_eq!(vp.zoom, 0.5);
        assert_eq!((vp.pan_x, vp.pan_y), (0.0, 350.0));
    }

    #[test]
    fn test_export_data_uses_session_state() {
        let (mut session, _) = session_with_box("invoice.date", BBox::new(10, 10, 50, 50));
        session.handle_key(Key::F, Modifiers::NONE);
        let data = session.export_data();

        assert_eq!(data.image_filename, "image.png");
        assert_eq!(data.bounds, session.default_bounds());
        assert_eq!(data.annotations.len(), 1);
        assert!(data.display.fills);
    }
}
