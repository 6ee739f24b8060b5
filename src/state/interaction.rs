//! Input events and the canvas interaction state machine's states.

use crate::geometry::{from_corners, BBox, Handle, Point};
use crate::model::{AnnotationId, FieldPath, Group};

/// Mouse button that produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

/// Modifier keys held during an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
    };
    pub const CTRL: Modifiers = Modifiers {
        shift: false,
        ctrl: true,
    };
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: false,
    };
    pub const CTRL_SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: true,
    };
}

/// A pointer event in screen space (canvas-relative pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerEvent {
    pub position: Point,
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// Primary-button event at `(x, y)` with no modifiers.
    pub fn primary(x: f64, y: f64) -> Self {
        Self {
            position: Point::new(x, y),
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
        }
    }

    /// Middle-button event at `(x, y)`.
    pub fn middle(x: f64, y: f64) -> Self {
        Self {
            button: PointerButton::Middle,
            ..Self::primary(x, y)
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Whether this press should pan the view instead of editing.
    pub fn starts_pan(&self) -> bool {
        self.button == PointerButton::Middle
            || (self.button == PointerButton::Primary && self.modifiers.shift)
    }
}

/// Keys the session reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Delete,
    Backspace,
    Z,
    Y,
    H,
    B,
    F,
    Other,
}

/// Editing command derived from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    /// Abort a creation in progress and disarm
    Cancel,
    Undo,
    Redo,
    /// Delete the selected annotation
    Delete,
    ToggleLabels,
    ToggleBorders,
    ToggleFills,
}

impl KeyCommand {
    /// Map a key press to a command.
    pub fn from_key(key: Key, modifiers: Modifiers) -> Option<KeyCommand> {
        // Ctrl+key shortcuts
        if modifiers.ctrl {
            match key {
                Key::Z if modifiers.shift => return Some(KeyCommand::Redo),
                Key::Z => return Some(KeyCommand::Undo),
                Key::Y => return Some(KeyCommand::Redo),
                _ => {}
            }
        }

        match key {
            Key::Escape => Some(KeyCommand::Cancel),
            Key::Delete | Key::Backspace => Some(KeyCommand::Delete),
            Key::H => Some(KeyCommand::ToggleLabels),
            Key::B => Some(KeyCommand::ToggleBorders),
            Key::F => Some(KeyCommand::ToggleFills),
            _ => None,
        }
    }
}

/// What overlays are drawn on the canvas and in the annotated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOptions {
    pub labels: bool,
    pub borders: bool,
    pub fills: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            labels: true,
            borders: true,
            fills: false,
        }
    }
}

/// The field the next drawn box will be bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmedField {
    /// Concrete label (indexed paths carry a real index).
    pub label: FieldPath,
    pub group: Group,
    pub color: &'static str,
}

impl ArmedField {
    pub fn new(label: FieldPath) -> Self {
        let group = Group::of(&label);
        Self {
            label,
            group,
            color: group.color(),
        }
    }

    /// Whether this field addresses a line item.
    pub fn is_line_item(&self) -> bool {
        self.label.is_indexed()
    }
}

/// Current pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Interaction {
    /// Nothing in progress.
    #[default]
    Idle,
    /// Dragging out a new box. Points are in image space.
    Creating { anchor: Point, current: Point },
    /// Dragging the selected box. The box is recomputed from its original
    /// position plus the total pointer delta.
    Moving {
        annotation_id: AnnotationId,
        original: BBox,
        grab: Point,
    },
    /// Dragging one handle of the selected box.
    Resizing {
        annotation_id: AnnotationId,
        original: BBox,
        handle: Handle,
    },
    /// Panning the view; `last` is the previous screen position.
    Panning { last: Point },
}

impl Interaction {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Interaction::Idle => "idle",
            Interaction::Creating { .. } => "creating",
            Interaction::Moving { .. } => "moving",
            Interaction::Resizing { .. } => "resizing",
            Interaction::Panning { .. } => "panning",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Interaction::Idle)
    }

    /// Normalized rectangle being drawn, before clamping.
    pub fn creation_rect(&self) -> Option<BBox> {
        match self {
            Interaction::Creating { anchor, current } => Some(from_corners(*anchor, *current)),
            _ => None,
        }
    }
}
