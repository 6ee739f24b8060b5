//! Session state: the editing context and its input model.

mod interaction;
mod session;

pub use interaction::{
    ArmedField, DisplayOptions, Interaction, Key, KeyCommand, Modifiers, PointerButton,
    PointerEvent,
};
pub use session::{Session, ValidationObserver};
