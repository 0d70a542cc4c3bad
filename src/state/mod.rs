//! Session state: selection, lists, and the unsaved annotation buffer.

mod buffer;
mod navigation;

pub use buffer::AnnotationBuffer;
pub use navigation::{
    BackOutcome, Generation, Navigation, NavigationError, Selection, SurfaceState, Ticket,
};
