//! Release stage components: notes, publishing and version propagation

pub mod notes;
pub mod propagator;
pub mod publisher;

pub use notes::NoteComposer;
pub use propagator::{PropagationOutcome, Propagator};
pub use publisher::{PublishOutcome, PublishReport, Publisher};
