pub mod artifact_store;
pub mod canonicalizer;
pub mod comparator;
pub mod diff_writer;
pub mod dual_renderer;

pub use artifact_store::{ArtifactSet, ArtifactStore};
pub use canonicalizer::{canonicalize, Canonicalizer};
pub use comparator::Comparator;
pub use diff_writer::DiffWriter;
pub use dual_renderer::{DualRenderer, RenderOutcome};
