pub mod content_item;
pub mod loaders;
pub mod options;
pub mod summary;

pub use content_item::{ContentItem, CorpusEntry, ItemStatus};
pub use loaders::{load_corpus_file, load_options_file, parse_corpus_export};
pub use options::NormalizationOptions;
pub use summary::{RunOutcome, RunState, RunSummary};
