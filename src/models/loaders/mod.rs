pub mod corpus_loader;
pub mod toml_loader;

pub use corpus_loader::{load_corpus_file, parse_corpus_export};
pub use toml_loader::load_options_file;
