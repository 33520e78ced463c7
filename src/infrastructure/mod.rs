pub mod command;
pub mod renderers;
pub mod store;

pub use command::CommandRenderer;
pub use renderers::{FormatConverter, LegacyRenderer, NewRenderer};
pub use store::{CorpusSource, JsonCorpusStore, JsonlResultSink, ResultSink, StatusRecord};
