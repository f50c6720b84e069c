pub mod config;
pub mod core;
pub mod coverage;
pub mod export;
pub mod extract;
pub mod input;
pub mod layout;
pub mod lookup;
pub mod normalize;
pub mod pipeline;
pub mod resolve;
pub mod segment;
pub mod validate;

pub use core::diagnostics::{Diagnostic, RunContext, Severity};
pub use core::error::PipelineError;
pub use core::model::{Corpus, CrossReference, DictionaryEntry, RawPage};
