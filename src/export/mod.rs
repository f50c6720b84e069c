pub mod html_review_export;
pub mod json_export;
pub mod text_export;

use anyhow::Result;

use crate::pipeline::RunOutput;

pub use html_review_export::HtmlReviewExporter;
pub use json_export::JsonExporter;
pub use text_export::TextExporter;

pub trait Exporter {
    fn export(&self, run: &RunOutput) -> Result<()>;
}
