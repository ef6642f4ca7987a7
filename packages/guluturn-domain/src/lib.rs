pub mod availability;
pub mod hard_filter;
pub mod models;
pub mod pipeline;
pub mod rerank;
pub mod scoring;
pub mod selection;
pub mod similarity;
pub mod tags;

mod error;

pub use error::{Error, Result};
pub use pipeline::{PipelineSettings, filter_and_select};
pub use tags::{TagCategory, TagMetadata, TagRegistry, TagStrength, USER_REPORT_CLOSED};
