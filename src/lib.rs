// jurtopics: topic discovery for legal-decision texts
//
// This is the library root. Each module corresponds to a stage or an
// ambient concern of the topic pipeline.

pub mod config;
pub mod corpus;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod text;
pub mod topics;

pub use config::{ModelType, PipelineConfig};
pub use error::TopicError;
pub use pipeline::{run, Topic, TopicReport};
