pub mod code_table;
pub mod config;
pub mod dep_graph;
pub mod error;
pub mod file_rep;
pub mod pipeline;
pub mod sink;
pub mod template;
pub mod traits;

// Plugins
pub mod emitters;

// Re-exports
pub use config::GenConfig;
pub use error::CodegenError;
pub use file_rep::{FileRep, GeneratedFileSet};
pub use pipeline::{Pipeline, PipelineState};
pub use sink::{DirSink, StreamSink};
pub use traits::{FileSink, Plugin};
