use egen_spec::SpecDocument;

use crate::config::GenConfig;
use crate::error::CodegenError;
use crate::file_rep::{FileRep, GeneratedFileSet};

/// A named generation stage.
///
/// A plugin sees everything generated so far and returns the complete file
/// set that replaces it. `Ok(None)` means the plugin had nothing to
/// contribute; the pipeline keeps the previous set and moves on.
pub trait Plugin {
    /// Identifier used for selection, e.g. `OPCODE`
    fn id(&self) -> &'static str;

    fn process(
        &self,
        generated: &GeneratedFileSet,
        spec: &SpecDocument,
        config: &GenConfig,
    ) -> Result<Option<GeneratedFileSet>, CodegenError>;
}

/// Destination for finished files.
pub trait FileSink {
    fn write_file(&mut self, name: &str, file: &FileRep) -> Result<(), CodegenError>;
}
