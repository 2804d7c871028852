use egen_spec::SpecDocument;

use crate::config::GenConfig;
use crate::emitters;
use crate::error::CodegenError;
use crate::file_rep::GeneratedFileSet;
use crate::traits::{FileSink, Plugin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Pending,
    /// Index of the plugin currently processing
    Running(usize),
    Done,
}

/// Runs plugins in order, threading the generated file set through them.
pub struct Pipeline {
    plugins: Vec<Box<dyn Plugin>>,
    state: PipelineState,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("plugins", &self.plugin_ids())
            .field("state", &self.state)
            .finish()
    }
}

impl Pipeline {
    pub fn new(plugins: Vec<Box<dyn Plugin>>) -> Self {
        Self {
            plugins,
            state: PipelineState::Pending,
        }
    }

    /// Build a pipeline from plugin identifiers. Unknown identifiers are
    /// skipped with a warning.
    pub fn from_ids<S: AsRef<str>>(ids: &[S]) -> Self {
        let plugins = ids
            .iter()
            .filter_map(|id| {
                let id = id.as_ref();
                let plugin = emitters::create_plugin(id);
                if plugin.is_none() {
                    log::warn!("plugin {id} not found, skipping");
                }
                plugin
            })
            .collect();
        Self::new(plugins)
    }

    pub fn plugin_ids(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.id()).collect()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run every plugin in order and return the final file set.
    ///
    /// A plugin returning `None` is discarded and the previous set carries
    /// over. A plugin error aborts the run.
    pub fn run(
        &mut self,
        spec: &SpecDocument,
        config: &GenConfig,
    ) -> Result<GeneratedFileSet, CodegenError> {
        let mut generated = GeneratedFileSet::new();
        for (i, plugin) in self.plugins.iter().enumerate() {
            self.state = PipelineState::Running(i);
            log::debug!("running plugin {}", plugin.id());
            match plugin.process(&generated, spec, config)? {
                Some(files) => generated = files,
                None => log::warn!(
                    "plugin {} produced no file set, discarding its output",
                    plugin.id()
                ),
            }
        }
        self.state = PipelineState::Done;
        Ok(generated)
    }

    /// Hand every well-formed file to `sink` in order. Malformed entries are
    /// skipped with a warning. Returns the number of files written.
    pub fn emit(generated: &GeneratedFileSet, sink: &mut dyn FileSink) -> Result<usize, CodegenError> {
        let mut written = 0;
        for (name, file) in generated {
            if let Err(reason) = file.check(name) {
                log::warn!("skipping generated file: {reason}");
                continue;
            }
            sink.write_file(name, file)?;
            written += 1;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_rep::FileRep;
    use pretty_assertions::assert_eq;

    struct AddFile(&'static str);

    impl Plugin for AddFile {
        fn id(&self) -> &'static str {
            self.0
        }

        fn process(
            &self,
            generated: &GeneratedFileSet,
            _: &SpecDocument,
            _: &GenConfig,
        ) -> Result<Option<GeneratedFileSet>, CodegenError> {
            let mut next = generated.clone();
            next.insert(format!("{}.hpp", self.0), FileRep::new(self.0));
            Ok(Some(next))
        }
    }

    struct Nothing;

    impl Plugin for Nothing {
        fn id(&self) -> &'static str {
            "NOTHING"
        }

        fn process(
            &self,
            _: &GeneratedFileSet,
            _: &SpecDocument,
            _: &GenConfig,
        ) -> Result<Option<GeneratedFileSet>, CodegenError> {
            Ok(None)
        }
    }

    struct Replace;

    impl Plugin for Replace {
        fn id(&self) -> &'static str {
            "REPLACE"
        }

        fn process(
            &self,
            _: &GeneratedFileSet,
            _: &SpecDocument,
            _: &GenConfig,
        ) -> Result<Option<GeneratedFileSet>, CodegenError> {
            let mut next = GeneratedFileSet::new();
            next.insert("only.hpp".to_string(), FileRep::new("only"));
            Ok(Some(next))
        }
    }

    struct Fail;

    impl Plugin for Fail {
        fn id(&self) -> &'static str {
            "FAIL"
        }

        fn process(
            &self,
            _: &GeneratedFileSet,
            _: &SpecDocument,
            _: &GenConfig,
        ) -> Result<Option<GeneratedFileSet>, CodegenError> {
            Err(CodegenError::malformed("api", "broken"))
        }
    }

    #[derive(Default)]
    struct Collect(Vec<String>);

    impl FileSink for Collect {
        fn write_file(&mut self, name: &str, _: &FileRep) -> Result<(), CodegenError> {
            self.0.push(name.to_string());
            Ok(())
        }
    }

    fn run(plugins: Vec<Box<dyn Plugin>>) -> Result<GeneratedFileSet, CodegenError> {
        Pipeline::new(plugins).run(&SpecDocument::default(), &GenConfig::default())
    }

    #[test]
    fn test_soft_failure_keeps_previous_set() {
        let files = run(vec![Box::new(AddFile("a")), Box::new(Nothing), Box::new(AddFile("c"))]).unwrap();
        let names: Vec<&String> = files.keys().collect();
        assert_eq!(names, vec!["a.hpp", "c.hpp"]);
    }

    #[test]
    fn test_result_replaces_accumulator() {
        let files = run(vec![Box::new(AddFile("a")), Box::new(Replace)]).unwrap();
        let names: Vec<&String> = files.keys().collect();
        assert_eq!(names, vec!["only.hpp"]);
    }

    #[test]
    fn test_hard_failure_aborts() {
        let mut pipeline = Pipeline::new(vec![Box::new(AddFile("a")), Box::new(Fail), Box::new(AddFile("c"))]);
        let err = pipeline
            .run(&SpecDocument::default(), &GenConfig::default())
            .unwrap_err();
        assert!(matches!(err, CodegenError::SpecMalformed { .. }));
        assert_eq!(pipeline.state(), PipelineState::Running(1));
    }

    #[test]
    fn test_state_transitions() {
        let mut pipeline = Pipeline::new(vec![Box::new(AddFile("a"))]);
        assert_eq!(pipeline.state(), PipelineState::Pending);
        pipeline
            .run(&SpecDocument::default(), &GenConfig::default())
            .unwrap();
        assert_eq!(pipeline.state(), PipelineState::Done);
    }

    #[test]
    fn test_from_ids_skips_unknown() {
        let pipeline = Pipeline::from_ids(&["OPCODE", "NOPE", "api"]);
        assert_eq!(pipeline.plugin_ids(), vec!["OPCODE", "API"]);
    }

    #[test]
    fn test_emit_skips_malformed() {
        let mut files = GeneratedFileSet::new();
        files.insert("a.hpp".to_string(), FileRep::new("a"));
        files.insert("b.hpp".to_string(), FileRep::new("b").with_refs(["b.hpp"]));
        files.insert("c.cpp".to_string(), FileRep::new("c").with_refs(["a.hpp"]));

        let mut sink = Collect::default();
        let written = Pipeline::emit(&files, &mut sink).unwrap();
        assert_eq!(written, 2);
        assert_eq!(sink.0, vec!["a.hpp", "c.cpp"]);
    }
}
