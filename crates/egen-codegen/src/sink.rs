use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::CodegenError;
use crate::file_rep::FileRep;
use crate::traits::FileSink;

/// Include path for internal references: `out_dir` with `strip_prefix`
/// removed from its front. Only whole path components are stripped; a
/// prefix that does not match leaves `out_dir` untouched.
pub fn include_path(out_dir: &Path, strip_prefix: &str) -> String {
    let stripped = if strip_prefix.is_empty() {
        out_dir
    } else {
        out_dir.strip_prefix(strip_prefix).unwrap_or(out_dir)
    };
    stripped.to_string_lossy().into_owned()
}

/// Writes each file into a directory, creating it if needed.
#[derive(Debug)]
pub struct DirSink {
    out_dir: PathBuf,
    include_path: String,
}

impl DirSink {
    pub fn new(out_dir: impl Into<PathBuf>, strip_prefix: &str) -> Self {
        let out_dir = out_dir.into();
        let include_path = include_path(&out_dir, strip_prefix);
        Self {
            out_dir,
            include_path,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

impl FileSink for DirSink {
    fn write_file(&mut self, name: &str, file: &FileRep) -> Result<(), CodegenError> {
        std::fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join(name);
        std::fs::write(&path, file.render(&self.include_path))?;
        log::info!("wrote {}", path.display());
        Ok(())
    }
}

/// Writes every file to a stream, each preceded by a banner line.
pub struct StreamSink<W: Write> {
    writer: W,
    include_path: String,
}

impl<W: Write> StreamSink<W> {
    pub fn new(writer: W, include_path: impl Into<String>) -> Self {
        Self {
            writer,
            include_path: include_path.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FileSink for StreamSink<W> {
    fn write_file(&mut self, name: &str, file: &FileRep) -> Result<(), CodegenError> {
        writeln!(self.writer, "============== {name} ==============")?;
        writeln!(self.writer, "{}", file.render(&self.include_path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_include_path() {
        assert_eq!(include_path(Path::new("build/gen/tenncor"), "build/gen"), "tenncor");
        assert_eq!(include_path(Path::new("gen"), ""), "gen");
        assert_eq!(include_path(Path::new("gen"), "gen"), "");
        assert_eq!(include_path(Path::new("gen/api"), "other"), "gen/api");
        assert_eq!(include_path(Path::new("build/gen/tenncor"), "build/gen/"), "tenncor");
    }

    #[test]
    fn test_include_path_keeps_partial_matches() {
        // "gen" is a textual prefix of "generated" but not a path component
        assert_eq!(include_path(Path::new("generated/api"), "gen"), "generated/api");
        assert_eq!(include_path(Path::new("/abs/out"), ""), "/abs/out");
        assert_eq!(include_path(Path::new("/abs/out"), "/abs"), "out");
    }

    #[test]
    fn test_dir_sink_writes_rendered_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("generated");
        let prefix = dir.path().to_string_lossy().into_owned();
        let mut sink = DirSink::new(&out, &prefix);

        let file = FileRep::new("int x;\n").with_refs(["dtype.hpp"]);
        sink.write_file("api.hpp", &file).unwrap();

        let content = std::fs::read_to_string(out.join("api.hpp")).unwrap();
        assert_eq!(content, "#include \"generated/dtype.hpp\"\n\nint x;\n");
    }

    #[test]
    fn test_stream_sink_banner() {
        let mut sink = StreamSink::new(Vec::new(), "");
        sink.write_file("a.hpp", &FileRep::new("x")).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "============== a.hpp ==============\n\nx\n");
    }
}
