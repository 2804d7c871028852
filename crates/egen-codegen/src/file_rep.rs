use indexmap::IndexMap;

/// Generated files keyed by file name, in emission order.
pub type GeneratedFileSet = IndexMap<String, FileRep>;

/// One generated source file before it is written out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRep {
    pub content: String,
    /// Verbatim include targets, e.g. `<string>` or `"estd/contain.hpp"`
    pub user_includes: Vec<String>,
    /// Names of other files in the same generated set
    pub internal_refs: Vec<String>,
}

impl FileRep {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_includes<I, S>(mut self, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_includes.extend(includes.into_iter().map(Into::into));
        self
    }

    pub fn with_refs<I, S>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.internal_refs.extend(refs.into_iter().map(Into::into));
        self
    }

    /// Final file text: user includes, then internal refs resolved against
    /// `include_path`, then a blank line, then the content.
    pub fn render(&self, include_path: &str) -> String {
        let mut out = String::new();
        for include in &self.user_includes {
            out.push_str("#include ");
            out.push_str(include);
            out.push('\n');
        }
        for file in &self.internal_refs {
            out.push_str(&format!("#include \"{}\"\n", join_include(include_path, file)));
        }
        out.push('\n');
        out.push_str(&self.content);
        out
    }

    /// Check that the entry stored under `name` can be written.
    pub fn check(&self, name: &str) -> Result<(), String> {
        if name.trim().is_empty() {
            return Err("empty file name".to_string());
        }
        if name.contains('/') || name.contains('\\') {
            return Err(format!("file name '{name}' must not contain a path separator"));
        }
        if let Some(include) = self.user_includes.iter().find(|i| i.trim().is_empty()) {
            return Err(format!("empty include '{include}' in '{name}'"));
        }
        for file in &self.internal_refs {
            if file.trim().is_empty() {
                return Err(format!("empty internal reference in '{name}'"));
            }
            if file == name {
                return Err(format!("'{name}' includes itself"));
            }
        }
        Ok(())
    }
}

fn join_include(include_path: &str, file: &str) -> String {
    let base = include_path.trim_end_matches('/');
    if base.is_empty() {
        file.to_string()
    } else {
        format!("{base}/{file}")
    }
}
