use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Error/warning severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single argument (or class member) declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ArgSpec {
    /// Argument name
    pub name: String,

    /// Native type, e.g. `teq::TensptrT` or `const eteq::ETensor<T>&`
    #[serde(rename = "type")]
    pub arg_type: String,

    /// Default value expression (only rendered in declarations)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Whether this argument takes part in the null guard
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub check_null: bool,

    /// Visibility when used as a class member (members are private by default)
    #[serde(default, skip_serializing_if = "is_false")]
    pub public: bool,
}

impl ArgSpec {
    pub fn new(name: impl Into<String>, arg_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arg_type: arg_type.into(),
            default: None,
            check_null: true,
            public: false,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Render as `<type> <name>[ = <default>]`.
    pub fn render(&self, accept_default: bool) -> String {
        match &self.default {
            Some(default) if accept_default => {
                format!("{} {} = {}", self.arg_type, self.name, default)
            }
            _ => format!("{} {}", self.arg_type, self.name),
        }
    }
}

/// Function output: either a bare body expression or a typed body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum OutSpec {
    Val(String),
    Typed {
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        out_type: Option<String>,
        val: String,
    },
}

impl OutSpec {
    /// Declared output type, if any.
    pub fn out_type(&self) -> Option<&str> {
        match self {
            OutSpec::Val(_) => None,
            OutSpec::Typed { out_type, .. } => out_type.as_deref(),
        }
    }

    /// Body statement(s).
    pub fn val(&self) -> &str {
        match self {
            OutSpec::Val(val) => val,
            OutSpec::Typed { val, .. } => val,
        }
    }
}

/// Split a template parameter list (`typename T, size_t N = 8`) on top-level
/// commas, ignoring commas nested inside `<...>` or `(...)`.
pub fn template_params(template: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in template.chars() {
        match c {
            '<' | '(' => {
                depth += 1;
                current.push(c);
            }
            '>' | ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                params.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() || !params.is_empty() {
        params.push(current.trim().to_string());
    }
    params
}

/// Reduce a template parameter declaration to the name it introduces:
/// `typename T` -> `T`, `size_t N = 8` -> `N`.
pub fn strip_template_prefix(param: &str) -> String {
    let decl = param.split('=').next().unwrap_or(param).trim();
    decl.rsplit(|c: char| c.is_whitespace())
        .next()
        .unwrap_or(decl)
        .trim_start_matches(['*', '&'])
        .to_string()
}

/// Whether `s` is a C-family identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn is_true(v: &bool) -> bool {
    *v
}

pub(crate) fn is_false(v: &bool) -> bool {
    !(*v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_arg_defaults() {
        let arg: ArgSpec = serde_json::from_value(serde_json::json!({
            "name": "a",
            "type": "teq::TensptrT"
        }))
        .unwrap();
        assert!(arg.check_null);
        assert!(!arg.public);
        assert_eq!(arg.default, None);
    }

    #[test]
    fn test_arg_render_default() {
        let arg: ArgSpec = serde_json::from_value(serde_json::json!({
            "name": "n",
            "type": "size_t",
            "default": "2"
        }))
        .unwrap();
        assert_eq!(arg.render(true), "size_t n = 2");
        assert_eq!(arg.render(false), "size_t n");
    }

    #[test]
    fn test_out_spec_forms() {
        let bare: OutSpec = serde_json::from_value(serde_json::json!("return a;")).unwrap();
        assert_eq!(bare.out_type(), None);
        assert_eq!(bare.val(), "return a;");

        let typed: OutSpec = serde_json::from_value(serde_json::json!({
            "type": "teq::Shape",
            "val": "return a->shape();"
        }))
        .unwrap();
        assert_eq!(typed.out_type(), Some("teq::Shape"));
        assert_eq!(typed.val(), "return a->shape();");
    }

    #[test]
    fn test_template_params_nested() {
        assert_eq!(
            template_params("typename T, typename U = std::pair<T, T>"),
            vec!["typename T", "typename U = std::pair<T, T>"]
        );
        assert!(template_params("").is_empty());
        assert_eq!(template_params("typename T,"), vec!["typename T", ""]);
    }

    #[test]
    fn test_strip_template_prefix() {
        assert_eq!(strip_template_prefix("typename T"), "T");
        assert_eq!(strip_template_prefix("size_t N = 8"), "N");
        assert_eq!(strip_template_prefix("T"), "T");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("ADD"));
        assert!(is_identifier("_n2"));
        assert!(!is_identifier("2n"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
    }
}
