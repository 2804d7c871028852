use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{default_true, is_false, is_true, template_params, ArgSpec, OutSpec};

/// The `api` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ApiSpec {
    /// Includes of the generated API header
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,

    /// Namespace (`a::b`) to its functions and classes, in emission order
    #[serde(default)]
    pub namespaces: IndexMap<String, NamespaceSpec>,

    /// Type substrings marking an argument as nullable (null-guarded)
    #[serde(default = "default_nullable_types")]
    pub nullable_types: Vec<String>,

    /// Output type of functions that do not declare one
    #[serde(default = "default_out_type")]
    pub default_out: String,

    #[serde(default)]
    pub binding: BindingSpec,
}

pub fn default_nullable_types() -> Vec<String> {
    vec!["teq::TensptrT".to_string(), "eteq::ETensor".to_string()]
}

pub fn default_out_type() -> String {
    "teq::TensptrT".to_string()
}

impl ApiSpec {
    /// Whether an argument participates in the null guard.
    pub fn is_nullable(&self, arg: &ArgSpec) -> bool {
        arg.check_null
            && self
                .nullable_types
                .iter()
                .any(|pattern| arg.arg_type.contains(pattern.as_str()))
    }
}

/// Content of one namespace. A bare list is shorthand for functions only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum NamespaceSpec {
    Funcs(Vec<FuncSpec>),
    Content {
        #[serde(default)]
        funcs: Vec<FuncSpec>,
        #[serde(default)]
        classes: Vec<ClassSpec>,
    },
}

impl NamespaceSpec {
    pub fn funcs(&self) -> &[FuncSpec] {
        match self {
            NamespaceSpec::Funcs(funcs) => funcs,
            NamespaceSpec::Content { funcs, .. } => funcs,
        }
    }

    pub fn classes(&self) -> &[ClassSpec] {
        match self {
            NamespaceSpec::Funcs(_) => &[],
            NamespaceSpec::Content { classes, .. } => classes,
        }
    }
}

/// Settings of the foreign-binding module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BindingSpec {
    /// Scalar type template functions are instantiated at
    #[serde(default = "default_bind_type")]
    pub bind_type: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,

    /// Output types never registered as opaque binding classes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_types: Vec<String>,
}

fn default_bind_type() -> String {
    "double".to_string()
}

impl Default for BindingSpec {
    fn default() -> Self {
        Self {
            bind_type: default_bind_type(),
            includes: Vec::new(),
            ignore_types: Vec::new(),
        }
    }
}

/// A free or member function. Exactly one of `name` and `operator` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FuncSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Operator symbol (`+`, `==`, ...) for operator overloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,

    #[serde(default)]
    pub args: Vec<ArgSpec>,

    pub out: OutSpec,

    /// Template parameter list, e.g. `typename T`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Visibility when declared inside a class
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub public: bool,

    /// Leave this function out of the binding module
    #[serde(default, alias = "pyignores", skip_serializing_if = "is_false")]
    pub skip_binding: bool,
}

impl FuncSpec {
    pub fn named(name: impl Into<String>, out: OutSpec) -> Self {
        Self {
            name: Some(name.into()),
            operator: None,
            args: Vec::new(),
            out,
            template: None,
            description: None,
            public: true,
            skip_binding: false,
        }
    }

    pub fn with_args(mut self, args: Vec<ArgSpec>) -> Self {
        self.args = args;
        self
    }

    /// Function name, or `operator <symbol>` for operator overloads.
    pub fn ident(&self) -> String {
        match (&self.name, &self.operator) {
            (Some(name), _) => name.clone(),
            (None, Some(op)) => format!("operator {op}"),
            (None, None) => String::new(),
        }
    }

    pub fn out_type<'a>(&'a self, default: &'a str) -> &'a str {
        self.out.out_type().unwrap_or(default)
    }

    /// Non-empty template parameter list, if any.
    pub fn template(&self) -> Option<&str> {
        self.template
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn template_args(&self) -> Vec<String> {
        self.template().map(template_params).unwrap_or_default()
    }

    /// Description lines, defaulting to `<ident> ...`.
    pub fn comment(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("{} ...", self.ident()))
    }
}

/// A class (struct) declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClassSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    /// Classes that must be emitted before this one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<InitSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy: Option<CopySpec>,

    #[serde(rename = "move", default, skip_serializing_if = "Option::is_none")]
    pub move_: Option<CopySpec>,

    #[serde(default)]
    pub funcs: Vec<FuncSpec>,

    #[serde(default)]
    pub members: Vec<ArgSpec>,
}

impl ClassSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: None,
            requires: Vec::new(),
            init: None,
            copy: None,
            move_: None,
            funcs: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn requiring(mut self, requires: &[&str]) -> Self {
        self.requires = requires.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn template(&self) -> Option<&str> {
        self.template
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn template_args(&self) -> Vec<String> {
        self.template().map(template_params).unwrap_or_default()
    }
}

/// Constructor declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct InitSpec {
    #[serde(default)]
    pub args: Vec<ArgSpec>,

    /// Member initializers keyed by member name
    #[serde(default)]
    pub initlist: IndexMap<String, String>,

    #[serde(rename = "do", default)]
    pub do_block: String,
}

/// Copy or move constructor/assignment declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CopySpec {
    /// Name of the source object parameter
    #[serde(default = "default_other")]
    pub other: String,

    #[serde(default)]
    pub args: Vec<ArgSpec>,

    #[serde(default)]
    pub initlist: IndexMap<String, String>,

    #[serde(rename = "do", default)]
    pub do_block: String,
}

fn default_other() -> String {
    "other".to_string()
}
