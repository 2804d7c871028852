//! pybind11 binding module generation.
//!
//! One translation unit is emitted per top-level namespace group. Template
//! parameters are instantiated with a single placeholder scalar alias that
//! `pyapi.hpp` defines.

use std::collections::{HashMap, HashSet};

use egen_spec::types::api::{ApiSpec, ClassSpec, FuncSpec, NamespaceSpec};
use egen_spec::types::common::{strip_template_prefix, ArgSpec};
use egen_spec::SpecDocument;
use indexmap::IndexMap;
use regex::Regex;

use super::apis;
use super::cpp::{arg_names, namespace_segments};
use super::funcs::check_shape;
use crate::config::GenConfig;
use crate::dep_graph::resolve;
use crate::error::CodegenError;
use crate::file_rep::{FileRep, GeneratedFileSet};
use crate::template::{render, Handler};
use crate::traits::Plugin;

pub const PLUGIN_ID: &str = "PYBINDER";

pub const HEADER_FILE: &str = "pyapi.hpp";

/// Module name for functions declared in the global namespace.
pub const GLOBAL_GROUP: &str = "api";

const MODULE_TEMPLATE: &str = r#"namespace py = pybind11;

PYBIND11_MODULE(${modname}, m_${modname})
{
m_${modname}.doc() = "pybind for ${modname} api";

${input_defs}

#ifdef CUSTOM_PYBIND_EXT
CUSTOM_PYBIND_EXT(m_${modname})
#endif

${content}

}
"#;

/// Python special method for a C++ operator taking `nargs` arguments.
pub fn py_operator(op: &str, nargs: usize) -> Option<&'static str> {
    match (op, nargs) {
        ("-", 1) => Some("__neg__"),
        ("+", 2) => Some("__add__"),
        ("*", 2) => Some("__mul__"),
        ("-", 2) => Some("__sub__"),
        ("/", 2) => Some("__truediv__"),
        ("==", 2) => Some("__eq__"),
        ("!=", 2) => Some("__ne__"),
        ("<", 2) => Some("__lt__"),
        (">", 2) => Some("__gt__"),
        _ => None,
    }
}

/// Reflected Python special method, used when the left operand is not the
/// output type.
pub fn py_reflected_operator(op: &str) -> Option<&'static str> {
    match op {
        "+" => Some("__radd__"),
        "*" => Some("__rmul__"),
        "-" => Some("__rsub__"),
        "/" => Some("__rtruediv__"),
        _ => None,
    }
}

/// Disambiguates binding names that repeat within one scope: the first
/// keeps the bare name, later ones get `0`, `1`, ...
#[derive(Debug, Default)]
pub struct BindingNames {
    seen: HashMap<(String, String), usize>,
}

impl BindingNames {
    pub fn assign(&mut self, scope: &str, name: &str) -> String {
        let count = self
            .seen
            .entry((scope.to_string(), name.to_string()))
            .or_insert(0);
        let assigned = if *count == 0 {
            name.to_string()
        } else {
            format!("{name}{}", *count - 1)
        };
        *count += 1;
        assigned
    }
}

/// Replace every template parameter named in `templates` with `alias`.
pub fn clean_templates(s: &str, templates: &[String], alias: &str) -> String {
    templates.iter().fold(s.to_string(), |acc, param| {
        let name = strip_template_prefix(param);
        match Regex::new(&format!(r"\b{}\b", regex::escape(&name))) {
            Ok(pattern) => pattern.replace_all(&acc, alias).into_owned(),
            Err(_) => acc,
        }
    })
}

/// Strip qualifiers and indirection: `const eteq::ETensor<T>&` -> `eteq::ETensor<T>`.
pub fn clean_type(t: &str) -> String {
    t.split(|c: char| c == '*' || c == '&' || c.is_whitespace())
        .filter(|seg| !seg.is_empty() && *seg != "const")
        .collect::<Vec<_>>()
        .join(" ")
}

/// Unqualified, untemplated type name: `eteq::ETensor<T>` -> `ETensor`.
fn end_type(t: &str) -> &str {
    let base = t.split('<').next().unwrap_or(t);
    base.rsplit("::").next().unwrap_or(base).trim()
}

fn modname(t: &str) -> String {
    format!("m_{}", end_type(t))
}

fn is_builtin(t: &str) -> bool {
    const BUILTINS: &[&str] = &[
        "void", "bool", "char", "short", "int", "long", "unsigned", "signed", "float", "double",
        "size_t", "std::string",
    ];
    let first = t.split_whitespace().next().unwrap_or_default();
    BUILTINS.contains(&first)
        || (first.ends_with("_t") && (first.starts_with("int") || first.starts_with("uint")))
}

fn docstring(text: &str) -> String {
    text.trim()
        .lines()
        .map(|line| format!("\"{}\"", line.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Top-level namespace a binding belongs to.
fn group_of(namespace: &str) -> String {
    namespace_segments(namespace)
        .first()
        .map(|seg| seg.to_string())
        .unwrap_or_else(|| GLOBAL_GROUP.to_string())
}

struct ModuleCtx {
    modname: String,
    input_defs: Vec<String>,
    content: Vec<String>,
}

fn handle_modname(ctx: &ModuleCtx) -> Result<String, CodegenError> {
    Ok(ctx.modname.clone())
}

fn handle_input_defs(ctx: &ModuleCtx) -> Result<String, CodegenError> {
    Ok(ctx.input_defs.join("\n"))
}

fn handle_content(ctx: &ModuleCtx) -> Result<String, CodegenError> {
    Ok(ctx.content.join("\n\n"))
}

const MODULE_HANDLERS: &[(&str, Handler<ModuleCtx>)] = &[
    ("modname", handle_modname),
    ("input_defs", handle_input_defs),
    ("content", handle_content),
];

/// Builds the bindings of one namespace group.
struct GroupBinder<'a> {
    api: &'a ApiSpec,
    alias: &'a str,
    group: String,
    root: String,
    names: BindingNames,
    submodules: HashSet<String>,
    excluded: HashSet<String>,
    opaque: IndexMap<String, String>,
    content: Vec<String>,
}

impl<'a> GroupBinder<'a> {
    fn new(group: String, api: &'a ApiSpec, config: &'a GenConfig) -> Self {
        let mut excluded: HashSet<String> = api
            .binding
            .ignore_types
            .iter()
            .chain([&api.default_out, &config.binding_alias])
            .map(|t| modname(&clean_type(t)))
            .collect();
        for content in api.namespaces.values() {
            excluded.extend(content.classes().iter().map(|c| format!("m_{}", c.name)));
        }
        Self {
            api,
            alias: &config.binding_alias,
            root: format!("m_{group}"),
            group,
            names: BindingNames::default(),
            submodules: HashSet::new(),
            excluded,
            opaque: IndexMap::new(),
            content: Vec::new(),
        }
    }

    /// Module variable for `segments`, declaring submodules on first use.
    fn module_for(&mut self, segments: &[&str]) -> String {
        let mut module = self.root.clone();
        let mut path = self.group.clone();
        for seg in segments.iter().skip(1) {
            let var = format!("{module}_{seg}");
            if self.submodules.insert(var.clone()) {
                self.content.push(format!(
                    "py::module {var} = {module}.def_submodule(\"{seg}\", \"A submodule of '{path}'\");"
                ));
            }
            path = format!("{path}.{seg}");
            module = var;
        }
        module
    }

    fn register_opaque(&mut self, out_type: &str) {
        let full = clean_type(out_type);
        if self.excluded.contains(&modname(&full)) {
            return;
        }
        self.declare_type(full);
    }

    /// Declares `full` as a python class in this unit unless it is builtin
    /// or already declared. Returns the module variable.
    fn declare_type(&mut self, full: String) -> String {
        let var = modname(&full);
        if full.is_empty() || is_builtin(&full) || self.opaque.contains_key(&full) {
            return var;
        }
        let line = format!(
            "py::class_<{full}> {var}({}, \"{}\");",
            self.root,
            end_type(&full)
        );
        self.opaque.insert(full, line);
        var
    }

    fn py_args(&self, args: &[ArgSpec], templates: &[String]) -> Vec<String> {
        args.iter()
            .map(|arg| match &arg.default {
                Some(default) => format!(
                    "py::arg(\"{}\")={}",
                    arg.name,
                    clean_templates(default, templates, self.alias)
                ),
                None => format!("py::arg(\"{}\")", arg.name),
            })
            .collect()
    }

    fn params(&self, args: &[ArgSpec], templates: &[String]) -> Vec<(String, String)> {
        args.iter()
            .map(|arg| {
                (
                    clean_templates(&arg.arg_type, templates, self.alias),
                    arg.name.clone(),
                )
            })
            .collect()
    }

    fn definition(
        module: &str,
        name: &str,
        params: &[(String, String)],
        block: &str,
        py_args: Vec<String>,
        description: &str,
    ) -> String {
        let params = params
            .iter()
            .map(|(t, n)| format!("{t} {n}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut parts = vec![format!("[]({params}) {{ {block} }}")];
        parts.extend(py_args);
        parts.push(docstring(description));
        format!("{module}.def(\"{name}\", {});", parts.join(", "))
    }

    fn bind_func(&mut self, func: &FuncSpec, module: &str, qualifier: &str) {
        let templates = func.template_args();
        let out_type = clean_templates(func.out_type(&self.api.default_out), &templates, self.alias);
        self.register_opaque(&out_type);

        let name = func.name.clone().unwrap_or_default();
        let instantiation = if templates.is_empty() {
            String::new()
        } else {
            format!("<{}>", self.alias)
        };
        let target = if qualifier.is_empty() {
            name.clone()
        } else {
            format!("{qualifier}::{name}")
        };
        let block = format!("return {target}{instantiation}({});", arg_names(&func.args));
        let bind_name = self.names.assign(module, &name);
        let description = func.description.clone().unwrap_or_else(|| format!("{name} ..."));
        let params = self.params(&func.args, &templates);
        let py_args = self.py_args(&func.args, &templates);
        self.content.push(Self::definition(
            module,
            &bind_name,
            &params,
            &block,
            py_args,
            &description,
        ));
    }

    /// Operators bind as methods of their output type.
    fn bind_operator(&mut self, func: &FuncSpec) {
        let templates = func.template_args();
        let op = func.operator.as_deref().unwrap_or_default();
        let out_type = clean_templates(func.out_type(&self.api.default_out), &templates, self.alias);
        self.register_opaque(&out_type);

        let mut params = self.params(&func.args, &templates);
        let names: Vec<&str> = func.args.iter().map(|a| a.name.as_str()).collect();
        let block = match names.as_slice() {
            [only] => format!("return {op}{only};"),
            _ => format!("return {};", names.join(format!(" {op} ").as_str())),
        };

        let reflected = params.len() > 1 && !params[0].0.contains(clean_type(&out_type).as_str());
        let py_name = if reflected {
            match py_reflected_operator(op) {
                Some(name) => {
                    params.reverse();
                    name
                }
                None => {
                    log::debug!("no reflected python operator for '{op}', skipping");
                    return;
                }
            }
        } else {
            match py_operator(op, params.len()) {
                Some(name) => name,
                None => {
                    log::warn!("no python operator for '{op}' with {} arguments, skipping", params.len());
                    return;
                }
            }
        };

        let mut args = func.args.clone();
        if reflected {
            args.reverse();
        }
        let py_args = self.py_args(args.get(1..).unwrap_or_default(), &templates);
        let description = func.description.clone().unwrap_or_else(|| format!("{py_name} ..."));
        // the owning type must exist in this unit even when it is excluded
        // from plain output registration
        let module = self.declare_type(clean_type(&out_type));
        self.content.push(Self::definition(
            &module,
            py_name,
            &params,
            &block,
            py_args,
            &description,
        ));
    }

    fn bind_class(&mut self, class: &ClassSpec, module: &str, qualifier: &str) {
        let var = format!("cls_{}", class.name);
        let mut self_type = if qualifier.is_empty() {
            class.name.clone()
        } else {
            format!("{qualifier}::{}", class.name)
        };
        if class.template().is_some() {
            self_type = format!("{self_type}<{}>", self.alias);
        }
        let class_templates = class.template_args();

        let mut lines = vec![format!(
            "py::class_<{self_type}> {var}({module}, \"{}\");",
            class.name
        )];
        if let Some(init) = &class.init {
            let types: Vec<String> = self
                .params(&init.args, &class_templates)
                .into_iter()
                .map(|(t, _)| t)
                .collect();
            let mut parts = vec![format!("py::init<{}>()", types.join(", "))];
            parts.extend(self.py_args(&init.args, &class_templates));
            lines.push(format!("{var}.def({});", parts.join(", ")));
        }

        for func in class.funcs.iter().filter(|f| f.public && !f.skip_binding) {
            let mut templates = class_templates.clone();
            templates.extend(func.template_args());
            let out_type = clean_templates(func.out_type(&self.api.default_out), &templates, self.alias);
            self.register_opaque(&out_type);

            let mut params = vec![(format!("{self_type}&"), "self".to_string())];
            params.extend(self.params(&func.args, &templates));
            let py_args = self.py_args(&func.args, &templates);
            let names = arg_names(&func.args);

            let (py_name, block, fallback) = match (&func.name, &func.operator) {
                (Some(name), _) => {
                    let instantiation = if func.template().is_some() {
                        format!("<{}>", self.alias)
                    } else {
                        String::new()
                    };
                    (
                        self.names.assign(&var, name),
                        format!("return self.{name}{instantiation}({names});"),
                        format!("{name} ..."),
                    )
                }
                (None, Some(op)) => {
                    let Some(py_name) = py_operator(op, func.args.len() + 1) else {
                        log::warn!("no python operator for '{op}' on {}, skipping", class.name);
                        continue;
                    };
                    let block = if func.args.is_empty() {
                        format!("return {op}self;")
                    } else {
                        format!("return self {op} {names};")
                    };
                    (py_name.to_string(), block, format!("{py_name} ..."))
                }
                (None, None) => continue,
            };
            let description = func.description.clone().unwrap_or(fallback);
            lines.push(Self::definition(&var, &py_name, &params, &block, py_args, &description));
        }
        self.content.push(lines.join("\n"));
    }

    fn bind_namespace(&mut self, namespace: &str, content: &NamespaceSpec) -> Result<(), CodegenError> {
        let segments = namespace_segments(namespace);
        let module = self.module_for(&segments);
        let qualifier = segments.join("::");

        for class in resolve(content.classes())? {
            for (i, func) in class.funcs.iter().enumerate() {
                check_shape(
                    func,
                    &format!("api.namespaces.{namespace}.classes.{}.funcs[{i}]", class.name),
                )?;
            }
            self.bind_class(class, &module, &qualifier);
        }
        for (i, func) in content.funcs().iter().enumerate() {
            check_shape(func, &format!("api.namespaces.{namespace}.funcs[{i}]"))?;
        }
        for func in content.funcs().iter().filter(|f| !f.skip_binding) {
            if func.operator.is_some() {
                self.bind_operator(func);
            } else {
                self.bind_func(func, &module, &qualifier);
            }
        }
        Ok(())
    }

    fn finish(self) -> ModuleCtx {
        ModuleCtx {
            modname: self.group,
            input_defs: self.opaque.into_values().collect(),
            content: self.content,
        }
    }
}

/// Emits pybind11 modules over the generated API.
#[derive(Debug, Clone, Copy, Default)]
pub struct PybindPlugin;

impl Plugin for PybindPlugin {
    fn id(&self) -> &'static str {
        PLUGIN_ID
    }

    fn process(
        &self,
        generated: &GeneratedFileSet,
        spec: &SpecDocument,
        config: &GenConfig,
    ) -> Result<Option<GeneratedFileSet>, CodegenError> {
        let Some(api) = &spec.api else {
            log::warn!("no relevant arguments found for plugin {PLUGIN_ID}");
            return Ok(None);
        };

        let mut groups: IndexMap<String, Vec<(&String, &NamespaceSpec)>> = IndexMap::new();
        for (namespace, content) in &api.namespaces {
            groups
                .entry(group_of(namespace))
                .or_default()
                .push((namespace, content));
        }

        let mut files = generated.clone();
        files.insert(
            HEADER_FILE.to_string(),
            FileRep::new(format!(
                "// scalar type substituted for template parameters in bindings\nusing {} = {};\n",
                config.binding_alias, api.binding.bind_type
            )),
        );

        for (group, namespaces) in groups {
            let mut binder = GroupBinder::new(group.clone(), api, config);
            for (namespace, content) in namespaces {
                binder.bind_namespace(namespace, content)?;
            }
            let ctx = binder.finish();

            let mut includes = vec![
                "\"pybind11/pybind11.h\"".to_string(),
                "\"pybind11/stl.h\"".to_string(),
                "\"pybind11/operators.h\"".to_string(),
            ];
            includes.extend(api.binding.includes.iter().cloned());
            files.insert(
                format!("pyapi_{group}.cpp"),
                FileRep::new(render(MODULE_TEMPLATE, MODULE_HANDLERS, &ctx)?)
                    .with_includes(includes)
                    .with_refs([HEADER_FILE, apis::HEADER_FILE]),
            );
        }
        Ok(Some(files))
    }
}
