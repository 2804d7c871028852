//! Declarations and definitions of API functions.

use egen_spec::types::api::{ApiSpec, FuncSpec};

use super::cpp::{doc_comment, null_guard, reindent, render_args, template_prefix};
use crate::config::GenConfig;
use crate::error::CodegenError;

/// A function is either named or an operator overload, never both.
pub fn check_shape(func: &FuncSpec, key: &str) -> Result<(), CodegenError> {
    match (&func.name, &func.operator) {
        (Some(_), Some(_)) => Err(CodegenError::malformed(
            key,
            "function declares both 'name' and 'operator'",
        )),
        (None, None) => Err(CodegenError::malformed(
            key,
            "function declares neither 'name' nor 'operator'",
        )),
        _ => Ok(()),
    }
}

/// Enclosing class of a member function.
#[derive(Debug, Clone, Copy)]
pub struct MemberScope<'a> {
    /// Class template parameter list
    pub template: Option<&'a str>,
    /// Qualified class type, e.g. `Buffer<T>`
    pub qualifier: &'a str,
}

/// Forward declaration with doc comment and default arguments.
pub fn render_decl(func: &FuncSpec, api: &ApiSpec) -> String {
    format!(
        "{}\n{}{} {} ({});",
        doc_comment(&func.comment()),
        template_prefix(func.template()),
        func.out_type(&api.default_out),
        func.ident(),
        render_args(&func.args, true)
    )
}

/// Full definition guarded against null arguments.
pub fn render_defn(
    func: &FuncSpec,
    api: &ApiSpec,
    config: &GenConfig,
    scope: Option<MemberScope<'_>>,
) -> String {
    let ident = func.ident();
    let (class_template, name) = match scope {
        Some(scope) => (
            template_prefix(scope.template),
            format!("{}::{}", scope.qualifier, ident),
        ),
        None => (String::new(), ident.clone()),
    };
    format!(
        "{class_template}{template}{out} {name} ({args})\n\
         {{\n    \
         if ({guard})\n    \
         {{\n        \
         {fatal}(\"cannot {ident} with a null argument\");\n    \
         }}\n    \
         {body}\n\
         }}",
        template = template_prefix(func.template()),
        out = func.out_type(&api.default_out),
        args = render_args(&func.args, false),
        guard = null_guard(api, &func.args),
        fatal = config.fatal_fn,
        body = reindent(func.out.val(), "    "),
    )
}
