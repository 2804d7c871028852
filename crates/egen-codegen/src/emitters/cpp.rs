//! Small C++ rendering helpers shared by the emitters.

use egen_spec::types::api::ApiSpec;
use egen_spec::types::common::ArgSpec;

/// `/// line` for every line of `text`.
pub fn doc_comment(text: &str) -> String {
    text.trim()
        .lines()
        .map(|line| format!("/// {}", line.trim_end()).trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trim `text` and prefix every line after the first with `prefix`.
pub fn reindent(text: &str, prefix: &str) -> String {
    text.trim()
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 || line.trim().is_empty() {
                line.trim_end().to_string()
            } else {
                format!("{prefix}{}", line.trim_end())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_args(args: &[ArgSpec], accept_default: bool) -> String {
    args.iter()
        .map(|arg| arg.render(accept_default))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn arg_names(args: &[ArgSpec]) -> String {
    args.iter()
        .map(|arg| arg.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// `template <...>` line (with trailing newline) or nothing.
pub fn template_prefix(template: Option<&str>) -> String {
    match template {
        Some(params) => format!("template <{params}>\n"),
        None => String::new(),
    }
}

/// `a == nullptr || c == nullptr` over the nullable arguments, or `false`.
pub fn null_guard(api: &ApiSpec, args: &[ArgSpec]) -> String {
    let checks: Vec<String> = args
        .iter()
        .filter(|arg| api.is_nullable(arg))
        .map(|arg| format!("{} == nullptr", arg.name))
        .collect();
    if checks.is_empty() {
        "false".to_string()
    } else {
        checks.join(" || ")
    }
}

/// Namespace path segments, without `_` and empty segments.
pub fn namespace_segments(namespace: &str) -> Vec<&str> {
    namespace
        .split("::")
        .map(str::trim)
        .filter(|seg| !seg.is_empty() && *seg != "_")
        .collect()
}

/// `a::b::name`, or just `name` in the global namespace.
pub fn qualify(namespace: &str, name: &str) -> String {
    let mut segments = namespace_segments(namespace);
    segments.push(name);
    segments.join("::")
}

/// Wrap `body` in nested namespace blocks, outermost first.
pub fn wrap_namespace(namespace: &str, body: &str) -> String {
    namespace_segments(namespace)
        .iter()
        .rev()
        .fold(body.to_string(), |inner, seg| {
            format!("namespace {seg}\n{{\n\n{inner}\n\n}}")
        })
}
