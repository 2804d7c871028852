use egen_spec::types::opcode::{OpcodeSection, OverrideSpec, PerOpSpec, BAD_OP};
use egen_spec::SpecDocument;

use super::cpp::{arg_names, doc_comment, reindent, render_args};
use crate::code_table::CodeTable;
use crate::config::GenConfig;
use crate::error::CodegenError;
use crate::file_rep::{FileRep, GeneratedFileSet};
use crate::template::{render, Handler};
use crate::traits::Plugin;

pub const PLUGIN_ID: &str = "OPCODE";

pub const HEADER_FILE: &str = "opcode.hpp";
pub const SOURCE_FILE: &str = "opcode.cpp";

const HEADER_TEMPLATE: &str = r#"#ifndef ${guard}
#define ${guard}

namespace ${namespace}
{

enum _GENERATED_OPCODE
{
    BAD_OP = 0,
    ${opcodes}
    _N_GENERATED_OPCODES,
};

std::string name_op (_GENERATED_OPCODE code);

_GENERATED_OPCODE get_op (const std::string& name);

bool is_commutative (_GENERATED_OPCODE code);

bool is_commutative (const std::string& name);

bool is_idempotent (_GENERATED_OPCODE code);

bool is_idempotent (const std::string& name);

template <typename T>
void typed_exec (_GENERATED_OPCODE opcode, ${params})
{
    switch (opcode)
    {
        ${ops}
        default: ${fatal}("unknown opcode");
    }
}

// Maps a runtime OPCODE onto GENERIC_MACRO(<compile-time opcode>), e.g.
// #define GENERIC_MACRO(COMPILE_OPCODE) run<COMPILE_OPCODE>(args...);
// OPCODE_LOOKUP(GENERIC_MACRO, rt_opcode)
#define OPCODE_LOOKUP(GENERIC_MACRO, OPCODE)\
switch (OPCODE)\
{\
    ${cases}\
    default: ${fatal}("executing bad op");\
}

${#per_op_decls}
${per_op_decls}

}

#endif // ${guard}
"#;

const SOURCE_TEMPLATE: &str = r#"#ifdef ${guard}

namespace ${namespace}
{

static const std::unordered_map<_GENERATED_OPCODE,std::string,estd::EnumHash> code2name =
{
    ${code2names}
};

static const std::unordered_map<std::string,_GENERATED_OPCODE> name2code =
{
    ${name2codes}
};

static const std::unordered_set<_GENERATED_OPCODE,estd::EnumHash> commutatives =
{
    ${commcodes}
};

static const std::unordered_set<_GENERATED_OPCODE,estd::EnumHash> idempotents =
{
    ${idemcodes}
};

std::string name_op (_GENERATED_OPCODE code)
{
    return estd::try_get(code2name, code, "${sentinel}");
}

_GENERATED_OPCODE get_op (const std::string& name)
{
    return estd::try_get(name2code, name, ${sentinel});
}

bool is_commutative (_GENERATED_OPCODE code)
{
    return estd::has(commutatives, code);
}

bool is_commutative (const std::string& name)
{
    if (estd::has(name2code, name))
    {
        return is_commutative(name2code.at(name));
    }
    return false;
}

bool is_idempotent (_GENERATED_OPCODE code)
{
    return estd::has(idempotents, code);
}

bool is_idempotent (const std::string& name)
{
    if (estd::has(name2code, name))
    {
        return is_idempotent(name2code.at(name));
    }
    return false;
}

${#per_op_defns}
${per_op_defns}

}

#endif
"#;

struct OpcodeCtx<'a> {
    section: &'a OpcodeSection,
    config: &'a GenConfig,
    table: CodeTable,
}

impl OpcodeCtx<'_> {
    /// Override body of `opcode` for `behaviour`, following at most one alias.
    fn override_body(&self, opcode: &str, behaviour: &str) -> Result<Option<&str>, CodegenError> {
        let key = format!("opcode.opcalls.{opcode}.per_op_overrides.{behaviour}");
        let Some(spec) = self.section.opcalls.get(opcode) else {
            return Ok(None);
        };
        match spec.per_op_overrides.get(behaviour) {
            None => Ok(None),
            Some(OverrideSpec::Body(body)) => Ok(Some(body)),
            Some(OverrideSpec::Alias { alias }) => {
                let target = self.section.opcalls.get(alias).ok_or_else(|| {
                    CodegenError::malformed(&key, format!("alias to undeclared opcode '{alias}'"))
                })?;
                match target.per_op_overrides.get(behaviour) {
                    Some(OverrideSpec::Body(body)) => Ok(Some(body)),
                    Some(OverrideSpec::Alias { .. }) => Err(CodegenError::malformed(
                        &key,
                        format!("'{alias}' is itself an alias; aliases cannot be chained"),
                    )),
                    None => Err(CodegenError::malformed(
                        &key,
                        format!("'{alias}' has no '{behaviour}' override"),
                    )),
                }
            }
        }
    }

    /// Opcodes specializing `behaviour`, with their resolved bodies.
    fn specializations(&self, behaviour: &str) -> Result<Vec<(&str, &str)>, CodegenError> {
        let mut out = Vec::new();
        for opcode in self.section.opcalls.keys() {
            if let Some(body) = self.override_body(opcode, behaviour)? {
                out.push((opcode.as_str(), body));
            }
        }
        Ok(out)
    }
}

fn handle_guard(ctx: &OpcodeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx.config.guard(HEADER_FILE))
}

fn handle_namespace(ctx: &OpcodeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx.config.namespace.clone())
}

fn handle_fatal(ctx: &OpcodeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx.config.fatal_fn.clone())
}

fn handle_sentinel(ctx: &OpcodeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx.table.sentinel().to_string())
}

fn handle_opcodes(ctx: &OpcodeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx
        .table
        .entries()
        .map(|(name, code)| format!("{name} = {code},"))
        .collect::<Vec<_>>()
        .join("\n    "))
}

fn handle_params(ctx: &OpcodeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx.section.params.trim().to_string())
}

fn handle_ops(ctx: &OpcodeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx
        .section
        .opcalls
        .iter()
        .map(|(name, op)| format!("case {name}: {} break;", op.stmt.trim()))
        .collect::<Vec<_>>()
        .join("\n        "))
}

fn handle_cases(ctx: &OpcodeCtx<'_>) -> Result<String, CodegenError> {
    let ns = &ctx.config.namespace;
    Ok(ctx
        .section
        .opcalls
        .keys()
        .map(|name| format!("case {ns}::{name}: GENERIC_MACRO(::{ns}::{name}) break;"))
        .collect::<Vec<_>>()
        .join("\\\n    "))
}

fn handle_code2names(ctx: &OpcodeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx
        .table
        .entries()
        .map(|(name, _)| format!("{{ {name}, \"{name}\" }}"))
        .collect::<Vec<_>>()
        .join(",\n    "))
}

fn handle_name2codes(ctx: &OpcodeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx
        .table
        .entries()
        .map(|(name, _)| format!("{{ \"{name}\", {name} }}"))
        .collect::<Vec<_>>()
        .join(",\n    "))
}

fn handle_commcodes(ctx: &OpcodeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx
        .section
        .opcalls
        .iter()
        .filter(|(_, op)| op.commutative)
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(",\n    "))
}

fn handle_idemcodes(ctx: &OpcodeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx
        .section
        .opcalls
        .iter()
        .filter(|(_, op)| op.idempotent)
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(",\n    "))
}

fn per_op_decl(ctx: &OpcodeCtx<'_>, behaviour: &str, spec: &PerOpSpec) -> Result<String, CodegenError> {
    let args = render_args(&spec.args, false);
    let mut parts = Vec::new();

    let comment = doc_comment(spec.description.as_deref().unwrap_or_default());
    let generic = format!(
        "template <_GENERATED_OPCODE OPCODE>\n{out} {behaviour} ({args})\n{{\n    {body}\n}}",
        out = spec.out,
        body = reindent(&spec.default, "    "),
    );
    parts.push(if comment.is_empty() {
        generic
    } else {
        format!("{comment}\n{generic}")
    });

    for (opcode, _) in ctx.specializations(behaviour)? {
        parts.push(format!(
            "template <>\n{} {behaviour}<{opcode}> ({args});",
            spec.out
        ));
    }

    let dispatch_args = if spec.args.is_empty() {
        "_GENERATED_OPCODE opcode".to_string()
    } else {
        format!("_GENERATED_OPCODE opcode, {}", render_args(&spec.args, true))
    };
    parts.push(format!("{} {behaviour} ({dispatch_args});", spec.out));
    Ok(parts.join("\n\n"))
}

fn per_op_defn(ctx: &OpcodeCtx<'_>, behaviour: &str, spec: &PerOpSpec) -> Result<String, CodegenError> {
    let args = render_args(&spec.args, false);
    let names = arg_names(&spec.args);
    let mut parts = Vec::new();

    for (opcode, body) in ctx.specializations(behaviour)? {
        parts.push(format!(
            "template <>\n{out} {behaviour}<{opcode}> ({args})\n{{\n    {body}\n}}",
            out = spec.out,
            body = reindent(body, "    "),
        ));
    }

    let dispatch_args = if spec.args.is_empty() {
        "_GENERATED_OPCODE opcode".to_string()
    } else {
        format!("_GENERATED_OPCODE opcode, {args}")
    };
    let cases = ctx
        .section
        .opcalls
        .keys()
        .map(|opcode| format!("case {opcode}: return {behaviour}<{opcode}>({names});"))
        .collect::<Vec<_>>()
        .join("\n        ");
    parts.push(format!(
        "{out} {behaviour} ({dispatch_args})\n{{\n    switch (opcode)\n    {{\n        {cases}\n        default: break;\n    }}\n    {fatal}(\"cannot {behaviour} with a bad opcode\");\n}}",
        out = spec.out,
        fatal = ctx.config.fatal_fn,
    ));
    Ok(parts.join("\n\n"))
}

fn handle_per_op_decls(ctx: &OpcodeCtx<'_>) -> Result<String, CodegenError> {
    let mut decls = Vec::new();
    for (behaviour, spec) in &ctx.section.per_op {
        decls.push(per_op_decl(ctx, behaviour, spec)?);
    }
    Ok(decls.join("\n\n"))
}

fn handle_per_op_defns(ctx: &OpcodeCtx<'_>) -> Result<String, CodegenError> {
    let mut defns = Vec::new();
    for (behaviour, spec) in &ctx.section.per_op {
        defns.push(per_op_defn(ctx, behaviour, spec)?);
    }
    Ok(defns.join("\n\n"))
}

fn header_handlers<'a>() -> [(&'static str, Handler<OpcodeCtx<'a>>); 8] {
    [
        ("guard", handle_guard),
        ("namespace", handle_namespace),
        ("fatal", handle_fatal),
        ("opcodes", handle_opcodes),
        ("params", handle_params),
        ("ops", handle_ops),
        ("cases", handle_cases),
        ("per_op_decls", handle_per_op_decls),
    ]
}

fn source_handlers<'a>() -> [(&'static str, Handler<OpcodeCtx<'a>>); 8] {
    [
        ("guard", handle_guard),
        ("namespace", handle_namespace),
        ("sentinel", handle_sentinel),
        ("code2names", handle_code2names),
        ("name2codes", handle_name2codes),
        ("commcodes", handle_commcodes),
        ("idemcodes", handle_idemcodes),
        ("per_op_defns", handle_per_op_defns),
    ]
}

/// Every override must name a declared behaviour.
fn check_overrides(section: &OpcodeSection) -> Result<(), CodegenError> {
    if section.opcalls.is_empty() {
        return Err(CodegenError::malformed("opcode.opcalls", "no opcodes declared"));
    }
    for (opcode, op) in &section.opcalls {
        for behaviour in op.per_op_overrides.keys() {
            if !section.per_op.contains_key(behaviour) {
                return Err(CodegenError::malformed(
                    format!("opcode.opcalls.{opcode}.per_op_overrides.{behaviour}"),
                    format!("'{behaviour}' is not a declared per_op behaviour"),
                ));
            }
        }
    }
    Ok(())
}

/// Emits the opcode enum, lookup tables and per-opcode behaviours.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpcodePlugin;

impl Plugin for OpcodePlugin {
    fn id(&self) -> &'static str {
        PLUGIN_ID
    }

    fn process(
        &self,
        generated: &GeneratedFileSet,
        spec: &SpecDocument,
        config: &GenConfig,
    ) -> Result<Option<GeneratedFileSet>, CodegenError> {
        let Some(section) = &spec.opcode else {
            log::warn!("no relevant arguments found for plugin {PLUGIN_ID}");
            return Ok(None);
        };
        check_overrides(section)?;

        let ctx = OpcodeCtx {
            section,
            config,
            table: CodeTable::new(BAD_OP, section.opcalls.keys().cloned()),
        };

        let mut header_includes = vec!["<string>".to_string(), "\"internal/global/global.hpp\"".to_string()];
        if let Some(path) = section.operator_path.as_deref().map(str::trim) {
            header_includes.push(format!("\"{path}\""));
        }

        let mut files = generated.clone();
        files.insert(
            HEADER_FILE.to_string(),
            FileRep::new(render(HEADER_TEMPLATE, &header_handlers(), &ctx)?)
                .with_includes(header_includes),
        );
        files.insert(
            SOURCE_FILE.to_string(),
            FileRep::new(render(SOURCE_TEMPLATE, &source_handlers(), &ctx)?)
                .with_includes(["\"estd/contain.hpp\""])
                .with_refs([HEADER_FILE]),
        );
        Ok(Some(files))
    }
}
