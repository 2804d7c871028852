use egen_spec::types::dtype::{DTypeSpec, BAD_TYPE};
use egen_spec::SpecDocument;
use indexmap::IndexMap;

use crate::code_table::CodeTable;
use crate::config::GenConfig;
use crate::error::CodegenError;
use crate::file_rep::{FileRep, GeneratedFileSet};
use crate::template::{render, Handler};
use crate::traits::Plugin;

pub const PLUGIN_ID: &str = "DTYPE";

pub const HEADER_FILE: &str = "dtype.hpp";
pub const SOURCE_FILE: &str = "dtype.cpp";

const HEADER_TEMPLATE: &str = r#"#ifndef ${guard}
#define ${guard}

namespace ${namespace}
{

${config_defines}

enum _GENERATED_DTYPE
{
    BAD_TYPE = 0,
    ${enumeration}
    _N_GENERATED_DTYPES,
};

const _GENERATED_DTYPE default_dtype = ${default_dtype};

std::string name_type (_GENERATED_DTYPE type);

uint8_t type_size (_GENERATED_DTYPE type);

size_t type_precision (_GENERATED_DTYPE type);

_GENERATED_DTYPE get_type (const std::string& name);

template <typename T>
_GENERATED_DTYPE get_type (void)
{
    return BAD_TYPE;
}

template <typename T>
struct TypeInfo
{
    static const _GENERATED_DTYPE type = BAD_TYPE;

    TypeInfo (void) = delete;
};

${mapping}

// Converts nelems values of type intype at input into OUTTYPE.
template <typename OUTTYPE>
void type_convert (OUTTYPE* out, const void* input,
    _GENERATED_DTYPE intype, size_t nelems)
{
    switch (intype)
    {
        ${conversions}
        default:
            ${fatalf}("invalid input type %s",
                name_type(intype).c_str());
    }
}

#define EVERY_TYPE(GENERIC_MACRO)\
${apply_everytype}

// Maps a runtime DTYPE onto GENERIC_MACRO(<real type>), e.g.
// #define GENERIC_MACRO(REAL_TYPE) run<REAL_TYPE>(args...);
// TYPE_LOOKUP(GENERIC_MACRO, type_code)
#define TYPE_LOOKUP(GENERIC_MACRO, DTYPE)\
switch (DTYPE)\
{\
    ${cases}\
    default: ${fatal}("executing bad type");\
}

}

#endif // ${guard}
"#;

const SOURCE_TEMPLATE: &str = r#"#ifdef ${guard}

namespace ${namespace}
{

static const std::unordered_map<_GENERATED_DTYPE,std::string,estd::EnumHash> type2name =
{
    ${type2names}
};

static const std::unordered_map<std::string,_GENERATED_DTYPE> name2type =
{
    ${name2types}
};

std::string name_type (_GENERATED_DTYPE type)
{
    return estd::try_get(type2name, type, "${sentinel}");
}

_GENERATED_DTYPE get_type (const std::string& name)
{
    return estd::try_get(name2type, name, ${sentinel});
}

uint8_t type_size (_GENERATED_DTYPE type)
{
    switch (type)
    {
        ${typesizes}
        default: ${fatal}("cannot get size of bad type");
    }
    return 0;
}

size_t type_precision (_GENERATED_DTYPE type)
{
    switch (type)
    {
        ${precisions}
        default: break;
    }
    return 0;
}

${get_types}

}

#endif
"#;

struct DtypeCtx<'a> {
    dtypes: &'a IndexMap<String, DTypeSpec>,
    defines: &'a [String],
    default_type: &'a str,
    config: &'a GenConfig,
    table: CodeTable,
}

impl DtypeCtx<'_> {
    fn each<F>(&self, sep: &str, f: F) -> String
    where
        F: Fn(&str, &DTypeSpec) -> String,
    {
        self.dtypes
            .iter()
            .map(|(code, spec)| f(code, spec))
            .collect::<Vec<_>>()
            .join(sep)
    }
}

fn handle_guard(ctx: &DtypeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx.config.guard(HEADER_FILE))
}

fn handle_namespace(ctx: &DtypeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx.config.namespace.clone())
}

fn handle_fatal(ctx: &DtypeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx.config.fatal_fn.clone())
}

fn handle_fatalf(ctx: &DtypeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx.config.fatalf_fn.clone())
}

fn handle_sentinel(ctx: &DtypeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx.table.sentinel().to_string())
}

fn handle_config_defines(ctx: &DtypeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx
        .defines
        .iter()
        .map(|define| format!("#define {}", define.trim()))
        .collect::<Vec<_>>()
        .join("\n"))
}

fn handle_enumeration(ctx: &DtypeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx
        .table
        .entries()
        .map(|(code, value)| format!("{code} = {value},"))
        .collect::<Vec<_>>()
        .join("\n    "))
}

fn handle_default_dtype(ctx: &DtypeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx.default_type.to_string())
}

fn handle_mapping(ctx: &DtypeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx.each("\n\n", |code, spec| {
        format!(
            "template <>\n_GENERATED_DTYPE get_type<{ctype}> (void);\n\n\
             template <>\nstruct TypeInfo<{ctype}>\n{{\n    \
             static const _GENERATED_DTYPE type = {code};\n\n    \
             TypeInfo (void) = delete;\n}};",
            ctype = spec.ctype
        )
    }))
}

fn handle_conversions(ctx: &DtypeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx.each("\n        ", |code, spec| {
        format!(
            "case {code}:\n        {{\n            \
             std::vector<OUTTYPE> temp(({ctype}*) input, ({ctype}*) input + nelems);\n            \
             std::memcpy(out, temp.data(), sizeof(OUTTYPE) * nelems);\n        \
             }}\n            break;",
            ctype = spec.ctype
        )
    }))
}

fn handle_apply_everytype(ctx: &DtypeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx.each("\\\n", |_, spec| format!("GENERIC_MACRO({})", spec.ctype)))
}

fn handle_cases(ctx: &DtypeCtx<'_>) -> Result<String, CodegenError> {
    let ns = &ctx.config.namespace;
    Ok(ctx.each("\\\n    ", |code, spec| {
        format!("case {ns}::{code}: GENERIC_MACRO({}) break;", spec.ctype)
    }))
}

fn handle_type2names(ctx: &DtypeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx
        .table
        .entries()
        .map(|(code, _)| format!("{{ {code}, \"{code}\" }}"))
        .collect::<Vec<_>>()
        .join(",\n    "))
}

fn handle_name2types(ctx: &DtypeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx
        .table
        .entries()
        .map(|(code, _)| format!("{{ \"{code}\", {code} }}"))
        .collect::<Vec<_>>()
        .join(",\n    "))
}

fn handle_typesizes(ctx: &DtypeCtx<'_>) -> Result<String, CodegenError> {
    let ns = &ctx.config.namespace;
    Ok(ctx.each("\n        ", |code, spec| {
        format!("case {ns}::{code}: return sizeof({});", spec.ctype)
    }))
}

fn handle_precisions(ctx: &DtypeCtx<'_>) -> Result<String, CodegenError> {
    let ns = &ctx.config.namespace;
    Ok(ctx.each("\n        ", |code, spec| {
        format!("case {ns}::{code}: return {};", spec.precision.unwrap_or(0))
    }))
}

fn handle_get_types(ctx: &DtypeCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx.each("\n\n", |code, spec| {
        format!(
            "template <>\n_GENERATED_DTYPE get_type<{}> (void)\n{{\n    return {code};\n}}",
            spec.ctype
        )
    }))
}

fn header_handlers<'a>() -> [(&'static str, Handler<DtypeCtx<'a>>); 11] {
    [
        ("guard", handle_guard),
        ("namespace", handle_namespace),
        ("config_defines", handle_config_defines),
        ("enumeration", handle_enumeration),
        ("default_dtype", handle_default_dtype),
        ("mapping", handle_mapping),
        ("conversions", handle_conversions),
        ("fatalf", handle_fatalf),
        ("apply_everytype", handle_apply_everytype),
        ("cases", handle_cases),
        ("fatal", handle_fatal),
    ]
}

fn source_handlers<'a>() -> [(&'static str, Handler<DtypeCtx<'a>>); 9] {
    [
        ("guard", handle_guard),
        ("namespace", handle_namespace),
        ("type2names", handle_type2names),
        ("name2types", handle_name2types),
        ("sentinel", handle_sentinel),
        ("typesizes", handle_typesizes),
        ("fatal", handle_fatal),
        ("precisions", handle_precisions),
        ("get_types", handle_get_types),
    ]
}

/// Emits the dtype enum, type traits and conversion helpers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DtypePlugin;

impl Plugin for DtypePlugin {
    fn id(&self) -> &'static str {
        PLUGIN_ID
    }

    fn process(
        &self,
        generated: &GeneratedFileSet,
        spec: &SpecDocument,
        config: &GenConfig,
    ) -> Result<Option<GeneratedFileSet>, CodegenError> {
        let Some(dtypes) = &spec.dtype else {
            log::warn!("no relevant arguments found for plugin {PLUGIN_ID}");
            return Ok(None);
        };
        let Some(first) = dtypes.keys().next() else {
            return Err(CodegenError::malformed("dtype", "no dtypes declared"));
        };
        let default_type = spec.default_type.as_deref().unwrap_or(first);
        if !dtypes.contains_key(default_type) {
            return Err(CodegenError::malformed(
                "default_type",
                format!("'{default_type}' is not a declared dtype"),
            ));
        }

        let ctx = DtypeCtx {
            dtypes,
            defines: &spec.defines,
            default_type,
            config,
            table: CodeTable::new(BAD_TYPE, dtypes.keys().cloned()),
        };

        let mut files = generated.clone();
        files.insert(
            HEADER_FILE.to_string(),
            FileRep::new(render(HEADER_TEMPLATE, &header_handlers(), &ctx)?).with_includes([
                "<string>",
                "<cstring>",
                "<vector>",
                "\"internal/global/global.hpp\"",
            ]),
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
