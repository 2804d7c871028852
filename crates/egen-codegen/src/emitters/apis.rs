use egen_spec::types::api::{ApiSpec, FuncSpec};
use egen_spec::SpecDocument;

use super::classes::render_class;
use super::cpp::wrap_namespace;
use super::funcs::{check_shape, render_decl, render_defn};
use crate::config::GenConfig;
use crate::dep_graph::resolve;
use crate::error::CodegenError;
use crate::file_rep::{FileRep, GeneratedFileSet};
use crate::template::{render, Handler};
use crate::traits::Plugin;

pub const PLUGIN_ID: &str = "API";

pub const HEADER_FILE: &str = "api.hpp";
pub const SOURCE_FILE: &str = "api.cpp";

const HEADER_TEMPLATE: &str = r#"#ifndef ${guard}
#define ${guard}

${hdr_namespaces}

${template_namespaces}

${operators}

#endif // ${guard}
"#;

const SOURCE_TEMPLATE: &str = r#"#ifdef ${guard}

${src_namespaces}

${operators}

#endif
"#;

/// Rendered pieces of one namespace, before wrapping.
#[derive(Debug, Default)]
struct NamespaceParts {
    decls: Vec<String>,
    templates: Vec<String>,
    defns: Vec<String>,
}

#[derive(Debug, Default)]
struct ApiCtx {
    guard: String,
    hdr_namespaces: Vec<String>,
    template_namespaces: Vec<String>,
    src_namespaces: Vec<String>,
    hdr_operators: Vec<String>,
    src_operators: Vec<String>,
}

impl ApiCtx {
    fn build(api: &ApiSpec, config: &GenConfig) -> Result<Self, CodegenError> {
        let mut ctx = ApiCtx {
            guard: config.guard(HEADER_FILE),
            ..Default::default()
        };
        for (namespace, content) in &api.namespaces {
            let mut parts = NamespaceParts::default();

            for class in resolve(content.classes())? {
                let rendered = render_class(namespace, class, api, config)?;
                parts.decls.push(rendered.decl);
                parts.templates.extend(rendered.header_defns);
                parts.defns.extend(rendered.source_defns);
            }

            for (i, func) in content.funcs().iter().enumerate() {
                check_shape(func, &format!("api.namespaces.{namespace}.funcs[{i}]"))?;
                if func.operator.is_some() {
                    ctx.add_operator(func, api, config);
                    continue;
                }
                parts.decls.push(render_decl(func, api));
                if func.template().is_some() {
                    parts.templates.push(render_defn(func, api, config, None));
                } else {
                    parts.defns.push(render_defn(func, api, config, None));
                }
            }

            let wrap = |pieces: &[String]| wrap_namespace(namespace, &pieces.join("\n\n"));
            if !parts.decls.is_empty() {
                ctx.hdr_namespaces.push(wrap(&parts.decls));
            }
            if !parts.templates.is_empty() {
                ctx.template_namespaces.push(wrap(&parts.templates));
            }
            if !parts.defns.is_empty() {
                ctx.src_namespaces.push(wrap(&parts.defns));
            }
        }
        Ok(ctx)
    }

    /// Operators live at global scope.
    fn add_operator(&mut self, func: &FuncSpec, api: &ApiSpec, config: &GenConfig) {
        self.hdr_operators.push(render_decl(func, api));
        let defn = render_defn(func, api, config, None);
        if func.template().is_some() {
            self.hdr_operators.push(defn);
        } else {
            self.src_operators.push(defn);
        }
    }
}

fn handle_guard(ctx: &ApiCtx) -> Result<String, CodegenError> {
    Ok(ctx.guard.clone())
}

fn handle_hdr_namespaces(ctx: &ApiCtx) -> Result<String, CodegenError> {
    Ok(ctx.hdr_namespaces.join("\n\n"))
}

fn handle_template_namespaces(ctx: &ApiCtx) -> Result<String, CodegenError> {
    Ok(ctx.template_namespaces.join("\n\n"))
}

fn handle_src_namespaces(ctx: &ApiCtx) -> Result<String, CodegenError> {
    Ok(ctx.src_namespaces.join("\n\n"))
}

fn handle_hdr_operators(ctx: &ApiCtx) -> Result<String, CodegenError> {
    Ok(ctx.hdr_operators.join("\n\n"))
}

fn handle_src_operators(ctx: &ApiCtx) -> Result<String, CodegenError> {
    Ok(ctx.src_operators.join("\n\n"))
}

const HEADER_HANDLERS: &[(&str, Handler<ApiCtx>)] = &[
    ("guard", handle_guard),
    ("hdr_namespaces", handle_hdr_namespaces),
    ("template_namespaces", handle_template_namespaces),
    ("operators", handle_hdr_operators),
];

const SOURCE_HANDLERS: &[(&str, Handler<ApiCtx>)] = &[
    ("guard", handle_guard),
    ("src_namespaces", handle_src_namespaces),
    ("operators", handle_src_operators),
];

/// Emits the C++ API: classes, free functions and operator overloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiPlugin;

impl Plugin for ApiPlugin {
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
        let ctx = ApiCtx::build(api, config)?;

        let mut files = generated.clone();
        files.insert(
            HEADER_FILE.to_string(),
            FileRep::new(render(HEADER_TEMPLATE, HEADER_HANDLERS, &ctx)?)
                .with_includes(api.includes.iter().cloned()),
        );
        files.insert(
            SOURCE_FILE.to_string(),
            FileRep::new(render(SOURCE_TEMPLATE, SOURCE_HANDLERS, &ctx)?).with_refs([HEADER_FILE]),
        );
        Ok(Some(files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Template;
    use pretty_assertions::assert_eq;

    fn spec() -> SpecDocument {
        serde_json::from_value(serde_json::json!({
            "api": {
                "includes": ["\"teq/teq.hpp\""],
                "namespaces": {
                    "tenncor": [
                        {
                            "name": "abs",
                            "args": [{ "name": "a", "type": "teq::TensptrT" }],
                            "out": "return make_functor(ABS, {a});"
                        },
                        {
                            "name": "identity",
                            "template": "typename T",
                            "args": [{ "name": "x", "type": "const eteq::ETensor<T>&" }],
                            "out": { "type": "eteq::ETensor<T>", "val": "return x;" }
                        }
                    ],
                    "tenncor::nn": {
                        "classes": [
                            { "name": "Model", "requires": ["Layer"] },
                            { "name": "Layer" }
                        ]
                    },
                    "_": [
                        {
                            "operator": "+",
                            "args": [
                                { "name": "a", "type": "teq::TensptrT" },
                                { "name": "b", "type": "teq::TensptrT" }
                            ],
                            "out": "return tenncor::add(a, b);"
                        }
                    ]
                }
            }
        }))
        .unwrap()
    }

    fn run() -> GeneratedFileSet {
        ApiPlugin
            .process(&GeneratedFileSet::new(), &spec(), &GenConfig::default())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_templates_have_handlers() {
        Template::new(HEADER_TEMPLATE, HEADER_HANDLERS).unwrap();
        Template::new(SOURCE_TEMPLATE, SOURCE_HANDLERS).unwrap();
    }

    #[test]
    fn test_header_layout() {
        let files = run();
        let header = &files[HEADER_FILE];
        assert_eq!(header.user_includes, vec!["\"teq/teq.hpp\""]);
        let content = &header.content;

        let decls = "namespace tenncor\n{\n\n/// abs ...\nteq::TensptrT abs (teq::TensptrT a);\n\n/// identity ...\ntemplate <typename T>\neteq::ETensor<T> identity (const eteq::ETensor<T>& x);\n\n}";
        assert!(content.contains(decls), "{content}");

        // template bodies follow every declaration
        let decl_at = content.find("teq::TensptrT abs (").unwrap();
        let defn_at = content.find("eteq::ETensor<T> identity (const eteq::ETensor<T>& x)\n{").unwrap();
        assert!(decl_at < defn_at);
        assert!(!content.contains("teq::TensptrT abs (teq::TensptrT a)\n{"));
    }

    #[test]
    fn test_classes_in_dependency_order() {
        let files = run();
        let content = &files[HEADER_FILE].content;
        let layer = content.find("struct Layer").unwrap();
        let model = content.find("struct Model").unwrap();
        assert!(layer < model);
        assert!(content.contains("namespace tenncor\n{\n\nnamespace nn\n{\n\nstruct Layer\n{\n\n};\n\nstruct Model\n{\n\n};\n\n}\n\n}"));
    }

    #[test]
    fn test_operators_at_global_scope() {
        let files = run();
        let header = &files[HEADER_FILE].content;
        assert!(header.contains("\n/// operator + ...\nteq::TensptrT operator + (teq::TensptrT a, teq::TensptrT b);\n"));
        assert!(!header.contains("namespace _"));

        let source = &files[SOURCE_FILE];
        assert_eq!(source.internal_refs, vec![HEADER_FILE]);
        let expect = "\nteq::TensptrT operator + (teq::TensptrT a, teq::TensptrT b)
{
    if (a == nullptr || b == nullptr)
    {
        global::fatal(\"cannot operator + with a null argument\");
    }
    return tenncor::add(a, b);
}\n";
        assert!(source.content.contains(expect), "{}", source.content);
    }

    #[test]
    fn test_source_defines_non_templates() {
        let files = run();
        let source = &files[SOURCE_FILE].content;
        assert!(source.starts_with("#ifdef _GENERATED_API_HPP\n"));
        assert!(source.contains("namespace tenncor\n{\n\nteq::TensptrT abs (teq::TensptrT a)\n{\n    if (a == nullptr)"));
        assert!(!source.contains("identity"));
    }

    #[test]
    fn test_class_cycle_is_fatal() {
        let mut spec = spec();
        let api = spec.api.as_mut().unwrap();
        let ns: egen_spec::types::api::NamespaceSpec = serde_json::from_value(serde_json::json!({
            "classes": [
                { "name": "A", "requires": ["B"] },
                { "name": "B", "requires": ["A"] }
            ]
        }))
        .unwrap();
        api.namespaces.insert("cyclic".to_string(), ns);
        let err = ApiPlugin
            .process(&GeneratedFileSet::new(), &spec, &GenConfig::default())
            .unwrap_err();
        assert!(matches!(err, CodegenError::CircularDependency { .. }));
    }

    #[test]
    fn test_missing_section_is_soft() {
        let out = ApiPlugin
            .process(&GeneratedFileSet::new(), &SpecDocument::default(), &GenConfig::default())
            .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_unnamed_function_is_malformed() {
        let spec: SpecDocument = serde_json::from_value(serde_json::json!({
            "api": {
                "namespaces": {
                    "tenncor": [
                        { "name": "abs", "args": [{ "name": "a", "type": "teq::TensptrT" }], "out": "return a;" },
                        { "args": [{ "name": "a", "type": "teq::TensptrT" }], "out": "return a;" }
                    ]
                }
            }
        }))
        .unwrap();
        let err = ApiPlugin
            .process(&GeneratedFileSet::new(), &spec, &GenConfig::default())
            .unwrap_err();
        match err {
            CodegenError::SpecMalformed { key, reason } => {
                assert_eq!(key, "api.namespaces.tenncor.funcs[1]");
                assert!(reason.contains("neither"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_named_operator_is_malformed() {
        let spec: SpecDocument = serde_json::from_value(serde_json::json!({
            "api": {
                "namespaces": {
                    "_": [
                        { "name": "add", "operator": "+", "args": [{ "name": "a", "type": "teq::TensptrT" }], "out": "return a;" }
                    ]
                }
            }
        }))
        .unwrap();
        let err = ApiPlugin
            .process(&GeneratedFileSet::new(), &spec, &GenConfig::default())
            .unwrap_err();
        assert!(matches!(err, CodegenError::SpecMalformed { ref key, .. } if key == "api.namespaces._.funcs[0]"));
    }
}
