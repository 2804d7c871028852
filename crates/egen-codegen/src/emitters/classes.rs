use egen_spec::types::api::{ApiSpec, ClassSpec, CopySpec, FuncSpec, InitSpec};
use egen_spec::types::common::{strip_template_prefix, ArgSpec};
use indexmap::IndexMap;

use super::cpp::{reindent, render_args, template_prefix};
use super::funcs::{check_shape, render_decl, render_defn, MemberScope};
use crate::config::GenConfig;
use crate::error::CodegenError;
use crate::template::{render, Handler};

const CLASS_TEMPLATE: &str = r#"${template_decl}struct ${class_name}
{
${body}
};"#;

/// A class split into its declaration and out-of-line definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedClass {
    pub decl: String,
    pub header_defns: Vec<String>,
    pub source_defns: Vec<String>,
}

#[derive(Clone, Copy)]
enum Special {
    Copy,
    Move,
}

impl Special {
    fn param(self, typename: &str, other: &str) -> String {
        match self {
            Special::Copy => format!("const {typename}& {other}"),
            Special::Move => format!("{typename}&& {other}"),
        }
    }
}

struct ClassCtx<'a> {
    namespace: &'a str,
    class: &'a ClassSpec,
    api: &'a ApiSpec,
    config: &'a GenConfig,
    /// `Name` or `Name<T, N>`
    typename: String,
}

impl<'a> ClassCtx<'a> {
    fn new(namespace: &'a str, class: &'a ClassSpec, api: &'a ApiSpec, config: &'a GenConfig) -> Self {
        let params: Vec<String> = class
            .template_args()
            .iter()
            .map(|p| strip_template_prefix(p))
            .collect();
        let typename = if params.is_empty() {
            class.name.clone()
        } else {
            format!("{}<{}>", class.name, params.join(", "))
        };
        Self {
            namespace,
            class,
            api,
            config,
            typename,
        }
    }

    fn key(&self, field: &str) -> String {
        format!("api.namespaces.{}.classes.{}.{field}", self.namespace, self.class.name)
    }

    fn scope(&self) -> MemberScope<'_> {
        MemberScope {
            template: self.class.template(),
            qualifier: &self.typename,
        }
    }

    /// `: a(x), b(y)` ordered by member declaration.
    fn initlist(&self, initlist: &IndexMap<String, String>, field: &str) -> Result<String, CodegenError> {
        if initlist.is_empty() {
            return Ok(String::new());
        }
        let mut entries = Vec::with_capacity(initlist.len());
        for (member, value) in initlist {
            let position = self
                .class
                .members
                .iter()
                .position(|m| &m.name == member)
                .ok_or_else(|| {
                    CodegenError::malformed(
                        self.key(&format!("{field}.initlist.{member}")),
                        format!("'{member}' is not a member of {}", self.class.name),
                    )
                })?;
            entries.push((position, format!("{member}({value})")));
        }
        entries.sort_by_key(|(position, _)| *position);
        let entries: Vec<String> = entries.into_iter().map(|(_, e)| e).collect();
        Ok(format!(" : {}", entries.join(", ")))
    }

    fn init_decl(&self, init: &InitSpec) -> String {
        format!("{} ({});", self.class.name, render_args(&init.args, true))
    }

    fn init_defn(&self, init: &InitSpec) -> Result<String, CodegenError> {
        Ok(format!(
            "{}{}::{} ({}){}\n{{\n    {}\n}}",
            template_prefix(self.class.template()),
            self.typename,
            self.class.name,
            render_args(&init.args, false),
            self.initlist(&init.initlist, "init")?,
            reindent(&init.do_block, "    "),
        ))
    }

    fn special_decl(&self, kind: Special, spec: Option<&CopySpec>) -> String {
        let name = &self.class.name;
        let typename = &self.typename;
        match spec {
            None => {
                let param = kind.param(typename, "other");
                format!("{name} ({param}) = default;\n{typename}& operator = ({param}) = default;")
            }
            Some(spec) => {
                let param = kind.param(typename, &spec.other);
                format!(
                    "{name} ({param}{});\n{typename}& operator = ({param});",
                    extra_args(&spec.args, true)
                )
            }
        }
    }

    fn special_defn(&self, kind: Special, spec: &CopySpec, field: &str) -> Result<String, CodegenError> {
        let prefix = template_prefix(self.class.template());
        let name = &self.class.name;
        let typename = &self.typename;
        let param = kind.param(typename, &spec.other);
        let body = reindent(&spec.do_block, "    ");
        Ok(format!(
            "{prefix}{typename}::{name} ({param}{args}){ilist}\n{{\n    {body}\n}}\n\n\
             {prefix}{typename}& {typename}::operator = ({param})\n{{\n    {body}\n    return *this;\n}}",
            args = extra_args(&spec.args, false),
            ilist = self.initlist(&spec.initlist, field)?,
        ))
    }

    /// Copy and move declarations. An explicit one defaults the other.
    fn copynmove_decl(&self) -> String {
        let class = self.class;
        if class.copy.is_none() && class.move_.is_none() {
            return String::new();
        }
        format!(
            "{}\n\n{}",
            self.special_decl(Special::Copy, class.copy.as_ref()),
            self.special_decl(Special::Move, class.move_.as_ref())
        )
    }

    fn funcs_decl(&self) -> String {
        let (public, private): (Vec<&FuncSpec>, Vec<&FuncSpec>) =
            self.class.funcs.iter().partition(|f| f.public);
        let group = |label: &str, funcs: Vec<&FuncSpec>| -> Option<String> {
            if funcs.is_empty() {
                return None;
            }
            let decls: Vec<String> = funcs.iter().map(|f| render_decl(f, self.api)).collect();
            Some(format!("{label}\n{}", decls.join("\n\n")))
        };
        [group("public:", public), group("private:", private)]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn members_decl(&self) -> String {
        let (public, private): (Vec<&ArgSpec>, Vec<&ArgSpec>) =
            self.class.members.iter().partition(|m| m.public);
        let group = |label: &str, members: Vec<&ArgSpec>| -> Option<String> {
            if members.is_empty() {
                return None;
            }
            let lines: Vec<String> = members.iter().map(|m| format!("{};", m.render(true))).collect();
            Some(format!("{label}\n{}", lines.join("\n")))
        };
        [group("public:", public), group("private:", private)]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Constructor and copy/move definitions.
    fn special_defns(&self) -> Result<Vec<String>, CodegenError> {
        let mut defns = Vec::new();
        if let Some(init) = &self.class.init {
            defns.push(self.init_defn(init)?);
        }
        if let Some(copy) = &self.class.copy {
            defns.push(self.special_defn(Special::Copy, copy, "copy")?);
        }
        if let Some(mv) = &self.class.move_ {
            defns.push(self.special_defn(Special::Move, mv, "move")?);
        }
        Ok(defns)
    }

    fn func_defn(&self, func: &FuncSpec) -> String {
        render_defn(func, self.api, self.config, Some(self.scope()))
    }
}

fn extra_args(args: &[ArgSpec], accept_default: bool) -> String {
    if args.is_empty() {
        String::new()
    } else {
        format!(", {}", render_args(args, accept_default))
    }
}

fn indent_body(section: &str) -> String {
    section
        .lines()
        .map(|line| {
            if line.is_empty() || line == "public:" || line == "private:" {
                line.to_string()
            } else {
                format!("    {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn handle_template_decl(ctx: &ClassCtx<'_>) -> Result<String, CodegenError> {
    Ok(template_prefix(ctx.class.template()))
}

fn handle_class_name(ctx: &ClassCtx<'_>) -> Result<String, CodegenError> {
    Ok(ctx.class.name.clone())
}

fn handle_body(ctx: &ClassCtx<'_>) -> Result<String, CodegenError> {
    let sections = [
        ctx.class.init.as_ref().map(|init| ctx.init_decl(init)).unwrap_or_default(),
        ctx.copynmove_decl(),
        ctx.funcs_decl(),
        ctx.members_decl(),
    ];
    Ok(sections
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| indent_body(s))
        .collect::<Vec<_>>()
        .join("\n\n"))
}

fn class_handlers<'a>() -> [(&'static str, Handler<ClassCtx<'a>>); 3] {
    [
        ("template_decl", handle_template_decl),
        ("class_name", handle_class_name),
        ("body", handle_body),
    ]
}

/// Render `class` declared in `namespace`.
///
/// Template classes keep every member definition in the header. Other
/// classes keep only their template member functions there.
pub fn render_class(
    namespace: &str,
    class: &ClassSpec,
    api: &ApiSpec,
    config: &GenConfig,
) -> Result<RenderedClass, CodegenError> {
    for (i, func) in class.funcs.iter().enumerate() {
        check_shape(
            func,
            &format!("api.namespaces.{namespace}.classes.{}.funcs[{i}]", class.name),
        )?;
    }
    let ctx = ClassCtx::new(namespace, class, api, config);
    let decl = render(CLASS_TEMPLATE, &class_handlers(), &ctx)?;
    let specials = ctx.special_defns()?;

    let mut rendered = RenderedClass {
        decl,
        ..Default::default()
    };
    if class.template().is_some() {
        rendered.header_defns = specials;
        rendered
            .header_defns
            .extend(class.funcs.iter().map(|f| ctx.func_defn(f)));
    } else {
        rendered.source_defns = specials;
        for func in &class.funcs {
            if func.template().is_some() {
                rendered.header_defns.push(ctx.func_defn(func));
            } else {
                rendered.source_defns.push(ctx.func_defn(func));
            }
        }
    }
    Ok(rendered)
}
