use std::collections::HashSet;

use egen_spec::types::api::FuncSpec;
use egen_spec::types::common::{is_identifier, template_params, ArgSpec};
use egen_spec::types::document::SpecDocument;
use egen_spec::types::error::{
    ErrorEntry, ValidationReport, E_DUPLICATE_SYMBOL, E_EXCLUSIVE_FIELDS, E_INVALID_IDENTIFIER,
    E_INVALID_TEMPLATE, E_MISSING_FIELD,
};

/// Check namespaces, function signatures and template parameter lists.
pub fn check(doc: &SpecDocument, file: &str, report: &mut ValidationReport) {
    if let Some(opcode) = &doc.opcode {
        for (behaviour, per_op) in &opcode.per_op {
            check_args(&per_op.args, file, &format!("$.opcode.per_op.{behaviour}"), report);
        }
    }

    let Some(api) = &doc.api else {
        return;
    };

    for (namespace, content) in &api.namespaces {
        let ns_path = format!("$.api.namespaces.{namespace}");
        let bad_segment = namespace
            .split("::")
            .any(|seg| !(seg.is_empty() || seg == "_" || is_identifier(seg)));
        if bad_segment {
            report.push(ErrorEntry::error(
                E_INVALID_IDENTIFIER,
                format!("namespace '{namespace}' has a segment that is not an identifier"),
                file,
                &ns_path,
            ));
        }

        for (i, func) in content.funcs().iter().enumerate() {
            check_func(func, file, &format!("{ns_path}.funcs[{i}]"), report);
        }
        for (i, class) in content.classes().iter().enumerate() {
            let class_path = format!("{ns_path}.classes[{i}]");
            if let Some(template) = class.template() {
                check_template(template, file, &format!("{class_path}.template"), report);
            }
            for (j, func) in class.funcs.iter().enumerate() {
                check_func(func, file, &format!("{class_path}.funcs[{j}]"), report);
            }
        }
    }
}

fn check_func(func: &FuncSpec, file: &str, path: &str, report: &mut ValidationReport) {
    match (&func.name, &func.operator) {
        (Some(_), Some(_)) => report.push(
            ErrorEntry::error(
                E_EXCLUSIVE_FIELDS,
                format!("function '{}' declares both name and operator", func.ident()),
                file,
                path,
            )
            .with_suggestion("Split it into a named function and an operator overload"),
        ),
        (None, None) => report.push(ErrorEntry::error(
            E_MISSING_FIELD,
            "function declares neither name nor operator",
            file,
            path,
        )),
        (Some(name), None) if !is_identifier(name) => report.push(ErrorEntry::error(
            E_INVALID_IDENTIFIER,
            format!("function name '{name}' is not a valid identifier"),
            file,
            &format!("{path}.name"),
        )),
        (None, Some(op)) if op.trim().is_empty() => report.push(ErrorEntry::error(
            E_MISSING_FIELD,
            "operator symbol is empty",
            file,
            &format!("{path}.operator"),
        )),
        _ => {}
    }

    check_args(&func.args, file, path, report);
    if let Some(template) = func.template() {
        check_template(template, file, &format!("{path}.template"), report);
    }
}

fn check_args(args: &[ArgSpec], file: &str, path: &str, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for (i, arg) in args.iter().enumerate() {
        let arg_path = format!("{path}.args[{i}]");
        if !is_identifier(&arg.name) {
            report.push(ErrorEntry::error(
                E_INVALID_IDENTIFIER,
                format!("argument name '{}' is not a valid identifier", arg.name),
                file,
                &arg_path,
            ));
        } else if !seen.insert(arg.name.as_str()) {
            report.push(ErrorEntry::error(
                E_DUPLICATE_SYMBOL,
                format!("argument '{}' is declared twice", arg.name),
                file,
                &arg_path,
            ));
        }
        if arg.arg_type.trim().is_empty() {
            report.push(ErrorEntry::error(
                E_MISSING_FIELD,
                format!("argument '{}' has an empty type", arg.name),
                file,
                &arg_path,
            ));
        }
    }
}

fn check_template(template: &str, file: &str, path: &str, report: &mut ValidationReport) {
    if template_params(template).iter().any(|p| p.is_empty()) {
        report.push(
            ErrorEntry::error(
                E_INVALID_TEMPLATE,
                format!("template parameter list '{template}' has an empty parameter"),
                file,
                path,
            )
            .with_suggestion("Remove the stray comma"),
        );
    }
}
