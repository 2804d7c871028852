use std::sync::OnceLock;

use regex::Regex;

use egen_spec::types::common::is_identifier;
use egen_spec::types::document::SpecDocument;
use egen_spec::types::dtype::BAD_TYPE;
use egen_spec::types::error::{
    ErrorEntry, ValidationReport, E_INVALID_IDENTIFIER, E_INVALID_TYPE, E_REF_NOT_FOUND,
    E_RESERVED_NAME,
};
use egen_spec::types::opcode::BAD_OP;

const RESERVED_OPCODES: &[&str] = &[BAD_OP, "_N_GENERATED_OPCODES"];
const RESERVED_DTYPES: &[&str] = &[BAD_TYPE, "_N_GENERATED_DTYPES"];

/// Scalar type names: `double`, `int32_t`, `unsigned char`, `std::complex<double>`.
fn scalar_type_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\s*(::|\s)\s*[A-Za-z_][A-Za-z0-9_]*)*(<[A-Za-z0-9_:,\s]+>)?$")
            .expect("scalar type pattern is valid")
    })
}

/// Check opcode names, dtype codes, ctypes and the default dtype.
pub fn check(doc: &SpecDocument, file: &str, report: &mut ValidationReport) {
    if let Some(opcode) = &doc.opcode {
        for name in opcode.opcalls.keys() {
            check_code(name, RESERVED_OPCODES, file, &format!("$.opcode.opcalls.{name}"), report);
        }
        for behaviour in opcode.per_op.keys() {
            if !is_identifier(behaviour) {
                report.push(ErrorEntry::error(
                    E_INVALID_IDENTIFIER,
                    format!("per-op behaviour '{behaviour}' is not a valid identifier"),
                    file,
                    &format!("$.opcode.per_op.{behaviour}"),
                ));
            }
        }
    }

    if let Some(dtypes) = &doc.dtype {
        for (code, dtype) in dtypes {
            let path = format!("$.dtype.{code}");
            check_code(code, RESERVED_DTYPES, file, &path, report);
            if !scalar_type_pattern().is_match(dtype.ctype.trim()) {
                report.push(
                    ErrorEntry::error(
                        E_INVALID_TYPE,
                        format!("ctype '{}' of dtype '{code}' is not a scalar type name", dtype.ctype),
                        file,
                        &format!("{path}.ctype"),
                    )
                    .with_suggestion("Use a native scalar type such as double or int32_t"),
                );
            }
        }
    }

    if let Some(default_type) = &doc.default_type {
        let declared = doc
            .dtype
            .as_ref()
            .is_some_and(|dtypes| dtypes.contains_key(default_type));
        if !declared {
            report.push(
                ErrorEntry::error(
                    E_REF_NOT_FOUND,
                    format!("default_type '{default_type}' is not a declared dtype"),
                    file,
                    "$.default_type",
                )
                .with_suggestion("Declare it under dtype or remove default_type"),
            );
        }
    }
}

fn check_code(name: &str, reserved: &[&str], file: &str, path: &str, report: &mut ValidationReport) {
    if !is_identifier(name) {
        report.push(ErrorEntry::error(
            E_INVALID_IDENTIFIER,
            format!("'{name}' is not a valid identifier"),
            file,
            path,
        ));
    } else if reserved.contains(&name) {
        report.push(
            ErrorEntry::error(
                E_RESERVED_NAME,
                format!("'{name}' is reserved by the generated enum"),
                file,
                path,
            )
            .with_suggestion("Sentinels are implicit; remove the entry"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(value: serde_json::Value) -> ValidationReport {
        let doc: SpecDocument = serde_json::from_value(value).unwrap();
        let mut report = ValidationReport::success();
        check(&doc, "", &mut report);
        report
    }

    #[test]
    fn test_scalar_types_accepted() {
        let report = run(serde_json::json!({
            "dtype": {
                "DOUBLE": { "ctype": "double" },
                "UINT8": { "ctype": "uint8_t" },
                "UCHAR": { "ctype": "unsigned char" },
                "CDOUBLE": { "ctype": "std::complex<double>" }
            },
            "default_type": "DOUBLE"
        }));
        assert!(report.ok, "unexpected errors: {:?}", report.errors);
    }

    #[test]
    fn test_bad_ctype_and_sentinel() {
        let report = run(serde_json::json!({
            "dtype": {
                "BAD_TYPE": { "ctype": "int" },
                "PTR": { "ctype": "double*" }
            }
        }));
        let codes: Vec<&str> = report.errors.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec![E_RESERVED_NAME, E_INVALID_TYPE]);
    }

    #[test]
    fn test_invalid_opcode_name() {
        let report = run(serde_json::json!({
            "opcode": { "params": "", "opcalls": { "2ADD": { "stmt": ";" } } }
        }));
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].code, E_INVALID_IDENTIFIER);
        assert_eq!(report.errors[0].path, "$.opcode.opcalls.2ADD");
    }

    #[test]
    fn test_undeclared_default_type() {
        let report = run(serde_json::json!({
            "dtype": { "FLOAT": { "ctype": "float" } },
            "default_type": "DOUBLE"
        }));
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].code, E_REF_NOT_FOUND);
    }
}
