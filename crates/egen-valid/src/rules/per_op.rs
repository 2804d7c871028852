use egen_spec::types::document::SpecDocument;
use egen_spec::types::error::{ErrorEntry, ValidationReport, E_ALIAS_CHAIN, E_REF_NOT_FOUND};
use egen_spec::types::opcode::OverrideSpec;

/// Check per-op overrides: every override names a declared behaviour, and
/// every alias points at an opcode with a direct override of the same
/// behaviour. Aliases resolve exactly one level.
pub fn check(doc: &SpecDocument, file: &str, report: &mut ValidationReport) {
    let Some(opcode) = &doc.opcode else {
        return;
    };

    for (name, op) in &opcode.opcalls {
        for (behaviour, over) in &op.per_op_overrides {
            let path = format!("$.opcode.opcalls.{name}.per_op_overrides.{behaviour}");
            if !opcode.per_op.contains_key(behaviour) {
                report.push(
                    ErrorEntry::error(
                        E_REF_NOT_FOUND,
                        format!("opcode '{name}' overrides undeclared per-op behaviour '{behaviour}'"),
                        file,
                        &path,
                    )
                    .with_suggestion(format!("Declare '{behaviour}' under opcode.per_op")),
                );
                continue;
            }

            let OverrideSpec::Alias { alias } = over else {
                continue;
            };
            let Some(target) = opcode.opcalls.get(alias) else {
                report.push(
                    ErrorEntry::error(
                        E_REF_NOT_FOUND,
                        format!("per-op alias '{alias}' of opcode '{name}' is not a declared opcode"),
                        file,
                        &path,
                    )
                    .with_suggestion(format!("Declare opcode '{alias}' or alias an existing one")),
                );
                continue;
            };
            match target.per_op_overrides.get(behaviour) {
                Some(OverrideSpec::Body(_)) => {}
                Some(OverrideSpec::Alias { alias: next }) => report.push(
                    ErrorEntry::error(
                        E_ALIAS_CHAIN,
                        format!(
                            "opcode '{name}' aliases '{alias}' for '{behaviour}', which itself aliases '{next}'"
                        ),
                        file,
                        &path,
                    )
                    .with_suggestion(format!("Alias '{next}' directly")),
                ),
                None => report.push(ErrorEntry::error(
                    E_REF_NOT_FOUND,
                    format!("opcode '{alias}' has no '{behaviour}' override for '{name}' to alias"),
                    file,
                    &path,
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(opcalls: serde_json::Value) -> ValidationReport {
        let doc: SpecDocument = serde_json::from_value(serde_json::json!({
            "opcode": {
                "params": "",
                "per_op": { "shape": { "default": "return 0;" } },
                "opcalls": opcalls
            }
        }))
        .unwrap();
        let mut report = ValidationReport::success();
        check(&doc, "", &mut report);
        report
    }

    #[test]
    fn test_single_level_alias_ok() {
        let report = run(serde_json::json!({
            "ADD": { "stmt": ";", "per_op_overrides": { "shape": "return 1;" } },
            "SUB": { "stmt": ";", "per_op_overrides": { "shape": { "alias": "ADD" } } }
        }));
        assert!(report.ok, "unexpected errors: {:?}", report.errors);
    }

    #[test]
    fn test_alias_chain_rejected() {
        let report = run(serde_json::json!({
            "ADD": { "stmt": ";", "per_op_overrides": { "shape": "return 1;" } },
            "SUB": { "stmt": ";", "per_op_overrides": { "shape": { "alias": "ADD" } } },
            "MUL": { "stmt": ";", "per_op_overrides": { "shape": { "alias": "SUB" } } }
        }));
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].code, E_ALIAS_CHAIN);
        assert_eq!(report.errors[0].path, "$.opcode.opcalls.MUL.per_op_overrides.shape");
    }

    #[test]
    fn test_unknown_targets() {
        let report = run(serde_json::json!({
            "ADD": { "stmt": ";", "per_op_overrides": { "grad": "return 1;" } },
            "SUB": { "stmt": ";", "per_op_overrides": { "shape": { "alias": "DIV" } } },
            "MUL": { "stmt": ";", "per_op_overrides": { "shape": { "alias": "ADD" } } }
        }));
        assert_eq!(report.errors.len(), 3);
        assert!(report.errors.iter().all(|e| e.code == E_REF_NOT_FOUND));
    }
}
