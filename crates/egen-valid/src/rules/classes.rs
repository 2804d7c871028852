use std::collections::HashSet;

use egen_spec::types::common::is_identifier;
use egen_spec::types::document::SpecDocument;
use egen_spec::types::error::{
    ErrorEntry, ValidationReport, E_DUPLICATE_SYMBOL, E_INVALID_IDENTIFIER, E_REF_CYCLE,
    E_REF_NOT_FOUND,
};

/// Check class declarations: unique names per namespace, identifier
/// members, init-lists naming declared members.
///
/// Cycles in `requires` are left to the class resolver, which rejects them
/// at generation time; a class requiring itself is flagged early as a
/// warning.
pub fn check(doc: &SpecDocument, file: &str, report: &mut ValidationReport) {
    let Some(api) = &doc.api else {
        return;
    };

    for (namespace, content) in &api.namespaces {
        let mut names = HashSet::new();
        for (i, class) in content.classes().iter().enumerate() {
            let path = format!("$.api.namespaces.{namespace}.classes[{i}]");

            if !is_identifier(&class.name) {
                report.push(ErrorEntry::error(
                    E_INVALID_IDENTIFIER,
                    format!("class name '{}' is not a valid identifier", class.name),
                    file,
                    &path,
                ));
            } else if !names.insert(class.name.as_str()) {
                report.push(ErrorEntry::error(
                    E_DUPLICATE_SYMBOL,
                    format!("class '{}' is declared twice in namespace '{namespace}'", class.name),
                    file,
                    &path,
                ));
            }

            if class.requires.iter().any(|r| r == &class.name) {
                report.push(ErrorEntry::warning(
                    E_REF_CYCLE,
                    format!("class '{}' requires itself", class.name),
                    file,
                    &format!("{path}.requires"),
                ));
            }

            let mut members = HashSet::new();
            for member in &class.members {
                if !is_identifier(&member.name) {
                    report.push(ErrorEntry::error(
                        E_INVALID_IDENTIFIER,
                        format!("member '{}' of class '{}' is not a valid identifier", member.name, class.name),
                        file,
                        &format!("{path}.members"),
                    ));
                } else if !members.insert(member.name.as_str()) {
                    report.push(ErrorEntry::error(
                        E_DUPLICATE_SYMBOL,
                        format!("member '{}' of class '{}' is declared twice", member.name, class.name),
                        file,
                        &format!("{path}.members"),
                    ));
                }
            }

            if let Some(init) = &class.init {
                for key in init.initlist.keys() {
                    if !members.contains(key.as_str()) {
                        report.push(
                            ErrorEntry::error(
                                E_REF_NOT_FOUND,
                                format!("init-list entry '{key}' is not a member of class '{}'", class.name),
                                file,
                                &format!("{path}.init.initlist.{key}"),
                            )
                            .with_suggestion("Declare it under members"),
                        );
                    }
                }
            }
        }
    }
}
