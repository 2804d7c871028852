use egen_spec::types::document::SpecDocument;
use egen_spec::types::error::ValidationReport;

use crate::rules;

/// Validate a loaded specification.
/// Runs all validation rules and returns a consolidated report.
pub fn validate(doc: &SpecDocument) -> ValidationReport {
    validate_file(doc, "")
}

/// Like [`validate`], attributing every entry to `file`.
pub fn validate_file(doc: &SpecDocument, file: &str) -> ValidationReport {
    let mut report = ValidationReport::success();

    rules::identifiers::check(doc, file, &mut report);
    rules::per_op::check(doc, file, &mut report);
    rules::func_shape::check(doc, file, &mut report);
    rules::classes::check(doc, file, &mut report);

    report
}
