use std::path::{Component, Path};

use crate::output::{report, AnalyzedStatement};

/// Write `<name>_span.json` and `<name>_report.md` into `output_dir`.
pub fn write_output(
    output_dir: &Path,
    name: &str,
    statements: &[AnalyzedStatement],
) -> Result<(), String> {
    validate_output_name(name)?;

    std::fs::create_dir_all(output_dir)
        .map_err(|e| format!("Failed to create output directory: {e}"))?;

    let span_path = output_dir.join(format!("{name}_span.json"));
    let json = serde_json::to_string_pretty(statements)
        .map_err(|e| format!("Failed to serialize analysis: {e}"))?;
    std::fs::write(&span_path, json)
        .map_err(|e| format!("Failed to write {}: {e}", span_path.display()))?;

    let report_path = output_dir.join(format!("{name}_report.md"));
    let report_content = report::build_report(name, statements);
    std::fs::write(&report_path, &report_content)
        .map_err(|e| format!("Failed to write {}: {e}", report_path.display()))?;

    Ok(())
}

fn validate_output_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Output name must not be empty".to_string());
    }
    let candidate = Path::new(name);
    if candidate.is_absolute() {
        return Err(format!(
            "Invalid output name '{name}': absolute paths are not allowed"
        ));
    }
    if candidate.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    }) {
        return Err(format!(
            "Invalid output name '{name}': traversal segments are not allowed"
        ));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(format!(
            "Invalid output name '{name}': path separators are not allowed"
        ));
    }
    Ok(())
}
