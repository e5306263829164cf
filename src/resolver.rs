use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::FileError;
use crate::loader::{load_sources, LoadedSources, SourceLoader};
use crate::locator::{DeclarationLocator, ScopeStartLocator};
use crate::model::{
    CorrectedFile, CorrectedVariable, ExtractionRequest, ExtractionResult, FileRequest, LoadError, VariableRequest,
};
use crate::syntax::{parse_source, ParsedSource};

/// Corrected line for one variable in an already-parsed file.
///
/// The value must be bound *and* its enclosing scope must have started, so
/// the later of the two candidate lines is taken.
pub fn correct_line(src: &ParsedSource<'_>, name: &str, original_line: u32) -> u32 {
    let declared = DeclarationLocator::run(src, name, original_line);
    let scope_start = ScopeStartLocator::run(src, original_line);
    declared.max(scope_start)
}

fn correct_variables(src: &ParsedSource<'_>, vars: &[VariableRequest]) -> Vec<CorrectedVariable> {
    vars.iter()
        .map(|v| {
            let line = correct_line(src, &v.name, v.line_number);
            if line != v.line_number {
                tracing::debug!(file = src.file_name(), name = %v.name, from = v.line_number, to = line, "line corrected");
            }
            CorrectedVariable {
                name: v.name.clone(),
                line_number: line,
                original_line_number: v.line_number,
            }
        })
        .collect()
}

fn passthrough(file: &FileRequest) -> CorrectedFile {
    CorrectedFile {
        file_name: file.file_name.clone(),
        variables: file.variables.iter().map(CorrectedVariable::unchanged).collect(),
    }
}

/// Parse once and correct every variable requested against `file_name`,
/// whichever request entries they came from. Panics inside the analysis are
/// contained to this file.
fn analyze_file(file_name: &str, text: &str, entries: &[&FileRequest]) -> Result<Vec<Vec<CorrectedVariable>>, FileError> {
    let outcome = catch_unwind(AssertUnwindSafe(|| -> Result<_, FileError> {
        let parsed = parse_source(file_name, text)?;
        Ok(entries.iter().map(|f| correct_variables(&parsed, &f.variables)).collect())
    }));
    match outcome {
        Ok(res) => res,
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "analysis panicked".to_string());
            Err(FileError::Parse { reason })
        }
    }
}

/// Resolve corrected lines for `request` against already-loaded `sources`.
///
/// Output order mirrors the request. Files with no text, or whose text could
/// not be parsed, pass their variables through unchanged; load errors from
/// `sources` and parse errors (one per file name) are reported in `errors`.
pub fn resolve_lines(request: &ExtractionRequest, sources: &LoadedSources) -> ExtractionResult {
    let mut errors: Vec<LoadError> = sources.errors.clone();

    // Group entries by file so a file listed twice is parsed once.
    let mut by_file: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, f) in request.files.iter().enumerate() {
        by_file.entry(f.file_name.as_str()).or_default().push(i);
    }

    let mut corrected: Vec<Option<CorrectedFile>> = vec![None; request.files.len()];
    for file_name in request.unique_file_names() {
        let Some(text) = sources.get(file_name) else { continue };
        let indices = &by_file[file_name];
        let entries: Vec<&FileRequest> = indices.iter().map(|&i| &request.files[i]).collect();

        match analyze_file(file_name, text, &entries) {
            Ok(per_entry) => {
                for (&i, variables) in indices.iter().zip(per_entry) {
                    corrected[i] = Some(CorrectedFile {
                        file_name: file_name.to_string(),
                        variables,
                    });
                }
            }
            Err(e) => {
                tracing::warn!(file = file_name, error = %e, "parse failed, keeping original lines");
                errors.push(LoadError {
                    file_name: file_name.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    let files = request
        .files
        .iter()
        .zip(corrected)
        .map(|(f, c)| c.unwrap_or_else(|| passthrough(f)))
        .collect();

    ExtractionResult {
        files,
        errors: (!errors.is_empty()).then_some(errors),
    }
}

/// Load every distinct file named in `request` through `loader`, then resolve.
pub fn process_request(loader: &dyn SourceLoader, request: &ExtractionRequest) -> ExtractionResult {
    let file_names = request.unique_file_names();
    tracing::debug!(files = file_names.len(), "loading sources");
    let sources = load_sources(loader, &file_names);
    resolve_lines(request, &sources)
}
