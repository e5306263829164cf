use serde::{Deserialize, Serialize};

/// A caller-asserted approximate line for a named variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableRequest {
    pub name: String,
    /// 1-based.
    pub line_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRequest {
    /// Opaque identifier (absolute or relative path). Lookups into loaded
    /// sources use this exact string.
    pub file_name: String,
    pub variables: Vec<VariableRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub files: Vec<FileRequest>,
}

impl ExtractionRequest {
    /// File names in first-seen order, each listed once.
    pub fn unique_file_names(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::with_capacity(self.files.len());
        for f in &self.files {
            if !out.contains(&f.file_name.as_str()) {
                out.push(f.file_name.as_str());
            }
        }
        out
    }

    /// Field-level checks applied before any file is touched.
    ///
    /// Returns one message per violation, prefixed with the offending path
    /// (`files[1].variables[0].name: ...`). Empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (fi, file) in self.files.iter().enumerate() {
            if file.file_name.trim().is_empty() {
                problems.push(format!("files[{fi}].fileName: should not be empty"));
            }
            for (vi, var) in file.variables.iter().enumerate() {
                if var.name.trim().is_empty() {
                    problems.push(format!("files[{fi}].variables[{vi}].name: should not be empty"));
                }
                if var.line_number < 1 {
                    problems.push(format!("files[{fi}].variables[{vi}].lineNumber: must be at least 1"));
                }
            }
        }
        problems
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectedVariable {
    pub name: String,
    pub line_number: u32,
    /// Always the caller's value, untouched.
    pub original_line_number: u32,
}

impl CorrectedVariable {
    /// Pass-through record used when no correction could be attempted.
    pub fn unchanged(var: &VariableRequest) -> Self {
        Self {
            name: var.name.clone(),
            line_number: var.line_number,
            original_line_number: var.line_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectedFile {
    pub file_name: String,
    pub variables: Vec<CorrectedVariable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadError {
    pub file_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub files: Vec<CorrectedFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<LoadError>>,
}

impl ExtractionResult {
    pub fn errors(&self) -> &[LoadError] {
        self.errors.as_deref().unwrap_or(&[])
    }
}
