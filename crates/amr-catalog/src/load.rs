use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Violation};
use crate::model::{CatalogDocument, RuleCatalog};
use crate::validate;

/// Per-file size bound enforced before parsing.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 4 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub max_file_bytes: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// Load and validate a catalog from a single document or a directory of
/// documents treated as one logical catalog.
///
/// All parse, schema, and semantic violations are collected before this
/// returns; a failed load never yields a partial catalog.
pub fn load_catalog(path: &Path, options: &LoadOptions) -> Result<RuleCatalog, CatalogError> {
    let files = catalog_files(path)?;
    let mut violations: Vec<Violation> = Vec::new();
    let mut documents: Vec<(PathBuf, CatalogDocument)> = Vec::new();

    for file in &files {
        match read_document(file, options) {
            Ok(doc) => documents.push((file.clone(), doc)),
            Err(violation) => violations.push(violation),
        }
    }

    let catalog = validate::build(documents, &mut violations);
    if !violations.is_empty() {
        return Err(CatalogError::Validation(violations));
    }

    // build() produces a catalog whenever it records no violation.
    let catalog = catalog.ok_or_else(|| {
        CatalogError::Validation(vec![Violation::semantic(
            "emptyCatalog",
            format!("no catalog content under {}", path.display()),
        )])
    })?;

    tracing::info!(
        version = catalog.version(),
        files = files.len(),
        breakpoints = catalog.breakpoints().len(),
        expert_rules = catalog.expert_rules().len(),
        "catalog loaded"
    );
    Ok(catalog)
}

/// The documents making up the catalog at `path`: the file itself, or the
/// name-sorted YAML/JSON files of a directory.
fn catalog_files(path: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    if !path.exists() {
        return Err(CatalogError::FileMissing(path.to_path_buf()));
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let entries = std::fs::read_dir(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml") | Some("json")
                )
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(CatalogError::FileMissing(path.to_path_buf()));
    }
    Ok(files)
}

fn read_document(path: &Path, options: &LoadOptions) -> Result<CatalogDocument, Violation> {
    let display = path.display().to_string();

    let metadata = std::fs::metadata(path)
        .map_err(|e| Violation::schema(&display, format!("unreadable: {e}")))?;
    if metadata.len() > options.max_file_bytes {
        return Err(Violation::schema(
            &display,
            format!(
                "file is {} bytes, exceeding the {} byte limit",
                metadata.len(),
                options.max_file_bytes
            ),
        ));
    }

    let text = std::fs::read_to_string(path)
        .map_err(|e| Violation::schema(&display, format!("unreadable: {e}")))?;

    let is_json = matches!(path.extension().and_then(|e| e.to_str()), Some("json"));
    if is_json {
        serde_json::from_str(&text).map_err(|e| Violation::Parse {
            path: display,
            reason: e.to_string(),
        })
    } else {
        serde_yaml::from_str(&text).map_err(|e| Violation::Parse {
            path: display,
            reason: e.to_string(),
        })
    }
}
