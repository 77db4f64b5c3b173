//! Read-only reports over a project: unreachable files and anchor exports.

use crate::attributes::AttributeTable;
use crate::error::Result;
use crate::io::canonical_path;
use crate::metadata::{MetadataField, MetadataRecord};
use crate::parents::scan_includes_recursive;
use crate::project::Project;
use crate::registry::{AnchorIndexer, AnchorRegistry};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Columns exported when none are requested
pub const DEFAULT_COLUMNS: [MetadataField; 6] = [
    MetadataField::Type,
    MetadataField::Title,
    MetadataField::ModuleID,
    MetadataField::Context,
    MetadataField::FilePath,
    MetadataField::Category,
];

/// Assemblies and modules that no book reaches through its includes,
/// assemblies first. `categories` narrows the files considered.
pub fn find_orphans(
    project: &Project,
    attributes: &AttributeTable,
    categories: Option<&BTreeSet<String>>,
) -> Result<Vec<PathBuf>> {
    let mut reachable = BTreeSet::new();
    for book in project.book_files()? {
        scan_includes_recursive(&book, attributes, &mut reachable)?;
    }

    let mut known = project.all_categories()?;
    if let Some(filter) = categories {
        known.retain(|category| filter.contains(category));
    }
    let (assemblies, modules) = project.categorised_files(&known)?;

    Ok(assemblies
        .into_iter()
        .chain(modules)
        .filter(|file| !reachable.contains(&canonical_path(file)))
        .collect())
}

/// Index a single book or assembly on its own
pub fn index_single(
    project: &Project,
    attributes: &mut AttributeTable,
    file: &Path,
) -> Result<AnchorRegistry> {
    let mut registry = AnchorRegistry::new();
    AnchorIndexer::new(&mut registry, attributes, project).index_book(file)?;
    Ok(registry)
}

fn csv_value(value: &str) -> String {
    if value.contains(' ') || value.contains('"') || value.contains(',') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render records as CSV, one row per record. Unknown column names are
/// reported and exported empty.
pub fn export_csv(records: &[MetadataRecord], columns: Option<&[String]>) -> String {
    let columns: Vec<(String, Option<MetadataField>)> = match columns {
        Some(names) => names
            .iter()
            .map(|name| {
                let name = name.trim();
                let field = name.parse().ok();
                if field.is_none() {
                    log::warn!("Unknown CSV column: {name}");
                }
                (name.to_string(), field)
            })
            .collect(),
        None => DEFAULT_COLUMNS
            .iter()
            .map(|field| (field.to_string(), Some(*field)))
            .collect(),
    };

    let mut out = columns
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(",");
    out.push('\n');
    for record in records {
        let row = columns
            .iter()
            .map(|(_, field)| {
                field
                    .and_then(|f| record.get(f))
                    .map(csv_value)
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&row);
        out.push('\n');
    }
    out
}
