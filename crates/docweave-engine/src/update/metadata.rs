use crate::attributes::AttributeTable;
use crate::directive::Directive;
use crate::error::Result;
use crate::io::rewrite_lines;
use crate::metadata::{MetadataField, MetadataRecord};
use crate::parents::ParentAssemblyMap;
use crate::project::Project;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const METADATA_MARKER: &str = "// Metadata";

/// Allow-listed metadata field named by a header line, if any
fn header_field(line: &str) -> Option<MetadataField> {
    match Directive::classify(line) {
        Directive::Metadata { key, .. } => key.parse().ok(),
        _ => None,
    }
}

/// Write `metadata` into the header of `file`: fields already present above
/// the first heading are updated in place, the rest are added right after
/// the `// Metadata` marker. A file without a marker gets a new header.
pub fn update_metadata(file: &Path, metadata: &MetadataRecord) -> Result<bool> {
    log::info!("Updating metadata for file: {}", file.display());
    rewrite_lines(file, |lines| {
        let header_len = lines
            .iter()
            .position(|line| line.starts_with('='))
            .unwrap_or(lines.len());
        let existing: BTreeSet<MetadataField> =
            lines[..header_len].iter().filter_map(|l| header_field(l)).collect();
        let additions: Vec<String> = metadata
            .iter()
            .filter(|(field, _)| !existing.contains(field))
            .map(|(field, value)| format!("// {field}: {value}"))
            .collect();

        let mut out = Vec::with_capacity(lines.len() + additions.len() + 2);
        let mut has_marker = false;
        for (index, line) in lines.iter().enumerate() {
            if index < header_len && !has_marker && line.starts_with(METADATA_MARKER) {
                has_marker = true;
                out.push(line.clone());
                out.extend(additions.iter().cloned());
                continue;
            }
            let updated = header_field(line)
                .filter(|_| index < header_len)
                .and_then(|field| metadata.get(field).map(|value| format!("// {field}: {value}")));
            out.push(updated.unwrap_or_else(|| line.clone()));
        }

        if !has_marker && !additions.is_empty() {
            let mut header = vec![METADATA_MARKER.to_string()];
            header.extend(additions);
            header.push(String::new());
            header.append(&mut out);
            out = header;
        }
        Ok(Some(out))
    })
}

/// Record, in every file included by one of `assemblies`, the assemblies that
/// include it. Returns the number of files rewritten.
pub fn update_parent_assemblies(
    project: &Project,
    assemblies: &[PathBuf],
    attributes: &AttributeTable,
) -> Result<usize> {
    let map = ParentAssemblyMap::build(assemblies, attributes)?;
    let mut changed = 0;
    for (file, parents) in map.iter() {
        if !file.exists() {
            log::warn!("Included file {} does not exist", file.display());
            continue;
        }
        let value = parents
            .iter()
            .map(|parent| project.display(parent))
            .collect::<Vec<_>>()
            .join(",");
        let record = MetadataRecord::new().with(MetadataField::ParentAssemblies, value);
        if update_metadata(file, &record)? {
            changed += 1;
        }
    }
    Ok(changed)
}
