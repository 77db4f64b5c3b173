use crate::error::Result;
use crate::factory::ModuleFactory;
use crate::io::rewrite_lines;
use crate::metadata::{MetadataField, MetadataRecord};
use crate::project::Project;
use relative_path::RelativePathBuf;
use std::path::{Path, PathBuf};

/// Add `include::<included>[leveloffset=+N]` to `assembly`, after its last
/// include or `//INCLUDES` marker, or at the end of the file. A missing
/// assembly is reported and skipped.
pub fn add_include_to_assembly(
    project: &Project,
    assembly: &Path,
    included: &Path,
    level_offset: u32,
) -> Result<bool> {
    if !assembly.exists() {
        log::warn!("Referenced assembly file does not exist: {}", assembly.display());
        return Ok(false);
    }
    let Some(target) = project.include_path(assembly, included) else {
        log::warn!(
            "Cannot include {} from {}: not inside the project",
            included.display(),
            assembly.display()
        );
        return Ok(false);
    };

    rewrite_lines(assembly, |lines| {
        let anchor = lines.iter().rposition(|line| {
            let line = line.trim_start();
            line.starts_with("include::") || line.starts_with("//INCLUDES")
        });
        let at = anchor.map_or(lines.len(), |index| index + 1);

        let mut out = lines.to_vec();
        let insert = [
            String::new(),
            format!("include::{target}[leveloffset=+{level_offset}]"),
            String::new(),
        ];
        out.splice(at..at, insert);
        Ok(Some(out))
    })
}

/// Write a fresh module from `metadata` and include it in each of
/// `parent_assemblies`, one level below the assembly title.
pub fn create_module(
    project: &Project,
    factory: &mut dyn ModuleFactory,
    metadata: &MetadataRecord,
    parent_assemblies: &[PathBuf],
) -> Result<RelativePathBuf> {
    let mut metadata = metadata.clone();
    if !parent_assemblies.is_empty() {
        let parents = parent_assemblies
            .iter()
            .map(|p| project.display(p))
            .collect::<Vec<_>>()
            .join(",");
        metadata.set(MetadataField::ParentAssemblies, parents);
    }

    let created = factory.create(&metadata, None, false)?;
    let path = project.path(&created);
    for assembly in parent_assemblies {
        add_include_to_assembly(project, assembly, &path, 1)?;
    }
    Ok(created)
}
