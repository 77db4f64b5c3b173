use crate::ambiguity::AmbiguityResolver;
use crate::directive::Directive;
use crate::error::Result;
use crate::io::{resolve_relative, rewrite_lines};
use crate::project::{FileKind, Project};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name key used to find a moved file: lower case, spaces and dashes
/// as underscores
pub fn normalize_file_name(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Known files by normalised name
#[derive(Debug, Default)]
struct FileIndex {
    assemblies: BTreeMap<String, Vec<PathBuf>>,
    modules: BTreeMap<String, Vec<PathBuf>>,
}

impl FileIndex {
    fn new(assemblies: &[PathBuf], modules: &[PathBuf]) -> Self {
        let mut index = Self::default();
        for (files, map) in [(assemblies, &mut index.assemblies), (modules, &mut index.modules)] {
            for file in files {
                if let Some(name) = file.file_name() {
                    map.entry(normalize_file_name(&name.to_string_lossy()))
                        .or_default()
                        .push(file.clone());
                }
            }
        }
        index
    }

    fn candidates(&self, project: &Project, target: &str) -> &[PathBuf] {
        let name = target.rsplit('/').next().unwrap_or(target);
        let name = normalize_file_name(name);
        let map = match project.layout().kind_of(&name) {
            FileKind::Assembly => &self.assemblies,
            _ => &self.modules,
        };
        map.get(&name).map_or(&[], Vec::as_slice)
    }
}

/// Repoint `include::` lines of `assemblies` whose targets no longer exist
/// at the file of the same (normalised) name. Returns the number of
/// assemblies rewritten.
pub fn fix_includes(
    project: &Project,
    assemblies: &[PathBuf],
    modules: &[PathBuf],
    chooser: &mut dyn AmbiguityResolver,
) -> Result<usize> {
    let index = FileIndex::new(assemblies, modules);
    let mut changed = 0;
    for assembly in assemblies {
        log::info!("Updating include directives for file: {}", project.display(assembly));
        let rewritten = rewrite_lines(assembly, |lines| {
            Ok(Some(
                lines
                    .iter()
                    .map(|line| repair_include(project, &index, assembly, line, &mut *chooser))
                    .collect(),
            ))
        })?;
        if rewritten {
            changed += 1;
        }
    }
    Ok(changed)
}

fn repair_include(
    project: &Project,
    index: &FileIndex,
    assembly: &Path,
    line: &str,
    chooser: &mut dyn AmbiguityResolver,
) -> String {
    if !line.trim_start().starts_with("include::") {
        return line.to_string();
    }
    let Directive::Include { target, options } = Directive::classify(line) else {
        log::warn!("Unparsable include: {}", line.trim());
        return line.to_string();
    };
    if target.contains('{') || resolve_relative(assembly, target).exists() {
        return line.to_string();
    }

    let candidates = index.candidates(project, target);
    let chosen = match candidates {
        [] => None,
        [only] => Some(only),
        several => {
            let shown: Vec<String> = several.iter().map(|p| project.display(p)).collect();
            chooser.choose(target, &shown).and_then(|i| several.get(i))
        }
    };
    let Some(new_target) = chosen.and_then(|file| project.include_path(assembly, file)) else {
        return line.to_string();
    };

    log::info!("Replacing: {target} with {new_target}");
    format!("include::{new_target}[{options}]")
}
