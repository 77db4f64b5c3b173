use crate::attributes::AttributeTable;
use crate::directive::Directive;
use crate::error::Result;
use crate::io::{canonical_path, read_lines, resolve_relative};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// `.adoc` files named by the `include::` lines of `file` (one level deep),
/// with attribute references resolved. Paths are canonical.
pub fn scan_includes(file: &Path, attributes: &AttributeTable) -> Result<Vec<PathBuf>> {
    let mut included = Vec::new();
    for line in read_lines(file)? {
        if let Directive::Include { target, .. } = Directive::classify(&line) {
            let target = attributes.resolve(target);
            if target.ends_with(".adoc") {
                included.push(canonical_path(&resolve_relative(file, &target)));
            }
        }
    }
    Ok(included)
}

/// Every file reachable from `file` through includes. Missing targets are
/// reported and not followed.
pub fn scan_includes_recursive(
    file: &Path,
    attributes: &AttributeTable,
    seen: &mut BTreeSet<PathBuf>,
) -> Result<()> {
    for included in scan_includes(file, attributes)? {
        if !included.exists() {
            log::warn!(
                "While scanning {}: included file {} does not exist",
                file.display(),
                included.display()
            );
            continue;
        }
        if seen.insert(included.clone()) {
            scan_includes_recursive(&included, attributes, seen)?;
        }
    }
    Ok(())
}

/// Which assemblies include which files, one level of inclusion only
#[derive(Debug, Clone, Default)]
pub struct ParentAssemblyMap {
    parents: BTreeMap<PathBuf, Vec<PathBuf>>,
    includes: BTreeMap<PathBuf, Vec<PathBuf>>,
}

impl ParentAssemblyMap {
    pub fn build(assemblies: &[PathBuf], attributes: &AttributeTable) -> Result<Self> {
        let mut map = Self::default();
        for assembly in assemblies {
            let key = canonical_path(assembly);
            let included = scan_includes(assembly, attributes)?;
            for file in &included {
                let parents = map.parents.entry(file.clone()).or_default();
                if !parents.contains(&key) {
                    parents.push(key.clone());
                }
            }
            map.includes.insert(key, included);
        }
        Ok(map)
    }

    /// Assemblies including `file` directly
    pub fn parents_of(&self, file: &Path) -> &[PathBuf] {
        self.parents
            .get(&canonical_path(file))
            .map_or(&[], Vec::as_slice)
    }

    /// Files included directly by `assembly`
    pub fn includes_of(&self, assembly: &Path) -> &[PathBuf] {
        self.includes
            .get(&canonical_path(assembly))
            .map_or(&[], Vec::as_slice)
    }

    /// Every included file with its parents
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &[PathBuf])> {
        self.parents
            .iter()
            .map(|(file, parents)| (file.as_path(), parents.as_slice()))
    }

    /// Whether some assembly includes both files
    pub fn share_parent(&self, a: &Path, b: &Path) -> bool {
        let theirs = self.parents_of(b);
        self.parents_of(a).iter().any(|parent| theirs.contains(parent))
    }
}
