use crate::error::{DocError, Result};
use relative_path::{RelativePath, RelativePathBuf};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory roles and file-name prefixes of a documentation project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub assemblies_dir: String,
    pub modules_dir: String,
    pub images_dir: String,
    pub assembly_prefix: String,
    pub procedure_prefix: String,
    pub concept_prefix: String,
    pub reference_prefix: String,
    pub book_file: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            assemblies_dir: "assemblies".to_string(),
            modules_dir: "modules".to_string(),
            images_dir: "images".to_string(),
            assembly_prefix: "assembly_".to_string(),
            procedure_prefix: "proc_".to_string(),
            concept_prefix: "con_".to_string(),
            reference_prefix: "ref_".to_string(),
            book_file: "master.adoc".to_string(),
        }
    }
}

/// What a file is, judged from its name prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Assembly,
    Procedure,
    Concept,
    Reference,
    /// No recognised prefix
    Module,
}

impl FileKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.to_lowercase().as_str() {
            "assembly" => Some(FileKind::Assembly),
            "procedure" => Some(FileKind::Procedure),
            "concept" => Some(FileKind::Concept),
            "reference" => Some(FileKind::Reference),
            "module" => Some(FileKind::Module),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Assembly => "assembly",
            FileKind::Procedure => "procedure",
            FileKind::Concept => "concept",
            FileKind::Reference => "reference",
            FileKind::Module => "module",
        }
    }

    pub fn is_module(self) -> bool {
        self != FileKind::Assembly
    }
}

impl Layout {
    /// File-name prefix for a kind; plain modules have none
    pub fn prefix(&self, kind: FileKind) -> &str {
        match kind {
            FileKind::Assembly => &self.assembly_prefix,
            FileKind::Procedure => &self.procedure_prefix,
            FileKind::Concept => &self.concept_prefix,
            FileKind::Reference => &self.reference_prefix,
            FileKind::Module => "",
        }
    }

    pub fn kind_of(&self, file_name: &str) -> FileKind {
        [
            FileKind::Assembly,
            FileKind::Procedure,
            FileKind::Concept,
            FileKind::Reference,
        ]
        .into_iter()
        .find(|kind| file_name.starts_with(self.prefix(*kind)))
        .unwrap_or(FileKind::Module)
    }

    /// File stem with the kind prefix removed
    pub fn module_id_of(&self, file_name: &str) -> String {
        let stem = file_name.strip_suffix(".adoc").unwrap_or(file_name);
        let prefix = self.prefix(self.kind_of(file_name));
        stem.strip_prefix(prefix).unwrap_or(stem).to_string()
    }

    /// Directory that holds files of `kind`
    pub fn dir_for(&self, kind: FileKind) -> &str {
        match kind {
            FileKind::Assembly => &self.assemblies_dir,
            _ => &self.modules_dir,
        }
    }
}

/// A documentation project rooted at a directory
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    layout: Layout,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>, layout: Layout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn path(&self, relative: &RelativePath) -> PathBuf {
        relative.to_path(&self.root)
    }

    /// Project-relative form of `path`, if it lies inside the project
    pub fn relative(&self, path: &Path) -> Option<RelativePathBuf> {
        let inside = if path.is_absolute() {
            path.strip_prefix(&self.root).ok()?
        } else {
            path
        };
        RelativePathBuf::from_path(inside).ok()
    }

    /// Path of `target` as written in an include directive of `from_file`
    pub fn include_path(&self, from_file: &Path, target: &Path) -> Option<RelativePathBuf> {
        let from = self.relative(from_file)?;
        let target = self.relative(target)?;
        let dir = from.parent().unwrap_or_else(|| RelativePath::new(""));
        Some(dir.relative(target))
    }

    /// Display form: project-relative when possible
    pub fn display(&self, path: &Path) -> String {
        match self.relative(path) {
            Some(relative) => relative.to_string(),
            None => path.display().to_string(),
        }
    }

    pub fn kind_of(&self, path: &Path) -> FileKind {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        self.layout.kind_of(&name)
    }

    pub fn module_id_of(&self, path: &Path) -> String {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        self.layout.module_id_of(&name)
    }

    /// Category of a file below the assemblies or modules directory
    pub fn category_of(&self, path: &Path) -> Option<String> {
        let relative = self.relative(path)?;
        let parent = relative.parent()?.as_str();
        let (first, category) = parent.split_once('/').unwrap_or((parent, ""));
        if first != self.layout.assemblies_dir && first != self.layout.modules_dir {
            return None;
        }
        Some(category.to_string())
    }

    /// Every category directory below `base` (relative, `/`-separated),
    /// plus the empty category for files directly inside it
    pub fn categories(&self, base: &str) -> Result<BTreeSet<String>> {
        let mut categories = BTreeSet::from([String::new()]);
        let dir = self.root.join(base);
        if dir.is_dir() {
            collect_categories(&dir, &RelativePathBuf::new(), &mut categories)?;
        }
        Ok(categories)
    }

    /// Assemblies and modules in the given categories, sorted
    pub fn categorised_files(
        &self,
        categories: &BTreeSet<String>,
    ) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
        let assemblies = self.files_in(&self.layout.assemblies_dir, categories, |k| {
            k == FileKind::Assembly
        })?;
        let modules = self.files_in(&self.layout.modules_dir, categories, FileKind::is_module)?;
        Ok((assemblies, modules))
    }

    /// Every category known under either the assemblies or the modules directory
    pub fn all_categories(&self) -> Result<BTreeSet<String>> {
        let mut categories = self.categories(&self.layout.modules_dir)?;
        categories.extend(self.categories(&self.layout.assemblies_dir)?);
        Ok(categories)
    }

    pub fn all_assemblies(&self) -> Result<Vec<PathBuf>> {
        let categories = self.categories(&self.layout.assemblies_dir)?;
        self.files_in(&self.layout.assemblies_dir, &categories, |k| k == FileKind::Assembly)
    }

    pub fn all_modules(&self) -> Result<Vec<PathBuf>> {
        let categories = self.categories(&self.layout.modules_dir)?;
        self.files_in(&self.layout.modules_dir, &categories, FileKind::is_module)
    }

    fn files_in<F>(&self, base: &str, categories: &BTreeSet<String>, keep: F) -> Result<Vec<PathBuf>>
    where
        F: Fn(FileKind) -> bool,
    {
        let mut files = Vec::new();
        for category in categories {
            let dir = RelativePath::new(base).join(category).to_path(&self.root);
            if !dir.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if !path.is_file() {
                    continue;
                }
                let is_adoc = path.extension().is_some_and(|ext| ext == "adoc");
                if is_adoc && keep(self.kind_of(&path)) {
                    files.push(path);
                }
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    /// Book entry files: every directory below the root that holds the
    /// configured book file
    pub fn book_files(&self) -> Result<Vec<PathBuf>> {
        let mut books = Vec::new();
        collect_books(&self.root, &self.layout.book_file, &mut books)?;
        books.sort();
        Ok(books)
    }

    /// Book file of a single book directory
    pub fn book_file_in(&self, book_dir: &Path) -> Result<PathBuf> {
        let book = book_dir.join(&self.layout.book_file);
        if book.exists() {
            Ok(book)
        } else {
            Err(DocError::NotFound(book))
        }
    }
}

fn collect_categories(
    dir: &Path,
    prefix: &RelativePath,
    categories: &mut BTreeSet<String>,
) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let category = prefix.join(&name);
            categories.insert(category.to_string());
            collect_categories(&path, &category, categories)?;
        }
    }
    Ok(())
}

fn collect_books(dir: &Path, book_file: &str, books: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_dir() || path.is_symlink() {
            continue;
        }
        let candidate = path.join(book_file);
        if candidate.is_file() {
            books.push(candidate);
        }
        collect_books(&path, book_file, books)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{create_test_file, create_test_project};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("assembly_install.adoc", FileKind::Assembly, "install")]
    #[case("proc_configure.adoc", FileKind::Procedure, "configure")]
    #[case("con_overview.adoc", FileKind::Concept, "overview")]
    #[case("ref_options.adoc", FileKind::Reference, "options")]
    #[case("snippet.adoc", FileKind::Module, "snippet")]
    fn test_kind_and_module_id(
        #[case] name: &str,
        #[case] kind: FileKind,
        #[case] module_id: &str,
    ) {
        let layout = Layout::default();
        assert_eq!(layout.kind_of(name), kind);
        assert_eq!(layout.module_id_of(name), module_id);
    }

    #[test]
    fn test_categories_include_nested_and_empty() {
        let project_dir = create_test_project();
        create_test_file(&project_dir, "modules/install/proc_a.adoc", "");
        create_test_file(&project_dir, "modules/install/linux/proc_b.adoc", "");
        let project = Project::new(project_dir.path(), Layout::default());

        let categories = project.categories("modules").unwrap();

        assert_eq!(
            categories.into_iter().collect::<Vec<_>>(),
            vec!["", "install", "install/linux"]
        );
    }

    #[test]
    fn test_categorised_files_filter_by_kind() {
        let project_dir = create_test_project();
        create_test_file(&project_dir, "assemblies/install/assembly_a.adoc", "");
        create_test_file(&project_dir, "assemblies/install/notes.txt", "");
        create_test_file(&project_dir, "modules/install/proc_b.adoc", "");
        create_test_file(&project_dir, "modules/other/con_c.adoc", "");
        let project = Project::new(project_dir.path(), Layout::default());

        let categories = BTreeSet::from(["install".to_string()]);
        let (assemblies, modules) = project.categorised_files(&categories).unwrap();

        assert_eq!(assemblies, vec![project_dir.path().join("assemblies/install/assembly_a.adoc")]);
        assert_eq!(modules, vec![project_dir.path().join("modules/install/proc_b.adoc")]);
    }

    #[test]
    fn test_book_files_are_found_in_subdirectories() {
        let project_dir = create_test_project();
        create_test_file(&project_dir, "guide/master.adoc", "= Guide");
        create_test_file(&project_dir, "books/ref/master.adoc", "= Ref");
        create_test_file(&project_dir, "master.adoc", "= Not a book directory");
        let project = Project::new(project_dir.path(), Layout::default());

        let books = project.book_files().unwrap();

        assert_eq!(
            books,
            vec![
                project_dir.path().join("books/ref/master.adoc"),
                project_dir.path().join("guide/master.adoc"),
            ]
        );
    }

    #[test]
    fn test_include_path_between_project_files() {
        let project = Project::new("/docs", Layout::default());

        assert_eq!(
            project.include_path(
                Path::new("/docs/assemblies/install/assembly_a.adoc"),
                Path::new("/docs/modules/install/proc_b.adoc"),
            ),
            Some(RelativePathBuf::from("../../modules/install/proc_b.adoc"))
        );
        assert_eq!(
            project.include_path(Path::new("/elsewhere/a.adoc"), Path::new("/docs/b.adoc")),
            None
        );
    }

    #[test]
    fn test_category_of() {
        let project_dir = create_test_project();
        let project = Project::new(project_dir.path(), Layout::default());

        assert_eq!(
            project.category_of(&project_dir.path().join("modules/install/linux/proc_b.adoc")),
            Some("install/linux".to_string())
        );
        assert_eq!(project.category_of(&project_dir.path().join("guide/master.adoc")), None);
    }
}
