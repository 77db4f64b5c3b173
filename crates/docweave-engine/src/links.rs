//! # Link Repair
//!
//! Rewrites `xref:ID[text]`, `<<ID,text>>` and `link:{attr}#ID[text]`
//! references so they point at anchors that exist in the registry.
//!
//! Lookup order for an ID (after dropping a `_{context}` suffix): exact
//! match, legacy ID, then root ID, where several candidates are put to the
//! [`AmbiguityResolver`]. An ID that still fails is retried without its last
//! `_segment`. Unresolvable references are left as written.
//!
//! A resolved target that was defined as `root_{context}` is written back
//! in that form when the referencing file and the anchor's file are
//! included by a common assembly.

use crate::ambiguity::AmbiguityResolver;
use crate::error::Result;
use crate::io::rewrite_lines;
use crate::parents::ParentAssemblyMap;
use crate::registry::AnchorRegistry;
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::OnceLock;

struct LinkPatterns {
    angles: Regex,
    xref: Regex,
    link: Regex,
}

fn patterns() -> &'static LinkPatterns {
    static PATTERNS: OnceLock<LinkPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| LinkPatterns {
        angles: Regex::new(r"<<([^,>]+),?([^>]*)>>").expect("Invalid cross-reference regex"),
        xref: Regex::new(r"xref:([\w\-]+(?:_\{context\})?)\[([^\]]*)\]").expect("Invalid xref regex"),
        link: Regex::new(r"(link|\{link-prefix\}):(\{[\w\-]+\})#([^\[]+)\[([^\]]*)\]")
            .expect("Invalid link regex"),
    })
}

enum Lookup {
    Found(String),
    Skipped,
    Missing,
}

pub struct LinkRepairer<'a> {
    registry: &'a AnchorRegistry,
    parents: &'a ParentAssemblyMap,
    chooser: &'a mut dyn AmbiguityResolver,
}

impl<'a> LinkRepairer<'a> {
    pub fn new(
        registry: &'a AnchorRegistry,
        parents: &'a ParentAssemblyMap,
        chooser: &'a mut dyn AmbiguityResolver,
    ) -> Self {
        Self {
            registry,
            parents,
            chooser,
        }
    }

    /// Rewrite the links of one file in place. Returns whether it changed.
    pub fn repair_file(&mut self, file: &Path) -> Result<bool> {
        log::info!("Updating links for file: {}", file.display());
        rewrite_lines(file, |lines| {
            Ok(Some(lines.iter().map(|line| self.repair_line(line, file)).collect()))
        })
    }

    pub fn repair_line(&mut self, line: &str, file: &Path) -> String {
        let p = patterns();
        if !line.contains("<<") && !line.contains("xref:") && !line.contains('#') {
            return line.to_string();
        }

        let line = p.angles.replace_all(line, |caps: &Captures| {
            let id = self.repair_id(caps[1].trim(), file);
            match &caps[2] {
                "" => format!("<<{id}>>"),
                text => format!("<<{id},{text}>>"),
            }
        });
        let line = p.xref.replace_all(&line, |caps: &Captures| {
            let id = self.repair_id(&caps[1], file);
            format!("xref:{id}[{}]", &caps[2])
        });
        let line = p.link.replace_all(&line, |caps: &Captures| {
            let id = self.repair_id(&caps[3], file);
            format!("{}:{}#{id}[{}]", &caps[1], &caps[2], &caps[4])
        });
        line.into_owned()
    }

    /// The ID a reference to `id` from `file` should use
    pub fn repair_id(&mut self, id: &str, file: &Path) -> String {
        let plain = id.strip_suffix("_{context}").unwrap_or(id);

        let lookup = match self.lookup(plain) {
            Lookup::Missing => match plain.rsplit_once('_') {
                Some((root, _)) => self.lookup(root),
                None => Lookup::Missing,
            },
            found => found,
        };

        let target = match lookup {
            Lookup::Found(target) => target,
            Lookup::Skipped => {
                log::warn!("Ambiguous link to {id} left unchanged in {}", file.display());
                return id.to_string();
            }
            Lookup::Missing => {
                log::warn!("link to unknown ID: {id} in {}", file.display());
                return id.to_string();
            }
        };

        match self.shared_context_root(file, &target) {
            Some(root) => format!("{root}_{{context}}"),
            None => target,
        }
    }

    fn lookup(&mut self, id: &str) -> Lookup {
        if self.registry.contains(id) {
            return Lookup::Found(id.to_string());
        }
        if let Some(current) = self.registry.current_id(id) {
            return Lookup::Found(current.to_string());
        }
        match self.registry.ids_with_root(id) {
            Some([only]) => Lookup::Found(only.clone()),
            Some(candidates) => match self.chooser.choose(id, candidates) {
                Some(index) if index < candidates.len() => Lookup::Found(candidates[index].clone()),
                _ => Lookup::Skipped,
            },
            None => Lookup::Missing,
        }
    }

    /// Root of `target` when it was defined as `root_{context}` in a file
    /// that shares a parent assembly with `file`
    fn shared_context_root(&self, file: &Path, target: &str) -> Option<&'a str> {
        let registry = self.registry;
        registry
            .get(target)?
            .values()
            .find(|entry| entry.context.is_some() && self.parents.share_parent(file, &entry.file))
            .map(|entry| entry.root.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ambiguity::SkipResolver;
    use crate::attributes::AttributeTable;
    use crate::project::{Layout, Project};
    use crate::registry::AnchorIndexer;
    use crate::tests::{ScriptedResolver, create_test_file, create_test_project};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        root: std::path::PathBuf,
        registry: AnchorRegistry,
        parents: ParentAssemblyMap,
    }

    /// Book "Setup" defines `setup_{context}` under two contexts, and
    /// `intro`/`old-intro` as a migrated anchor
    fn fixture() -> Fixture {
        let dir = create_test_project();
        create_test_file(&dir, "modules/shared/con_setup.adoc", "[id=\"setup_{context}\"]\n= Setup\n");
        create_test_file(
            &dir,
            "modules/shared/con_intro.adoc",
            "// ConvertedFromID: old-intro\n[id=\"intro\"]\n= Intro\n",
        );
        create_test_file(
            &dir,
            "assemblies/a/assembly_a.adoc",
            "= A\n:context: a\ninclude::../../modules/shared/con_setup.adoc[]\ninclude::../../modules/shared/con_intro.adoc[]\n",
        );
        create_test_file(
            &dir,
            "assemblies/b/assembly_b.adoc",
            "= B\n:context: b\ninclude::../../modules/shared/con_setup.adoc[]\n",
        );
        create_test_file(
            &dir,
            "book/master.adoc",
            "= Setup Book\n\ninclude::../assemblies/a/assembly_a.adoc[]\ninclude::../assemblies/b/assembly_b.adoc[]\n",
        );
        create_test_file(&dir, "modules/other/con_user.adoc", "Links live here.\n");

        index_project(
            dir,
            &["book/master.adoc"],
            &["assemblies/a/assembly_a.adoc", "assemblies/b/assembly_b.adoc"],
        )
    }

    /// Index `books` in order, then map the parents of `assemblies` and
    /// `books` together
    fn index_project(dir: TempDir, books: &[&str], assemblies: &[&str]) -> Fixture {
        let root = dir.path().canonicalize().unwrap();
        let project = Project::new(&root, Layout::default());
        let mut registry = AnchorRegistry::new();
        let mut attributes = AttributeTable::new();
        {
            let mut indexer = AnchorIndexer::new(&mut registry, &mut attributes, &project);
            for book in books {
                indexer.index_book(&root.join(book)).unwrap();
            }
        }
        let parent_files: Vec<_> = assemblies
            .iter()
            .chain(books)
            .map(|file| root.join(file))
            .collect();
        let parents = ParentAssemblyMap::build(&parent_files, &attributes).unwrap();

        Fixture {
            _dir: dir,
            root,
            registry,
            parents,
        }
    }

    #[test]
    fn test_anchor_resolution_across_two_books() {
        let dir = create_test_project();
        create_test_file(&dir, "modules/guide/con_intro.adoc", "[id=\"intro_{context}\"]\n= Intro\n");
        create_test_file(&dir, "modules/guide/con_next.adoc", "See xref:intro[Intro].\n");
        create_test_file(&dir, "modules/ref/ref_options.adoc", "See xref:intro[Intro].\n");
        create_test_file(
            &dir,
            "assemblies/guide/assembly_guide.adoc",
            "= Guide\n:context: guide\ninclude::../../modules/guide/con_intro.adoc[]\ninclude::../../modules/guide/con_next.adoc[]\n",
        );
        create_test_file(
            &dir,
            "assemblies/ref/assembly_ref.adoc",
            "= Ref\n:context: ref\ninclude::../../modules/ref/ref_options.adoc[]\n",
        );
        create_test_file(&dir, "guide/master.adoc", "= Guide\ninclude::../assemblies/guide/assembly_guide.adoc[]\n");
        create_test_file(&dir, "ref/master.adoc", "= Ref\ninclude::../assemblies/ref/assembly_ref.adoc[]\n");
        let f = index_project(
            dir,
            &["guide/master.adoc", "ref/master.adoc"],
            &["assemblies/guide/assembly_guide.adoc", "assemblies/ref/assembly_ref.adoc"],
        );
        let mut chooser = ScriptedResolver::default();
        let mut repairer = LinkRepairer::new(&f.registry, &f.parents, &mut chooser);

        assert_eq!(
            repairer.repair_line("See xref:intro[Intro].", &f.root.join("modules/guide/con_next.adoc")),
            "See xref:intro_{context}[Intro]."
        );
        assert_eq!(
            repairer.repair_line("See xref:intro[Intro].", &f.root.join("modules/ref/ref_options.adoc")),
            "See xref:intro_guide[Intro]."
        );
        assert!(chooser.asked.is_empty());
    }

    #[test]
    fn test_context_value_with_underscore_keeps_whole_root() {
        let dir = create_test_project();
        create_test_file(&dir, "modules/g/con_intro.adoc", "[id=\"intro_{context}\"]\n= Intro\n");
        create_test_file(&dir, "modules/g/con_user.adoc", "See xref:intro[Intro].\n");
        create_test_file(
            &dir,
            "assemblies/g/assembly_g.adoc",
            "= G\n:context: my_guide\ninclude::../../modules/g/con_intro.adoc[]\ninclude::../../modules/g/con_user.adoc[]\n",
        );
        create_test_file(&dir, "book/master.adoc", "= Book\ninclude::../assemblies/g/assembly_g.adoc[]\n");
        let f = index_project(dir, &["book/master.adoc"], &["assemblies/g/assembly_g.adoc"]);
        let mut chooser = SkipResolver;
        let mut repairer = LinkRepairer::new(&f.registry, &f.parents, &mut chooser);

        assert_eq!(
            repairer.repair_line("xref:intro[Intro]", &f.root.join("modules/g/con_user.adoc")),
            "xref:intro_{context}[Intro]"
        );
    }

    #[test]
    fn test_plain_id_with_underscore_is_not_given_a_context() {
        let dir = create_test_project();
        create_test_file(&dir, "modules/g/con_install.adoc", "[id=\"install_guide\"]\n= Install\n");
        create_test_file(&dir, "modules/g/con_user.adoc", "See xref:install_guide[Install].\n");
        create_test_file(
            &dir,
            "assemblies/g/assembly_g.adoc",
            "= G\n:context: g\ninclude::../../modules/g/con_install.adoc[]\ninclude::../../modules/g/con_user.adoc[]\n",
        );
        create_test_file(&dir, "book/master.adoc", "= Book\ninclude::../assemblies/g/assembly_g.adoc[]\n");
        let f = index_project(dir, &["book/master.adoc"], &["assemblies/g/assembly_g.adoc"]);
        let mut chooser = SkipResolver;
        let mut repairer = LinkRepairer::new(&f.registry, &f.parents, &mut chooser);

        assert_eq!(
            repairer.repair_line("xref:install_guide[Install]", &f.root.join("modules/g/con_user.adoc")),
            "xref:install_guide[Install]"
        );
    }

    #[test]
    fn test_exact_and_legacy_ids() {
        let f = fixture();
        let mut chooser = SkipResolver;
        let mut repairer = LinkRepairer::new(&f.registry, &f.parents, &mut chooser);
        let file = f.root.join("modules/other/con_user.adoc");

        assert_eq!(repairer.repair_line("See xref:intro[Intro].", &file), "See xref:intro[Intro].");
        assert_eq!(repairer.repair_line("See xref:old-intro[].", &file), "See xref:intro[].");
        assert_eq!(repairer.repair_line("See <<old-intro,Intro>>.", &file), "See <<intro,Intro>>.");
        assert_eq!(
            repairer.repair_line("See link:{guide-url}#old-intro[Intro].", &file),
            "See link:{guide-url}#intro[Intro]."
        );
    }

    #[test]
    fn test_ambiguous_root_without_choice_is_left_unchanged() {
        let f = fixture();
        let mut chooser = SkipResolver;
        let mut repairer = LinkRepairer::new(&f.registry, &f.parents, &mut chooser);
        let file = f.root.join("modules/other/con_user.adoc");

        assert_eq!(repairer.repair_line("xref:setup[Setup]", &file), "xref:setup[Setup]");
    }

    #[test]
    fn test_ambiguous_root_uses_chosen_candidate() {
        let f = fixture();
        let mut chooser = ScriptedResolver::new([Some(1)]);
        let mut repairer = LinkRepairer::new(&f.registry, &f.parents, &mut chooser);
        let file = f.root.join("modules/other/con_user.adoc");

        assert_eq!(repairer.repair_line("<<setup>>", &file), "<<setup_b>>");
        assert_eq!(chooser.asked, vec![vec!["setup_a".to_string(), "setup_b".to_string()]]);
    }

    #[test]
    fn test_wrong_context_suffix_is_retried_by_root() {
        let f = fixture();
        let mut chooser = ScriptedResolver::new([Some(0)]);
        let mut repairer = LinkRepairer::new(&f.registry, &f.parents, &mut chooser);
        let file = f.root.join("modules/other/con_user.adoc");

        assert_eq!(repairer.repair_id("setup_c", &file), "setup_a");
    }

    #[test]
    fn test_context_suffix_reattached_when_files_share_an_assembly() {
        let f = fixture();
        let mut chooser = ScriptedResolver::new([Some(0)]);
        let mut repairer = LinkRepairer::new(&f.registry, &f.parents, &mut chooser);
        let sibling = f.root.join("modules/shared/con_intro.adoc");

        assert_eq!(
            repairer.repair_line("xref:setup_{context}[Setup]", &sibling),
            "xref:setup_{context}[Setup]"
        );
    }

    #[test]
    fn test_unknown_id_is_left_unchanged() {
        let f = fixture();
        let mut chooser = SkipResolver;
        let mut repairer = LinkRepairer::new(&f.registry, &f.parents, &mut chooser);
        let file = f.root.join("modules/other/con_user.adoc");

        assert_eq!(repairer.repair_line("xref:nowhere[]", &file), "xref:nowhere[]");
    }

    #[test]
    fn test_repair_file_rewrites_in_place() {
        let f = fixture();
        let mut chooser = SkipResolver;
        let file = f.root.join("modules/other/con_user.adoc");
        std::fs::write(&file, "See xref:old-intro[Intro].\nUnrelated # line.\n").unwrap();

        let changed = LinkRepairer::new(&f.registry, &f.parents, &mut chooser)
            .repair_file(&file)
            .unwrap();

        assert!(changed);
        assert_eq!(
            std::fs::read_to_string(&file).unwrap(),
            "See xref:intro[Intro].\nUnrelated # line.\n"
        );
    }
}
