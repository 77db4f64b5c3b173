//! End-to-end runs over on-disk projects: split a legacy document, publish it
//! in a book, then maintain it.

use docweave_engine::update::{ContextOptions, add_contexts, fix_includes, fix_links};
use docweave_engine::{
    AttributeTable, FsModuleFactory, Layout, PresetResolver, Project, SkipResolver, SplitOptions,
    Splitter, find_orphans, split_files,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const LEGACY_GUIDE: &str = "\
// Type: assembly
// ModuleID: guide
= Guide

Intro paragraph.

// Type: concept
[id=\"intro\"]
== Introduction

Read xref:old-setup[the setup] first.

// Type: procedure
// ConvertedFromID: old-setup
[id=\"setup\"]
== Setting up

. Run the installer.
";

const BOOK: &str = "\
= Guide Book
:context: book

include::../assemblies/default/assembly_guide.adoc[]
";

fn write(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

/// A project holding the split legacy guide; the book is added on request
fn split_project() -> (TempDir, Project) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let legacy = write(&root, "legacy/guide.adoc", LEGACY_GUIDE);
    let project = Project::new(&root, Layout::default());

    let mut factory = FsModuleFactory::new(project.clone());
    let mut splitter = Splitter::new(&mut factory, &root);
    let generated = split_files(
        &legacy.to_string_lossy(),
        &mut AttributeTable::new(),
        &SplitOptions::default(),
        &mut splitter,
    )
    .unwrap();
    assert_eq!(
        generated.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
        vec!["assemblies/default/assembly_guide.adoc"]
    );

    (dir, project)
}

#[test]
fn split_guide_produces_assembly_and_modules() {
    let (_dir, project) = split_project();

    assert_eq!(
        project.all_modules().unwrap(),
        vec![
            project.root().join("modules/default/con_intro.adoc"),
            project.root().join("modules/default/proc_setup.adoc"),
        ]
    );
    let assembly =
        fs::read_to_string(project.root().join("assemblies/default/assembly_guide.adoc")).unwrap();
    assert!(assembly.contains("Intro paragraph."));
    assert!(assembly.contains("include::../../modules/default/con_intro.adoc[leveloffset=+1]"));
    assert!(assembly.contains("include::../../modules/default/proc_setup.adoc[leveloffset=+1]"));

    let setup = fs::read_to_string(project.root().join("modules/default/proc_setup.adoc")).unwrap();
    assert!(setup.contains("// ConvertedFromID: old-setup"));
    assert!(setup.contains("// ConvertedFromFile: legacy/guide.adoc"));
    assert!(setup.contains("[id=\"setup_{context}\"]\n= Setting up"));
}

#[test]
fn legacy_link_is_repaired_with_context_suffix() {
    let (_dir, project) = split_project();
    write(project.root(), "guide-book/master.adoc", BOOK);

    let modules = project.all_modules().unwrap();
    let changed = fix_links(&project, &mut AttributeTable::new(), &modules, &mut SkipResolver).unwrap();

    assert_eq!(changed, 1);
    let intro = fs::read_to_string(project.root().join("modules/default/con_intro.adoc")).unwrap();
    assert!(intro.contains("Read xref:setup_{context}[the setup] first."));
}

#[test]
fn orphans_disappear_once_a_book_includes_them() {
    let (_dir, project) = split_project();
    let attributes = AttributeTable::new();

    assert_eq!(find_orphans(&project, &attributes, None).unwrap().len(), 3);

    write(project.root(), "guide-book/master.adoc", BOOK);
    assert_eq!(find_orphans(&project, &attributes, None).unwrap(), Vec::<PathBuf>::new());
}

#[test]
fn moved_module_include_is_repaired() {
    let (_dir, project) = split_project();
    let old = project.root().join("modules/default/proc_setup.adoc");
    let new = project.root().join("modules/moved/proc_setup.adoc");
    fs::create_dir_all(new.parent().unwrap()).unwrap();
    fs::rename(&old, &new).unwrap();

    let changed = fix_includes(
        &project,
        &project.all_assemblies().unwrap(),
        &project.all_modules().unwrap(),
        &mut SkipResolver,
    )
    .unwrap();

    assert_eq!(changed, 1);
    let assembly =
        fs::read_to_string(project.root().join("assemblies/default/assembly_guide.adoc")).unwrap();
    assert!(assembly.contains("include::../../modules/moved/proc_setup.adoc[leveloffset=+1]"));
}

#[test]
fn generated_assembly_uses_parent_context_convention() {
    let (_dir, project) = split_project();
    let assembly = project.root().join("assemblies/default/assembly_guide.adoc");
    let before = fs::read_to_string(&assembly).unwrap();

    let changed = add_contexts(&assembly, true, &ContextOptions::default()).unwrap();

    assert!(!changed);
    assert_eq!(fs::read_to_string(&assembly).unwrap(), before);
}

#[test]
fn configured_preference_settles_ambiguous_link() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write(&root, "modules/x/con_shared.adoc", "[id=\"shared_{context}\"]\n= Shared\n");
    let user = write(&root, "modules/y/con_user.adoc", "See <<shared,the shared part>>.\n");
    write(
        &root,
        "assemblies/x/assembly_a.adoc",
        "= A\n:context: a\ninclude::../../modules/x/con_shared.adoc[]\n",
    );
    write(
        &root,
        "assemblies/x/assembly_b.adoc",
        "= B\n:context: b\ninclude::../../modules/x/con_shared.adoc[]\n",
    );
    write(
        &root,
        "book/master.adoc",
        "= Book\ninclude::../assemblies/x/assembly_a.adoc[]\ninclude::../assemblies/x/assembly_b.adoc[]\n",
    );
    let project = Project::new(&root, Layout::default());
    let preferred = BTreeMap::from([("shared".to_string(), "shared_b".to_string())]);
    let mut chooser = PresetResolver::new(preferred, SkipResolver);

    fix_links(&project, &mut AttributeTable::new(), &[user.clone()], &mut chooser).unwrap();

    assert_eq!(fs::read_to_string(&user).unwrap(), "See <<shared_b,the shared part>>.\n");
}
