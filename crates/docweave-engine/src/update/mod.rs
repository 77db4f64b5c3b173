//! In-place maintenance of existing assemblies and modules.
//!
//! Every operation rewrites whole files through [`crate::io::rewrite_lines`]
//! and only touches files whose content actually changes.

pub mod assembly;
pub mod contexts;
pub mod ids;
pub mod includes;
pub mod metadata;

pub use assembly::{add_include_to_assembly, create_module};
pub use contexts::{ContextOptions, add_contexts, context_hash};
pub use ids::{default_id_prefix, generate_ids, title_to_id};
pub use includes::{fix_includes, normalize_file_name};
pub use metadata::{update_metadata, update_parent_assemblies};

use crate::ambiguity::AmbiguityResolver;
use crate::attributes::AttributeTable;
use crate::error::Result;
use crate::links::LinkRepairer;
use crate::parents::ParentAssemblyMap;
use crate::project::Project;
use crate::registry::{AnchorIndexer, AnchorRegistry};
use std::path::PathBuf;

/// Index every book of the project, then repair the links of `files`.
/// Returns the number of files rewritten.
pub fn fix_links(
    project: &Project,
    attributes: &mut AttributeTable,
    files: &[PathBuf],
    chooser: &mut dyn AmbiguityResolver,
) -> Result<usize> {
    let books = project.book_files()?;
    let mut registry = AnchorRegistry::new();
    {
        let mut indexer = AnchorIndexer::new(&mut registry, attributes, project);
        for book in &books {
            indexer.index_book(book)?;
        }
    }
    log::debug!("Indexed {} anchors from {} books", registry.len(), books.len());

    let mut assemblies = project.all_assemblies()?;
    assemblies.extend(books);
    let parents = ParentAssemblyMap::build(&assemblies, attributes)?;

    let mut repairer = LinkRepairer::new(&registry, &parents, chooser);
    let mut changed = 0;
    for file in files {
        if repairer.repair_file(file)? {
            changed += 1;
        }
    }
    Ok(changed)
}
