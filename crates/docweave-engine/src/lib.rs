pub mod ambiguity;
pub mod attributes;
pub mod conditional;
pub mod directive;
pub mod error;
pub mod factory;
pub mod io;
pub mod links;
pub mod metadata;
pub mod parents;
pub mod project;
pub mod registry;
pub mod report;
pub mod resolve;
pub mod split;
pub mod update;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use ambiguity::{AmbiguityResolver, PresetResolver, SkipResolver};
pub use attributes::AttributeTable;
pub use conditional::{ConditionSet, filter_conditionals};
pub use directive::Directive;
pub use error::{DocError, Result};
pub use factory::{FsModuleFactory, ModuleFactory};
pub use links::LinkRepairer;
pub use metadata::{MetadataField, MetadataRecord};
pub use parents::ParentAssemblyMap;
pub use project::{FileKind, Layout, Project};
pub use registry::{AnchorEntry, AnchorIndexer, AnchorRegistry, BookId};
pub use report::{export_csv, find_orphans, index_single};
pub use resolve::{IncludeResolver, ResolvedLine, resolve_document};
pub use split::{SplitOptions, SplitOutcome, Splitter, split_files};
