//! # Anchor Registry
//!
//! Indexes every anchor ID reachable from one or more books. Each book is
//! walked depth-first through its `include::` directives; nothing is
//! flattened and tag or condition markers are ignored, so every anchor in
//! every included file is recorded.
//!
//! An ID line opens a pending anchor. A following heading commits it with
//! its title; ordinary content commits it without one. IDs written as
//! `name_{context}` are stored under the current value of the `context`
//! attribute and also listed under their root (`name`).

use crate::attributes::AttributeTable;
use crate::directive::Directive;
use crate::error::{DocError, Result};
use crate::io::{canonical_path, read_lines, resolve_relative};
use crate::metadata::{MetadataField, MetadataRecord};
use crate::project::{FileKind, Project};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Slug of a book title, used to tell books apart
pub type BookId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorEntry {
    /// Canonical path of the file defining the anchor
    pub file: PathBuf,
    pub title: Option<String>,
    /// Value of `{context}` when the ID was parameterised
    pub context: Option<String>,
    pub legacy_id: Option<String>,
    /// ID with the `_{context}` suffix removed
    pub root: String,
}

#[derive(Debug, Clone, Default)]
pub struct AnchorRegistry {
    anchors: BTreeMap<String, BTreeMap<BookId, AnchorEntry>>,
    legacy_ids: BTreeMap<String, String>,
    roots: BTreeMap<String, Vec<String>>,
    records: Vec<MetadataRecord>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.anchors.contains_key(id)
    }

    /// Entries for `id`, one per book that defines it
    pub fn get(&self, id: &str) -> Option<&BTreeMap<BookId, AnchorEntry>> {
        self.anchors.get(id)
    }

    pub fn entry(&self, id: &str, book: &str) -> Option<&AnchorEntry> {
        self.anchors.get(id)?.get(book)
    }

    /// Current ID for a pre-migration ID
    pub fn current_id(&self, legacy_id: &str) -> Option<&str> {
        self.legacy_ids.get(legacy_id).map(String::as_str)
    }

    /// Full IDs sharing `root`, first seen first
    pub fn ids_with_root(&self, root: &str) -> Option<&[String]> {
        self.roots.get(root).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// One record per titled anchor, in scan order
    pub fn records(&self) -> &[MetadataRecord] {
        &self.records
    }

    /// Returns false, keeping the earlier entry, when the book already
    /// defines `id`
    fn insert(&mut self, id: &str, book: &str, entry: AnchorEntry) -> bool {
        let books = self.anchors.entry(id.to_string()).or_default();
        if books.contains_key(book) {
            log::warn!("Anchor ID: {id} appears more than once in book: {book}");
            return false;
        }
        if let Some(legacy) = &entry.legacy_id {
            self.legacy_ids.insert(legacy.clone(), id.to_string());
        }
        if entry.root != id {
            let ids = self.roots.entry(entry.root.clone()).or_default();
            if !ids.iter().any(|known| known == id) {
                ids.push(id.to_string());
            }
        }
        books.insert(book.to_string(), entry);
        true
    }
}

/// Book title to identifier: lower case, spaces and dashes as underscores
pub fn book_slug(title: &str) -> BookId {
    title.trim().to_lowercase().replace([' ', '-'], "_")
}

/// An ID line waiting for its heading
struct PendingAnchor {
    id: String,
    root: String,
    context: Option<String>,
}

pub struct AnchorIndexer<'a> {
    registry: &'a mut AnchorRegistry,
    attributes: &'a mut AttributeTable,
    project: &'a Project,
    chain: Vec<PathBuf>,
}

impl<'a> AnchorIndexer<'a> {
    pub fn new(
        registry: &'a mut AnchorRegistry,
        attributes: &'a mut AttributeTable,
        project: &'a Project,
    ) -> Self {
        Self {
            registry,
            attributes,
            project,
            chain: Vec::new(),
        }
    }

    /// Index a book (or a single assembly) under the slug of its title.
    /// Attributes defined by earlier books are dropped first.
    pub fn index_book(&mut self, book_file: &Path) -> Result<BookId> {
        self.attributes.reset();
        let title = self.scan_title(book_file)?;
        let book = book_slug(&title);
        log::info!("Title: {title}");

        self.index_file(book_file, &book)?;
        Ok(book)
    }

    fn scan_title(&self, file: &Path) -> Result<String> {
        read_lines(file)?
            .iter()
            .find_map(|line| match Directive::classify(line) {
                Directive::Heading { level: 1, title } => Some(self.attributes.resolve(title)),
                _ => None,
            })
            .ok_or_else(|| DocError::MissingBookTitle(file.to_path_buf()))
    }

    fn index_file(&mut self, file: &Path, book: &str) -> Result<()> {
        let canonical = canonical_path(file);
        if self.chain.contains(&canonical) {
            return Err(DocError::IncludeCycle(file.to_path_buf()));
        }
        self.chain.push(canonical.clone());

        let mut pending: Option<PendingAnchor> = None;
        let mut metadata = MetadataRecord::new();

        for line in read_lines(file)? {
            let directive = Directive::classify(&line);
            match directive {
                Directive::Blank
                | Directive::IfDef { .. }
                | Directive::IfNDef { .. }
                | Directive::IfEval { .. }
                | Directive::EndIf { .. }
                | Directive::TagStart(_)
                | Directive::TagEnd(_) => {}
                Directive::Attribute { .. } | Directive::AttributeUnset { .. } => {
                    self.attributes.apply(&directive);
                }
                Directive::Metadata { key, value } => {
                    if let Ok(field) = key.parse::<MetadataField>() {
                        metadata.set(field, value.trim());
                    }
                }
                Directive::Id(raw) => pending = Some(self.pending_anchor(raw, file)?),
                Directive::Heading { title, .. } => {
                    if let Some(anchor) = pending.take() {
                        let title = self.attributes.resolve(title);
                        self.commit(anchor, Some(title), &metadata, &canonical, book);
                    }
                    metadata = MetadataRecord::new();
                }
                Directive::Include { target, .. } => {
                    let target = self.attributes.resolve(target);
                    let path = resolve_relative(file, &target);
                    if !path.exists() {
                        return Err(DocError::IncludeNotFound {
                            path,
                            included_from: file.to_path_buf(),
                        });
                    }
                    self.index_file(&path, book)?;
                    pending = None;
                    metadata = MetadataRecord::new();
                }
                Directive::Text => {
                    if let Some(anchor) = pending.take() {
                        self.commit(anchor, None, &metadata, &canonical, book);
                    }
                    metadata = MetadataRecord::new();
                }
            }
        }

        self.chain.pop();
        Ok(())
    }

    fn pending_anchor(&self, raw: &str, file: &Path) -> Result<PendingAnchor> {
        if !raw.contains("{context}") {
            return Ok(PendingAnchor {
                id: raw.to_string(),
                root: raw.to_string(),
                context: None,
            });
        }
        let context = self
            .attributes
            .get("context")
            .ok_or_else(|| DocError::UndefinedContext {
                file: file.to_path_buf(),
                id: raw.to_string(),
            })?;
        Ok(PendingAnchor {
            id: raw.replace("{context}", context),
            root: raw.replace("_{context}", ""),
            context: Some(context.to_string()),
        })
    }

    fn commit(
        &mut self,
        anchor: PendingAnchor,
        title: Option<String>,
        metadata: &MetadataRecord,
        file: &Path,
        book: &str,
    ) {
        let legacy_id = metadata
            .get(MetadataField::ConvertedFromID)
            .map(str::to_string);

        let record = title
            .as_deref()
            .map(|title| self.record(&anchor, title, metadata, file));

        let entry = AnchorEntry {
            file: file.to_path_buf(),
            title,
            context: anchor.context,
            legacy_id,
            root: anchor.root,
        };
        if self.registry.insert(&anchor.id, book, entry) {
            self.registry.records.extend(record);
        }
    }

    /// Export row for a titled anchor
    fn record(
        &self,
        anchor: &PendingAnchor,
        title: &str,
        metadata: &MetadataRecord,
        file: &Path,
    ) -> MetadataRecord {
        let mut record = metadata.clone();
        match self.project.kind_of(file) {
            FileKind::Module => {
                record.remove(MetadataField::Type);
            }
            kind => record.set(MetadataField::Type, kind.as_str()),
        }
        record.set(MetadataField::Title, title);
        record.set(MetadataField::ModuleID, anchor.id.as_str());
        if let Some(context) = &anchor.context {
            record.set(MetadataField::Context, context.as_str());
        }
        record.set(MetadataField::FilePath, self.project.display(file));
        if let Some(category) = self.project.category_of(file) {
            record.set(MetadataField::Category, category);
        }
        record
    }
}
