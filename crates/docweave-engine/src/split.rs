//! # Document Splitting
//!
//! Carves a flattened, annotated document into a tree of module and
//! assembly files.
//!
//! Lines are copied into the current module's content until a metadata
//! comment, an ID line or a heading shows up. From there on lines are held
//! back in a tentative block until a heading decides what the block was:
//!
//! - a deeper heading without a `Type` becomes a `.Title` caption
//! - a deeper heading with a `Type` becomes a generated file of its own,
//!   replaced in the parent by an `include::` line
//! - a heading at the same depth with `Type: continue` is a caption too
//! - any other heading at the same or a shallower depth ends the current
//!   module, and the heading is handed back to the caller
//!
//! A block that breaks off before its heading is put back as plain content.

use crate::attributes::AttributeTable;
use crate::conditional::ConditionSet;
use crate::directive::Directive;
use crate::error::{DocError, Result};
use crate::factory::ModuleFactory;
use crate::metadata::{MetadataField, MetadataRecord};
use crate::resolve::{ResolvedLine, resolve_document};
use relative_path::{RelativePath, RelativePathBuf};
use std::path::{Path, PathBuf};

/// What one level of splitting produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    /// File written for this level. A level that writes no file of its
    /// own (the untyped document root) reports the files of its children.
    pub generated: Vec<RelativePathBuf>,
    /// Index of the first line not consumed
    pub next: usize,
}

/// A metadata/ID/heading block not yet known to be a module header
struct Tentative {
    start: usize,
    buffered: Vec<String>,
    child: MetadataRecord,
    expecting_title: bool,
}

impl Tentative {
    fn new(start: usize) -> Self {
        Self {
            start,
            buffered: Vec::new(),
            child: MetadataRecord::new(),
            expecting_title: false,
        }
    }

    fn record(&mut self, key: &str, value: &str, source: &Path) {
        match key.parse::<MetadataField>() {
            Ok(field) => self.child.set(field, value.trim()),
            Err(_) => log::warn!("Unknown metadata \"{key}\" in file {}", source.display()),
        }
    }

    fn record_id(&mut self, id: &str) {
        if self.child.contains(MetadataField::ModuleID) {
            self.child.set(MetadataField::ConvertedFromID, id);
        } else {
            self.child.set(MetadataField::ModuleID, id);
        }
        self.expecting_title = true;
    }
}

enum Boundary {
    Caption,
    Module,
    End,
}

pub struct Splitter<'f> {
    factory: &'f mut dyn ModuleFactory,
    root: PathBuf,
    conversion_date: Option<String>,
}

impl<'f> Splitter<'f> {
    /// `root` is the directory source paths are reported relative to
    pub fn new(factory: &'f mut dyn ModuleFactory, root: impl Into<PathBuf>) -> Self {
        Self {
            factory,
            root: root.into(),
            conversion_date: None,
        }
    }

    /// Stamp generated files with the time of this run
    pub fn with_timestamp(mut self) -> Self {
        self.conversion_date = Some(chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
        self
    }

    /// Split `lines` from `start` as the body of a module described by
    /// `metadata`, whose own heading sits at `depth`.
    pub fn split(
        &mut self,
        lines: &[ResolvedLine],
        metadata: MetadataRecord,
        start: usize,
        depth: usize,
    ) -> Result<SplitOutcome> {
        let mut content: Vec<String> = Vec::new();
        let mut children: Vec<RelativePathBuf> = Vec::new();
        let mut tentative: Option<Tentative> = None;
        let mut index = start;

        while let Some(line) = lines.get(index) {
            let directive = Directive::classify(&line.text);

            let Some(mut block) = tentative.take() else {
                if matches!(
                    directive,
                    Directive::Metadata { .. } | Directive::Id(_) | Directive::Heading { .. }
                ) {
                    tentative = Some(Tentative::new(index));
                } else {
                    content.push(line.text.clone());
                    index += 1;
                }
                continue;
            };

            block.buffered.push(line.text.clone());
            index += 1;

            match directive {
                Directive::Blank => tentative = Some(block),
                Directive::Metadata { key, value } if !block.expecting_title => {
                    block.record(key, value, &line.source);
                    tentative = Some(block);
                }
                Directive::Id(id) if !block.expecting_title => {
                    block.record_id(id);
                    tentative = Some(block);
                }
                Directive::Heading { level, title } => {
                    let mut child = block.child;
                    if child.contains(MetadataField::Title) {
                        child.set(MetadataField::ConvertedFromTitle, title);
                    } else {
                        child.set(MetadataField::Title, title);
                    }
                    if metadata.is_skip() {
                        child.set(MetadataField::Type, "skip");
                    }

                    match boundary(level, depth, &child) {
                        Boundary::Caption => {
                            block.buffered.pop();
                            content.extend(block.buffered);
                            content.push(format!(".{title}"));
                        }
                        Boundary::Module => {
                            let child = self.prepare_child(child, &metadata, line)?;
                            let outcome = self.split(lines, child, index, level)?;
                            index = outcome.next;
                            content.push(String::new());
                            for generated in outcome.generated {
                                content.push(self.include_line(&metadata, &generated));
                                content.push(String::new());
                                children.push(generated);
                            }
                        }
                        Boundary::End => {
                            let generated = self.emit(&metadata, &content, children)?;
                            return Ok(SplitOutcome {
                                generated,
                                next: block.start,
                            });
                        }
                    }
                }
                _ => {
                    log::debug!("Header block at line {} is plain content", block.start + 1);
                    content.extend(block.buffered);
                }
            }
        }

        if let Some(block) = tentative {
            content.extend(block.buffered);
        }
        let generated = self.emit(&metadata, &content, children)?;
        Ok(SplitOutcome {
            generated,
            next: lines.len(),
        })
    }

    fn prepare_child(
        &self,
        mut child: MetadataRecord,
        parent: &MetadataRecord,
        heading: &ResolvedLine,
    ) -> Result<MetadataRecord> {
        let source = self.label(&heading.source);
        if !child.contains(MetadataField::ModuleID) && !child.is_skip() {
            return Err(DocError::MissingModuleId {
                title: child.get(MetadataField::Title).unwrap_or_default().to_string(),
                file: PathBuf::from(&source),
            });
        }
        if !child.contains(MetadataField::Category)
            && let Some(category) = parent.get(MetadataField::Category)
        {
            child.set(MetadataField::Category, category);
        }
        child.set(MetadataField::ConversionStatus, "raw");
        if let Some(date) = &self.conversion_date {
            child.set(MetadataField::ConversionDate, date.as_str());
        }
        child.set(MetadataField::ConvertedFromFile, source);
        Ok(child)
    }

    /// Write the module for `metadata`. Untyped and skipped levels write
    /// nothing and pass on `children` instead.
    fn emit(
        &mut self,
        metadata: &MetadataRecord,
        content: &[String],
        children: Vec<RelativePathBuf>,
    ) -> Result<Vec<RelativePathBuf>> {
        if !metadata.contains(MetadataField::Type) || metadata.is_skip() {
            return Ok(children);
        }
        Ok(vec![self.factory.create(metadata, Some(content), true)?])
    }

    /// Include directive for `generated`, relative to the parent's own file
    fn include_line(&self, parent: &MetadataRecord, generated: &RelativePath) -> String {
        let target = match self.factory.path_for(parent) {
            Ok(parent_path) => parent_path
                .parent()
                .unwrap_or_else(|| RelativePath::new(""))
                .relative(generated),
            Err(_) => RelativePath::new("../..").join(generated),
        };
        format!("include::{target}[leveloffset=+1]")
    }

    fn label(&self, source: &Path) -> String {
        source
            .strip_prefix(&self.root)
            .unwrap_or(source)
            .display()
            .to_string()
    }
}

fn boundary(level: usize, depth: usize, child: &MetadataRecord) -> Boundary {
    if level > depth {
        if child.contains(MetadataField::Type) {
            Boundary::Module
        } else {
            Boundary::Caption
        }
    } else if level == depth && child.has_kind("continue") {
        Boundary::Caption
    } else {
        Boundary::End
    }
}

/// How files picked up by [`split_files`] are categorised and filtered
#[derive(Debug, Clone, Default)]
pub struct SplitOptions {
    pub category_prefix: Option<String>,
    /// Derive the category from the file's directory below this base
    pub legacy_base_dir: Option<PathBuf>,
    /// Filter conditionals first; `None` leaves conditional directives in place
    pub conditions: Option<ConditionSet>,
}

/// Category for a source file: `default`, or its directory below the legacy
/// base joined with `-`, optionally prefixed.
pub fn category_for(file: &Path, options: &SplitOptions) -> Result<String> {
    let mut category = "default".to_string();
    if let Some(base) = &options.legacy_base_dir {
        if !base.exists() {
            return Err(DocError::NotFound(base.clone()));
        }
        let relative = file.strip_prefix(base).unwrap_or(file);
        category = relative
            .parent()
            .map(|dir| {
                dir.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("-")
            })
            .unwrap_or_default();
    }
    if let Some(prefix) = &options.category_prefix {
        category = format!("{prefix}-{category}");
    }
    Ok(category)
}

/// Split every file matching `pattern` (`{}` stands for any text). Returns
/// the top-level files generated.
pub fn split_files(
    pattern: &str,
    attributes: &mut AttributeTable,
    options: &SplitOptions,
    splitter: &mut Splitter<'_>,
) -> Result<Vec<RelativePathBuf>> {
    let mut generated = Vec::new();
    for entry in glob::glob(&pattern.replace("{}", "*"))? {
        let file = entry.map_err(|e| DocError::Io(e.into_error()))?;
        log::info!("Splitting {}", file.display());

        let metadata =
            MetadataRecord::new().with(MetadataField::Category, category_for(&file, options)?);
        attributes.reset();
        let lines = resolve_document(&file, attributes, options.conditions.as_ref())?;

        let outcome = splitter.split(&lines, metadata, 0, 0)?;
        generated.extend(outcome.generated);
    }
    Ok(generated)
}
