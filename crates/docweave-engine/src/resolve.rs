//! # Include Resolution
//!
//! Flattens a tree of files into one logical line stream. Includes are
//! expanded in place (pre-order), headings are renumbered by the effective
//! `leveloffset`, attribute definitions are recorded as they stream past so
//! later include paths can reference them, and `tag::`/`end::` regions
//! restrict what an include pulls in.
//!
//! A missing include target aborts the whole resolution.

use crate::attributes::AttributeTable;
use crate::conditional::{ConditionSet, filter_conditionals};
use crate::directive::{Directive, IncludeOptions};
use crate::error::{DocError, Result};
use crate::io::{canonical_path, read_lines, resolve_relative};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A line of the flattened stream together with where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    pub text: String,
    /// File the line was read from
    pub source: Rc<Path>,
    /// Heading-level offset in effect for that file
    pub level_offset: i32,
}

impl ResolvedLine {
    pub fn new(text: impl Into<String>, source: Rc<Path>, level_offset: i32) -> Self {
        Self {
            text: text.into(),
            source,
            level_offset,
        }
    }

    /// Wrap plain text lines as if they were read from `source` at offset 0
    pub fn from_texts<S: AsRef<str>>(texts: &[S], source: &Path) -> Vec<Self> {
        let source: Rc<Path> = Rc::from(source);
        texts
            .iter()
            .map(|t| Self::new(t.as_ref(), source.clone(), 0))
            .collect()
    }
}

/// Just the text of a line stream
pub fn texts(lines: &[ResolvedLine]) -> Vec<&str> {
    lines.iter().map(|l| l.text.as_str()).collect()
}

pub struct IncludeResolver<'a> {
    attributes: &'a mut AttributeTable,
    /// Files currently being expanded, outermost first
    chain: Vec<PathBuf>,
}

impl<'a> IncludeResolver<'a> {
    pub fn new(attributes: &'a mut AttributeTable) -> Self {
        Self {
            attributes,
            chain: Vec::new(),
        }
    }

    /// Resolve `file` with a base heading offset and an optional tag list
    /// (empty = whole file).
    pub fn resolve(
        &mut self,
        file: &Path,
        level_offset: i32,
        tags: &[String],
    ) -> Result<Vec<ResolvedLine>> {
        if !file.exists() {
            return Err(DocError::NotFound(file.to_path_buf()));
        }
        let mut out = Vec::new();
        self.resolve_into(file, level_offset, tags, &mut out)?;
        Ok(out)
    }

    fn resolve_into(
        &mut self,
        file: &Path,
        level_offset: i32,
        tags: &[String],
        out: &mut Vec<ResolvedLine>,
    ) -> Result<()> {
        let key = canonical_path(file);
        if self.chain.contains(&key) {
            return Err(DocError::IncludeCycle(file.to_path_buf()));
        }
        self.chain.push(key);

        let source: Rc<Path> = Rc::from(file);
        let mut scope = TagScope::new(tags);

        for line in read_lines(file)? {
            let directive = Directive::classify(&line);
            match directive {
                Directive::TagStart(name) => scope.open(name),
                Directive::TagEnd(name) => scope.close(name),
                _ if !scope.visible() => {}
                Directive::Attribute { .. } | Directive::AttributeUnset { .. } => {
                    self.attributes.apply(&directive);
                    out.push(ResolvedLine::new(line.as_str(), source.clone(), level_offset));
                }
                Directive::Heading { level, title } => {
                    let text = heading_line(level, level_offset, title);
                    out.push(ResolvedLine::new(text, source.clone(), level_offset));
                }
                Directive::Include { target, options } => {
                    let target = self.attributes.resolve(target);
                    let path = resolve_relative(file, &target);
                    if !path.exists() {
                        return Err(DocError::IncludeNotFound {
                            path,
                            included_from: file.to_path_buf(),
                        });
                    }
                    let options = IncludeOptions::parse(options);
                    let child_offset = options
                        .level_offset
                        .map_or(level_offset, |offset| offset.apply(level_offset));
                    log::debug!("Including {} at offset {child_offset}", path.display());
                    self.resolve_into(&path, child_offset, &options.tags, out)?;
                }
                _ => out.push(ResolvedLine::new(line.as_str(), source.clone(), level_offset)),
            }
        }

        self.chain.pop();
        Ok(())
    }
}

/// Flatten `file` from a fresh include chain, then drop whatever
/// `conditions` exclude. `None` keeps conditional directives in place.
pub fn resolve_document(
    file: &Path,
    attributes: &mut AttributeTable,
    conditions: Option<&ConditionSet>,
) -> Result<Vec<ResolvedLine>> {
    let lines = IncludeResolver::new(attributes).resolve(file, 0, &[])?;
    Ok(match conditions {
        Some(conditions) => filter_conditionals(lines, conditions),
        None => lines,
    })
}

/// Rebuild a heading with its marker count shifted by `offset` (never below one)
pub fn heading_line(level: usize, offset: i32, title: &str) -> String {
    let depth = (level as i32 + offset).max(1) as usize;
    format!("{} {title}", "=".repeat(depth))
}

/// Visibility under tag-scoped extraction. Only one region is current at a
/// time; markers for other names inside it are ignored.
struct TagScope<'t> {
    selected: &'t [String],
    current: Option<String>,
}

impl<'t> TagScope<'t> {
    fn new(selected: &'t [String]) -> Self {
        Self {
            selected,
            current: None,
        }
    }

    fn visible(&self) -> bool {
        self.selected.is_empty() || self.current.is_some()
    }

    fn open(&mut self, name: &str) {
        if self.current.is_none() && self.selected.iter().any(|t| t == name) {
            self.current = Some(name.to_string());
        }
    }

    fn close(&mut self, name: &str) {
        if self.current.as_deref() == Some(name) {
            self.current = None;
        }
    }
}
