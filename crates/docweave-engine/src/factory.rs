//! Naming, templating and writing of generated module and assembly files.

use crate::error::{DocError, Result};
use crate::io::write_atomically;
use crate::metadata::{MetadataField, MetadataRecord};
use crate::project::{FileKind, Project};
use relative_path::{RelativePath, RelativePathBuf};
use std::collections::HashSet;

pub trait ModuleFactory {
    /// Project-relative path the record would be written to
    fn path_for(&self, metadata: &MetadataRecord) -> Result<RelativePathBuf>;

    /// Render and write a module. `content` replaces the type skeleton when
    /// given. Existing files are only replaced when `clobber` is set.
    fn create(
        &mut self,
        metadata: &MetadataRecord,
        content: Option<&[String]>,
        clobber: bool,
    ) -> Result<RelativePathBuf>;
}

/// Writes modules into the project's assemblies/modules directories
pub struct FsModuleFactory {
    project: Project,
    written: HashSet<RelativePathBuf>,
}

impl FsModuleFactory {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            written: HashSet::new(),
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Files written so far, in no particular order
    pub fn written(&self) -> impl Iterator<Item = &RelativePath> {
        self.written.iter().map(|p| p.as_relative_path())
    }
}

impl ModuleFactory for FsModuleFactory {
    fn path_for(&self, metadata: &MetadataRecord) -> Result<RelativePathBuf> {
        let module_id = metadata
            .get(MetadataField::ModuleID)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DocError::MissingModuleId {
                title: metadata.get(MetadataField::Title).unwrap_or_default().to_string(),
                file: metadata
                    .get(MetadataField::ConvertedFromFile)
                    .unwrap_or_default()
                    .into(),
            })?;
        let category = metadata
            .get(MetadataField::Category)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| DocError::MissingCategory(module_id.to_string()))?;

        let kind = metadata
            .kind()
            .and_then(|k| FileKind::parse(&k))
            .unwrap_or(FileKind::Module);
        let layout = self.project.layout();
        let file_name = format!("{}{module_id}.adoc", layout.prefix(kind));

        Ok(RelativePath::new(layout.dir_for(kind))
            .join(category)
            .join(file_name))
    }

    fn create(
        &mut self,
        metadata: &MetadataRecord,
        content: Option<&[String]>,
        clobber: bool,
    ) -> Result<RelativePathBuf> {
        let relative = self.path_for(metadata)?;
        if self.written.contains(&relative) {
            return Err(DocError::ModuleCollision(relative));
        }
        let path = self.project.path(&relative);
        if path.exists() && !clobber {
            return Err(DocError::ModuleExists(path));
        }

        write_atomically(&path, &render(metadata, content))?;
        log::info!("Generated {relative}");
        self.written.insert(relative.clone());
        Ok(relative)
    }
}

/// The full text of a generated file
pub fn render(metadata: &MetadataRecord, content: Option<&[String]>) -> String {
    let module_id = metadata.get(MetadataField::ModuleID).unwrap_or_default();
    let title = metadata.get(MetadataField::Title).unwrap_or(module_id);
    let is_assembly = metadata.has_kind("assembly");

    let mut out = vec!["// Metadata".to_string()];
    out.extend(metadata.iter().map(|(field, value)| format!("// {field}: {value}")));
    out.push(String::new());

    if is_assembly {
        out.push("ifdef::context[:parent-context: {context}]".to_string());
        out.push(String::new());
    }
    out.push(format!("[id=\"{module_id}_{{context}}\"]"));
    out.push(format!("= {title}"));
    if is_assembly {
        out.push(format!(":context: {module_id}"));
    }
    out.push(String::new());

    match content {
        Some(lines) => out.extend(trim_blank_lines(lines).iter().cloned()),
        None => out.extend(skeleton(metadata).iter().map(|s| s.to_string())),
    }

    if is_assembly {
        out.push(String::new());
        out.push("ifdef::parent-context[:context: {parent-context}]".to_string());
        out.push("ifndef::parent-context[:!context:]".to_string());
    }

    let mut text = out.join("\n");
    text.push('\n');
    text
}

fn trim_blank_lines(lines: &[String]) -> &[String] {
    let start = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(start, |i| i + 1);
    &lines[start..end]
}

fn skeleton(metadata: &MetadataRecord) -> &'static [&'static str] {
    match metadata.kind().as_deref() {
        Some("assembly") => &["This assembly introduces the topic.", "", "//INCLUDES"],
        Some("procedure") => &[
            "This procedure describes how to complete the task.",
            "",
            ".Prerequisites",
            "",
            "* A prerequisite.",
            "",
            ".Procedure",
            "",
            ". The first step.",
            "",
            ".Verification",
            "",
            "* How to check the result.",
        ],
        Some("reference") => &["This reference lists the details.", "", "|===", "| Name | Description", "|==="],
        _ => &["This concept explains the topic."],
    }
}
