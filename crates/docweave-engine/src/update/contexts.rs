//! Context boilerplate for shared content.
//!
//! Every ID gets a `_{context}` suffix. In an assembly, each include is
//! wrapped so the included file sees a context derived from the root ID of
//! the enclosing section:
//!
//! ```text
//! :parent-of-context-<hash>: {context}
//! :context: {context}-<segment>
//! include::...
//! :context: {parent-of-context-<hash>}
//! ```
//!
//! Existing wrappers are recognised and rewritten to the current section,
//! so running the operation twice changes nothing. Files that already use
//! the `:parent-context:` convention are left alone.

use crate::directive::{Directive, id_span};
use crate::error::{DocError, Result};
use crate::io::rewrite_lines;
use sha2::{Digest, Sha256};
use std::path::Path;

const CONTEXT_SUFFIX: &str = "_{context}";

#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// Use the root ID hash instead of the root ID as context segment
    pub hash_contexts: bool,
}

/// First six hex digits of the SHA-256 of `text`
pub fn context_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(digest)[..6].to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Regular,
    ExpectContextSet,
    ExpectInclude,
    ExpectRestore,
}

/// Section the current includes belong to
struct Section {
    hash: String,
    segment: String,
}

struct ContextWriter<'a> {
    file: &'a Path,
    is_assembly: bool,
    options: &'a ContextOptions,
    state: State,
    root_id: Option<String>,
    section: Option<Section>,
    out: Vec<String>,
}

impl<'a> ContextWriter<'a> {
    fn fail(&self, message: impl Into<String>) -> DocError {
        DocError::ContextBoilerplate {
            file: self.file.to_path_buf(),
            message: message.into(),
        }
    }

    fn section(&self, missing: &str) -> Result<&Section> {
        self.section.as_ref().ok_or_else(|| self.fail(missing))
    }

    fn parent_line(section: &Section) -> String {
        format!(":parent-of-context-{}: {{context}}", section.hash)
    }

    fn context_line(section: &Section) -> String {
        format!(":context: {{context}}-{}", section.segment)
    }

    fn restore_line(section: &Section) -> String {
        format!(":context: {{parent-of-context-{}}}", section.hash)
    }

    /// Process one line. `Ok(false)` means the file uses the legacy
    /// convention and must stay unchanged.
    fn push(&mut self, line: &str) -> Result<bool> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            self.out.push(line.to_string());
            return Ok(true);
        }
        if line.starts_with(":parent-context:") || line.starts_with("ifdef::context[:parent-context:") {
            return Ok(false);
        }

        match self.state {
            State::Regular => return self.regular(line),
            State::ExpectContextSet if line.starts_with(":context:") => {
                let section = self.section("Expected assembly title before context definition")?;
                let replaced = Self::context_line(section);
                self.out.push(replaced);
                self.state = State::ExpectInclude;
            }
            State::ExpectContextSet => return Err(self.fail("Expected context definition")),
            State::ExpectInclude if line.starts_with("include::") => {
                self.out.push(line.to_string());
                self.state = State::ExpectRestore;
            }
            State::ExpectInclude => return Err(self.fail("Expected include line")),
            State::ExpectRestore if line.starts_with(":context: {parent-of-context-") => {
                let section = self.section("Expected assembly title before context restore")?;
                let replaced = Self::restore_line(section);
                self.out.push(replaced);
                self.state = State::Regular;
            }
            State::ExpectRestore => return Err(self.fail("Expected context restore line")),
        }
        Ok(true)
    }

    fn regular(&mut self, line: &str) -> Result<bool> {
        if line.starts_with(":context:") {
            return Ok(false);
        }

        match Directive::classify(line) {
            Directive::Id(id) => {
                let root = id.strip_suffix(CONTEXT_SUFFIX).unwrap_or(id);
                self.root_id = Some(root.to_string());
                match id_span(line) {
                    Some(span) if !id.ends_with(CONTEXT_SUFFIX) => {
                        let (head, tail) = line.split_at(span.end);
                        self.out.push(format!("{head}{CONTEXT_SUFFIX}{tail}"));
                    }
                    _ => self.out.push(line.to_string()),
                }
            }
            Directive::Heading { title, .. } => {
                let Some(root) = &self.root_id else {
                    return Err(self.fail(format!("Expected ID definition before heading = {title}")));
                };
                let hash = context_hash(root);
                let segment = if self.options.hash_contexts {
                    hash.clone()
                } else {
                    root.clone()
                };
                self.section = Some(Section { hash, segment });
                self.out.push(line.to_string());
            }
            _ if self.is_assembly && line.starts_with("include::") => {
                let section = self.section("Expected assembly title before first include")?;
                let wrapped = [
                    Self::parent_line(section),
                    Self::context_line(section),
                    line.to_string(),
                    Self::restore_line(section),
                ];
                self.out.extend(wrapped);
            }
            _ if self.is_assembly && line.starts_with(":parent-of-context-") => {
                let section = self.section(
                    "Expected assembly title before first instance of :parent-of-context-<SHA>:",
                )?;
                let replaced = Self::parent_line(section);
                self.out.push(replaced);
                self.state = State::ExpectContextSet;
            }
            _ => self.out.push(line.to_string()),
        }
        Ok(true)
    }
}

/// Add context suffixes and include wrappers to one file. Returns whether
/// the file changed; legacy files never change.
pub fn add_contexts(file: &Path, is_assembly: bool, options: &ContextOptions) -> Result<bool> {
    log::info!("Adding contexts to file: {}", file.display());
    rewrite_lines(file, |lines| {
        let mut writer = ContextWriter {
            file,
            is_assembly,
            options,
            state: State::Regular,
            root_id: None,
            section: None,
            out: Vec::with_capacity(lines.len()),
        };
        for line in lines {
            if !writer.push(line)? {
                log::info!("  - legacy file detected - no changes made");
                return Ok(None);
            }
        }
        Ok(Some(writer.out))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{create_test_file, create_test_project};
    use insta::assert_snapshot;
    use std::fs;

    #[test]
    fn test_context_hash_is_six_hex_digits() {
        let hash = context_hash("install");
        assert_eq!(hash.len(), 6);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, context_hash("install"));
        assert_ne!(hash, context_hash("upgrade"));
    }

    #[test]
    fn test_assembly_includes_are_wrapped() {
        let dir = create_test_project();
        let file = create_test_file(
            &dir,
            "assemblies/assembly_install.adoc",
            "[id=\"install\"]\n= Install\n\ninclude::../modules/proc_a.adoc[leveloffset=+1]\n",
        );

        assert!(add_contexts(&file, true, &ContextOptions::default()).unwrap());

        let hash = context_hash("install");
        let expected = format!(
            "[id=\"install_{{context}}\"]\n= Install\n\n:parent-of-context-{hash}: {{context}}\n:context: {{context}}-install\ninclude::../modules/proc_a.adoc[leveloffset=+1]\n:context: {{parent-of-context-{hash}}}\n"
        );
        assert_eq!(fs::read_to_string(&file).unwrap(), expected);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let dir = create_test_project();
        let file = create_test_file(
            &dir,
            "assemblies/assembly_install.adoc",
            "[id=\"install\"]\n= Install\n\ninclude::../modules/proc_a.adoc[]\n\n[[more]]\n== More\ninclude::../modules/con_b.adoc[]\n",
        );
        let options = ContextOptions { hash_contexts: true };

        assert!(add_contexts(&file, true, &options).unwrap());
        let first = fs::read_to_string(&file).unwrap();
        assert!(!add_contexts(&file, true, &options).unwrap());

        assert_eq!(fs::read_to_string(&file).unwrap(), first);
    }

    #[test]
    fn test_module_ids_get_suffix_and_includes_stay() {
        let dir = create_test_project();
        let file = create_test_file(
            &dir,
            "modules/con_a.adoc",
            "// Type: concept\n[[about,About]]\n= About\n\ninclude::snippet.adoc[]\n",
        );

        add_contexts(&file, false, &ContextOptions::default()).unwrap();

        assert_snapshot!(fs::read_to_string(&file).unwrap(), @r"
        // Type: concept
        [[about_{context},About]]
        = About

        include::snippet.adoc[]
        ");
    }

    #[test]
    fn test_suffix_goes_after_the_id_not_a_matching_label() {
        let dir = create_test_project();
        let file = create_test_file(&dir, "modules/con_a.adoc", "[[a,a is for about]]\n= A\n");

        add_contexts(&file, false, &ContextOptions::default()).unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "[[a_{context},a is for about]]\n= A\n");
    }

    #[test]
    fn test_legacy_file_is_left_unchanged() {
        let dir = create_test_project();
        let content = "ifdef::context[:parent-context: {context}]\n[id=\"a\"]\n= A\n:context: a\n";
        let file = create_test_file(&dir, "assemblies/assembly_a.adoc", content);

        assert!(!add_contexts(&file, true, &ContextOptions::default()).unwrap());
        assert_eq!(fs::read_to_string(&file).unwrap(), content);
    }

    #[test]
    fn test_heading_without_id_is_fatal() {
        let dir = create_test_project();
        let file = create_test_file(&dir, "modules/con_a.adoc", "= No ID\n");

        let result = add_contexts(&file, false, &ContextOptions::default());

        assert!(matches!(result, Err(DocError::ContextBoilerplate { .. })));
    }

    #[test]
    fn test_include_before_title_is_fatal() {
        let dir = create_test_project();
        let file = create_test_file(&dir, "assemblies/assembly_a.adoc", "include::x.adoc[]\n");

        let result = add_contexts(&file, true, &ContextOptions::default());

        assert!(matches!(result, Err(DocError::ContextBoilerplate { .. })));
    }
}
