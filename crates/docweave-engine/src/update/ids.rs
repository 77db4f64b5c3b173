use crate::directive::Directive;
use crate::error::Result;
use crate::io::rewrite_lines;
use crate::project::Project;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

/// Heading title to ID slug: only word characters, dashes and whitespace
/// survive, whitespace runs become one dash, lower case
pub fn title_to_id(title: &str) -> String {
    static UNWANTED: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let unwanted = UNWANTED
        .get_or_init(|| Regex::new(r"[^0-9a-zA-Z_\-\s]+").expect("Invalid slug character regex"));
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

    let kept = unwanted.replace_all(title.trim(), "");
    whitespace.replace_all(&kept, "-").to_lowercase()
}

/// `<directory with separators as dashes>-<module ID>` for a project file
pub fn default_id_prefix(project: &Project, file: &Path) -> String {
    let dir = project
        .relative(file)
        .and_then(|relative| relative.parent().map(|p| p.to_string()))
        .unwrap_or_default();
    let dir = dir.replace(['/', '_'], "-");
    let module_id = project.module_id_of(file);
    if dir.is_empty() {
        module_id
    } else {
        format!("{dir}-{module_id}")
    }
}

/// Insert `[id="<prefix>-<slug>"]` above every heading that has no ID line
/// directly before it. Returns whether the file changed.
pub fn generate_ids(file: &Path, prefix: &str) -> Result<bool> {
    log::info!("Adding missing IDs to file: {}", file.display());
    rewrite_lines(file, |lines| {
        let mut out = Vec::with_capacity(lines.len());
        let mut used = HashSet::new();
        let mut suffix = 1;
        let mut previous_is_id = false;

        for line in lines {
            let directive = Directive::classify(line);
            if let Directive::Heading { title, .. } = directive
                && !previous_is_id
            {
                let mut id = format!("{prefix}-{}", title_to_id(title));
                if used.contains(&id) {
                    id = format!("{id}-{suffix:03}");
                    suffix += 1;
                }
                used.insert(id.clone());
                out.push(format!("[id=\"{id}\"]"));
            }
            previous_is_id = matches!(directive, Directive::Id(_));
            out.push(line.clone());
        }
        Ok(Some(out))
    })
}
