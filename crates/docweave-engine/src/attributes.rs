use crate::directive::Directive;
use crate::error::Result;
use crate::io::read_lines;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

/// Document attributes (`:name: value`) visible to a resolution pass.
///
/// Attributes seeded from attribute files form the base layer and survive
/// [`AttributeTable::reset`]; everything defined while scanning documents is
/// discarded on reset so independent book scans do not leak into each other.
#[derive(Debug, Clone, Default)]
pub struct AttributeTable {
    base: HashMap<String, String>,
    values: HashMap<String, String>,
}

impl AttributeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the base layer from attribute files
    pub fn load_files<P: AsRef<Path>>(&mut self, files: &[P]) -> Result<()> {
        for file in files {
            for line in read_lines(file.as_ref())? {
                match Directive::classify(&line) {
                    Directive::Attribute { name, value } => {
                        let value = self.resolve(value);
                        self.base.insert(name.to_string(), value.clone());
                        self.values.insert(name.to_string(), value);
                    }
                    Directive::AttributeUnset { name } => {
                        self.base.remove(name);
                        self.values.remove(name);
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.trim().to_string());
    }

    pub fn unset(&mut self, name: &str) {
        self.values.remove(name);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Apply an attribute-definition directive, if `directive` is one
    pub fn apply(&mut self, directive: &Directive<'_>) {
        match directive {
            Directive::Attribute { name, value } => self.set(name, value),
            Directive::AttributeUnset { name } => self.unset(name),
            _ => {}
        }
    }

    /// Drop everything defined since the table was seeded
    pub fn reset(&mut self) {
        self.values = self.base.clone();
    }

    /// Substitute `{name}` references. Unknown names stay as written.
    pub fn resolve(&self, text: &str) -> String {
        static REFERENCE: OnceLock<Regex> = OnceLock::new();
        let reference = REFERENCE
            .get_or_init(|| Regex::new(r"\{([\w\-]+)\}").expect("Invalid attribute reference regex"));

        if !text.contains('{') {
            return text.to_string();
        }
        reference
            .replace_all(text, |caps: &Captures| match self.get(&caps[1]) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{create_test_file, create_test_project};

    #[test]
    fn test_resolve_known_and_unknown_references() {
        let mut attrs = AttributeTable::new();
        attrs.set("product", "Widget");

        assert_eq!(
            attrs.resolve("{product} guide for {version}"),
            "Widget guide for {version}"
        );
    }

    #[test]
    fn test_set_trims_value() {
        let mut attrs = AttributeTable::new();
        attrs.set("context", "  guide  ");
        assert_eq!(attrs.get("context"), Some("guide"));
    }

    #[test]
    fn test_reset_keeps_seeded_attributes() {
        let project = create_test_project();
        let file = create_test_file(
            &project,
            "attributes.adoc",
            ":product: Widget\n:product-short: {product}\n\nSome prose\n",
        );

        let mut attrs = AttributeTable::new();
        attrs.load_files(&[file]).unwrap();
        attrs.set("context", "guide");
        attrs.unset("product");
        attrs.reset();

        assert_eq!(attrs.get("product"), Some("Widget"));
        assert_eq!(attrs.get("product-short"), Some("Widget"));
        assert_eq!(attrs.get("context"), None);
    }

    #[test]
    fn test_apply_directives() {
        let mut attrs = AttributeTable::new();
        attrs.apply(&Directive::classify(":context: guide"));
        assert_eq!(attrs.get("context"), Some("guide"));

        attrs.apply(&Directive::classify(":!context:"));
        assert_eq!(attrs.get("context"), None);
    }
}
