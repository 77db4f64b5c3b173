//! # Directive Grammar
//!
//! Every line of a source file is classified exactly once into a
//! [`Directive`]. The resolver, the conditional filter, the splitter and the
//! anchor indexer all dispatch on the same tagged union, so a new directive
//! kind is added here and nowhere else.
//!
//! Classification is context-free: a line is judged on its own text. Whether
//! a heading is a module boundary or an ID is pending a title is decided by
//! the consumers.
//!
//! ## Precedence
//!
//! 1. blank lines
//! 2. conditional directives (`ifdef`, `ifndef`, `ifeval`, `endif`), anchored at column 0
//! 3. tag region markers (`tag::name[]`, `end::name[]`), usually inside comments
//! 4. attribute definitions and unsets
//! 5. `include::`
//! 6. headings (`=` markers)
//! 7. ID lines (`[[id]]`, `[id="id"]`)
//! 8. metadata comments (`// Key: value`)
//! 9. anything else is text

pub mod condition;
pub mod include;

pub use condition::Condition;
pub use include::{IncludeOptions, LevelOffset};

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
    Blank,
    /// `:name: value`
    Attribute { name: &'a str, value: &'a str },
    /// `:!name:` or `:name!:`
    AttributeUnset { name: &'a str },
    /// `include::target[options]`
    Include { target: &'a str, options: &'a str },
    /// `== Title`; `level` counts the markers
    Heading { level: usize, title: &'a str },
    /// `[[id]]` or `[id="id"]`
    Id(&'a str),
    /// `// Key: value`
    Metadata { key: &'a str, value: &'a str },
    /// `ifdef::cond[]`, or the single-line form `ifdef::cond[text]`
    IfDef {
        condition: Condition<'a>,
        inline: Option<&'a str>,
    },
    /// `ifndef::cond[]`, or the single-line form `ifndef::cond[text]`
    IfNDef {
        condition: Condition<'a>,
        inline: Option<&'a str>,
    },
    /// `ifeval::[expression]`
    IfEval { expression: &'a str },
    /// `endif::name[]`; the name may be empty
    EndIf { name: &'a str },
    TagStart(&'a str),
    TagEnd(&'a str),
    Text,
}

struct Patterns {
    ifdef: Regex,
    ifndef: Regex,
    ifeval: Regex,
    endif: Regex,
    tag: Regex,
    attribute: Regex,
    attribute_unset: Regex,
    include: Regex,
    heading: Regex,
    id_brackets: Regex,
    id_attribute: Regex,
    metadata: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        ifdef: Regex::new(r"^ifdef::([^\[]+)\[(.*)\]\s*$").expect("Invalid ifdef regex"),
        ifndef: Regex::new(r"^ifndef::([^\[]+)\[(.*)\]\s*$").expect("Invalid ifndef regex"),
        ifeval: Regex::new(r"^ifeval::\[(.*)\]\s*$").expect("Invalid ifeval regex"),
        endif: Regex::new(r"^endif::([^\[]*)\[\]").expect("Invalid endif regex"),
        tag: Regex::new(r"(?:^|[^\w:])(tag|end)::([^\[\s]+)\[\]").expect("Invalid tag regex"),
        attribute: Regex::new(r"^:([\w][\w\-]*):(?:[ \t]+(.*))?$")
            .expect("Invalid attribute regex"),
        attribute_unset: Regex::new(r"^:(?:!([\w][\w\-]*)|([\w][\w\-]*)!):\s*$")
            .expect("Invalid attribute unset regex"),
        include: Regex::new(r"^\s*include::([^\[]+)\[([^\]]*)\]").expect("Invalid include regex"),
        heading: Regex::new(r"^(=+)\s+(\S.*)").expect("Invalid heading regex"),
        id_brackets: Regex::new(r"^\s*\[\[\s*([^\s,\]]+)\s*(?:,[^\]]*)?\]\]\s*$")
            .expect("Invalid ID regex"),
        id_attribute: Regex::new(r#"^\s*\[id\s*=\s*['"]\s*([^\s'"]+)\s*['"]\]\s*$"#)
            .expect("Invalid ID attribute regex"),
        metadata: Regex::new(r"^\s*//\s*(\w+)\s*:\s*(.*)$").expect("Invalid metadata regex"),
    })
}

impl<'a> Directive<'a> {
    /// Classify a single line (without its line terminator).
    pub fn classify(line: &'a str) -> Self {
        let p = patterns();

        if line.trim().is_empty() {
            return Directive::Blank;
        }

        if line.starts_with("if") || line.starts_with("endif") {
            if let Some(caps) = p.ifdef.captures(line) {
                return Directive::IfDef {
                    condition: Condition::new(group(&caps, 1)),
                    inline: non_empty(group(&caps, 2)),
                };
            }
            if let Some(caps) = p.ifndef.captures(line) {
                return Directive::IfNDef {
                    condition: Condition::new(group(&caps, 1)),
                    inline: non_empty(group(&caps, 2)),
                };
            }
            if let Some(caps) = p.ifeval.captures(line) {
                return Directive::IfEval {
                    expression: group(&caps, 1),
                };
            }
            if let Some(caps) = p.endif.captures(line) {
                return Directive::EndIf {
                    name: group(&caps, 1).trim(),
                };
            }
        }

        if let Some(caps) = p.tag.captures(line) {
            let name = group(&caps, 2);
            return match group(&caps, 1) {
                "tag" => Directive::TagStart(name),
                _ => Directive::TagEnd(name),
            };
        }

        if line.starts_with(':') {
            if let Some(caps) = p.attribute.captures(line) {
                return Directive::Attribute {
                    name: group(&caps, 1),
                    value: group(&caps, 2).trim(),
                };
            }
            if let Some(caps) = p.attribute_unset.captures(line) {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map_or("", |m| m.as_str());
                return Directive::AttributeUnset { name };
            }
        }

        if let Some(caps) = p.include.captures(line) {
            return Directive::Include {
                target: group(&caps, 1).trim(),
                options: group(&caps, 2),
            };
        }

        if let Some(caps) = p.heading.captures(line) {
            return Directive::Heading {
                level: group(&caps, 1).len(),
                title: group(&caps, 2).trim_end(),
            };
        }

        if let Some(caps) = p
            .id_brackets
            .captures(line)
            .or_else(|| p.id_attribute.captures(line))
        {
            return Directive::Id(group(&caps, 1));
        }

        if let Some(caps) = p.metadata.captures(line) {
            return Directive::Metadata {
                key: group(&caps, 1),
                value: group(&caps, 2).trim_end(),
            };
        }

        Directive::Text
    }

    /// Whether the line opens or closes a conditional region
    pub fn is_conditional(&self) -> bool {
        matches!(
            self,
            Directive::IfDef { .. }
                | Directive::IfNDef { .. }
                | Directive::IfEval { .. }
                | Directive::EndIf { .. }
        )
    }
}

/// Byte range of the anchor ID on an ID line
pub fn id_span(line: &str) -> Option<Range<usize>> {
    let p = patterns();
    p.id_brackets
        .captures(line)
        .or_else(|| p.id_attribute.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.range())
}

fn group<'a>(caps: &regex::Captures<'a>, index: usize) -> &'a str {
    caps.get(index).map_or("", |m| m.as_str())
}

fn non_empty(text: &str) -> Option<&str> {
    if text.is_empty() { None } else { Some(text) }
}
