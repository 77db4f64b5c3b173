//! Stack-based evaluation of `ifdef`/`ifndef`/`ifeval`/`endif` regions.
//!
//! Directive lines are always interpreted, even inside hidden regions, so the
//! stack stays balanced; they are never emitted. `ifeval` is not evaluated:
//! its region is shown and a warning is logged.

use crate::directive::{Condition, Directive};
use crate::resolve::ResolvedLine;
use std::collections::BTreeSet;

/// Condition names the operator declared active
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionSet(BTreeSet<String>);

impl ConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list such as `cloud, edge`
    pub fn parse_list(list: &str) -> Self {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect()
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.0.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn holds(&self, condition: &Condition<'_>) -> bool {
        condition.holds(|name| self.contains(name))
    }
}

impl<S: Into<String>> FromIterator<S> for ConditionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone)]
struct Frame {
    name: String,
    saved_visible: bool,
}

/// Visibility flag plus the (condition, prior visibility) frames that led to it
#[derive(Debug, Clone)]
pub struct ConditionStack {
    frames: Vec<Frame>,
    visible: bool,
}

impl ConditionStack {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            visible: true,
        }
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Open a region; `show` is whether its own condition holds
    pub fn push(&mut self, name: &str, show: bool) {
        self.frames.push(Frame {
            name: name.to_string(),
            saved_visible: self.visible,
        });
        if !show {
            self.visible = false;
        }
    }

    /// Close the innermost region. A name that does not match is reported
    /// and the pop happens anyway.
    pub fn pop(&mut self, name: &str) {
        match self.frames.pop() {
            Some(frame) => {
                if !name.is_empty() && name != frame.name {
                    log::warn!("Unmatched condition tags: {name} != {}", frame.name);
                }
                self.visible = frame.saved_visible;
            }
            None => log::warn!("endif::{name}[] has no matching opening directive"),
        }
    }

    fn open_names(&self) -> Vec<&str> {
        self.frames.iter().map(|f| f.name.as_str()).collect()
    }
}

impl Default for ConditionStack {
    fn default() -> Self {
        Self::new()
    }
}

enum Step {
    Emit,
    Drop,
    Substitute(String),
}

pub struct ConditionalFilter<'c> {
    conditions: &'c ConditionSet,
    stack: ConditionStack,
}

impl<'c> ConditionalFilter<'c> {
    pub fn new(conditions: &'c ConditionSet) -> Self {
        Self {
            conditions,
            stack: ConditionStack::new(),
        }
    }

    /// Feed one line; returns the text to emit, if any
    pub fn process(&mut self, line: &str) -> Option<String> {
        let mut text = line.to_string();
        loop {
            let step = match Directive::classify(&text) {
                Directive::IfDef {
                    condition,
                    inline: Some(inner),
                } => {
                    if self.conditions.holds(&condition) {
                        Step::Substitute(inner.to_string())
                    } else {
                        Step::Drop
                    }
                }
                Directive::IfNDef {
                    condition,
                    inline: Some(inner),
                } => {
                    if self.conditions.holds(&condition) {
                        Step::Drop
                    } else {
                        Step::Substitute(inner.to_string())
                    }
                }
                Directive::IfDef {
                    condition,
                    inline: None,
                } => {
                    let show = self.conditions.holds(&condition);
                    self.stack.push(condition.name(), show);
                    Step::Drop
                }
                Directive::IfNDef {
                    condition,
                    inline: None,
                } => {
                    let show = !self.conditions.holds(&condition);
                    self.stack.push(condition.name(), show);
                    Step::Drop
                }
                Directive::IfEval { expression } => {
                    log::warn!("ifeval not supported: defaults to showing content ({expression})");
                    self.stack.push("", true);
                    Step::Drop
                }
                Directive::EndIf { name } => {
                    self.stack.pop(name);
                    Step::Drop
                }
                _ => Step::Emit,
            };

            match step {
                Step::Substitute(inner) => text = inner,
                Step::Drop => return None,
                Step::Emit => return self.stack.visible().then_some(text),
            }
        }
    }

    /// Filter a whole stream, keeping each surviving line's origin
    pub fn filter(&mut self, lines: Vec<ResolvedLine>) -> Vec<ResolvedLine> {
        let filtered: Vec<ResolvedLine> = lines
            .into_iter()
            .filter_map(|mut line| {
                line.text = self.process(&line.text)?;
                Some(line)
            })
            .collect();
        self.finish();
        filtered
    }

    /// Report regions still open at end of stream
    pub fn finish(&self) {
        if self.stack.depth() > 0 {
            log::warn!(
                "Unclosed conditional directives at end of document: {}",
                self.stack.open_names().join(", ")
            );
        }
    }
}

/// Apply `conditions` to a resolved stream
pub fn filter_conditionals(lines: Vec<ResolvedLine>, conditions: &ConditionSet) -> Vec<ResolvedLine> {
    ConditionalFilter::new(conditions).filter(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::texts;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::path::Path;

    fn run(lines: &[&str], active: &[&str]) -> Vec<String> {
        let conditions: ConditionSet = active.iter().copied().collect();
        let stream = ResolvedLine::from_texts(lines, Path::new("doc.adoc"));
        texts(&filter_conditionals(stream, &conditions))
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    const NESTED: &[&str] = &[
        "ifdef::a[]",
        "A1",
        "ifndef::b[]",
        "inner",
        "endif::b[]",
        "A2",
        "endif::a[]",
        "after",
    ];

    #[rstest]
    #[case(&["a"], &["A1", "inner", "A2", "after"])]
    #[case(&["a", "b"], &["A1", "A2", "after"])]
    #[case(&[], &["after"])]
    #[case(&["b"], &["after"])]
    fn test_nested_truth_table(#[case] active: &[&str], #[case] expected: &[&str]) {
        assert_eq!(run(NESTED, active), expected);
    }

    #[test]
    fn test_single_line_forms_substitute_or_skip() {
        let lines = [
            "ifdef::cloud[Cloud only.]",
            "ifndef::cloud[Not cloud.]",
            "ifdef::edge[Edge only.]",
            "ifndef::edge[Not edge.]",
        ];

        assert_eq!(run(&lines, &["cloud"]), vec!["Cloud only.", "Not edge."]);
    }

    #[test]
    fn test_single_line_form_can_carry_a_directive() {
        let lines = ["ifdef::context[:parent-context: {context}]", "text"];

        assert_eq!(
            run(&lines, &["context"]),
            vec![":parent-context: {context}", "text"]
        );
    }

    #[test]
    fn test_directives_inside_hidden_regions_keep_nesting_consistent() {
        let lines = [
            "ifdef::x[]",
            "ifdef::y[]",
            "hidden",
            "endif::y[]",
            "still hidden",
            "endif::x[]",
            "shown",
        ];

        assert_eq!(run(&lines, &["y"]), vec!["shown"]);
    }

    #[test]
    fn test_ifeval_regions_are_shown() {
        let lines = ["ifeval::[{rev} > 2]", "evaluated", "endif::[]", "after"];

        assert_eq!(run(&lines, &[]), vec!["evaluated", "after"]);
    }

    #[test]
    fn test_mismatched_endif_still_pops() {
        let lines = ["ifdef::a[]", "hidden", "endif::b[]", "visible"];

        assert_eq!(run(&lines, &[]), vec!["visible"]);
    }

    #[test]
    fn test_stray_endif_is_ignored() {
        let lines = ["endif::a[]", "visible"];

        assert_eq!(run(&lines, &[]), vec!["visible"]);
    }

    #[test]
    fn test_any_and_all_conditions() {
        let lines = [
            "ifdef::a,b[]",
            "any",
            "endif::a,b[]",
            "ifdef::a+b[]",
            "all",
            "endif::a+b[]",
        ];

        assert_eq!(run(&lines, &["b"]), vec!["any"]);
        assert_eq!(run(&lines, &["a", "b"]), vec!["any", "all"]);
    }

    #[test]
    fn test_condition_set_parse_list() {
        let set = ConditionSet::parse_list(" cloud, ,edge ");
        assert!(set.contains("cloud"));
        assert!(set.contains("edge"));
        assert!(!set.contains(""));
    }

    #[test]
    fn test_stack_restores_prior_visibility() {
        let mut stack = ConditionStack::new();
        stack.push("a", false);
        stack.push("b", true);
        assert!(!stack.visible());
        stack.pop("b");
        assert!(!stack.visible());
        stack.pop("a");
        assert!(stack.visible());
        assert_eq!(stack.depth(), 0);
    }
}
