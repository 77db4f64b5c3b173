//! Operator-mediated choice between equally plausible candidates.
//!
//! Link repair and include repair both reach points where several targets
//! fit (two anchors sharing a root ID, two module files with the same
//! normalised name). The algorithms never prompt by themselves; they ask an
//! [`AmbiguityResolver`], which may be a terminal prompt, a configured table
//! of preferences, or a scripted test double.

use std::collections::BTreeMap;

pub trait AmbiguityResolver {
    /// Pick one of `candidates` for `subject`, or `None` to skip and leave
    /// the reference unchanged.
    fn choose(&mut self, subject: &str, candidates: &[String]) -> Option<usize>;
}

/// Always skips. The default when nobody can be asked.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipResolver;

impl AmbiguityResolver for SkipResolver {
    fn choose(&mut self, subject: &str, candidates: &[String]) -> Option<usize> {
        log::debug!(
            "Skipping ambiguous choice for {subject} ({} candidates)",
            candidates.len()
        );
        None
    }
}

/// Answers from a fixed subject → candidate table, deferring to a fallback
/// resolver for anything not listed.
pub struct PresetResolver<R> {
    preferred: BTreeMap<String, String>,
    fallback: R,
}

impl<R: AmbiguityResolver> PresetResolver<R> {
    pub fn new(preferred: BTreeMap<String, String>, fallback: R) -> Self {
        Self {
            preferred,
            fallback,
        }
    }
}

impl<R: AmbiguityResolver> AmbiguityResolver for PresetResolver<R> {
    fn choose(&mut self, subject: &str, candidates: &[String]) -> Option<usize> {
        if let Some(wanted) = self.preferred.get(subject) {
            if let Some(index) = candidates.iter().position(|c| c == wanted) {
                return Some(index);
            }
            log::warn!("Preferred target {wanted} for {subject} is not among the candidates");
        }
        self.fallback.choose(subject, candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ScriptedResolver;

    fn candidates() -> Vec<String> {
        vec!["setup_a".to_string(), "setup_b".to_string()]
    }

    #[test]
    fn test_skip_resolver_never_chooses() {
        assert_eq!(SkipResolver.choose("setup", &candidates()), None);
    }

    #[test]
    fn test_preset_resolver_uses_table() {
        let preferred = BTreeMap::from([("setup".to_string(), "setup_b".to_string())]);
        let mut resolver = PresetResolver::new(preferred, SkipResolver);

        assert_eq!(resolver.choose("setup", &candidates()), Some(1));
    }

    #[test]
    fn test_preset_resolver_falls_back_for_unknown_subject() {
        let mut resolver = PresetResolver::new(BTreeMap::new(), ScriptedResolver::new([Some(0)]));

        assert_eq!(resolver.choose("setup", &candidates()), Some(0));
    }

    #[test]
    fn test_preset_resolver_falls_back_when_preference_is_stale() {
        let preferred = BTreeMap::from([("setup".to_string(), "setup_gone".to_string())]);
        let mut resolver = PresetResolver::new(preferred, SkipResolver);

        assert_eq!(resolver.choose("setup", &candidates()), None);
    }
}
