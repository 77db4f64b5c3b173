use crate::ambiguity::AmbiguityResolver;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary project directory
pub fn create_test_project() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Create a file (and its parent directories) inside the test project
pub fn create_test_file(project: &TempDir, relative: &str, content: &str) -> PathBuf {
    let file_path = project.path().join(relative);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&file_path, content).unwrap();
    file_path
}

/// Ambiguity resolver that replays scripted answers and records each question
#[derive(Debug, Default)]
pub struct ScriptedResolver {
    pub answers: VecDeque<Option<usize>>,
    pub asked: Vec<Vec<String>>,
}

impl ScriptedResolver {
    pub fn new(answers: impl IntoIterator<Item = Option<usize>>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }
}

impl AmbiguityResolver for ScriptedResolver {
    fn choose(&mut self, _subject: &str, candidates: &[String]) -> Option<usize> {
        self.asked.push(candidates.to_vec());
        self.answers.pop_front().flatten()
    }
}
