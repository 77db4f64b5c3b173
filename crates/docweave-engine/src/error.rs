use relative_path::RelativePathBuf;
use std::path::PathBuf;

/// Fatal conditions. Anything recoverable is logged with `log::warn!` instead.
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("Include file not found: {path} (included from {included_from})")]
    IncludeNotFound {
        path: PathBuf,
        included_from: PathBuf,
    },
    #[error("Include cycle detected at {0}")]
    IncludeCycle(PathBuf),
    #[error("Heading '{title}' in {file} must have a module ID")]
    MissingModuleId { title: String, file: PathBuf },
    #[error("Module '{0}' has no category")]
    MissingCategory(String),
    #[error("Found ID with embedded {{context}}, but no context attribute defined (file: {file}, ID: {id})")]
    UndefinedContext { file: PathBuf, id: String },
    #[error("No title found in book file: {0}")]
    MissingBookTitle(PathBuf),
    #[error("Generated file {0} was already written by this run")]
    ModuleCollision(RelativePathBuf),
    #[error("Module file already exists: {0}")]
    ModuleExists(PathBuf),
    #[error("{file}: {message}")]
    ContextBoilerplate { file: PathBuf, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

pub type Result<T, E = DocError> = std::result::Result<T, E>;
