use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// docweave - include resolution, splitting and link repair for modular AsciiDoc
#[derive(Debug, Parser)]
#[command(name = "docweave", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Args)]
pub struct GlobalOptions {
    /// Project directory holding docweave.toml and the assemblies/modules trees.
    #[arg(short = 'C', long, global = true, value_name = "DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// Comma-separated attribute files, in addition to those configured.
    #[arg(short, long, global = true, value_delimiter = ',', value_name = "FILES")]
    pub attribute_files: Vec<PathBuf>,

    /// Enable debug-level logging.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Never prompt; ambiguous choices not settled by configuration are skipped.
    #[arg(long, global = true)]
    pub no_prompt: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Split an annotated AsciiDoc file into assemblies and modules.
    Split {
        /// Annotated file; `{}` matches any text.
        #[arg(value_name = "FROM_FILE")]
        from_file: String,

        /// Subdirectories of this directory become default categories.
        #[arg(long = "legacybasedir", value_name = "DIR")]
        legacy_base_dir: Option<PathBuf>,

        /// Prefix added to default categories.
        #[arg(long)]
        category_prefix: Option<String>,

        /// Comma-separated condition attributes for resolving ifdef/ifndef.
        #[arg(long, value_delimiter = ',')]
        conditions: Option<Vec<String>>,

        /// Stamp generated files with the conversion time.
        #[arg(long)]
        timestamp: bool,
    },

    /// Print the flattened line stream of a file.
    Resolve {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Comma-separated condition attributes; omit to keep conditionals.
        #[arg(long, value_delimiter = ',')]
        conditions: Option<Vec<String>>,
    },

    /// Repair and annotate existing modules and assemblies.
    Update(UpdateArgs),

    /// List modules and assemblies no book includes.
    Orphan {
        /// Only report files in these comma-separated categories.
        #[arg(short, long, value_delimiter = ',')]
        category_list: Option<Vec<String>>,
    },

    /// Print a CSV of the anchors of an assembly or book.
    Csv {
        #[arg(value_name = "ASSEMBLY_OR_BOOK_FILE")]
        file: PathBuf,

        /// Comma-separated column headers.
        #[arg(short, long, value_delimiter = ',')]
        cols: Option<Vec<String>>,
    },

    /// Generate an assembly.
    Assembly(ModuleArgs),

    /// Generate a procedure module.
    Procedure(ModuleArgs),

    /// Generate a concept module.
    Concept(ModuleArgs),

    /// Generate a reference module.
    Reference(ModuleArgs),
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Point includes with missing targets at the renamed or moved file.
    #[arg(long)]
    pub fix_includes: bool,

    /// Repair cross-reference links against the anchors of every book.
    #[arg(long)]
    pub fix_links: bool,

    /// Record the including assemblies in each module's metadata.
    #[arg(short, long)]
    pub parent_assemblies: bool,

    /// Insert IDs above headings that have none.
    #[arg(long)]
    pub generate_ids: bool,

    /// ID prefix for --generate-ids.
    #[arg(long, requires = "generate_ids")]
    pub id_prefix: Option<String>,

    /// Add `_{context}` to IDs and context boilerplate around includes.
    #[arg(long)]
    pub add_contexts: bool,

    /// Use hashes instead of literal IDs in generated contexts.
    #[arg(long, requires = "add_contexts")]
    pub hash_contexts: bool,

    /// Only update these comma-separated categories.
    #[arg(short, long, value_delimiter = ',', conflicts_with_all = ["file", "book"])]
    pub category_list: Option<Vec<String>>,

    /// Only update the categories linked into this book directory.
    #[arg(short, long, value_name = "BOOK_DIR", conflicts_with = "file")]
    pub book: Option<PathBuf>,

    /// A module or assembly file, or a pattern where `{}` matches any text.
    #[arg(value_name = "FILE")]
    pub file: Option<String>,
}

impl UpdateArgs {
    pub fn any_operation(&self) -> bool {
        self.fix_includes
            || self.fix_links
            || self.parent_assemblies
            || self.generate_ids
            || self.add_contexts
    }
}

#[derive(Debug, Args)]
pub struct ModuleArgs {
    /// Category to store the file in; `/` separates sub-categories.
    #[arg(value_name = "CATEGORY")]
    pub category: String,

    /// Unique ID of the new file.
    #[arg(value_name = "MODULE_ID")]
    pub module_id: String,

    /// Title (defaults to the module ID).
    #[arg(short, long)]
    pub title: Option<String>,

    /// Text of a user story.
    #[arg(short, long)]
    pub user_story: Option<String>,

    /// Related Jira issue.
    #[arg(short, long)]
    pub jira: Option<String>,

    /// Space-separated assemblies that should include the new file.
    #[arg(short, long, value_delimiter = ' ')]
    pub parent_assemblies: Vec<PathBuf>,
}
