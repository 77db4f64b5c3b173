use crate::app::{GlobalOptions, ModuleArgs, UpdateArgs};
use crate::prompt::TerminalResolver;
use anyhow::{Context, Result, bail};
use docweave_config::{Config, LayoutConfig};
use docweave_engine::update::{
    ContextOptions, add_contexts, create_module, default_id_prefix, fix_includes, fix_links,
    generate_ids, update_parent_assemblies,
};
use docweave_engine::{
    AttributeTable, ConditionSet, FileKind, FsModuleFactory, Layout, MetadataField, MetadataRecord,
    PresetResolver, Project, SplitOptions, Splitter, export_csv, find_orphans, index_single,
    resolve_document, split_files,
};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

fn layout_from(config: &LayoutConfig) -> Layout {
    Layout {
        assemblies_dir: config.assemblies_dir.clone(),
        modules_dir: config.modules_dir.clone(),
        images_dir: config.images_dir.clone(),
        assembly_prefix: config.assembly_prefix.clone(),
        procedure_prefix: config.procedure_prefix.clone(),
        concept_prefix: config.concept_prefix.clone(),
        reference_prefix: config.reference_prefix.clone(),
        book_file: config.book_file.clone(),
    }
}

/// Project, configuration and seeded attributes for one invocation
pub struct Session {
    pub project: Project,
    pub config: Config,
    pub attributes: AttributeTable,
    allow_prompt: bool,
}

impl Session {
    pub fn open(global: &GlobalOptions) -> Result<Self> {
        let root = global.project_dir.canonicalize().with_context(|| {
            format!("Project directory {} not found", global.project_dir.display())
        })?;
        let config = Config::load_from_dir(&root)?;
        log::debug!("Project root: {}", root.display());

        let mut attribute_files = config.attribute_files_in(&root);
        attribute_files.extend(global.attribute_files.iter().map(|file| root.join(file)));
        if attribute_files.is_empty() {
            log::debug!("No attribute files specified");
        }
        let mut attributes = AttributeTable::new();
        attributes.load_files(&attribute_files)?;

        Ok(Self {
            project: Project::new(&root, layout_from(&config.layout)),
            config,
            attributes,
            allow_prompt: !global.no_prompt,
        })
    }

    /// A user-supplied path, taken relative to the project root
    fn path(&self, path: &Path) -> PathBuf {
        self.project.root().join(path)
    }

    fn chooser(&self) -> PresetResolver<TerminalResolver> {
        PresetResolver::new(
            self.config.links.preferred.clone(),
            TerminalResolver::new(self.allow_prompt),
        )
    }

    /// Command-line conditions, else configured ones, else no filtering
    fn conditions(&self, requested: Option<&[String]>) -> Option<ConditionSet> {
        match requested {
            Some(names) => Some(names.iter().map(|n| n.trim()).collect()),
            None if !self.config.conditions.is_empty() => {
                Some(self.config.conditions.iter().map(String::as_str).collect())
            }
            None => None,
        }
    }

    /// Files named by a path or a `{}` pattern, relative to the project root
    fn matching_files(&self, file: &str) -> Result<Vec<PathBuf>> {
        if !file.contains("{}") {
            return Ok(vec![self.path(Path::new(file))]);
        }
        let pattern = self.path(Path::new(&file.replace("{}", "*")));
        let mut files = Vec::new();
        for entry in glob::glob(&pattern.to_string_lossy())? {
            files.push(entry?);
        }
        Ok(files)
    }
}

pub fn split(
    session: &mut Session,
    from_file: &str,
    legacy_base_dir: Option<&Path>,
    category_prefix: Option<&str>,
    conditions: Option<&[String]>,
    timestamp: bool,
) -> Result<()> {
    let configured = &session.config.split;
    let options = SplitOptions {
        category_prefix: category_prefix
            .map(str::to_string)
            .or_else(|| configured.category_prefix.clone()),
        legacy_base_dir: legacy_base_dir
            .map(Path::to_path_buf)
            .or_else(|| configured.legacy_base_dir.clone())
            .map(|dir| session.path(&dir)),
        conditions: session.conditions(conditions),
    };
    let stamp = timestamp || configured.timestamp;
    let pattern = session.path(Path::new(from_file)).to_string_lossy().into_owned();

    let mut factory = FsModuleFactory::new(session.project.clone());
    let mut splitter = Splitter::new(&mut factory, session.project.root());
    if stamp {
        splitter = splitter.with_timestamp();
    }
    let generated = split_files(&pattern, &mut session.attributes, &options, &mut splitter)?;
    if generated.is_empty() {
        log::warn!("No files generated from {from_file}");
    }

    let mut out = io::stdout().lock();
    for file in generated {
        writeln!(out, "{file}")?;
    }
    Ok(())
}

pub fn resolve(session: &mut Session, file: &Path, conditions: Option<&[String]>) -> Result<()> {
    let file = session.path(file);
    let conditions = session.conditions(conditions);
    let lines = resolve_document(&file, &mut session.attributes, conditions.as_ref())?;

    let mut out = io::stdout().lock();
    for line in lines {
        writeln!(out, "{}", line.text)?;
    }
    Ok(())
}

/// Files an update applies to
#[derive(Debug, Default, PartialEq)]
struct Scope {
    assemblies: Vec<PathBuf>,
    modules: Vec<PathBuf>,
}

impl Scope {
    fn all(&self) -> Vec<PathBuf> {
        self.assemblies.iter().chain(&self.modules).cloned().collect()
    }
}

fn update_scope(session: &Session, args: &UpdateArgs) -> Result<Scope> {
    let project = &session.project;

    if let Some(file) = &args.file {
        let single = !file.contains("{}");
        let mut scope = Scope::default();
        for path in session.matching_files(file)? {
            if !path.exists() {
                bail!("File does not exist: {}", path.display());
            }
            match project.kind_of(&path) {
                FileKind::Assembly => scope.assemblies.push(path),
                FileKind::Module if single => {
                    bail!("File must be a module or an assembly: {}", path.display())
                }
                FileKind::Module => log::warn!("Skipping {}: not a module or assembly", path.display()),
                _ => scope.modules.push(path),
            }
        }
        return Ok(scope);
    }

    let categories: BTreeSet<String> = if let Some(list) = &args.category_list {
        list.iter().map(|c| c.trim().to_string()).collect()
    } else if let Some(book) = &args.book {
        let book = session.path(book);
        if !book.is_dir() {
            bail!("{} directory does not exist.", book.display());
        }
        let layout = project.layout();
        let mut categories = project.categories(&book.join(&layout.modules_dir).to_string_lossy())?;
        categories.extend(project.categories(&book.join(&layout.assemblies_dir).to_string_lossy())?);
        categories
    } else {
        project.all_categories()?
    };

    let (assemblies, modules) = project.categorised_files(&categories)?;
    Ok(Scope {
        assemblies,
        modules,
    })
}

pub fn update(session: &mut Session, args: &UpdateArgs) -> Result<()> {
    if !args.any_operation() {
        bail!("Missing required option(s): choose at least one update to run");
    }
    let scope = update_scope(session, args)?;
    log::info!(
        "Updating {} assemblies and {} modules",
        scope.assemblies.len(),
        scope.modules.len()
    );
    let mut chooser = session.chooser();

    if args.fix_includes {
        let changed = fix_includes(&session.project, &scope.assemblies, &scope.modules, &mut chooser)?;
        log::info!("Fixed includes in {changed} files");
    }
    if args.fix_links {
        let changed = fix_links(&session.project, &mut session.attributes, &scope.all(), &mut chooser)?;
        log::info!("Fixed links in {changed} files");
    }
    if args.parent_assemblies {
        let changed = update_parent_assemblies(&session.project, &scope.assemblies, &session.attributes)?;
        log::info!("Updated parent assemblies in {changed} files");
    }
    if args.generate_ids {
        for file in scope.all() {
            let prefix = match &args.id_prefix {
                Some(prefix) => prefix.clone(),
                None => default_id_prefix(&session.project, &file),
            };
            generate_ids(&file, &prefix)?;
        }
    }
    if args.add_contexts {
        let options = ContextOptions {
            hash_contexts: args.hash_contexts,
        };
        for assembly in &scope.assemblies {
            add_contexts(assembly, true, &options)?;
        }
        for module in &scope.modules {
            add_contexts(module, false, &options)?;
        }
    }
    Ok(())
}

pub fn orphan(session: &Session, category_list: Option<&[String]>) -> Result<()> {
    let filter: Option<BTreeSet<String>> =
        category_list.map(|list| list.iter().map(|c| c.trim().to_string()).collect());
    let orphans = find_orphans(&session.project, &session.attributes, filter.as_ref())?;

    let mut out = io::stdout().lock();
    for file in orphans {
        writeln!(out, "{}", session.project.display(&file))?;
    }
    Ok(())
}

pub fn csv(session: &mut Session, file: &Path, cols: Option<&[String]>) -> Result<()> {
    let file = session.path(file);
    if !file.exists() {
        bail!("File does not exist: {}", file.display());
    }
    let registry = index_single(&session.project, &mut session.attributes, &file)?;
    if registry.records().is_empty() {
        log::warn!("No titled anchors found in {}", file.display());
    }
    print!("{}", export_csv(registry.records(), cols));
    Ok(())
}

fn module_metadata(kind: FileKind, args: &ModuleArgs) -> MetadataRecord {
    let mut metadata = MetadataRecord::new()
        .with(MetadataField::Type, kind.as_str())
        .with(MetadataField::Category, args.category.as_str())
        .with(MetadataField::ModuleID, args.module_id.as_str());
    let optional = [
        (MetadataField::Title, &args.title),
        (MetadataField::UserStory, &args.user_story),
        (MetadataField::Jira, &args.jira),
    ];
    for (field, value) in optional {
        if let Some(value) = value {
            metadata.set(field, value.as_str());
        }
    }
    metadata
}

pub fn create(session: &Session, kind: FileKind, args: &ModuleArgs) -> Result<()> {
    let metadata = module_metadata(kind, args);
    let parents: Vec<PathBuf> = args
        .parent_assemblies
        .iter()
        .map(|assembly| session.path(assembly))
        .collect();

    let mut factory = FsModuleFactory::new(session.project.clone());
    let created = create_module(&session.project, &mut factory, &metadata, &parents)?;
    println!("{created}");
    Ok(())
}
