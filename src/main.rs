//! tunetree - A live, searchable tree view over music folders.
//!
//! Usage:
//!   tunetree tree [PATH]                  Show the library tree
//!   tunetree songs [PATH]                 List songs with their tags
//!   tunetree search QUERY [PATH]          Show the pruned tree of matches
//!   tunetree export [PATH]                Export the tree to JSON
//!   tunetree mv SOURCE DEST               Move into a folder and show the result
//!   tunetree cp SOURCE DEST               Copy into a folder and show the result
//!   tunetree rename SOURCE NAME           Rename in place and show the result
//!   tunetree rm TARGET                    Delete (to trash by default)
//!   tunetree add PATH | forget PATH       Manage registered libraries
//!   tunetree --help                       Show help

mod settings;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail, eyre};
use itertools::Itertools;
use tracing_subscriber::EnvFilter;

use tunetree_core::{Item, NodeId, Tree};
use tunetree_ops::{ConflictResolution, FileOperation, LocalFileOps};
use tunetree_search::{
    FieldQuery, FuzzyQuery, GlobQuery, NameQuery, RegexQuery, SearchOptions, SearchOutcome,
    SearchPredicate,
};
use tunetree_sync::{Library, LibrarySet, SyncOutcome};

use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "tunetree",
    version,
    about = "A live, searchable tree view over music folders",
    long_about = "tunetree mirrors music folders as trees of folders and songs.\n\n\
                  Register libraries with `tunetree add PATH`; commands without a \
                  PATH then work on every registered library."
)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the library tree
    Tree {
        /// Library root (defaults to registered libraries, then ".")
        path: Option<PathBuf>,

        /// Maximum depth to display
        #[arg(short, long)]
        depth: Option<usize>,

        /// Show collapsed folders' contents too
        #[arg(short, long)]
        all: bool,
    },

    /// List every song
    Songs {
        /// Library root
        path: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Search names or tags and show the matching tree
    Search {
        /// Text, glob or regex to look for
        query: String,

        /// Library root
        path: Option<PathBuf>,

        /// How to interpret the query
        #[arg(short, long, default_value = "name")]
        mode: SearchMode,

        /// Match a song tag instead of the name (title, artist, album, genre)
        #[arg(long, conflicts_with = "mode")]
        field: Option<String>,

        /// Also show the files directly inside matching folders
        #[arg(long)]
        files_in_folders: bool,

        /// Respect case (name and regex modes)
        #[arg(short = 'c', long)]
        case_sensitive: bool,
    },

    /// Export the tree to JSON
    Export {
        /// Library root
        path: Option<PathBuf>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Move a file or folder into another folder
    Mv {
        source: PathBuf,
        destination: PathBuf,

        /// What to do when the destination name is taken
        #[arg(long, default_value = "skip")]
        on_conflict: OnConflict,
    },

    /// Copy a file or folder into another folder
    Cp {
        source: PathBuf,
        destination: PathBuf,

        /// What to do when the destination name is taken
        #[arg(long, default_value = "skip")]
        on_conflict: OnConflict,
    },

    /// Rename a file or folder in place
    Rename { source: PathBuf, new_name: String },

    /// Delete a file or folder
    Rm {
        target: PathBuf,

        /// Delete permanently instead of moving to the trash
        #[arg(long)]
        permanent: bool,
    },

    /// Register a library
    Add { path: PathBuf },

    /// Unregister a library (files are left alone)
    Forget { path: PathBuf },

    /// List registered libraries
    Libraries,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum SearchMode {
    #[default]
    Name,
    Glob,
    Regex,
    Fuzzy,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OnConflict {
    #[default]
    Skip,
    Overwrite,
    Rename,
}

impl From<OnConflict> for ConflictResolution {
    fn from(value: OnConflict) -> Self {
        match value {
            OnConflict::Skip => ConflictResolution::Skip,
            OnConflict::Overwrite => ConflictResolution::Overwrite,
            OnConflict::Rename => ConflictResolution::AutoRename,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut settings = Settings::load();

    match cli.command {
        Command::Tree { path, depth, all } => {
            let libraries = open_libraries(&settings, path)?;
            for library in libraries.iter() {
                print_tree(library.tree(), library.tree().root(), depth, all);
            }
        }
        Command::Songs { path, format } => {
            let libraries = open_libraries(&settings, path)?;
            run_songs(&libraries, format)?;
        }
        Command::Search {
            query,
            path,
            mode,
            field,
            files_in_folders,
            case_sensitive,
        } => {
            let predicate = build_predicate(&query, mode, field.as_deref(), case_sensitive)?;
            let options = SearchOptions {
                show_files_in_folder_hits: files_in_folders
                    || settings.search.show_files_in_folder_hits,
            };
            let libraries = open_libraries(&settings, path)?;
            run_search(&libraries, predicate.as_ref(), options);
        }
        Command::Export { path, output } => {
            let libraries = open_libraries(&settings, path)?;
            run_export(&libraries, output)?;
        }
        Command::Mv {
            source,
            destination,
            on_conflict,
        } => {
            let ops = LocalFileOps::new().with_resolution(on_conflict.into());
            let source = canonical(&source)?;
            let operation = FileOperation::move_to(&source, canonical(&destination)?);
            run_operation(&mut settings, &ops, &source, operation)?;
        }
        Command::Cp {
            source,
            destination,
            on_conflict,
        } => {
            let ops = LocalFileOps::new().with_resolution(on_conflict.into());
            let source = canonical(&source)?;
            let operation = FileOperation::copy(&source, canonical(&destination)?);
            run_operation(&mut settings, &ops, &source, operation)?;
        }
        Command::Rename { source, new_name } => {
            let source = canonical(&source)?;
            let operation = FileOperation::rename(&source, new_name);
            run_operation(&mut settings, &LocalFileOps::new(), &source, operation)?;
        }
        Command::Rm { target, permanent } => {
            let target = canonical(&target)?;
            let operation = FileOperation::delete(&target, !permanent);
            run_operation(&mut settings, &LocalFileOps::new(), &target, operation)?;
        }
        Command::Add { path } => {
            let root = canonical(&path)?;
            let mut libraries = LibrarySet::new();
            let library = libraries
                .add(&root, settings.library.clone(), &HashSet::new())
                .context("Could not open library")?;
            eprintln!(
                "{} ({} songs)",
                library.root().display(),
                library.songs().count()
            );
            if !settings.register(root.clone()) {
                bail!("{} is already registered", root.display());
            }
            settings.save().context("Could not save settings")?;
        }
        Command::Forget { path } => {
            let root = path.canonicalize().unwrap_or(path);
            if !settings.forget(&root) {
                bail!("{} is not registered", root.display());
            }
            settings.save().context("Could not save settings")?;
        }
        Command::Libraries => {
            for entry in &settings.libraries {
                println!("{}", entry.root.display());
            }
        }
    }

    Ok(())
}

/// Install the tracing subscriber on stderr.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn canonical(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .with_context(|| format!("Invalid path: {}", path.display()))
}

/// Open the library at `path`, or every registered library when none is given.
fn open_libraries(settings: &Settings, path: Option<PathBuf>) -> Result<LibrarySet> {
    let roots: Vec<(PathBuf, HashSet<PathBuf>)> = match path {
        Some(path) => {
            let root = canonical(&path)?;
            let expanded = settings.expanded_for(&root);
            vec![(root, expanded)]
        }
        None if settings.libraries.is_empty() => vec![(canonical(Path::new("."))?, HashSet::new())],
        None => settings
            .libraries
            .iter()
            .map(|entry| (entry.root.clone(), settings.expanded_for(&entry.root)))
            .collect(),
    };

    let mut libraries = LibrarySet::new();
    for result in libraries.add_all(roots, &settings.library) {
        if let Err(err) = result {
            tracing::warn!(error = %err, "skipping library");
            eprintln!("warning: {err}");
        }
    }
    if libraries.is_empty() {
        bail!("No library could be opened");
    }

    for library in libraries.iter() {
        let warnings = library.tree().warnings().len();
        if warnings > 0 {
            eprintln!("{warnings} warning(s) while reading {}", library.root().display());
        }
    }
    Ok(libraries)
}

fn build_predicate(
    query: &str,
    mode: SearchMode,
    field: Option<&str>,
    case_sensitive: bool,
) -> Result<Box<dyn SearchPredicate>> {
    if let Some(field) = field {
        return Ok(Box::new(FieldQuery::parse(field, query)?));
    }
    let predicate: Box<dyn SearchPredicate> = match mode {
        SearchMode::Name if case_sensitive => Box::new(NameQuery::case_sensitive(query)),
        SearchMode::Name => Box::new(NameQuery::new(query)),
        SearchMode::Glob => Box::new(GlobQuery::new(query)?),
        SearchMode::Regex => Box::new(RegexQuery::new(query, case_sensitive)?),
        SearchMode::Fuzzy => Box::new(FuzzyQuery::new(query)),
    };
    Ok(predicate)
}

fn run_songs(libraries: &LibrarySet, format: OutputFormat) -> Result<()> {
    let songs = libraries
        .iter()
        .flat_map(|library| library.songs())
        .map(|song| song.snapshot())
        .filter_map(|item| match item {
            Item::Song(song) => Some(song),
            Item::Folder(_) => None,
        })
        .collect_vec();

    match format {
        OutputFormat::Text => {
            for song in &songs {
                let tags = [&song.meta.artist, &song.meta.album, &song.meta.title]
                    .into_iter()
                    .flatten()
                    .join(" / ");
                let duration = song
                    .meta
                    .duration
                    .map(|d| format!(" [{}]", format_duration(d.as_secs())))
                    .unwrap_or_default();
                if tags.is_empty() {
                    println!("{}{duration}", song.path.display());
                } else {
                    println!("{}  ({tags}){duration}", song.path.display());
                }
            }
            eprintln!("{} song(s)", songs.len());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&songs)?);
        }
    }
    Ok(())
}

fn run_search(libraries: &LibrarySet, predicate: &dyn SearchPredicate, options: SearchOptions) {
    let mut found = 0;
    for library in libraries.iter() {
        match library.search(predicate, options) {
            SearchOutcome::Found(result) => {
                found += result.descendants(result.root()).skip(1).count();
                print_tree(&result, result.root(), None, false);
            }
            SearchOutcome::Empty => {
                tracing::debug!(root = %library.root().display(), "no matches");
            }
        }
    }
    if found == 0 {
        eprintln!("No matches.");
    }
}

fn run_export(libraries: &LibrarySet, output: Option<PathBuf>) -> Result<()> {
    let snapshots = libraries
        .iter()
        .filter_map(Library::snapshot)
        .collect_vec();
    let json = if snapshots.len() == 1 {
        serde_json::to_string_pretty(&snapshots[0])?
    } else {
        serde_json::to_string_pretty(&snapshots)?
    };

    match output {
        Some(output_path) => {
            std::fs::write(&output_path, json)?;
            eprintln!("Exported to {}", output_path.display());
        }
        None => {
            println!("{}", json);
        }
    }
    Ok(())
}

/// Run a file operation inside the library owning `subject`, then show the result.
fn run_operation(
    settings: &mut Settings,
    ops: &LocalFileOps,
    subject: &Path,
    operation: FileOperation,
) -> Result<()> {
    let root = match settings.owner_of(subject) {
        Some(entry) => entry.root.clone(),
        None => subject
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| eyre!("{} has no parent folder", subject.display()))?,
    };

    let mut library = Library::open(&root, settings.library.clone(), &settings.expanded_for(&root))
        .with_context(|| format!("Could not open library {}", root.display()))?;

    let outcome = library
        .perform(ops, &operation)
        .with_context(|| format!("Could not {operation}"))?;
    match outcome {
        SyncOutcome::Applied => eprintln!("Done: {operation}"),
        SyncOutcome::Ignored(reason) => eprintln!("Done on disk: {operation} (tree: {reason})"),
    }

    print_tree(library.tree(), library.tree().root(), None, false);

    settings.remember_expanded(&root, library.expanded_paths());
    if let Err(err) = settings.save() {
        tracing::warn!(error = %err, "could not save settings");
    }
    Ok(())
}

/// Print a node and its visible descendants.
fn print_tree(tree: &Tree, id: NodeId, max_depth: Option<usize>, all: bool) {
    print_node(tree, id, 0, max_depth.unwrap_or(usize::MAX), all);
}

fn print_node(tree: &Tree, id: NodeId, depth: usize, max_depth: usize, all: bool) {
    let Some(item) = tree.item(id) else {
        return;
    };
    let item = item.read();
    let indent = "  ".repeat(depth);
    let open = all || tree.is_expanded(id);

    let marker = match &*item {
        Item::Folder(_) if !tree.has_children(id) => "  ",
        Item::Folder(_) if open => "▼ ",
        Item::Folder(_) => "▶ ",
        Item::Song(_) => "♪ ",
    };
    let suffix = if item.is_folder() && !item.is_root() { "/" } else { "" };
    println!("{indent}{marker}{}{suffix}", item.label());
    drop(item);

    if open && depth < max_depth {
        for &child in tree.children(id) {
            print_node(tree, child, depth + 1, max_depth, all);
        }
    }
}

/// Format seconds as m:ss or h:mm:ss.
fn format_duration(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}
