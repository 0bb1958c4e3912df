//! `depot` — command-line surface over the depot core.
//!
//! Table state is carried between invocations as a JSON snapshot on disk
//! (`--state`, default `depot-state.json`); blobs live under the configured
//! blob root. This is a demo/administration surface, not a transport layer.

use anyhow::Context;
use clap::{Parser, Subcommand};
use depot_core::{
    config, CoreConfig, DepotService, RawUpload,
};
use depot_store::{Database, Tables};
use depot_types::human_readable_size;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "depot")]
#[command(about = "Departmental file depot CLI")]
struct Cli {
    /// Path of the JSON state snapshot
    #[arg(long, default_value = "depot-state.json")]
    state: PathBuf,

    /// Blob storage root directory (created if missing)
    #[arg(long, default_value = "blob_data")]
    blob_root: PathBuf,

    /// Acting user id recorded for attribution
    #[arg(long, default_value_t = 1)]
    actor: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a department
    CreateDepartment {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List departments
    Departments,
    /// Create a category within a department
    CreateCategory {
        department_id: u64,
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List the categories of a department
    Categories { department_id: u64 },
    /// Upload one or more files into a category
    Ingest {
        category_id: u64,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List the files of a category
    Files {
        category_id: u64,
        /// Filter by filename substring (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },
    /// Rename a file's current metadata
    Rename { file_id: u64, filename: String },
    /// Download a file's current content
    Download {
        file_id: u64,
        /// Output path (defaults to the display filename in the current dir)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Delete a file, its metadata, and its blob
    DeleteFile { file_id: u64 },
    /// Delete a category and everything it contains
    DeleteCategory { category_id: u64 },
    /// Delete a department and everything it contains
    DeleteDepartment { department_id: u64 },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("depot=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    fs::create_dir_all(&cli.blob_root)
        .with_context(|| format!("cannot create blob root {}", cli.blob_root.display()))?;

    let max_upload_bytes =
        config::max_upload_bytes_from_env_value(std::env::var("DEPOT_MAX_UPLOAD_BYTES").ok())?;
    let versioned_rename =
        config::versioned_rename_from_env_value(std::env::var("DEPOT_VERSIONED_RENAME").ok())?;
    let core_config = CoreConfig::new(cli.blob_root.clone(), max_upload_bytes, versioned_rename)?;

    let db = Database::from_tables(load_state(&cli.state)?);
    let service = DepotService::new(db, core_config)?;

    run(&cli, &service)?;

    save_state(&cli.state, &service.database().snapshot())?;
    Ok(())
}

fn run(cli: &Cli, service: &DepotService) -> anyhow::Result<()> {
    match &cli.command {
        Commands::CreateDepartment { name, description } => {
            let department = service.create_department(cli.actor, name, description.clone())?;
            println!("created department {} ({})", department.name, department.id);
        }
        Commands::Departments => {
            for department in service.list_departments() {
                println!(
                    "{:>4}  {}  {}",
                    department.id,
                    department.name,
                    department.description.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::CreateCategory {
            department_id,
            name,
            description,
        } => {
            let category =
                service.create_category(cli.actor, *department_id, name, description.clone())?;
            println!("created category {} ({})", category.name, category.id);
        }
        Commands::Categories { department_id } => {
            for category in service.list_categories(*department_id)? {
                println!(
                    "{:>4}  {}  {}",
                    category.id,
                    category.name,
                    category.description.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Ingest { category_id, files } => {
            let uploads = files
                .iter()
                .map(|path| read_upload(path))
                .collect::<anyhow::Result<Vec<_>>>()?;

            let batch = service.ingest(*category_id, cli.actor, uploads)?;
            println!("{}", batch.summary());
            for stored in &batch.succeeded {
                println!(
                    "  + {} ({}, file id {})",
                    stored.metadata.filename,
                    human_readable_size(stored.metadata.size),
                    stored.file.id
                );
            }
            for rejected in &batch.failed {
                println!("  ! {}: {}", rejected.filename, rejected.reason);
            }
        }
        Commands::Files {
            category_id,
            search,
        } => {
            let listings = match search {
                Some(query) => service.search_files(*category_id, query)?,
                None => service.list_files(*category_id)?,
            };
            for listing in listings {
                match listing.current_metadata {
                    Some(metadata) => println!(
                        "{:>4}  {}  {}  {}",
                        listing.file.id,
                        metadata.filename,
                        human_readable_size(metadata.size),
                        metadata.mime_type
                    ),
                    None => println!("{:>4}  <no metadata>", listing.file.id),
                }
            }
        }
        Commands::Rename { file_id, filename } => {
            let metadata = service.rename(*file_id, cli.actor, filename)?;
            println!("renamed file {} to {}", file_id, metadata.filename);
        }
        Commands::Download { file_id, output } => {
            let download = service.download(*file_id)?;
            let target = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(&download.filename));
            fs::write(&target, &download.content)
                .with_context(|| format!("cannot write {}", target.display()))?;
            println!(
                "wrote {} ({}) to {}",
                download.filename,
                human_readable_size(download.content.len() as u64),
                target.display()
            );
        }
        Commands::DeleteFile { file_id } => {
            service.delete_file(*file_id)?;
            println!("deleted file {file_id}");
        }
        Commands::DeleteCategory { category_id } => {
            let category = service.delete_category(*category_id)?;
            println!("deleted category {} ({})", category.name, category.id);
        }
        Commands::DeleteDepartment { department_id } => {
            let department = service.delete_department(*department_id)?;
            println!("deleted department {} ({})", department.name, department.id);
        }
    }
    Ok(())
}

/// Reads a file from disk into an upload payload, using its filename and
/// leaving MIME to content detection.
fn read_upload(path: &Path) -> anyhow::Result<RawUpload> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("cannot derive filename from {}", path.display()))?
        .to_owned();
    let content =
        fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    Ok(RawUpload {
        filename,
        mime_type: None,
        content,
    })
}

/// Loads the table snapshot, starting empty if the file does not exist yet.
fn load_state(path: &Path) -> anyhow::Result<Tables> {
    if !path.exists() {
        return Ok(Tables::default());
    }
    let raw =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("corrupt state file {}", path.display()))
}

/// Persists the table snapshot as pretty JSON.
fn save_state(path: &Path, tables: &Tables) -> anyhow::Result<()> {
    let raw = serde_json::to_string_pretty(tables)?;
    fs::write(path, raw).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}
