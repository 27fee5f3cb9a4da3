use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use aurora_rs::format::gff_reader::GffReader;
use aurora_rs::format::two_da::TwoDaReader;
use aurora_rs::resource::director::{DirectorOptions, GameId, ResourceDirector};
use aurora_rs::resource::erf::ErfArchive;
use aurora_rs::resource::exe::ExeArchive;
use aurora_rs::resource::folder::FolderArchive;
use aurora_rs::resource::key::KeyArchive;
use aurora_rs::resource::rim::RimArchive;
use aurora_rs::resource::ResourceProvider;
use aurora_rs::ResourceId;

#[derive(Parser)]
#[command(name = "aurora", about = "Inspect KotOR archives and resources")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the resources of a KEY, ERF, MOD, SAV, RIM or EXE file, or of a directory.
    List {
        archive: PathBuf,
        /// Descend into subdirectories when listing a directory.
        #[arg(long)]
        recursive: bool,
    },
    /// Write a single resource of an archive to disk.
    Extract {
        archive: PathBuf,
        /// Resource as `name.ext`, e.g. `appearance.2da`.
        resource: String,
        /// Output file, `name.ext` in the working directory by default.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a GFF file as JSON.
    Gff { file: PathBuf },
    /// Print a 2DA file as tab separated text.
    #[command(name = "2da")]
    TwoDa { file: PathBuf },
    /// List the modules of a game install.
    Modules {
        game_path: PathBuf,
        #[arg(long)]
        tsl: bool,
    },
}

fn open_archive(path: &Path, recursive: bool) -> Result<Box<dyn ResourceProvider>> {
    if path.is_dir() {
        return Ok(Box::new(FolderArchive::from_directory(path, recursive)?));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let archive: Box<dyn ResourceProvider> = match extension.as_str() {
        "key" => Box::new(KeyArchive::from_file(path)?),
        "erf" | "mod" | "sav" | "hak" => Box::new(ErfArchive::from_file(path)?),
        "rim" => Box::new(RimArchive::from_file(path)?),
        "exe" => Box::new(ExeArchive::from_file(path)?),
        _ => bail!("unsupported archive: {}", path.display()),
    };
    Ok(archive)
}

fn print_gff(file: &Path) -> Result<()> {
    let data = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let gff = GffReader::read(&data).with_context(|| format!("failed to decode {}", file.display()))?;
    #[cfg(feature = "serde")]
    println!("{}", serde_json::to_string_pretty(&gff)?);
    #[cfg(not(feature = "serde"))]
    println!("{gff:#?}");
    Ok(())
}

fn print_two_da(file: &Path) -> Result<()> {
    let data = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let table = TwoDaReader::read(&data).with_context(|| format!("failed to decode {}", file.display()))?;
    println!("\t{}", table.columns().join("\t"));
    for (index, row) in table.rows().iter().enumerate() {
        println!("{index}\t{}", row.join("\t"));
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::List { archive, recursive } => {
            let archive = open_archive(&archive, recursive)?;
            for id in archive.resource_ids() {
                println!("{id}");
            }
        }
        Command::Extract {
            archive,
            resource,
            output,
        } => {
            let id: ResourceId = resource.parse()?;
            let archive = open_archive(&archive, true)?;
            let Some(data) = archive.read(&id)? else {
                bail!("{id} not found in {}", archive.description());
            };
            let output = output.unwrap_or_else(|| PathBuf::from(id.cache_key()));
            fs::write(&output, &data).with_context(|| format!("failed to write {}", output.display()))?;
            println!("{id}: {} bytes written to {}", data.len(), output.display());
        }
        Command::Gff { file } => print_gff(&file)?,
        Command::TwoDa { file } => print_two_da(&file)?,
        Command::Modules { game_path, tsl } => {
            let game_id = if tsl { GameId::Tsl } else { GameId::Kotor };
            let director = ResourceDirector::new(DirectorOptions::new(game_path, game_id));
            for name in director.module_names()? {
                println!("{name}");
            }
        }
    }
    Ok(())
}
