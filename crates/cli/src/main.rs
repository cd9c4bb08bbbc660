use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use drafting::analysis::{MockConfig, MockProvider, ProviderConfig};
use drafting::{
    Column, DraftingConfig, DraftingTable, DroppedFile, InMemoryHost, PanelHost, PlateList,
};
use project::{GenerationMetadata, Project, ShotId, ShotListManifest};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "drafting-cli")]
#[command(about = "Drafting Table CLI - turn start/end reference plates into analysed shots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty project file
    New {
        /// Project file path
        project: PathBuf,

        /// Project name (defaults to the file stem)
        #[arg(long)]
        name: Option<String>,

        /// First sequence number
        #[arg(long, default_value = "1")]
        start: u32,
    },

    /// Place plates, analyse every ready pair and append the shots
    Process {
        /// Project file path
        project: PathBuf,

        #[command(flatten)]
        drop: DropArgs,

        /// Style directive passed to the analysis service
        #[arg(long)]
        style: Option<String>,

        /// Drafting config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use the offline mock analyser
        #[arg(long)]
        mock: bool,

        /// Write the shot-list manifest here after the batch
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Show how files would be placed, without analysing anything
    Plates {
        #[command(flatten)]
        drop: DropArgs,

        /// Project used for plate numbering
        #[arg(short, long)]
        project: Option<PathBuf>,
    },

    /// Change the project's starting sequence number
    Renumber {
        /// Project file path
        project: PathBuf,

        #[arg(long)]
        start: u32,
    },

    /// Remove a shot from the project
    Remove {
        /// Project file path
        project: PathBuf,

        /// Shot id
        shot: String,
    },

    /// Write the shot list in sequence order
    Export {
        /// Project file path
        project: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct DropArgs {
    /// Images paired consecutively as start/end frames (directories expand one level)
    files: Vec<PathBuf>,

    /// Images for the start-frame column
    #[arg(long, num_args = 1..)]
    alpha: Vec<PathBuf>,

    /// Images for the end-frame column
    #[arg(long, num_args = 1..)]
    beta: Vec<PathBuf>,
}

impl DropArgs {
    fn is_empty(&self) -> bool {
        self.files.is_empty() && self.alpha.is_empty() && self.beta.is_empty()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::New {
            project,
            name,
            start,
        } => new_command(project, name, start),
        Commands::Process {
            project,
            drop,
            style,
            config,
            mock,
            export,
        } => process_command(project, drop, style, config, mock, export).await,
        Commands::Plates { drop, project } => plates_command(drop, project).await,
        Commands::Renumber { project, start } => renumber_command(project, start),
        Commands::Remove { project, shot } => remove_command(project, shot),
        Commands::Export { project, output } => export_command(project, output),
    }
}

fn new_command(path: PathBuf, name: Option<String>, start: u32) -> Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    let name = name.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled Project".to_string())
    });
    let project = Project::new(name).with_starting_sequence_number(start);
    project.save(&path)?;
    info!("Created project '{}' at {:?}", project.name, path);
    Ok(())
}

async fn process_command(
    project_path: PathBuf,
    drop: DropArgs,
    style: Option<String>,
    config_path: Option<PathBuf>,
    mock: bool,
    export: Option<PathBuf>,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => DraftingConfig::load(path)?,
        None => DraftingConfig::default(),
    }
    .apply_env();
    if mock {
        config = config.with_provider(ProviderConfig::Mock(MockConfig::default()));
    }
    let style = style.unwrap_or_else(|| config.style_directive.clone());

    let project = Project::load(&project_path)?;
    let host = Arc::new(InMemoryHost::new(project));
    let table = DraftingTable::from_config(host.clone(), &config)
        .context("configure analysis provider")?;

    place_files(&table, &drop).await?;
    print_plates(&table);

    let report = table.process_batch(&style).await;
    if report.is_noop() {
        warn!("No plate has both a start and an end frame; nothing to analyse");
    }

    let project = host.project();
    project.save(&project_path)?;
    println!(
        "Created {} shot(s), {} failed. Project now holds {} shot(s).",
        report.created.len(),
        report.failed.len(),
        project.shots.len()
    );
    for id in &report.created {
        if let Some(shot) = project.shot(*id) {
            println!("  {}", shot.label());
        }
    }
    for error in host.errors() {
        println!("  [{}] {}", error.context, error.message);
    }
    print_plates(&table);

    if let Some(output) = export {
        table.proceed_to_export();
        ShotListManifest::from_project(&project).write(&output)?;
        info!("Shot list written to {:?}", output);
    }
    Ok(())
}

async fn plates_command(drop: DropArgs, project_path: Option<PathBuf>) -> Result<()> {
    if drop.is_empty() {
        bail!("no files given");
    }
    let project = match project_path {
        Some(path) => Project::load(&path)?,
        None => Project::default(),
    };
    let table = offline_table(project);
    place_files(&table, &drop).await?;
    print_plates(&table);
    Ok(())
}

fn renumber_command(project_path: PathBuf, start: u32) -> Result<()> {
    let table = offline_table(Project::load(&project_path)?);
    table.set_starting_sequence_number(start);
    let project = table.host().project();
    project.save(&project_path)?;
    match project.next_sequence_number() {
        Some(next) => info!(
            "Starting sequence number is now {}; next shot will be #{}",
            project.starting_sequence_number, next
        ),
        None => warn!(
            "Starting sequence number {} leaves no room for new shots",
            project.starting_sequence_number
        ),
    }
    Ok(())
}

fn remove_command(project_path: PathBuf, shot: String) -> Result<()> {
    let id: ShotId = shot.parse().with_context(|| format!("invalid shot id '{shot}'"))?;
    let table = offline_table(Project::load(&project_path)?);
    let Some(label) = table.host().project().shot(id).map(|s| s.label()) else {
        bail!("shot {id} not found in {}", project_path.display());
    };
    table.remove_shot(id);
    table.host().project().save(&project_path)?;
    info!("Removed {}", label);
    Ok(())
}

fn export_command(project_path: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let project = Project::load(&project_path)?;
    let manifest = ShotListManifest::from_project(&project);
    match output {
        Some(path) => {
            manifest.write(&path)?;
            info!("Shot list written to {:?}", path);
        }
        None => println!("{}", serde_json::to_string_pretty(&manifest)?),
    }
    Ok(())
}

/// Table for commands that never call the analysis service.
fn offline_table(project: Project) -> DraftingTable<InMemoryHost> {
    DraftingTable::new(
        Arc::new(InMemoryHost::new(project)),
        Arc::new(MockProvider::new(MockConfig::default())),
        GenerationMetadata::default(),
    )
}

async fn place_files(table: &DraftingTable<InMemoryHost>, drop: &DropArgs) -> Result<()> {
    let alpha = expand_inputs(&drop.alpha);
    let beta = expand_inputs(&drop.beta);
    let mixed = expand_inputs(&drop.files);

    if !alpha.is_empty() {
        let placed = table.drop_on_column(Column::Alpha, &alpha).await?;
        info!("Placed {} start frame(s)", placed);
    }
    if !beta.is_empty() {
        let placed = table.drop_on_column(Column::Beta, &beta).await?;
        info!("Placed {} end frame(s)", placed);
    }
    if !mixed.is_empty() {
        let created = table.drop_mixed(&mixed).await?;
        info!("Formed {} plate(s) from {} file(s)", created, mixed.len());
    }
    Ok(())
}

/// Files pass through; directories contribute their direct children in name
/// order.
fn expand_inputs(paths: &[PathBuf]) -> Vec<DroppedFile> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let children: Vec<PathBuf> = WalkDir::new(path)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .collect();
            if children.is_empty() {
                warn!("Directory has no files: {:?}", path);
            }
            files.extend(children.into_iter().map(DroppedFile::from_path));
        } else if path.exists() {
            files.push(DroppedFile::from_path(path.clone()));
        } else {
            warn!("File does not exist: {:?}", path);
        }
    }
    files
}

fn print_plates(table: &DraftingTable<InMemoryHost>) {
    let plates: PlateList = table.plates();
    let numbers = table.plate_numbers();
    println!("Pending plates:");
    for (plate, (_, number)) in plates.iter().zip(numbers) {
        let number = number.map_or_else(|| "---".to_string(), |n| format!("{n:03}"));
        println!(
            "  #{} [{}] start: {}  end: {}",
            number,
            plate.status.as_str(),
            describe(plate.source.as_ref().map(|p| p.mime_type())),
            describe(plate.target.as_ref().map(|p| p.mime_type())),
        );
    }
}

fn describe(mime: Option<&str>) -> &str {
    mime.unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_process_with_columns() {
        let cli = Cli::try_parse_from([
            "drafting-cli",
            "process",
            "reel.json",
            "--alpha",
            "a1.png",
            "a2.png",
            "--beta",
            "b1.png",
            "--style",
            "noir",
            "--mock",
        ])
        .unwrap();
        match cli.command {
            Commands::Process {
                drop, style, mock, ..
            } => {
                assert_eq!(drop.alpha.len(), 2);
                assert_eq!(drop.beta.len(), 1);
                assert!(drop.files.is_empty());
                assert_eq!(style.as_deref(), Some("noir"));
                assert!(mock);
            }
            _ => panic!("expected process command"),
        }
    }

    #[test]
    fn expand_inputs_reads_directories_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.png", "notes.txt"] {
            std::fs::write(dir.path().join(name), [0u8]).unwrap();
        }
        let files = expand_inputs(&[dir.path().to_path_buf(), dir.path().join("missing.png")]);
        let names: Vec<&str> = files.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["a.png", "b.png", "notes.txt"]);
    }

    #[tokio::test]
    async fn plates_dry_run_pairs_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["01.png", "02.png", "03.jpg", "readme.md"] {
            std::fs::write(dir.path().join(name), [1u8, 2, 3]).unwrap();
        }
        let project = Project::new("Reel").with_starting_sequence_number(4);
        let table = offline_table(project);
        let drop = DropArgs {
            files: vec![dir.path().to_path_buf()],
            alpha: Vec::new(),
            beta: Vec::new(),
        };
        place_files(&table, &drop).await.unwrap();

        let plates = table.plates();
        assert_eq!(plates.len(), 2);
        assert!(plates.plates()[0].is_ready());
        assert_eq!(plates.plates()[1].source.as_ref().unwrap().mime_type(), "image/jpeg");
        assert!(plates.plates()[1].target.is_none());
        let numbers: Vec<_> = table.plate_numbers().into_iter().map(|(_, n)| n).collect();
        assert_eq!(numbers, vec![Some(4), Some(5)]);
    }

    #[tokio::test]
    async fn mock_process_appends_shots() {
        let dir = tempfile::tempdir().unwrap();
        let project_path = dir.path().join("reel.json");
        new_command(project_path.clone(), None, 3).unwrap();
        let start = dir.path().join("start.png");
        let end = dir.path().join("end.png");
        std::fs::write(&start, [1u8]).unwrap();
        std::fs::write(&end, [2u8]).unwrap();
        let manifest_path = dir.path().join("shots.json");

        process_command(
            project_path.clone(),
            DropArgs {
                files: vec![start, end],
                alpha: Vec::new(),
                beta: Vec::new(),
            },
            Some("overcast".to_string()),
            None,
            true,
            Some(manifest_path.clone()),
        )
        .await
        .unwrap();

        let project = Project::load(&project_path).unwrap();
        assert_eq!(project.name, "reel");
        assert_eq!(project.shots.len(), 1);
        assert_eq!(project.shots[0].sequence_order, 3);
        assert!(project.shots[0].action_prompt.contains("overcast"));

        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&manifest_path).unwrap()).unwrap();
        assert_eq!(manifest["entries"][0]["sequence_order"], 3);

        renumber_command(project_path.clone(), 10).unwrap();
        let id = project.shots[0].id.to_string();
        remove_command(project_path.clone(), id).unwrap();
        let project = Project::load(&project_path).unwrap();
        assert!(project.shots.is_empty());
        assert_eq!(project.next_sequence_number(), Some(10));
    }
}
