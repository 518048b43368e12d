use annotation::{
    AnnotationStore, BinaryMask, DatasetCursor, NullViewer, PreviewViewer, Session, SessionCommand, Viewer,
};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use relabel::RelabelConfig;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Split and remove instance masks in an annotated image dataset", long_about = None)]
struct Cli {
    #[command(flatten)]
    dataset: DatasetArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DatasetArgs {
    /// Configuration file (.toml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Dataset root, overrides the configuration file
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,
    /// Category id given to new instances
    #[arg(long, global = true)]
    category_id: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the dataset entries in navigation order
    List,
    /// Print the instances of one entry
    Show {
        #[arg(short, long, default_value = "0")]
        index: usize,
    },
    /// Render one entry with its label and box overlays
    Render {
        #[arg(short, long, default_value = "0")]
        index: usize,
        /// Output image path
        #[arg(short, long)]
        output: PathBuf,
        /// Overlay opacity
        #[arg(long, default_value = "0.5")]
        opacity: f32,
        /// Also export the boxes as GeoJSON
        #[arg(long)]
        geojson: Option<PathBuf>,
    },
    /// Replace an instance with one new instance per mask image
    Split {
        #[arg(short, long)]
        index: usize,
        #[arg(long)]
        instance: usize,
        /// Mask images, non-zero pixels are foreground
        #[arg(short, long = "mask", required = true)]
        masks: Vec<PathBuf>,
        /// Render every intermediate state to this image
        #[arg(long)]
        preview: Option<PathBuf>,
    },
    /// Delete an instance
    Remove {
        #[arg(short, long)]
        index: usize,
        #[arg(long)]
        instance: usize,
    },
    /// Execute a JSON list of session commands
    Run {
        #[arg(short, long)]
        script: PathBuf,
        /// Entry to start from
        #[arg(short, long, default_value = "0")]
        index: usize,
        /// Render every intermediate state to this image
        #[arg(long)]
        preview: Option<PathBuf>,
    },
    /// Print the JSON schema of the session commands
    Schema {
        /// Print the configuration schema instead
        #[arg(long)]
        config: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();
    let config = RelabelConfig::load_or_default(cli.dataset.config.as_deref())
        .wrap_err("Failed to load configuration")?
        .with_overrides(cli.dataset.root, cli.dataset.category_id);

    match cli.command {
        Commands::List => list(&config)?,
        Commands::Show { index } => show(&config, index)?,
        Commands::Render { index, output, opacity, geojson } => {
            render(&config, index, &output, opacity, geojson.as_deref())?
        }
        Commands::Split { index, instance, masks, preview } => {
            let mut session = open_session(&config, index, preview)?;
            session.start_labeling(instance, masks.len())?;
            for (i, path) in masks.iter().enumerate() {
                let mask = BinaryMask::load_image(path).wrap_err_with(|| format!("Failed to load mask {}", path.display()))?;
                session.set_draft(mask)?;
                if i + 1 < masks.len() {
                    session.next_draft()?;
                }
            }
            session.finish()?;
            info!(instance, new_instances = masks.len(), "Split complete");
        }
        Commands::Remove { index, instance } => {
            let mut session = open_session(&config, index, None)?;
            session.start_labeling(instance, 0)?;
            session.finish()?;
            info!(instance, remaining = session.store().n_labels(), "Instance removed");
        }
        Commands::Run { script, index, preview } => run_script(&config, &script, index, preview)?,
        Commands::Schema { config: true } => {
            println!("{}", serde_json::to_string_pretty(&schemars::schema_for!(RelabelConfig))?);
        }
        Commands::Schema { config: false } => {
            println!("{}", serde_json::to_string_pretty(&SessionCommand::schema())?);
        }
    }

    Ok(())
}

fn discover(config: &RelabelConfig) -> Result<DatasetCursor> {
    let cursor = DatasetCursor::discover(&config.dataset_root, &config.discovery_options())
        .wrap_err_with(|| format!("Failed to scan {}", config.dataset_root.display()))?;
    Ok(cursor)
}

fn open_session(config: &RelabelConfig, index: usize, preview: Option<PathBuf>) -> Result<Session<Box<dyn Viewer>>> {
    let viewer: Box<dyn Viewer> = match preview {
        Some(path) => Box::new(PreviewViewer::new(path)),
        None => Box::new(NullViewer),
    };
    let mut session = Session::open_with_category(discover(config)?, viewer, config.default_category_id)?;
    if index != 0 {
        session.go_to(index)?;
    }
    Ok(session)
}

fn list(config: &RelabelConfig) -> Result<()> {
    let cursor = discover(config)?;
    for (i, entry) in cursor.entries().iter().enumerate() {
        println!("{i:>4}  {}  {}", entry.annotation_path().display(), entry.image_path().display());
    }
    info!(entries = cursor.len(), "Listed dataset");
    Ok(())
}

fn load(config: &RelabelConfig, index: usize) -> Result<AnnotationStore> {
    let cursor = discover(config)?;
    let entry = cursor
        .entries()
        .get(index)
        .ok_or(annotation::AnnotationError::EntryOutOfRange { index, len: cursor.len() })?;
    Ok(AnnotationStore::load_entry(entry)?.with_default_category(config.default_category_id))
}

fn show(config: &RelabelConfig, index: usize) -> Result<()> {
    let store = load(config, index)?;
    println!("{}", store.entry().annotation_path().display());
    for (i, (record, mask)) in store.records().iter().zip(store.instance_masks()).enumerate() {
        println!(
            "{i:>4}  category {:<4} bbox {:?}  area {}",
            record.category_id,
            record.bbox_xyxy(),
            mask.area()
        );
    }
    Ok(())
}

fn render(config: &RelabelConfig, index: usize, output: &Path, opacity: f32, geojson: Option<&Path>) -> Result<()> {
    let viewer = PreviewViewer::new(output).with_opacity(opacity);
    let mut cursor = discover(config)?;
    if index != 0 {
        cursor.seek(index, |_| Ok(()))?;
    }
    let session = Session::open_with_category(cursor, viewer, config.default_category_id)?;

    if let Some(path) = geojson {
        session.store().display_geometry().save_geojson(path)?;
        info!(path = %path.display(), "Exported boxes");
    }
    info!(output = %output.display(), "Rendered entry");
    Ok(())
}

fn run_script(config: &RelabelConfig, script: &Path, index: usize, preview: Option<PathBuf>) -> Result<()> {
    let content = std::fs::read_to_string(script).wrap_err_with(|| format!("Failed to read {}", script.display()))?;
    let commands: Vec<SessionCommand> = serde_json::from_str(&content)?;

    let mut session = open_session(config, index, preview)?;
    for (i, command) in commands.into_iter().enumerate() {
        info!(step = i, command = %command, "{}", command.description());
        session
            .execute(command)
            .wrap_err_with(|| format!("Command {i} of {} failed", script.display()))?;
    }
    Ok(())
}
