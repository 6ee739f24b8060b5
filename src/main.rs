//! Command-line front end: inspect the schema, validate an annotation set
//! and write exports.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use invoice_annotator::config::{AnnotatorConfig, ConfigError};
use invoice_annotator::data::{ImageLoadError, PageImage};
use invoice_annotator::format::{ExportFormat, FormatError, FormatRegistry, output_filename};
use invoice_annotator::model::{Document, DocumentError, Group, schema};
use invoice_annotator::state::Session;

#[derive(Parser)]
#[command(
    name = "invoice-annotator",
    version,
    about = "Invoice bounding-box annotation tools"
)]
struct Cli {
    /// Configuration file (default: platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the field templates with their groups
    Schema {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Cross-check annotations against the document
    Validate(InputArgs),
    /// Write export files
    Export(ExportArgs),
}

#[derive(Args)]
struct InputArgs {
    /// Invoice document JSON (default: an empty skeleton)
    #[arg(long, value_name = "PATH")]
    document: Option<PathBuf>,

    /// Labels JSON from a previous export
    #[arg(long, value_name = "PATH")]
    labels: Option<PathBuf>,

    /// Page image; sets the image size and export names
    #[arg(long, value_name = "PATH")]
    image: Option<PathBuf>,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Formats to write
    #[arg(
        long = "format",
        value_name = "ID",
        value_parser = ["labels", "coco", "document", "annotated"],
        default_values = ["labels", "coco", "document"]
    )]
    formats: Vec<String>,

    /// Output directory
    #[arg(long, short, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Tint box interiors in the annotated image
    #[arg(long)]
    fills: bool,

    /// Leave box borders out of the annotated image
    #[arg(long)]
    no_borders: bool,

    /// Leave label pills out of the annotated image
    #[arg(long)]
    no_labels: bool,
}

#[derive(Error, Debug)]
enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Document(#[from] DocumentError),

    #[error("{0}")]
    Format(#[from] FormatError),

    #[error("{0}")]
    Image(#[from] ImageLoadError),

    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unknown format '{0}'")]
    UnknownFormat(String),
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();

    let result = match cli.command {
        Commands::Schema { json } => run_schema(json),
        Commands::Validate(args) => run_validate(&config, &args),
        Commands::Export(args) => run_export(&config, &args),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<AnnotatorConfig, CliError> {
    match path {
        Some(path) => Ok(AnnotatorConfig::load(path)?),
        None => Ok(AnnotatorConfig::load_from_default_path().unwrap_or_default()),
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Build a session from the input files. The decoded page is returned
/// when an image was given and could be decoded.
fn open_session(
    config: &AnnotatorConfig,
    input: &InputArgs,
) -> Result<(Session, Option<PageImage>), CliError> {
    let mut session = Session::with_config(config);

    match &input.document {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|source| CliError::Read {
                path: path.clone(),
                source,
            })?;
            session.load_document(&json)?;
        }
        None => session.set_document(Document::skeleton()),
    }

    let page = match &input.image {
        Some(path) => {
            let page = PageImage::open(path)?;
            session.load_page(&page);
            Some(page)
        }
        None => None,
    };

    if let Some(path) = &input.labels {
        let count = session.import_labels(&read_file(path)?)?;
        log::info!("Read {} annotations from {:?}", count, path);
    }

    Ok((session, page))
}

fn run_schema(json: bool) -> Result<(), CliError> {
    if json {
        let entries: Vec<_> = schema::FIELDS
            .iter()
            .map(|f| {
                serde_json::json!({
                    "key": f.key,
                    "title": f.title,
                    "group": f.group.id(),
                    "color": f.group.color(),
                })
            })
            .collect();
        let text = serde_json::to_string_pretty(&entries).map_err(FormatError::from)?;
        println!("{}", text);
        return Ok(());
    }

    for group in Group::all() {
        println!("{} ({})", group.title(), group.color());
        for field in schema::FIELDS.iter().filter(|f| f.group == *group) {
            println!("  {:<44} {}", field.key, field.title);
        }
    }
    Ok(())
}

fn run_validate(config: &AnnotatorConfig, args: &InputArgs) -> Result<(), CliError> {
    let (session, _) = open_session(config, args)?;
    let report = session.report();
    let text = serde_json::to_string_pretty(report).map_err(FormatError::from)?;
    println!("{}", text);
    Ok(())
}

fn run_export(config: &AnnotatorConfig, args: &ExportArgs) -> Result<(), CliError> {
    let (session, page) = open_session(config, &args.input)?;
    let registry = FormatRegistry::new();

    let mut display = session.display();
    display.fills = args.fills;
    display.borders = !args.no_borders;
    display.labels = !args.no_labels;

    let mut data = session.export_data().with_display(display);
    if let Some(page) = &page {
        data = data.with_image(&page.image);
    }

    std::fs::create_dir_all(&args.out_dir).map_err(FormatError::from)?;
    for id in &args.formats {
        let format = registry
            .get(id)
            .ok_or_else(|| CliError::UnknownFormat(id.clone()))?;
        let path = args
            .out_dir
            .join(output_filename(data.image_filename, format.suffix()));
        let result = format.export(&data, &path)?;
        for warning in &result.warnings {
            log::warn!("{}: {}", format.display_name(), warning.message);
        }
        println!("{}", path.display());
    }

    if !data.report.is_clean() {
        log::info!(
            "{} validation warnings, {} omitted fields",
            data.report.warnings.len(),
            data.report.omitted.len()
        );
    }
    Ok(())
}
