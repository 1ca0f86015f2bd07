use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use exif_reader::asset::ImageReference;
use exif_reader::config::Config;
use exif_reader::exif::{CaptureMetadata, Location, MetadataContainer, TagGroup, TagValue};
use exif_reader::service::{MetadataService, collect_references};

#[derive(Parser, Debug)]
#[command(
    name = "exif-reader",
    version,
    about = "Read capture date and location from image EXIF, and write location or raw tag groups back"
)]
struct Cli {
    /// Image files, directories, or ph:// library asset ids
    #[arg(value_name = "PATH|URI")]
    inputs: Vec<String>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Display every decoded tag group
    #[arg(long = "show-tags")]
    show_tags: bool,

    /// Compute writes without committing them
    #[arg(long)]
    dry_run: bool,

    /// Latitude to write, in signed decimal degrees
    #[arg(long, allow_hyphen_values = true, requires = "longitude")]
    latitude: Option<f64>,

    /// Longitude to write, in signed decimal degrees
    #[arg(long, allow_hyphen_values = true, requires = "latitude")]
    longitude: Option<f64>,

    /// Horizontal accuracy of the written location, in meters
    #[arg(long, requires = "latitude")]
    accuracy: Option<f64>,

    /// Tag group to replace (TIFF, Exif or GPS)
    #[arg(long = "set-tags", value_name = "GROUP", requires = "tags", conflicts_with = "latitude")]
    set_tags: Option<String>,

    /// New content of the group as a JSON object
    #[arg(long, value_name = "JSON", requires = "set_tags")]
    tags: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    if cli.init {
        let config = Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.inputs.is_empty() {
        anyhow::bail!("No input files, directories or asset ids specified. Use --help for usage.");
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.dry_run {
        config.output.dry_run = true;
    }
    let service = MetadataService::from_config(&config)?;

    let references = collect_references(&cli.inputs);
    if references.is_empty() {
        anyhow::bail!("No supported images found in the specified inputs.");
    }
    log::info!("Found {} image(s)", references.len());
    if config.output.dry_run {
        log::info!("DRY RUN: nothing will be committed");
    }

    let command = Command::from_cli(&cli)?;
    let total = references.len();
    let mut results = Vec::with_capacity(total);

    for (i, reference) in references.iter().enumerate() {
        log::debug!("[{}/{}] {reference}", i + 1, total);
        let outcome = command.run(&service, reference).await;
        if let Err(ref err) = outcome {
            log::error!("{reference}: {err}");
        }
        results.push((reference, outcome));
    }

    if cli.json {
        let json: Vec<serde_json::Value> = results
            .iter()
            .map(|(reference, outcome)| match outcome {
                Ok(output) => serde_json::json!({
                    "reference": reference.to_string(),
                    "result": output.to_json(),
                }),
                Err(err) => serde_json::json!({
                    "reference": reference.to_string(),
                    "error": err.to_string(),
                }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        for (reference, outcome) in &results {
            if let Ok(output) = outcome {
                output.print(reference);
            }
        }
    }

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    log::info!("Done: {} succeeded, {failed} failed out of {total}", total - failed);
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// What to do with every input.
enum Command {
    Read,
    ShowTags,
    WriteLocation(Location),
    WriteRawTags { group: String, tags: TagGroup },
}

enum Output {
    Metadata(CaptureMetadata),
    Tags(MetadataContainer),
    Written(ImageReference),
}

impl Command {
    fn from_cli(cli: &Cli) -> Result<Self> {
        if let (Some(group), Some(json)) = (&cli.set_tags, &cli.tags) {
            let tags: TagGroup = serde_json::from_str(json).context("--tags must be a JSON object")?;
            return Ok(Self::WriteRawTags {
                group: group.clone(),
                tags,
            });
        }
        if let (Some(latitude), Some(longitude)) = (cli.latitude, cli.longitude) {
            return Ok(Self::WriteLocation(Location::new(latitude, longitude, cli.accuracy)));
        }
        if cli.show_tags {
            return Ok(Self::ShowTags);
        }
        Ok(Self::Read)
    }

    async fn run(&self, service: &MetadataService, reference: &ImageReference) -> Result<Output> {
        Ok(match self {
            Self::Read => Output::Metadata(service.read_metadata(reference).await?),
            Self::ShowTags => Output::Tags(service.read_container(reference).await?),
            Self::WriteLocation(location) => {
                service.write_location(reference, *location).await?;
                Output::Written(reference.clone())
            }
            Self::WriteRawTags { group, tags } => {
                Output::Written(service.write_raw_tags(reference, group, tags.clone()).await?)
            }
        })
    }
}

impl Output {
    fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Metadata(m) => serde_json::to_value(m).unwrap_or_default(),
            Self::Tags(c) => serde_json::to_value(c).unwrap_or_default(),
            Self::Written(r) => serde_json::json!({ "written": r.to_string() }),
        }
    }

    fn print(&self, reference: &ImageReference) {
        match self {
            Self::Metadata(m) => print_metadata(reference, m),
            Self::Tags(c) => print_tags(reference, c),
            Self::Written(r) => log::info!("Updated: {r}"),
        }
    }
}

// ANSI color codes
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 46;
/// Indent for continuation lines (tag column width + " : " = 25 chars + 2 leading spaces).
const INDENT: &str = "                           ";

fn print_metadata(reference: &ImageReference, m: &CaptureMetadata) {
    println!();
    println!("{BOLD}Image:{RESET} {reference}");
    println!("{DIM}{}{RESET}", "═".repeat(72));
    if m.is_empty() {
        println!("  {DIM}(no capture metadata found){RESET}");
    }
    if let Some(date) = m.date_string() {
        print_row("Date (UTC)", &date);
    }
    if let (Some(lat), Some(lon)) = (m.latitude, m.longitude) {
        print_row("Latitude", &format!("{lat:.6}"));
        print_row("Longitude", &format!("{lon:.6}"));
    }
    if let Some(accuracy) = m.positional_accuracy {
        print_row("Accuracy", &format!("{accuracy} m"));
    }
    println!();
}

/// Print every group, one section each.
fn print_tags(reference: &ImageReference, container: &MetadataContainer) {
    println!();
    println!("{BOLD}Image:{RESET} {reference}");
    println!("{DIM}{}{RESET}", "═".repeat(72));

    if container.is_empty() {
        println!("  {DIM}(no EXIF metadata found){RESET}");
        println!();
        return;
    }

    for (name, group) in container.groups() {
        println!("  {BOLD}{name}{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        for (tag, value) in group {
            print_row(tag, &display_value(value));
        }
        println!();
    }
}

fn display_value(value: &TagValue) -> String {
    match value {
        TagValue::Text(s) => s.clone(),
        TagValue::Number(n) => n.to_string(),
        TagValue::List(items) => items.iter().map(display_value).collect::<Vec<_>>().join(", "),
        TagValue::Group(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Print a single row in the tag table.
fn print_row(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {tag_col} : {line}");
        } else {
            println!("  {INDENT}{line}");
        }
    }
}

/// Wrap text at word boundaries to fit within max_width.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}
