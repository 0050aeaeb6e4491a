use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use field_tracker::config::{load_or_default, EngineConfig};
use field_tracker::edit::write_if_changed;
use field_tracker::field::Dataset;
use field_tracker::template::{import_template, ExportError, TemplateDetails};
use field_tracker::tracking::{suggest_mappings, TrackedFields};
use field_tracker::worker::OrchestratorError;
use field_tracker::{detokenize, locate_fields, tokenize_for_export, Orchestrator, TrackingStore};
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Candidates shown per field that requires mapping.
const SUGGESTION_LIMIT: usize = 3;

#[derive(Parser)]
#[command(name = "field-tracker")]
#[command(
    about = "Track and tokenize dataset field references in visualization specs",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Engine configuration file (defaults apply if omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level, overriding RUST_LOG and the configured filter
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which dataset fields a specification references
    Fields {
        /// Specification file (JSON or JSONC)
        #[arg(short, long)]
        spec: PathBuf,

        /// Dataset description (JSON: {"fields": [...]})
        #[arg(short, long)]
        dataset: PathBuf,

        /// Print tracked fields as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace field references with placeholders
    Tokenize {
        #[arg(short, long)]
        spec: PathBuf,

        #[arg(short, long)]
        dataset: PathBuf,

        /// Also save the tracked fields, for a later `detokenize`
        #[arg(short, long)]
        tracked: Option<PathBuf>,

        /// Show unified diff of changes
        #[arg(long)]
        diff: bool,

        /// Rewrite the spec file in place
        #[arg(short, long)]
        write: bool,
    },

    /// Replace placeholders with the field names they were assigned
    Detokenize {
        #[arg(short, long)]
        spec: PathBuf,

        /// Tracked fields saved by `tokenize --tracked`
        #[arg(short, long)]
        tracked: PathBuf,

        /// Show unified diff of changes
        #[arg(long)]
        diff: bool,

        /// Rewrite the spec file in place
        #[arg(short, long)]
        write: bool,
    },

    /// Export a specification as a template with usermeta
    Export {
        #[arg(short, long)]
        spec: PathBuf,

        #[arg(short, long)]
        dataset: PathBuf,

        /// Template name
        #[arg(short, long)]
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value = "")]
        author: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a template against a dataset
    Import {
        /// Template file carrying usermeta
        #[arg(short, long)]
        template: PathBuf,

        #[arg(short, long)]
        dataset: PathBuf,

        /// Assign a placeholder to a dataset field, e.g. `__0__=Sales`
        #[arg(short, long = "map", value_parser = parse_assignment)]
        map: Vec<(String, String)>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_or_default(path)?,
        None => EngineConfig::default(),
    };
    init_tracing(&config, cli.verbose);

    match cli.command {
        Commands::Fields {
            spec,
            dataset,
            json,
        } => cmd_fields(&spec, &dataset, json),

        Commands::Tokenize {
            spec,
            dataset,
            tracked,
            diff,
            write,
        } => cmd_tokenize(&spec, &dataset, tracked.as_deref(), diff, write),

        Commands::Detokenize {
            spec,
            tracked,
            diff,
            write,
        } => cmd_detokenize(&spec, &tracked, diff, write),

        Commands::Export {
            spec,
            dataset,
            name,
            description,
            author,
            output,
        } => {
            let details = TemplateDetails {
                name,
                description,
                author,
            };
            cmd_export(&config, &spec, &dataset, &details, output.as_deref())
        }

        Commands::Import {
            template,
            dataset,
            map,
            output,
        } => cmd_import(&config, &template, &dataset, &map, output.as_deref()),
    }
}

/// RUST_LOG wins over the configured filter; `--verbose` wins over both.
fn init_tracing(config: &EngineConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("field_tracker=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (key, name) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PLACEHOLDER=FIELD, got '{raw}'"))?;
    if key.is_empty() || name.is_empty() {
        return Err(format!("expected PLACEHOLDER=FIELD, got '{raw}'"));
    }
    Ok((key.to_string(), name.to_string()))
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_dataset(path: &Path) -> Result<Dataset> {
    let text = read_text(path)?;
    serde_json::from_str(&text).with_context(|| format!("invalid dataset in {}", path.display()))
}

fn read_tracked(path: &Path) -> Result<TrackedFields> {
    let text = read_text(path)?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid tracked fields in {}", path.display()))
}

fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            write_if_changed(path, content)?;
            eprintln!("{} wrote {}", "✓".green(), path.display());
        }
        None => println!("{content}"),
    }
    Ok(())
}

/// Helper: Show unified diff between original and rewritten spec
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!("{}", format!("--- {} (original)", file.display()).dimmed());
    println!("{}", format!("+++ {} (rewritten)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

/// Shared tail of `tokenize` and `detokenize`.
fn emit_rewrite(
    path: &Path,
    original: &str,
    rewritten: &str,
    diff: bool,
    write: bool,
) -> Result<()> {
    if diff {
        display_diff(path, original, rewritten);
    }
    if write {
        if write_if_changed(path, rewritten)? {
            eprintln!("{} rewrote {}", "✓".green(), path.display());
        } else {
            eprintln!("{} {} unchanged", "⊘".cyan(), path.display());
        }
    } else if !diff {
        println!("{rewritten}");
    }
    Ok(())
}

fn print_mapping_suggestions(tracked: &TrackedFields, dataset: &Dataset) {
    for suggestion in suggest_mappings(tracked, dataset, SUGGESTION_LIMIT) {
        let candidates: Vec<String> = suggestion
            .candidates
            .iter()
            .map(|c| format!("{} ({:.2})", c.name, c.score))
            .collect();
        if candidates.is_empty() {
            eprintln!("  - {}", suggestion.key);
        } else {
            eprintln!(
                "  - {} {}",
                suggestion.key,
                format!("maybe: {}", candidates.join(", ")).dimmed()
            );
        }
    }
}

fn cmd_fields(spec_path: &Path, dataset_path: &Path, json: bool) -> Result<()> {
    let spec = read_text(spec_path)?;
    let dataset = read_dataset(dataset_path)?;
    let located = locate_fields(&spec, &dataset, &TrackedFields::new());

    if json {
        println!("{}", serde_json::to_string_pretty(&located.tracked_fields)?);
        return Ok(());
    }

    if located.used_text_fallback {
        eprintln!(
            "{}",
            "Warning: spec did not parse; references were found by text search".yellow()
        );
    }

    println!("{}", "Tracked fields:".bold());
    for (key, props) in &located.tracked_fields {
        let status = if props.is_mapping_required {
            "mapping required".red()
        } else if props.is_in_specification {
            "in use".green()
        } else {
            "unused".dimmed()
        };
        println!("  {} {} [{}]", props.placeholder.cyan(), key, status);
        for path in &props.paths {
            println!("      {}", path.dimmed());
        }
    }

    let drilldown = located.tracked_drilldown;
    if drilldown.is_current {
        println!(
            "  drilldown: {}",
            if drilldown.is_mapping_required {
                "mapping required".red()
            } else {
                "available".green()
            }
        );
    }

    for skipped in &located.skipped {
        eprintln!("{} {}: {}", "⊘".cyan(), skipped.field, skipped.reason);
    }
    Ok(())
}

fn cmd_tokenize(
    spec_path: &Path,
    dataset_path: &Path,
    tracked_out: Option<&Path>,
    diff: bool,
    write: bool,
) -> Result<()> {
    let spec = read_text(spec_path)?;
    let dataset = read_dataset(dataset_path)?;
    let located = locate_fields(&spec, &dataset, &TrackedFields::new());
    let result = tokenize_for_export(&spec, &located.tracked_fields, &[]);

    for skipped in &result.skipped {
        eprintln!("{} {}: {}", "⊘".cyan(), skipped.field, skipped.reason);
    }
    if let Some(path) = tracked_out {
        let json = serde_json::to_string_pretty(&located.tracked_fields)?;
        write_if_changed(path, &json)?;
    }
    emit_rewrite(spec_path, &spec, &result.spec, diff, write)
}

fn cmd_detokenize(spec_path: &Path, tracked_path: &Path, diff: bool, write: bool) -> Result<()> {
    let spec = read_text(spec_path)?;
    let tracked = read_tracked(tracked_path)?;
    let result = detokenize(&spec, &tracked, &[]);

    for skipped in &result.skipped {
        eprintln!("{} {}: {}", "⊘".cyan(), skipped.field, skipped.reason);
    }
    emit_rewrite(spec_path, &spec, &result.spec, diff, write)
}

fn cmd_export(
    config: &EngineConfig,
    spec_path: &Path,
    dataset_path: &Path,
    details: &TemplateDetails,
    output: Option<&Path>,
) -> Result<()> {
    let spec = read_text(spec_path)?;
    let dataset = read_dataset(dataset_path)?;
    let orchestrator = Orchestrator::new(&config.workers)?;

    let mut store = TrackingStore::new(spec, dataset);
    orchestrator.run_remap_cycle(&mut store, false)?;

    match orchestrator.export_template(&mut store, details, &config.template) {
        Ok(template) => write_output(output, &template),
        Err(OrchestratorError::Export(ExportError::MappingRequired { fields })) => {
            eprintln!(
                "{} {} field(s) must be mapped before export:",
                "✗".red(),
                fields.len()
            );
            print_mapping_suggestions(store.tracked_fields(), store.dataset());
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_import(
    config: &EngineConfig,
    template_path: &Path,
    dataset_path: &Path,
    assignments: &[(String, String)],
    output: Option<&Path>,
) -> Result<()> {
    let text = read_text(template_path)?;
    let dataset = read_dataset(dataset_path)?;
    let imported = import_template(&text, &config.template)?;
    let orchestrator = Orchestrator::new(&config.workers)?;

    eprintln!(
        "Template: {} ({})",
        imported.usermeta.information.name.bold(),
        imported.usermeta.deneb.build
    );

    let mut store = TrackingStore::new(imported.spec.clone(), dataset);
    store.load_template(imported.spec, imported.tracked_fields)?;
    orchestrator.run_remap_cycle(&mut store, true)?;

    for (key, name) in assignments {
        store.assign_field(key, name)?;
    }
    let outcome = orchestrator.run_remap_cycle(&mut store, false)?;

    if !outcome.fields_requiring_mapping.is_empty() {
        eprintln!(
            "{}",
            format!(
                "Warning: {} placeholder(s) still unassigned:",
                outcome.fields_requiring_mapping.len()
            )
            .yellow()
        );
        print_mapping_suggestions(store.tracked_fields(), store.dataset());
    }
    write_output(output, store.spec())
}
