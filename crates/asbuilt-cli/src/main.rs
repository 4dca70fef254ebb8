mod display;

use std::path::{Path, PathBuf};

use anyhow::Context;
use asbuilt_core::buffer::DEFAULT_QUADRANT_SEGMENTS;
use asbuilt_core::{RunConfig, SelectedFeature, stamp_selection};
use asbuilt_store::DuckStore;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "asbuilt", version, about = "Create as-built coverage polygons from selected features")]
struct Cli {
    /// DuckDB database holding the as-built polygon layer.
    #[arg(long, env = "ASBUILT_DB", default_value = "asbuilt.duckdb", global = true)]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Buffer, merge and dissolve a selection, then commit the polygons.
    Run(RunArgs),
    /// Print committed polygons and attachments.
    Show {
        /// Only show the newest N polygons.
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// JSON array of selected features.
    #[arg(long)]
    features: PathBuf,

    /// Path to the as-built source document (must contain `originals`).
    #[arg(long, env = "ASBUILT_SOURCE")]
    source: String,

    /// As-built date, YYYY-MM-DD.
    #[arg(long, default_value = "")]
    date: String,

    /// WUD project number.
    #[arg(long, default_value = "")]
    project: String,

    /// Buffer distance in feet.
    #[arg(long, env = "ASBUILT_BUFFER", default_value_t = 10.0)]
    buffer: f64,

    /// Chords per quarter circle when approximating arcs.
    #[arg(long, default_value_t = DEFAULT_QUADRANT_SEGMENTS)]
    quadrant_segments: u32,

    /// Attach the source document to the newest polygon.
    #[arg(long)]
    attach: bool,

    /// Write the selection back with SOURCE and ASBUILTDATE filled in.
    #[arg(long)]
    stamp_output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!("asbuilt v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => cmd_run(&cli.db, args),
        Command::Show { limit } => cmd_show(&cli.db, limit),
    }
}

fn cmd_run(db: &Path, args: RunArgs) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.features)
        .with_context(|| format!("reading {}", args.features.display()))?;
    let mut features: Vec<SelectedFeature> =
        serde_json::from_str(&raw).context("parsing selected features")?;

    let mut config = RunConfig::new(args.source, args.buffer)
        .with_record_date(&args.date)?
        .with_project_number(&args.project)
        .with_attach_source(args.attach);
    config.buffer.quadrant_segments = args.quadrant_segments;

    if let Some(path) = &args.stamp_output {
        let provenance = config.provenance()?;
        let changed = stamp_selection(&mut features, &provenance);
        let json = serde_json::to_string_pretty(&features)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        eprintln!("Populated SOURCE and ASBUILTDATE on {changed} selected feature(s)");
    }

    let mut store = DuckStore::open_persistent(db)
        .with_context(|| format!("opening {}", db.display()))?;

    let mut summary = asbuilt_core::run(&features, &config, &mut store)?;
    println!("{summary}");
    for skipped in &summary.skipped {
        println!(
            "  skipped feature {} ({}): {}",
            skipped.index,
            skipped.layer.as_deref().unwrap_or("-"),
            skipped.reason
        );
    }
    if let Some(err) = summary.attachment_error.take() {
        return Err(anyhow::Error::new(err).context(format!(
            "{} polygon(s) were committed but the source document was not attached",
            summary.rows.len()
        )));
    }
    Ok(())
}

fn cmd_show(db: &Path, limit: Option<usize>) -> anyhow::Result<()> {
    let store =
        DuckStore::open_persistent(db).with_context(|| format!("opening {}", db.display()))?;

    let mut batches = store.polygons_batch()?;
    if let Some(n) = limit {
        let total: usize = batches.iter().map(|b| b.num_rows()).sum();
        let skip = total.saturating_sub(n);
        batches = display::skip_rows(batches, skip);
    }
    for batch in &batches {
        for row in 0..batch.num_rows() {
            display::print_polygon_card(batch, row)?;
        }
    }

    let attachments = store.query_arrow(
        "SELECT attachmentid, rel_objectid, rel_globalid, att_name, content_type, data_size \
         FROM asbuilt_polygons__attach ORDER BY attachmentid",
    )?;
    if attachments.iter().any(|b| b.num_rows() > 0) {
        println!("Attachments");
        println!("{}", arrow::util::pretty::pretty_format_batches(&attachments)?);
    }
    Ok(())
}
