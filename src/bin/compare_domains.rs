//! Compare domain labels of a subblocked model against sample points or a
//! second model.
//!
//! Usage:
//!   compare_domains points --model m.json --points p.json
//!   compare_domains models --model-a a.json --model-b b.json \
//!       --hint-a "2.5 2.5 1" --hint-b "5 5 1" [--solid s.json]
//!
//! Input documents are JSON (see `subblock_compare::interchange`). Set
//! RUST_LOG=info for phase logging.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;

use subblock_compare::interchange::{ModelDocument, PointsDocument, SolidDocument};
use subblock_compare::{
    validate_model, BoundsMode, ComparisonConfig, DomainReport, LabelCase, ModelComparison,
    PointComparison, SizeHint, SubblockedModel,
};

#[derive(Parser)]
#[command(name = "compare_domains")]
#[command(about = "Compare categorical domains between block models and sample points")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct CommonArgs {
    /// JSON config file; flags below override its fields
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Attribute name to use for labels (repeat for aliases, in priority order)
    #[arg(long = "attribute", global = true)]
    attributes: Vec<String>,

    /// Fall back to the first categorical attribute if no name matches
    #[arg(long, global = true)]
    first_categorical: bool,

    /// Lowercase labels on both sides before comparing
    #[arg(long, global = true)]
    lowercase: bool,

    /// Also report a contingency table reduced to the N most frequent categories
    #[arg(long, global = true)]
    top_n: Option<usize>,

    /// Write the full report as JSON
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Validate the models before comparing
    #[arg(long, global = true)]
    validate: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Sample points against one model
    Points {
        #[arg(long)]
        model: PathBuf,

        #[arg(long)]
        points: PathBuf,

        /// Attribute name on the point collection (defaults to --attribute)
        #[arg(long)]
        point_attribute: Vec<String>,

        /// Skip hidden points
        #[arg(long)]
        only_visible: bool,

        /// Probe the index even for points outside the model grid
        #[arg(long)]
        unbounded: bool,
    },
    /// Two models on their common grid
    Models {
        #[arg(long)]
        model_a: PathBuf,

        #[arg(long)]
        model_b: PathBuf,

        /// Smallest subblock size of model A, "x y z"
        #[arg(long)]
        hint_a: SizeHint,

        /// Smallest subblock size of model B, "x y z"
        #[arg(long)]
        hint_b: SizeHint,

        /// Restrict the comparison to the inside of this closed mesh
        #[arg(long)]
        solid: Option<PathBuf>,

        /// Override the comparison-grid cell ceiling
        #[arg(long)]
        max_cells: Option<u64>,
    },
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("writing {}", path.display()))
}

fn load_model(path: &Path) -> Result<SubblockedModel> {
    let doc: ModelDocument = load_json(path)?;
    doc.into_model()
        .with_context(|| format!("building model from {}", path.display()))
}

fn check_model(model: &SubblockedModel) -> Result<()> {
    let report = validate_model(model);
    println!("Validation of {:?}: {}", model.name, report.summary());
    if !report.is_valid() {
        bail!("model {:?} failed validation", model.name);
    }
    Ok(())
}

fn base_config(common: &CommonArgs) -> Result<ComparisonConfig> {
    let mut config = match &common.config {
        Some(path) => load_json(path)?,
        None => ComparisonConfig::default(),
    };
    if !common.attributes.is_empty() {
        config.model_attribute = common.attributes.clone();
        config.point_attribute = common.attributes.clone();
    }
    if common.first_categorical {
        config.first_categorical = true;
    }
    if common.lowercase {
        config.label_case = LabelCase::Lowercase;
    }
    if common.top_n.is_some() {
        config.top_n = common.top_n;
    }
    Ok(config)
}

fn print_report(report: &DomainReport) {
    println!("\n{}", report.summary());

    for (title, table) in [
        (&report.side_a, &report.frequency_a),
        (&report.side_b, &report.frequency_b),
    ] {
        println!("\nFrequencies: {}", title);
        for row in &table.rows {
            println!("  {:<20} {:>10} {:>7.2}%", row.label, row.count, row.percent);
        }
    }

    println!("\nContingency ({} rows, {} columns):", report.side_a, report.side_b);
    print!("{}", report.contingency);
    if let Some(top) = &report.top_n {
        println!("\nTop categories:");
        print!("{}", top);
    }

    println!("\nClassification ({} as reference):", report.side_a);
    println!(
        "  {:<20} {:>9} {:>9} {:>9} {:>9}",
        "label", "precision", "recall", "f1", "support"
    );
    for c in &report.classification.classes {
        println!(
            "  {:<20} {:>9.3} {:>9.3} {:>9.3} {:>9}",
            c.label, c.precision, c.recall, c.f1, c.support
        );
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut config = base_config(&cli.common)?;

    let report = match cli.command {
        Command::Points {
            model,
            points,
            point_attribute,
            only_visible,
            unbounded,
        } => {
            if !point_attribute.is_empty() {
                config.point_attribute = point_attribute;
            }
            if only_visible {
                config.only_visible_points = true;
            }
            if unbounded {
                config.point_bounds = BoundsMode::Unbounded;
            }

            let model = load_model(&model)?;
            if cli.common.validate {
                check_model(&model)?;
            }
            let points_doc: PointsDocument = load_json(&points)?;
            let points = points_doc
                .into_points()
                .context("building point collection")?;

            let comparison = PointComparison::run(&model, &points, &config)?;
            let s = &comparison.summary;
            println!(
                "Resolved {} points: {} matched, {} outside, {} unresolved, {} skipped",
                s.total(),
                s.matched,
                s.outside,
                s.unresolved,
                comparison.skipped.len()
            );
            println!(
                "Subblocks hit: {} ({} contain mismatches)",
                comparison.unique_blocks_hit,
                comparison.block_mismatch.iter().filter(|&&m| m).count()
            );
            comparison.report(config.top_n)?
        }
        Command::Models {
            model_a,
            model_b,
            hint_a,
            hint_b,
            solid,
            max_cells,
        } => {
            if let Some(max) = max_cells {
                config.max_grid_cells = max;
            }
            let model_a = load_model(&model_a)?;
            let model_b = load_model(&model_b)?;
            if cli.common.validate {
                check_model(&model_a)?;
                check_model(&model_b)?;
            }
            let solid = match solid {
                Some(path) => {
                    let doc: SolidDocument = load_json(&path)?;
                    Some(doc.into_mesh().context("building solid")?)
                }
                None => None,
            };

            let comparison =
                ModelComparison::run(&model_a, &model_b, &hint_a, &hint_b, solid.as_ref(), &config)?;
            let counts = comparison.grid.counts();
            println!(
                "Comparison grid: cell {:?}, {} x {} x {}, {} centroids compared",
                comparison.grid.cell_size().to_array(),
                counts[0],
                counts[1],
                counts[2],
                comparison.centroids.len()
            );
            if comparison.solid_divergence > 0 {
                println!(
                    "Solid restriction differs between models for {} centroids",
                    comparison.solid_divergence
                );
            }
            println!(
                "Subblocks hit: {} in {:?}, {} in {:?}",
                comparison.unique_blocks_hit_a,
                model_a.name,
                comparison.unique_blocks_hit_b,
                model_b.name
            );
            comparison.report(config.top_n)?
        }
    };

    print_report(&report);

    if let Some(path) = &cli.common.output {
        write_json(path, &report)?;
        println!("\nReport written to {}", path.display());
    }
    Ok(())
}
