//! iaview - slice and explore N-dimensional scan data.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use iaview::data::{create_from_source, load_dataset, Dataset, Metadata};
use iaview::session::Session;
use iaview::slicing::{AxisRole, AxisRoleAssignment, SliceProjector};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "iaview")]
#[command(about = "Slice and explore N-dimensional scan data", long_about = None)]
struct Args {
    /// Enable logging to specified file
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a container from a NIfTI file or a directory of NIfTI files
    Create {
        /// Source file (.nii, .nii.gz) or directory
        source: PathBuf,
        /// Container to write
        output: PathBuf,
        /// Axis labels, comma separated (default H,K,L,...)
        #[arg(long, value_delimiter = ',')]
        labels: Option<Vec<String>>,
        /// Coordinates of the stitching axis, comma separated
        #[arg(long = "axis-values", value_delimiter = ',', allow_negative_numbers = true)]
        axis_values: Option<Vec<f64>>,
        /// Metadata entry, repeatable
        #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_meta)]
        meta: Vec<(String, serde_json::Value)>,
    },
    /// Print the axes and metadata of a container
    Info {
        /// Container to inspect
        container: PathBuf,
    },
    /// Print one projected slice as tab-separated values
    Slice {
        /// Container to slice
        container: PathBuf,
        /// Axis shown horizontally (label or index)
        #[arg(long)]
        horizontal: Option<String>,
        /// Axis shown vertically (label or index)
        #[arg(long)]
        vertical: Option<String>,
        /// Fixed axis position, repeatable
        #[arg(long = "fix", value_name = "AXIS=INDEX", value_parser = parse_fix)]
        fix: Vec<(String, usize)>,
    },
    /// Open the interactive viewer
    View {
        /// Container to open
        container: PathBuf,
    },
}

fn parse_meta(s: &str) -> std::result::Result<(String, serde_json::Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err("metadata key must not be empty".to_string());
    }
    // numbers, booleans and null keep their type; anything else is a string
    let value = match serde_json::from_str::<serde_json::Value>(value) {
        Ok(v) if !v.is_array() && !v.is_object() => v,
        _ => serde_json::Value::String(value.to_string()),
    };
    Ok((key.to_string(), value))
}

fn parse_fix(s: &str) -> std::result::Result<(String, usize), String> {
    let (axis, index) = s
        .split_once('=')
        .ok_or_else(|| format!("expected AXIS=INDEX, got '{}'", s))?;
    let index = index
        .parse()
        .map_err(|_| format!("'{}' is not a valid index", index))?;
    Ok((axis.to_string(), index))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging if --log option is provided
    if let Some(log_path) = &args.log {
        let file = std::fs::File::create(log_path)
            .with_context(|| format!("cannot open log file {}", log_path.display()))?;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
        tracing::info!("Starting iaview");
    }

    match args.command {
        Command::Create {
            source,
            output,
            labels,
            axis_values,
            meta,
        } => {
            let metadata = if meta.is_empty() {
                None
            } else {
                Some(meta.into_iter().collect::<Metadata>())
            };
            create_from_source(&source, &output, labels, axis_values.as_deref(), metadata)?;
            println!("Created {}", output.display());
        }
        Command::Info { container } => {
            let dataset = load_dataset(&container)?;
            print_info(&container, &dataset)?;
        }
        Command::Slice {
            container,
            horizontal,
            vertical,
            fix,
        } => {
            let dataset = load_dataset(&container)?;
            let roles = build_roles(&dataset, horizontal.as_deref(), vertical.as_deref(), &fix)?;
            print_slice(&dataset, &roles)?;
        }
        Command::View { container } => {
            let session = Session::open(&container)?;
            iaview::viewer::run(session)?;
        }
    }

    if args.log.is_some() {
        tracing::info!("iaview exited");
    }
    Ok(())
}

/// Resolve an axis given by label or zero-based index.
fn resolve_axis(dataset: &Dataset, axis: &str) -> Result<usize> {
    if let Some(i) = dataset.axes().position(axis) {
        return Ok(i);
    }
    match axis.parse::<usize>() {
        Ok(i) if i < dataset.ndim() => Ok(i),
        _ => bail!(
            "unknown axis '{}' (axes: {})",
            axis,
            dataset.labels().join(", ")
        ),
    }
}

fn build_roles(
    dataset: &Dataset,
    horizontal: Option<&str>,
    vertical: Option<&str>,
    fix: &[(String, usize)],
) -> Result<AxisRoleAssignment> {
    let mut roles = AxisRoleAssignment::new(dataset.shape())?;
    if let Some(axis) = horizontal {
        roles.assign_role(resolve_axis(dataset, axis)?, AxisRole::Horizontal)?;
    }
    if let Some(axis) = vertical {
        roles.assign_role(resolve_axis(dataset, axis)?, AxisRole::Vertical)?;
    }
    for (axis, index) in fix {
        roles.set_fixed_index(resolve_axis(dataset, axis)?, *index)?;
    }
    Ok(roles)
}

fn print_info(path: &Path, dataset: &Dataset) -> Result<()> {
    let mut out = BufWriter::new(io::stdout().lock());
    writeln!(out, "{}", path.display())?;
    writeln!(out, "shape: {:?}", dataset.shape())?;
    if let Some((lo, hi)) = dataset.min_max() {
        writeln!(out, "range: {} .. {}", lo, hi)?;
    }
    writeln!(out, "axes:")?;
    let axes = dataset.axes();
    for (i, spec) in axes.axes().iter().enumerate() {
        let last = spec.len().saturating_sub(1);
        let t = axes.coordinate_to_screen_transform(i)?;
        writeln!(
            out,
            "  {}: {} [{}] {} .. {} (origin {}, scale {}{})",
            i,
            spec.label(),
            spec.len(),
            axes.value_label(i, 0)?,
            axes.value_label(i, last)?,
            t.origin,
            t.scale,
            if spec.monotonic() { "" } else { ", by index" }
        )?;
    }
    writeln!(out, "metadata:")?;
    for (key, value) in dataset.metadata() {
        writeln!(out, "  {} = {}", key, value)?;
    }
    out.flush()?;
    Ok(())
}

fn print_slice(dataset: &Dataset, roles: &AxisRoleAssignment) -> Result<()> {
    let slice = SliceProjector::project(dataset, roles)?;
    let mut out = BufWriter::new(io::stdout().lock());

    let names = ["horizontal", "vertical"];
    for (k, label) in slice.labels.iter().enumerate() {
        writeln!(
            out,
            "# {}: {} (origin {}, scale {})",
            names[k], label, slice.origin[k], slice.scale[k]
        )?;
    }
    for (axis, index) in roles.fixed_axes() {
        writeln!(
            out,
            "# fixed: {}={} ({})",
            dataset.axes().axis(axis)?.label(),
            index,
            dataset.axes().value_label(axis, index)?
        )?;
    }

    // one line per vertical index, horizontal index across
    let bounds = slice.bounds();
    let rows = bounds.get(1).copied().unwrap_or(1);
    for v in 0..rows {
        let line: Vec<String> = (0..bounds[0])
            .map(|h| {
                let index = if slice.ndim() == 2 { vec![h, v] } else { vec![h] };
                slice
                    .get(&index)
                    .map_or_else(|| "NaN".to_string(), |x| x.to_string())
            })
            .collect();
        writeln!(out, "{}", line.join("\t"))?;
    }
    out.flush()?;
    Ok(())
}
