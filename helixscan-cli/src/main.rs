//! helixscan command-line front end

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use helixscan_algorithms::{CalibrationConfig, CalibrationFit, CalibrationFitter, CostKind, ParameterSearch};
use helixscan_core::CalibrationModel;
use helixscan_io::{MeshEncoding, ScanCsvReader};
use helixscan_reconstruction::{stitch_layers, PipelineConfig, ScanPipeline};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Turntable distance scan processing
#[derive(Debug, Parser)]
#[command(author, version, about = "Reconstruct, calibrate and mesh turntable scans")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconstruct a scan into a layered cloud and a stitched mesh
    Reconstruct(ReconstructArgs),
    /// Fit calibration parameters to a scan of a square reference object
    Calibrate(CalibrateArgs),
    /// Stitch a cloud CSV into a mesh
    Mesh(MeshArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModelArg {
    /// Linear correction with an ideal sensor response
    Linear,
    /// Linear correction with the bench-measured sensor response
    Legacy,
    Quadratic,
}

impl From<ModelArg> for CalibrationModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Linear => CalibrationModel::linear(),
            ModelArg::Legacy => CalibrationModel::legacy_sensor(),
            ModelArg::Quadratic => CalibrationModel::Quadratic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CostArg {
    Squared,
    Absolute,
}

impl From<CostArg> for CostKind {
    fn from(arg: CostArg) -> Self {
        match arg {
            CostArg::Squared => CostKind::Squared,
            CostArg::Absolute => CostKind::Absolute,
        }
    }
}

#[derive(Debug, Args)]
struct ReconstructArgs {
    /// Scan CSV file
    #[arg(long)]
    scan: PathBuf,
    /// JSON pipeline configuration; factory defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Where to write the cloud CSV
    #[arg(long)]
    cloud_out: Option<PathBuf>,
    /// Where to write the mesh (.stl or .ply)
    #[arg(long)]
    mesh_out: Option<PathBuf>,
    /// Write the mesh as text instead of binary
    #[arg(long)]
    ascii: bool,
    #[command(flatten)]
    overrides: Overrides,
}

/// Flags overriding values from the configuration file
#[derive(Debug, Default, Args)]
struct Overrides {
    #[arg(long)]
    sensor_axis_distance: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    horizontal_offset: Option<f64>,
    #[arg(long)]
    scale_factor: Option<f64>,
    #[arg(long)]
    layer_height: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    initial_height: Option<f64>,
    /// Ring smoothing window
    #[arg(long)]
    smoothing: Option<usize>,
    /// Median filter window over raw readings
    #[arg(long)]
    noise_window: Option<usize>,
    #[arg(long, value_enum)]
    model: Option<ModelArg>,
    /// Steps per revolution for scans without an angle column
    #[arg(long)]
    points_per_layer: Option<u32>,
}

impl Overrides {
    fn apply(&self, config: &mut PipelineConfig) {
        let calibration = &mut config.reconstruction.calibration;
        if let Some(v) = self.sensor_axis_distance {
            calibration.sensor_axis_distance = v;
        }
        if let Some(v) = self.horizontal_offset {
            calibration.horizontal_offset = v;
        }
        if let Some(v) = self.scale_factor {
            calibration.scale_factor = v;
        }
        if let Some(v) = self.layer_height {
            config.reconstruction.layer_height = v;
        }
        if let Some(v) = self.initial_height {
            config.reconstruction.initial_height = v;
        }
        if let Some(v) = self.smoothing {
            config.smoothing_window = v;
        }
        if let Some(v) = self.noise_window {
            config.noise_window = v;
        }
        if let Some(model) = self.model {
            config.model = model.into();
        }
        if let Some(v) = self.points_per_layer {
            config.points_per_layer = v;
        }
    }
}

#[derive(Debug, Args)]
struct CalibrateArgs {
    /// Scan CSV of the square reference object
    #[arg(long)]
    scan: PathBuf,
    /// Side length of the reference square (mm)
    #[arg(long, default_value_t = 80.0)]
    side_length: f64,
    /// Hold the horizontal offset at this value and fit axis distance and scale
    #[arg(long, allow_hyphen_values = true)]
    fixed_offset: Option<f64>,
    #[arg(long, value_enum, default_value_t = CostArg::Squared)]
    cost: CostArg,
    #[arg(long, value_enum, default_value_t = ModelArg::Linear)]
    model: ModelArg,
    /// Steps per revolution for scans without an angle column
    #[arg(long, default_value_t = 128)]
    points_per_layer: u32,
    /// Where to write the fit as JSON
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct MeshArgs {
    /// Cloud CSV file
    #[arg(long)]
    cloud: PathBuf,
    /// Where to write the mesh (.stl or .ply)
    #[arg(long)]
    out: PathBuf,
    /// Write the mesh as text instead of binary
    #[arg(long)]
    ascii: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Reconstruct(args) => reconstruct(&args),
        Command::Calibrate(args) => calibrate(&args),
        Command::Mesh(args) => mesh(&args),
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let data = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing config {}", path.display()))
}

fn encoding(ascii: bool) -> MeshEncoding {
    if ascii {
        MeshEncoding::Ascii
    } else {
        MeshEncoding::Binary
    }
}

fn reconstruct(args: &ReconstructArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    args.overrides.apply(&mut config);

    let samples = ScanCsvReader::read_scan_with_steps(&args.scan, config.points_per_layer)
        .with_context(|| format!("reading scan {}", args.scan.display()))?;
    let output = ScanPipeline::new(config).run(&samples)?;

    if let Some(path) = &args.cloud_out {
        helixscan_io::write_cloud(path, &output.cloud)
            .with_context(|| format!("writing cloud {}", path.display()))?;
        info!(path = %path.display(), points = output.cloud.point_count(), "Cloud written");
    }
    if let Some(path) = &args.mesh_out {
        helixscan_io::write_mesh_with_encoding(path, &output.mesh, encoding(args.ascii))
            .with_context(|| format!("writing mesh {}", path.display()))?;
        info!(path = %path.display(), faces = output.mesh.face_count(), "Mesh written");
    }

    println!(
        "{} layers, {} points, {} faces",
        output.cloud.layer_count(),
        output.cloud.point_count(),
        output.mesh.face_count()
    );
    Ok(())
}

fn calibration_config(args: &CalibrateArgs) -> CalibrationConfig {
    CalibrationConfig {
        side_length: args.side_length,
        model: args.model.into(),
        search: match args.fixed_offset {
            Some(offset) => ParameterSearch::two_parameter(offset),
            None => ParameterSearch::three_parameter(),
        },
        cost: args.cost.into(),
        ..CalibrationConfig::default()
    }
}

fn print_fit(fit: &CalibrationFit, side_length: f64) {
    let p = &fit.parameters;
    println!("sensor_axis_distance: {:.3} mm", p.sensor_axis_distance);
    println!("horizontal_offset:    {:.3} mm", p.horizontal_offset);
    println!("scale_factor:         {:.4}", p.scale_factor);
    println!("final error:          {:.6}", fit.final_error);
    println!(
        "dimensions:           {:.2} x {:.2} mm (expected {:.2} x {:.2})",
        fit.achieved_dimensions.0, fit.achieved_dimensions.1, side_length, side_length
    );
    println!("iterations:           {} ({} evaluations)", fit.iterations, fit.evaluations);
}

fn calibrate(args: &CalibrateArgs) -> Result<()> {
    let samples = ScanCsvReader::read_scan_with_steps(&args.scan, args.points_per_layer)
        .with_context(|| format!("reading scan {}", args.scan.display()))?;
    let fit = CalibrationFitter::new(calibration_config(args)).fit(&samples)?;
    print_fit(&fit, args.side_length);

    if let Some(path) = &args.out {
        let json = serde_json::to_string_pretty(&fit)?;
        fs::write(path, json).with_context(|| format!("writing fit {}", path.display()))?;
    }

    fit.into_parameters().context("calibration did not converge")?;
    Ok(())
}

fn mesh(args: &MeshArgs) -> Result<()> {
    let cloud = helixscan_io::read_cloud(&args.cloud)
        .with_context(|| format!("reading cloud {}", args.cloud.display()))?;
    let mesh = stitch_layers(&cloud);
    helixscan_io::write_mesh_with_encoding(&args.out, &mesh, encoding(args.ascii))
        .with_context(|| format!("writing mesh {}", args.out.display()))?;
    println!("{} faces", mesh.face_count());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let cli = Cli::parse_from([
            "helixscan",
            "reconstruct",
            "--scan",
            "scan.csv",
            "--horizontal-offset",
            "-2.5",
            "--smoothing",
            "1",
            "--model",
            "legacy",
        ]);
        let Command::Reconstruct(args) = cli.command else {
            panic!("expected reconstruct");
        };

        let mut config = PipelineConfig::default();
        args.overrides.apply(&mut config);
        assert_eq!(config.reconstruction.calibration.horizontal_offset, -2.5);
        assert_eq!(config.reconstruction.calibration.sensor_axis_distance, 157.0);
        assert_eq!(config.smoothing_window, 1);
        assert_eq!(config.model, CalibrationModel::legacy_sensor());
    }

    #[test]
    fn test_calibrate_search_choice() {
        let cli = Cli::parse_from(["helixscan", "calibrate", "--scan", "ref.csv", "--fixed-offset", "3"]);
        let Command::Calibrate(args) = cli.command else {
            panic!("expected calibrate");
        };
        let config = calibration_config(&args);
        assert_eq!(config.search, ParameterSearch::two_parameter(3.0));
        assert_eq!(config.cost, CostKind::Squared);
        assert_eq!(config.side_length, 80.0);
    }

    #[test]
    fn test_missing_config_file_is_reported() {
        let err = load_config(Some(Path::new("/nonexistent/helixscan.json"))).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
