use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use personal_color::{is_allowed_upload, AnalysisResponse, Analyzer, AnalyzerConfig};
use serde::Serialize;
use skin_color::PrecomputedParser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use type_classifier::ClassifierModel;

#[derive(Parser)]
#[command(name = "personal-color")]
#[command(about = "Personal color analysis from face photos")]
struct Cli {
    /// JSON configuration file (defaults are used for missing fields)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diagnose the lighting of a photo and preview the corrections
    Diagnose {
        /// Photo to inspect (PNG or JPEG)
        image: PathBuf,

        /// Write the corrected image here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Classify the personal color type of a photo
    Analyze {
        /// Photo to analyze (PNG or JPEG)
        image: PathBuf,

        /// Face-parsing label map for the photo at 448x448 (grayscale PNG, one label id per pixel)
        #[arg(short, long)]
        labels: PathBuf,

        /// Classifier model JSON (defaults to the bundled reference model)
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct DiagnoseOutput<'a> {
    diagnosis: &'a lighting_correction::LightingReport,
    corrections: &'a [String],
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AnalyzerConfig::from_json_file(path)?,
        None => AnalyzerConfig::default(),
    };

    match cli.command {
        Commands::Diagnose { image, output } => diagnose(config, &image, output.as_deref()),
        Commands::Analyze { image, labels, model } => analyze(config, &image, &labels, model.as_deref()),
    }
}

fn check_upload(path: &Path) -> Result<()> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if !is_allowed_upload(name) {
        bail!("File type not allowed: {} (expected png, jpg or jpeg)", path.display());
    }
    Ok(())
}

fn diagnose(config: AnalyzerConfig, image_path: &Path, output: Option<&Path>) -> Result<()> {
    check_upload(image_path)?;
    let image = image::open(image_path)
        .with_context(|| format!("Failed to open image: {}", image_path.display()))?
        .to_rgb8();

    // Lighting preview needs no face model
    let pipeline = lighting_correction::CorrectionPipeline::new(config.correction);
    let corrected = pipeline.correct(&image, None);
    let report = corrected.diagnosis.report();

    let json = serde_json::to_string_pretty(&DiagnoseOutput {
        diagnosis: &report,
        corrections: corrected.log.entries(),
    })
    .context("Failed to serialize lighting report")?;
    println!("{json}");

    if let Some(output) = output {
        corrected
            .image
            .save(output)
            .with_context(|| format!("Failed to write corrected image to {}", output.display()))?;
        info!(path = %output.display(), "Corrected image saved");
    }
    Ok(())
}

fn analyze(config: AnalyzerConfig, image_path: &Path, labels: &Path, model: Option<&Path>) -> Result<()> {
    check_upload(image_path)?;
    let parser = Arc::new(PrecomputedParser::from_label_file(labels)?);
    let model = match model {
        Some(path) => ClassifierModel::from_json_file(path)?,
        None => ClassifierModel::reference()?,
    };
    let analyzer = Analyzer::new(config, parser, model)?;

    let bytes = std::fs::read(image_path)
        .with_context(|| format!("Failed to read image: {}", image_path.display()))?;
    let outcome = analyzer.analyze_bytes(&bytes);

    let json = serde_json::to_string_pretty(&AnalysisResponse::from(&outcome))
        .context("Failed to serialize analysis response")?;
    println!("{json}");
    Ok(())
}
