use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use veriface_core::{
    composite_score, enroll, filter_candidates, identify, select_best_face, verify, Calibration,
    Capture, Detection, Embedding, EnrolledModel, FaceDetector,
};

#[derive(Parser)]
#[command(name = "veriface", about = "Veriface decision engine CLI")]
struct Cli {
    /// Calibration TOML overriding the built-in heuristic constants
    #[arg(long, global = true)]
    calibration: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick the best face from a JSON file of detection records
    Select {
        /// JSON array of detections for one image
        detections: PathBuf,
    },
    /// Fuse several captures into one enrollment embedding
    Enroll {
        /// One JSON detections file per capture
        captures: Vec<PathBuf>,
        /// Where to write the fused embedding JSON (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Verify a probe embedding against a reference embedding
    Verify {
        probe: PathBuf,
        reference: PathBuf,
        /// Match threshold in [0, 1] (e.g. 0.75-0.85 depending on risk tolerance)
        #[arg(short, long)]
        threshold: f32,
    },
    /// Identify a probe embedding against a gallery of enrolled models
    Identify {
        probe: PathBuf,
        /// JSON array of {id, name, embedding} records
        gallery: PathBuf,
        #[arg(short, long)]
        threshold: f32,
    },
}

/// Detections recorded to JSON by the upstream detector stand in for live
/// inference: each "image" is its pre-computed detection list.
struct RecordedDetector;

impl FaceDetector for RecordedDetector {
    type Image = Vec<Detection>;
    type Error = Infallible;

    fn detect(&mut self, image: &Vec<Detection>) -> Result<Vec<Detection>, Infallible> {
        Ok(image.clone())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let cal = match &cli.calibration {
        Some(path) => Calibration::load(path)
            .with_context(|| format!("loading calibration from {}", path.display()))?,
        None => Calibration::default(),
    };

    match cli.command {
        Commands::Select { detections } => {
            let records = read_detections(&detections)?;
            let candidates = filter_candidates(records, &cal);
            match select_best_face(&candidates, &cal) {
                Some(best) => {
                    let score = composite_score(best, &cal.selector);
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&serde_json::json!({
                            "score": score,
                            "detection": best,
                        }))?
                    );
                }
                None => println!("no face detected"),
            }
        }
        Commands::Enroll { captures, output } => {
            if captures.is_empty() {
                bail!("at least one captures file is required");
            }
            let images: Vec<Vec<Detection>> = captures
                .iter()
                .map(|p| read_detections(p))
                .collect::<Result<_>>()?;

            let Some(fused) = enroll(&mut RecordedDetector, &images, &cal)? else {
                bail!("no usable face in any capture");
            };
            tracing::info!(
                dim = fused.embedding.len(),
                latency_ms = fused.latency_ms,
                "enrollment embedding fused"
            );

            let json = serde_json::to_string_pretty(&fused)?;
            match output {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{json}"),
            }
        }
        Commands::Verify {
            probe,
            reference,
            threshold,
        } => {
            let probe = read_embedding(&probe)?;
            let reference = read_embedding(&reference)?;
            let result = verify(&probe, &reference, threshold, &cal)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Identify {
            probe,
            gallery,
            threshold,
        } => {
            let probe = read_embedding(&probe)?;
            let gallery: Vec<EnrolledModel> = read_json(&gallery)?;
            let result = identify(&probe, &gallery, threshold, &cal);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn read_detections(path: &Path) -> Result<Vec<Detection>> {
    read_json(path)
}

/// Accepts either a full capture record as written by `enroll` or a bare
/// embedding (`{"values": [...]}`).
fn read_embedding(path: &Path) -> Result<Embedding> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    if let Ok(capture) = serde_json::from_str::<Capture>(&raw) {
        return Ok(capture.embedding);
    }
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}
