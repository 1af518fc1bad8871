//! ai_predict - submit images to the inference service and print the replies
//!
//! Useful for checking a detector endpoint by hand; no label files are written.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use auto_annotate::{AnnotatorConfig, InferenceClient};

#[derive(Parser, Debug)]
#[command(author, version, about = "Print raw detector responses for images")]
struct Args {
    /// Images to submit.
    #[arg(required = true, value_name = "IMAGE")]
    images: Vec<PathBuf>,
    /// Inference endpoint; overrides the configured server_url.
    #[arg(long, value_name = "URL")]
    server_url: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = AnnotatorConfig::load()?;
    let mut client = config.build_client();
    if let Some(url) = args.server_url.as_deref() {
        client.set_endpoint(Some(url));
    }

    for image in &args.images {
        let bytes = std::fs::read(image)
            .with_context(|| format!("failed to read image {}", image.display()))?;
        if bytes.is_empty() {
            return Err(anyhow!("image {} is empty", image.display()));
        }
        let result = client
            .predict(&bytes)
            .with_context(|| format!("prediction failed for {}", image.display()))?;
        println!(
            "== image_file: {}, {} detection(s), result:\n{}",
            image.display(),
            result.detections().len(),
            serde_json::to_string_pretty(result.raw())?
        );
    }
    Ok(())
}
