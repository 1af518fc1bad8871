//! annotate - write detector label files next to images
//!
//! For each image the label file is `<image stem>.txt` (or `--label` for a
//! single image). Images that already have a label file are left alone unless
//! `--always` is given or `ANNOTATOR_ALWAYS_REANNOTATE` is set.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use auto_annotate::{
    annotate_image, auto_annotate_with, AnnotateMode, AnnotatorConfig, InferenceClient, Outcome,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about = "Annotate images with a remote object detector")]
struct Args {
    /// Images to annotate (jpeg, png, ...).
    #[arg(required = true, value_name = "IMAGE")]
    images: Vec<PathBuf>,
    /// Inference endpoint; overrides the configured server_url.
    #[arg(long, value_name = "URL")]
    server_url: Option<String>,
    /// Re-annotate even when a label file already exists.
    #[arg(long)]
    always: bool,
    /// Explicit label file path (single image only).
    #[arg(long, value_name = "FILE")]
    label: Option<PathBuf>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = ui::Ui::from_args(
        &args.ui,
        std::io::stderr().is_terminal(),
        !std::io::stdout().is_terminal(),
    );

    if args.label.is_some() && args.images.len() != 1 {
        return Err(anyhow!("--label can only be used with a single image"));
    }

    let config = AnnotatorConfig::load()?;
    let mut client = config.build_client();
    if let Some(url) = args.server_url.as_deref() {
        client.set_endpoint(Some(url));
    }
    let writer = config.label_writer();
    let mode = if args.always {
        AnnotateMode::Always
    } else {
        config.annotate_mode()
    };
    log::info!(
        "endpoint: {}",
        client.endpoint().unwrap_or("<unset>")
    );

    let mut failures = 0usize;
    for image in &args.images {
        let mut stage = ui.stage(&format!("Annotate {}", image.display()));
        let result = match args.label.as_deref() {
            Some(label_path) => auto_annotate_with(&client, &writer, image, label_path).map(
                |records| Outcome::Annotated {
                    label_path: label_path.to_path_buf(),
                    records,
                },
            ),
            None => annotate_image(&client, &writer, image, mode),
        };
        match result {
            Ok(Outcome::Annotated {
                label_path,
                records,
            }) => {
                println!("{}: {} detection(s) -> {}", image.display(), records, label_path.display());
            }
            Ok(Outcome::KeptExisting { label_path }) => {
                println!("{}: kept existing {}", image.display(), label_path.display());
            }
            Err(err) => {
                stage.fail();
                log::error!("{}: {}", image.display(), err);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(anyhow!(
            "{} of {} image(s) failed",
            failures,
            args.images.len()
        ));
    }
    Ok(())
}
