//! Auto-annotation pipeline.
//!
//! image file -> sniff -> POST -> parse -> label file.
//!
//! Every failure aborts the run before the label file is opened, so an
//! existing (possibly hand-made) label file survives any failed attempt.
//! The pipeline blocks for the whole round trip and has no timeout of its
//! own; interactive callers should use [`AnnotateJob`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::client::InferenceClient;
use crate::error::{AnnotateError, AnnotateResult};
use crate::labels::LabelWriter;

const LABEL_EXTENSION: &str = "txt";

/// When an image that already has a label file gets re-annotated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnnotateMode {
    /// Only annotate images without a label file.
    #[default]
    IfMissing,
    /// Always regenerate the label file.
    Always,
}

impl AnnotateMode {
    pub fn from_always(always: bool) -> Self {
        if always {
            AnnotateMode::Always
        } else {
            AnnotateMode::IfMissing
        }
    }
}

/// What [`annotate_image`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Annotated { label_path: PathBuf, records: usize },
    KeptExisting { label_path: PathBuf },
}

impl Outcome {
    pub fn label_path(&self) -> &Path {
        match self {
            Outcome::Annotated { label_path, .. } | Outcome::KeptExisting { label_path } => {
                label_path
            }
        }
    }
}

/// Label file that belongs to `image_path`: same name, `.txt` extension.
pub fn label_path_for(image_path: &Path) -> PathBuf {
    image_path.with_extension(LABEL_EXTENSION)
}

/// Annotate one image into `label_path` using the default label format.
///
/// Returns the number of records written.
pub fn auto_annotate<C>(client: &C, image_path: &Path, label_path: &Path) -> AnnotateResult<usize>
where
    C: InferenceClient + ?Sized,
{
    auto_annotate_with(client, &LabelWriter::default(), image_path, label_path)
}

/// [`auto_annotate`] with an explicit label writer.
pub fn auto_annotate_with<C>(
    client: &C,
    writer: &LabelWriter,
    image_path: &Path,
    label_path: &Path,
) -> AnnotateResult<usize>
where
    C: InferenceClient + ?Sized,
{
    run(client, writer, image_path, label_path, None)
}

/// Annotate an image next to itself, honouring `mode`.
pub fn annotate_image<C>(
    client: &C,
    writer: &LabelWriter,
    image_path: &Path,
    mode: AnnotateMode,
) -> AnnotateResult<Outcome>
where
    C: InferenceClient + ?Sized,
{
    let label_path = label_path_for(image_path);
    if mode == AnnotateMode::IfMissing && label_path.exists() {
        log::debug!("keeping existing labels {}", label_path.display());
        return Ok(Outcome::KeptExisting { label_path });
    }
    let records = auto_annotate_with(client, writer, image_path, &label_path)?;
    Ok(Outcome::Annotated {
        label_path,
        records,
    })
}

fn run<C>(
    client: &C,
    writer: &LabelWriter,
    image_path: &Path,
    label_path: &Path,
    cancel: Option<&AtomicBool>,
) -> AnnotateResult<usize>
where
    C: InferenceClient + ?Sized,
{
    let image = read_image(image_path)?;
    let result = client.predict(&image)?;
    drop(image);

    if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
        log::debug!("annotation of {} cancelled", image_path.display());
        return Err(AnnotateError::Cancelled);
    }
    writer.write(label_path, result.detections())
}

fn read_image(path: &Path) -> AnnotateResult<Vec<u8>> {
    let bytes = std::fs::read(path).map_err(|e| {
        AnnotateError::input(format!("cannot read image {}: {}", path.display(), e))
    })?;
    if bytes.is_empty() {
        return Err(AnnotateError::input(format!(
            "image {} is empty",
            path.display()
        )));
    }
    Ok(bytes)
}

/// A pipeline run on its own thread.
///
/// Cancelling cannot interrupt a request already in flight, but a cancelled
/// job never opens the label file. Dropping an unjoined job cancels it.
pub struct AnnotateJob {
    cancel: Arc<AtomicBool>,
    join: Option<JoinHandle<AnnotateResult<usize>>>,
}

impl AnnotateJob {
    pub fn spawn(
        client: Arc<dyn InferenceClient>,
        writer: LabelWriter,
        image_path: PathBuf,
        label_path: PathBuf,
    ) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();
        let join = std::thread::spawn(move || {
            run(
                client.as_ref(),
                &writer,
                &image_path,
                &label_path,
                Some(flag.as_ref()),
            )
        });
        Self {
            cancel,
            join: Some(join),
        }
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the run to end. A panic on the worker is re-raised here.
    pub fn join(mut self) -> AnnotateResult<usize> {
        match self.join.take() {
            Some(join) => match join.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            },
            None => Err(AnnotateError::Cancelled),
        }
    }
}

impl Drop for AnnotateJob {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{DetectionParser, InferenceResult};
    use crate::error::ErrorKind;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc::{self, Receiver};
    use std::sync::Mutex;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    struct FakeClient {
        body: &'static str,
        calls: AtomicUsize,
    }

    impl FakeClient {
        fn new(body: &'static str) -> Self {
            Self {
                body,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl InferenceClient for FakeClient {
        fn set_endpoint(&mut self, _url: Option<&str>) {}

        fn endpoint(&self) -> Option<&str> {
            Some("fake://")
        }

        fn predict(&self, image: &[u8]) -> AnnotateResult<InferenceResult> {
            crate::sniff::sniff_certain(image)?;
            self.calls.fetch_add(1, Ordering::SeqCst);
            DetectionParser::default().parse_response(self.body.as_bytes())
        }
    }

    /// Blocks in `predict` until the test releases it.
    struct GatedClient {
        gate: Mutex<Receiver<()>>,
    }

    impl InferenceClient for GatedClient {
        fn set_endpoint(&mut self, _url: Option<&str>) {}

        fn endpoint(&self) -> Option<&str> {
            None
        }

        fn predict(&self, _image: &[u8]) -> AnnotateResult<InferenceResult> {
            let gate = self.gate.lock().expect("gate lock");
            let _ = gate.recv();
            DetectionParser::default().parse_response(br#"{"detections": []}"#)
        }
    }

    const ONE_BOX: &str =
        r#"{"detections": [{"class_index": 2, "left": 0.1, "top": 0.2, "width": 0.3, "height": 0.4}]}"#;

    #[test]
    fn label_path_replaces_extension() {
        assert_eq!(
            label_path_for(Path::new("/data/img/cat.jpg")),
            PathBuf::from("/data/img/cat.txt")
        );
        assert_eq!(
            label_path_for(Path::new("/data/img/noext")),
            PathBuf::from("/data/img/noext.txt")
        );
        assert_eq!(
            label_path_for(Path::new("/data/v1.2/frame.0001.png")),
            PathBuf::from("/data/v1.2/frame.0001.txt")
        );
    }

    #[test]
    fn writes_center_form_records() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let image = dir.path().join("a.png");
        let labels = dir.path().join("a.txt");
        std::fs::write(&image, PNG)?;

        let client = FakeClient::new(ONE_BOX);
        assert_eq!(auto_annotate(&client, &image, &labels)?, 1);
        assert_eq!(std::fs::read_to_string(&labels)?, "2 0.25 0.4 0.3 0.4\n");
        Ok(())
    }

    #[test]
    fn unreadable_or_empty_image_never_calls_client() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let labels = dir.path().join("a.txt");
        let empty = dir.path().join("empty.png");
        std::fs::write(&empty, b"")?;

        let client = FakeClient::new(ONE_BOX);
        let err = auto_annotate(&client, &dir.path().join("missing.png"), &labels).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        let err = auto_annotate(&client, &empty, &labels).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
        assert!(!labels.exists());
        Ok(())
    }

    #[test]
    fn parse_failure_leaves_existing_labels() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let image = dir.path().join("a.png");
        let labels = dir.path().join("a.txt");
        std::fs::write(&image, PNG)?;
        std::fs::write(&labels, "5 0.5 0.5 0.1 0.1\n")?;

        let client = FakeClient::new("<html>oops</html>");
        let err = auto_annotate(&client, &image, &labels).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(std::fs::read_to_string(&labels)?, "5 0.5 0.5 0.1 0.1\n");
        Ok(())
    }

    #[test]
    fn missing_detections_key_writes_empty_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let image = dir.path().join("a.png");
        let labels = dir.path().join("a.txt");
        std::fs::write(&image, PNG)?;
        std::fs::write(&labels, "5 0.5 0.5 0.1 0.1\n")?;

        let client = FakeClient::new(r#"{"message": "nothing found"}"#);
        assert_eq!(auto_annotate(&client, &image, &labels)?, 0);
        assert_eq!(std::fs::read(&labels)?, b"");
        Ok(())
    }

    #[test]
    fn annotate_image_respects_mode() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let image = dir.path().join("b.png");
        std::fs::write(&image, PNG)?;
        let client = FakeClient::new(ONE_BOX);
        let writer = LabelWriter::default();

        let first = annotate_image(&client, &writer, &image, AnnotateMode::IfMissing)?;
        assert_eq!(
            first,
            Outcome::Annotated {
                label_path: dir.path().join("b.txt"),
                records: 1
            }
        );

        std::fs::write(first.label_path(), "0 0.5 0.5 1 1\n")?;
        let second = annotate_image(&client, &writer, &image, AnnotateMode::IfMissing)?;
        assert!(matches!(second, Outcome::KeptExisting { .. }));
        assert_eq!(std::fs::read_to_string(second.label_path())?, "0 0.5 0.5 1 1\n");

        let third = annotate_image(&client, &writer, &image, AnnotateMode::Always)?;
        assert!(matches!(third, Outcome::Annotated { records: 1, .. }));
        assert_eq!(
            std::fs::read_to_string(third.label_path())?,
            "2 0.25 0.4 0.3 0.4\n"
        );
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[test]
    fn job_completes_in_background() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let image = dir.path().join("c.png");
        let labels = dir.path().join("c.txt");
        std::fs::write(&image, PNG)?;

        let client: Arc<dyn InferenceClient> = Arc::new(FakeClient::new(ONE_BOX));
        let job = AnnotateJob::spawn(client, LabelWriter::default(), image, labels.clone());
        assert_eq!(job.join()?, 1);
        assert_eq!(std::fs::read_to_string(&labels)?, "2 0.25 0.4 0.3 0.4\n");
        Ok(())
    }

    #[test]
    fn cancelled_job_does_not_touch_labels() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let image = dir.path().join("d.png");
        let labels = dir.path().join("d.txt");
        std::fs::write(&image, PNG)?;
        std::fs::write(&labels, "1 0.5 0.5 0.2 0.2\n")?;

        let (release, gate) = mpsc::channel();
        let client: Arc<dyn InferenceClient> = Arc::new(GatedClient {
            gate: Mutex::new(gate),
        });
        let job = AnnotateJob::spawn(client, LabelWriter::default(), image, labels.clone());
        assert!(!job.is_finished());
        job.cancel();
        release.send(())?;

        assert_eq!(job.join().unwrap_err().kind(), ErrorKind::Cancelled);
        assert_eq!(std::fs::read_to_string(&labels)?, "1 0.5 0.5 0.2 0.2\n");
        Ok(())
    }
}
