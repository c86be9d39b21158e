// loader.rs: background loading of the panorama raster and the SVG overlay
//
// Both loads run on their own thread and report back over one channel; the
// render thread polls it once per event-loop iteration.

use crate::annotation::AnnotationDocument;
use crate::config::PanoramaConfig;
use crate::error::AnnotationError;
use crate::hit_region::HitRegionIndex;
use image::io::Reader as ImageReader;
use image::GenericImageView;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

const RETRY_BACKOFF: Duration = Duration::from_millis(200);

pub enum LoadEvent {
    Panorama(image::RgbaImage),
    PanoramaFailed(String),
    Annotations(Result<AnnotationDocument, AnnotationError>),
}

pub fn spawn_panorama_load(path: PathBuf, tx: Sender<LoadEvent>) {
    thread::spawn(move || {
        log::info!("loading panorama {}", path.display());
        let event = match decode_image(&path) {
            Ok(rgba) => LoadEvent::Panorama(rgba),
            Err(e) => LoadEvent::PanoramaFailed(format!("{}: {e}", path.display())),
        };
        if tx.send(event).is_err() {
            log::warn!("viewer closed before the panorama finished loading");
        }
    });
}

fn decode_image(path: &Path) -> Result<image::RgbaImage, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    let img = ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)
        .and_then(|mut r| {
            r.no_limits();
            r.decode()
        })
        .map_err(|e| e.to_string())?;

    let (w, h) = img.dimensions();
    log::info!("panorama decoded: {w}x{h}");
    Ok(img.to_rgba8())
}

pub fn spawn_annotation_load(path: PathBuf, retries: u32, tx: Sender<LoadEvent>) {
    thread::spawn(move || {
        log::info!("loading annotations {}", path.display());
        let result = load_with_retries(&path, retries, RETRY_BACKOFF);
        if tx.send(LoadEvent::Annotations(result)).is_err() {
            log::warn!("viewer closed before the annotations finished loading");
        }
    });
}

/// Retries I/O failures up to `retries` extra times with linear backoff.
pub fn load_with_retries(
    path: &Path,
    retries: u32,
    backoff: Duration,
) -> Result<AnnotationDocument, AnnotationError> {
    let mut attempt = 0;
    loop {
        match AnnotationDocument::load(path) {
            Err(e) if e.is_retryable() && attempt < retries => {
                attempt += 1;
                log::warn!("annotation load attempt {attempt} failed: {e}; retrying");
                thread::sleep(backoff * attempt);
            }
            other => return other,
        }
    }
}

/// Progress of the annotation load as seen by the render thread.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationLoad {
    Pending { deadline: Instant },
    Ready { regions: usize },
    Failed(String),
    TimedOut,
}

impl AnnotationLoad {
    pub fn start(now: Instant, timeout: Duration) -> Self {
        AnnotationLoad::Pending {
            deadline: now + timeout,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AnnotationLoad::Pending { .. })
    }

    /// Moves a pending load past its deadline to `TimedOut`.
    /// Returns true on that transition.
    pub fn check_deadline(&mut self, now: Instant) -> bool {
        match self {
            AnnotationLoad::Pending { deadline } if now >= *deadline => {
                *self = AnnotationLoad::TimedOut;
                true
            }
            _ => false,
        }
    }

    /// Records a finished load. Results arriving after a timeout are dropped
    /// and `false` is returned.
    pub fn finish<T>(&mut self, result: &Result<T, AnnotationError>, regions: usize) -> bool {
        if !self.is_pending() {
            return false;
        }
        *self = match result {
            Ok(_) => AnnotationLoad::Ready { regions },
            Err(e) => AnnotationLoad::Failed(e.to_string()),
        };
        true
    }
}

/// Installs a finished annotation load as the live hit-region index.
/// A failed load leaves the index empty; a result that arrives after the
/// timeout leaves everything as it was. Returns whether `index` changed.
pub fn apply_annotations(
    result: Result<AnnotationDocument, AnnotationError>,
    load: &mut AnnotationLoad,
    index: &mut HitRegionIndex,
    pano: &PanoramaConfig,
) -> bool {
    let built = match &result {
        Ok(doc) => {
            check_document_width(doc.width, pano);
            let built = HitRegionIndex::build(&doc.annotations, pano);
            if built.is_empty() {
                log::warn!("annotation document has no item or panel regions");
            }
            built
        }
        Err(e) => {
            log::error!("annotations unavailable: {e}");
            HitRegionIndex::default()
        }
    };

    if !load.finish(&result, built.len()) {
        log::warn!("annotations arrived after the load timeout; ignored");
        return false;
    }
    log::info!(
        "hotspots ready: {} items, {} panels",
        built.items.len(),
        built.panels.len()
    );
    *index = built;
    true
}

/// Annotation x is arc length, so the SVG should be as wide as the cylinder is round.
fn check_document_width(width: Option<f32>, pano: &PanoramaConfig) {
    let Some(width) = width else {
        return;
    };
    let expected = pano.circumference();
    if ((width - expected) / expected).abs() > 0.01 {
        log::warn!(
            "annotation document is {width} wide but the panorama circumference is \
             {expected:.1}; hotspots will drift"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Annotation, AnnotationKind};
    use std::io::Write;
    use std::sync::mpsc::channel;

    #[test]
    fn deadline_moves_pending_to_timed_out() {
        let t0 = Instant::now();
        let mut load = AnnotationLoad::start(t0, Duration::from_secs(10));
        assert!(!load.check_deadline(t0 + Duration::from_secs(9)));
        assert!(load.is_pending());
        assert!(load.check_deadline(t0 + Duration::from_secs(10)));
        assert_eq!(load, AnnotationLoad::TimedOut);
        assert!(!load.check_deadline(t0 + Duration::from_secs(11)));
    }

    #[test]
    fn late_results_are_dropped() {
        let t0 = Instant::now();
        let mut load = AnnotationLoad::start(t0, Duration::ZERO);
        load.check_deadline(t0);
        let ok: Result<(), AnnotationError> = Ok(());
        assert!(!load.finish(&ok, 3));
        assert_eq!(load, AnnotationLoad::TimedOut);
    }

    #[test]
    fn finish_records_outcome() {
        let t0 = Instant::now();
        let mut load = AnnotationLoad::start(t0, Duration::from_secs(1));
        let ok: Result<(), AnnotationError> = Ok(());
        assert!(load.finish(&ok, 4));
        assert_eq!(load, AnnotationLoad::Ready { regions: 4 });

        let mut load = AnnotationLoad::start(t0, Duration::from_secs(1));
        let err: Result<(), AnnotationError> = Err(AnnotationError::InvalidLength {
            id: "a".into(),
            attr: "x",
            value: "1em".into(),
        });
        assert!(load.finish(&err, 0));
        assert!(matches!(load, AnnotationLoad::Failed(ref msg) if msg.contains("1em")));
    }

    #[test]
    fn missing_file_fails_after_retries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.svg");
        let err = load_with_retries(&path, 2, Duration::ZERO).unwrap_err();
        assert!(matches!(err, AnnotationError::Io { .. }));
    }

    #[test]
    fn annotation_thread_delivers_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"<svg xmlns="http://www.w3.org/2000/svg"><rect id="a" data-type="item" x="1" y="2" width="3" height="4"/></svg>"#
        )
        .unwrap();

        let (tx, rx) = channel();
        spawn_annotation_load(file.path().to_path_buf(), 0, tx);
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            LoadEvent::Annotations(Ok(doc)) => assert_eq!(doc.annotations.len(), 1),
            _ => panic!("expected a parsed document"),
        }
    }

    #[test]
    fn unreadable_image_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = channel();
        spawn_panorama_load(dir.path().join("nope.jpg"), tx);
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            LoadEvent::PanoramaFailed(_)
        ));
    }

    fn document() -> AnnotationDocument {
        let rect = |id: &str, kind| Annotation {
            id: id.to_string(),
            kind,
            x: 0.0,
            y: 700.0,
            width: 100.0,
            height: 100.0,
        };
        AnnotationDocument {
            width: None,
            height: None,
            annotations: vec![
                rect("p1", AnnotationKind::Item),
                rect("p2", AnnotationKind::Item),
                rect("wall", AnnotationKind::Panel),
            ],
        }
    }

    #[test]
    fn failed_load_leaves_index_empty() {
        let pano = PanoramaConfig::default();
        let mut load = AnnotationLoad::start(Instant::now(), Duration::from_secs(10));
        let mut index = HitRegionIndex::default();
        let err = Err(AnnotationError::InvalidLength {
            id: "a".into(),
            attr: "width",
            value: "3em".into(),
        });

        assert!(apply_annotations(err, &mut load, &mut index, &pano));
        assert!(index.is_empty());
        assert!(matches!(load, AnnotationLoad::Failed(_)));
    }

    #[test]
    fn result_after_timeout_is_discarded() {
        let pano = PanoramaConfig::default();
        let t0 = Instant::now();
        let mut load = AnnotationLoad::start(t0, Duration::from_secs(10));
        assert!(load.check_deadline(t0 + Duration::from_secs(10)));
        let mut index = HitRegionIndex::default();

        assert!(!apply_annotations(Ok(document()), &mut load, &mut index, &pano));
        assert!(index.is_empty());
        assert_eq!(load, AnnotationLoad::TimedOut);
    }

    #[test]
    fn result_before_deadline_fills_index() {
        let pano = PanoramaConfig::default();
        let mut load = AnnotationLoad::start(Instant::now(), Duration::from_secs(10));
        let mut index = HitRegionIndex::default();

        assert!(apply_annotations(Ok(document()), &mut load, &mut index, &pano));
        assert_eq!(index.items.len(), 2);
        assert_eq!(index.panels.len(), 1);
        assert_eq!(load, AnnotationLoad::Ready { regions: 3 });
    }
}
