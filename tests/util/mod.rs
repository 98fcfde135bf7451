use std::io;
use std::sync::Arc;

use face_console::engine::{ConsoleMsg, Driver, FaceConsole};
use face_console::model::{Face, FaceId, LIMIT, Label, LabelId};
use face_console::source::MemoryFaceSource;
use parking_lot::{Mutex, MutexGuard};
use tracing_subscriber::fmt::MakeWriter;

/// Run `f` with DEBUG-level logs captured and return them alongside its
/// result. Nothing is installed globally.
#[allow(dead_code)]
pub fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let sink = LogSink::default();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(sink.clone())
        .finish();
    let value = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&sink.0.lock()).into_owned();
    (value, logs)
}

#[derive(Clone, Default)]
struct LogSink(Arc<Mutex<Vec<u8>>>);

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogSinkGuard<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogSinkGuard(self.0.lock())
    }
}

struct LogSinkGuard<'a>(MutexGuard<'a, Vec<u8>>);

impl io::Write for LogSinkGuard<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Builds a labelled face history for a [`MemoryFaceSource`].
///
/// Faces are captured one second apart counting down from `newest`, so the
/// first face added is the newest.
#[allow(dead_code)]
pub struct FaceFixtureBuilder {
    labels: Vec<Label>,
    faces: Vec<Face>,
    next_time: i64,
}

#[allow(dead_code)]
impl FaceFixtureBuilder {
    pub fn new() -> Self {
        Self {
            labels: Vec::new(),
            faces: Vec::new(),
            next_time: 1_700_000_000,
        }
    }

    pub fn label(mut self, id: i64, text: &str) -> Self {
        self.labels.push(Label::new(id, text));
        self
    }

    /// Add `count` faces carrying `label` (or none).
    pub fn faces(mut self, count: usize, label: Option<i64>) -> Self {
        for _ in 0..count {
            let id = format!("face-{:05}", self.faces.len());
            self.faces.push(Face {
                id: FaceId::new(id),
                label_id: label.map(LabelId),
                capture_time: self.next_time,
            });
            self.next_time -= 1;
        }
        self
    }

    /// Add `count` faces sharing one capture second.
    pub fn burst(mut self, count: usize, label: Option<i64>) -> Self {
        let time = self.next_time;
        for _ in 0..count {
            let id = format!("face-{:05}", self.faces.len());
            self.faces.push(Face {
                id: FaceId::new(id),
                label_id: label.map(LabelId),
                capture_time: time,
            });
        }
        self.next_time -= 1;
        self
    }

    pub fn build(self) -> MemoryFaceSource {
        MemoryFaceSource::new(self.labels, self.faces)
    }

    /// Driver over the built source with the catalog and first page loaded.
    pub fn ready(self) -> Driver<MemoryFaceSource> {
        let console = FaceConsole::new("/faces", Default::default(), LIMIT);
        let mut driver = Driver::new(console, self.build());
        driver.dispatch(ConsoleMsg::Init);
        driver
    }
}

/// Ids of every face currently loaded, in display order.
#[allow(dead_code)]
pub fn loaded_ids(driver: &Driver<MemoryFaceSource>) -> Vec<String> {
    driver
        .console()
        .faces()
        .map(|f| f.id.as_str().to_string())
        .collect()
}
