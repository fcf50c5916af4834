//! Accident files written to temporary directories for tests.

use bzip2::write::BzEncoder;
use bzip2::Compression;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Five accidents across states 1, 2 and 6; the fourth row has unknown coordinates.
pub const SAMPLE_CSV: &str = "\
STATE,ST_CASE,MONTH,FATALS,LATITUDE,LONGITUD
1,10001,3,1,40.0,-75.0
1,10002,3,2,41.0,-74.0
2,20001,5,1,36.0,-80.0
1,10003,7,1,99.9999,999.9999
6,60001,12,1,34.05,-118.25
";

/// Write `contents` bzip2-compressed to `dir/name`.
pub fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    let mut encoder = BzEncoder::new(file, Compression::default());
    encoder.write_all(contents.as_bytes()).unwrap();
    encoder.finish().unwrap();
    path
}

/// Write `contents` uncompressed to `dir/name`.
pub fn write_plain_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// Events logged by this crate, by level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EventCounts {
    pub info: usize,
    pub warn: usize,
    pub error: usize,
}

struct EventCounter(Arc<Mutex<EventCounts>>);

impl<S: Subscriber> Layer<S> for EventCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with(env!("CARGO_CRATE_NAME")) {
            return;
        }
        let mut counts = self.0.lock().unwrap();
        match *metadata.level() {
            Level::INFO => counts.info += 1,
            Level::WARN => counts.warn += 1,
            Level::ERROR => counts.error += 1,
            _ => {}
        }
    }
}

/// Run `f` and return its result with the events it logged.
pub fn count_events<T>(f: impl FnOnce() -> T) -> (T, EventCounts) {
    let counts = Arc::new(Mutex::new(EventCounts::default()));
    let subscriber = tracing_subscriber::registry().with(EventCounter(counts.clone()));
    let result = tracing::subscriber::with_default(subscriber, f);
    let counts = *counts.lock().unwrap();
    (result, counts)
}
