use std::io::Write;
use std::sync::Mutex;

use hop_observe::{Event, EventSink};

/// Serializes each flow event as one JSON object per line. A record that
/// fails to serialize or write is dropped; event logging never takes a
/// connection down.
pub struct JsonLineSink<W>
where
    W: Write + Send,
{
    writer: Mutex<W>,
}

impl<W> JsonLineSink<W>
where
    W: Write + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W> EventSink for JsonLineSink<W>
where
    W: Write + Send,
{
    fn emit(&self, event: Event) {
        let mut writer = self.writer.lock().expect("event log lock poisoned");
        if serde_json::to_writer(&mut *writer, &event).is_ok() {
            let _ = writer.write_all(b"\n");
        }
    }
}
