use plant_core::{StatusRecord, StatusSink};
use std::io::Write;
use tracing::warn;

/// One JSON object per line.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> StatusSink for JsonLinesSink<W> {
    fn emit(&mut self, record: StatusRecord) {
        let result = serde_json::to_writer(&mut self.writer, &record)
            .map_err(std::io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"))
            .and_then(|()| self.writer.flush());
        if let Err(e) = result {
            warn!(error = %e, "Failed to write status record");
        }
    }
}

/// Forwards every record to each inner sink.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn StatusSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl StatusSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl StatusSink for FanoutSink {
    fn emit(&mut self, record: StatusRecord) {
        for sink in &mut self.sinks {
            sink.emit(record);
        }
    }
}
