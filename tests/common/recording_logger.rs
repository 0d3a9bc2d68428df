use batch_dispatch::logging::{DispatchEvent, DispatchLogger};
use parking_lot::Mutex;

/// Captures every dispatcher event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    events: Mutex<Vec<DispatchEvent>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(DispatchEvent::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.name() == name)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl DispatchLogger for RecordingLogger {
    fn log(&self, event: DispatchEvent) {
        self.events.lock().push(event);
    }
}
