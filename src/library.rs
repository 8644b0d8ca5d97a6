use crate::recording::Recording;

/// Recordings held for the current run, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingLibrary {
    recordings: Vec<Recording>,
}

impl RecordingLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a freshly captured recording.
    pub fn push(&mut self, recording: Recording) {
        self.recordings.push(recording);
    }

    /// Adds a loaded recording unless one with the same title is already
    /// held. Returns whether it was added.
    pub fn insert_loaded(&mut self, recording: Recording) -> bool {
        if self.get(&recording.title).is_some() {
            tracing::debug!("recording {} already loaded", recording.title);
            return false;
        }
        self.recordings.push(recording);
        true
    }

    pub fn get(&self, title: &str) -> Option<&Recording> {
        self.recordings.iter().find(|r| r.title == title)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recording> {
        self.recordings.iter()
    }
}
