//! Spinner shown while sinks pull data through the pipeline

use std::sync::Arc;
use std::time::Duration;

use butterfly_pipe::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

/// Creates a spinner that counts processed items
pub fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} items {msg}")
            .expect("Failed to create progress style"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

pub struct ProgressManager {
    pub pb: ProgressBar,
}

impl ProgressManager {
    pub fn new(message: &str) -> Self {
        eprintln!("{message}");
        Self {
            pb: create_spinner(),
        }
    }

    /// Callback that moves the spinner to the reported count
    pub fn callback(&self) -> ProgressCallback {
        let pb = self.pb.clone();
        Arc::new(move |count| pb.set_position(count))
    }

    pub fn finish(&self, message: &str) {
        self.pb.finish_with_message(message.to_string());
    }
}
