use indicatif::{ProgressBar, ProgressStyle};
use pipod_indexer::{EventReceiver, PipelineEvent, PipelineState};
use tokio::task::JoinHandle;

/// Drain pipeline events into a progress bar on stderr until the sender is dropped.
pub fn spawn_progress(mut rx: EventReceiver, enabled: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        let bar = if enabled {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg:<12} [{bar:30}] {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );

        while let Some(event) = rx.recv().await {
            match event {
                PipelineEvent::StateChanged { state } => {
                    bar.set_message(state_label(state));
                    if state == PipelineState::Idle {
                        break;
                    }
                }
                PipelineEvent::ExtractionStarted { total } => {
                    bar.set_length(total as u64);
                    bar.set_position(0);
                }
                PipelineEvent::FileExtracted { done, .. } => bar.set_position(done as u64),
                PipelineEvent::FileFailed { path, done, .. } => {
                    bar.set_position(done as u64);
                    bar.println(format!("skipped {path}"));
                }
                PipelineEvent::Scanned { .. }
                | PipelineEvent::ExtractionCancelled { .. }
                | PipelineEvent::Reduced { .. }
                | PipelineEvent::ReductionSkipped { .. } => {}
            }
        }
        bar.finish_and_clear();
    })
}

const fn state_label(state: PipelineState) -> &'static str {
    match state {
        PipelineState::Idle => "done",
        PipelineState::Scanning => "scanning",
        PipelineState::Extracting => "extracting",
        PipelineState::Reducing => "reducing",
    }
}
