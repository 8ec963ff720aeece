use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use molgeom::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

/// Shows minimizer progress on a stderr spinner.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::no_length()
            .with_style(Self::spinner_style())
            .with_message("Initializing...");
        pb.set_draw_target(ProgressDrawTarget::stderr());

        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb_clone = self.pb.clone();

        Box::new(move |progress: Progress| {
            let Ok(pb_guard) = pb_clone.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::Iteration {
                    index,
                    error,
                    max_gradient,
                } => {
                    if index == 0 {
                        pb_guard.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    }
                    pb_guard.set_position(index as u64);
                    pb_guard.set_message(format!(
                        "Iteration {index}: error {error:.4e}, max gradient {max_gradient:.3e}"
                    ));
                }
                Progress::Finished {
                    iterations,
                    converged,
                } => {
                    pb_guard.disable_steady_tick();
                    let status = if converged {
                        "✓ Converged"
                    } else {
                        "✗ Not converged"
                    };
                    pb_guard.finish_with_message(format!("{status} after {iterations} iterations"));
                }
                Progress::Message(msg) => {
                    pb_guard.println(format!("  {}", msg));
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn handler_initializes_in_a_clean_state() {
        let handler = CliProgressHandler::new();
        let pb = handler.pb.lock().unwrap();
        assert_eq!(pb.position(), 0);
        assert!(!pb.is_finished());
    }

    #[test]
    fn callback_tracks_iterations_and_finish() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::Iteration {
            index: 0,
            error: 2.5,
            max_gradient: 1.0,
        });
        callback(Progress::Iteration {
            index: 3,
            error: 0.5,
            max_gradient: 0.2,
        });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.position(), 3);
            assert!(pb.message().starts_with("Iteration 3:"));
        }

        callback(Progress::Finished {
            iterations: 3,
            converged: true,
        });
        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "✓ Converged after 3 iterations");
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::Message("Mirroring".to_string()));
            callback(Progress::Finished {
                iterations: 7,
                converged: false,
            });
        })
        .join()
        .unwrap();

        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "✗ Not converged after 7 iterations");
    }
}
