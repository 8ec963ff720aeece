#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// Emitted once per minimizer iteration, before the step is taken.
    Iteration {
        index: usize,
        error: f64,
        max_gradient: f64,
    },
    Finished {
        iterations: usize,
        converged: bool,
    },

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reporter_without_callback_ignores_events() {
        let reporter = ProgressReporter::new();
        reporter.report(Progress::Message("ignored".to_string()));
    }

    #[test]
    fn reporter_forwards_events_to_callback() {
        let seen = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            seen.lock().unwrap().push(event);
        }));
        reporter.report(Progress::Finished {
            iterations: 3,
            converged: true,
        });
        drop(reporter);
        assert_eq!(
            seen.into_inner().unwrap(),
            vec![Progress::Finished {
                iterations: 3,
                converged: true
            }]
        );
    }
}
