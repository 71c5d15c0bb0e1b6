#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    SweepStart { total_points: u64 },
    PointComplete { n_atoms: usize, seconds: f64 },

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards progress events from a running sweep to an optional callback.
///
/// Progress is human-facing only: the reported events never influence the
/// sweep itself, and a reporter without a callback is a no-op.
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
        reporter.report(Progress::PhaseFinish);
    }

    #[test]
    fn reporter_forwards_events_in_order() {
        let seen: Mutex<Vec<u64>> = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::SweepStart { total_points } = event {
                seen.lock().unwrap().push(total_points);
            }
        }));
        reporter.report(Progress::SweepStart { total_points: 3 });
        reporter.report(Progress::PointComplete {
            n_atoms: 16,
            seconds: 0.25,
        });
        reporter.report(Progress::SweepStart { total_points: 7 });
        drop(reporter);
        assert_eq!(seen.into_inner().unwrap(), vec![3, 7]);
    }
}
