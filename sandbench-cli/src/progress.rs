//! Terminal progress driven by engine run events

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use sandbench_core::{BenchmarkConfig, RunEvent, RunEventKind, RunPhase, RunRole};

/// One bar per snippet being measured
pub struct RunProgress {
    _multi: MultiProgress,
    bars: Vec<(RunRole, ProgressBar)>,
    warmup: u64,
}

impl RunProgress {
    /// Bars for `roles`, drawn on stderr
    pub fn new(roles: &[RunRole], config: &BenchmarkConfig) -> Self {
        Self::with_target(roles, config, ProgressDrawTarget::stderr())
    }

    /// Bars that never draw
    pub fn hidden(roles: &[RunRole], config: &BenchmarkConfig) -> Self {
        Self::with_target(roles, config, ProgressDrawTarget::hidden())
    }

    fn with_target(roles: &[RunRole], config: &BenchmarkConfig, target: ProgressDrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target);
        let warmup = config.warmup_iterations as u64;
        let len = warmup + config.max_samples as u64;
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:>9} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        let bars = roles
            .iter()
            .map(|&role| {
                let pb = multi.add(ProgressBar::new(len));
                pb.set_style(style.clone());
                pb.set_prefix(role_label(role));
                (role, pb)
            })
            .collect();

        Self {
            _multi: multi,
            bars,
            warmup,
        }
    }

    fn bar(&self, role: RunRole) -> Option<&ProgressBar> {
        self.bars.iter().find(|(r, _)| *r == role).map(|(_, pb)| pb)
    }

    /// Apply one event
    pub fn observe(&self, event: &RunEvent) {
        let Some(pb) = self.bar(event.role) else {
            return;
        };
        match &event.kind {
            RunEventKind::Phase(phase) => match phase {
                RunPhase::Completed => pb.finish_with_message("Complete"),
                RunPhase::Aborted => pb.abandon_with_message("Aborted"),
                RunPhase::Failed => pb.abandon_with_message("Rejected"),
                other => pb.set_message(other.to_string()),
            },
            RunEventKind::Warmup { completed, .. } => pb.set_position(*completed as u64),
            RunEventKind::Sample { index, success, .. } => {
                pb.set_position(self.warmup + *index as u64 + 1);
                if !success {
                    pb.set_message("sampling (failures)");
                }
            }
        }
    }

    /// Clear bars that never reached a terminal phase
    pub fn finish(&self) {
        for (_, pb) in &self.bars {
            if !pb.is_finished() {
                pb.finish_and_clear();
            }
        }
    }

    #[cfg(test)]
    fn position(&self, role: RunRole) -> u64 {
        self.bar(role).map(|pb| pb.position()).unwrap_or(0)
    }
}

fn role_label(role: RunRole) -> &'static str {
    match role {
        RunRole::Single => "snippet",
        RunRole::Baseline => "baseline",
        RunRole::Candidate => "candidate",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample(role: RunRole, index: usize) -> RunEvent {
        RunEvent {
            role,
            kind: RunEventKind::Sample {
                index,
                max_samples: 5,
                success: true,
                elapsed: Duration::from_millis(1),
            },
        }
    }

    #[test]
    fn test_positions_track_events_per_role() {
        let config = BenchmarkConfig {
            warmup_iterations: 2,
            min_samples: 1,
            max_samples: 5,
            ..Default::default()
        };
        let progress = RunProgress::hidden(&[RunRole::Baseline, RunRole::Candidate], &config);

        progress.observe(&RunEvent {
            role: RunRole::Baseline,
            kind: RunEventKind::Warmup {
                completed: 2,
                total: 2,
            },
        });
        progress.observe(&sample(RunRole::Baseline, 0));
        progress.observe(&sample(RunRole::Candidate, 3));

        assert_eq!(progress.position(RunRole::Baseline), 3);
        assert_eq!(progress.position(RunRole::Candidate), 6);
    }

    #[test]
    fn test_unknown_role_ignored() {
        let config = BenchmarkConfig::default();
        let progress = RunProgress::hidden(&[RunRole::Single], &config);
        progress.observe(&sample(RunRole::Candidate, 0));
        assert_eq!(progress.position(RunRole::Single), 0);
        progress.observe(&RunEvent {
            role: RunRole::Single,
            kind: RunEventKind::Phase(RunPhase::Completed),
        });
        progress.finish();
    }
}
