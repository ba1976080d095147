use std::time::Duration;

/// Runner configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Default bound for a single check's action (ms). `None` waits forever.
    pub check_timeout_ms: Option<u64>,

    /// Bound for the whole run (ms). Checks still pending when it passes are skipped.
    pub run_timeout_ms: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            check_timeout_ms: Some(30_000),
            run_timeout_ms: None,
        }
    }
}

impl RunnerConfig {
    pub fn check_timeout(&self) -> Option<Duration> {
        self.check_timeout_ms.map(Duration::from_millis)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_ms.map(Duration::from_millis)
    }

    /// Layer overrides on top of this config. `Some` values win.
    pub fn overridden_by(&self, check_timeout_ms: Option<u64>, run_timeout_ms: Option<u64>) -> Self {
        Self {
            check_timeout_ms: check_timeout_ms.or(self.check_timeout_ms),
            run_timeout_ms: run_timeout_ms.or(self.run_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layering() {
        let base = RunnerConfig::default();
        assert_eq!(base.check_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(base.run_timeout(), None);

        // checklist header, then CLI
        let header = base.overridden_by(Some(5_000), Some(60_000));
        let cli = header.overridden_by(None, Some(10_000));
        assert_eq!(cli.check_timeout_ms, Some(5_000));
        assert_eq!(cli.run_timeout_ms, Some(10_000));
    }
}
