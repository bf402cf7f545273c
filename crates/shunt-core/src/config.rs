//! Controller tunables.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// How displacement picks among the best-effort flows sharing an offending
/// edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PathSelectAlgorithm {
    /// Fewest nodes on the current path first.
    ShortestPath,
    /// Most nodes on the current path first.
    LongestPath,
    /// Highest recent transmit rate first.
    Bandwidth,
    /// Displacement is forbidden.
    NoChange,
}

/// Admission tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
pub struct Config {
    /// Headroom required on every edge of a video path, in Mb.
    #[builder(default = 20.0)]
    pub limit_video_bandwidth: f64,

    /// Headroom required on every edge of a best-effort path, in Mb.
    #[builder(default = 20.0)]
    pub limit_other_bandwidth: f64,

    /// Nominal per-link capacity, in Mb.
    #[builder(default = 100.0)]
    pub capacity: f64,

    /// Displacement tie-break rule.
    #[builder(default = PathSelectAlgorithm::Bandwidth)]
    pub path_select_algorithm: PathSelectAlgorithm,

    /// Longest hop count enumerated for best-effort admission.
    #[builder(default = 20)]
    pub h_max: usize,

    /// Stats tick period, in seconds.
    #[builder(default = 10)]
    pub monitor_interval_s: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Config {
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = Config::default();
        assert_eq!(config.limit_video_bandwidth, 20.0);
        assert_eq!(config.limit_other_bandwidth, 20.0);
        assert_eq!(config.capacity, 100.0);
        assert_eq!(config.path_select_algorithm, PathSelectAlgorithm::Bandwidth);
        assert_eq!(config.h_max, 20);
        assert_eq!(config.monitor_interval(), Duration::from_secs(10));
    }

    #[test]
    fn partial_toml_overrides_defaults() -> anyhow::Result<()> {
        let config: Config = toml::from_str(
            r#"
            path_select_algorithm = "NO_CHANGE"
            h_max = 6
            "#,
        )?;
        assert_eq!(config.path_select_algorithm, PathSelectAlgorithm::NoChange);
        assert_eq!(config.h_max, 6);
        assert_eq!(config.capacity, 100.0);
        Ok(())
    }
}
