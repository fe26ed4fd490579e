use serde::{Deserialize, Serialize};

pub const DEBUG_ENV_VAR: &str = "CHARTDATA_DEBUG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataControllerConfig {
    /// Forward controller snapshots to the log at debug level
    pub debug: bool,
}

impl DataControllerConfig {
    /// Read `CHARTDATA_DEBUG`. Accepts `1`, `true` and `data-model`, which may be
    /// part of a comma separated list of debug channels.
    pub fn from_env() -> Self {
        Self::from_debug_flag(std::env::var(DEBUG_ENV_VAR).ok().as_deref())
    }

    fn from_debug_flag(flag: Option<&str>) -> Self {
        let debug = flag.is_some_and(|flag| {
            flag.split(',')
                .map(str::trim)
                .any(|channel| matches!(channel, "1" | "true" | "data-model"))
        });
        Self { debug }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest(
        flag,
        expected,
        case(None, false),
        case(Some(""), false),
        case(Some("0"), false),
        case(Some("1"), true),
        case(Some("true"), true),
        case(Some("scene, data-model"), true)
    )]
    fn test_debug_flag(flag: Option<&str>, expected: bool) {
        assert_eq!(DataControllerConfig::from_debug_flag(flag).debug, expected);
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: DataControllerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DataControllerConfig::default());
        let config: DataControllerConfig = serde_json::from_str(r#"{"debug": true}"#).unwrap();
        assert!(config.debug);
    }
}
