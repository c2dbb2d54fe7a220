use serde::Deserialize;
use std::time::Duration;

/// Poll period used when none (or an invalid one) is configured
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Poll period as written in the config file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IntervalSetting {
    /// Whole seconds
    Seconds(u64),
    /// Duration string, see [`parse_duration`]
    Text(String),
}

impl IntervalSetting {
    /// Concrete non-zero duration, or `None` if the setting is unusable
    pub fn resolve(&self) -> Option<Duration> {
        let duration = match self {
            IntervalSetting::Seconds(secs) => Duration::from_secs(*secs),
            IntervalSetting::Text(text) => parse_duration(text)?,
        };
        (!duration.is_zero()).then_some(duration)
    }
}

/// Parse "500ms", "90s", "5m", "1h", "1d" or a bare number of seconds.
///
/// Fractions are accepted ("1.5m"); whitespace between number and unit is too.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);

    let value: f64 = number.parse().ok()?;
    let seconds_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "ms" => 0.001,
        "" | "s" | "sec" | "secs" => 1.0,
        "m" | "min" | "mins" => 60.0,
        "h" | "hr" | "hrs" => 3600.0,
        "d" | "day" | "days" => 86_400.0,
        _ => return None,
    };

    Duration::try_from_secs_f64(value * seconds_per_unit).ok()
}
