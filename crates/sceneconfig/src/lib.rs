use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sensor::CHANNEL_COUNT;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Longest `serial.timeout` accepted; the frame loop blocks this long per poll.
pub const MAX_SERIAL_TIMEOUT: Duration = Duration::from_secs(60);

/// Serial device used when neither the config nor the CLI names one.
pub const DEFAULT_SERIAL_DEVICE: &str = "/dev/cu.usbserial-120";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Whether channel pairs drive the regime mapper or feed the shader directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModulationMode {
    /// Density/noise/swirl/time-scale computed by the regime mapper.
    #[default]
    Regimes,
    /// Raw channels become `xpos`/`ypos` and the clear colour.
    Direct,
}

/// Built-in configurations matching the three historical program variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Classic,
    Solo,
    Triptych,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Classic, Preset::Solo, Preset::Triptych];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Classic => "classic",
            Preset::Solo => "solo",
            Preset::Triptych => "triptych",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Preset::Classic => "single window, direct channel mapping, 9600 baud",
            Preset::Solo => "single fullscreen region with regime mapping, 9600 baud",
            Preset::Triptych => "three fullscreen regions with regime mapping, 115200 baud",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Preset::ALL
            .into_iter()
            .find(|preset| preset.name() == normalized)
            .ok_or_else(|| {
                format!("unknown preset '{value}'; expected classic, solo, or triptych")
            })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SceneConfig {
    pub version: u32,
    #[serde(default)]
    pub mode: ModulationMode,
    #[serde(default)]
    pub window: WindowSettings,
    #[serde(default)]
    pub serial: SerialSettings,
    #[serde(default)]
    pub regions: Vec<RegionSettings>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowSettings {
    pub fullscreen: bool,
    pub width: u32,
    pub height: u32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escape_presses: Option<u32>,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            fullscreen: true,
            width: 800,
            height: 600,
            title: "Sinestesia".to_string(),
            escape_presses: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SerialSettings {
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
    #[serde(
        default = "default_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub timeout: Duration,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            device: default_device(),
            baud: default_baud(),
            timeout: default_timeout(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RegionSettings {
    pub shader: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_channel: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_channel: Option<usize>,
}

impl RegionSettings {
    pub fn new(shader: impl Into<PathBuf>) -> Self {
        Self {
            shader: shader.into(),
            left_channel: None,
            right_channel: None,
        }
    }
}

/// Region settings with channel defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRegion {
    pub shader: PathBuf,
    pub left_channel: usize,
    pub right_channel: usize,
}

fn default_device() -> String {
    DEFAULT_SERIAL_DEVICE.to_string()
}

fn default_baud() -> u32 {
    115_200
}

fn default_timeout() -> Duration {
    Duration::from_millis(1000)
}

fn default_enabled() -> bool {
    true
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

impl SceneConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SceneConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Classic => Self {
                version: 1,
                mode: ModulationMode::Direct,
                window: WindowSettings {
                    fullscreen: false,
                    escape_presses: Some(3),
                    ..WindowSettings::default()
                },
                serial: SerialSettings {
                    baud: 9600,
                    ..SerialSettings::default()
                },
                regions: vec![RegionSettings::new("shaders/classic.frag")],
            },
            Preset::Solo => Self {
                version: 1,
                mode: ModulationMode::Regimes,
                window: WindowSettings::default(),
                serial: SerialSettings {
                    baud: 9600,
                    ..SerialSettings::default()
                },
                regions: vec![RegionSettings::new("shaders/bloom.frag")],
            },
            Preset::Triptych => Self {
                version: 1,
                mode: ModulationMode::Regimes,
                window: WindowSettings::default(),
                serial: SerialSettings::default(),
                regions: vec![
                    RegionSettings::new("shaders/bloom.frag"),
                    RegionSettings::new("shaders/vortex.frag"),
                    RegionSettings::new("shaders/tide.frag"),
                ],
            },
        }
    }

    /// Channels for region `index`: explicit settings win, otherwise `2i`/`2i+1`
    /// wrapped onto the available sensor channels.
    pub fn resolved_region(&self, index: usize) -> Option<ResolvedRegion> {
        let region = self.regions.get(index)?;
        Some(ResolvedRegion {
            shader: region.shader.clone(),
            left_channel: region
                .left_channel
                .unwrap_or((index * 2) % CHANNEL_COUNT),
            right_channel: region
                .right_channel
                .unwrap_or((index * 2 + 1) % CHANNEL_COUNT),
        })
    }

    pub fn resolved_regions(&self) -> Vec<ResolvedRegion> {
        (0..self.regions.len())
            .filter_map(|index| self.resolved_region(index))
            .collect()
    }

    /// Rewrites relative shader paths so they are relative to `base` instead
    /// of the working directory.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        for region in &mut self.regions {
            if region.shader.is_relative() {
                region.shader = base.join(&region.shader);
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.regions.is_empty() {
            return Err(ConfigError::Invalid(
                "config must define at least one region".into(),
            ));
        }

        for (index, region) in self.regions.iter().enumerate() {
            if region.shader.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "region {index} has an empty shader path"
                )));
            }

            for (label, channel) in [
                ("left_channel", region.left_channel),
                ("right_channel", region.right_channel),
            ] {
                if let Some(channel) = channel {
                    if channel >= CHANNEL_COUNT {
                        return Err(ConfigError::Invalid(format!(
                            "region {index} {label} {channel} is out of range (0-{})",
                            CHANNEL_COUNT - 1
                        )));
                    }
                }
            }
        }

        if self.serial.device.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "serial.device may not be empty".into(),
            ));
        }

        if self.serial.baud == 0 {
            return Err(ConfigError::Invalid(
                "serial.baud must be greater than zero".into(),
            ));
        }

        if self.serial.timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "serial.timeout must be greater than zero".into(),
            ));
        }

        if self.serial.timeout > MAX_SERIAL_TIMEOUT {
            return Err(ConfigError::Invalid(format!(
                "serial.timeout {} exceeds the {} limit",
                humantime::format_duration(self.serial.timeout),
                humantime::format_duration(MAX_SERIAL_TIMEOUT)
            )));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size {}x{} must be non-zero",
                self.window.width, self.window.height
            )));
        }

        if self.window.escape_presses == Some(0) {
            return Err(ConfigError::Invalid(
                "window.escape_presses must be >= 1 (omit it to disable)".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1
mode = "regimes"

[window]
fullscreen = false
width = 1280
height = 720
escape_presses = 3

[serial]
device = "/dev/ttyACM0"
baud = 115200
timeout = "250ms"

[[regions]]
shader = "shaders/bloom.frag"

[[regions]]
shader = "shaders/vortex.frag"
left_channel = 5
right_channel = 4
"#;

    #[test]
    fn parses_sample_config() {
        let config = SceneConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.version, 1);
        assert_eq!(config.mode, ModulationMode::Regimes);
        assert!(!config.window.fullscreen);
        assert_eq!(config.window.escape_presses, Some(3));
        assert_eq!(config.window.title, "Sinestesia");
        assert_eq!(config.serial.device, "/dev/ttyACM0");
        assert_eq!(config.serial.timeout, Duration::from_millis(250));
        assert_eq!(config.regions.len(), 2);
    }

    #[test]
    fn applies_channel_defaults_per_region() {
        let config = SceneConfig::from_toml_str(SAMPLE).unwrap();
        let regions = config.resolved_regions();
        assert_eq!(regions[0].left_channel, 0);
        assert_eq!(regions[0].right_channel, 1);
        assert_eq!(regions[1].left_channel, 5);
        assert_eq!(regions[1].right_channel, 4);
    }

    #[test]
    fn serial_defaults_match_final_variant() {
        let config = SceneConfig::from_toml_str(
            r#"
version = 1

[[regions]]
shader = "a.frag"
"#,
        )
        .unwrap();
        assert_eq!(config.serial.device, DEFAULT_SERIAL_DEVICE);
        assert_eq!(config.serial.baud, 115_200);
        assert_eq!(config.serial.timeout, Duration::from_secs(1));
        assert!(config.serial.enabled);
        assert!(config.window.fullscreen);
        assert_eq!(config.window.escape_presses, None);
    }

    #[test]
    fn numeric_timeout_is_seconds() {
        let config = SceneConfig::from_toml_str(
            r#"
version = 1

[serial]
timeout = 2

[[regions]]
shader = "a.frag"
"#,
        )
        .unwrap();
        assert_eq!(config.serial.timeout, Duration::from_secs(2));
    }

    #[test]
    fn rejects_missing_regions() {
        let err = SceneConfig::from_toml_str("version = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_out_of_range_channel() {
        let config = r#"
version = 1

[[regions]]
shader = "a.frag"
right_channel = 6
"#;
        let err = SceneConfig::from_toml_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("right_channel")));
    }

    #[test]
    fn rejects_absurd_serial_timeout() {
        let config = r#"
version = 1

[serial]
timeout = "100000000000y"

[[regions]]
shader = "a.frag"
"#;
        let err = SceneConfig::from_toml_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("serial.timeout")));

        let mut config = SceneConfig::preset(Preset::Solo);
        config.serial.timeout = MAX_SERIAL_TIMEOUT;
        config.validate().expect("limit itself is accepted");
    }

    #[test]
    fn rejects_zero_escape_presses() {
        let config = r#"
version = 1

[window]
escape_presses = 0

[[regions]]
shader = "a.frag"
"#;
        assert!(SceneConfig::from_toml_str(config).is_err());
    }

    #[test]
    fn presets_are_valid_and_distinct() {
        for preset in Preset::ALL {
            let config = SceneConfig::preset(preset);
            config.validate().expect("preset validates");
        }
        assert_eq!(SceneConfig::preset(Preset::Classic).mode, ModulationMode::Direct);
        assert_eq!(SceneConfig::preset(Preset::Classic).serial.baud, 9600);
        assert_eq!(SceneConfig::preset(Preset::Triptych).regions.len(), 3);
        assert_eq!(SceneConfig::preset(Preset::Triptych).serial.baud, 115_200);
    }

    #[test]
    fn parses_preset_names() {
        assert_eq!("Triptych".parse::<Preset>().unwrap(), Preset::Triptych);
        assert!("quad".parse::<Preset>().is_err());
    }

    #[test]
    fn toml_dump_parses_back() {
        let config = SceneConfig::preset(Preset::Classic);
        let dumped = config.to_toml_string().unwrap();
        assert!(dumped.contains("mode = \"direct\""));
        let parsed = SceneConfig::from_toml_str(&dumped).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn resolves_relative_shaders_against_base() {
        let mut config = SceneConfig::preset(Preset::Solo);
        config.regions.push(RegionSettings::new("/abs/shader.frag"));
        config.resolve_relative_to(Path::new("/etc/sinestesia"));
        assert_eq!(
            config.regions[0].shader,
            PathBuf::from("/etc/sinestesia/shaders/bloom.frag")
        );
        assert_eq!(config.regions[1].shader, PathBuf::from("/abs/shader.frag"));
    }

    #[test]
    fn bundled_config_is_valid() {
        let config =
            SceneConfig::from_toml_str(include_str!("../../../config/sinestesia.toml")).unwrap();
        config.validate().unwrap();
        let regions = config.resolved_regions();
        assert_eq!(regions.len(), 3);
        assert_eq!((regions[1].left_channel, regions[1].right_channel), (2, 3));
        assert_eq!((regions[2].left_channel, regions[2].right_channel), (4, 5));
    }
}
