//! INI configuration file.
//!
//! ```ini
//! [lookup]
//! endpoints = https://overpass-api.de/api/interpreter, https://overpass.kumi.systems/api/interpreter
//! search_radius_m = 500
//! request_timeout_secs = 10
//! request_delay_ms = 1000
//! rate_limit_retry = true
//! failure_threshold = 3
//!
//! [cache]
//! max_entries = 1000
//!
//! [prefetch]
//! capacity = 300
//! base_delay_ms = 2000
//! cleanup_interval_secs = 300
//! max_age_secs = 1800
//! consume_max_age_secs = 7200
//! jitter_probability = 0.5
//! jitter_max_m = 200
//!
//! [camera]
//! min_height_m = 60
//! max_height_m = 150
//! min_distance_m = 100
//! max_distance_m = 300
//! min_angle_diff_deg = 30
//! max_angle_diff_deg = 120
//!
//! [validation]
//! safe_margin = 0.1
//!
//! [logging]
//! directory = /var/log/dronepair
//! level = info
//!
//! [region.western_europe]
//! min_lat = 43
//! max_lat = 52
//! min_lon = -5
//! max_lon = 10
//! ```
//!
//! Every key is optional and falls back to its default. When no
//! `[region.*]` section exists the built-in regions are used.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use reqwest::Url;

use super::error::ConfigError;
use crate::cache::DEFAULT_MAX_ENTRIES;
use crate::camera::PlacementConfig;
use crate::coord::Region;
use crate::correspondence::{CorrespondenceValidator, DEFAULT_SAFE_MARGIN};
use crate::location::{JitterConfig, DEFAULT_JITTER_MAX_M, DEFAULT_JITTER_PROBABILITY};
use crate::lookup::{
    ResolverConfig, DEFAULT_ENDPOINTS, DEFAULT_FAILURE_THRESHOLD, DEFAULT_REQUEST_DELAY,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_SEARCH_RADIUS_M,
};
use crate::prefetch::{
    PrefetchConfig, DEFAULT_BASE_DELAY, DEFAULT_CLEANUP_INTERVAL, DEFAULT_MAX_QUEUED_AGE,
    DEFAULT_QUEUE_CAPACITY,
};
use crate::service::{ConsumerConfig, DEFAULT_CONSUME_MAX_AGE};

/// Directory under the home directory holding the config file.
pub const CONFIG_DIR_NAME: &str = ".dronepair";

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Default log level when none is configured.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const REGION_PREFIX: &str = "region.";

/// `[lookup]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupSettings {
    pub endpoints: Vec<String>,
    pub search_radius_m: u32,
    pub request_timeout: Duration,
    pub request_delay: Duration,
    pub rate_limit_retry: bool,
    pub failure_threshold: u32,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            search_radius_m: DEFAULT_SEARCH_RADIUS_M,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            request_delay: DEFAULT_REQUEST_DELAY,
            rate_limit_retry: true,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

/// `[prefetch]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefetchSettings {
    pub capacity: usize,
    pub base_delay: Duration,
    pub cleanup_interval: Duration,
    pub max_age: Duration,
    pub consume_max_age: Duration,
    pub jitter_probability: f64,
    pub jitter_max_m: f64,
}

impl Default for PrefetchSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            base_delay: DEFAULT_BASE_DELAY,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            max_age: DEFAULT_MAX_QUEUED_AGE,
            consume_max_age: DEFAULT_CONSUME_MAX_AGE,
            jitter_probability: DEFAULT_JITTER_PROBABILITY,
            jitter_max_m: DEFAULT_JITTER_MAX_M,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Directory for rolling log files; console only when unset.
    pub directory: Option<PathBuf>,
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: None,
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// The complete configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub lookup: LookupSettings,
    pub cache_max_entries: usize,
    pub prefetch: PrefetchSettings,
    pub camera: PlacementConfig,
    pub safe_margin: f64,
    pub logging: LoggingSettings,
    pub regions: Vec<Region>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            lookup: LookupSettings::default(),
            cache_max_entries: DEFAULT_MAX_ENTRIES,
            prefetch: PrefetchSettings::default(),
            camera: PlacementConfig::default(),
            safe_margin: DEFAULT_SAFE_MARGIN,
            logging: LoggingSettings::default(),
            regions: default_regions(),
        }
    }
}

/// Regions sampled when the configuration defines none.
pub fn default_regions() -> Vec<Region> {
    [
        ("western_europe", 43.0, 52.0, -5.0, 10.0),
        ("us_northeast", 38.0, 43.0, -78.0, -70.0),
        ("japan", 33.0, 36.0, 132.0, 140.0),
        ("southeast_australia", -38.0, -33.0, 145.0, 152.0),
    ]
    .into_iter()
    .map(|(name, min_lat, max_lat, min_lon, max_lon)| Region {
        name: name.to_string(),
        min_lat,
        max_lat,
        min_lon,
        max_lon,
    })
    .collect()
}

impl ConfigFile {
    /// `~/.dronepair/config.ini`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoHomeDirectory)
    }

    /// Loads and validates a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Loads `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parses INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let defaults = Self::default();

        let lookup = match ini.section(Some("lookup")) {
            Some(props) => parse_lookup(props, defaults.lookup)?,
            None => defaults.lookup,
        };

        let cache_max_entries = match ini.section(Some("cache")) {
            Some(props) => {
                get_parsed(props, "cache", "max_entries")?.unwrap_or(defaults.cache_max_entries)
            }
            None => defaults.cache_max_entries,
        };

        let prefetch = match ini.section(Some("prefetch")) {
            Some(props) => parse_prefetch(props, defaults.prefetch)?,
            None => defaults.prefetch,
        };

        let camera = match ini.section(Some("camera")) {
            Some(props) => parse_camera(props, defaults.camera)?,
            None => defaults.camera,
        };
        camera.validate()?;

        let safe_margin = match ini.section(Some("validation")) {
            Some(props) => get_parsed(props, "validation", "safe_margin")?
                .unwrap_or(defaults.safe_margin),
            None => defaults.safe_margin,
        };
        if !(0.0..=0.5).contains(&safe_margin) {
            return Err(ConfigError::invalid(
                "validation",
                "safe_margin",
                safe_margin.to_string(),
                "must be within [0, 0.5]",
            ));
        }

        let logging = match ini.section(Some("logging")) {
            Some(props) => LoggingSettings {
                directory: props
                    .get("directory")
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from),
                level: props
                    .get("level")
                    .map(|s| s.trim().to_string())
                    .unwrap_or(defaults.logging.level),
            },
            None => defaults.logging,
        };

        let regions = parse_regions(&ini)?;

        Ok(Self {
            lookup,
            cache_max_entries,
            prefetch,
            camera,
            safe_margin,
            logging,
            regions: if regions.is_empty() {
                defaults.regions
            } else {
                regions
            },
        })
    }

    /// Renders the configuration as INI text.
    pub fn to_ini(&self) -> String {
        let mut ini = Ini::new();

        ini.with_section(Some("lookup"))
            .set("endpoints", self.lookup.endpoints.join(", "))
            .set("search_radius_m", self.lookup.search_radius_m.to_string())
            .set(
                "request_timeout_secs",
                self.lookup.request_timeout.as_secs().to_string(),
            )
            .set(
                "request_delay_ms",
                self.lookup.request_delay.as_millis().to_string(),
            )
            .set("rate_limit_retry", self.lookup.rate_limit_retry.to_string())
            .set("failure_threshold", self.lookup.failure_threshold.to_string());

        ini.with_section(Some("cache"))
            .set("max_entries", self.cache_max_entries.to_string());

        let p = &self.prefetch;
        ini.with_section(Some("prefetch"))
            .set("capacity", p.capacity.to_string())
            .set("base_delay_ms", p.base_delay.as_millis().to_string())
            .set("cleanup_interval_secs", p.cleanup_interval.as_secs().to_string())
            .set("max_age_secs", p.max_age.as_secs().to_string())
            .set("consume_max_age_secs", p.consume_max_age.as_secs().to_string())
            .set("jitter_probability", p.jitter_probability.to_string())
            .set("jitter_max_m", p.jitter_max_m.to_string());

        let c = &self.camera;
        ini.with_section(Some("camera"))
            .set("min_height_m", c.min_height_m.to_string())
            .set("max_height_m", c.max_height_m.to_string())
            .set("min_distance_m", c.min_distance_m.to_string())
            .set("max_distance_m", c.max_distance_m.to_string())
            .set("min_angle_diff_deg", c.min_angle_diff_deg.to_string())
            .set("max_angle_diff_deg", c.max_angle_diff_deg.to_string());

        ini.with_section(Some("validation"))
            .set("safe_margin", self.safe_margin.to_string());

        let directory = self
            .logging
            .directory
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_default();
        ini.with_section(Some("logging"))
            .set("directory", directory)
            .set("level", self.logging.level.clone());

        for region in &self.regions {
            ini.with_section(Some(format!("{}{}", REGION_PREFIX, region.name)))
                .set("min_lat", region.min_lat.to_string())
                .set("max_lat", region.max_lat.to_string())
                .set("min_lon", region.min_lon.to_string())
                .set("max_lon", region.max_lon.to_string());
        }

        let mut out = Vec::new();
        // Writing into a Vec cannot fail
        let _ = ini.write_to(&mut out);
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Writes the configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, self.to_ini()).map_err(write_err)
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            request_timeout: self.lookup.request_timeout,
            request_delay: self.lookup.request_delay,
            retry_on_rate_limit: self.lookup.rate_limit_retry,
            search_radius_m: self.lookup.search_radius_m,
        }
    }

    pub fn prefetch_config(&self) -> PrefetchConfig {
        PrefetchConfig {
            capacity: self.prefetch.capacity,
            base_delay: self.prefetch.base_delay,
            cleanup_interval: self.prefetch.cleanup_interval,
            max_queued_age: self.prefetch.max_age,
            ..PrefetchConfig::default()
        }
    }

    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            max_age: self.prefetch.consume_max_age,
            ..ConsumerConfig::default()
        }
    }

    pub fn jitter(&self) -> JitterConfig {
        JitterConfig {
            probability: self.prefetch.jitter_probability,
            max_distance_m: self.prefetch.jitter_max_m,
        }
    }

    pub fn validator(&self) -> CorrespondenceValidator {
        CorrespondenceValidator::new(self.safe_margin)
    }
}

fn get_parsed<T>(props: &Properties, section: &str, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match props.get(key).map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::invalid(section, key, raw, e.to_string())),
    }
}

fn get_bool(props: &Properties, section: &str, key: &str) -> Result<Option<bool>, ConfigError> {
    let Some(raw) = props.get(key).map(str::trim) else {
        return Ok(None);
    };
    match raw.to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "true" | "yes" | "on" | "1" => Ok(Some(true)),
        "false" | "no" | "off" | "0" => Ok(Some(false)),
        _ => Err(ConfigError::invalid(section, key, raw, "expected true or false")),
    }
}

fn parse_lookup(props: &Properties, d: LookupSettings) -> Result<LookupSettings, ConfigError> {
    const S: &str = "lookup";

    let endpoints = match props.get("endpoints") {
        Some(raw) => {
            let list: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if list.is_empty() {
                return Err(ConfigError::invalid(S, "endpoints", raw, "no endpoints listed"));
            }
            for endpoint in &list {
                check_endpoint(endpoint)?;
            }
            list
        }
        None => d.endpoints,
    };

    let failure_threshold: u32 =
        get_parsed(props, S, "failure_threshold")?.unwrap_or(d.failure_threshold);
    if failure_threshold == 0 {
        return Err(ConfigError::invalid(S, "failure_threshold", "0", "must be at least 1"));
    }

    Ok(LookupSettings {
        endpoints,
        search_radius_m: get_parsed(props, S, "search_radius_m")?.unwrap_or(d.search_radius_m),
        request_timeout: get_parsed(props, S, "request_timeout_secs")?
            .map(Duration::from_secs)
            .unwrap_or(d.request_timeout),
        request_delay: get_parsed(props, S, "request_delay_ms")?
            .map(Duration::from_millis)
            .unwrap_or(d.request_delay),
        rate_limit_retry: get_bool(props, S, "rate_limit_retry")?.unwrap_or(d.rate_limit_retry),
        failure_threshold,
    })
}

fn check_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    match Url::parse(endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(ConfigError::invalid(
            "lookup",
            "endpoints",
            endpoint,
            format!("unsupported scheme {:?}", url.scheme()),
        )),
        Err(e) => Err(ConfigError::invalid(
            "lookup",
            "endpoints",
            endpoint,
            e.to_string(),
        )),
    }
}

fn parse_prefetch(
    props: &Properties,
    d: PrefetchSettings,
) -> Result<PrefetchSettings, ConfigError> {
    const S: &str = "prefetch";

    let capacity: usize = get_parsed(props, S, "capacity")?.unwrap_or(d.capacity);
    if capacity == 0 {
        return Err(ConfigError::invalid(S, "capacity", "0", "must be at least 1"));
    }

    let jitter_probability: f64 =
        get_parsed(props, S, "jitter_probability")?.unwrap_or(d.jitter_probability);
    if !(0.0..=1.0).contains(&jitter_probability) {
        return Err(ConfigError::invalid(
            S,
            "jitter_probability",
            jitter_probability.to_string(),
            "must be within [0, 1]",
        ));
    }

    let jitter_max_m: f64 = get_parsed(props, S, "jitter_max_m")?.unwrap_or(d.jitter_max_m);
    if !(jitter_max_m >= 0.0 && jitter_max_m.is_finite()) {
        return Err(ConfigError::invalid(
            S,
            "jitter_max_m",
            jitter_max_m.to_string(),
            "must be a non-negative distance",
        ));
    }

    Ok(PrefetchSettings {
        capacity,
        base_delay: get_parsed(props, S, "base_delay_ms")?
            .map(Duration::from_millis)
            .unwrap_or(d.base_delay),
        cleanup_interval: get_parsed(props, S, "cleanup_interval_secs")?
            .map(Duration::from_secs)
            .unwrap_or(d.cleanup_interval),
        max_age: get_parsed(props, S, "max_age_secs")?
            .map(Duration::from_secs)
            .unwrap_or(d.max_age),
        consume_max_age: get_parsed(props, S, "consume_max_age_secs")?
            .map(Duration::from_secs)
            .unwrap_or(d.consume_max_age),
        jitter_probability,
        jitter_max_m,
    })
}

fn parse_camera(props: &Properties, d: PlacementConfig) -> Result<PlacementConfig, ConfigError> {
    const S: &str = "camera";
    Ok(PlacementConfig {
        min_height_m: get_parsed(props, S, "min_height_m")?.unwrap_or(d.min_height_m),
        max_height_m: get_parsed(props, S, "max_height_m")?.unwrap_or(d.max_height_m),
        min_distance_m: get_parsed(props, S, "min_distance_m")?.unwrap_or(d.min_distance_m),
        max_distance_m: get_parsed(props, S, "max_distance_m")?.unwrap_or(d.max_distance_m),
        min_angle_diff_deg: get_parsed(props, S, "min_angle_diff_deg")?
            .unwrap_or(d.min_angle_diff_deg),
        max_angle_diff_deg: get_parsed(props, S, "max_angle_diff_deg")?
            .unwrap_or(d.max_angle_diff_deg),
    })
}

fn parse_regions(ini: &Ini) -> Result<Vec<Region>, ConfigError> {
    let mut regions = Vec::new();

    for (section, props) in ini.iter() {
        let Some(name) = section.and_then(|s| s.strip_prefix(REGION_PREFIX)) else {
            continue;
        };

        let require = |key: &str| -> Result<f64, ConfigError> {
            get_parsed(props, section.unwrap_or_default(), key)?.ok_or_else(|| {
                ConfigError::MissingKey {
                    section: format!("{}{}", REGION_PREFIX, name),
                    key: key.to_string(),
                }
            })
        };

        let region = Region::new(
            name,
            require("min_lat")?,
            require("max_lat")?,
            require("min_lon")?,
            require("max_lon")?,
        )
        .map_err(|source| ConfigError::InvalidRegion {
            name: name.to_string(),
            source,
        })?;
        regions.push(region);
    }

    Ok(regions)
}
