//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{num::NonZeroUsize, path::PathBuf, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::render::{DEFAULT_DARK_THEME, DEFAULT_LIGHT_THEME, ThemeMode};

pub use cli::{
    CliArgs, CodeArgs, Command, CopyArgs, GlobalOverrides, HostOverrides, PaneArgs, RenderArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "markpane";
const ENV_PREFIX: &str = "MARKPANE";
const DEFAULT_DOCUMENT_LIMIT: usize = 64;
const DEFAULT_HIGHLIGHT_LIMIT: usize = 256;
const DEFAULT_PREVIEW_DIR: &str = "markpane-preview";

#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub render: RenderSettings,
    pub cache: CacheSettings,
    pub host: HostSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub dark_theme: String,
    pub light_theme: String,
    pub default_theme: ThemeMode,
    pub locale_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub document_limit: usize,
    pub highlight_limit: usize,
}

#[derive(Debug, Clone)]
pub struct HostSettings {
    pub clipboard_file: Option<PathBuf>,
    pub preview_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_global_overrides(&cli.overrides);
    match &cli.command {
        Command::Copy(args) => raw.apply_host_overrides(&args.host),
        Command::Code(args) => raw.apply_host_overrides(&args.host),
        Command::Render(_) => {}
    }

    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    render: RawRenderSettings,
    cache: RawCacheSettings,
    host: RawHostSettings,
}

impl RawSettings {
    fn apply_global_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(path) = overrides.locale_file.as_ref() {
            self.render.locale_file = Some(path.clone());
        }
        if overrides.no_cache {
            self.cache.enabled = Some(false);
        }
    }

    fn apply_host_overrides(&mut self, overrides: &HostOverrides) {
        if let Some(path) = overrides.clipboard_file.as_ref() {
            self.host.clipboard_file = Some(path.clone());
        }
        if let Some(dir) = overrides.preview_dir.as_ref() {
            self.host.preview_dir = Some(dir.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            render,
            cache,
            host,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            render: build_render_settings(render)?,
            cache: build_cache_settings(cache)?,
            host: build_host_settings(host)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::WARN,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let dark_theme = non_empty(render.dark_theme, DEFAULT_DARK_THEME, "render.dark_theme")?;
    let light_theme = non_empty(render.light_theme, DEFAULT_LIGHT_THEME, "render.light_theme")?;

    let default_theme = match render.default_theme {
        Some(value) => ThemeMode::from_str(&value)
            .map_err(|err| LoadError::invalid("render.default_theme", err.to_string()))?,
        None => ThemeMode::default(),
    };

    let locale_file = render
        .locale_file
        .filter(|path| !path.as_os_str().is_empty());

    Ok(RenderSettings {
        dark_theme,
        light_theme,
        default_theme,
        locale_file,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let document_limit = non_zero_usize(
        cache.document_limit.unwrap_or(DEFAULT_DOCUMENT_LIMIT),
        "cache.document_limit",
    )?;
    let highlight_limit = non_zero_usize(
        cache.highlight_limit.unwrap_or(DEFAULT_HIGHLIGHT_LIMIT),
        "cache.highlight_limit",
    )?;

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        document_limit: document_limit.get(),
        highlight_limit: highlight_limit.get(),
    })
}

fn build_host_settings(host: RawHostSettings) -> Result<HostSettings, LoadError> {
    let preview_dir = host
        .preview_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PREVIEW_DIR));
    if preview_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "host.preview_dir",
            "path must not be empty",
        ));
    }

    Ok(HostSettings {
        clipboard_file: host
            .clipboard_file
            .filter(|path| !path.as_os_str().is_empty()),
        preview_dir,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    dark_theme: Option<String>,
    light_theme: Option<String>,
    default_theme: Option<String>,
    locale_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    document_limit: Option<usize>,
    highlight_limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHostSettings {
    clipboard_file: Option<PathBuf>,
    preview_dir: Option<PathBuf>,
}

fn non_empty(
    value: Option<String>,
    default: &str,
    key: &'static str,
) -> Result<String, LoadError> {
    let value = value.unwrap_or_else(|| default.to_string());
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LoadError::invalid(key, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn non_zero_usize(value: usize, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;
