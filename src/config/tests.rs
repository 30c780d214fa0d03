use std::path::Path;

use super::*;

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::WARN);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.render.dark_theme, DEFAULT_DARK_THEME);
    assert_eq!(settings.render.light_theme, DEFAULT_LIGHT_THEME);
    assert_eq!(settings.render.default_theme, ThemeMode::Light);
    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.document_limit, DEFAULT_DOCUMENT_LIMIT);
    assert_eq!(settings.cache.highlight_limit, DEFAULT_HIGHLIGHT_LIMIT);
    assert_eq!(settings.host.preview_dir, Path::new(DEFAULT_PREVIEW_DIR));
    assert!(settings.host.clipboard_file.is_none());
}

#[test]
fn default_settings_match_render_pipeline_defaults() {
    use crate::application::render::RenderPipelineConfig;

    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    let from_settings = RenderPipelineConfig::from(&settings);
    let built_in = RenderPipelineConfig::default();

    assert_eq!(from_settings.dark_theme, built_in.dark_theme);
    assert_eq!(from_settings.light_theme, built_in.light_theme);
    assert_eq!(from_settings.cache, built_in.cache);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.cache.enabled = Some(true);

    let overrides = GlobalOverrides {
        log_level: Some("debug".to_string()),
        log_json: Some(true),
        no_cache: true,
        ..Default::default()
    };

    raw.apply_global_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(matches!(settings.logging.format, LogFormat::Json));
    assert!(!settings.cache.enabled);
}

#[test]
fn host_overrides_replace_file_values() {
    let mut raw = RawSettings::default();
    raw.host.preview_dir = Some(PathBuf::from("/from/file"));

    raw.apply_host_overrides(&HostOverrides {
        clipboard_file: Some(PathBuf::from("/tmp/clip.txt")),
        preview_dir: Some(PathBuf::from("/tmp/previews")),
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(
        settings.host.clipboard_file.as_deref(),
        Some(Path::new("/tmp/clip.txt"))
    );
    assert_eq!(settings.host.preview_dir, Path::new("/tmp/previews"));
}

#[test]
fn zero_cache_limit_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.document_limit = Some(0);

    let err = Settings::from_raw(raw).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.document_limit",
            ..
        }
    ));
}

#[test]
fn unknown_default_theme_is_rejected() {
    let mut raw = RawSettings::default();
    raw.render.default_theme = Some("sepia".to_string());

    let err = Settings::from_raw(raw).unwrap_err();
    assert!(err.to_string().contains("render.default_theme"));
}

#[test]
fn blank_highlight_theme_is_rejected() {
    let mut raw = RawSettings::default();
    raw.render.dark_theme = Some("   ".to_string());

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn parse_render_arguments() {
    let args = CliArgs::parse_from([
        "markpane",
        "render",
        "notes.md",
        "--theme",
        "dark",
        "--hide-code-copy-button",
        "--class-name",
        "chat",
        "--json",
        "--log-level",
        "debug",
    ]);

    assert_eq!(args.overrides.log_level.as_deref(), Some("debug"));
    match args.command {
        Command::Render(render) => {
            assert_eq!(render.pane.file, Path::new("notes.md"));
            assert_eq!(render.pane.theme, Some(ThemeMode::Dark));
            assert!(render.pane.hide_code_copy_button);
            assert_eq!(render.class_name.as_deref(), Some("chat"));
            assert!(render.json);
            assert!(render.output.is_none());
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_code_arguments() {
    let args = CliArgs::parse_from([
        "markpane",
        "code",
        "notes.md",
        "2",
        "--preview",
        "--preview-dir",
        "/tmp/previews",
    ]);

    match args.command {
        Command::Code(code) => {
            assert_eq!(code.index, 2);
            assert!(code.preview);
            assert_eq!(
                code.host.preview_dir.as_deref(),
                Some(Path::new("/tmp/previews"))
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn invalid_theme_argument_fails_to_parse() {
    let result = CliArgs::try_parse_from(["markpane", "render", "notes.md", "--theme", "sepia"]);
    assert!(result.is_err());
}
