use ammonia::clean_text;
use syntect::{
    easy::HighlightLines,
    highlighting::{Color, Theme, ThemeSet},
    html::{IncludeBackground, styled_line_to_highlighted_html},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};
use thiserror::Error;

use crate::application::render::types::{RenderError, ThemeMode};

pub const DEFAULT_DARK_THEME: &str = "base16-ocean.dark";
pub const DEFAULT_LIGHT_THEME: &str = "base16-ocean.light";

#[derive(Debug, Error)]
pub enum HighlightConfigError {
    #[error("unknown highlight theme `{name}`; available: {available}")]
    UnknownTheme { name: String, available: String },
}

/// Syntect highlighter holding one palette per theme mode.
pub(crate) struct Highlighter {
    syntax_set: SyntaxSet,
    dark: Theme,
    light: Theme,
}

impl Highlighter {
    pub(crate) fn new(
        syntax_set: SyntaxSet,
        dark_theme: &str,
        light_theme: &str,
    ) -> Result<Self, HighlightConfigError> {
        let mut themes = ThemeSet::load_defaults();
        let dark = take_theme(&mut themes, dark_theme)?;
        let light = take_theme(&mut themes, light_theme)?;
        Ok(Self {
            syntax_set,
            dark,
            light,
        })
    }

    pub(crate) fn with_default_themes(syntax_set: SyntaxSet) -> Self {
        let mut themes = ThemeSet::load_defaults();
        Self {
            syntax_set,
            dark: themes.themes.remove(DEFAULT_DARK_THEME).unwrap_or_default(),
            light: themes.themes.remove(DEFAULT_LIGHT_THEME).unwrap_or_default(),
        }
    }

    fn theme(&self, mode: ThemeMode) -> &Theme {
        match mode {
            ThemeMode::Dark => &self.dark,
            ThemeMode::Light => &self.light,
        }
    }

    /// Highlight `code` into a `<pre>` carrying the palette background. The
    /// caller is responsible for trimming the trailing newline.
    pub(crate) fn highlight(
        &self,
        language: &str,
        code: &str,
        mode: ThemeMode,
    ) -> Result<String, RenderError> {
        let syntax = find_syntax(&self.syntax_set, language)
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());
        let theme = self.theme(mode);
        let mut highlighter = HighlightLines::new(syntax, theme);

        let mut body = String::with_capacity(code.len() * 2);
        for line in LinesWithEndings::from(code) {
            let regions = highlighter
                .highlight_line(line, &self.syntax_set)
                .map_err(|err| highlighting_error(language, err))?;
            let html = styled_line_to_highlighted_html(&regions[..], IncludeBackground::No)
                .map_err(|err| highlighting_error(language, err))?;
            body.push_str(&html);
        }

        let background = theme
            .settings
            .background
            .map(css_color)
            .unwrap_or_else(|| fallback_background(mode).to_string());
        let foreground = theme
            .settings
            .foreground
            .map(css_color)
            .unwrap_or_else(|| fallback_foreground(mode).to_string());

        Ok(format!(
            "<pre style=\"{}\"><code>{body}</code></pre>",
            body_style(&background, &foreground)
        ))
    }

    /// Escaped, unhighlighted body used when highlighting fails.
    pub(crate) fn plain(&self, code: &str, mode: ThemeMode) -> String {
        format!(
            "<pre style=\"{}\"><code>{}</code></pre>",
            body_style(fallback_background(mode), fallback_foreground(mode)),
            clean_text(code)
        )
    }
}

fn body_style(background: &str, foreground: &str) -> String {
    format!(
        "margin:0;padding:1em;overflow:auto;background-color:{background};color:{foreground};\
border:none;border-radius:0 0 0.3rem 0.3rem"
    )
}

fn fallback_background(mode: ThemeMode) -> &'static str {
    match mode {
        ThemeMode::Dark => "#2b303b",
        ThemeMode::Light => "#eff1f5",
    }
}

fn fallback_foreground(mode: ThemeMode) -> &'static str {
    match mode {
        ThemeMode::Dark => "#c0c5ce",
        ThemeMode::Light => "#4f5b66",
    }
}

fn css_color(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

fn take_theme(themes: &mut ThemeSet, name: &str) -> Result<Theme, HighlightConfigError> {
    themes
        .themes
        .get(name)
        .cloned()
        .ok_or_else(|| HighlightConfigError::UnknownTheme {
            name: name.to_string(),
            available: themes
                .themes
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
        })
}

fn highlighting_error(language: &str, err: syntect::Error) -> RenderError {
    RenderError::Highlighting {
        language: language.to_string(),
        message: err.to_string(),
    }
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(&lowercase))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn highlighter() -> Highlighter {
        Highlighter::new(
            SyntaxSet::load_defaults_newlines(),
            DEFAULT_DARK_THEME,
            DEFAULT_LIGHT_THEME,
        )
        .expect("default themes exist")
    }

    #[test]
    fn palettes_differ_between_modes() {
        let highlighter = highlighter();
        let dark = highlighter
            .highlight("rust", "fn main() {}\nlet x = 1;", ThemeMode::Dark)
            .expect("dark");
        let light = highlighter
            .highlight("rust", "fn main() {}\nlet x = 1;", ThemeMode::Light)
            .expect("light");

        assert!(dark.starts_with("<pre style=\""));
        assert!(dark.contains("<span style="));
        assert_ne!(dark, light);
    }

    #[test]
    fn unknown_language_falls_back_to_plain_text() {
        let html = highlighter()
            .highlight("not-a-language", "a < b\nc", ThemeMode::Light)
            .expect("plain text highlighting");
        assert!(html.contains("a &lt; b"));
    }

    #[test]
    fn unknown_theme_is_rejected() {
        let err = Highlighter::new(
            SyntaxSet::load_defaults_newlines(),
            "no-such-theme",
            DEFAULT_LIGHT_THEME,
        )
        .err()
        .expect("unknown theme");
        assert!(err.to_string().contains("no-such-theme"));
    }

    #[test]
    fn plain_body_escapes_markup() {
        let html = highlighter().plain("<script>", ThemeMode::Dark);
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("#2b303b"));
    }
}
