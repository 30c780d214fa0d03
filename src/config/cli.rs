use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::application::render::ThemeMode;

/// Command-line arguments for the markpane binary.
#[derive(Debug, Parser)]
#[command(
    name = "markpane",
    version,
    about = "Render markdown panes and run their copy and preview actions"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "MARKPANE_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render a markdown file to HTML.
    Render(RenderArgs),
    /// Copy the whole source of a markdown file to the clipboard.
    Copy(CopyArgs),
    /// Copy or preview one code block of a markdown file.
    Code(CodeArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Translation catalog used for button labels and notifications.
    #[arg(
        long = "locale-file",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub locale_file: Option<PathBuf>,

    /// Disable document and highlight memoization.
    #[arg(long = "no-cache", action = clap::ArgAction::SetTrue, global = true)]
    pub no_cache: bool,
}

/// Options shared by every command that renders a document.
#[derive(Debug, Args, Default, Clone)]
pub struct PaneArgs {
    /// Markdown file to read.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Theme mode (light|dark); defaults to `render.default_theme`.
    #[arg(long, value_name = "MODE")]
    pub theme: Option<ThemeMode>,

    /// Hide copy and preview buttons on code blocks.
    #[arg(long = "hide-code-copy-button", action = clap::ArgAction::SetTrue)]
    pub hide_code_copy_button: bool,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub pane: PaneArgs,

    /// Extra class applied to the pane container.
    #[arg(long = "class-name", value_name = "CLASS")]
    pub class_name: Option<String>,

    /// Print the rendered document with its metadata as JSON.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,

    /// Write output to a file instead of stdout.
    #[arg(long, short = 'o', value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct CopyArgs {
    /// Markdown file to read.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    #[command(flatten)]
    pub host: HostOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct CodeArgs {
    #[command(flatten)]
    pub pane: PaneArgs,

    /// Zero-based index of the code span, in document order.
    #[arg(value_name = "INDEX")]
    pub index: usize,

    /// Preview the block instead of copying it.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub preview: bool,

    #[command(flatten)]
    pub host: HostOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct HostOverrides {
    /// File that receives clipboard writes; stdout when unset.
    #[arg(long = "clipboard-file", value_name = "PATH")]
    pub clipboard_file: Option<PathBuf>,

    /// Directory that receives previewed code.
    #[arg(long = "preview-dir", value_name = "PATH")]
    pub preview_dir: Option<PathBuf>,
}
