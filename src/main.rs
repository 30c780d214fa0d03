use std::{
    fs,
    io::{self, Write},
    path::Path,
    process,
    sync::Arc,
};

use markpane::{
    application::{
        error::AppError,
        host::{HostServices, LogNotifier},
        i18n::Catalog,
        markdown::{ActionOutcome, MarkdownRenderer, ViewAction},
        render::{
            CodeAction, RenderContext, RenderOptions, RenderPipelineConfig, RenderedDocument,
            ThemeMode, configure_render_service, render_service,
        },
    },
    cache::CacheConfig,
    config::{self, CodeArgs, Command, CopyArgs, PaneArgs, RenderArgs, Settings},
    infra::{
        error::InfraError,
        host::{DirectoryPreview, FileClipboard},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;
    configure_render_service(RenderPipelineConfig::from(&settings))
        .map_err(|err| AppError::unexpected(err.to_string()))?;

    let catalog = match settings.render.locale_file.as_deref() {
        Some(path) => Catalog::load(path)?,
        None => Catalog::default(),
    };

    match cli_args.command {
        Command::Render(args) => run_render(&settings, &catalog, args),
        Command::Copy(args) => run_copy(&settings, &catalog, args),
        Command::Code(args) => run_code(&settings, &catalog, args),
    }
}

fn run_render(settings: &Settings, catalog: &Catalog, args: RenderArgs) -> Result<(), AppError> {
    let renderer = build_renderer(settings);
    let markdown = read_markdown(&args.pane.file)?;
    let mut options = pane_options(&args.pane);
    if let Some(class_name) = args.class_name {
        options = options.with_class_name(class_name);
    }
    let ctx = RenderContext::new(pane_theme(settings, &args.pane), catalog);

    let doc = renderer.render(&markdown, &options, &ctx);
    info!(
        target = "markpane::render",
        file = %args.pane.file.display(),
        theme = %ctx.theme,
        code_blocks = doc.code_blocks.len(),
        links = doc.links.len(),
        "Rendered document"
    );

    let mut output = if args.json {
        serde_json::to_string_pretty(&*doc).map_err(InfraError::from)?
    } else {
        doc.wrap(options.class_name.as_deref())
    };
    output.push('\n');

    match args.output {
        Some(path) => fs::write(&path, output).map_err(InfraError::from)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(output.as_bytes())
                .map_err(InfraError::from)?;
        }
    }
    Ok(())
}

fn run_copy(settings: &Settings, catalog: &Catalog, args: CopyArgs) -> Result<(), AppError> {
    let renderer = build_renderer(settings);
    let markdown = read_markdown(&args.file)?;
    let ctx = RenderContext::new(settings.render.default_theme, catalog);

    let doc = renderer.render(&markdown, &RenderOptions::default(), &ctx);
    renderer.dispatch(&doc, ViewAction::CopyDocument, catalog);
    Ok(())
}

fn run_code(settings: &Settings, catalog: &Catalog, args: CodeArgs) -> Result<(), AppError> {
    let renderer = build_renderer(settings);
    let markdown = read_markdown(&args.pane.file)?;
    let ctx = RenderContext::new(pane_theme(settings, &args.pane), catalog);

    let doc = renderer.render(&markdown, &pane_options(&args.pane), &ctx);
    ensure_code_block(&doc, args.index)?;

    let (action, code_action) = if args.preview {
        (
            ViewAction::PreviewCode { index: args.index },
            CodeAction::Preview,
        )
    } else {
        (ViewAction::CopyCode { index: args.index }, CodeAction::Copy)
    };

    match renderer.dispatch(&doc, action, catalog) {
        ActionOutcome::Ignored => Err(AppError::ActionUnavailable {
            action: code_action.data_action(),
            index: args.index,
        }),
        ActionOutcome::Copied | ActionOutcome::Previewed => Ok(()),
    }
}

fn build_renderer(settings: &Settings) -> MarkdownRenderer {
    let host = HostServices::new(
        Arc::new(FileClipboard::new(settings.host.clipboard_file.clone())),
        Arc::new(LogNotifier),
    )
    .with_preview(Arc::new(DirectoryPreview::new(
        settings.host.preview_dir.clone(),
    )));

    MarkdownRenderer::new(render_service(), &CacheConfig::from(&settings.cache), host)
}

fn pane_options(args: &PaneArgs) -> RenderOptions {
    RenderOptions {
        suppress_code_copy_button: args.hide_code_copy_button,
        class_name: None,
    }
}

fn pane_theme(settings: &Settings, args: &PaneArgs) -> ThemeMode {
    args.theme.unwrap_or(settings.render.default_theme)
}

fn ensure_code_block(doc: &RenderedDocument, index: usize) -> Result<(), AppError> {
    if doc.code_block(index).is_none() {
        return Err(AppError::UnknownCodeBlock {
            index,
            available: doc.code_blocks.len(),
        });
    }
    Ok(())
}

fn read_markdown(path: &Path) -> Result<String, AppError> {
    fs::read_to_string(path).map_err(|err| {
        let context = io::Error::new(err.kind(), format!("{}: {err}", path.display()));
        AppError::from(InfraError::Io(context))
    })
}
