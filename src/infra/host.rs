//! File-system host used by the command-line binary.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{info, warn};

use crate::application::host::{Clipboard, CodePreview};
use crate::cache::lock::mutex_lock;

const SOURCE: &str = "infra::host";

/// Clipboard that writes into a file, or to stdout when no file is set.
#[derive(Debug, Clone, Default)]
pub struct FileClipboard {
    target: Option<PathBuf>,
}

impl FileClipboard {
    pub fn new(target: Option<PathBuf>) -> Self {
        Self { target }
    }

    fn write(&self, text: &str) -> io::Result<()> {
        match &self.target {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, text)
            }
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(text.as_bytes())?;
                stdout.flush()
            }
        }
    }
}

impl Clipboard for FileClipboard {
    fn write_text(&self, text: &str) {
        if let Err(err) = self.write(text) {
            warn!(
                target = "infra::host::clipboard",
                path = ?self.target,
                error = %err,
                "Clipboard write failed"
            );
        }
    }
}

/// Writes previewed snippets to `<dir>/preview-<n>.<ext>`, picking the first
/// unused `n`.
#[derive(Debug)]
pub struct DirectoryPreview {
    dir: PathBuf,
    next: Mutex<usize>,
}

impl DirectoryPreview {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next: Mutex::new(0),
        }
    }

    fn write(&self, code: &str, language: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let mut next = mutex_lock(&self.next, SOURCE, "preview");
        let extension = preview_extension(language);
        loop {
            let path = self.dir.join(format!("preview-{}.{extension}", *next));
            *next += 1;
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => {
                    fill_or_discard(file, &path, code)?;
                    return Ok(path);
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

impl CodePreview for DirectoryPreview {
    fn preview_code(&self, code: &str, language: &str) {
        match self.write(code, language) {
            Ok(path) => info!(
                target = "infra::host::preview",
                language,
                path = %path.display(),
                "Wrote code preview"
            ),
            Err(err) => warn!(
                target = "infra::host::preview",
                language,
                dir = %self.dir.display(),
                error = %err,
                "Code preview failed"
            ),
        }
    }
}

/// Writes `code` into a freshly created file, deleting it again if the write
/// fails so no truncated preview is left behind.
fn fill_or_discard(mut file: impl Write, path: &Path, code: &str) -> io::Result<()> {
    let written = file.write_all(code.as_bytes()).and_then(|()| file.flush());
    if let Err(err) = written {
        drop(file);
        if let Err(remove_err) = fs::remove_file(path) {
            warn!(
                target = "infra::host::preview",
                path = %path.display(),
                error = %remove_err,
                "Failed to remove partial preview"
            );
        }
        return Err(err);
    }
    Ok(())
}

fn preview_extension(language: &str) -> &'static str {
    match language {
        "html" => "html",
        "css" => "css",
        "javascript" => "js",
        _ => "txt",
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn file_clipboard_overwrites_target() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("clip.txt");
        let clipboard = FileClipboard::new(Some(path.clone()));

        clipboard.write_text("first");
        clipboard.write_text("second\n");

        assert_eq!(fs::read_to_string(&path).expect("read"), "second\n");
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::StorageFull, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_preview_write_leaves_no_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("preview-0.html");
        fs::write(&path, "").expect("create");

        let err = fill_or_discard(FailingWriter, &path, "<p>x</p>").unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::StorageFull);
        assert!(!path.exists());
    }

    #[test]
    fn previews_get_sequential_names() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("preview-0.html"), "taken").expect("seed");
        let preview = DirectoryPreview::new(dir.path());

        preview.preview_code("<p>x</p>", "html");
        preview.preview_code("a {}", "css");
        preview.preview_code("1 + 1", "javascript");

        assert_eq!(
            fs::read_to_string(dir.path().join("preview-0.html")).expect("read"),
            "taken"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("preview-1.html")).expect("read"),
            "<p>x</p>"
        );
        assert!(dir.path().join("preview-2.css").exists());
        assert!(dir.path().join("preview-3.js").exists());
    }
}
