//! Directory document source

use async_trait::async_trait;
use pulldown_cmark::{Event, Parser, TagEnd};
use scraper::{Html, Selector};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};
use walkdir::WalkDir;

use kba_core::{DocumentSource, Error, Result, SourceText};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "html", "htm", "csv"];

/// Reads plain-text, Markdown, HTML and CSV documents from the filesystem
#[derive(Debug, Clone)]
pub struct DirectoryDocumentSource {
    max_file_size: u64,
}

impl DirectoryDocumentSource {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    fn extension(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// Source identifier: path relative to the ingested root, `/`-separated
    fn source_id(root: &Path, path: &Path) -> String {
        let relative = path.strip_prefix(root).ok().filter(|p| !p.as_os_str().is_empty());
        match relative {
            Some(rel) => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/"),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }

    fn markdown_to_text(raw: &str) -> String {
        let mut text = String::with_capacity(raw.len());
        for event in Parser::new(raw) {
            match event {
                Event::Text(t) | Event::Code(t) => text.push_str(&t),
                Event::SoftBreak => text.push(' '),
                Event::HardBreak => text.push('\n'),
                Event::End(
                    TagEnd::Paragraph
                    | TagEnd::Heading(_)
                    | TagEnd::Item
                    | TagEnd::CodeBlock
                    | TagEnd::TableRow,
                ) => text.push('\n'),
                Event::End(TagEnd::TableCell) => text.push(' '),
                _ => {}
            }
        }
        text
    }

    fn html_to_text(raw: &str) -> String {
        let document = Html::parse_document(raw);
        let body = Selector::parse("body")
            .ok()
            .and_then(|selector| document.select(&selector).next());

        let parts: Vec<&str> = match body {
            Some(element) => element.text().collect(),
            None => document.root_element().text().collect(),
        };

        parts
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn read_document(&self, root: &Path, path: &Path) -> Result<SourceText> {
        let size = tokio::fs::metadata(path).await?.len();
        if size > self.max_file_size {
            return Err(Error::DocumentSource(format!(
                "{} is {} bytes, over the {} byte limit",
                path.display(),
                size,
                self.max_file_size
            )));
        }

        let raw = tokio::fs::read_to_string(path).await?;
        let text = match Self::extension(path).as_deref() {
            Some("md") | Some("markdown") => Self::markdown_to_text(&raw),
            Some("html") | Some("htm") => Self::html_to_text(&raw),
            _ => raw,
        };

        Ok(SourceText {
            text,
            source: Self::source_id(root, path),
        })
    }

    async fn collect_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let root = root.to_path_buf();
        let supported = self.clone();

        tokio::task::spawn_blocking(move || {
            WalkDir::new(&root)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!(error = %e, "Skipping unreadable directory entry");
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|path| supported.supports(path))
                .collect::<Vec<PathBuf>>()
        })
        .await
        .map_err(|e| Error::DocumentSource(format!("directory walk failed: {}", e)))
    }
}

impl Default for DirectoryDocumentSource {
    fn default() -> Self {
        Self::new(50 * 1024 * 1024)
    }
}

#[async_trait]
impl DocumentSource for DirectoryDocumentSource {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn process(&self, path: &Path) -> Result<Vec<SourceText>> {
        if !path.exists() {
            return Err(Error::DocumentSource(format!(
                "{} does not exist",
                path.display()
            )));
        }

        let root = if path.is_dir() {
            path.to_path_buf()
        } else {
            path.parent().map(Path::to_path_buf).unwrap_or_default()
        };
        let files = self.collect_files(path).await?;

        let mut documents = Vec::with_capacity(files.len());
        for file in &files {
            match self.read_document(&root, file).await {
                Ok(document) => {
                    info!(source = %document.source, chars = document.text.len(), "Extracted document");
                    documents.push(document);
                }
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "Skipping document");
                }
            }
        }

        info!(files = files.len(), extracted = documents.len(), "Document scan complete");
        Ok(documents)
    }

    fn supports(&self, path: &Path) -> bool {
        Self::extension(path)
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }
}
