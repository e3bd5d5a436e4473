//! Plain-text document loading.
//!
//! Pages are separated by form feeds (`\x0c`), the page break emitted by
//! common text extractors such as `pdftotext`. Files without form feeds are
//! a single page.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::traits::DocumentLoader;
use crate::types::PageText;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];
const PAGE_BREAK: char = '\x0c';

#[derive(Debug, Default, Clone, Copy)]
pub struct TextLoader;

impl TextLoader {
    pub fn new() -> Self {
        Self
    }

    fn read_file_content(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path).map_err(|e| Error::storage(path, e))?;
        match String::from_utf8(bytes) {
            Ok(content) => Ok(content),
            Err(e) => Ok(String::from_utf8_lossy(e.as_bytes()).into_owned()),
        }
    }
}

impl DocumentLoader for TextLoader {
    fn load(&self, path: &Path) -> Result<Vec<PageText>> {
        if !path.is_file() {
            return Err(Error::DocumentNotFound(path.to_path_buf()));
        }
        if !is_supported(path) {
            return Err(Error::UnsupportedDocument(path.to_path_buf()));
        }
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content = self.read_file_content(path)?;

        let mut pages = Vec::new();
        let mut page_count = 0u32;
        for (i, raw) in content.split(PAGE_BREAK).enumerate() {
            let page_num = u32::try_from(i + 1).unwrap_or(u32::MAX);
            page_count = page_num;
            let text = raw.trim();
            if text.is_empty() {
                warn!(source = %source, page = page_num, "page has no extractable text");
                continue;
            }
            pages.push(PageText::new(text, source.clone(), page_num));
        }

        info!(source = %source, pages = page_count, with_text = pages.len(), "loaded document");
        Ok(pages)
    }
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

/// All supported documents under `root`, sorted by path.
pub fn collect_documents(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_supported(p))
        .collect();
    files.sort();
    files
}
