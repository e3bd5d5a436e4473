//! Sliding-window chunking of page text into overlapping fragments.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{Fragment, PageText};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive windows of the same page.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 500, overlap: 50 }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        let config = Self { chunk_size, overlap };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be a positive integer".into()));
        }
        if self.overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "overlap must be smaller than chunk_size (overlap={}, chunk_size={})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Split pages into fragments of at most `chunk_size` characters.
///
/// Each page is covered by windows starting at character offsets
/// `0, stride, 2 * stride, ...` while the offset is inside the page. Windows
/// that are blank after trimming are dropped; kept windows retain their
/// original whitespace. Ids run from 0 across the whole call.
pub fn chunk_pages(pages: &[PageText], config: &ChunkingConfig) -> Result<Vec<Fragment>> {
    config.validate()?;
    let stride = config.stride();
    let mut fragments = Vec::new();

    for page in pages {
        // Byte offset of every char boundary, including the end of the text.
        let bounds: Vec<usize> = page
            .text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(page.text.len()))
            .collect();
        let char_len = bounds.len() - 1;

        let mut start = 0;
        while start < char_len {
            let end = (start + config.chunk_size).min(char_len);
            let window = &page.text[bounds[start]..bounds[end]];
            if !window.trim().is_empty() {
                fragments.push(Fragment {
                    id: fragments.len(),
                    text: window.to_string(),
                    source: page.source.clone(),
                    page: page.page,
                });
            }
            start += stride;
        }
    }

    debug!(
        fragments = fragments.len(),
        pages = pages.len(),
        chunk_size = config.chunk_size,
        overlap = config.overlap,
        "chunked pages"
    );
    Ok(fragments)
}
