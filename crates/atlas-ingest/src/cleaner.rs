//! Text normalisation applied before splitting.

use crate::error::{IngestError, IngestResult};
use atlas_config::IngestConfig;
use regex::Regex;

/// Line-level cleanup that keeps `\x0C` page breaks intact.
#[derive(Debug, Clone)]
pub struct DocumentCleaner {
    remove_empty_lines: bool,
    remove_extra_whitespaces: bool,
    remove_regex: Option<Regex>,
}

impl Default for DocumentCleaner {
    fn default() -> Self {
        Self {
            remove_empty_lines: true,
            remove_extra_whitespaces: true,
            remove_regex: None,
        }
    }
}

impl DocumentCleaner {
    pub fn new(
        remove_empty_lines: bool,
        remove_extra_whitespaces: bool,
        remove_regex: Option<&str>,
    ) -> IngestResult<Self> {
        let remove_regex = remove_regex
            .filter(|r| !r.is_empty())
            .map(|r| {
                Regex::new(r).map_err(|e| {
                    IngestError::InvalidConfig(format!("invalid remove_regex '{}': {}", r, e))
                })
            })
            .transpose()?;

        Ok(Self {
            remove_empty_lines,
            remove_extra_whitespaces,
            remove_regex,
        })
    }

    pub fn from_config(config: &IngestConfig) -> IngestResult<Self> {
        Self::new(
            config.remove_empty_lines,
            config.remove_extra_whitespaces,
            config.remove_regex.as_deref(),
        )
    }

    /// Clean `text` page by page.
    pub fn clean(&self, text: &str) -> String {
        let text = match &self.remove_regex {
            Some(re) => re.replace_all(text, "").into_owned(),
            None => text.to_string(),
        };

        text.split('\x0C')
            .map(|page| self.clean_page(page))
            .collect::<Vec<_>>()
            .join("\x0C")
    }

    fn clean_page(&self, page: &str) -> String {
        page.lines()
            .map(|line| {
                if self.remove_extra_whitespaces {
                    line.split_whitespace().collect::<Vec<_>>().join(" ")
                } else {
                    line.to_string()
                }
            })
            .filter(|line| !(self.remove_empty_lines && line.trim().is_empty()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
