//! Banned-word filter for chat messages
//!
//! Messages are lower-cased and split on whitespace and punctuation. A message is
//! blocked only when one of its tokens is exactly a listed word, so words that merely
//! contain a banned word pass through.

use log::{info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

const TOKEN_DELIMITERS: &[char] = &[
    ' ', '\t', '\n', '\r', '\x0C', ',', '.', ':', ';', '?', '!', '[', ']', '(', ')', '{', '}',
    '*', '+', '/', '=', '<', '>', '"', '\'', '-',
];

#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    words: HashSet<String>,
}

impl ContentFilter {
    /// Builds a filter from an in-memory word list
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|word| word.as_ref().trim().to_lowercase())
                .filter(|word| !word.is_empty())
                .collect(),
        }
    }

    /// Parses a newline-delimited word list
    pub fn parse(contents: &str) -> Self {
        Self::from_words(contents.lines())
    }

    /// Loads the word list from disk.
    ///
    /// A missing or unreadable file is not fatal: the server keeps running with an
    /// empty filter that allows every message.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(contents) => {
                let filter = Self::parse(&contents);
                info!(
                    "Loaded {} filter words from {}",
                    filter.len(),
                    path.display()
                );
                filter
            }
            Err(e) => {
                warn!(
                    "Could not read filter list {}: {}; all messages will be allowed",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn is_blocked(&self, text: &str) -> bool {
        if self.words.is_empty() {
            return false;
        }

        text.to_lowercase()
            .split(TOKEN_DELIMITERS)
            .filter(|token| !token.is_empty())
            .any(|token| self.words.contains(token))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
