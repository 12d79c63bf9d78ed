//! Per-session command history.
//!
//! Entries carry a sequence number that is assigned once and never reused,
//! so recall by number (`!12`) cannot silently hit a different line after
//! older entries have been evicted.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::Serialize;

/// One submitted line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub sequence: u64,
    pub text: String,
    pub timestamp: DateTime<Local>,
    pub success: bool,
    /// Working directory when the line was submitted.
    pub cwd: Option<String>,
}

/// Bounded, append-only log of submitted lines.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    next_seq: u64,
    max_len: usize,
}

impl History {
    /// An empty history keeping at most `max_len` entries (minimum 1).
    pub fn new(max_len: usize) -> Self {
        let max_len = max_len.max(1);
        Self {
            entries: VecDeque::with_capacity(max_len.min(64)),
            next_seq: 1,
            max_len,
        }
    }

    /// Append a line and return its sequence number.
    pub fn append(&mut self, text: &str) -> u64 {
        self.push(text, true, None)
    }

    /// Append a line with its outcome and working directory.
    pub fn push(&mut self, text: &str, success: bool, cwd: Option<String>) -> u64 {
        let sequence = self.next_seq;
        self.next_seq += 1;
        self.entries.push_back(HistoryEntry {
            sequence,
            text: text.to_string(),
            timestamp: Local::now(),
            success,
            cwd,
        });
        while self.entries.len() > self.max_len {
            self.entries.pop_front();
        }
        sequence
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&HistoryEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).collect()
    }

    /// Entries whose text contains `needle`, oldest first.
    pub fn search(&self, needle: &str) -> Vec<&HistoryEntry> {
        self.entries
            .iter()
            .filter(|e| e.text.contains(needle))
            .collect()
    }

    /// Entry with the given sequence number, if still retained.
    pub fn at(&self, sequence: u64) -> Option<&HistoryEntry> {
        self.entries
            .binary_search_by_key(&sequence, |e| e.sequence)
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Drop all entries. Numbering continues where it left off.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }
}
