//! Natural ordering of a batch by the number embedded in each filename.
//!
//! Scanned exam pages arrive as `1.jpg`, `2.jpg`, …, `10.jpg`; a lexical sort
//! would put `10.jpg` before `2.jpg`. The first run of ASCII digits in the
//! filename is used as the key instead. Files without digits go last, and the
//! sort is stable so equal keys keep their upload order.

use crate::pipeline::input::UploadedItem;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+").expect("digit-run regex is valid"));

/// Label shown for files without a digit run.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Sort key derived from a filename.
///
/// Variant order matters: every `Numbered` key compares less than
/// `Unnumbered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SortKey {
    /// Value of the first digit run, saturating at `u64::MAX`.
    Numbered(u64),
    /// No digits in the filename.
    Unnumbered,
}

/// One line of the processing plan shown before extraction starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// 1-based position in processing order.
    pub position: usize,
    pub filename: String,
    pub label: String,
}

fn first_digit_run(filename: &str) -> Option<&str> {
    DIGIT_RUN.find(filename).map(|m| m.as_str())
}

/// Derive the sort key for `filename`. Never fails.
pub fn sort_key(filename: &str) -> SortKey {
    match first_digit_run(filename) {
        // The only parse failure for an all-digit string is overflow.
        Some(run) => SortKey::Numbered(run.parse().unwrap_or(u64::MAX)),
        None => SortKey::Unnumbered,
    }
}

/// Presentation label: `Q` followed by the digit run as written, or
/// [`UNKNOWN_LABEL`].
pub fn label(filename: &str) -> String {
    match first_digit_run(filename) {
        Some(run) => format!("Q{run}"),
        None => UNKNOWN_LABEL.to_string(),
    }
}

/// Return the batch sorted by [`sort_key`], preserving input order on ties.
pub fn order_batch(mut items: Vec<UploadedItem>) -> Vec<UploadedItem> {
    // `sort_by_cached_key` is a stable sort.
    items.sort_by_cached_key(|item| sort_key(&item.filename));
    items
}

/// Describe the processing order of an already ordered batch.
pub fn plan(items: &[UploadedItem]) -> Vec<PlanEntry> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| PlanEntry {
            position: i + 1,
            filename: item.filename.clone(),
            label: label(&item.filename),
        })
        .collect()
}
