//! Sparse-update merge of banner patches.

use chrono::{DateTime, Utc};

use crate::models::{Banner, BannerPatch};

/// Apply `patch` on top of `existing`.
///
/// A patch field overwrites only when present: a non-empty tag set, a
/// non-zero feature id, an `is_active` that differs from the stored flag,
/// and non-empty content strings. Because of this, a patch cannot clear a
/// content field to the empty string. `updated_at` is always replaced.
pub fn merge(existing: &Banner, patch: &BannerPatch, updated_at: DateTime<Utc>) -> Banner {
    let mut merged = existing.clone();

    if !patch.tag_ids.is_empty() {
        merged.tag_ids = patch.tag_ids.clone();
    }

    if patch.feature_id != 0 {
        merged.feature_id = patch.feature_id;
    }

    if let Some(is_active) = patch.is_active {
        if is_active != existing.is_active {
            merged.is_active = is_active;
        }
    }

    if !patch.content.title.is_empty() {
        merged.content.title = patch.content.title.clone();
    }
    if !patch.content.text.is_empty() {
        merged.content.text = patch.content.text.clone();
    }
    if !patch.content.url.is_empty() {
        merged.content.url = patch.content.url.clone();
    }

    merged.updated_at = updated_at;
    merged
}
