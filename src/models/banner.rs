//! Banner models: stored records, request payloads and query parameters.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Set of tag identifiers a banner is addressed by.
///
/// Ordered so that equality is exact-set equality and the canonical key
/// used by the storage uniqueness constraint is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeSet<i64>);

impl TagSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }

    /// Canonical comma-separated rendering, ascending.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Parse a key produced by [`TagSet::key`].
    pub fn from_key(key: &str) -> Result<Self, AppError> {
        if key.is_empty() {
            return Ok(Self::default());
        }
        key.split(',')
            .map(|part| {
                part.parse::<i64>()
                    .map_err(|e| AppError::Storage(format!("Corrupt tag key '{}': {}", key, e)))
            })
            .collect()
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for tag in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{}", tag)?;
            first = false;
        }
        Ok(())
    }
}

impl FromIterator<i64> for TagSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Displayable content of a banner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub url: String,
}

/// A stored banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub banner_id: i64,
    pub tag_ids: TagSet,
    pub feature_id: i64,
    pub content: Content,
    pub is_active: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// A validated banner that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBanner {
    pub tag_ids: TagSet,
    pub feature_id: i64,
    pub content: Content,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating a banner.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBannerRequest {
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    #[serde(default)]
    pub feature_id: i64,
    #[serde(default)]
    pub content: Content,
    #[serde(default)]
    pub is_active: bool,
}

impl CreateBannerRequest {
    /// Validate the request and stamp it with its creation time.
    pub fn into_new_banner(self, created_at: DateTime<Utc>) -> Result<NewBanner, AppError> {
        if self.tag_ids.is_empty() {
            return Err(AppError::Validation("tag_ids is required".to_string()));
        }
        validate_ids(&self.tag_ids)?;
        if self.feature_id == 0 {
            return Err(AppError::Validation("feature_id is required".to_string()));
        }
        validate_ids(&[self.feature_id])?;
        for (field, value) in [
            ("content.title", &self.content.title),
            ("content.text", &self.content.text),
            ("content.url", &self.content.url),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{} is required", field)));
            }
        }

        Ok(NewBanner {
            tag_ids: self.tag_ids.into_iter().collect(),
            feature_id: self.feature_id,
            content: self.content,
            is_active: self.is_active,
            created_at,
        })
    }
}

/// Sparse update payload. Empty and zero values mean "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BannerPatch {
    #[serde(default)]
    pub tag_ids: TagSet,
    #[serde(default)]
    pub feature_id: i64,
    #[serde(default)]
    pub content: Content,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl BannerPatch {
    pub fn validate(&self) -> Result<(), AppError> {
        let tags: Vec<i64> = self.tag_ids.iter().collect();
        validate_ids(&tags)?;
        validate_ids(&[self.feature_id])
    }
}

/// Query parameters of the single-banner lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct UserBannerQuery {
    pub tag_id: i64,
    pub feature_id: i64,
    /// Accepted for compatibility; resolution always reads the store.
    #[serde(default)]
    pub use_last_revision: bool,
}

/// Default page size of banner listings.
pub const DEFAULT_LIST_LIMIT: i64 = 20;
/// Largest page size a caller may request.
pub const MAX_LIST_LIMIT: i64 = 100;

/// Query parameters of the banner listing.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterQuery {
    #[serde(default)]
    pub tag_id: Option<i64>,
    #[serde(default)]
    pub feature_id: Option<i64>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIST_LIMIT
}

impl Default for FilterQuery {
    fn default() -> Self {
        Self {
            tag_id: None,
            feature_id: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl FilterQuery {
    /// Reject negative paging and clamp the limit.
    pub fn normalized(self) -> Result<Self, AppError> {
        if self.limit < 0 || self.offset < 0 {
            return Err(AppError::Validation(
                "limit and offset must not be negative".to_string(),
            ));
        }
        Ok(Self {
            limit: self.limit.min(MAX_LIST_LIMIT),
            ..self
        })
    }
}

fn validate_ids(ids: &[i64]) -> Result<(), AppError> {
    if ids.iter().any(|id| *id < 0) {
        return Err(AppError::Validation(
            "tag and feature ids must not be negative".to_string(),
        ));
    }
    Ok(())
}

/// Current time truncated to the stored millisecond precision.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Serde helpers rendering timestamps as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
