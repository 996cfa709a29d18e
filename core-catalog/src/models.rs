//! Catalog data model.
//!
//! Records arrive from the backend with any field possibly missing, null, or
//! typed inconsistently (`online_count` is sometimes a string). They are
//! deserialized into [`RawVideoRecord`] and normalized exactly once into
//! [`VideoRecord`]; nothing downstream re-applies defaults.

use crate::error::{CatalogError, Result};
use crate::zones::ZoneId;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Title used when the source omits one.
pub const UNTITLED: &str = "无标题";

/// Crawl date used when the source omits one.
pub const UNKNOWN_DATE: &str = "未知";

/// Canonical way to address a single video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoRef {
    Bvid(String),
    Aid(u64),
}

impl fmt::Display for VideoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoRef::Bvid(bvid) => write!(f, "{}", bvid),
            VideoRef::Aid(aid) => write!(f, "av{}", aid),
        }
    }
}

/// A list entry exactly as the backend sent it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVideoRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bvid: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub aid: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub cid: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pic: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub view_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub online_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub max_online_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub max_online_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub crawl_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub crawl_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub tid_v2: Option<u64>,
}

/// A normalized catalog entry.
///
/// | field              | default when absent           |
/// |--------------------|-------------------------------|
/// | `id`               | bvid, then aid, then a UUID   |
/// | `title`            | `"无标题"`                     |
/// | `pic`, `crawl_time`| `""`                          |
/// | `crawl_date`       | `"未知"`                       |
/// | counts, `cid`      | `0`                           |
/// | `bvid`, `aid`, `max_online_time`, `zone_id` | absent |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub bvid: Option<String>,
    pub aid: Option<u64>,
    pub cid: u64,
    pub title: String,
    /// Thumbnail URL
    pub pic: String,
    pub view_count: u64,
    pub online_count: u64,
    pub max_online_count: u64,
    pub max_online_time: Option<String>,
    /// `tid_v2` of the video, if classified
    pub zone_id: Option<ZoneId>,
    pub crawl_date: String,
    pub crawl_time: String,
}

impl VideoRecord {
    /// `bvid` is preferred over `aid`.
    pub fn video_ref(&self) -> Option<VideoRef> {
        match (&self.bvid, self.aid) {
            (Some(bvid), _) => Some(VideoRef::Bvid(bvid.clone())),
            (None, Some(aid)) => Some(VideoRef::Aid(aid)),
            (None, None) => None,
        }
    }

    /// Title for progress messages; falls back to the bvid for untitled records.
    pub fn display_name(&self) -> &str {
        if self.title == UNTITLED {
            if let Some(bvid) = self.bvid.as_deref() {
                return bvid;
            }
        }
        &self.title
    }
}

impl From<RawVideoRecord> for VideoRecord {
    fn from(raw: RawVideoRecord) -> Self {
        let aid = raw.aid.filter(|aid| *aid != 0);
        let id = raw
            .id
            .or_else(|| raw.bvid.clone())
            .or_else(|| aid.map(|aid| aid.to_string()))
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self {
            id,
            bvid: raw.bvid,
            aid,
            cid: raw.cid.unwrap_or(0),
            title: raw.title.unwrap_or_else(|| UNTITLED.to_string()),
            pic: raw.pic.unwrap_or_default(),
            view_count: raw.view_count.unwrap_or(0),
            online_count: raw.online_count.unwrap_or(0),
            max_online_count: raw.max_online_count.unwrap_or(0),
            max_online_time: raw.max_online_time,
            zone_id: raw
                .tid_v2
                .filter(|tid| *tid != 0)
                .and_then(|tid| ZoneId::try_from(tid).ok()),
            crawl_date: raw.crawl_date.unwrap_or_else(|| UNKNOWN_DATE.to_string()),
            crawl_time: raw.crawl_time.unwrap_or_default(),
        }
    }
}

/// Normalizes a batch of raw records.
pub fn normalize_records(raw: Vec<RawVideoRecord>) -> Vec<VideoRecord> {
    raw.into_iter().map(VideoRecord::from).collect()
}

/// Identifies a video for a detail lookup. At least one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoLookup {
    pub bvid: Option<String>,
    pub aid: Option<u64>,
}

impl VideoLookup {
    pub fn by_bvid(bvid: impl Into<String>) -> Self {
        Self {
            bvid: Some(bvid.into()),
            aid: None,
        }
    }

    pub fn by_aid(aid: u64) -> Self {
        Self {
            bvid: None,
            aid: Some(aid),
        }
    }

    /// Rejects lookups that carry neither a non-blank bvid nor a non-zero aid.
    pub fn validate(&self) -> Result<()> {
        let has_bvid = self
            .bvid
            .as_deref()
            .map(|b| !b.trim().is_empty())
            .unwrap_or(false);
        let has_aid = self.aid.map(|a| a != 0).unwrap_or(false);

        if has_bvid || has_aid {
            Ok(())
        } else {
            Err(CatalogError::Validation(
                "bvid或aid至少需要提供一个".to_string(),
            ))
        }
    }
}

/// Full detail record for one video. Fields the core does not interpret are
/// kept in `extra` for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoDetail {
    #[serde(default)]
    pub bvid: Option<String>,
    #[serde(default)]
    pub aid: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub pic: Option<String>,
    #[serde(default)]
    pub tid_v2: Option<ZoneId>,
    #[serde(default)]
    pub tname_v2: Option<String>,
    /// 1 = original, 2 = repost
    #[serde(default)]
    pub copyright: Option<u8>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of a single detail update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailUpdate {
    /// The server decided no update was necessary.
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Backend crawler status. Only `is_crawling` is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlStatus {
    #[serde(default)]
    pub is_crawling: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CrawlStatus {
    pub fn idle() -> Self {
        Self::default()
    }
}

/// Zone id (as sent, a string key) to video count.
pub type ZoneStats = BTreeMap<String, u64>;

/// Image bytes fetched through the backend proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

// ----------------------------------------------------------------------------
// Lenient field decoding
// ----------------------------------------------------------------------------

/// Strings pass through, numbers are stringified, empty/null become `None`.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Numbers and numeric strings are accepted. Strings use their leading digits
/// so `"1000+"` reads as 1000. Anything else becomes `None`.
fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => leading_digits(&s),
        _ => None,
    })
}

fn leading_digits(s: &str) -> Option<u64> {
    let digits: String = s
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
