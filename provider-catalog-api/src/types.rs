//! Response envelopes of the catalog backend.
//!
//! Every list-shaped field defaults to empty so a partial body still decodes.

use core_catalog::{RawVideoRecord, ZoneStats};
use serde::Deserialize;

/// `GET /api/dates`
#[derive(Debug, Default, Deserialize)]
pub struct DatesResponse {
    #[serde(default)]
    pub dates: Vec<String>,
}

/// `GET /api/videos`
#[derive(Debug, Default, Deserialize)]
pub struct VideosResponse {
    #[serde(default)]
    pub videos: Vec<RawVideoRecord>,

    /// Server-side count; the client counts the list itself.
    #[serde(default)]
    pub total: Option<u64>,
}

/// `GET /api/zone/stats`
#[derive(Debug, Default, Deserialize)]
pub struct ZoneStatsResponse {
    #[serde(default)]
    pub zone_stats: ZoneStats,
}

/// `POST /api/crawl/start`
#[derive(Debug, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_videos_response_tolerates_missing_fields() {
        let response: VideosResponse = serde_json::from_str("{}").unwrap();
        assert!(response.videos.is_empty());
        assert_eq!(response.total, None);
    }

    #[test]
    fn test_zone_stats_response() {
        let response: ZoneStatsResponse =
            serde_json::from_str(r#"{"zone_stats": {"2060": 12, "1005": 3}}"#).unwrap();
        assert_eq!(response.zone_stats.get("2060"), Some(&12));
        assert_eq!(response.zone_stats.len(), 2);
    }
}
