//! Catalog query types and the local half of the query pipeline.
//!
//! The server filters by date/zone and sorts; everything in this module runs
//! on the already-sorted day's catalog and never reorders it.

use crate::gateway::VideoListRequest;
use crate::models::VideoRecord;
use crate::pagination::Page;
use crate::zones::ZoneId;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_PAGE_SIZE: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    ViewCount,
    OnlineCount,
    MaxOnlineCount,
    Title,
}

impl SortField {
    /// Wire value of the `sort_by` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::ViewCount => "view_count",
            SortField::OnlineCount => "online_count",
            SortField::MaxOnlineCount => "max_online_count",
            SortField::Title => "title",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the user can change about the catalog view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilter {
    pub date: String,
    pub sort_by: SortField,
    pub order: SortOrder,
    pub main_zone: Option<ZoneId>,
    pub sub_zone: Option<ZoneId>,
    /// Free-text title search; blank means no search.
    pub search: String,
    /// 1-based
    pub page: u32,
    pub page_size: u32,
}

impl QueryFilter {
    /// Page 1 of `date`, most viewed first, no zone, no search.
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            sort_by: SortField::default(),
            order: SortOrder::default(),
            main_zone: None,
            sub_zone: None,
            search: String::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_sort(mut self, sort_by: SortField, order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.order = order;
        self
    }

    pub fn with_zone(mut self, main_zone: Option<ZoneId>, sub_zone: Option<ZoneId>) -> Self {
        self.main_zone = main_zone;
        self.sub_zone = sub_zone;
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// The trimmed search term, if any.
    pub fn search_term(&self) -> Option<&str> {
        let term = self.search.trim();
        (!term.is_empty()).then_some(term)
    }

    /// The server-side part of this filter.
    pub fn list_request(&self) -> VideoListRequest {
        VideoListRequest {
            date: Some(self.date.clone()).filter(|d| !d.is_empty()),
            sort_by: self.sort_by,
            order: self.order,
            main_zone: self.main_zone,
            sub_zone: self.sub_zone,
        }
    }
}

/// One page of the filtered catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub items: Vec<VideoRecord>,
    /// Matches before pagination.
    pub total_count: usize,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn into_page(self, filter: &QueryFilter) -> Page<VideoRecord> {
        Page::new(
            self.items,
            self.total_count as u64,
            filter.page,
            filter.page_size,
        )
    }
}

/// Keeps records whose title contains `term`, ignoring case.
pub fn filter_by_search(records: Vec<VideoRecord>, term: Option<&str>) -> Vec<VideoRecord> {
    match term {
        None => records,
        Some(term) => {
            let needle = term.to_lowercase();
            records
                .into_iter()
                .filter(|record| record.title.to_lowercase().contains(&needle))
                .collect()
        }
    }
}

/// Window `[(page-1)*size, page*size)`. Out-of-range pages are empty.
pub fn page_slice(records: Vec<VideoRecord>, page: u32, page_size: u32) -> Vec<VideoRecord> {
    if page == 0 || page_size == 0 {
        return Vec::new();
    }
    let start = (page as usize - 1).saturating_mul(page_size as usize);
    records
        .into_iter()
        .skip(start)
        .take(page_size as usize)
        .collect()
}

/// Search, count, slice.
pub fn apply_filter(records: Vec<VideoRecord>, filter: &QueryFilter) -> QueryResult {
    let matching = filter_by_search(records, filter.search_term());
    let total_count = matching.len();
    QueryResult {
        items: page_slice(matching, filter.page, filter.page_size),
        total_count,
    }
}

/// Headline numbers for a set of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub total: usize,
    pub total_views: u64,
    /// Integer mean, 0 for an empty set.
    pub average_views: u64,
    /// Most viewed record; the earliest one wins a tie.
    pub top_video: Option<VideoRecord>,
}

pub fn summarize(records: &[VideoRecord]) -> CatalogSummary {
    let total_views: u64 = records.iter().map(|r| r.view_count).sum();
    let top_video = records
        .iter()
        .fold(None::<&VideoRecord>, |best, record| match best {
            Some(b) if b.view_count >= record.view_count => Some(b),
            _ => Some(record),
        })
        .cloned();

    CatalogSummary {
        total: records.len(),
        total_views,
        average_views: if records.is_empty() {
            0
        } else {
            total_views / records.len() as u64
        },
        top_video,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawVideoRecord;

    fn record(n: usize, title: &str, views: u64) -> VideoRecord {
        RawVideoRecord {
            bvid: Some(format!("BV{n:04}")),
            title: Some(title.to_string()),
            view_count: Some(views),
            ..Default::default()
        }
        .into()
    }

    fn catalog(len: usize) -> Vec<VideoRecord> {
        (0..len)
            .map(|n| record(n, &format!("video {n}"), 1000 - n as u64))
            .collect()
    }

    #[test]
    fn test_pagination_of_37_records() {
        let filter = |page| QueryFilter::new("2025-08-13").with_page(page, 15);

        let sizes: Vec<usize> = (1..=4)
            .map(|page| apply_filter(catalog(37), &filter(page)).items.len())
            .collect();
        assert_eq!(sizes, vec![15, 15, 7, 0]);

        let result = apply_filter(catalog(37), &filter(3));
        assert_eq!(result.total_count, 37);
        assert_eq!(result.items[0].bvid.as_deref(), Some("BV0030"));
        assert_eq!(result.into_page(&filter(3)).total_pages, 3);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let records = vec![
            record(1, "XabcY", 1),
            record(2, "ABC123", 2),
            record(3, "nothing", 3),
        ];

        let hits = filter_by_search(records, Some("abc"));
        let titles: Vec<&str> = hits.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["XabcY", "ABC123"]);
    }

    #[test]
    fn test_blank_search_keeps_everything_in_order() {
        let filter = QueryFilter::new("2025-08-13").with_search("   ");
        assert_eq!(filter.search_term(), None);

        let result = apply_filter(catalog(5), &filter);
        assert_eq!(result.total_count, 5);
        let views: Vec<u64> = result.items.iter().map(|r| r.view_count).collect();
        assert_eq!(views, vec![1000, 999, 998, 997, 996]);
    }

    #[test]
    fn test_search_term_is_trimmed() {
        let filter = QueryFilter::new("d").with_search("  魔理沙 ");
        assert_eq!(filter.search_term(), Some("魔理沙"));
    }

    #[test]
    fn test_page_zero_is_empty() {
        assert!(page_slice(catalog(3), 0, 15).is_empty());
    }

    #[test]
    fn test_list_request_carries_server_side_fields() {
        let filter = QueryFilter::new("2025-08-13")
            .with_sort(SortField::Title, SortOrder::Asc)
            .with_zone(Some(1007), Some(2060))
            .with_search("ignored by server");

        let request = filter.list_request();
        assert_eq!(request.date.as_deref(), Some("2025-08-13"));
        assert_eq!(request.sort_by, SortField::Title);
        assert_eq!(request.order, SortOrder::Asc);
        assert_eq!(request.main_zone, Some(1007));
        assert_eq!(request.sub_zone, Some(2060));
    }

    #[test]
    fn test_sort_wire_values() {
        assert_eq!(SortField::MaxOnlineCount.to_string(), "max_online_count");
        assert_eq!(SortOrder::Desc.to_string(), "desc");
        assert_eq!(
            serde_json::to_string(&SortField::OnlineCount).unwrap(),
            "\"online_count\""
        );
    }

    #[test]
    fn test_summarize() {
        let records = vec![record(1, "a", 10), record(2, "b", 30), record(3, "c", 30)];
        let summary = summarize(&records);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.total_views, 70);
        assert_eq!(summary.average_views, 23);
        assert_eq!(summary.top_video.unwrap().bvid.as_deref(), Some("BV0002"));

        assert_eq!(summarize(&[]), CatalogSummary::default());
    }
}
