//! # Zone Taxonomy
//!
//! Two-level topic taxonomy (main zone → sub-zones) flattened into an index
//! with O(1) lookup by id.
//!
//! The index is built once from a [`ZoneDefinition`] and never mutated. It is
//! handed to consumers explicitly; there is no process-wide instance.
//!
//! Lookups never fail. The remote catalog may reference ids that were retired
//! from the definition, so every query returns `Option`, an empty list or an
//! empty string for unknown ids.
//!
//! ```
//! use core_catalog::zones::{ZoneDefinition, ZoneTaxonomyIndex};
//!
//! let definition = ZoneDefinition::from_json(
//!     r#"{"1007": {"name": "鬼畜", "children": {"2060": "音MAD"}}}"#,
//! ).unwrap();
//! let index = ZoneTaxonomyIndex::build(&definition);
//!
//! assert_eq!(index.path(2060), "鬼畜 > 音MAD");
//! assert_eq!(index.resolve_main_zone(2060).unwrap().id, 1007);
//! ```

use crate::error::{CatalogError, Result};
use crate::models::{VideoDetail, ZoneStats};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};

/// `tid_v2` zone identifier.
pub type ZoneId = u32;

const BUILTIN_DEFINITION: &str = include_str!("../data/zones_v2.json");
const DEFINITION_WRAPPER_KEY: &str = "bilibiliZonesV2";

/// One main zone in the static definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainZoneDef {
    pub name: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub children: BTreeMap<ZoneId, String>,
}

/// The nested, static zone definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneDefinition {
    pub main_zones: BTreeMap<ZoneId, MainZoneDef>,
}

impl ZoneDefinition {
    /// Parses a definition document.
    ///
    /// Accepts `{"bilibiliZonesV2": {...}}` or the bare id → zone map.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut document: Value = serde_json::from_str(json)
            .map_err(|e| CatalogError::InvalidDefinition(e.to_string()))?;

        let zones = match document.get_mut(DEFINITION_WRAPPER_KEY) {
            Some(inner) => inner.take(),
            None => document,
        };

        serde_json::from_value(zones).map_err(|e| CatalogError::InvalidDefinition(e.to_string()))
    }

    /// Reads and parses a definition file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::InvalidDefinition(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// The definition bundled with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_DEFINITION)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Main,
    Sub,
}

/// Id + name pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneRef {
    pub id: ZoneId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatZoneEntry {
    pub id: ZoneId,
    pub name: String,
    pub kind: ZoneKind,
    /// Owning main zone; `None` for main entries.
    pub parent: Option<ZoneRef>,
    /// Only meaningful for main entries.
    pub hidden: bool,
}

impl FlatZoneEntry {
    pub fn is_main(&self) -> bool {
        self.kind == ZoneKind::Main
    }

    fn zone_ref(&self) -> ZoneRef {
        ZoneRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Zone information derived for a video detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSummary {
    pub zone_id: Option<ZoneId>,
    pub zone_name: Option<String>,
    pub zone_path: Option<String>,
    pub main_zone: Option<ZoneRef>,
    pub copyright: Option<u8>,
    pub copyright_name: Option<String>,
}

/// Video counts rolled up per main zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneAggregate {
    pub by_main_zone: BTreeMap<ZoneId, u64>,
    /// Counts under ids that are absent from the definition or not numeric.
    pub unclassified: u64,
}

impl ZoneAggregate {
    pub fn total(&self) -> u64 {
        self.by_main_zone.values().sum::<u64>() + self.unclassified
    }
}

/// Display name of a copyright code.
pub fn copyright_name(code: u8) -> &'static str {
    match code {
        1 => "原创",
        2 => "转载",
        _ => "未知",
    }
}

/// Flattened, immutable zone index.
#[derive(Debug, Clone, Default)]
pub struct ZoneTaxonomyIndex {
    entries: Vec<FlatZoneEntry>,
    by_id: HashMap<ZoneId, usize>,
    children: HashMap<ZoneId, Vec<usize>>,
}

impl ZoneTaxonomyIndex {
    /// Flattens a definition in a single pass: each main zone, then its subs.
    ///
    /// Ids must be unique across main and sub zones. On a collision the first
    /// entry wins and the duplicate is logged and dropped.
    pub fn build(definition: &ZoneDefinition) -> Self {
        let mut index = Self::default();

        for (&main_id, main) in &definition.main_zones {
            let main_entry = FlatZoneEntry {
                id: main_id,
                name: main.name.clone(),
                kind: ZoneKind::Main,
                parent: None,
                hidden: main.hidden,
            };
            let owner = main_entry.zone_ref();
            if !index.insert(main_entry) {
                continue;
            }

            let mut child_slots = Vec::with_capacity(main.children.len());
            for (&sub_id, sub_name) in &main.children {
                let sub_entry = FlatZoneEntry {
                    id: sub_id,
                    name: sub_name.clone(),
                    kind: ZoneKind::Sub,
                    parent: Some(owner.clone()),
                    hidden: false,
                };
                if index.insert(sub_entry) {
                    child_slots.push(index.entries.len() - 1);
                }
            }
            index.children.insert(main_id, child_slots);
        }

        debug!(zones = index.entries.len(), "Built zone taxonomy index");
        index
    }

    /// Index over the bundled definition.
    pub fn builtin() -> Result<Self> {
        Ok(Self::build(&ZoneDefinition::builtin()?))
    }

    fn insert(&mut self, entry: FlatZoneEntry) -> bool {
        if let Some(&existing) = self.by_id.get(&entry.id) {
            warn!(
                zone_id = entry.id,
                kept = %self.entries[existing].name,
                dropped = %entry.name,
                "Duplicate zone id in definition"
            );
            return false;
        }
        self.by_id.insert(entry.id, self.entries.len());
        self.entries.push(entry);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in build order.
    pub fn entries(&self) -> &[FlatZoneEntry] {
        &self.entries
    }

    pub fn zone_info(&self, id: ZoneId) -> Option<&FlatZoneEntry> {
        self.by_id.get(&id).map(|&slot| &self.entries[slot])
    }

    pub fn is_valid_zone(&self, id: ZoneId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn resolve_name(&self, id: ZoneId) -> Option<&str> {
        self.zone_info(id).map(|entry| entry.name.as_str())
    }

    /// The zone itself for a main id, its owner for a sub id.
    pub fn resolve_main_zone(&self, id: ZoneId) -> Option<ZoneRef> {
        self.zone_info(id)
            .map(|entry| entry.parent.clone().unwrap_or_else(|| entry.zone_ref()))
    }

    /// Main zones sorted by display name (ties by id).
    pub fn list_main_zones(&self, include_hidden: bool) -> Vec<&FlatZoneEntry> {
        let mut zones: Vec<&FlatZoneEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.is_main() && (include_hidden || !entry.hidden))
            .collect();
        sort_by_name(&mut zones);
        zones
    }

    /// Sub-zones of `main_id` sorted by display name. Empty for unknown ids.
    pub fn list_sub_zones(&self, main_id: ZoneId) -> Vec<&FlatZoneEntry> {
        let mut zones: Vec<&FlatZoneEntry> = self
            .children
            .get(&main_id)
            .map(|slots| slots.iter().map(|&slot| &self.entries[slot]).collect())
            .unwrap_or_default();
        sort_by_name(&mut zones);
        zones
    }

    /// Case-sensitive substring search over names. Main zones first, then by id.
    pub fn search(&self, keyword: &str) -> Vec<&FlatZoneEntry> {
        if keyword.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<&FlatZoneEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.name.contains(keyword))
            .collect();
        hits.sort_by_key(|entry| (!entry.is_main(), entry.id));
        hits
    }

    /// `"Main"` or `"Main > Sub"`; empty for unknown ids.
    pub fn path(&self, id: ZoneId) -> String {
        match self.zone_info(id) {
            None => String::new(),
            Some(entry) => match &entry.parent {
                None => entry.name.clone(),
                Some(parent) => format!("{} > {}", parent.name, entry.name),
            },
        }
    }

    pub fn describe_detail(&self, detail: &VideoDetail) -> ZoneSummary {
        let zone_id = detail.tid_v2.filter(|id| *id != 0);
        let copyright = detail.copyright.filter(|code| *code != 0);

        ZoneSummary {
            zone_id,
            zone_name: zone_id.and_then(|id| self.resolve_name(id).map(str::to_string)),
            zone_path: zone_id.map(|id| self.path(id)),
            main_zone: zone_id.and_then(|id| self.resolve_main_zone(id)),
            copyright,
            copyright_name: copyright.map(|code| copyright_name(code).to_string()),
        }
    }

    /// Rolls per-zone counts up into their main zones.
    ///
    /// Every key contributes exactly once: a sub id to its owner, a main id to
    /// itself. Keys that don't parse or aren't in the index land in
    /// `unclassified`.
    pub fn aggregate_by_main_zone(&self, stats: &ZoneStats) -> ZoneAggregate {
        let mut aggregate = ZoneAggregate::default();

        for (key, &count) in stats {
            let owner = key
                .trim()
                .parse::<ZoneId>()
                .ok()
                .and_then(|id| self.resolve_main_zone(id));

            match owner {
                Some(main) => *aggregate.by_main_zone.entry(main.id).or_insert(0) += count,
                None => aggregate.unclassified += count,
            }
        }

        aggregate
    }
}

fn sort_by_name(zones: &mut [&FlatZoneEntry]) {
    zones.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
}
