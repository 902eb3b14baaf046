//! Shared data model for the engine: marketplace items, snapshots, and
//! opportunities. Plain serde structs, mirroring the teacher's
//! `strategy/types.rs` shape (data carriers with no behavior beyond small
//! constructors), grounded in turn on `original_source/models.py`'s
//! `SkinItem`/`PriceDiffItem`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    A,
    B,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::A => "A",
            Platform::B => "B",
        }
    }
}

/// A marketplace listing row as received from one platform.
///
/// `canonical_name` is the only cross-platform join key (spec invariant);
/// `display_name` is advisory and must never be used for matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub platform: Platform,
    pub platform_id: String,
    pub display_name: String,
    pub canonical_name: String,
    pub price: f64,
    pub listing_count: u64,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub captured_at: i64,
}

/// Echo of the generator config that produced a `Snapshot`, persisted
/// alongside it so a reader can tell how complete the crawl was.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub platform: Platform,
    pub total_count: usize,
    pub generated_at: i64,
    pub page_size: u32,
    pub max_pages: u32,
}

/// The full inventory of one platform at one instant. Immutable once
/// written; replacement is by whole-file overwrite (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub metadata: SnapshotMetadata,
    pub items: Vec<Item>,
}

impl Snapshot {
    pub fn new(platform: Platform, page_size: u32, max_pages: u32, items: Vec<Item>, generated_at: i64) -> Self {
        let total_count = items.len();
        Self {
            metadata: SnapshotMetadata {
                platform,
                total_count,
                generated_at,
                page_size,
                max_pages,
            },
            items,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    Exact,
    Normalized,
}

/// A matched cross-platform pair that has survived the active filter
/// window (§4.5). `diff`/`profit_rate` are derived, not independently
/// stored fields a caller could desync from `price_a`/`price_b`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub canonical_name: String,
    pub display_name: String,
    pub price_a: f64,
    pub price_b: f64,
    pub listing_count_a: u64,
    pub match_kind: MatchKind,
    pub source_url_a: Option<String>,
    pub source_url_b: Option<String>,
    pub category: Option<String>,
    pub last_updated: i64,
}

impl Opportunity {
    pub fn diff(&self) -> f64 {
        self.price_b - self.price_a
    }

    pub fn profit_rate(&self) -> f64 {
        if self.price_a > 0.0 {
            self.diff() / self.price_a * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityListMetadata {
    pub total_count: usize,
    pub generated_at: i64,
    pub filter_config: crate::engine::settings::Settings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityList {
    pub metadata: OpportunityListMetadata,
    pub items: Vec<Opportunity>,
}
