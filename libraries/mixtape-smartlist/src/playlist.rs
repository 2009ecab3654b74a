//! Smart playlist definitions

use chrono::{DateTime, Utc};
use mixtape_core::{CatalogSnapshot, MixtapeError, Result, Track, TrackId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

use crate::criterion::{CriteriaRow, Criterion};
use crate::field::SmartField;

/// How rows combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Every row must match
    #[default]
    All,
    /// At least one row must match
    Any,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// One order-by key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderKey {
    pub field: SmartField,
    #[serde(default)]
    pub direction: SortDirection,
}

impl OrderKey {
    pub fn ascending(field: SmartField) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: SmartField) -> Self {
        Self {
            field,
            direction: SortDirection::Descending,
        }
    }
}

/// Clock used to resolve relative dates
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext {
    pub now: DateTime<Utc>,
}

impl EvaluationContext {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self { now: Utc::now() }
    }
}

/// A named, categorized rule set over the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartPlaylist {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub match_policy: MatchPolicy,
    pub rows: Vec<CriteriaRow>,
    #[serde(default)]
    pub order_by: Vec<OrderKey>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SmartPlaylist {
    pub fn new(name: impl Into<String>, category: impl Into<String>, match_policy: MatchPolicy) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            match_policy,
            rows: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Add a row holding one criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.rows.push(CriteriaRow::single(criterion));
        self
    }

    pub fn with_row(mut self, row: CriteriaRow) -> Self {
        self.rows.push(row);
        self
    }

    pub fn order_by(mut self, key: OrderKey) -> Self {
        self.order_by.push(key);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Parse and validate a stored definition
    pub fn from_json(json: &str) -> Result<Self> {
        let playlist: Self = serde_json::from_str(json)
            .map_err(|e| MixtapeError::configuration(format!("invalid smart playlist: {}", e)))?;
        playlist.validate()?;
        Ok(playlist)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Structural checks that individual criteria cannot make
    ///
    /// # Errors
    /// `Configuration` for an empty name, no rows, an empty row or a zero limit
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(MixtapeError::configuration("smart playlist name is empty"));
        }
        if self.rows.is_empty() {
            return Err(MixtapeError::configuration(format!(
                "smart playlist '{}' has no criteria",
                self.name
            )));
        }
        if let Some(index) = self.rows.iter().position(|row| row.criteria.is_empty()) {
            return Err(MixtapeError::configuration(format!(
                "smart playlist '{}' row {} has no criteria",
                self.name,
                index + 1
            )));
        }
        if self.limit == Some(0) {
            return Err(MixtapeError::configuration(format!(
                "smart playlist '{}' has a limit of zero",
                self.name
            )));
        }
        Ok(())
    }

    /// Whether a single track matches the rows under the match policy
    pub fn matches(&self, track: &Track, ctx: &EvaluationContext) -> bool {
        match self.match_policy {
            MatchPolicy::All => self.rows.iter().all(|row| row.matches(track, ctx.now)),
            MatchPolicy::Any => self.rows.iter().any(|row| row.matches(track, ctx.now)),
        }
    }

    /// Lazily iterate matching tracks in catalog order
    ///
    /// Neither ordering nor limit is applied.
    pub fn matching<'a>(
        &'a self,
        snapshot: &'a CatalogSnapshot,
        ctx: &'a EvaluationContext,
    ) -> Result<impl Iterator<Item = &'a Arc<Track>> + 'a> {
        self.validate()?;
        Ok(snapshot.iter().filter(move |track| self.matches(track, ctx)))
    }

    /// Number of matching tracks before the limit is applied
    pub fn count_matches(&self, snapshot: &CatalogSnapshot, ctx: &EvaluationContext) -> Result<usize> {
        Ok(self.matching(snapshot, ctx)?.count())
    }

    /// Ordered, limited result over a snapshot
    pub fn evaluate(&self, snapshot: &CatalogSnapshot, ctx: &EvaluationContext) -> Result<Vec<Arc<Track>>> {
        let matches = self.matching(snapshot, ctx)?;

        if self.order_by.is_empty() {
            let limit = self.limit.unwrap_or(usize::MAX);
            return Ok(matches.take(limit).cloned().collect());
        }

        let mut tracks: Vec<Arc<Track>> = matches.cloned().collect();
        tracks.sort_by(|a, b| self.compare(a, b));
        if let Some(limit) = self.limit {
            tracks.truncate(limit);
        }
        Ok(tracks)
    }

    fn compare(&self, a: &Track, b: &Track) -> Ordering {
        self.order_by
            .iter()
            .map(|key| {
                let ord = key.field.compare(a, b);
                match key.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or_else(|| a.id.cmp(&b.id))
    }
}

/// Materialized result of an evaluation
///
/// Holds ids only. Tracks removed from the catalog after materialization are
/// dropped when the contents are resolved again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistContents {
    pub name: String,
    pub track_ids: Vec<TrackId>,
    pub generated_at: DateTime<Utc>,
}

impl PlaylistContents {
    pub fn from_tracks(name: impl Into<String>, tracks: &[Arc<Track>], generated_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            track_ids: tracks.iter().map(|t| t.id.clone()).collect(),
            generated_at,
        }
    }

    /// Tracks still present in `snapshot`, in materialized order
    pub fn resolve(&self, snapshot: &CatalogSnapshot) -> Vec<Arc<Track>> {
        self.track_ids
            .iter()
            .filter_map(|id| snapshot.get(id).cloned())
            .collect()
    }

    /// Ids that no longer exist in `snapshot`
    pub fn missing(&self, snapshot: &CatalogSnapshot) -> Vec<TrackId> {
        self.track_ids
            .iter()
            .filter(|id| !snapshot.contains(id))
            .cloned()
            .collect()
    }
}
