//! Tiered resolution of the four summary fields.
//!
//! Each tier is an [`AnchorStrategy`] proposing candidates for the fields that
//! are still unresolved. The [`AnchorLocator`] runs them in priority order and
//! merges with first-success-wins: once a field has a value no later tier can
//! replace it.

use crate::config::{ExtractorConfig, FixedLayout, RowWindow};
use crate::grid::Grid;
use crate::normalize::{looks_numeric, normalize_value};
use crate::schema::{FieldName, NamedValue, ResolutionTier};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

const VIVA_RIO: &str = "VIVA RIO";
const VIVA_RIO_EM_ABERTO: &str = "VIVA RIO EM ABERTO";

/// A value a tier proposes for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub field: FieldName,
    pub raw_text: String,
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierOutcome {
    pub viva_rio_found: bool,
    pub candidates: Vec<Candidate>,
}

/// Facts a tier records for the tiers after it within one resolution.
#[derive(Debug, Default)]
pub struct AnchorContext {
    anchor_row: Option<usize>,
}

impl AnchorContext {
    /// Row of the VIVA RIO label, set only once the header scan located it.
    pub fn anchor_row(&self) -> Option<usize> {
        self.anchor_row
    }

    pub fn record_anchor(&mut self, row: usize) {
        self.anchor_row = Some(row);
    }
}

pub trait AnchorStrategy {
    fn tier(&self) -> ResolutionTier;

    /// Whether the tier runs given how many fields earlier tiers resolved.
    fn should_attempt(&self, resolved: usize) -> bool {
        resolved < FieldName::ALL.len()
    }

    /// Proposes candidates for `unresolved` fields only.
    fn attempt(
        &self,
        grid: &Grid,
        ctx: &mut AnchorContext,
        unresolved: &BTreeSet<FieldName>,
    ) -> TierOutcome;
}

/// Tier 1: the summary block sits at hardcoded rows.
pub struct FixedPositionTier {
    layout: FixedLayout,
}

impl FixedPositionTier {
    pub fn new(layout: FixedLayout) -> Self {
        Self { layout }
    }
}

impl AnchorStrategy for FixedPositionTier {
    fn tier(&self) -> ResolutionTier {
        ResolutionTier::FixedPosition
    }

    fn attempt(
        &self,
        grid: &Grid,
        _ctx: &mut AnchorContext,
        unresolved: &BTreeSet<FieldName>,
    ) -> TierOutcome {
        let layout = &self.layout;
        let label_matches = |row: usize, keyword: &str| {
            grid.cell(row, layout.label_col)
                .is_some_and(|label| label.to_uppercase().contains(keyword))
        };

        let mut outcome = TierOutcome {
            viva_rio_found: label_matches(layout.anchor_row, VIVA_RIO),
            candidates: Vec::new(),
        };

        for &field in unresolved {
            let row = layout.row_for(field);
            if !label_matches(row, field.keyword()) {
                continue;
            }
            if let Some(text) = grid.non_empty_cell(row, layout.value_col) {
                outcome.candidates.push(Candidate {
                    field,
                    raw_text: text.to_string(),
                    row,
                    col: layout.value_col,
                });
            }
        }

        outcome
    }
}

/// Tier 2: find a header row near the anchor and read the anchor row under it.
pub struct HeaderScanTier {
    radius: usize,
}

impl HeaderScanTier {
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }

    fn find_header_row(&self, grid: &Grid, anchor: usize) -> Option<usize> {
        let window = RowWindow {
            before: self.radius,
            after: self.radius,
        };
        grid.row_window(anchor, window).find(|&row| {
            let text = grid.row_text_upper(row);
            FieldName::ALL
                .iter()
                .any(|field| text.contains(field.keyword()))
        })
    }
}

impl AnchorStrategy for HeaderScanTier {
    fn tier(&self) -> ResolutionTier {
        ResolutionTier::HeaderScan
    }

    /// Only when the fixed layout produced nothing at all.
    fn should_attempt(&self, resolved: usize) -> bool {
        resolved == 0
    }

    fn attempt(
        &self,
        grid: &Grid,
        ctx: &mut AnchorContext,
        unresolved: &BTreeSet<FieldName>,
    ) -> TierOutcome {
        let Some(anchor) = locate_viva_rio_row(grid) else {
            debug!("Header scan: no VIVA RIO row in grid");
            return TierOutcome::default();
        };
        ctx.record_anchor(anchor);

        let mut outcome = TierOutcome {
            viva_rio_found: true,
            candidates: Vec::new(),
        };

        let Some(header_row) = self.find_header_row(grid, anchor) else {
            debug!("Header scan: no header row within {} rows of {}", self.radius, anchor);
            return outcome;
        };

        let columns = header_columns(grid.row(header_row).unwrap_or_default());
        debug!(
            "Header scan: anchor row {}, header row {}, columns {:?}",
            anchor, header_row, columns
        );

        for (field, col) in columns {
            if !unresolved.contains(&field) {
                continue;
            }
            if let Some(text) = grid.non_empty_cell(anchor, col) {
                outcome.candidates.push(Candidate {
                    field,
                    raw_text: text.to_string(),
                    row: anchor,
                    col,
                });
            }
        }

        outcome
    }
}

/// First column mentioning each keyword, matched independently per keyword,
/// so one cell may name several fields.
fn header_columns(header: &[String]) -> BTreeMap<FieldName, usize> {
    let mut columns = BTreeMap::new();
    for (col, cell) in header.iter().enumerate() {
        let text = cell.trim().to_uppercase();
        for field in FieldName::ALL {
            if text.contains(field.keyword()) {
                columns.entry(field).or_insert(col);
            }
        }
    }
    columns
}

/// Tier 3: numeric cells directly below a row that mentions a field.
pub struct ProximityTier {
    window: RowWindow,
}

impl ProximityTier {
    pub fn new(window: RowWindow) -> Self {
        Self { window }
    }
}

impl AnchorStrategy for ProximityTier {
    fn tier(&self) -> ResolutionTier {
        ResolutionTier::Proximity
    }

    fn attempt(
        &self,
        grid: &Grid,
        ctx: &mut AnchorContext,
        unresolved: &BTreeSet<FieldName>,
    ) -> TierOutcome {
        // Without an anchor from the header scan there is nothing to search around.
        let Some(anchor) = ctx.anchor_row() else {
            debug!("Proximity: no anchor recorded by the header scan");
            return TierOutcome::default();
        };

        let mut open = unresolved.clone();
        let mut outcome = TierOutcome::default();

        for row in grid.row_window(anchor, self.window) {
            if row == 0 {
                continue;
            }
            let previous = grid.row_text_upper(row - 1);
            let cells = grid.row(row).unwrap_or_default();

            for (col, cell) in cells.iter().enumerate() {
                let text = cell.trim();
                if text.is_empty() || !looks_numeric(text) {
                    continue;
                }

                let field = FieldName::ALL
                    .into_iter()
                    .find(|field| open.contains(field) && previous.contains(field.keyword()));

                if let Some(field) = field {
                    open.remove(&field);
                    outcome.candidates.push(Candidate {
                        field,
                        raw_text: text.to_string(),
                        row,
                        col,
                    });
                }
            }
        }

        outcome
    }
}

/// Both matching passes run over whole rows: the full label (or all three of
/// its words) first, then the bare "VIVA RIO".
pub fn locate_viva_rio_row(grid: &Grid) -> Option<usize> {
    let texts: Vec<String> = (0..grid.len()).map(|row| grid.row_text_upper(row)).collect();

    texts
        .iter()
        .position(|text| {
            text.contains(VIVA_RIO_EM_ABERTO)
                || (text.contains("VIVA") && text.contains("RIO") && text.contains("ABERTO"))
        })
        .or_else(|| texts.iter().position(|text| text.contains(VIVA_RIO)))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnchorResolution {
    pub viva_rio_found: bool,
    pub values: BTreeMap<FieldName, NamedValue>,
}

pub struct AnchorLocator {
    tiers: Vec<Box<dyn AnchorStrategy>>,
}

impl Default for AnchorLocator {
    fn default() -> Self {
        Self::from_config(&ExtractorConfig::default())
    }
}

impl AnchorLocator {
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::with_tiers(vec![
            Box::new(FixedPositionTier::new(config.fixed_layout.clone())),
            Box::new(HeaderScanTier::new(config.header_search_radius)),
            Box::new(ProximityTier::new(config.proximity_window)),
        ])
    }

    pub fn with_tiers(tiers: Vec<Box<dyn AnchorStrategy>>) -> Self {
        Self { tiers }
    }

    pub fn resolve(&self, grid: &Grid) -> AnchorResolution {
        let mut resolution = AnchorResolution::default();
        let mut ctx = AnchorContext::default();

        for strategy in &self.tiers {
            let tier = strategy.tier();
            if !strategy.should_attempt(resolution.values.len()) {
                debug!("Skipping {:?}: {} fields already resolved", tier, resolution.values.len());
                continue;
            }

            let unresolved: BTreeSet<FieldName> = FieldName::ALL
                .into_iter()
                .filter(|field| !resolution.values.contains_key(field))
                .collect();

            let outcome = strategy.attempt(grid, &mut ctx, &unresolved);
            resolution.viva_rio_found |= outcome.viva_rio_found;

            for candidate in outcome.candidates {
                merge_candidate(&mut resolution.values, candidate, tier, grid);
            }
        }

        resolution
    }
}

/// First success wins; candidates for settled fields or outside the grid are dropped.
fn merge_candidate(
    values: &mut BTreeMap<FieldName, NamedValue>,
    candidate: Candidate,
    tier: ResolutionTier,
    grid: &Grid,
) {
    if values.contains_key(&candidate.field)
        || candidate.raw_text.is_empty()
        || grid.cell(candidate.row, candidate.col).is_none()
    {
        return;
    }

    debug!(
        "{:?} resolved {} = '{}' at ({}, {})",
        tier, candidate.field, candidate.raw_text, candidate.row, candidate.col
    );
    let normalized = normalize_value(&candidate.raw_text);
    values.insert(
        candidate.field,
        NamedValue::from_normalized(candidate.field, normalized, candidate.row, candidate.col, tier),
    );
}
