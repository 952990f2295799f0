//! # Financial Grid Extractor
//!
//! Resolves named financial values and per-month records out of a loosely
//! structured spreadsheet export (CSV/TSV text) that has no reliable schema.
//!
//! ## Core Concepts
//!
//! - **Grid**: the export parsed into a jagged, immutable table of text cells
//! - **Anchor**: a row located by keyword, used as the reference point for relative reads
//! - **Tiers**: progressively less precise strategies (fixed position, header scan,
//!   proximity) resolving `setembro`, `outubro`, `novembro` and `total`; the first
//!   tier to resolve a field owns it
//! - **Month blocks**: UPAs, received values, dates and situations gathered at fixed
//!   offsets around each month label
//! - **Negative signals**: textual (`-10`, `(500,00)`) and, optionally, visual signals
//!   supplied by a renderer, kept apart and OR-ed at the end
//!
//! Missing data is never an error: unresolved fields are simply absent.
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_grid_extractor::*;
//!
//! let csv = std::fs::read_to_string("export.csv")?;
//! let mut signals = VisualSignals::new();
//! signals.insert(FieldName::Total, true);
//!
//! let result = GridExtractor::default().extract_text(&csv, Some(&signals));
//! if let Some(total) = result.value(FieldName::Total) {
//!     println!("total = {} (negative: {})", total.raw_text, total.is_negative());
//! }
//!
//! let json = ExtractionReport::from_result(&result).to_json()?;
//! ```

pub mod anchor;
pub mod config;
pub mod error;
pub mod grid;
pub mod months;
pub mod negative;
pub mod normalize;
pub mod report;
pub mod schema;

pub use anchor::{AnchorLocator, AnchorResolution, AnchorStrategy};
pub use config::{ColumnWindow, ExtractorConfig, FixedLayout, MonthLayout, RowWindow};
pub use error::{GridExtractionError, Result};
pub use grid::{CoordinateBase, Delimiter, Grid, GridParser};
pub use months::MonthBlockExtractor;
pub use negative::{NegativeFlagMerger, VisualSignals};
pub use normalize::{normalize_value, NormalizedValue};
pub use report::ExtractionReport;
pub use schema::*;

use log::info;

/// The full pipeline: grid, anchor tiers and month blocks, then sign merging.
///
/// Holds no state between calls, so one extractor can serve any number of grids.
pub struct GridExtractor {
    parser: GridParser,
    locator: AnchorLocator,
    months: MonthBlockExtractor,
}

impl Default for GridExtractor {
    fn default() -> Self {
        Self::build(&ExtractorConfig::default())
    }
}

impl GridExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: &ExtractorConfig) -> Self {
        Self {
            parser: GridParser::from_config(config),
            locator: AnchorLocator::from_config(config),
            months: MonthBlockExtractor::from_config(config),
        }
    }

    pub fn parse(&self, raw: &str) -> Grid {
        self.parser.parse(raw)
    }

    pub fn extract_text(&self, raw: &str, signals: Option<&VisualSignals>) -> ExtractionResult {
        self.extract(&self.parse(raw), signals)
    }

    pub fn extract(&self, grid: &Grid, signals: Option<&VisualSignals>) -> ExtractionResult {
        info!("Extracting financial values from a {}-row grid", grid.len());

        let AnchorResolution {
            viva_rio_found,
            mut values,
        } = self.locator.resolve(grid);
        let months = self.months.extract(grid);

        NegativeFlagMerger::merge(&mut values, signals);

        let result = ExtractionResult {
            viva_rio_found,
            values,
            months,
        };

        info!(
            "Resolved {}/{} fields (VIVA RIO found: {}), {} month blocks",
            result.values.len(),
            FieldName::ALL.len(),
            result.viva_rio_found,
            result.months.len()
        );
        if !result.values.is_empty() {
            let unresolved = result.unresolved_fields();
            if !unresolved.is_empty() {
                info!("Unresolved fields: {:?}", unresolved);
            }
        }

        result
    }
}

/// Extracts with the default layout and no visual signals.
pub fn extract_from_text(raw: &str) -> ExtractionResult {
    GridExtractor::default().extract_text(raw, None)
}

/// Extracts with the default layout and wraps the result in the serialized envelope.
pub fn extract_report(raw: &str, signals: Option<&VisualSignals>) -> ExtractionReport {
    ExtractionReport::from_result(&GridExtractor::default().extract_text(raw, signals))
}
