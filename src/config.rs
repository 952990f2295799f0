use crate::error::{GridExtractionError, Result};
use crate::schema::FieldName;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Every layout constant the extractor relies on.
///
/// The defaults describe the one sheet layout the heuristics were built
/// against; they are empirical, not derived from headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExtractorConfig {
    #[schemars(
        description = "Forces the cell delimiter. When absent the delimiter is sniffed from the start of the text."
    )]
    pub delimiter: Option<char>,

    #[schemars(description = "How many leading characters are inspected when sniffing the delimiter.")]
    pub sniff_chars: usize,

    pub fixed_layout: FixedLayout,

    #[schemars(
        description = "Rows above and below the anchor row searched for a header naming the summary fields."
    )]
    pub header_search_radius: usize,

    #[schemars(description = "Rows around the anchor row searched for numbers beneath a field label.")]
    pub proximity_window: RowWindow,

    pub month_layout: MonthLayout,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            sniff_chars: 100,
            fixed_layout: FixedLayout::default(),
            header_search_radius: 10,
            proximity_window: RowWindow {
                before: 2,
                after: 5,
            },
            month_layout: MonthLayout::default(),
        }
    }
}

/// Absolute 0-based positions of the summary block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FixedLayout {
    pub anchor_row: usize,
    pub setembro_row: usize,
    pub outubro_row: usize,
    pub novembro_row: usize,
    pub total_row: usize,
    pub label_col: usize,
    pub value_col: usize,
}

impl Default for FixedLayout {
    fn default() -> Self {
        Self {
            anchor_row: 32,
            setembro_row: 33,
            outubro_row: 34,
            novembro_row: 35,
            total_row: 36,
            label_col: 0,
            value_col: 1,
        }
    }
}

impl FixedLayout {
    pub fn row_for(&self, field: FieldName) -> usize {
        match field {
            FieldName::Setembro => self.setembro_row,
            FieldName::Outubro => self.outubro_row,
            FieldName::Novembro => self.novembro_row,
            FieldName::Total => self.total_row,
        }
    }
}

/// Rows `center - before ..= center + after`, clipped to the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RowWindow {
    pub before: usize,
    pub after: usize,
}

/// A single column read over a window of rows around a month anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnWindow {
    pub column: usize,
    pub rows: RowWindow,
}

impl ColumnWindow {
    const fn new(column: usize, before: usize, after: usize) -> Self {
        Self {
            column,
            rows: RowWindow { before, after },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MonthLayout {
    #[schemars(description = "Column scanned for month names.")]
    pub label_col: usize,
    pub upas: ColumnWindow,
    pub received_values: ColumnWindow,
    pub dates: ColumnWindow,
    pub situations: ColumnWindow,
}

impl Default for MonthLayout {
    fn default() -> Self {
        Self {
            label_col: 0,
            upas: ColumnWindow::new(1, 1, 1),
            received_values: ColumnWindow::new(3, 2, 2),
            dates: ColumnWindow::new(4, 2, 2),
            situations: ColumnWindow::new(7, 2, 1),
        }
    }
}

impl ExtractorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ExtractorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sniff_chars == 0 {
            return Err(invalid("sniff_chars", "must be greater than zero"));
        }

        if let Some(delimiter) = self.delimiter {
            if matches!(delimiter, '"' | '\n' | '\r') {
                return Err(invalid(
                    "delimiter",
                    format!("{:?} cannot separate cells", delimiter),
                ));
            }
        }

        let fixed = &self.fixed_layout;
        if fixed.label_col == fixed.value_col {
            return Err(invalid(
                "fixed_layout",
                format!(
                    "label and value columns must differ (both are {})",
                    fixed.label_col
                ),
            ));
        }

        let months = &self.month_layout;
        let windows = [
            ("month_layout.upas", months.upas),
            ("month_layout.received_values", months.received_values),
            ("month_layout.dates", months.dates),
            ("month_layout.situations", months.situations),
        ];
        for (name, window) in windows {
            if window.column == months.label_col {
                return Err(invalid(
                    name,
                    format!(
                        "column {} is the month label column",
                        window.column
                    ),
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, details: impl Into<String>) -> GridExtractionError {
    GridExtractionError::InvalidConfig {
        field: field.to_string(),
        details: details.into(),
    }
}
