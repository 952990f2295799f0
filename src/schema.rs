use crate::normalize::NormalizedValue;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The four summary fields resolved by the anchor search.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum FieldName {
    Setembro,
    Outubro,
    Novembro,
    Total,
}

impl FieldName {
    /// Resolution order. Proximity matching walks fields in this order too.
    pub const ALL: [FieldName; 4] = [
        FieldName::Setembro,
        FieldName::Outubro,
        FieldName::Novembro,
        FieldName::Total,
    ];

    /// Upper-case label searched for in the grid.
    pub fn keyword(self) -> &'static str {
        match self {
            FieldName::Setembro => "SETEMBRO",
            FieldName::Outubro => "OUTUBRO",
            FieldName::Novembro => "NOVEMBRO",
            FieldName::Total => "TOTAL",
        }
    }

    /// Serialized key, e.g. `"setembro"`.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldName::Setembro => "setembro",
            FieldName::Outubro => "outubro",
            FieldName::Novembro => "novembro",
            FieldName::Total => "total",
        }
    }
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical Portuguese month names, ordered by calendar position.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum MonthName {
    #[serde(rename = "JANEIRO")]
    Janeiro,
    #[serde(rename = "FEVEREIRO")]
    Fevereiro,
    #[serde(rename = "MARÇO")]
    Marco,
    #[serde(rename = "ABRIL")]
    Abril,
    #[serde(rename = "MAIO")]
    Maio,
    #[serde(rename = "JUNHO")]
    Junho,
    #[serde(rename = "JULHO")]
    Julho,
    #[serde(rename = "AGOSTO")]
    Agosto,
    #[serde(rename = "SETEMBRO")]
    Setembro,
    #[serde(rename = "OUTUBRO")]
    Outubro,
    #[serde(rename = "NOVEMBRO")]
    Novembro,
    #[serde(rename = "DEZEMBRO")]
    Dezembro,
}

impl MonthName {
    pub const ALL: [MonthName; 12] = [
        MonthName::Janeiro,
        MonthName::Fevereiro,
        MonthName::Marco,
        MonthName::Abril,
        MonthName::Maio,
        MonthName::Junho,
        MonthName::Julho,
        MonthName::Agosto,
        MonthName::Setembro,
        MonthName::Outubro,
        MonthName::Novembro,
        MonthName::Dezembro,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MonthName::Janeiro => "JANEIRO",
            MonthName::Fevereiro => "FEVEREIRO",
            MonthName::Marco => "MARÇO",
            MonthName::Abril => "ABRIL",
            MonthName::Maio => "MAIO",
            MonthName::Junho => "JUNHO",
            MonthName::Julho => "JULHO",
            MonthName::Agosto => "AGOSTO",
            MonthName::Setembro => "SETEMBRO",
            MonthName::Outubro => "OUTUBRO",
            MonthName::Novembro => "NOVEMBRO",
            MonthName::Dezembro => "DEZEMBRO",
        }
    }

    /// Calendar number, 1 = January.
    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    /// Finds the first month, in calendar order, whose label occurs in `upper_text`.
    /// The caller is expected to have upper-cased the text already.
    pub fn find_in(upper_text: &str) -> Option<MonthName> {
        Self::ALL
            .into_iter()
            .find(|month| upper_text.contains(month.label()))
    }
}

impl std::fmt::Display for MonthName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which strategy resolved a field. Declaration order is priority order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    /// Hardcoded rows and columns of the known sheet layout.
    FixedPosition,
    /// Column indices taken from a header row near the anchor row.
    HeaderScan,
    /// Numeric cells directly below a row mentioning the field.
    Proximity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: FieldName,
    /// Trimmed cell text exactly as found in the grid.
    pub raw_text: String,
    pub numeric_value: Option<f64>,
    pub is_negative_text: bool,
    /// Supplied by a rendering-aware collaborator; `None` when no signal was given.
    pub is_negative_visual: Option<bool>,
    pub source_row: usize,
    pub source_col: usize,
    pub tier: ResolutionTier,
}

impl NamedValue {
    pub fn from_normalized(
        name: FieldName,
        normalized: NormalizedValue,
        source_row: usize,
        source_col: usize,
        tier: ResolutionTier,
    ) -> Self {
        Self {
            name,
            raw_text: normalized.raw_text,
            numeric_value: normalized.numeric_value,
            is_negative_text: normalized.is_negative_text,
            is_negative_visual: None,
            source_row,
            source_col,
            tier,
        }
    }

    /// Textual OR visual negative signal.
    pub fn is_negative(&self) -> bool {
        self.is_negative_text || self.is_negative_visual.unwrap_or(false)
    }

    /// Parsed magnitude with the merged sign applied.
    pub fn signed_value(&self) -> Option<f64> {
        self.numeric_value.map(|value| {
            if self.is_negative() && value > 0.0 {
                -value
            } else {
                value
            }
        })
    }
}

/// A non-empty cell collected around a month anchor. `row` is 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEntry {
    pub row: usize,
    pub raw_text: String,
}

impl CellEntry {
    pub fn new(row: usize, raw_text: impl Into<String>) -> Self {
        Self {
            row,
            raw_text: raw_text.into(),
        }
    }

    /// Spreadsheet line number (1-based).
    pub fn line(&self) -> usize {
        self.row + 1
    }

    /// Interprets the cell as a date. Accepts `dd/mm/yyyy`, `dd/mm/yy`,
    /// `dd-mm-yyyy`, `dd.mm.yyyy` and ISO `yyyy-mm-dd`.
    pub fn as_date(&self) -> Option<NaiveDate> {
        // Two-digit years first: "%Y" would otherwise read "24" as year 24.
        const FORMATS: [&str; 5] = ["%d/%m/%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d"];
        let text = self.raw_text.trim();
        FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthBlock {
    pub month: MonthName,
    pub anchor_row: usize,
    pub upas: Vec<String>,
    pub received_values: Vec<CellEntry>,
    pub dates: Vec<CellEntry>,
    pub situations: Vec<CellEntry>,
}

impl MonthBlock {
    pub fn new(month: MonthName, anchor_row: usize) -> Self {
        Self {
            month,
            anchor_row,
            upas: Vec::new(),
            received_values: Vec::new(),
            dates: Vec::new(),
            situations: Vec::new(),
        }
    }

    /// Runs every received value through the value normalizer.
    pub fn received_amounts(&self) -> Vec<NormalizedValue> {
        self.received_values
            .iter()
            .map(|entry| crate::normalize::normalize_value(&entry.raw_text))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub viva_rio_found: bool,
    /// Resolved fields only; an absent key means no tier could locate the field.
    pub values: BTreeMap<FieldName, NamedValue>,
    pub months: BTreeMap<MonthName, MonthBlock>,
}

impl ExtractionResult {
    pub fn value(&self, field: FieldName) -> Option<&NamedValue> {
        self.values.get(&field)
    }

    pub fn month(&self, month: MonthName) -> Option<&MonthBlock> {
        self.months.get(&month)
    }

    pub fn unresolved_fields(&self) -> Vec<FieldName> {
        FieldName::ALL
            .into_iter()
            .filter(|field| !self.values.contains_key(field))
            .collect()
    }
}
