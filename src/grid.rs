use crate::config::{ExtractorConfig, RowWindow};
use crate::error::{GridExtractionError, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::mem::take;
use std::ops::Range;

/// Jagged, immutable grid of untrimmed cell strings. Indices are 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

/// Coordinate convention of externally reconstructed cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateBase {
    ZeroBased,
    OneBased,
}

impl Grid {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Rebuilds a grid from individually enumerated cells, e.g. cells scraped
    /// from a rendered sheet. Gaps become empty cells and a repeated
    /// coordinate keeps its last text.
    pub fn from_cells<I, S>(cells: I, base: CoordinateBase) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, S)>,
        S: Into<String>,
    {
        let mut rows: Vec<Vec<String>> = Vec::new();

        for (row, col, text) in cells {
            let (row, col) = match base {
                CoordinateBase::ZeroBased => (row, col),
                CoordinateBase::OneBased => {
                    if row == 0 || col == 0 {
                        return Err(GridExtractionError::InvalidCoordinate { row, col });
                    }
                    (row - 1, col - 1)
                }
            };

            if rows.len() <= row {
                rows.resize_with(row + 1, Vec::new);
            }
            let row_cells = &mut rows[row];
            if row_cells.len() <= col {
                row_cells.resize_with(col + 1, String::new);
            }
            row_cells[col] = text.into();
        }

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Trimmed cell text, or `None` when the cell is missing or blank.
    pub fn non_empty_cell(&self, row: usize, col: usize) -> Option<&str> {
        self.cell(row, col)
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// All cells of a row joined with spaces and upper-cased.
    pub fn row_text_upper(&self, row: usize) -> String {
        self.row(row)
            .map(|cells| cells.join(" ").to_uppercase())
            .unwrap_or_default()
    }

    /// Row indices `center - window.before ..= center + window.after`, clipped to the grid.
    pub fn row_window(&self, center: usize, window: RowWindow) -> Range<usize> {
        let start = center.saturating_sub(window.before);
        let end = center
            .saturating_add(window.after)
            .saturating_add(1)
            .min(self.rows.len());
        start.min(end)..end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delimiter {
    Semicolon,
    Tab,
    Comma,
}

impl Delimiter {
    /// Semicolon beats tab beats comma; comma is the fallback.
    pub fn sniff(text: &str, sniff_chars: usize) -> Self {
        let head: String = text.chars().take(sniff_chars).collect();
        if head.contains(';') {
            Delimiter::Semicolon
        } else if head.contains('\t') {
            Delimiter::Tab
        } else {
            Delimiter::Comma
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Delimiter::Semicolon => ';',
            Delimiter::Tab => '\t',
            Delimiter::Comma => ',',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    Start,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

#[derive(Debug, Clone)]
pub struct GridParser {
    delimiter_hint: Option<char>,
    sniff_chars: usize,
}

impl Default for GridParser {
    fn default() -> Self {
        Self::from_config(&ExtractorConfig::default())
    }
}

impl GridParser {
    pub fn new(delimiter_hint: Option<char>) -> Self {
        Self {
            delimiter_hint,
            ..Self::default()
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self {
            delimiter_hint: config.delimiter,
            sniff_chars: config.sniff_chars,
        }
    }

    /// Lenient parse: a tokenization failure degrades to an empty grid.
    pub fn parse(&self, raw: &str) -> Grid {
        self.try_parse(raw).unwrap_or_else(|e| {
            warn!("Falling back to an empty grid: {}", e);
            Grid::default()
        })
    }

    pub fn try_parse(&self, raw: &str) -> Result<Grid> {
        if raw.trim().is_empty() {
            return Ok(Grid::default());
        }

        // Leading blank lines are kept: they are rows of the sheet.
        let text = raw.trim_end_matches(['\n', '\r']);
        let delimiter = self
            .delimiter_hint
            .unwrap_or_else(|| Delimiter::sniff(text, self.sniff_chars).as_char());

        let rows = tokenize(text, delimiter)?;
        debug!(
            "Parsed {} rows using delimiter {:?}",
            rows.len(),
            delimiter
        );
        Ok(Grid::new(rows))
    }
}

/// Splits delimited text into rows. A field opening with `"` is quoted, `""`
/// inside it is a literal quote, and text after its closing quote is kept
/// verbatim. Blank lines produce empty rows so row indices follow line numbers.
fn tokenize(text: &str, delimiter: char) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut state = FieldState::Start;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            FieldState::Quoted => {
                if ch == '"' {
                    state = FieldState::QuoteInQuoted;
                } else {
                    field.push(ch);
                }
            }
            FieldState::QuoteInQuoted if ch == '"' => {
                field.push('"');
                state = FieldState::Quoted;
            }
            _ if ch == delimiter => {
                row.push(take(&mut field));
                state = FieldState::Start;
            }
            _ if ch == '\n' || ch == '\r' => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                if !(row.is_empty() && state == FieldState::Start) {
                    row.push(take(&mut field));
                }
                rows.push(take(&mut row));
                state = FieldState::Start;
            }
            FieldState::Start if ch == '"' => state = FieldState::Quoted,
            _ => {
                field.push(ch);
                state = FieldState::Unquoted;
            }
        }
    }

    if state == FieldState::Quoted {
        return Err(GridExtractionError::Parse(format!(
            "unterminated quoted field on line {}",
            rows.len() + 1
        )));
    }

    if !(row.is_empty() && state == FieldState::Start) {
        row.push(field);
        rows.push(row);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Grid {
        Grid::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_delimiter_priority() {
        assert_eq!(Delimiter::sniff("a;b\tc,d", 100), Delimiter::Semicolon);
        assert_eq!(Delimiter::sniff("a\tb,c", 100), Delimiter::Tab);
        assert_eq!(Delimiter::sniff("a,b", 100), Delimiter::Comma);
        assert_eq!(Delimiter::sniff("plain", 100), Delimiter::Comma);
    }

    #[test]
    fn test_sniffing_only_inspects_leading_characters() {
        let text = format!("{};x", "a,".repeat(60));
        assert_eq!(Delimiter::sniff(&text, 100), Delimiter::Comma);
        assert_eq!(Delimiter::sniff(&text, 200), Delimiter::Semicolon);
    }

    #[test]
    fn test_parse_semicolon_grid_keeps_cells_untrimmed() {
        let parsed = GridParser::default().parse("A; B ;C\n1;2\n");
        assert_eq!(parsed, grid(&[&["A", " B ", "C"], &["1", "2"]]));
    }

    #[test]
    fn test_parse_empty_and_whitespace_input() {
        let parser = GridParser::default();
        assert!(parser.parse("").is_empty());
        assert!(parser.parse("  \n\t \r\n").is_empty());
    }

    #[test]
    fn test_quoted_fields() {
        let parsed = GridParser::default()
            .parse("\"R$ 1.234,56\",\"a \"\"b\"\"\",x\n\"multi\nline\",y");
        assert_eq!(
            parsed,
            grid(&[&["R$ 1.234,56", "a \"b\"", "x"], &["multi\nline", "y"]])
        );
    }

    #[test]
    fn test_blank_lines_keep_row_positions() {
        let parsed = GridParser::default().parse("a,b\r\n\r\nc,d\n,\n");
        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed.row(1), Some(&[][..]));
        assert_eq!(parsed.cell(2, 1), Some("d"));
        assert_eq!(parsed.row(3).map(|r| r.len()), Some(2));
    }

    #[test]
    fn test_leading_blank_lines_are_rows() {
        let parsed = GridParser::default().parse("\n\nJUNHO;x");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed.cell(2, 0), Some("JUNHO"));
    }

    #[test]
    fn test_delimiter_hint_overrides_sniffing() {
        let parsed = GridParser::new(Some('|')).parse("a;b|c");
        assert_eq!(parsed, grid(&[&["a;b", "c"]]));
    }

    #[test]
    fn test_unterminated_quote() {
        let parser = GridParser::default();
        assert!(matches!(
            parser.try_parse("a,\"open"),
            Err(GridExtractionError::Parse(_))
        ));
        assert!(parser.parse("a,\"open").is_empty());
    }

    #[test]
    fn test_from_cells_one_based() {
        let rebuilt = Grid::from_cells(
            vec![(1, 1, "VIVA RIO"), (2, 3, "10"), (2, 1, "SETEMBRO")],
            CoordinateBase::OneBased,
        )
        .unwrap();
        assert_eq!(rebuilt.cell(0, 0), Some("VIVA RIO"));
        assert_eq!(rebuilt.cell(1, 0), Some("SETEMBRO"));
        assert_eq!(rebuilt.cell(1, 1), Some(""));
        assert_eq!(rebuilt.cell(1, 2), Some("10"));

        let err = Grid::from_cells(vec![(0, 1, "x")], CoordinateBase::OneBased);
        assert!(matches!(
            err,
            Err(GridExtractionError::InvalidCoordinate { row: 0, col: 1 })
        ));
    }

    #[test]
    fn test_from_cells_last_write_wins() {
        let rebuilt = Grid::from_cells(
            vec![(0, 0, "old"), (0, 0, "new")],
            CoordinateBase::ZeroBased,
        )
        .unwrap();
        assert_eq!(rebuilt.cell(0, 0), Some("new"));
    }

    #[test]
    fn test_row_window_clips_to_bounds() {
        let g = grid(&[&["a"], &["b"], &["c"], &["d"]]);
        let window = RowWindow {
            before: 2,
            after: 2,
        };
        assert_eq!(g.row_window(0, window), 0..3);
        assert_eq!(g.row_window(3, window), 1..4);
        assert_eq!(g.row_window(10, window), 4..4);
    }

    #[test]
    fn test_cell_helpers() {
        let g = grid(&[&["Viva Rio", "  "], &[]]);
        assert_eq!(g.row_text_upper(0), "VIVA RIO   ");
        assert_eq!(g.non_empty_cell(0, 1), None);
        assert_eq!(g.non_empty_cell(0, 0), Some("Viva Rio"));
        assert_eq!(g.cell(1, 0), None);
        assert_eq!(g.row_text_upper(9), "");
    }
}
