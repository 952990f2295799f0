use crate::config::{ColumnWindow, ExtractorConfig, MonthLayout};
use crate::grid::Grid;
use crate::schema::{CellEntry, MonthBlock, MonthName};
use log::debug;
use std::collections::BTreeMap;

/// Collects the neighbourhood of every month label found in the label column.
///
/// Offsets are fixed relative to the label row and were taken from a single
/// observed block of the sheet. Rows falling outside the grid are skipped.
#[derive(Debug, Clone)]
pub struct MonthBlockExtractor {
    layout: MonthLayout,
}

impl Default for MonthBlockExtractor {
    fn default() -> Self {
        Self::from_config(&ExtractorConfig::default())
    }
}

impl MonthBlockExtractor {
    pub fn new(layout: MonthLayout) -> Self {
        Self { layout }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(config.month_layout.clone())
    }

    pub fn extract(&self, grid: &Grid) -> BTreeMap<MonthName, MonthBlock> {
        let mut months = BTreeMap::new();

        for row in 0..grid.len() {
            let Some(label) = grid.cell(row, self.layout.label_col) else {
                continue;
            };
            let Some(month) = MonthName::find_in(&label.trim().to_uppercase()) else {
                continue;
            };

            // Only the first occurrence of a month anchors a block.
            if months.contains_key(&month) {
                continue;
            }

            let block = self.build_block(grid, month, row);
            debug!(
                "Month {} at row {}: {} UPAs, {} received values, {} dates, {} situations",
                month,
                row + 1,
                block.upas.len(),
                block.received_values.len(),
                block.dates.len(),
                block.situations.len()
            );
            months.insert(month, block);
        }

        months
    }

    fn build_block(&self, grid: &Grid, month: MonthName, anchor_row: usize) -> MonthBlock {
        let mut block = MonthBlock::new(month, anchor_row);

        for entry in collect_column(grid, anchor_row, self.layout.upas) {
            if !block.upas.contains(&entry.raw_text) {
                block.upas.push(entry.raw_text);
            }
        }
        block.received_values = collect_column(grid, anchor_row, self.layout.received_values);
        block.dates = collect_column(grid, anchor_row, self.layout.dates);
        block.situations = collect_column(grid, anchor_row, self.layout.situations);

        block
    }
}

fn collect_column(grid: &Grid, anchor_row: usize, window: ColumnWindow) -> Vec<CellEntry> {
    grid.row_window(anchor_row, window.rows)
        .filter_map(|row| {
            grid.non_empty_cell(row, window.column)
                .map(|text| CellEntry::new(row, text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    /// Month label at row 3 (line 4), surrounded by two rows on each side.
    fn junho_grid() -> Grid {
        Grid::new(vec![
            row(&["", "", "", "ignored", "ignored", "", "", "ignored"]),
            row(&["", "", "", "R$ 100,00", "01/06/2024", "", "", "PAGO"]),
            row(&["", "UPA Centro", "", "R$ 200,00", "", "", "", "PENDENTE"]),
            row(&["Junho", "UPA Norte", "", "R$ 100,00", "05/06/2024", "", "", ""]),
            row(&["", "UPA Centro", "", "", "10/06/2024", "", "", "PAGO"]),
            row(&["", "UPA Sul", "", "R$ 50,00", "", "", "", "ignored"]),
            row(&["", "", "", "ignored", "ignored", "", "", "ignored"]),
        ])
    }

    #[test]
    fn test_block_offsets_follow_known_layout() {
        let months = MonthBlockExtractor::default().extract(&junho_grid());
        assert_eq!(months.len(), 1);

        let block = &months[&MonthName::Junho];
        assert_eq!(block.anchor_row, 3);
        assert_eq!(block.upas, vec!["UPA Centro", "UPA Norte"]);

        let received: Vec<(usize, &str)> = block
            .received_values
            .iter()
            .map(|e| (e.line(), e.raw_text.as_str()))
            .collect();
        assert_eq!(
            received,
            vec![(2, "R$ 100,00"), (3, "R$ 200,00"), (4, "R$ 100,00"), (6, "R$ 50,00")]
        );

        let dates: Vec<usize> = block.dates.iter().map(|e| e.row).collect();
        assert_eq!(dates, vec![1, 3, 4]);

        let situations: Vec<&str> = block
            .situations
            .iter()
            .map(|e| e.raw_text.as_str())
            .collect();
        assert_eq!(situations, vec!["PAGO", "PENDENTE", "PAGO"]);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let grid = Grid::new(vec![
            row(&["JULHO", "UPA A"]),
            row(&[]),
            row(&["julho 2024", "UPA B"]),
        ]);
        let months = MonthBlockExtractor::default().extract(&grid);
        assert_eq!(months.len(), 1);
        assert_eq!(months[&MonthName::Julho].anchor_row, 0);
        assert_eq!(months[&MonthName::Julho].upas, vec!["UPA A"]);
    }

    #[test]
    fn test_anchor_at_grid_edges_is_clipped() {
        let grid = Grid::new(vec![row(&["Dezembro", "UPA X", "", "R$ 1,00", "02/12/2024"])]);
        let months = MonthBlockExtractor::default().extract(&grid);
        let block = &months[&MonthName::Dezembro];
        assert_eq!(block.upas, vec!["UPA X"]);
        assert_eq!(block.received_values, vec![CellEntry::new(0, "R$ 1,00")]);
        assert_eq!(block.dates.len(), 1);
        assert!(block.situations.is_empty());
    }

    #[test]
    fn test_several_months_and_accented_label() {
        let grid = Grid::new(vec![
            row(&["Março"]),
            row(&[]),
            row(&[]),
            row(&[]),
            row(&["  abril  "]),
            row(&["Resumo de maio"]),
        ]);
        let months = MonthBlockExtractor::default().extract(&grid);
        let found: Vec<MonthName> = months.keys().copied().collect();
        assert_eq!(found, vec![MonthName::Marco, MonthName::Abril, MonthName::Maio]);
    }

    #[test]
    fn test_label_outside_first_column_is_ignored() {
        let grid = Grid::new(vec![row(&["", "JUNHO"])]);
        assert!(MonthBlockExtractor::default().extract(&grid).is_empty());
    }
}
