use crate::schema::{CellEntry, ExtractionResult, FieldName, MonthBlock, MonthName};
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeMap;

pub const SUCCESS_MESSAGE: &str = "Dados extraídos com sucesso";
const FOUND_MARKER: &str = "Encontrado";

/// The serialized envelope read by the downstream consumer. Field names and
/// nesting are a compatibility contract and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ExtractionReport {
    pub success: bool,
    pub message: String,
    pub valores: ReportValues,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportValues {
    #[schemars(description = "\"Encontrado\" when the VIVA RIO EM ABERTO label was located, otherwise null.")]
    pub viva_rio_em_aberto: Option<String>,
    pub setembro: Option<String>,
    pub outubro: Option<String>,
    pub novembro: Option<String>,
    pub total: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub setembro_negativo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outubro_negativo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub novembro_negativo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_negativo: Option<bool>,

    pub meses: BTreeMap<MonthName, MonthReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct MonthReport {
    /// 1-based spreadsheet line of the month label.
    #[serde(rename = "linha")]
    pub line: usize,
    #[serde(rename = "indice")]
    pub index: usize,
    pub upas: Vec<String>,
    #[serde(rename = "valores_recebidos")]
    pub received_values: Vec<ReceivedValueEntry>,
    #[serde(rename = "datas")]
    pub dates: Vec<DateEntry>,
    #[serde(rename = "situacoes")]
    pub situations: Vec<SituationEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ReceivedValueEntry {
    #[serde(rename = "linha")]
    pub line: usize,
    #[serde(rename = "valor")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct DateEntry {
    #[serde(rename = "linha")]
    pub line: usize,
    #[serde(rename = "data")]
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct SituationEntry {
    #[serde(rename = "linha")]
    pub line: usize,
    #[serde(rename = "situacao")]
    pub situation: String,
}

impl ExtractionReport {
    pub fn from_result(result: &ExtractionResult) -> Self {
        Self {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            valores: ReportValues::from_result(result),
            error: None,
        }
    }

    /// Envelope for when the extraction could not run at all, e.g. the export
    /// could not be fetched.
    pub fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            valores: ReportValues::default(),
            error: Some(error.into()),
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ExtractionReport)
    }
}

impl ReportValues {
    pub fn from_result(result: &ExtractionResult) -> Self {
        let text = |field: FieldName| result.value(field).map(|v| v.raw_text.clone());
        // Only a positive flag is reported, never an explicit false.
        let negative = |field: FieldName| {
            result
                .value(field)
                .filter(|v| v.is_negative())
                .map(|_| true)
        };

        Self {
            viva_rio_em_aberto: result.viva_rio_found.then(|| FOUND_MARKER.to_string()),
            setembro: text(FieldName::Setembro),
            outubro: text(FieldName::Outubro),
            novembro: text(FieldName::Novembro),
            total: text(FieldName::Total),
            setembro_negativo: negative(FieldName::Setembro),
            outubro_negativo: negative(FieldName::Outubro),
            novembro_negativo: negative(FieldName::Novembro),
            total_negativo: negative(FieldName::Total),
            meses: result
                .months
                .iter()
                .map(|(month, block)| (*month, MonthReport::from(block)))
                .collect(),
        }
    }
}

impl From<&MonthBlock> for MonthReport {
    fn from(block: &MonthBlock) -> Self {
        Self {
            line: block.anchor_row + 1,
            index: block.anchor_row,
            upas: block.upas.clone(),
            received_values: entries(&block.received_values, |line, value| ReceivedValueEntry {
                line,
                value,
            }),
            dates: entries(&block.dates, |line, date| DateEntry { line, date }),
            situations: entries(&block.situations, |line, situation| SituationEntry {
                line,
                situation,
            }),
        }
    }
}

fn entries<T>(cells: &[CellEntry], build: impl Fn(usize, String) -> T) -> Vec<T> {
    cells
        .iter()
        .map(|cell| build(cell.line(), cell.raw_text.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_value;
    use crate::schema::{NamedValue, ResolutionTier};
    use serde_json::json;

    fn result_with_total(raw: &str) -> ExtractionResult {
        let mut result = ExtractionResult {
            viva_rio_found: true,
            ..Default::default()
        };
        result.values.insert(
            FieldName::Total,
            NamedValue::from_normalized(
                FieldName::Total,
                normalize_value(raw),
                36,
                1,
                ResolutionTier::FixedPosition,
            ),
        );
        result
    }

    #[test]
    fn test_report_field_names() {
        let mut result = result_with_total("-1.500,00");
        let mut block = MonthBlock::new(MonthName::Junho, 3);
        block.upas.push("UPA Norte".to_string());
        block.received_values.push(CellEntry::new(1, "R$ 10,00"));
        block.dates.push(CellEntry::new(2, "01/06/2024"));
        block.situations.push(CellEntry::new(4, "PAGO"));
        result.months.insert(MonthName::Junho, block);

        let value = serde_json::to_value(ExtractionReport::from_result(&result)).unwrap();
        assert_eq!(
            value,
            json!({
                "success": true,
                "message": "Dados extraídos com sucesso",
                "valores": {
                    "vivaRioEmAberto": "Encontrado",
                    "setembro": null,
                    "outubro": null,
                    "novembro": null,
                    "total": "-1.500,00",
                    "totalNegativo": true,
                    "meses": {
                        "JUNHO": {
                            "linha": 4,
                            "indice": 3,
                            "upas": ["UPA Norte"],
                            "valores_recebidos": [{"linha": 2, "valor": "R$ 10,00"}],
                            "datas": [{"linha": 3, "data": "01/06/2024"}],
                            "situacoes": [{"linha": 5, "situacao": "PAGO"}]
                        }
                    }
                },
                "error": null
            })
        );
    }

    #[test]
    fn test_positive_value_has_no_negative_key() {
        let report = ExtractionReport::from_result(&result_with_total("10"));
        let value = serde_json::to_value(&report).unwrap();
        assert!(value["valores"].get("totalNegativo").is_none());
    }

    #[test]
    fn test_failure_envelope() {
        let report = ExtractionReport::failure("Falha ao extrair dados da planilha", "timeout");
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["error"], json!("timeout"));
        assert_eq!(value["valores"]["vivaRioEmAberto"], json!(null));
        assert_eq!(value["valores"]["meses"], json!({}));
    }

    #[test]
    fn test_schema_lists_contract_fields() {
        let schema = serde_json::to_value(ExtractionReport::generate_json_schema()).unwrap();
        let text = schema.to_string();
        for key in ["valores", "vivaRioEmAberto", "meses", "valores_recebidos", "situacao"] {
            assert!(text.contains(key), "schema is missing {}", key);
        }
    }
}
