use crate::schema::{FieldName, NamedValue};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-field "rendered as negative" signals, e.g. derived from a red font
/// colour by whoever rendered the sheet. Absent fields carry no signal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VisualSignals(BTreeMap<FieldName, bool>);

impl VisualSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: FieldName, is_negative: bool) -> &mut Self {
        self.0.insert(field, is_negative);
        self
    }

    pub fn get(&self, field: FieldName) -> Option<bool> {
        self.0.get(&field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(FieldName, bool)> for VisualSignals {
    fn from_iter<T: IntoIterator<Item = (FieldName, bool)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub struct NegativeFlagMerger;

impl NegativeFlagMerger {
    /// Records the visual signal next to the textual one. The two stay separate
    /// fields and are OR-ed by [`NamedValue::is_negative`], so a textual
    /// negative survives an absent or false visual signal.
    pub fn merge(values: &mut BTreeMap<FieldName, NamedValue>, signals: Option<&VisualSignals>) {
        let Some(signals) = signals else {
            return;
        };

        for (field, value) in values.iter_mut() {
            if let Some(visual) = signals.get(*field) {
                if visual && !value.is_negative_text {
                    debug!("{} flagged negative by rendering only", field);
                }
                value.is_negative_visual = Some(visual);
            }
        }
    }
}
