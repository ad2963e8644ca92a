use google_gmail1::api::{Label, ListLabelsResponse};

/// Dimension names attached to every per-label sample, in emission order
pub const LABEL_DIMENSIONS: [&str; 3] = ["label_name", "label_id", "label_type"];

/// A label as returned by `users.labels.list`
///
/// Only `id`, `name` and `type` are guaranteed by a list call, so nothing
/// else is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSummary {
    pub id: String,
    pub name: String,
    pub label_type: String,
}

impl LabelSummary {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        label_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            label_type: label_type.into(),
        }
    }

    /// Values for [`LABEL_DIMENSIONS`], in the same order
    pub fn dimension_values(&self) -> [&str; 3] {
        [&self.name, &self.id, &self.label_type]
    }
}

/// Message counts for one label at the time of the call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LabelDetail {
    pub messages_total: u64,
    pub messages_unread: u64,
}

impl LabelDetail {
    pub fn new(messages_total: u64, messages_unread: u64) -> Self {
        Self {
            messages_total,
            messages_unread,
        }
    }
}

impl From<Label> for LabelDetail {
    fn from(label: Label) -> Self {
        Self {
            messages_total: count(label.messages_total),
            messages_unread: count(label.messages_unread),
        }
    }
}

fn count(value: Option<i32>) -> u64 {
    value.map_or(0, |v| u64::try_from(v).unwrap_or(0))
}

/// Map a list response to summaries, keeping the order the API returned
///
/// Labels without an id cannot be queried for counts and are dropped.
pub fn labels_from_response(response: ListLabelsResponse) -> Vec<LabelSummary> {
    response
        .labels
        .unwrap_or_default()
        .into_iter()
        .filter_map(|label| {
            let id = label.id?;
            Some(LabelSummary {
                id,
                name: label.name.unwrap_or_default(),
                label_type: label.type_.unwrap_or_default(),
            })
        })
        .collect()
}
