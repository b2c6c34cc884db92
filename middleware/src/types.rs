use crate::error::{JobFailure, JobProgress, MiddlewareError};
use jailtab_mount::{FstabEntry, ObservedEntry, Origin};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

pub const METHOD_GET_IOCROOT: &str = "jail.get_iocroot";
pub const METHOD_FSTAB: &str = "jail.fstab";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FstabAction {
    List,
    Add,
    Replace,
    Remove,
}

/// Options object for one `jail.fstab` call.
pub fn fstab_options(action: FstabAction, id: Option<&str>, entry: Option<&FstabEntry>) -> Value {
    let mut options = json!({ "action": action });
    if let Some(id) = id {
        options["id"] = json!(id);
    }
    if let Some(entry) = entry {
        options["entry"] = json!(entry);
    }
    options
}

#[derive(Debug, Clone, Deserialize)]
struct ListedEntry {
    #[serde(rename = "type")]
    origin: Origin,
    entry: Value,
}

/// Parse the mapping returned by a `LIST` action into entries, in the
/// middleware's order.
///
/// Keys are the entries' positions in the jail's fstab. JSON objects carry no
/// order of their own, so numeric keys are sorted numerically and any other
/// key falls back to lexicographic order after them.
///
/// `USER` rows must carry a well-formed entry. A `SYSTEM` row whose entry does
/// not parse is left out, since nothing acts on system entries.
pub fn parse_fstab_listing(value: Value) -> Result<Vec<ObservedEntry>, MiddlewareError> {
    if !value.is_object() {
        return Err(MiddlewareError::UnexpectedResponse(format!(
            "fstab listing is not an object: {}",
            value
        )));
    }

    let listing: BTreeMap<String, ListedEntry> = serde_json::from_value(value)?;

    let mut entries = Vec::with_capacity(listing.len());
    for (id, listed) in listing {
        let entry = match serde_json::from_value::<FstabEntry>(listed.entry) {
            Ok(entry) => entry,
            Err(e) if listed.origin == Origin::System => {
                tracing::debug!("Skipping system fstab entry #{}: {}", id, e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        entries.push(ObservedEntry {
            id,
            origin: listed.origin,
            entry,
        });
    }

    entries.sort_by(|a, b| {
        let ka = a.id.parse::<u64>().ok();
        let kb = b.id.parse::<u64>().ok();
        match (ka, kb) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        }
    });

    Ok(entries)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    Waiting,
    Running,
    Success,
    Failed,
    Aborted,
}

impl JobState {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobState::Success | JobState::Failed | JobState::Aborted)
    }
}

/// A job as reported by `core.get_jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobRecord {
    pub id: u64,
    pub state: JobState,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub exception: Option<String>,
    #[serde(default)]
    pub progress: Option<JobProgress>,
}

impl JobRecord {
    pub fn into_failure(self) -> JobFailure {
        JobFailure {
            progress: self.progress,
            error: self.error,
            exception: self.exception,
        }
    }
}
