//! Core domain types for Phonescout lookups and batch runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error text for blank/missing phone input. Kept stable because batch
/// consumers match on it.
pub const EMPTY_INPUT_ERROR: &str = "Empty or invalid phone number";

/// Output column order shared by the JSON wire format and CSV reports.
pub const RESULT_COLUMNS: [&str; 9] = [
    "phone",
    "date",
    "type",
    "company",
    "location",
    "is_mobile",
    "carrier",
    "sms_gateway",
    "error",
];

// ---------------------------------------------------------------------------
// BatchId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for batch run identifiers (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub Uuid);

impl BatchId {
    /// Generate a new time-sortable batch identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BatchId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// PhoneLookupResult
// ---------------------------------------------------------------------------

/// One lookup outcome. Field declaration order is the wire order for both
/// JSON objects and CSV rows: phone, date, type, company, location,
/// is_mobile, carrier, sms_gateway, error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneLookupResult {
    /// Number as echoed back by the page; the raw input when the page was
    /// never reached or the echo could not be read.
    pub phone: String,
    /// Report date, free-form as rendered by the page.
    #[serde(rename = "date", default)]
    pub report_date: String,
    /// Line type, e.g. "Wireless" or "Landline".
    #[serde(rename = "type", default)]
    pub line_type: String,
    /// Carrier/operator name as rendered.
    #[serde(default)]
    pub company: String,
    /// Geographic description as rendered.
    #[serde(default)]
    pub location: String,
    /// Derived from `line_type`; false whenever `error` is non-empty.
    #[serde(default)]
    pub is_mobile: bool,
    /// Mirror of `company`, kept for output-schema stability.
    #[serde(default)]
    pub carrier: String,
    /// `<digits>@<gateway>` when the carrier is recognized, else empty.
    #[serde(default)]
    pub sms_gateway: String,
    /// Empty when the lookup fully succeeded.
    #[serde(default)]
    pub error: String,
}

impl PhoneLookupResult {
    /// Result shape for a blank/missing input value. No page interaction
    /// happens for these.
    pub fn empty_input(raw: &str) -> Self {
        Self {
            phone: raw.to_string(),
            error: EMPTY_INPUT_ERROR.to_string(),
            ..Self::default()
        }
    }

    /// Result shape for a lookup that failed before any field was read.
    pub fn failure(phone: &str, error: impl Into<String>) -> Self {
        Self {
            phone: phone.to_string(),
            error: error.into(),
            ..Self::default()
        }
    }

    /// True when every extraction step succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.is_empty()
    }
}

// ---------------------------------------------------------------------------
// BatchRun
// ---------------------------------------------------------------------------

/// Terminal and non-terminal states of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// State of one batch: the ordered results plus progress bookkeeping.
/// Mutated once per processed item by the batch worker; immutable once
/// `status` is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRun {
    /// Unique identifier for this run.
    pub id: BatchId,
    /// Current state.
    pub status: BatchStatus,
    /// Number of input values.
    pub total: usize,
    /// Number of items processed so far.
    pub completed_count: usize,
    /// Results in input order, one per processed item.
    pub results: Vec<PhoneLookupResult>,
    /// Column the phone values were read from, when ingested from a file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_column: Option<String>,
    /// Failure cause when `status` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the run was created.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Path of the written CSV artifact, once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<std::path::PathBuf>,
}

impl BatchRun {
    /// Create a running batch over `total` inputs.
    pub fn new(total: usize) -> Self {
        Self {
            id: BatchId::new(),
            status: BatchStatus::Running,
            total,
            completed_count: 0,
            results: Vec::with_capacity(total),
            source_column: None,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
            report_path: None,
        }
    }

    /// Append one result and advance the completed count.
    pub fn push_result(&mut self, result: PhoneLookupResult) {
        self.results.push(result);
        self.completed_count += 1;
    }

    /// Integer percentage complete, 0..=100.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed_count * 100) / self.total) as u8
    }

    /// Transition to `completed`.
    pub fn complete(&mut self, report_path: Option<std::path::PathBuf>) {
        self.status = BatchStatus::Completed;
        self.report_path = report_path;
        self.finished_at = Some(Utc::now());
    }

    /// Transition to `failed` with a cause.
    pub fn fail(&mut self, cause: impl Into<String>) {
        self.status = BatchStatus::Failed;
        self.error = Some(cause.into());
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_id_roundtrip() {
        let id = BatchId::new();
        let s = id.to_string();
        let parsed: BatchId = s.parse().expect("parse BatchId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn result_json_key_order_matches_wire_schema() {
        let result = PhoneLookupResult {
            phone: "(555) 123-4567".into(),
            report_date: "June 1, 2025".into(),
            line_type: "Wireless".into(),
            company: "Verizon Wireless".into(),
            location: "Seattle, WA".into(),
            is_mobile: true,
            carrier: "Verizon Wireless".into(),
            sms_gateway: "5551234567@vtext.com".into(),
            error: String::new(),
        };

        let json = serde_json::to_string(&result).expect("serialize");
        let mut last = 0;
        for key in RESULT_COLUMNS {
            let needle = format!("\"{key}\":");
            let at = json.find(&needle).unwrap_or_else(|| panic!("missing key {key}"));
            assert!(at >= last, "key {key} out of order");
            last = at;
        }

        let parsed: PhoneLookupResult = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, result);
    }

    #[test]
    fn empty_input_shape() {
        let result = PhoneLookupResult::empty_input("   ");
        assert_eq!(result.phone, "   ");
        assert_eq!(result.error, EMPTY_INPUT_ERROR);
        assert!(!result.is_mobile);
        assert!(result.sms_gateway.is_empty());
    }

    #[test]
    fn batch_run_percent_and_transitions() {
        let mut run = BatchRun::new(4);
        assert_eq!(run.status, BatchStatus::Running);
        assert_eq!(run.percent(), 0);

        run.push_result(PhoneLookupResult::failure("x", "boom"));
        assert_eq!(run.percent(), 25);
        run.push_result(PhoneLookupResult::default());
        run.push_result(PhoneLookupResult::default());
        assert_eq!(run.percent(), 75);
        run.push_result(PhoneLookupResult::default());
        assert_eq!(run.percent(), 100);

        run.complete(None);
        assert_eq!(run.status, BatchStatus::Completed);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn batch_run_failure_records_cause() {
        let mut run = BatchRun::new(0);
        run.fail("file contains no data rows");
        assert_eq!(run.status, BatchStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("file contains no data rows"));
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&BatchStatus::Running).expect("serialize");
        assert_eq!(json, "\"running\"");
        assert_eq!(BatchStatus::Failed.to_string(), "failed");
    }
}
