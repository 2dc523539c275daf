use serde::{Deserialize, Serialize};

/// A filesystem folder the backend watches for font files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    /// Server-assigned identifier (temporary `tmp-<n>` id until confirmed)
    pub id: String,
    /// Absolute path of the watched folder
    pub path: String,
    /// Number of font files found during the last scan
    #[serde(default)]
    pub file_count: u64,
    /// Current scan state of the folder
    #[serde(default)]
    pub status: FolderStatus,
}

/// Scan state of a watched folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderStatus {
    #[default]
    Idle,
    Scanning,
    Error,
}

/// Outcome of a single path validation, tagged with the input that produced it
///
/// The `value` field is the correlation key: a consumer must check it against
/// the current input before trusting `valid`/`error`, so a slow response for
/// older input is never attributed to newer input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathValidationStatus {
    pub value: String,
    pub valid: bool,
    pub error: Option<String>,
}

impl PathValidationStatus {
    /// Status for empty or whitespace-only input
    pub fn empty() -> Self {
        Self {
            value: String::new(),
            valid: false,
            error: Some("empty".to_string()),
        }
    }

    /// Status while a validation is in flight for `value`
    pub fn pending(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            valid: false,
            error: Some("pending".to_string()),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.error.as_deref() == Some("pending")
    }
}

impl Default for PathValidationStatus {
    fn default() -> Self {
        Self::empty()
    }
}

/// Wire shape of `/api/folders/validate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// One font family, previewed by its representative style
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontFamilySummary {
    pub id: String,
    pub name: String,
    /// Distinct file extensions present in the family, sorted
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub font_count: u64,
    #[serde(default)]
    pub path: String,
}

/// One style inside a family, fetched lazily on selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontStyleEntry {
    pub full_name: String,
    pub path: String,
    pub style_name: String,
    #[serde(default)]
    pub representative: bool,
}
