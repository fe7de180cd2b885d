use crate::types::SheetId;

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

/// Two columns: row key, row value. The service ignores anything wider.
pub const VALUES_RANGE: &str = "A:B";

pub fn values_path(sheet: &SheetId) -> String {
    format!("/v4/spreadsheets/{sheet}/values/{VALUES_RANGE}")
}
