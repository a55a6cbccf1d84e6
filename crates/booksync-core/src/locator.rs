//! Spreadsheet locator resolution.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, SyncError};
use crate::util::normalize_text_option;

static SHARING_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/spreadsheets/d/([A-Za-z0-9_-]+)").expect("Invalid regex"));
static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid regex"));

/// Identifier of a Google spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpreadsheetId(String);

impl SpreadsheetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpreadsheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve a spreadsheet from a raw id or a sharing URL.
///
/// A raw id wins and is used unchanged. A URL yields the segment after
/// `/spreadsheets/d/`; failing that, the URL text itself is accepted only if
/// it already looks like a bare id. `Ok(None)` means neither was given.
pub fn resolve_locator(id: Option<&str>, url: Option<&str>) -> Result<Option<SpreadsheetId>> {
    if let Some(id) = id.filter(|id| !id.trim().is_empty()) {
        return Ok(Some(SpreadsheetId::new(id)));
    }

    let Some(url) = normalize_text_option(url.map(str::to_string)) else {
        return Ok(None);
    };

    extract_spreadsheet_id(&url).map(Some).ok_or_else(|| {
        SyncError::InvalidLocator(format!("cannot find a spreadsheet id in `{url}`"))
    })
}

/// Pull the spreadsheet id out of a sharing URL or accept a bare id.
pub fn extract_spreadsheet_id(locator: &str) -> Option<SpreadsheetId> {
    if let Some(captures) = SHARING_URL.captures(locator) {
        return Some(SpreadsheetId(captures[1].to_string()));
    }
    BARE_ID
        .is_match(locator)
        .then(|| SpreadsheetId(locator.to_string()))
}
