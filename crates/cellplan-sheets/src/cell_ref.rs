use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Address of a single spreadsheet cell in A1 notation.
///
/// Accepted forms: `A1`, `Plan!B2`, `'Agent plan'!C3`. The sheet name is
/// optional; without it the spreadsheet's first sheet is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellRef {
    sheet: Option<String>,
    column: String,
    row: u32,
}

impl CellRef {
    /// Build a reference from already validated parts.
    pub fn new(sheet: Option<&str>, column: &str, row: u32) -> Result<Self, CellRefError> {
        if let Some(s) = sheet {
            if s.trim().is_empty() {
                return Err(CellRefError::EmptySheet);
            }
        }
        if column.is_empty() || !column.chars().all(|c| c.is_ascii_alphabetic()) || row == 0 {
            return Err(CellRefError::InvalidCoordinate(format!("{column}{row}")));
        }
        Ok(Self {
            sheet: sheet.map(str::to_owned),
            column: column.to_ascii_uppercase(),
            row,
        })
    }

    pub fn sheet(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    /// Column letters, upper-cased (`"A"`, `"AB"`).
    pub fn column(&self) -> &str {
        &self.column
    }

    /// 1-based row number.
    pub fn row(&self) -> u32 {
        self.row
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            if sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                write!(f, "{sheet}!")?;
            } else {
                write!(f, "'{}'!", sheet.replace('\'', "''"))?;
            }
        }
        write!(f, "{}{}", self.column, self.row)
    }
}

impl FromStr for CellRef {
    type Err = CellRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CellRefError::Empty);
        }

        let (sheet, coord) = match s.rsplit_once('!') {
            Some((sheet, coord)) => (Some(unquote_sheet(sheet)), coord),
            None => (None, s),
        };

        let split = coord
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| CellRefError::InvalidCoordinate(coord.to_owned()))?;
        let (column, row) = coord.split_at(split);
        let row: u32 = row
            .parse()
            .map_err(|_| CellRefError::InvalidCoordinate(coord.to_owned()))?;

        Self::new(sheet.as_deref(), column, row)
    }
}

impl TryFrom<String> for CellRef {
    type Error = CellRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CellRef> for String {
    fn from(value: CellRef) -> Self {
        value.to_string()
    }
}

fn unquote_sheet(sheet: &str) -> String {
    match sheet.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => sheet.to_owned(),
    }
}

/// Error returned when parsing an invalid [`CellRef`] string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CellRefError {
    #[error("cell reference is empty")]
    Empty,

    #[error("cell reference has an empty sheet name")]
    EmptySheet,

    #[error("invalid A1 coordinate: {0:?}")]
    InvalidCoordinate(String),
}
