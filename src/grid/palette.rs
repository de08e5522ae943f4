//! The fixed color palette.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pixel color. Discriminants are the codes stored in the database and sent
/// to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Color {
    Black = 1,
    White = 2,
    Red = 3,
    Green = 4,
    Blue = 5,
    Yellow = 6,
    Purple = 7,
    Orange = 8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color '{0}'")]
pub struct UnknownColor(pub String);

impl Color {
    pub const ALL: [Color; 8] = [
        Color::Black,
        Color::White,
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Yellow,
        Color::Purple,
        Color::Orange,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: i64) -> Option<Color> {
        Color::ALL.into_iter().find(|c| i64::from(c.code()) == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::White => "white",
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Yellow => "yellow",
            Color::Purple => "purple",
            Color::Orange => "orange",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Color {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownColor(s.to_string()))
    }
}

impl ToSql for Color {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(self.code())))
    }
}

impl FromSql for Color {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_i64()?;
        Color::from_code(code).ok_or(FromSqlError::OutOfRange(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_and_codes() {
        assert_eq!("white".parse::<Color>().unwrap(), Color::White);
        assert_eq!(Color::White.code(), 2);
        assert_eq!(Color::from_code(8), Some(Color::Orange));
        assert_eq!(Color::from_code(0), None);
        assert_eq!(Color::from_code(9), None);
    }

    #[test]
    fn test_unknown_names_rejected() {
        assert!("White".parse::<Color>().is_err());
        assert!("magenta".parse::<Color>().is_err());
        assert_eq!(
            "".parse::<Color>().unwrap_err().to_string(),
            "invalid color ''"
        );
    }

    #[test]
    fn test_sql_round_trip_rejects_out_of_palette_codes() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let red: Color = conn
            .query_row("SELECT ?1", [Color::Red], |row| row.get(0))
            .unwrap();
        assert_eq!(red, Color::Red);

        let bad: rusqlite::Result<Color> = conn.query_row("SELECT 42", [], |row| row.get(0));
        assert!(bad.is_err());
    }
}
