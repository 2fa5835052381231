//! Cell and column reference arithmetic.
//!
//! Everything here is 1-based, matching the automation surface: row 1 is
//! the first row and column 1 is `A`. Letter labels cover the two-letter
//! range only (`A`..=`ZZ`, 1..=702); numeric column references beyond that
//! still work, they just have no letter form.

use std::fmt;

use crate::error::{AutomationError, Result};

/// Highest column number with a letter label (`ZZ`).
pub const MAX_LETTER_COLUMN: u32 = 702;

/// Converts a 1-based column number to its letter label (`1` is `A`,
/// `28` is `AB`).
pub fn column_letters(number: u32) -> Result<String> {
    if number == 0 || number > MAX_LETTER_COLUMN {
        return Err(AutomationError::ColumnOutOfRange(number));
    }
    let mut letters = String::with_capacity(2);
    if number > 26 {
        letters.push(letter((number - 1) / 26));
        letters.push(letter((number - 1) % 26 + 1));
    } else {
        letters.push(letter(number));
    }
    Ok(letters)
}

fn letter(index: u32) -> char {
    debug_assert!((1..=26).contains(&index));
    (b'A' + index as u8 - 1) as char
}

/// Converts a column label to its 1-based number, case-insensitively
/// (`"A"` is 1, `"ab"` is 28). A string of digits is passed through as a
/// plain column number, so callers can accept letters or a number in one
/// argument.
pub fn column_number(text: &str) -> Result<u32> {
    let invalid = || AutomationError::InvalidReference(text.to_string());
    let trimmed = text.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let number: u32 = trimmed.parse().map_err(|_| invalid())?;
        if number == 0 {
            return Err(invalid());
        }
        return Ok(number);
    }
    let value = |c: u8| u32::from(c.to_ascii_uppercase() - b'A') + 1;
    match trimmed.as_bytes() {
        [c] if c.is_ascii_alphabetic() => Ok(value(*c)),
        [hi, lo] if hi.is_ascii_alphabetic() && lo.is_ascii_alphabetic() => {
            Ok(value(*hi) * 26 + value(*lo))
        }
        _ => Err(invalid()),
    }
}

/// A single cell position, 1-based in both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    /// Row number.
    pub row: u32,
    /// Column number.
    pub column: u32,
}

impl CellRef {
    /// Creates a reference from 1-based row and column numbers.
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Parses an `A1`-style reference such as `"B4"` or `"ac32"`.
    ///
    /// The input is trimmed, then split into a leading letter run and a
    /// trailing digit run; both runs must be present and together consume
    /// the whole string, so `"4B"`, `"B4X"`, and `""` are all rejected.
    pub fn parse(location: &str) -> Result<Self> {
        let invalid = || AutomationError::InvalidReference(location.to_string());
        let trimmed = location.trim();
        let letters_len = trimmed
            .bytes()
            .take_while(|b| b.is_ascii_alphabetic())
            .count();
        let (letters, digits) = trimmed.split_at(letters_len);
        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let column = column_number(letters).map_err(|_| invalid())?;
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }
        Ok(Self { row, column })
    }
}

impl fmt::Display for CellRef {
    /// Renders in `A1` form while the column has a letter label, falling
    /// back to `R{row}C{column}` notation beyond `ZZ`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match column_letters(self.column) {
            Ok(letters) => write!(f, "{}{}", letters, self.row),
            Err(_) => write!(f, "R{}C{}", self.row, self.column),
        }
    }
}

/// A column argument accepted as either letters or a 1-based number, so a
/// call site can say `ws.value(4, "B")` or `ws.value(4, 2)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnRef {
    /// 1-based column number.
    Number(u32),
    /// Letter label, e.g. `"AC"`.
    Letters(String),
}

impl ColumnRef {
    /// Resolves to the 1-based column number.
    pub fn resolve(&self) -> Result<u32> {
        match self {
            ColumnRef::Number(0) => Err(AutomationError::InvalidReference("0".into())),
            ColumnRef::Number(number) => Ok(*number),
            ColumnRef::Letters(letters) => column_number(letters),
        }
    }
}

impl From<u32> for ColumnRef {
    fn from(number: u32) -> Self {
        ColumnRef::Number(number)
    }
}

impl From<&str> for ColumnRef {
    fn from(letters: &str) -> Self {
        ColumnRef::Letters(letters.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(letters: String) -> Self {
        ColumnRef::Letters(letters)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Number(number) => write!(f, "{number}"),
            ColumnRef::Letters(letters) => f.write_str(letters),
        }
    }
}

/// Builds the relative `R1C1` fragment pointing from a base cell to a
/// target cell, e.g. `"R[-2]C[-3]"`. An axis with zero offset keeps its
/// letter but drops the bracket, so a same-row reference renders as
/// `"RC[-1]"` and the cell itself as `"RC"`.
pub fn relative_formula(
    base_row: u32,
    base_column: impl Into<ColumnRef>,
    target_row: u32,
    target_column: impl Into<ColumnRef>,
) -> Result<String> {
    let base = base_column.into().resolve()?;
    let target = target_column.into().resolve()?;
    let rows = i64::from(target_row) - i64::from(base_row);
    let columns = i64::from(target) - i64::from(base);

    let mut fragment = String::from("R");
    if rows != 0 {
        fragment.push_str(&format!("[{rows}]"));
    }
    fragment.push('C');
    if columns != 0 {
        fragment.push_str(&format!("[{columns}]"));
    }
    Ok(fragment)
}
