//! Backend-neutral spreadsheet automation surface.
//!
//! This crate defines everything a spreadsheet backend and its callers
//! agree on without naming a concrete application:
//!
//! - [`api::Automation`], the trait a backend implements, plus the opaque
//!   workbook, worksheet, range, and picture handles it hands out
//! - [`reference`], 1-based cell and column arithmetic (`A1` parsing,
//!   column letters, relative `R1C1` fragments)
//! - [`value::Value`], the cell value union with strict and lenient typed
//!   conversions
//! - [`style`], the formatting specs and the numeric constants behind them
//! - [`fake::FakeExcel`], a full in-memory backend for tests and dry runs
//!
//! Higher-level workbook and worksheet handles live in the `xlhelm`
//! crate; the Windows COM backend lives in `xlhelm-com`.

pub mod api;
pub mod error;
pub mod fake;
pub mod reference;
pub mod style;
pub mod value;

pub use api::{
    Automation, FindSpec, ObjectRef, PictureId, RangeId, SheetId, SheetPosition, SortKey,
    WorkbookId,
};
pub use error::{AutomationError, Result};
pub use fake::FakeExcel;
pub use reference::{column_letters, column_number, relative_formula, CellRef, ColumnRef};
pub use style::{
    BorderSide, BorderSpec, BorderWeight, Color, FontSpec, FormatSpec, HorizontalAlignment,
    LineStyle, MatchMode, PictureScale, PictureSizing, SaveFormat, SearchDirection, SearchOrder,
    SortOrder, VerticalAlignment,
};
pub use value::{FromValue, Value};
