//! The automation boundary: opaque handles, lookup references, and the
//! [`Automation`] trait every backend implements.

use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::reference::ColumnRef;
use crate::style::{
    BorderSide, BorderSpec, FontSpec, FormatSpec, MatchMode, SaveFormat, SearchDirection,
    SearchOrder, SortOrder,
};
use crate::value::Value;

/// Opaque backend handle to an open workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkbookId(pub u64);

/// Opaque backend handle to a worksheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SheetId(pub u64);

/// Opaque backend handle to a cell region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeId(pub u64);

/// Opaque backend handle to an inserted picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PictureId(pub u64);

/// Addresses a workbook or worksheet by name or 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    /// By name, e.g. `"Sheet1"` or `"report.xlsx"`.
    Name(String),
    /// By 1-based collection position.
    Index(u32),
}

impl From<&str> for ObjectRef {
    fn from(name: &str) -> Self {
        ObjectRef::Name(name.to_string())
    }
}

impl From<String> for ObjectRef {
    fn from(name: String) -> Self {
        ObjectRef::Name(name)
    }
}

impl From<u32> for ObjectRef {
    fn from(index: u32) -> Self {
        ObjectRef::Index(index)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Name(name) => write!(f, "'{name}'"),
            ObjectRef::Index(index) => write!(f, "#{index}"),
        }
    }
}

/// Where a new or moved worksheet lands in its workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetPosition {
    /// Immediately before the given sheet.
    Before(SheetId),
    /// Immediately after the given sheet.
    After(SheetId),
    /// Wherever the application puts sheets when not told otherwise.
    Default,
}

/// Criteria for a find call.
#[derive(Debug, Clone, PartialEq)]
pub struct FindSpec {
    /// Value to look for, matched against displayed cell values.
    pub what: Value,
    /// Whole-cell or substring matching.
    pub match_mode: MatchMode,
    /// Row-by-row or column-by-column traversal.
    pub order: SearchOrder,
    /// Forward or backward traversal.
    pub direction: SearchDirection,
}

impl FindSpec {
    /// A whole-cell, by-rows, forward search for `what`.
    pub fn new(what: impl Into<Value>) -> Self {
        Self {
            what: what.into(),
            match_mode: MatchMode::Whole,
            order: SearchOrder::ByRows,
            direction: SearchDirection::Forward,
        }
    }

    /// Allows substring matches.
    pub fn partial(mut self) -> Self {
        self.match_mode = MatchMode::Part;
        self
    }

    /// Walks column-by-column instead of row-by-row.
    pub fn by_columns(mut self) -> Self {
        self.order = SearchOrder::ByColumns;
        self
    }

    /// Walks backward instead of forward.
    pub fn backward(mut self) -> Self {
        self.direction = SearchDirection::Backward;
        self
    }
}

/// One sort key: a column and its direction. The column is the sheet
/// column holding the key, not an offset into the sorted region.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    /// Column holding the key, as letters or a 1-based number.
    pub column: ColumnRef,
    /// Ascending or descending.
    pub order: SortOrder,
}

impl SortKey {
    /// Ascending key on `column`.
    pub fn ascending(column: impl Into<ColumnRef>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Ascending,
        }
    }

    /// Descending key on `column`.
    pub fn descending(column: impl Into<ColumnRef>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Descending,
        }
    }
}

/// One spreadsheet application session, driven entirely through handles.
///
/// Backends hand out opaque ids for workbooks, worksheets, and ranges.
/// An id stays valid until the object behind it goes away (a closed
/// workbook invalidates its sheets and ranges); using a stale id fails
/// with [`AutomationError::NotFound`]. Two ids are never required to be
/// equal just because they resolve to the same object, so callers that
/// need identity must compare names or positions instead.
///
/// Methods take `&mut self` because sessions talk to a single external
/// application instance and calls are inherently serialized.
///
/// [`AutomationError::NotFound`]: crate::error::AutomationError::NotFound
pub trait Automation {
    // -- application --

    /// Whether the application window is visible.
    fn visible(&mut self) -> Result<bool>;

    /// Shows or hides the application window.
    fn set_visible(&mut self, visible: bool) -> Result<()>;

    /// Enables or disables blocking alert dialogs. With alerts disabled
    /// the application picks the default answer silently, which makes
    /// closing discard unsaved changes.
    fn set_display_alerts(&mut self, enabled: bool) -> Result<()>;

    /// The caller-set status bar text, or `None` while the application
    /// controls the bar itself.
    fn status_text(&mut self) -> Result<Option<String>>;

    /// Sets the status bar text; `None` gives control of the bar back to
    /// the application.
    fn set_status_text(&mut self, text: Option<&str>) -> Result<()>;

    /// Whether the status bar is shown at all.
    fn status_bar_visible(&mut self) -> Result<bool>;

    /// Shows or hides the status bar.
    fn set_status_bar_visible(&mut self, visible: bool) -> Result<()>;

    /// Exits the application. Every outstanding id is dead afterwards.
    fn quit(&mut self) -> Result<()>;

    // -- workbooks --

    /// Number of open workbooks.
    fn workbook_count(&mut self) -> Result<u32>;

    /// Resolves a workbook by name or position.
    fn workbook(&mut self, reference: &ObjectRef) -> Result<WorkbookId>;

    /// Creates a workbook with the application's default sheets.
    fn add_workbook(&mut self) -> Result<WorkbookId>;

    /// Opens a workbook file, optionally decrypting it with a password.
    fn open_workbook(&mut self, path: &Path, password: Option<&str>) -> Result<WorkbookId>;

    /// The workbook's current name. Saved workbooks are named after their
    /// file, extension included.
    fn workbook_name(&mut self, workbook: WorkbookId) -> Result<String>;

    /// Brings the workbook to the front.
    fn activate_workbook(&mut self, workbook: WorkbookId) -> Result<()>;

    /// Saves the workbook to `path` in the given format, optionally
    /// protecting it with a password. Renames the workbook to the file
    /// name as a side effect.
    fn save_workbook(
        &mut self,
        workbook: WorkbookId,
        path: &Path,
        format: SaveFormat,
        password: Option<&str>,
    ) -> Result<()>;

    /// Closes the workbook. With alerts disabled, unsaved changes are
    /// discarded without prompting.
    fn close_workbook(&mut self, workbook: WorkbookId) -> Result<()>;

    // -- worksheets --

    /// Number of worksheets in a workbook.
    fn worksheet_count(&mut self, workbook: WorkbookId) -> Result<u32>;

    /// Resolves a worksheet by name or position. Name lookup is
    /// case-insensitive, matching the application.
    fn worksheet(&mut self, workbook: WorkbookId, reference: &ObjectRef) -> Result<SheetId>;

    /// Creates a worksheet at the given position with an
    /// application-chosen default name.
    fn add_worksheet(&mut self, workbook: WorkbookId, position: SheetPosition) -> Result<SheetId>;

    /// The worksheet's current name.
    fn worksheet_name(&mut self, sheet: SheetId) -> Result<String>;

    /// Renames the worksheet. The application rejects empty names, names
    /// over 31 characters, characters it reserves, and duplicates.
    fn set_worksheet_name(&mut self, sheet: SheetId, name: &str) -> Result<()>;

    /// Brings the worksheet to the front of its workbook.
    fn activate_worksheet(&mut self, sheet: SheetId) -> Result<()>;

    /// Moves the worksheet to the given position in its workbook. A
    /// destination sheet is required; [`SheetPosition::Default`] fails.
    fn move_worksheet(&mut self, sheet: SheetId, position: SheetPosition) -> Result<()>;

    /// Deletes the worksheet. The application refuses to delete the last
    /// sheet of a workbook.
    fn delete_worksheet(&mut self, sheet: SheetId) -> Result<()>;

    // -- geometry --

    /// A single-cell range at 1-based `row` and `column`.
    fn cell(&mut self, sheet: SheetId, row: u32, column: u32) -> Result<RangeId>;

    /// A range from an `A1`-style reference: a cell (`"B4"`), a block
    /// (`"A1:C3"`), whole columns (`"A:C"`), or whole rows (`"2:5"`).
    fn range(&mut self, sheet: SheetId, reference: &str) -> Result<RangeId>;

    /// The range covering every cell of the sheet.
    fn all_cells(&mut self, sheet: SheetId) -> Result<RangeId>;

    /// The range covering one whole column.
    fn column_range(&mut self, sheet: SheetId, column: u32) -> Result<RangeId>;

    /// The range covering one whole row.
    fn row_range(&mut self, sheet: SheetId, row: u32) -> Result<RangeId>;

    /// Row of the range's first cell.
    fn range_row(&mut self, range: RangeId) -> Result<u32>;

    /// Column of the range's first cell.
    fn range_column(&mut self, range: RangeId) -> Result<u32>;

    /// Last occupied row in a column, searching upward from the bottom of
    /// the sheet. An empty column reports 1.
    fn last_row(&mut self, sheet: SheetId, column: u32) -> Result<u32>;

    /// Last occupied column in a row, searching leftward from the right
    /// edge of the sheet. An empty row reports 1.
    fn last_column(&mut self, sheet: SheetId, row: u32) -> Result<u32>;

    /// Width of a column in the application's character units.
    fn column_width(&mut self, sheet: SheetId, column: u32) -> Result<f64>;

    /// Sets the width of a column.
    fn set_column_width(&mut self, sheet: SheetId, column: u32, width: f64) -> Result<()>;

    /// Height of a row in points.
    fn row_height(&mut self, sheet: SheetId, row: u32) -> Result<f64>;

    /// Sets the height of a row.
    fn set_row_height(&mut self, sheet: SheetId, row: u32, height: f64) -> Result<()>;

    /// Inserts a column at the given position, shifting later columns
    /// right.
    fn insert_column(&mut self, sheet: SheetId, column: u32) -> Result<()>;

    /// Deletes a column, shifting later columns left.
    fn delete_column(&mut self, sheet: SheetId, column: u32) -> Result<()>;

    /// Inserts a row at the given position, shifting later rows down.
    fn insert_row(&mut self, sheet: SheetId, row: u32) -> Result<()>;

    /// Deletes a row, shifting later rows up.
    fn delete_row(&mut self, sheet: SheetId, row: u32) -> Result<()>;

    // -- cell data --

    /// The value of the range's first cell.
    fn value(&mut self, range: RangeId) -> Result<Value>;

    /// Sets every cell of the range to `value`.
    fn set_value(&mut self, range: RangeId, value: &Value) -> Result<()>;

    /// The relative `R1C1` formula of the range's first cell. A plain
    /// value cell reports its value rendered as text.
    fn formula(&mut self, range: RangeId) -> Result<String>;

    /// Sets the relative `R1C1` formula of every cell of the range. Text
    /// without a leading `=` is stored as a plain value.
    fn set_formula(&mut self, range: RangeId, formula: &str) -> Result<()>;

    /// Clears values and formulas, leaving formatting in place.
    fn clear_contents(&mut self, range: RangeId) -> Result<()>;

    /// Address of the first hyperlink in the range, or `""` when the
    /// range has none.
    fn hyperlink(&mut self, range: RangeId) -> Result<String>;

    /// Removes every hyperlink in the range.
    fn clear_hyperlinks(&mut self, range: RangeId) -> Result<()>;

    /// Attaches a hyperlink to the range.
    fn add_hyperlink(&mut self, range: RangeId, url: &str) -> Result<()>;

    /// Copies the range to the clipboard.
    fn copy(&mut self, range: RangeId) -> Result<()>;

    /// Pastes the clipboard onto the sheet with its first cell at `at`.
    fn paste(&mut self, sheet: SheetId, at: RangeId) -> Result<()>;

    // -- search and sort --

    /// Finds the first match for `spec` inside `region`, starting after
    /// `after` (after the region's first cell when `None`) and wrapping
    /// around. The criteria are remembered application-wide for
    /// [`Automation::find_next`] and [`Automation::find_previous`].
    fn find(
        &mut self,
        region: RangeId,
        spec: &FindSpec,
        after: Option<RangeId>,
    ) -> Result<Option<RangeId>>;

    /// Continues the most recent find forward from `after`. Fails when no
    /// find has run yet.
    fn find_next(&mut self, region: RangeId, after: RangeId) -> Result<Option<RangeId>>;

    /// Continues the most recent find backward from `before`. Fails when
    /// no find has run yet.
    fn find_previous(&mut self, region: RangeId, before: RangeId) -> Result<Option<RangeId>>;

    /// Sorts the rows of `region` by the given `(column, order)` keys,
    /// earlier keys first. With `has_headers` the first row stays put.
    /// Matching is case-insensitive and empty cells always sort last.
    fn sort(
        &mut self,
        region: RangeId,
        keys: &[(u32, SortOrder)],
        has_headers: bool,
    ) -> Result<()>;

    // -- formatting --

    /// Applies border changes to one edge of the range.
    fn set_border(&mut self, range: RangeId, side: BorderSide, border: &BorderSpec) -> Result<()>;

    /// Applies font changes to the range.
    fn set_font(&mut self, range: RangeId, font: &FontSpec) -> Result<()>;

    /// Applies formatting changes to the range.
    fn set_format(&mut self, range: RangeId, format: &FormatSpec) -> Result<()>;

    // -- pictures --

    /// Inserts a picture file onto the sheet at its natural size.
    fn add_picture(&mut self, sheet: SheetId, path: &Path) -> Result<PictureId>;

    /// Locks or unlocks the picture's aspect ratio.
    fn set_picture_aspect_locked(&mut self, picture: PictureId, locked: bool) -> Result<()>;

    /// Sets the picture's width in points.
    fn set_picture_width(&mut self, picture: PictureId, points: f64) -> Result<()>;

    /// Sets the picture's height in points.
    fn set_picture_height(&mut self, picture: PictureId, points: f64) -> Result<()>;

    /// Scales the picture's width relative to its natural size.
    fn scale_picture_width(&mut self, picture: PictureId, factor: f64) -> Result<()>;

    /// Scales the picture's height relative to its natural size.
    fn scale_picture_height(&mut self, picture: PictureId, factor: f64) -> Result<()>;

    /// Moves the picture so its top-left corner sits on the given range's
    /// first cell.
    fn anchor_picture(&mut self, picture: PictureId, at: RangeId) -> Result<()>;
}
