//! In-memory emulation of the automation surface.
//!
//! [`FakeExcel`] implements [`Automation`] without an external
//! application: enough workbook, sheet, and cell behavior for tests and
//! dry runs, including wrap-around find, multi-key sort, and row and
//! column shifting. Formulas are stored but never evaluated.
//!
//! State lives behind an `Rc`, so clones share it. A test typically keeps
//! one clone for inspection while the session drives the other:
//!
//! ```
//! use xlhelm_automation::fake::FakeExcel;
//! use xlhelm_automation::api::Automation;
//!
//! let fake = FakeExcel::new();
//! let mut session = fake.clone();
//! let workbook = session.add_workbook().unwrap();
//! assert_eq!(fake.workbook_names(), vec!["Book1"]);
//! # let _ = workbook;
//! ```

use std::cell::{Ref, RefCell};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::mem;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::api::{
    Automation, FindSpec, ObjectRef, PictureId, RangeId, SheetId, SheetPosition, WorkbookId,
};
use crate::error::{AutomationError, Result};
use crate::reference::{column_number, CellRef};
use crate::style::{
    BorderSide, BorderSpec, Color, FontSpec, FormatSpec, HorizontalAlignment, MatchMode,
    SaveFormat, SearchDirection, SearchOrder, SortOrder, VerticalAlignment,
};
use crate::value::Value;

/// Column width reported for columns that were never resized.
const DEFAULT_COLUMN_WIDTH: f64 = 8.43;

/// Row height reported for rows that were never resized.
const DEFAULT_ROW_HEIGHT: f64 = 15.0;

/// Characters the application reserves in worksheet names.
const RESERVED_NAME_CHARS: [char; 7] = [':', '\\', '/', '?', '*', '[', ']'];

/// Formatting recorded per cell, merged across calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellStyle {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font point size.
    pub font_size: Option<f64>,
    /// Bold flag.
    pub bold: Option<bool>,
    /// Italic flag.
    pub italic: Option<bool>,
    /// Text color.
    pub font_color: Option<Color>,
    /// Named cell style.
    pub style_name: Option<String>,
    /// Horizontal alignment.
    pub horizontal: Option<HorizontalAlignment>,
    /// Vertical alignment.
    pub vertical: Option<VerticalAlignment>,
    /// Number format string.
    pub number_format: Option<String>,
    /// Wrap-text flag.
    pub wrap_text: Option<bool>,
    /// Whether the cell is part of a merged area.
    pub merged: bool,
    /// Background fill color.
    pub fill: Option<Color>,
    /// Borders applied per edge.
    pub borders: HashMap<BorderSide, BorderSpec>,
}

/// Inspection record of one save call.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveCall {
    /// Workbook name at the time of the call.
    pub workbook: String,
    /// Destination path.
    pub path: PathBuf,
    /// File format passed through.
    pub format: SaveFormat,
    /// Password passed through, if any.
    pub password: Option<String>,
}

/// Inspection snapshot of one inserted picture.
#[derive(Debug, Clone, PartialEq)]
pub struct PictureSnapshot {
    /// Source file.
    pub path: PathBuf,
    /// Aspect-ratio lock, if it was ever set.
    pub aspect_locked: Option<bool>,
    /// Fixed width in points, if set.
    pub width: Option<f64>,
    /// Fixed height in points, if set.
    pub height: Option<f64>,
    /// Width scale factor, if set.
    pub width_scale: Option<f64>,
    /// Height scale factor, if set.
    pub height_scale: Option<f64>,
    /// Cell the picture was anchored to, as `(row, column)`.
    pub anchor: Option<(u32, u32)>,
}

#[derive(Debug, Clone, Default)]
struct Cell {
    value: Value,
    formula: Option<String>,
    hyperlink: Option<String>,
    style: CellStyle,
}

fn has_content(cell: &Cell) -> bool {
    !cell.value.is_empty() || cell.formula.is_some()
}

#[derive(Debug)]
struct Sheet {
    id: u64,
    name: String,
    cells: HashMap<(u32, u32), Cell>,
    column_widths: HashMap<u32, f64>,
    row_heights: HashMap<u32, f64>,
}

impl Sheet {
    fn new(id: u64, name: String) -> Self {
        Self {
            id,
            name,
            cells: HashMap::new(),
            column_widths: HashMap::new(),
            row_heights: HashMap::new(),
        }
    }
}

#[derive(Debug)]
struct Workbook {
    id: u64,
    name: String,
    sheets: Vec<Sheet>,
    sheet_seq: u32,
    active_sheet: Option<u64>,
}

impl Workbook {
    fn index_of(&self, sheet: SheetId) -> Result<usize> {
        self.sheets
            .iter()
            .position(|s| s.id == sheet.0)
            .ok_or_else(|| AutomationError::not_found("worksheet handle", sheet.0))
    }
}

#[derive(Debug)]
struct Picture {
    id: u64,
    sheet: u64,
    state: PictureSnapshot,
}

/// Region shapes a range id can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Area {
    Cells { r1: u32, c1: u32, r2: u32, c2: u32 },
    Columns { c1: u32, c2: u32 },
    Rows { r1: u32, r2: u32 },
    Sheet,
}

#[derive(Debug, Clone, Copy)]
struct RangeObject {
    sheet: u64,
    area: Area,
}

fn first_cell(area: Area) -> (u32, u32) {
    match area {
        Area::Cells { r1, c1, .. } => (r1, c1),
        Area::Columns { c1, .. } => (1, c1),
        Area::Rows { r1, .. } => (r1, 1),
        Area::Sheet => (1, 1),
    }
}

fn used_extent(sheet: &Sheet) -> (u32, u32) {
    sheet
        .cells
        .iter()
        .filter(|(_, cell)| has_content(cell))
        .fold((0, 0), |(mr, mc), (&(r, c), _)| (mr.max(r), mc.max(c)))
}

/// Concrete 1-based bounds of an area, with unbounded axes clamped to the
/// sheet's occupied extent so scans stay finite.
fn area_bounds(sheet: &Sheet, area: Area) -> (u32, u32, u32, u32) {
    let (used_r, used_c) = used_extent(sheet);
    match area {
        Area::Cells { r1, c1, r2, c2 } => (r1, c1, r2, c2),
        Area::Columns { c1, c2 } => (1, c1, used_r.max(1), c2),
        Area::Rows { r1, r2 } => (r1, 1, r2, used_c.max(1)),
        Area::Sheet => (1, 1, used_r.max(1), used_c.max(1)),
    }
}

enum Side {
    Cell(CellRef),
    Column(u32),
    Row(u32),
}

fn parse_side(text: &str) -> Result<Side> {
    let invalid = || AutomationError::InvalidReference(text.to_string());
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }
    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let row: u32 = trimmed.parse().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }
        return Ok(Side::Row(row));
    }
    if trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Ok(Side::Column(column_number(trimmed)?));
    }
    Ok(Side::Cell(CellRef::parse(trimmed)?))
}

/// Parses the `A1`-style reference forms the application accepts: a cell,
/// a cell block, whole columns, or whole rows.
fn parse_area(reference: &str) -> Result<Area> {
    let invalid = || AutomationError::InvalidReference(reference.to_string());
    let Some((left, right)) = reference.split_once(':') else {
        let cell = CellRef::parse(reference)?;
        return Ok(Area::Cells {
            r1: cell.row,
            c1: cell.column,
            r2: cell.row,
            c2: cell.column,
        });
    };
    let left = parse_side(left).map_err(|_| invalid())?;
    let right = parse_side(right).map_err(|_| invalid())?;
    match (left, right) {
        (Side::Cell(a), Side::Cell(b)) => Ok(Area::Cells {
            r1: a.row.min(b.row),
            c1: a.column.min(b.column),
            r2: a.row.max(b.row),
            c2: a.column.max(b.column),
        }),
        (Side::Column(a), Side::Column(b)) => Ok(Area::Columns {
            c1: a.min(b),
            c2: a.max(b),
        }),
        (Side::Row(a), Side::Row(b)) => Ok(Area::Rows {
            r1: a.min(b),
            r2: a.max(b),
        }),
        _ => Err(invalid()),
    }
}

#[derive(Debug)]
struct State {
    next_id: u64,
    visible: bool,
    display_alerts: bool,
    status_text: Option<String>,
    status_bar_visible: bool,
    quit: bool,
    active_workbook: Option<u64>,
    workbooks: Vec<Workbook>,
    ranges: HashMap<u64, RangeObject>,
    pictures: Vec<Picture>,
    clipboard: Option<Vec<Vec<Option<Cell>>>>,
    last_find: Option<FindSpec>,
    saves: Vec<SaveCall>,
    book_seq: u32,
}

impl Default for State {
    fn default() -> Self {
        State::new()
    }
}

impl State {
    // Alerts and the status bar both start enabled in a fresh application.
    fn new() -> Self {
        Self {
            next_id: 0,
            visible: false,
            display_alerts: true,
            status_text: None,
            status_bar_visible: true,
            quit: false,
            active_workbook: None,
            workbooks: Vec::new(),
            ranges: HashMap::new(),
            pictures: Vec::new(),
            clipboard: None,
            last_find: None,
            saves: Vec::new(),
            book_seq: 0,
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn workbook(&self, id: WorkbookId) -> Result<&Workbook> {
        self.workbooks
            .iter()
            .find(|wb| wb.id == id.0)
            .ok_or_else(|| AutomationError::not_found("workbook handle", id.0))
    }

    fn workbook_mut(&mut self, id: WorkbookId) -> Result<&mut Workbook> {
        self.workbooks
            .iter_mut()
            .find(|wb| wb.id == id.0)
            .ok_or_else(|| AutomationError::not_found("workbook handle", id.0))
    }

    fn sheet_raw(&self, raw: u64) -> Result<&Sheet> {
        self.workbooks
            .iter()
            .flat_map(|wb| wb.sheets.iter())
            .find(|s| s.id == raw)
            .ok_or_else(|| AutomationError::not_found("worksheet handle", raw))
    }

    fn sheet_raw_mut(&mut self, raw: u64) -> Result<&mut Sheet> {
        self.workbooks
            .iter_mut()
            .flat_map(|wb| wb.sheets.iter_mut())
            .find(|s| s.id == raw)
            .ok_or_else(|| AutomationError::not_found("worksheet handle", raw))
    }

    fn owning_workbook_mut(&mut self, raw: u64) -> Result<&mut Workbook> {
        self.workbooks
            .iter_mut()
            .find(|wb| wb.sheets.iter().any(|s| s.id == raw))
            .ok_or_else(|| AutomationError::not_found("worksheet handle", raw))
    }

    fn range_object(&self, id: RangeId) -> Result<RangeObject> {
        self.ranges
            .get(&id.0)
            .copied()
            .ok_or_else(|| AutomationError::not_found("range handle", id.0))
    }

    fn register_range(&mut self, sheet: u64, area: Area) -> RangeId {
        let id = self.next_id();
        self.ranges.insert(id, RangeObject { sheet, area });
        RangeId(id)
    }

    fn picture_mut(&mut self, id: PictureId) -> Result<&mut Picture> {
        self.pictures
            .iter_mut()
            .find(|p| p.id == id.0)
            .ok_or_else(|| AutomationError::not_found("picture handle", id.0))
    }

    fn new_workbook(&mut self, name: String, sheet_count: u32) -> u64 {
        let id = self.next_id();
        let mut sheets = Vec::new();
        for n in 1..=sheet_count {
            let sheet_id = self.next_id();
            sheets.push(Sheet::new(sheet_id, format!("Sheet{n}")));
        }
        self.workbooks.push(Workbook {
            id,
            name,
            sheets,
            sheet_seq: sheet_count + 1,
            active_sheet: None,
        });
        id
    }

}

fn match_value(cell: Option<&Cell>, needle: &str, mode: MatchMode) -> bool {
    let shown = cell
        .map(|c| c.value.to_string().to_lowercase())
        .unwrap_or_default();
    match mode {
        MatchMode::Whole => shown == needle,
        MatchMode::Part => shown.contains(needle),
    }
}

/// Walks the region from `start`, wrapping around so `start` itself is
/// examined last, and returns the first matching position.
fn scan_region(
    sheet: &Sheet,
    bounds: (u32, u32, u32, u32),
    spec: &FindSpec,
    start: (u32, u32),
    forward: bool,
) -> Result<Option<(u32, u32)>> {
    let (r1, c1, r2, c2) = bounds;
    let mut order = Vec::new();
    match spec.order {
        SearchOrder::ByRows => {
            for r in r1..=r2 {
                for c in c1..=c2 {
                    order.push((r, c));
                }
            }
        }
        SearchOrder::ByColumns => {
            for c in c1..=c2 {
                for r in r1..=r2 {
                    order.push((r, c));
                }
            }
        }
    }
    let Some(start_index) = order.iter().position(|p| *p == start) else {
        return Err(AutomationError::call_failed(
            "Find",
            "start cell is outside the search range",
        ));
    };
    let needle = spec.what.to_string().to_lowercase();
    let len = order.len();
    for step in 1..=len {
        let index = if forward {
            (start_index + step) % len
        } else {
            (start_index + len - step) % len
        };
        let (r, c) = order[index];
        if match_value(sheet.cells.get(&(r, c)), &needle, spec.match_mode) {
            return Ok(Some((r, c)));
        }
    }
    Ok(None)
}

fn value_rank(value: &Value) -> u8 {
    match value {
        Value::Number(_) => 0,
        Value::Text(_) => 1,
        Value::Bool(_) => 2,
        Value::Empty => 3,
    }
}

/// Compares two cell values for sorting. Empty cells sink to the end in
/// both directions, matching the application.
fn compare_values(a: &Value, b: &Value, order: SortOrder) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    let ordering = match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Text(x), Value::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => value_rank(a).cmp(&value_rank(b)),
    };
    match order {
        SortOrder::Ascending => ordering,
        SortOrder::Descending => ordering.reverse(),
    }
}

fn sort_rows(
    sheet: &mut Sheet,
    bounds: (u32, u32, u32, u32),
    keys: &[(u32, SortOrder)],
    has_headers: bool,
) {
    let (r1, c1, r2, c2) = bounds;
    let data_start = if has_headers { r1 + 1 } else { r1 };
    if data_start > r2 {
        return;
    }
    let width = (c2 - c1 + 1) as usize;
    let mut loads: Vec<Vec<Option<Cell>>> = Vec::new();
    for r in data_start..=r2 {
        let mut row = Vec::with_capacity(width);
        for c in c1..=c2 {
            row.push(sheet.cells.remove(&(r, c)));
        }
        loads.push(row);
    }
    loads.sort_by(|a, b| {
        for (column, order) in keys {
            let index = (column - c1) as usize;
            let empty = Value::Empty;
            let left = a[index].as_ref().map(|c| &c.value).unwrap_or(&empty);
            let right = b[index].as_ref().map(|c| &c.value).unwrap_or(&empty);
            let ordering = compare_values(left, right, *order);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    for (offset, row) in loads.into_iter().enumerate() {
        let r = data_start + offset as u32;
        for (i, cell) in row.into_iter().enumerate() {
            if let Some(cell) = cell {
                sheet.cells.insert((r, c1 + i as u32), cell);
            }
        }
    }
}

fn remap_cells(sheet: &mut Sheet, f: impl Fn(u32, u32) -> Option<(u32, u32)>) {
    let cells = mem::take(&mut sheet.cells);
    sheet.cells = cells
        .into_iter()
        .filter_map(|((r, c), cell)| f(r, c).map(|key| (key, cell)))
        .collect();
}

fn remap_axis(map: &mut HashMap<u32, f64>, f: impl Fn(u32) -> Option<u32>) {
    let entries = mem::take(map);
    *map = entries
        .into_iter()
        .filter_map(|(k, v)| f(k).map(|k| (k, v)))
        .collect();
}

fn parse_literal(text: &str) -> Value {
    if let Ok(number) = text.trim().parse::<f64>() {
        return Value::Number(number);
    }
    if text.trim().eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if text.trim().eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    Value::Text(text.to_string())
}

/// An in-memory [`Automation`] backend. See the module docs.
#[derive(Debug, Clone, Default)]
pub struct FakeExcel {
    state: Rc<RefCell<State>>,
}

impl FakeExcel {
    /// A fresh application with no open workbooks, hidden, with alerts
    /// enabled, mirroring a newly launched instance.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Ref<'_, State> {
        self.state.borrow()
    }

    // -- inspection --

    /// Whether the application window is visible.
    pub fn is_visible(&self) -> bool {
        self.state().visible
    }

    /// Whether alert dialogs are enabled.
    pub fn alerts_enabled(&self) -> bool {
        self.state().display_alerts
    }

    /// Whether the application has been quit.
    pub fn is_quit(&self) -> bool {
        self.state().quit
    }

    /// Names of the open workbooks, in collection order.
    pub fn workbook_names(&self) -> Vec<String> {
        self.state().workbooks.iter().map(|wb| wb.name.clone()).collect()
    }

    /// Sheet names of a workbook, in tab order. `None` when no workbook
    /// has that name.
    pub fn sheet_names(&self, workbook: &str) -> Option<Vec<String>> {
        let state = self.state();
        let wb = state.workbooks.iter().find(|wb| wb.name == workbook)?;
        Some(wb.sheets.iter().map(|s| s.name.clone()).collect())
    }

    /// Name of the active workbook, if any was activated.
    pub fn active_workbook_name(&self) -> Option<String> {
        let state = self.state();
        let active = state.active_workbook?;
        state
            .workbooks
            .iter()
            .find(|wb| wb.id == active)
            .map(|wb| wb.name.clone())
    }

    /// Name of a workbook's active sheet, if any was activated.
    pub fn active_sheet_name(&self, workbook: &str) -> Option<String> {
        let state = self.state();
        let wb = state.workbooks.iter().find(|wb| wb.name == workbook)?;
        let active = wb.active_sheet?;
        wb.sheets.iter().find(|s| s.id == active).map(|s| s.name.clone())
    }

    fn with_cell<T>(
        &self,
        workbook: &str,
        sheet: &str,
        cell: &str,
        read: impl FnOnce(Option<&Cell>) -> T,
    ) -> Option<T> {
        let state = self.state();
        let wb = state.workbooks.iter().find(|wb| wb.name == workbook)?;
        let sheet = wb.sheets.iter().find(|s| s.name == sheet)?;
        let at = CellRef::parse(cell).ok()?;
        Some(read(sheet.cells.get(&(at.row, at.column))))
    }

    /// Value at a cell. `None` when the workbook, sheet, or reference is
    /// wrong; an existing but empty cell reads as `Some(Value::Empty)`.
    pub fn value_at(&self, workbook: &str, sheet: &str, cell: &str) -> Option<Value> {
        self.with_cell(workbook, sheet, cell, |c| {
            c.map(|c| c.value.clone()).unwrap_or_default()
        })
    }

    /// Stored formula at a cell, if one was set.
    pub fn formula_at(&self, workbook: &str, sheet: &str, cell: &str) -> Option<String> {
        self.with_cell(workbook, sheet, cell, |c| c.and_then(|c| c.formula.clone()))?
    }

    /// Hyperlink at a cell, if one is attached.
    pub fn hyperlink_at(&self, workbook: &str, sheet: &str, cell: &str) -> Option<String> {
        self.with_cell(workbook, sheet, cell, |c| c.and_then(|c| c.hyperlink.clone()))?
    }

    /// Accumulated formatting at a cell. `None` when nothing has touched
    /// the cell yet.
    pub fn style_at(&self, workbook: &str, sheet: &str, cell: &str) -> Option<CellStyle> {
        self.with_cell(workbook, sheet, cell, |c| c.map(|c| c.style.clone()))?
    }

    /// Pictures inserted on a sheet, in insertion order.
    pub fn pictures_on(&self, workbook: &str, sheet: &str) -> Vec<PictureSnapshot> {
        let state = self.state();
        let Some(wb) = state.workbooks.iter().find(|wb| wb.name == workbook) else {
            return Vec::new();
        };
        let Some(sheet) = wb.sheets.iter().find(|s| s.name == sheet) else {
            return Vec::new();
        };
        state
            .pictures
            .iter()
            .filter(|p| p.sheet == sheet.id)
            .map(|p| p.state.clone())
            .collect()
    }

    /// Every save call recorded so far, oldest first.
    pub fn saves(&self) -> Vec<SaveCall> {
        self.state().saves.clone()
    }
}

impl Automation for FakeExcel {
    fn visible(&mut self) -> Result<bool> {
        Ok(self.state().visible)
    }

    fn set_visible(&mut self, visible: bool) -> Result<()> {
        self.state.borrow_mut().visible = visible;
        Ok(())
    }

    fn set_display_alerts(&mut self, enabled: bool) -> Result<()> {
        self.state.borrow_mut().display_alerts = enabled;
        Ok(())
    }

    fn status_text(&mut self) -> Result<Option<String>> {
        Ok(self.state().status_text.clone())
    }

    fn set_status_text(&mut self, text: Option<&str>) -> Result<()> {
        self.state.borrow_mut().status_text = text.map(str::to_string);
        Ok(())
    }

    fn status_bar_visible(&mut self) -> Result<bool> {
        Ok(self.state().status_bar_visible)
    }

    fn set_status_bar_visible(&mut self, visible: bool) -> Result<()> {
        self.state.borrow_mut().status_bar_visible = visible;
        Ok(())
    }

    fn quit(&mut self) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        state.quit = true;
        state.workbooks.clear();
        state.ranges.clear();
        state.pictures.clear();
        Ok(())
    }

    fn workbook_count(&mut self) -> Result<u32> {
        Ok(self.state().workbooks.len() as u32)
    }

    fn workbook(&mut self, reference: &ObjectRef) -> Result<WorkbookId> {
        let state = self.state();
        let found = match reference {
            ObjectRef::Name(name) => state
                .workbooks
                .iter()
                .find(|wb| wb.name.eq_ignore_ascii_case(name)),
            ObjectRef::Index(index) => (*index)
                .checked_sub(1)
                .and_then(|i| state.workbooks.get(i as usize)),
        };
        found
            .map(|wb| WorkbookId(wb.id))
            .ok_or_else(|| AutomationError::not_found("workbook", reference))
    }

    fn add_workbook(&mut self) -> Result<WorkbookId> {
        let state = &mut *self.state.borrow_mut();
        state.book_seq += 1;
        let name = format!("Book{}", state.book_seq);
        // New workbooks come with the application's stock of three sheets.
        let id = state.new_workbook(name, 3);
        Ok(WorkbookId(id))
    }

    fn open_workbook(&mut self, path: &Path, password: Option<&str>) -> Result<WorkbookId> {
        let _ = password;
        if !path.exists() {
            return Err(AutomationError::not_found("workbook file", path.display()));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AutomationError::InvalidReference(path.display().to_string()))?;
        let state = &mut *self.state.borrow_mut();
        if state
            .workbooks
            .iter()
            .any(|wb| wb.name.eq_ignore_ascii_case(&name))
        {
            return Err(AutomationError::call_failed(
                "Open",
                format!("a workbook named {name:?} is already open"),
            ));
        }
        let id = state.new_workbook(name, 1);
        Ok(WorkbookId(id))
    }

    fn workbook_name(&mut self, workbook: WorkbookId) -> Result<String> {
        Ok(self.state().workbook(workbook)?.name.clone())
    }

    fn activate_workbook(&mut self, workbook: WorkbookId) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        state.workbook(workbook)?;
        state.active_workbook = Some(workbook.0);
        Ok(())
    }

    fn save_workbook(
        &mut self,
        workbook: WorkbookId,
        path: &Path,
        format: SaveFormat,
        password: Option<&str>,
    ) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let new_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AutomationError::InvalidReference(path.display().to_string()))?;
        let clash = state
            .workbooks
            .iter()
            .any(|wb| wb.id != workbook.0 && wb.name.eq_ignore_ascii_case(&new_name));
        if clash {
            return Err(AutomationError::call_failed(
                "SaveAs",
                format!("a workbook named {new_name:?} is already open"),
            ));
        }
        let wb = state.workbook_mut(workbook)?;
        let call = SaveCall {
            workbook: wb.name.clone(),
            path: path.to_path_buf(),
            format,
            password: password.map(str::to_string),
        };
        // Saving renames the workbook to its file name.
        wb.name = new_name;
        state.saves.push(call);
        Ok(())
    }

    fn close_workbook(&mut self, workbook: WorkbookId) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        state.workbook(workbook)?;
        state.workbooks.retain(|wb| wb.id != workbook.0);
        if state.active_workbook == Some(workbook.0) {
            state.active_workbook = None;
        }
        Ok(())
    }

    fn worksheet_count(&mut self, workbook: WorkbookId) -> Result<u32> {
        Ok(self.state().workbook(workbook)?.sheets.len() as u32)
    }

    fn worksheet(&mut self, workbook: WorkbookId, reference: &ObjectRef) -> Result<SheetId> {
        let state = self.state();
        let wb = state.workbook(workbook)?;
        let found = match reference {
            ObjectRef::Name(name) => wb.sheets.iter().find(|s| s.name.eq_ignore_ascii_case(name)),
            ObjectRef::Index(index) => {
                (*index).checked_sub(1).and_then(|i| wb.sheets.get(i as usize))
            }
        };
        found
            .map(|s| SheetId(s.id))
            .ok_or_else(|| AutomationError::not_found("worksheet", reference))
    }

    fn add_worksheet(&mut self, workbook: WorkbookId, position: SheetPosition) -> Result<SheetId> {
        let state = &mut *self.state.borrow_mut();
        let id = state.next_id();
        let wb = state.workbook_mut(workbook)?;
        let name = loop {
            let candidate = format!("Sheet{}", wb.sheet_seq);
            wb.sheet_seq += 1;
            if !wb
                .sheets
                .iter()
                .any(|s| s.name.eq_ignore_ascii_case(&candidate))
            {
                break candidate;
            }
        };
        let index = match position {
            SheetPosition::Before(anchor) => wb.index_of(anchor)?,
            SheetPosition::After(anchor) => wb.index_of(anchor)? + 1,
            // Unconstrained adds land in front, like the application with
            // the first sheet active.
            SheetPosition::Default => 0,
        };
        wb.sheets.insert(index, Sheet::new(id, name));
        Ok(SheetId(id))
    }

    fn worksheet_name(&mut self, sheet: SheetId) -> Result<String> {
        Ok(self.state().sheet_raw(sheet.0)?.name.clone())
    }

    fn set_worksheet_name(&mut self, sheet: SheetId, name: &str) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let wb = state.owning_workbook_mut(sheet.0)?;
        if name.is_empty() {
            return Err(AutomationError::call_failed(
                "Rename",
                "worksheet name cannot be empty",
            ));
        }
        if name.chars().count() > 31 {
            return Err(AutomationError::call_failed(
                "Rename",
                format!("worksheet name is longer than 31 characters: {name:?}"),
            ));
        }
        if name.contains(&RESERVED_NAME_CHARS[..]) {
            return Err(AutomationError::call_failed(
                "Rename",
                format!("worksheet name contains a reserved character: {name:?}"),
            ));
        }
        let taken = wb
            .sheets
            .iter()
            .any(|s| s.id != sheet.0 && s.name.eq_ignore_ascii_case(name));
        if taken {
            return Err(AutomationError::call_failed(
                "Rename",
                format!("a worksheet named {name:?} already exists"),
            ));
        }
        let index = wb.index_of(sheet)?;
        wb.sheets[index].name = name.to_string();
        Ok(())
    }

    fn activate_worksheet(&mut self, sheet: SheetId) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let wb = state.owning_workbook_mut(sheet.0)?;
        wb.active_sheet = Some(sheet.0);
        Ok(())
    }

    fn move_worksheet(&mut self, sheet: SheetId, position: SheetPosition) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let wb = state.owning_workbook_mut(sheet.0)?;
        let (anchor, before) = match position {
            SheetPosition::Before(anchor) => (anchor, true),
            SheetPosition::After(anchor) => (anchor, false),
            SheetPosition::Default => {
                return Err(AutomationError::call_failed(
                    "Move",
                    "a destination sheet is required",
                ))
            }
        };
        if anchor.0 == sheet.0 {
            return Ok(());
        }
        let from = wb.index_of(sheet)?;
        let moving = wb.sheets.remove(from);
        let anchor_index = match wb.index_of(anchor) {
            Ok(index) => index,
            Err(error) => {
                wb.sheets.insert(from, moving);
                return Err(error);
            }
        };
        let to = if before { anchor_index } else { anchor_index + 1 };
        wb.sheets.insert(to, moving);
        Ok(())
    }

    fn delete_worksheet(&mut self, sheet: SheetId) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let wb = state.owning_workbook_mut(sheet.0)?;
        if wb.sheets.len() == 1 {
            return Err(AutomationError::call_failed(
                "Delete",
                "a workbook needs at least one worksheet",
            ));
        }
        wb.sheets.retain(|s| s.id != sheet.0);
        if wb.active_sheet == Some(sheet.0) {
            wb.active_sheet = None;
        }
        state.pictures.retain(|p| p.sheet != sheet.0);
        Ok(())
    }

    fn cell(&mut self, sheet: SheetId, row: u32, column: u32) -> Result<RangeId> {
        if row == 0 || column == 0 {
            return Err(AutomationError::InvalidReference(format!(
                "R{row}C{column}"
            )));
        }
        let state = &mut *self.state.borrow_mut();
        state.sheet_raw(sheet.0)?;
        Ok(state.register_range(
            sheet.0,
            Area::Cells {
                r1: row,
                c1: column,
                r2: row,
                c2: column,
            },
        ))
    }

    fn range(&mut self, sheet: SheetId, reference: &str) -> Result<RangeId> {
        let area = parse_area(reference)?;
        let state = &mut *self.state.borrow_mut();
        state.sheet_raw(sheet.0)?;
        Ok(state.register_range(sheet.0, area))
    }

    fn all_cells(&mut self, sheet: SheetId) -> Result<RangeId> {
        let state = &mut *self.state.borrow_mut();
        state.sheet_raw(sheet.0)?;
        Ok(state.register_range(sheet.0, Area::Sheet))
    }

    fn column_range(&mut self, sheet: SheetId, column: u32) -> Result<RangeId> {
        if column == 0 {
            return Err(AutomationError::InvalidReference("column 0".into()));
        }
        let state = &mut *self.state.borrow_mut();
        state.sheet_raw(sheet.0)?;
        Ok(state.register_range(sheet.0, Area::Columns { c1: column, c2: column }))
    }

    fn row_range(&mut self, sheet: SheetId, row: u32) -> Result<RangeId> {
        if row == 0 {
            return Err(AutomationError::InvalidReference("row 0".into()));
        }
        let state = &mut *self.state.borrow_mut();
        state.sheet_raw(sheet.0)?;
        Ok(state.register_range(sheet.0, Area::Rows { r1: row, r2: row }))
    }

    fn range_row(&mut self, range: RangeId) -> Result<u32> {
        let state = self.state();
        let object = state.range_object(range)?;
        Ok(first_cell(object.area).0)
    }

    fn range_column(&mut self, range: RangeId) -> Result<u32> {
        let state = self.state();
        let object = state.range_object(range)?;
        Ok(first_cell(object.area).1)
    }

    fn last_row(&mut self, sheet: SheetId, column: u32) -> Result<u32> {
        let state = self.state();
        let sheet = state.sheet_raw(sheet.0)?;
        let last = sheet
            .cells
            .iter()
            .filter(|(&(_, c), cell)| c == column && has_content(cell))
            .map(|(&(r, _), _)| r)
            .max()
            .unwrap_or(1);
        Ok(last)
    }

    fn last_column(&mut self, sheet: SheetId, row: u32) -> Result<u32> {
        let state = self.state();
        let sheet = state.sheet_raw(sheet.0)?;
        let last = sheet
            .cells
            .iter()
            .filter(|(&(r, _), cell)| r == row && has_content(cell))
            .map(|(&(_, c), _)| c)
            .max()
            .unwrap_or(1);
        Ok(last)
    }

    fn column_width(&mut self, sheet: SheetId, column: u32) -> Result<f64> {
        let state = self.state();
        let sheet = state.sheet_raw(sheet.0)?;
        Ok(*sheet
            .column_widths
            .get(&column)
            .unwrap_or(&DEFAULT_COLUMN_WIDTH))
    }

    fn set_column_width(&mut self, sheet: SheetId, column: u32, width: f64) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        state.sheet_raw_mut(sheet.0)?.column_widths.insert(column, width);
        Ok(())
    }

    fn row_height(&mut self, sheet: SheetId, row: u32) -> Result<f64> {
        let state = self.state();
        let sheet = state.sheet_raw(sheet.0)?;
        Ok(*sheet.row_heights.get(&row).unwrap_or(&DEFAULT_ROW_HEIGHT))
    }

    fn set_row_height(&mut self, sheet: SheetId, row: u32, height: f64) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        state.sheet_raw_mut(sheet.0)?.row_heights.insert(row, height);
        Ok(())
    }

    fn insert_column(&mut self, sheet: SheetId, column: u32) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let sheet = state.sheet_raw_mut(sheet.0)?;
        remap_cells(sheet, |r, c| Some((r, if c >= column { c + 1 } else { c })));
        remap_axis(&mut sheet.column_widths, |c| {
            Some(if c >= column { c + 1 } else { c })
        });
        Ok(())
    }

    fn delete_column(&mut self, sheet: SheetId, column: u32) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let sheet = state.sheet_raw_mut(sheet.0)?;
        remap_cells(sheet, |r, c| match c.cmp(&column) {
            Ordering::Less => Some((r, c)),
            Ordering::Equal => None,
            Ordering::Greater => Some((r, c - 1)),
        });
        remap_axis(&mut sheet.column_widths, |c| match c.cmp(&column) {
            Ordering::Less => Some(c),
            Ordering::Equal => None,
            Ordering::Greater => Some(c - 1),
        });
        Ok(())
    }

    fn insert_row(&mut self, sheet: SheetId, row: u32) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let sheet = state.sheet_raw_mut(sheet.0)?;
        remap_cells(sheet, |r, c| Some((if r >= row { r + 1 } else { r }, c)));
        remap_axis(&mut sheet.row_heights, |r| {
            Some(if r >= row { r + 1 } else { r })
        });
        Ok(())
    }

    fn delete_row(&mut self, sheet: SheetId, row: u32) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let sheet = state.sheet_raw_mut(sheet.0)?;
        remap_cells(sheet, |r, c| match r.cmp(&row) {
            Ordering::Less => Some((r, c)),
            Ordering::Equal => None,
            Ordering::Greater => Some((r - 1, c)),
        });
        remap_axis(&mut sheet.row_heights, |r| match r.cmp(&row) {
            Ordering::Less => Some(r),
            Ordering::Equal => None,
            Ordering::Greater => Some(r - 1),
        });
        Ok(())
    }

    fn value(&mut self, range: RangeId) -> Result<Value> {
        let state = self.state();
        let object = state.range_object(range)?;
        let sheet = state.sheet_raw(object.sheet)?;
        let at = first_cell(object.area);
        Ok(sheet
            .cells
            .get(&at)
            .map(|cell| cell.value.clone())
            .unwrap_or_default())
    }

    fn set_value(&mut self, range: RangeId, value: &Value) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let object = state.range_object(range)?;
        let (r1, c1, r2, c2) = area_bounds(state.sheet_raw(object.sheet)?, object.area);
        let sheet = state.sheet_raw_mut(object.sheet)?;
        for r in r1..=r2 {
            for c in c1..=c2 {
                let cell = sheet.cells.entry((r, c)).or_default();
                cell.value = value.clone();
                cell.formula = None;
            }
        }
        Ok(())
    }

    fn formula(&mut self, range: RangeId) -> Result<String> {
        let state = self.state();
        let object = state.range_object(range)?;
        let sheet = state.sheet_raw(object.sheet)?;
        let at = first_cell(object.area);
        Ok(sheet
            .cells
            .get(&at)
            .map(|cell| {
                cell.formula
                    .clone()
                    .unwrap_or_else(|| cell.value.to_string())
            })
            .unwrap_or_default())
    }

    fn set_formula(&mut self, range: RangeId, formula: &str) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let object = state.range_object(range)?;
        let (r1, c1, r2, c2) = area_bounds(state.sheet_raw(object.sheet)?, object.area);
        let sheet = state.sheet_raw_mut(object.sheet)?;
        for r in r1..=r2 {
            for c in c1..=c2 {
                let cell = sheet.cells.entry((r, c)).or_default();
                if formula.starts_with('=') {
                    cell.formula = Some(formula.to_string());
                } else {
                    cell.formula = None;
                    cell.value = parse_literal(formula);
                }
            }
        }
        Ok(())
    }

    fn clear_contents(&mut self, range: RangeId) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let object = state.range_object(range)?;
        let (r1, c1, r2, c2) = area_bounds(state.sheet_raw(object.sheet)?, object.area);
        let sheet = state.sheet_raw_mut(object.sheet)?;
        for r in r1..=r2 {
            for c in c1..=c2 {
                if let Some(cell) = sheet.cells.get_mut(&(r, c)) {
                    cell.value = Value::Empty;
                    cell.formula = None;
                }
            }
        }
        Ok(())
    }

    fn hyperlink(&mut self, range: RangeId) -> Result<String> {
        let state = self.state();
        let object = state.range_object(range)?;
        let sheet = state.sheet_raw(object.sheet)?;
        let (r1, c1, r2, c2) = area_bounds(sheet, object.area);
        for r in r1..=r2 {
            for c in c1..=c2 {
                if let Some(link) = sheet.cells.get(&(r, c)).and_then(|cell| cell.hyperlink.clone())
                {
                    return Ok(link);
                }
            }
        }
        Ok(String::new())
    }

    fn clear_hyperlinks(&mut self, range: RangeId) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let object = state.range_object(range)?;
        let (r1, c1, r2, c2) = area_bounds(state.sheet_raw(object.sheet)?, object.area);
        let sheet = state.sheet_raw_mut(object.sheet)?;
        for r in r1..=r2 {
            for c in c1..=c2 {
                if let Some(cell) = sheet.cells.get_mut(&(r, c)) {
                    cell.hyperlink = None;
                }
            }
        }
        Ok(())
    }

    fn add_hyperlink(&mut self, range: RangeId, url: &str) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let object = state.range_object(range)?;
        let (r1, c1, r2, c2) = area_bounds(state.sheet_raw(object.sheet)?, object.area);
        let sheet = state.sheet_raw_mut(object.sheet)?;
        for r in r1..=r2 {
            for c in c1..=c2 {
                sheet.cells.entry((r, c)).or_default().hyperlink = Some(url.to_string());
            }
        }
        Ok(())
    }

    fn copy(&mut self, range: RangeId) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let object = state.range_object(range)?;
        let sheet = state.sheet_raw(object.sheet)?;
        let (r1, c1, r2, c2) = area_bounds(sheet, object.area);
        let mut grid = Vec::new();
        for r in r1..=r2 {
            let mut row = Vec::new();
            for c in c1..=c2 {
                row.push(sheet.cells.get(&(r, c)).cloned());
            }
            grid.push(row);
        }
        state.clipboard = Some(grid);
        Ok(())
    }

    fn paste(&mut self, sheet: SheetId, at: RangeId) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let object = state.range_object(at)?;
        if object.sheet != sheet.0 {
            return Err(AutomationError::call_failed(
                "Paste",
                "destination range is on another sheet",
            ));
        }
        let Some(grid) = state.clipboard.clone() else {
            return Err(AutomationError::call_failed("Paste", "the clipboard is empty"));
        };
        let (r0, c0) = first_cell(object.area);
        let target = state.sheet_raw_mut(sheet.0)?;
        for (dr, row) in grid.into_iter().enumerate() {
            for (dc, cell) in row.into_iter().enumerate() {
                let key = (r0 + dr as u32, c0 + dc as u32);
                match cell {
                    Some(cell) => {
                        target.cells.insert(key, cell);
                    }
                    None => {
                        target.cells.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }

    fn find(
        &mut self,
        region: RangeId,
        spec: &FindSpec,
        after: Option<RangeId>,
    ) -> Result<Option<RangeId>> {
        let state = &mut *self.state.borrow_mut();
        state.last_find = Some(spec.clone());
        let object = state.range_object(region)?;
        let start = match after {
            Some(id) => {
                let start_object = state.range_object(id)?;
                if start_object.sheet != object.sheet {
                    return Err(AutomationError::call_failed(
                        "Find",
                        "start cell is on another sheet",
                    ));
                }
                first_cell(start_object.area)
            }
            None => {
                let sheet = state.sheet_raw(object.sheet)?;
                let (r1, c1, _, _) = area_bounds(sheet, object.area);
                (r1, c1)
            }
        };
        let sheet = state.sheet_raw(object.sheet)?;
        let bounds = area_bounds(sheet, object.area);
        let forward = spec.direction == SearchDirection::Forward;
        let hit = scan_region(sheet, bounds, spec, start, forward)?;
        Ok(hit.map(|(r, c)| {
            state.register_range(
                object.sheet,
                Area::Cells {
                    r1: r,
                    c1: c,
                    r2: r,
                    c2: c,
                },
            )
        }))
    }

    fn find_next(&mut self, region: RangeId, after: RangeId) -> Result<Option<RangeId>> {
        self.continue_find(region, after, true)
    }

    fn find_previous(&mut self, region: RangeId, before: RangeId) -> Result<Option<RangeId>> {
        self.continue_find(region, before, false)
    }

    fn sort(
        &mut self,
        region: RangeId,
        keys: &[(u32, SortOrder)],
        has_headers: bool,
    ) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let object = state.range_object(region)?;
        let bounds = area_bounds(state.sheet_raw(object.sheet)?, object.area);
        let (_, c1, _, c2) = bounds;
        for (column, _) in keys {
            if *column < c1 || *column > c2 {
                return Err(AutomationError::call_failed(
                    "Sort",
                    format!("key column {column} is outside the sort range"),
                ));
            }
        }
        let sheet = state.sheet_raw_mut(object.sheet)?;
        sort_rows(sheet, bounds, keys, has_headers);
        Ok(())
    }

    fn set_border(&mut self, range: RangeId, side: BorderSide, border: &BorderSpec) -> Result<()> {
        self.each_cell_style(range, |style| {
            let slot = style.borders.entry(side).or_default();
            if let Some(line) = border.style {
                slot.style = Some(line);
            }
            if let Some(weight) = border.weight {
                slot.weight = Some(weight);
            }
            if let Some(color) = border.color {
                slot.color = Some(color);
            }
        })
    }

    fn set_font(&mut self, range: RangeId, font: &FontSpec) -> Result<()> {
        self.each_cell_style(range, |style| {
            if let Some(name) = &font.name {
                style.font_name = Some(name.clone());
            }
            if let Some(size) = font.size {
                style.font_size = Some(size);
            }
            if let Some(bold) = font.bold {
                style.bold = Some(bold);
            }
            if let Some(italic) = font.italic {
                style.italic = Some(italic);
            }
            if let Some(color) = font.color {
                style.font_color = Some(color);
            }
        })
    }

    fn set_format(&mut self, range: RangeId, format: &FormatSpec) -> Result<()> {
        self.each_cell_style(range, |style| {
            if let Some(name) = &format.style {
                style.style_name = Some(name.clone());
            }
            if let Some(alignment) = format.horizontal {
                style.horizontal = Some(alignment);
            }
            if let Some(alignment) = format.vertical {
                style.vertical = Some(alignment);
            }
            if let Some(number_format) = &format.number_format {
                style.number_format = Some(number_format.clone());
            }
            if let Some(wrap) = format.wrap_text {
                style.wrap_text = Some(wrap);
            }
            if let Some(merge) = format.merge {
                style.merged = merge;
            }
            if let Some(fill) = format.fill {
                style.fill = Some(fill);
            }
        })
    }

    fn add_picture(&mut self, sheet: SheetId, path: &Path) -> Result<PictureId> {
        if !path.exists() {
            return Err(AutomationError::not_found("picture file", path.display()));
        }
        let state = &mut *self.state.borrow_mut();
        state.sheet_raw(sheet.0)?;
        let id = state.next_id();
        state.pictures.push(Picture {
            id,
            sheet: sheet.0,
            state: PictureSnapshot {
                path: path.to_path_buf(),
                aspect_locked: None,
                width: None,
                height: None,
                width_scale: None,
                height_scale: None,
                anchor: None,
            },
        });
        Ok(PictureId(id))
    }

    fn set_picture_aspect_locked(&mut self, picture: PictureId, locked: bool) -> Result<()> {
        self.state.borrow_mut().picture_mut(picture)?.state.aspect_locked = Some(locked);
        Ok(())
    }

    fn set_picture_width(&mut self, picture: PictureId, points: f64) -> Result<()> {
        self.state.borrow_mut().picture_mut(picture)?.state.width = Some(points);
        Ok(())
    }

    fn set_picture_height(&mut self, picture: PictureId, points: f64) -> Result<()> {
        self.state.borrow_mut().picture_mut(picture)?.state.height = Some(points);
        Ok(())
    }

    fn scale_picture_width(&mut self, picture: PictureId, factor: f64) -> Result<()> {
        self.state.borrow_mut().picture_mut(picture)?.state.width_scale = Some(factor);
        Ok(())
    }

    fn scale_picture_height(&mut self, picture: PictureId, factor: f64) -> Result<()> {
        self.state.borrow_mut().picture_mut(picture)?.state.height_scale = Some(factor);
        Ok(())
    }

    fn anchor_picture(&mut self, picture: PictureId, at: RangeId) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let object = state.range_object(at)?;
        let cell = first_cell(object.area);
        state.picture_mut(picture)?.state.anchor = Some(cell);
        Ok(())
    }
}

impl FakeExcel {
    fn continue_find(
        &mut self,
        region: RangeId,
        start: RangeId,
        forward: bool,
    ) -> Result<Option<RangeId>> {
        let call = if forward { "FindNext" } else { "FindPrevious" };
        let state = &mut *self.state.borrow_mut();
        let spec = state
            .last_find
            .clone()
            .ok_or_else(|| AutomationError::call_failed(call, "no earlier find call"))?;
        let object = state.range_object(region)?;
        let start_object = state.range_object(start)?;
        if start_object.sheet != object.sheet {
            return Err(AutomationError::call_failed(
                call,
                "start cell is on another sheet",
            ));
        }
        let sheet = state.sheet_raw(object.sheet)?;
        let bounds = area_bounds(sheet, object.area);
        let hit = scan_region(sheet, bounds, &spec, first_cell(start_object.area), forward)?;
        Ok(hit.map(|(r, c)| {
            state.register_range(
                object.sheet,
                Area::Cells {
                    r1: r,
                    c1: c,
                    r2: r,
                    c2: c,
                },
            )
        }))
    }

    fn each_cell_style(&mut self, range: RangeId, apply: impl Fn(&mut CellStyle)) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        let object = state.range_object(range)?;
        let (r1, c1, r2, c2) = area_bounds(state.sheet_raw(object.sheet)?, object.area);
        let sheet = state.sheet_raw_mut(object.sheet)?;
        for r in r1..=r2 {
            for c in c1..=c2 {
                apply(&mut sheet.cells.entry((r, c)).or_default().style);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn session() -> (FakeExcel, FakeExcel) {
        let fake = FakeExcel::new();
        (fake.clone(), fake)
    }

    fn set(session: &mut FakeExcel, sheet: SheetId, row: u32, column: u32, value: impl Into<Value>) {
        let cell = session.cell(sheet, row, column).unwrap();
        session.set_value(cell, &value.into()).unwrap();
    }

    fn get(session: &mut FakeExcel, sheet: SheetId, row: u32, column: u32) -> Value {
        let cell = session.cell(sheet, row, column).unwrap();
        session.value(cell).unwrap()
    }

    #[test]
    fn new_workbooks_carry_three_sheets() {
        let (mut session, fake) = session();
        session.add_workbook().unwrap();
        assert_eq!(
            fake.sheet_names("Book1").unwrap(),
            vec!["Sheet1", "Sheet2", "Sheet3"]
        );
    }

    #[test]
    fn worksheet_lookup_is_case_insensitive() {
        let (mut session, _) = session();
        let wb = session.add_workbook().unwrap();
        let by_name = session.worksheet(wb, &"sheet2".into()).unwrap();
        let by_index = session.worksheet(wb, &2u32.into()).unwrap();
        assert_eq!(by_name, by_index);
        assert!(session.worksheet(wb, &"Sheet9".into()).is_err());
    }

    #[test]
    fn rename_enforces_application_rules() {
        let (mut session, _) = session();
        let wb = session.add_workbook().unwrap();
        let sheet = session.worksheet(wb, &1u32.into()).unwrap();
        session.set_worksheet_name(sheet, "Data").unwrap();
        assert!(session.set_worksheet_name(sheet, "").is_err());
        assert!(session.set_worksheet_name(sheet, "a/b").is_err());
        assert!(session
            .set_worksheet_name(sheet, &"x".repeat(32))
            .is_err());
        assert!(session.set_worksheet_name(sheet, "sheet2").is_err());
        // Renaming a sheet to its own name is allowed.
        session.set_worksheet_name(sheet, "Data").unwrap();
    }

    #[test]
    fn add_worksheet_picks_unused_default_names() {
        let (mut session, fake) = session();
        let wb = session.add_workbook().unwrap();
        let last = session.worksheet(wb, &3u32.into()).unwrap();
        session
            .add_worksheet(wb, SheetPosition::After(last))
            .unwrap();
        assert_eq!(
            fake.sheet_names("Book1").unwrap(),
            vec!["Sheet1", "Sheet2", "Sheet3", "Sheet4"]
        );
    }

    #[test]
    fn delete_refuses_the_last_sheet() {
        let (mut session, _) = session();
        let wb = session.add_workbook().unwrap();
        for index in [3u32, 2] {
            let sheet = session.worksheet(wb, &index.into()).unwrap();
            session.delete_worksheet(sheet).unwrap();
        }
        let last = session.worksheet(wb, &1u32.into()).unwrap();
        assert!(session.delete_worksheet(last).is_err());
    }

    #[test]
    fn move_worksheet_reorders_tabs() {
        let (mut session, fake) = session();
        let wb = session.add_workbook().unwrap();
        let first = session.worksheet(wb, &"Sheet1".into()).unwrap();
        let third = session.worksheet(wb, &"Sheet3".into()).unwrap();
        session
            .move_worksheet(third, SheetPosition::Before(first))
            .unwrap();
        assert_eq!(
            fake.sheet_names("Book1").unwrap(),
            vec!["Sheet3", "Sheet1", "Sheet2"]
        );
        session
            .move_worksheet(third, SheetPosition::After(first))
            .unwrap();
        assert_eq!(
            fake.sheet_names("Book1").unwrap(),
            vec!["Sheet1", "Sheet3", "Sheet2"]
        );
    }

    #[test]
    fn range_parsing_accepts_application_forms() {
        assert_eq!(
            parse_area("B4").unwrap(),
            Area::Cells { r1: 4, c1: 2, r2: 4, c2: 2 }
        );
        assert_eq!(
            parse_area("C3:A1").unwrap(),
            Area::Cells { r1: 1, c1: 1, r2: 3, c2: 3 }
        );
        assert_eq!(parse_area("A:C").unwrap(), Area::Columns { c1: 1, c2: 3 });
        assert_eq!(parse_area("2:5").unwrap(), Area::Rows { r1: 2, r2: 5 });
        for bad in ["", "A", "A1:B", "4:B", "A1:B2:C3"] {
            assert!(parse_area(bad).is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn last_row_and_column_track_content() {
        let (mut session, _) = session();
        let wb = session.add_workbook().unwrap();
        let sheet = session.worksheet(wb, &1u32.into()).unwrap();
        assert_eq!(session.last_row(sheet, 1).unwrap(), 1);
        assert_eq!(session.last_column(sheet, 1).unwrap(), 1);
        set(&mut session, sheet, 5, 1, "below");
        set(&mut session, sheet, 1, 7, "right");
        assert_eq!(session.last_row(sheet, 1).unwrap(), 5);
        assert_eq!(session.last_column(sheet, 1).unwrap(), 7);
    }

    #[test]
    fn find_wraps_and_lands_on_start_last() {
        let (mut session, _) = session();
        let wb = session.add_workbook().unwrap();
        let sheet = session.worksheet(wb, &1u32.into()).unwrap();
        set(&mut session, sheet, 1, 1, "x");
        set(&mut session, sheet, 2, 2, "x");
        let all = session.all_cells(sheet).unwrap();
        let spec = FindSpec::new("x");

        // Starting after A1, the B2 match comes first, then the wrap
        // brings A1 itself.
        let first = session.find(all, &spec, None).unwrap().unwrap();
        assert_eq!(session.range_row(first).unwrap(), 2);
        assert_eq!(session.range_column(first).unwrap(), 2);
        let second = session.find_next(all, first).unwrap().unwrap();
        assert_eq!(session.range_row(second).unwrap(), 1);
        assert_eq!(session.range_column(second).unwrap(), 1);
    }

    #[test]
    fn find_next_requires_an_earlier_find() {
        let (mut session, _) = session();
        let wb = session.add_workbook().unwrap();
        let sheet = session.worksheet(wb, &1u32.into()).unwrap();
        set(&mut session, sheet, 1, 1, "x");
        let all = session.all_cells(sheet).unwrap();
        let start = session.cell(sheet, 1, 1).unwrap();
        assert!(session.find_next(all, start).is_err());
    }

    #[test]
    fn find_modes_match_partially_and_case_insensitively() {
        let (mut session, _) = session();
        let wb = session.add_workbook().unwrap();
        let sheet = session.worksheet(wb, &1u32.into()).unwrap();
        set(&mut session, sheet, 1, 1, "Rainbow");
        let all = session.all_cells(sheet).unwrap();
        assert!(session
            .find(all, &FindSpec::new("rain"), None)
            .unwrap()
            .is_none());
        assert!(session
            .find(all, &FindSpec::new("rain").partial(), None)
            .unwrap()
            .is_some());
        assert!(session
            .find(all, &FindSpec::new("RAINBOW"), None)
            .unwrap()
            .is_some());
    }

    #[test]
    fn sort_orders_rows_and_sinks_blanks() {
        let (mut session, _) = session();
        let wb = session.add_workbook().unwrap();
        let sheet = session.worksheet(wb, &1u32.into()).unwrap();
        set(&mut session, sheet, 1, 1, "amount");
        set(&mut session, sheet, 2, 1, 30);
        set(&mut session, sheet, 3, 1, "pear");
        set(&mut session, sheet, 4, 1, 10);
        // Row 5 left blank.
        set(&mut session, sheet, 5, 2, "marker");
        set(&mut session, sheet, 6, 1, "Apple");
        let region = session.range(sheet, "A1:B6").unwrap();
        session
            .sort(region, &[(1, SortOrder::Ascending)], true)
            .unwrap();

        assert_eq!(get(&mut session, sheet, 1, 1), Value::Text("amount".into()));
        assert_eq!(get(&mut session, sheet, 2, 1), Value::Number(10.0));
        assert_eq!(get(&mut session, sheet, 3, 1), Value::Number(30.0));
        assert_eq!(get(&mut session, sheet, 4, 1), Value::Text("Apple".into()));
        assert_eq!(get(&mut session, sheet, 5, 1), Value::Text("pear".into()));
        // The blank row sank to the bottom, its marker intact.
        assert_eq!(get(&mut session, sheet, 6, 1), Value::Empty);
        assert_eq!(get(&mut session, sheet, 6, 2), Value::Text("marker".into()));
    }

    #[test]
    fn sort_rejects_keys_outside_the_region() {
        let (mut session, _) = session();
        let wb = session.add_workbook().unwrap();
        let sheet = session.worksheet(wb, &1u32.into()).unwrap();
        set(&mut session, sheet, 1, 1, 1);
        let region = session.range(sheet, "A1:B4").unwrap();
        assert!(session
            .sort(region, &[(3, SortOrder::Ascending)], false)
            .is_err());
    }

    #[test]
    fn insert_and_delete_shift_cells() {
        let (mut session, _) = session();
        let wb = session.add_workbook().unwrap();
        let sheet = session.worksheet(wb, &1u32.into()).unwrap();
        set(&mut session, sheet, 1, 1, "a");
        set(&mut session, sheet, 1, 2, "b");
        set(&mut session, sheet, 2, 1, "c");

        session.insert_column(sheet, 2).unwrap();
        assert_eq!(get(&mut session, sheet, 1, 2), Value::Empty);
        assert_eq!(get(&mut session, sheet, 1, 3), Value::Text("b".into()));

        session.delete_column(sheet, 1).unwrap();
        assert_eq!(get(&mut session, sheet, 1, 2), Value::Text("b".into()));

        session.insert_row(sheet, 1).unwrap();
        assert_eq!(get(&mut session, sheet, 3, 1), Value::Text("c".into()));
        session.delete_row(sheet, 1).unwrap();
        assert_eq!(get(&mut session, sheet, 2, 1), Value::Text("c".into()));
    }

    #[test]
    fn clipboard_copies_values_and_blanks() {
        let (mut session, _) = session();
        let wb = session.add_workbook().unwrap();
        let sheet = session.worksheet(wb, &1u32.into()).unwrap();
        set(&mut session, sheet, 1, 1, 1);
        set(&mut session, sheet, 2, 2, 4);
        let source = session.range(sheet, "A1:B2").unwrap();
        session.copy(source).unwrap();

        set(&mut session, sheet, 4, 2, "stale");
        let target = session.cell(sheet, 4, 1).unwrap();
        session.paste(sheet, target).unwrap();
        assert_eq!(get(&mut session, sheet, 4, 1), Value::Number(1.0));
        assert_eq!(get(&mut session, sheet, 5, 2), Value::Number(4.0));
        // Blank source cells overwrite stale content.
        assert_eq!(get(&mut session, sheet, 4, 2), Value::Empty);
    }

    #[test]
    fn formula_reads_fall_back_to_values() {
        let (mut session, _) = session();
        let wb = session.add_workbook().unwrap();
        let sheet = session.worksheet(wb, &1u32.into()).unwrap();
        let cell = session.cell(sheet, 1, 1).unwrap();
        session.set_formula(cell, "=R[-1]C").unwrap();
        assert_eq!(session.formula(cell).unwrap(), "=R[-1]C");

        let plain = session.cell(sheet, 2, 1).unwrap();
        session.set_value(plain, &Value::Number(500.0)).unwrap();
        assert_eq!(session.formula(plain).unwrap(), "500");

        session.set_formula(plain, "42").unwrap();
        assert_eq!(session.value(plain).unwrap(), Value::Number(42.0));
    }

    #[test]
    fn save_renames_the_workbook() {
        let (mut session, fake) = session();
        let wb = session.add_workbook().unwrap();
        session
            .save_workbook(wb, Path::new("/tmp/report.csv"), SaveFormat::Csv, None)
            .unwrap();
        assert_eq!(session.workbook_name(wb).unwrap(), "report.csv");
        let saves = fake.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].workbook, "Book1");
        assert_eq!(saves[0].format, SaveFormat::Csv);
    }

    #[test]
    fn closed_workbook_invalidates_handles() {
        let (mut session, fake) = session();
        let wb = session.add_workbook().unwrap();
        let sheet = session.worksheet(wb, &1u32.into()).unwrap();
        session.close_workbook(wb).unwrap();
        assert!(fake.workbook_names().is_empty());
        assert!(session.worksheet_name(sheet).is_err());
        assert!(session.workbook_name(wb).is_err());
    }
}
