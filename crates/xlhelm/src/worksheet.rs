//! Worksheet handles: geometry, cell data, search, sort, and pictures.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use xlhelm_automation::{
    column_letters, CellRef, ColumnRef, FindSpec, FromValue, PictureSizing, RangeId, SheetId,
    SortKey, Value, WorkbookId,
};

use crate::error::{Error, Result};
use crate::excel::{Excel, Inner};
use crate::range::Range;
use crate::workbook::Workbook;

/// Handle to a worksheet.
///
/// Handles are cheap copies of a registry key. Deleting the sheet, or
/// closing its workbook, releases every copy at once; released handles
/// fail with [`Error::WorksheetReleased`] rather than touching the
/// backend.
#[derive(Clone, Copy)]
pub struct Worksheet<'a> {
    excel: &'a Excel,
    workbook: WorkbookId,
    sheet: SheetId,
}

impl fmt::Debug for Worksheet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worksheet")
            .field("workbook", &self.workbook)
            .field("sheet", &self.sheet)
            .finish_non_exhaustive()
    }
}

impl<'a> Worksheet<'a> {
    pub(crate) fn new(excel: &'a Excel, workbook: WorkbookId, sheet: SheetId) -> Self {
        Self {
            excel,
            workbook,
            sheet,
        }
    }

    pub(crate) fn id(&self) -> SheetId {
        self.sheet
    }

    pub(crate) fn workbook_id(&self) -> WorkbookId {
        self.workbook
    }

    /// The worksheet's current name.
    pub fn name(&self) -> Result<String> {
        let inner = &mut *self.excel.inner.borrow_mut();
        let Inner {
            backend, registry, ..
        } = inner;
        let entry = registry.require_sheet_mut(self.workbook, self.sheet)?;
        let name = backend.worksheet_name(self.sheet)?;
        entry.name = name.clone();
        Ok(name)
    }

    /// Renames the worksheet. Names longer than 31 characters are
    /// truncated before the call, since the application would refuse
    /// them; empty, reserved-character, and duplicate names still fail.
    pub fn set_name(&self, name: &str) -> Result<()> {
        let name: String = name.chars().take(31).collect();
        let inner = &mut *self.excel.inner.borrow_mut();
        let Inner {
            backend, registry, ..
        } = inner;
        let entry = registry.require_sheet_mut(self.workbook, self.sheet)?;
        backend.set_worksheet_name(self.sheet, &name)?;
        entry.name = name;
        Ok(())
    }

    /// True once the worksheet has been deleted or its workbook closed,
    /// through this handle or any copy of it.
    pub fn is_released(&self) -> bool {
        self.excel
            .inner
            .borrow()
            .registry
            .sheet(self.workbook, self.sheet)
            .is_none()
    }

    /// The workbook this worksheet belongs to.
    pub fn workbook(&self) -> Workbook<'a> {
        Workbook::new(self.excel, self.workbook)
    }

    /// Brings the worksheet to the front of its workbook.
    pub fn activate(&self) -> Result<()> {
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        Ok(inner.backend.activate_worksheet(self.sheet)?)
    }

    /// Deletes the worksheet and releases every handle to it. The
    /// application refuses to delete the last sheet of a workbook.
    pub fn delete(self) -> Result<()> {
        let inner = &mut *self.excel.inner.borrow_mut();
        let Inner {
            backend, registry, ..
        } = inner;
        let name = registry.require_sheet(self.workbook, self.sheet)?.name.clone();
        backend.delete_worksheet(self.sheet)?;
        registry.remove_sheet(self.workbook, self.sheet);
        tracing::debug!("deleted worksheet {name}");
        Ok(())
    }

    // -- geometry --

    /// Width of a column in the application's character units.
    pub fn column_width(&self, column: impl Into<ColumnRef>) -> Result<f64> {
        let column = column.into().resolve()?;
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        Ok(inner.backend.column_width(self.sheet, column)?)
    }

    /// Sets the width of a column.
    pub fn set_column_width(&self, column: impl Into<ColumnRef>, width: f64) -> Result<()> {
        let column = column.into().resolve()?;
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        Ok(inner.backend.set_column_width(self.sheet, column, width)?)
    }

    /// Height of a row in points.
    pub fn row_height(&self, row: u32) -> Result<f64> {
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        Ok(inner.backend.row_height(self.sheet, row)?)
    }

    /// Sets the height of a row.
    pub fn set_row_height(&self, row: u32, height: f64) -> Result<()> {
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        Ok(inner.backend.set_row_height(self.sheet, row, height)?)
    }

    /// Last occupied row in a column. An empty column reports 1.
    pub fn last_row(&self, column: impl Into<ColumnRef>) -> Result<u32> {
        let column = column.into().resolve()?;
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        Ok(inner.backend.last_row(self.sheet, column)?)
    }

    /// Last occupied column in a row. An empty row reports 1.
    pub fn last_column(&self, row: u32) -> Result<u32> {
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        Ok(inner.backend.last_column(self.sheet, row)?)
    }

    /// Inserts a column, shifting later columns right.
    pub fn insert_column(&self, column: impl Into<ColumnRef>) -> Result<()> {
        let column = column.into().resolve()?;
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        Ok(inner.backend.insert_column(self.sheet, column)?)
    }

    /// Deletes a column, shifting later columns left.
    pub fn delete_column(&self, column: impl Into<ColumnRef>) -> Result<()> {
        let column = column.into().resolve()?;
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        Ok(inner.backend.delete_column(self.sheet, column)?)
    }

    /// Inserts a row, shifting later rows down.
    pub fn insert_row(&self, row: u32) -> Result<()> {
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        Ok(inner.backend.insert_row(self.sheet, row)?)
    }

    /// Deletes a row, shifting later rows up.
    pub fn delete_row(&self, row: u32) -> Result<()> {
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        Ok(inner.backend.delete_row(self.sheet, row)?)
    }

    // -- ranges --

    /// The single cell at `row` and `column` (letters or 1-based number).
    pub fn cell(&self, row: u32, column: impl Into<ColumnRef>) -> Result<Range<'a>> {
        let column = column.into().resolve()?;
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        let id = inner.backend.cell(self.sheet, row, column)?;
        Ok(Range::new(self.excel, id))
    }

    /// A range by `A1`-style reference: `"B4"`, `"A1:C3"`, `"A:C"`, or
    /// `"2:5"`.
    pub fn range(&self, reference: &str) -> Result<Range<'a>> {
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        let id = inner.backend.range(self.sheet, reference)?;
        Ok(Range::new(self.excel, id))
    }

    /// A rectangular range by its corner coordinates.
    pub fn range_cells(
        &self,
        first_row: u32,
        first_column: impl Into<ColumnRef>,
        last_row: u32,
        last_column: impl Into<ColumnRef>,
    ) -> Result<Range<'a>> {
        let first = column_letters(first_column.into().resolve()?)?;
        let last = column_letters(last_column.into().resolve()?)?;
        self.range(&format!("{first}{first_row}:{last}{last_row}"))
    }

    /// The range covering one whole column.
    pub fn column(&self, column: impl Into<ColumnRef>) -> Result<Range<'a>> {
        let column = column.into().resolve()?;
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        let id = inner.backend.column_range(self.sheet, column)?;
        Ok(Range::new(self.excel, id))
    }

    /// The range covering one whole row.
    pub fn row(&self, row: u32) -> Result<Range<'a>> {
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        let id = inner.backend.row_range(self.sheet, row)?;
        Ok(Range::new(self.excel, id))
    }

    /// The range covering every cell of the sheet.
    pub fn all_cells(&self) -> Result<Range<'a>> {
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        let id = inner.backend.all_cells(self.sheet)?;
        Ok(Range::new(self.excel, id))
    }

    // -- cell data --

    /// The value at `row` and `column`.
    pub fn value(&self, row: u32, column: impl Into<ColumnRef>) -> Result<Value> {
        let column = column.into().resolve()?;
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        let id = inner.backend.cell(self.sheet, row, column)?;
        Ok(inner.backend.value(id)?)
    }

    /// The value at a `"B4"`-style location.
    pub fn value_at(&self, location: &str) -> Result<Value> {
        let cell = CellRef::parse(location)?;
        self.value(cell.row, cell.column)
    }

    /// The value at `row` and `column`, converted to `T`. Fails when the
    /// cell does not hold a `T`.
    pub fn value_as<T: FromValue>(&self, row: u32, column: impl Into<ColumnRef>) -> Result<T> {
        Ok(self.value(row, column)?.convert()?)
    }

    /// The value at `row` and `column`, converted leniently: a failed
    /// conversion reads as `T::default()`. Lookup failures still fail.
    pub fn value_or_default<T: FromValue + Default>(
        &self,
        row: u32,
        column: impl Into<ColumnRef>,
    ) -> Result<T> {
        Ok(self.value(row, column)?.convert_or_default())
    }

    /// Writes a value at `row` and `column`.
    pub fn set_value(
        &self,
        row: u32,
        column: impl Into<ColumnRef>,
        value: impl Into<Value>,
    ) -> Result<()> {
        let column = column.into().resolve()?;
        let value = value.into();
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        let id = inner.backend.cell(self.sheet, row, column)?;
        Ok(inner.backend.set_value(id, &value)?)
    }

    /// Writes a value at a `"B4"`-style location.
    pub fn set_value_at(&self, location: &str, value: impl Into<Value>) -> Result<()> {
        let cell = CellRef::parse(location)?;
        self.set_value(cell.row, cell.column, value)
    }

    /// The relative `R1C1` formula at `row` and `column`. A plain value
    /// cell reports its value rendered as text.
    pub fn formula(&self, row: u32, column: impl Into<ColumnRef>) -> Result<String> {
        let column = column.into().resolve()?;
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        let id = inner.backend.cell(self.sheet, row, column)?;
        Ok(inner.backend.formula(id)?)
    }

    /// The relative `R1C1` formula at a `"B4"`-style location.
    pub fn formula_at(&self, location: &str) -> Result<String> {
        let cell = CellRef::parse(location)?;
        self.formula(cell.row, cell.column)
    }

    /// Writes a relative `R1C1` formula at `row` and `column`. Text
    /// without a leading `=` is stored as a plain value.
    pub fn set_formula(
        &self,
        row: u32,
        column: impl Into<ColumnRef>,
        formula: &str,
    ) -> Result<()> {
        let column = column.into().resolve()?;
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        let id = inner.backend.cell(self.sheet, row, column)?;
        Ok(inner.backend.set_formula(id, formula)?)
    }

    /// Writes a relative `R1C1` formula at a `"B4"`-style location.
    pub fn set_formula_at(&self, location: &str, formula: &str) -> Result<()> {
        let cell = CellRef::parse(location)?;
        self.set_formula(cell.row, cell.column, formula)
    }

    /// Maps the trimmed header texts of `row` to their 1-based column
    /// numbers, across the used width of that row. Empty cells are
    /// skipped; on duplicate headers the first occurrence wins.
    pub fn header_columns(&self, row: u32) -> Result<HashMap<String, u32>> {
        let inner = &mut *self.excel.inner.borrow_mut();
        let Inner {
            backend, registry, ..
        } = inner;
        registry.require_sheet(self.workbook, self.sheet)?;
        let last = backend.last_column(self.sheet, row)?;
        let mut headers = HashMap::new();
        for column in 1..=last {
            let id = backend.cell(self.sheet, row, column)?;
            let text = backend.value(id)?.to_string();
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            headers.entry(text.to_string()).or_insert(column);
        }
        Ok(headers)
    }

    // -- search --

    /// Finds the first match for `spec` anywhere on the sheet. Returns
    /// `Ok(None)` when nothing matches.
    pub fn find(&self, spec: &FindSpec) -> Result<Option<Range<'a>>> {
        self.run_find(None, spec, None)
    }

    /// Finds the first match for `spec` inside `region`.
    pub fn find_in(&self, region: Range<'_>, spec: &FindSpec) -> Result<Option<Range<'a>>> {
        self.run_find(Some(region.id()), spec, None)
    }

    /// Finds the first match for `spec` on the sheet, starting after
    /// `after` and wrapping around.
    pub fn find_after(&self, spec: &FindSpec, after: Range<'_>) -> Result<Option<Range<'a>>> {
        self.run_find(None, spec, Some(after.id()))
    }

    fn run_find(
        &self,
        region: Option<RangeId>,
        spec: &FindSpec,
        after: Option<RangeId>,
    ) -> Result<Option<Range<'a>>> {
        let inner = &mut *self.excel.inner.borrow_mut();
        let Inner {
            backend, registry, ..
        } = inner;
        let entry = registry.require_sheet_mut(self.workbook, self.sheet)?;
        let region = match region {
            Some(region) => region,
            None => backend.all_cells(self.sheet)?,
        };
        entry.last_search = Some(region);
        let hit = backend.find(region, spec, after)?;
        Ok(hit.map(|id| Range::new(self.excel, id)))
    }

    /// Continues the most recent find forward from `after`, wrapping at
    /// the end of the searched region. The whole sheet is searched when
    /// no earlier find narrowed the region.
    pub fn find_next(&self, after: Range<'_>) -> Result<Option<Range<'a>>> {
        let inner = &mut *self.excel.inner.borrow_mut();
        let Inner {
            backend, registry, ..
        } = inner;
        let entry = registry.require_sheet_mut(self.workbook, self.sheet)?;
        let region = match entry.last_search {
            Some(region) => region,
            None => backend.all_cells(self.sheet)?,
        };
        let hit = backend.find_next(region, after.id())?;
        Ok(hit.map(|id| Range::new(self.excel, id)))
    }

    /// Continues the most recent find backward from `before`, wrapping at
    /// the start of the searched region. The whole sheet is searched when
    /// no earlier find narrowed the region.
    pub fn find_previous(&self, before: Range<'_>) -> Result<Option<Range<'a>>> {
        let inner = &mut *self.excel.inner.borrow_mut();
        let Inner {
            backend, registry, ..
        } = inner;
        let entry = registry.require_sheet_mut(self.workbook, self.sheet)?;
        let region = match entry.last_search {
            Some(region) => region,
            None => backend.all_cells(self.sheet)?,
        };
        let hit = backend.find_previous(region, before.id())?;
        Ok(hit.map(|id| Range::new(self.excel, id)))
    }

    /// Every distinct match for `spec` on the sheet, in scan order.
    pub fn find_all(&self, spec: &FindSpec) -> Result<Vec<Range<'a>>> {
        self.collect_matches(None, spec)
    }

    /// Every distinct match for `spec` inside `region`, in scan order.
    pub fn find_all_in(&self, region: Range<'_>, spec: &FindSpec) -> Result<Vec<Range<'a>>> {
        self.collect_matches(Some(region.id()), spec)
    }

    fn collect_matches(&self, region: Option<RangeId>, spec: &FindSpec) -> Result<Vec<Range<'a>>> {
        let inner = &mut *self.excel.inner.borrow_mut();
        let Inner {
            backend, registry, ..
        } = inner;
        let entry = registry.require_sheet_mut(self.workbook, self.sheet)?;
        let region = match region {
            Some(region) => region,
            None => backend.all_cells(self.sheet)?,
        };
        entry.last_search = Some(region);
        // The search primitive wraps around, so exhaustion shows up as a
        // revisit of a cell we already collected, not as a miss.
        let mut matches = Vec::new();
        let mut seen: Vec<(u32, u32)> = Vec::new();
        let mut cursor = backend.find(region, spec, None)?;
        while let Some(hit) = cursor {
            let position = (backend.range_row(hit)?, backend.range_column(hit)?);
            if seen.contains(&position) {
                break;
            }
            seen.push(position);
            matches.push(Range::new(self.excel, hit));
            cursor = backend.find_next(region, hit)?;
        }
        Ok(matches)
    }

    // -- sort, clipboard, pictures --

    /// Sorts the rows of `region` by the given keys, earlier keys first.
    /// Each key names a sheet column and a direction; with `has_headers`
    /// the first row of the region stays put. Matching is
    /// case-insensitive and empty cells always sort last.
    pub fn sort(&self, region: Range<'_>, keys: &[SortKey], has_headers: bool) -> Result<()> {
        let mut resolved = Vec::with_capacity(keys.len());
        for key in keys {
            resolved.push((key.column.resolve()?, key.order));
        }
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        Ok(inner.backend.sort(region.id(), &resolved, has_headers)?)
    }

    /// Pastes the clipboard with its first cell at `at`.
    pub fn paste(&self, at: Range<'_>) -> Result<()> {
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_sheet(self.workbook, self.sheet)?;
        Ok(inner.backend.paste(self.sheet, at.id())?)
    }

    /// Inserts a picture file with its top-left corner on `at`, sized per
    /// `sizing`. A missing file is an error before the application is
    /// involved at all.
    pub fn insert_picture(
        &self,
        path: impl AsRef<Path>,
        at: Range<'_>,
        sizing: PictureSizing,
    ) -> Result<()> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::PictureNotFound(path.to_path_buf()));
        }
        let inner = &mut *self.excel.inner.borrow_mut();
        let Inner {
            backend, registry, ..
        } = inner;
        registry.require_sheet(self.workbook, self.sheet)?;
        let picture = backend.add_picture(self.sheet, path)?;
        match sizing {
            PictureSizing::Original => {}
            PictureSizing::Proportional(scale) => {
                backend.set_picture_aspect_locked(picture, true)?;
                // One dimension wins; the application derives the other
                // from the locked aspect ratio.
                if let Some(points) = scale.width {
                    backend.set_picture_width(picture, points)?;
                } else if let Some(points) = scale.height {
                    backend.set_picture_height(picture, points)?;
                } else if let Some(percent) = scale.width_percent {
                    backend.scale_picture_width(picture, percent / 100.0)?;
                } else if let Some(percent) = scale.height_percent {
                    backend.scale_picture_height(picture, percent / 100.0)?;
                }
            }
            PictureSizing::Stretch(scale) => {
                backend.set_picture_aspect_locked(picture, false)?;
                // Fixed sizes win over percentages as a pair; each field
                // of the winning pair sizes its own axis.
                if scale.width.is_some() || scale.height.is_some() {
                    if let Some(points) = scale.width {
                        backend.set_picture_width(picture, points)?;
                    }
                    if let Some(points) = scale.height {
                        backend.set_picture_height(picture, points)?;
                    }
                } else {
                    if let Some(percent) = scale.width_percent {
                        backend.scale_picture_width(picture, percent / 100.0)?;
                    }
                    if let Some(percent) = scale.height_percent {
                        backend.scale_picture_height(picture, percent / 100.0)?;
                    }
                }
            }
        }
        backend.anchor_picture(picture, at.id())?;
        tracing::debug!("inserted picture from {}", path.display());
        Ok(())
    }
}
