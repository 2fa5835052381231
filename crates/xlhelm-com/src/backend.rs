//! The real backend: one `Excel.Application` instance driven over
//! [`Dispatch`], with handle maps for the objects given out to callers.

#![cfg(windows)]

use std::collections::HashMap;
use std::path::Path;

use windows::Win32::System::Com::{CoInitializeEx, COINIT_APARTMENTTHREADED};
use windows::Win32::System::Variant::VARIANT;

use xlhelm_automation::{
    Automation, AutomationError, BorderSide, BorderSpec, FindSpec, FontSpec, FormatSpec,
    ObjectRef, PictureId, RangeId, Result, SaveFormat, SheetId, SheetPosition, SortOrder, Value,
    WorkbookId,
};

use crate::dispatch::{
    variant_bool, variant_empty, variant_f64, variant_get_bool, variant_get_dispatch,
    variant_get_f64, variant_get_string, variant_i32, variant_is_empty, variant_is_error,
    variant_missing, variant_object, variant_str, Dispatch,
};

// Application enum codes with no counterpart in the shared style enums.
const XL_VALUES: i32 = -4163;
const XL_UP: i32 = -4162;
const XL_TO_LEFT: i32 = -4159;
const XL_SORT_ON_VALUES: i32 = 0;
const XL_TOP_TO_BOTTOM: i32 = 1;
const XL_PIN_YIN: i32 = 1;
const XL_YES: i32 = 1;
const XL_NO: i32 = 2;
const MSO_TRUE: i32 = -1;
const MSO_FALSE: i32 = 0;

/// [`Automation`] over a live `Excel.Application` COM instance.
///
/// Every id handed out maps to a dispatch pointer held here; resolving an
/// id the backend no longer tracks fails with a not-found error. The
/// instance is private to this session, so calls never observe another
/// process's workbooks.
pub struct ComExcel {
    app: Dispatch,
    workbooks: Dispatch,
    books: HashMap<u64, Dispatch>,
    sheets: HashMap<u64, Dispatch>,
    ranges: HashMap<u64, Dispatch>,
    pictures: HashMap<u64, Dispatch>,
    next_handle: u64,
}

impl ComExcel {
    /// Starts a fresh `Excel.Application` instance, initializing COM for
    /// the calling thread in single-threaded apartment mode first. The
    /// application comes up hidden with alerts enabled; the thread keeps
    /// COM initialized for the life of the process.
    pub fn new() -> Result<Self> {
        unsafe {
            let hr = CoInitializeEx(None, COINIT_APARTMENTTHREADED);
            if let Err(error) = hr.ok() {
                return Err(AutomationError::call_failed("CoInitializeEx", error));
            }
        }
        let app = Dispatch::from_progid("Excel.Application")?;
        let workbooks = app.get_object("Workbooks")?;
        tracing::debug!("started an Excel.Application instance");
        Ok(Self {
            app,
            workbooks,
            books: HashMap::new(),
            sheets: HashMap::new(),
            ranges: HashMap::new(),
            pictures: HashMap::new(),
            next_handle: 1,
        })
    }

    fn track_book(&mut self, object: Dispatch) -> WorkbookId {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.books.insert(handle, object);
        WorkbookId(handle)
    }

    fn track_sheet(&mut self, object: Dispatch) -> SheetId {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.sheets.insert(handle, object);
        SheetId(handle)
    }

    fn track_range(&mut self, object: Dispatch) -> RangeId {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.ranges.insert(handle, object);
        RangeId(handle)
    }

    fn track_picture(&mut self, object: Dispatch) -> PictureId {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.pictures.insert(handle, object);
        PictureId(handle)
    }

    fn book_object(&self, workbook: WorkbookId) -> Result<&Dispatch> {
        self.books
            .get(&workbook.0)
            .ok_or_else(|| AutomationError::not_found("workbook", format!("#{}", workbook.0)))
    }

    fn sheet_object(&self, sheet: SheetId) -> Result<&Dispatch> {
        self.sheets
            .get(&sheet.0)
            .ok_or_else(|| AutomationError::not_found("worksheet", format!("#{}", sheet.0)))
    }

    fn range_object(&self, range: RangeId) -> Result<&Dispatch> {
        self.ranges
            .get(&range.0)
            .ok_or_else(|| AutomationError::not_found("range", format!("#{}", range.0)))
    }

    fn picture_object(&self, picture: PictureId) -> Result<&Dispatch> {
        self.pictures
            .get(&picture.0)
            .ok_or_else(|| AutomationError::not_found("picture", format!("#{}", picture.0)))
    }
}

impl Automation for ComExcel {
    fn visible(&mut self) -> Result<bool> {
        get_bool(&self.app, "Visible")
    }

    fn set_visible(&mut self, visible: bool) -> Result<()> {
        self.app.set_property("Visible", variant_bool(visible))
    }

    fn set_display_alerts(&mut self, enabled: bool) -> Result<()> {
        self.app.set_property("DisplayAlerts", variant_bool(enabled))
    }

    fn status_text(&mut self) -> Result<Option<String>> {
        // The property answers with a boolean false while the application
        // controls the bar itself.
        let value = self.app.get_property("StatusBar")?;
        Ok(variant_get_string(&value))
    }

    fn set_status_text(&mut self, text: Option<&str>) -> Result<()> {
        let value = match text {
            Some(message) => variant_str(message),
            None => variant_bool(false),
        };
        self.app.set_property("StatusBar", value)
    }

    fn status_bar_visible(&mut self) -> Result<bool> {
        get_bool(&self.app, "DisplayStatusBar")
    }

    fn set_status_bar_visible(&mut self, visible: bool) -> Result<()> {
        self.app
            .set_property("DisplayStatusBar", variant_bool(visible))
    }

    fn quit(&mut self) -> Result<()> {
        // The process exits once Quit has run and the last interface
        // reference is released.
        self.books.clear();
        self.sheets.clear();
        self.ranges.clear();
        self.pictures.clear();
        self.app.invoke("Quit", &[])?;
        tracing::debug!("Excel.Application quit");
        Ok(())
    }

    fn workbook_count(&mut self) -> Result<u32> {
        get_u32(&self.workbooks, "Count")
    }

    fn workbook(&mut self, reference: &ObjectRef) -> Result<WorkbookId> {
        let object = collection_item(&self.workbooks, "workbook", reference)?;
        Ok(self.track_book(object))
    }

    fn add_workbook(&mut self) -> Result<WorkbookId> {
        let object = self.workbooks.invoke_object("Add", &[])?;
        Ok(self.track_book(object))
    }

    fn open_workbook(&mut self, path: &Path, password: Option<&str>) -> Result<WorkbookId> {
        let file = path.display().to_string();
        let object = match password {
            Some(password) => self.workbooks.invoke_object_named(
                "Open",
                &[variant_str(&file)],
                &[("Password", variant_str(password))],
            )?,
            None => self.workbooks.invoke_object("Open", &[variant_str(&file)])?,
        };
        Ok(self.track_book(object))
    }

    fn workbook_name(&mut self, workbook: WorkbookId) -> Result<String> {
        get_string(self.book_object(workbook)?, "Name")
    }

    fn activate_workbook(&mut self, workbook: WorkbookId) -> Result<()> {
        self.book_object(workbook)?.invoke("Activate", &[])?;
        Ok(())
    }

    fn save_workbook(
        &mut self,
        workbook: WorkbookId,
        path: &Path,
        format: SaveFormat,
        password: Option<&str>,
    ) -> Result<()> {
        let file = path.display().to_string();
        self.book_object(workbook)?.invoke(
            "SaveAs",
            &[
                variant_str(&file),
                variant_i32(format.code()),
                password.map_or_else(variant_missing, variant_str),
            ],
        )?;
        Ok(())
    }

    fn close_workbook(&mut self, workbook: WorkbookId) -> Result<()> {
        let book = self
            .books
            .remove(&workbook.0)
            .ok_or_else(|| AutomationError::not_found("workbook", format!("#{}", workbook.0)))?;
        book.invoke("Close", &[])?;
        Ok(())
    }

    fn worksheet_count(&mut self, workbook: WorkbookId) -> Result<u32> {
        let sheets = self.book_object(workbook)?.get_object("Sheets")?;
        get_u32(&sheets, "Count")
    }

    fn worksheet(&mut self, workbook: WorkbookId, reference: &ObjectRef) -> Result<SheetId> {
        let sheets = self.book_object(workbook)?.get_object("Sheets")?;
        let object = collection_item(&sheets, "worksheet", reference)?;
        Ok(self.track_sheet(object))
    }

    fn add_worksheet(&mut self, workbook: WorkbookId, position: SheetPosition) -> Result<SheetId> {
        let sheets = self.book_object(workbook)?.get_object("Sheets")?;
        let object = match position {
            SheetPosition::Before(anchor) => {
                let anchor = self.sheet_object(anchor)?;
                sheets.invoke_object_named("Add", &[], &[("Before", variant_object(anchor))])?
            }
            SheetPosition::After(anchor) => {
                let anchor = self.sheet_object(anchor)?;
                sheets.invoke_object_named("Add", &[], &[("After", variant_object(anchor))])?
            }
            SheetPosition::Default => sheets.invoke_object("Add", &[])?,
        };
        Ok(self.track_sheet(object))
    }

    fn worksheet_name(&mut self, sheet: SheetId) -> Result<String> {
        get_string(self.sheet_object(sheet)?, "Name")
    }

    fn set_worksheet_name(&mut self, sheet: SheetId, name: &str) -> Result<()> {
        self.sheet_object(sheet)?
            .set_property("Name", variant_str(name))
    }

    fn activate_worksheet(&mut self, sheet: SheetId) -> Result<()> {
        self.sheet_object(sheet)?.invoke("Activate", &[])?;
        Ok(())
    }

    fn move_worksheet(&mut self, sheet: SheetId, position: SheetPosition) -> Result<()> {
        let moving = self.sheet_object(sheet)?;
        match position {
            SheetPosition::Before(anchor) => {
                let target = self.sheet_object(anchor)?;
                moving.invoke_named("Move", &[], &[("Before", variant_object(target))])?;
            }
            SheetPosition::After(anchor) => {
                let target = self.sheet_object(anchor)?;
                moving.invoke_named("Move", &[], &[("After", variant_object(target))])?;
            }
            SheetPosition::Default => {
                return Err(AutomationError::call_failed(
                    "Move",
                    "a destination sheet is required",
                ));
            }
        }
        Ok(())
    }

    fn delete_worksheet(&mut self, sheet: SheetId) -> Result<()> {
        let object = self
            .sheets
            .remove(&sheet.0)
            .ok_or_else(|| AutomationError::not_found("worksheet", format!("#{}", sheet.0)))?;
        // The application refuses to delete the last sheet; keep the handle
        // alive in that case.
        if let Err(error) = object.invoke("Delete", &[]) {
            self.sheets.insert(sheet.0, object);
            return Err(error);
        }
        Ok(())
    }

    fn cell(&mut self, sheet: SheetId, row: u32, column: u32) -> Result<RangeId> {
        let object = self.sheet_object(sheet)?.get_indexed(
            "Cells",
            &[variant_i32(row as i32), variant_i32(column as i32)],
        )?;
        Ok(self.track_range(object))
    }

    fn range(&mut self, sheet: SheetId, reference: &str) -> Result<RangeId> {
        let object = self
            .sheet_object(sheet)?
            .get_indexed("Range", &[variant_str(reference)])?;
        Ok(self.track_range(object))
    }

    fn all_cells(&mut self, sheet: SheetId) -> Result<RangeId> {
        let object = self.sheet_object(sheet)?.get_object("Cells")?;
        Ok(self.track_range(object))
    }

    fn column_range(&mut self, sheet: SheetId, column: u32) -> Result<RangeId> {
        let object = self
            .sheet_object(sheet)?
            .get_indexed("Columns", &[variant_i32(column as i32)])?;
        Ok(self.track_range(object))
    }

    fn row_range(&mut self, sheet: SheetId, row: u32) -> Result<RangeId> {
        let object = self
            .sheet_object(sheet)?
            .get_indexed("Rows", &[variant_i32(row as i32)])?;
        Ok(self.track_range(object))
    }

    fn range_row(&mut self, range: RangeId) -> Result<u32> {
        get_u32(self.range_object(range)?, "Row")
    }

    fn range_column(&mut self, range: RangeId) -> Result<u32> {
        get_u32(self.range_object(range)?, "Column")
    }

    fn last_row(&mut self, sheet: SheetId, column: u32) -> Result<u32> {
        let sheet_object = self.sheet_object(sheet)?;
        let rows = get_u32(&sheet_object.get_object("Rows")?, "Count")?;
        let corner = sheet_object.get_indexed(
            "Cells",
            &[variant_i32(rows as i32), variant_i32(column as i32)],
        )?;
        let hit = corner.get_indexed("End", &[variant_i32(XL_UP)])?;
        get_u32(&hit, "Row")
    }

    fn last_column(&mut self, sheet: SheetId, row: u32) -> Result<u32> {
        let sheet_object = self.sheet_object(sheet)?;
        let columns = get_u32(&sheet_object.get_object("Columns")?, "Count")?;
        let corner = sheet_object.get_indexed(
            "Cells",
            &[variant_i32(row as i32), variant_i32(columns as i32)],
        )?;
        let hit = corner.get_indexed("End", &[variant_i32(XL_TO_LEFT)])?;
        get_u32(&hit, "Column")
    }

    fn column_width(&mut self, sheet: SheetId, column: u32) -> Result<f64> {
        let object = self
            .sheet_object(sheet)?
            .get_indexed("Columns", &[variant_i32(column as i32)])?;
        get_f64(&object, "ColumnWidth")
    }

    fn set_column_width(&mut self, sheet: SheetId, column: u32, width: f64) -> Result<()> {
        self.sheet_object(sheet)?
            .get_indexed("Columns", &[variant_i32(column as i32)])?
            .set_property("ColumnWidth", variant_f64(width))
    }

    fn row_height(&mut self, sheet: SheetId, row: u32) -> Result<f64> {
        let object = self
            .sheet_object(sheet)?
            .get_indexed("Rows", &[variant_i32(row as i32)])?;
        get_f64(&object, "RowHeight")
    }

    fn set_row_height(&mut self, sheet: SheetId, row: u32, height: f64) -> Result<()> {
        self.sheet_object(sheet)?
            .get_indexed("Rows", &[variant_i32(row as i32)])?
            .set_property("RowHeight", variant_f64(height))
    }

    fn insert_column(&mut self, sheet: SheetId, column: u32) -> Result<()> {
        self.sheet_object(sheet)?
            .get_indexed("Columns", &[variant_i32(column as i32)])?
            .invoke("Insert", &[])?;
        Ok(())
    }

    fn delete_column(&mut self, sheet: SheetId, column: u32) -> Result<()> {
        self.sheet_object(sheet)?
            .get_indexed("Columns", &[variant_i32(column as i32)])?
            .invoke("Delete", &[])?;
        Ok(())
    }

    fn insert_row(&mut self, sheet: SheetId, row: u32) -> Result<()> {
        self.sheet_object(sheet)?
            .get_indexed("Rows", &[variant_i32(row as i32)])?
            .invoke("Insert", &[])?;
        Ok(())
    }

    fn delete_row(&mut self, sheet: SheetId, row: u32) -> Result<()> {
        self.sheet_object(sheet)?
            .get_indexed("Rows", &[variant_i32(row as i32)])?
            .invoke("Delete", &[])?;
        Ok(())
    }

    fn value(&mut self, range: RangeId) -> Result<Value> {
        let cell = first_cell(self.range_object(range)?)?;
        let value = cell.get_property("Value")?;
        Ok(variant_to_value(&value))
    }

    fn set_value(&mut self, range: RangeId, value: &Value) -> Result<()> {
        self.range_object(range)?
            .set_property("Value", value_to_variant(value))
    }

    fn formula(&mut self, range: RangeId) -> Result<String> {
        let cell = first_cell(self.range_object(range)?)?;
        get_string(&cell, "FormulaR1C1")
    }

    fn set_formula(&mut self, range: RangeId, formula: &str) -> Result<()> {
        self.range_object(range)?
            .set_property("FormulaR1C1", variant_str(formula))
    }

    fn clear_contents(&mut self, range: RangeId) -> Result<()> {
        self.range_object(range)?.invoke("ClearContents", &[])?;
        Ok(())
    }

    fn hyperlink(&mut self, range: RangeId) -> Result<String> {
        let links = self.range_object(range)?.get_object("Hyperlinks")?;
        if get_u32(&links, "Count")? == 0 {
            return Ok(String::new());
        }
        let first = links.get_indexed("Item", &[variant_i32(1)])?;
        get_string(&first, "Address")
    }

    fn clear_hyperlinks(&mut self, range: RangeId) -> Result<()> {
        self.range_object(range)?
            .get_object("Hyperlinks")?
            .invoke("Delete", &[])?;
        Ok(())
    }

    fn add_hyperlink(&mut self, range: RangeId, url: &str) -> Result<()> {
        // Hyperlinks.Add lives on the parent sheet and takes the anchor
        // range as its first argument.
        let target = self.range_object(range)?;
        let links = target.get_object("Parent")?.get_object("Hyperlinks")?;
        links.invoke("Add", &[variant_object(target), variant_str(url)])?;
        Ok(())
    }

    fn copy(&mut self, range: RangeId) -> Result<()> {
        self.range_object(range)?.invoke("Copy", &[])?;
        Ok(())
    }

    fn paste(&mut self, sheet: SheetId, at: RangeId) -> Result<()> {
        let target = self.range_object(at)?;
        let sheet_object = self.sheet_object(sheet)?;
        sheet_object.invoke("Paste", &[variant_object(target)])?;
        Ok(())
    }

    fn find(
        &mut self,
        region: RangeId,
        spec: &FindSpec,
        after: Option<RangeId>,
    ) -> Result<Option<RangeId>> {
        let region_object = self.range_object(region)?;
        let start = match after {
            Some(id) => variant_object(self.range_object(id)?),
            None => variant_missing(),
        };
        let result = region_object.invoke(
            "Find",
            &[
                value_to_variant(&spec.what),
                start,
                variant_i32(XL_VALUES),
                variant_i32(spec.match_mode.code()),
                variant_i32(spec.order.code()),
                variant_i32(spec.direction.code()),
            ],
        )?;
        Ok(variant_get_dispatch(&result)
            .map(|hit| self.track_range(Dispatch::from_idispatch(hit))))
    }

    fn find_next(&mut self, region: RangeId, after: RangeId) -> Result<Option<RangeId>> {
        let region_object = self.range_object(region)?;
        let start = variant_object(self.range_object(after)?);
        let result = region_object.invoke("FindNext", &[start])?;
        Ok(variant_get_dispatch(&result)
            .map(|hit| self.track_range(Dispatch::from_idispatch(hit))))
    }

    fn find_previous(&mut self, region: RangeId, before: RangeId) -> Result<Option<RangeId>> {
        let region_object = self.range_object(region)?;
        let start = variant_object(self.range_object(before)?);
        let result = region_object.invoke("FindPrevious", &[start])?;
        Ok(variant_get_dispatch(&result)
            .map(|hit| self.track_range(Dispatch::from_idispatch(hit))))
    }

    fn sort(
        &mut self,
        region: RangeId,
        keys: &[(u32, SortOrder)],
        has_headers: bool,
    ) -> Result<()> {
        let region_object = self.range_object(region)?;
        let sheet = region_object.get_object("Parent")?;
        let sorter = sheet.get_object("Sort")?;
        let fields = sorter.get_object("SortFields")?;
        fields.invoke("Clear", &[])?;
        for (column, order) in keys {
            let key = sheet.get_indexed("Columns", &[variant_i32(*column as i32)])?;
            fields.invoke_named(
                "Add",
                &[],
                &[
                    ("Key", variant_object(&key)),
                    ("SortOn", variant_i32(XL_SORT_ON_VALUES)),
                    ("Order", variant_i32(order.code())),
                ],
            )?;
        }
        sorter.invoke("SetRange", &[variant_object(region_object)])?;
        sorter.set_property(
            "Header",
            variant_i32(if has_headers { XL_YES } else { XL_NO }),
        )?;
        sorter.set_property("MatchCase", variant_bool(false))?;
        sorter.set_property("Orientation", variant_i32(XL_TOP_TO_BOTTOM))?;
        sorter.set_property("SortMethod", variant_i32(XL_PIN_YIN))?;
        sorter.invoke("Apply", &[])?;
        Ok(())
    }

    fn set_border(&mut self, range: RangeId, side: BorderSide, border: &BorderSpec) -> Result<()> {
        let edge = self
            .range_object(range)?
            .get_indexed("Borders", &[variant_i32(side.code())])?;
        if let Some(style) = border.style {
            edge.set_property("LineStyle", variant_i32(style.code()))?;
        }
        if let Some(weight) = border.weight {
            edge.set_property("Weight", variant_i32(weight.code()))?;
        }
        if let Some(color) = border.color {
            edge.set_property("Color", variant_i32(color.code()))?;
        }
        Ok(())
    }

    fn set_font(&mut self, range: RangeId, font: &FontSpec) -> Result<()> {
        let font_object = self.range_object(range)?.get_object("Font")?;
        if let Some(name) = &font.name {
            font_object.set_property("Name", variant_str(name))?;
        }
        if let Some(size) = font.size {
            font_object.set_property("Size", variant_f64(size))?;
        }
        if let Some(bold) = font.bold {
            font_object.set_property("Bold", variant_bool(bold))?;
        }
        if let Some(italic) = font.italic {
            font_object.set_property("Italic", variant_bool(italic))?;
        }
        if let Some(color) = font.color {
            font_object.set_property("Color", variant_i32(color.code()))?;
        }
        Ok(())
    }

    fn set_format(&mut self, range: RangeId, format: &FormatSpec) -> Result<()> {
        let target = self.range_object(range)?;
        if let Some(style) = &format.style {
            target.set_property("Style", variant_str(style))?;
        }
        if let Some(horizontal) = format.horizontal {
            target.set_property("HorizontalAlignment", variant_i32(horizontal.code()))?;
        }
        if let Some(vertical) = format.vertical {
            target.set_property("VerticalAlignment", variant_i32(vertical.code()))?;
        }
        if let Some(number_format) = &format.number_format {
            target.set_property("NumberFormat", variant_str(number_format))?;
        }
        if let Some(wrap) = format.wrap_text {
            target.set_property("WrapText", variant_bool(wrap))?;
        }
        if let Some(merge) = format.merge {
            target.set_property("MergeCells", variant_bool(merge))?;
        }
        if let Some(fill) = format.fill {
            target
                .get_object("Interior")?
                .set_property("Color", variant_i32(fill.code()))?;
        }
        Ok(())
    }

    fn add_picture(&mut self, sheet: SheetId, path: &Path) -> Result<PictureId> {
        let file = path.display().to_string();
        let shapes = self.sheet_object(sheet)?.get_object("Shapes")?;
        // Width and height of -1 keep the image's natural size.
        let shape = shapes.invoke_object(
            "AddPicture",
            &[
                variant_str(&file),
                variant_i32(MSO_FALSE),
                variant_i32(MSO_TRUE),
                variant_i32(1),
                variant_i32(1),
                variant_i32(-1),
                variant_i32(-1),
            ],
        )?;
        Ok(self.track_picture(shape))
    }

    fn set_picture_aspect_locked(&mut self, picture: PictureId, locked: bool) -> Result<()> {
        self.picture_object(picture)?.set_property(
            "LockAspectRatio",
            variant_i32(if locked { MSO_TRUE } else { MSO_FALSE }),
        )
    }

    fn set_picture_width(&mut self, picture: PictureId, points: f64) -> Result<()> {
        self.picture_object(picture)?
            .set_property("Width", variant_f64(points))
    }

    fn set_picture_height(&mut self, picture: PictureId, points: f64) -> Result<()> {
        self.picture_object(picture)?
            .set_property("Height", variant_f64(points))
    }

    fn scale_picture_width(&mut self, picture: PictureId, factor: f64) -> Result<()> {
        self.picture_object(picture)?
            .invoke("ScaleWidth", &[variant_f64(factor), variant_i32(MSO_TRUE)])?;
        Ok(())
    }

    fn scale_picture_height(&mut self, picture: PictureId, factor: f64) -> Result<()> {
        self.picture_object(picture)?
            .invoke("ScaleHeight", &[variant_f64(factor), variant_i32(MSO_TRUE)])?;
        Ok(())
    }

    fn anchor_picture(&mut self, picture: PictureId, at: RangeId) -> Result<()> {
        let target = self.range_object(at)?;
        let left = get_f64(target, "Left")?;
        let top = get_f64(target, "Top")?;
        let shape = self.picture_object(picture)?;
        shape.set_property("Left", variant_f64(left))?;
        shape.set_property("Top", variant_f64(top))?;
        Ok(())
    }
}

/// Resolves a collection member by name or 1-based position, reporting any
/// failure as a plain lookup miss.
fn collection_item(
    collection: &Dispatch,
    kind: &'static str,
    reference: &ObjectRef,
) -> Result<Dispatch> {
    let index = match reference {
        ObjectRef::Name(name) => variant_str(name),
        ObjectRef::Index(position) => variant_i32(*position as i32),
    };
    collection
        .get_indexed("Item", &[index])
        .map_err(|_| AutomationError::not_found(kind, reference))
}

/// The first cell of a range, whatever the range's shape.
fn first_cell(range: &Dispatch) -> Result<Dispatch> {
    range.get_indexed("Cells", &[variant_i32(1), variant_i32(1)])
}

fn get_bool(object: &Dispatch, name: &str) -> Result<bool> {
    let value = object.get_property(name)?;
    variant_get_bool(&value).ok_or_else(|| AutomationError::call_failed(name, "expected a boolean"))
}

fn get_f64(object: &Dispatch, name: &str) -> Result<f64> {
    let value = object.get_property(name)?;
    variant_get_f64(&value).ok_or_else(|| AutomationError::call_failed(name, "expected a number"))
}

fn get_u32(object: &Dispatch, name: &str) -> Result<u32> {
    get_f64(object, name).map(|number| number as u32)
}

fn get_string(object: &Dispatch, name: &str) -> Result<String> {
    let value = object.get_property(name)?;
    variant_get_string(&value).ok_or_else(|| AutomationError::call_failed(name, "expected text"))
}

/// Converts a cell value into the VARIANT the application expects.
fn value_to_variant(value: &Value) -> VARIANT {
    match value {
        Value::Empty => variant_empty(),
        Value::Bool(flag) => variant_bool(*flag),
        Value::Number(number) => variant_f64(*number),
        Value::Text(text) => variant_str(text),
    }
}

/// Converts a VARIANT read back from the application into a cell value.
/// Cell error codes come back as `#ERROR` text.
fn variant_to_value(variant: &VARIANT) -> Value {
    if variant_is_empty(variant) {
        Value::Empty
    } else if let Some(flag) = variant_get_bool(variant) {
        Value::Bool(flag)
    } else if let Some(number) = variant_get_f64(variant) {
        Value::Number(number)
    } else if let Some(text) = variant_get_string(variant) {
        Value::Text(text)
    } else if variant_is_error(variant) {
        Value::Text(String::from("#ERROR"))
    } else {
        Value::Empty
    }
}
