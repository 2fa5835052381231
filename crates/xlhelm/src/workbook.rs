//! Workbook handles.

use std::path::{Path, PathBuf};

use xlhelm_automation::{ObjectRef, SaveFormat, SheetId, SheetPosition, WorkbookId};

use crate::error::{Error, Result};
use crate::excel::{Excel, Inner, SheetEntry};
use crate::worksheet::Worksheet;

/// Where an added worksheet goes.
enum Placement {
    End,
    Before(SheetId),
    After(SheetId),
}

/// Handle to an open workbook.
///
/// Handles are cheap copies of a registry key. Closing the workbook, or
/// the whole session, releases every copy at once; released handles fail
/// with [`Error::WorkbookReleased`] rather than touching the backend.
#[derive(Clone, Copy)]
pub struct Workbook<'a> {
    excel: &'a Excel,
    id: WorkbookId,
}

impl<'a> Workbook<'a> {
    pub(crate) fn new(excel: &'a Excel, id: WorkbookId) -> Self {
        Self { excel, id }
    }

    pub(crate) fn id(&self) -> WorkbookId {
        self.id
    }

    /// The workbook's current name. Saved workbooks are named after their
    /// file, extension included.
    pub fn name(&self) -> Result<String> {
        let inner = &mut *self.excel.inner.borrow_mut();
        let Inner {
            backend, registry, ..
        } = inner;
        let entry = registry.require_workbook_mut(self.id)?;
        let name = backend.workbook_name(self.id)?;
        entry.name = name.clone();
        Ok(name)
    }

    /// The path this workbook was opened from or last saved to, if any.
    pub fn file_name(&self) -> Result<Option<PathBuf>> {
        let inner = self.excel.inner.borrow();
        let entry = inner.registry.require_workbook(self.id)?;
        Ok(entry.file_name.clone())
    }

    /// True once the workbook has been closed, through this handle or any
    /// copy of it.
    pub fn is_released(&self) -> bool {
        self.excel.inner.borrow().registry.workbook(self.id).is_none()
    }

    /// Brings the workbook to the front.
    pub fn activate(&self) -> Result<()> {
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_workbook(self.id)?;
        Ok(inner.backend.activate_workbook(self.id)?)
    }

    /// Number of worksheets.
    pub fn worksheet_count(&self) -> Result<u32> {
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.registry.require_workbook(self.id)?;
        Ok(inner.backend.worksheet_count(self.id)?)
    }

    /// Resolves a worksheet by name or 1-based position. Looking the same
    /// sheet up twice yields handles backed by one registry entry, keyed
    /// by the sheet's current name.
    pub fn worksheet(&self, reference: impl Into<ObjectRef>) -> Result<Worksheet<'a>> {
        let reference = reference.into();
        let inner = &mut *self.excel.inner.borrow_mut();
        let Inner {
            backend, registry, ..
        } = inner;
        let entry = registry.require_workbook_mut(self.id)?;
        let sheet = backend.worksheet(self.id, &reference)?;
        let name = backend.worksheet_name(sheet)?;
        if let Some(cached) = entry.sheets.iter().find(|s| s.name == name) {
            return Ok(Worksheet::new(self.excel, self.id, cached.id));
        }
        entry.sheets.push(SheetEntry::new(sheet, name));
        Ok(Worksheet::new(self.excel, self.id, sheet))
    }

    /// True when a worksheet resolves by name or position. Never fails;
    /// lookup errors read as absence.
    pub fn worksheet_exists(&self, reference: impl Into<ObjectRef>) -> bool {
        let reference = reference.into();
        let inner = &mut *self.excel.inner.borrow_mut();
        if inner.registry.workbook(self.id).is_none() {
            return false;
        }
        inner.backend.worksheet(self.id, &reference).is_ok()
    }

    /// Adds a worksheet named `name` at the end of the workbook. If a
    /// sheet of that name already exists it is returned instead of
    /// failing. Names longer than 31 characters are truncated, matching
    /// what the application would do.
    pub fn add_worksheet(&self, name: &str) -> Result<Worksheet<'a>> {
        self.add_at(name, Placement::End)
    }

    /// Adds a worksheet immediately before `anchor`.
    pub fn add_worksheet_before(&self, name: &str, anchor: Worksheet<'_>) -> Result<Worksheet<'a>> {
        self.add_at(name, Placement::Before(anchor.id()))
    }

    /// Adds a worksheet immediately after `anchor`.
    pub fn add_worksheet_after(&self, name: &str, anchor: Worksheet<'_>) -> Result<Worksheet<'a>> {
        self.add_at(name, Placement::After(anchor.id()))
    }

    fn add_at(&self, name: &str, placement: Placement) -> Result<Worksheet<'a>> {
        let name: String = name.chars().take(31).collect();
        let inner = &mut *self.excel.inner.borrow_mut();
        let Inner {
            backend, registry, ..
        } = inner;
        let entry = registry.require_workbook_mut(self.id)?;
        let sheet = match backend.worksheet(self.id, &ObjectRef::Name(name.clone())) {
            Ok(existing) => {
                // Adopt the existing sheet of that name rather than fail
                // on a duplicate.
                let live = backend.worksheet_name(existing)?;
                if !entry.sheets.iter().any(|s| s.name == live) {
                    entry.sheets.push(SheetEntry::new(existing, live));
                }
                existing
            }
            Err(err) if err.is_not_found() => {
                let position = match placement {
                    Placement::End => {
                        let count = backend.worksheet_count(self.id)?;
                        let last = backend.worksheet(self.id, &ObjectRef::Index(count))?;
                        SheetPosition::After(last)
                    }
                    Placement::Before(anchor) => {
                        if !entry.sheets.iter().any(|s| s.id == anchor) {
                            return Err(Error::WorksheetReleased);
                        }
                        SheetPosition::Before(anchor)
                    }
                    Placement::After(anchor) => {
                        if !entry.sheets.iter().any(|s| s.id == anchor) {
                            return Err(Error::WorksheetReleased);
                        }
                        SheetPosition::After(anchor)
                    }
                };
                let created = backend.add_worksheet(self.id, position)?;
                backend.set_worksheet_name(created, &name)?;
                entry.sheets.push(SheetEntry::new(created, name.clone()));
                tracing::debug!("added worksheet {name}");
                created
            }
            Err(err) => return Err(err.into()),
        };
        // The first deliberate add replaces the stock sheet of a fresh
        // workbook, unless a lookup captured that sheet in the meantime.
        if let Some(marker) = entry.pending_default.take() {
            if let Ok(marker_name) = backend.worksheet_name(marker) {
                let captured = entry.sheets.iter().any(|s| s.name == marker_name);
                if !captured {
                    backend.delete_worksheet(marker)?;
                }
            }
        }
        Ok(Worksheet::new(self.excel, self.id, sheet))
    }

    /// Moves `sheet` immediately before `anchor`.
    pub fn move_worksheet_before(&self, sheet: Worksheet<'_>, anchor: Worksheet<'_>) -> Result<()> {
        self.reposition(sheet, SheetPosition::Before(anchor.id()), anchor)
    }

    /// Moves `sheet` immediately after `anchor`.
    pub fn move_worksheet_after(&self, sheet: Worksheet<'_>, anchor: Worksheet<'_>) -> Result<()> {
        self.reposition(sheet, SheetPosition::After(anchor.id()), anchor)
    }

    fn reposition(
        &self,
        sheet: Worksheet<'_>,
        position: SheetPosition,
        anchor: Worksheet<'_>,
    ) -> Result<()> {
        let inner = &mut *self.excel.inner.borrow_mut();
        let Inner {
            backend, registry, ..
        } = inner;
        registry.require_sheet(sheet.workbook_id(), sheet.id())?;
        registry.require_sheet(anchor.workbook_id(), anchor.id())?;
        Ok(backend.move_worksheet(sheet.id(), position)?)
    }

    /// Saves to `path`, picking the format from the file extension:
    /// `.csv` and `.xls` get their native formats, anything else the
    /// current default format.
    pub fn save_as(&self, path: impl AsRef<Path>) -> Result<()> {
        self.save_as_with(path, None, None)
    }

    /// Saves to `path` with an explicit format and an optional open
    /// password. The application renames the workbook to the file name,
    /// so handles keep working but [`Workbook::name`] changes.
    pub fn save_as_with(
        &self,
        path: impl AsRef<Path>,
        format: Option<SaveFormat>,
        password: Option<&str>,
    ) -> Result<()> {
        let path = path.as_ref();
        let inner = &mut *self.excel.inner.borrow_mut();
        let Inner {
            backend, registry, ..
        } = inner;
        let entry = registry.require_workbook_mut(self.id)?;
        let format = format.unwrap_or_else(|| SaveFormat::for_path(path));
        backend.save_workbook(self.id, path, format, password)?;
        entry.name = backend.workbook_name(self.id)?;
        entry.file_name = Some(path.to_path_buf());
        tracing::info!("saved workbook {} to {}", entry.name, path.display());
        Ok(())
    }

    /// Closes the workbook, discarding unsaved changes while alerts are
    /// suppressed. Every handle to it and to its sheets is released.
    pub fn close(self) -> Result<()> {
        let inner = &mut *self.excel.inner.borrow_mut();
        let Inner {
            backend, registry, ..
        } = inner;
        let name = registry.require_workbook(self.id)?.name.clone();
        backend.close_workbook(self.id)?;
        registry.remove_workbook(self.id);
        tracing::debug!("closed workbook {name}");
        Ok(())
    }
}
