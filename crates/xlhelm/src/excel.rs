//! The application session handle and its bookkeeping.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use xlhelm_automation::{Automation, ObjectRef, RangeId, SheetId, WorkbookId};

use crate::error::{Error, Result};
use crate::workbook::Workbook;

/// Startup choices for [`Excel::with_options`].
#[derive(Debug, Clone)]
pub struct ExcelOptions {
    /// Show the application window. Off by default; automation sessions
    /// usually run hidden.
    pub visible: bool,
    /// Leave blocking alert dialogs enabled. Off by default so no call
    /// ever stalls on a dialog; the application then takes each dialog's
    /// default answer, which makes closing discard unsaved changes.
    pub display_alerts: bool,
    /// Close workbooks already open in the application at startup. On by
    /// default so the session starts from a clean slate.
    pub close_existing: bool,
}

impl Default for ExcelOptions {
    fn default() -> Self {
        Self {
            visible: false,
            display_alerts: false,
            close_existing: true,
        }
    }
}

/// Registry record for a worksheet a handle has touched.
pub(crate) struct SheetEntry {
    pub(crate) id: SheetId,
    pub(crate) name: String,
    /// Region of the most recent find on this sheet, for continuations.
    pub(crate) last_search: Option<RangeId>,
}

impl SheetEntry {
    pub(crate) fn new(id: SheetId, name: String) -> Self {
        Self {
            id,
            name,
            last_search: None,
        }
    }
}

/// Registry record for an open workbook.
pub(crate) struct WorkbookEntry {
    pub(crate) id: WorkbookId,
    /// Name as of the last lookup or save; saving renames workbooks, so
    /// save refreshes this.
    pub(crate) name: String,
    /// Last path opened from or saved to in this session.
    pub(crate) file_name: Option<PathBuf>,
    /// Stock sheet of a freshly added workbook. It gets deleted on the
    /// first deliberate sheet add unless a handle captured it by then.
    pub(crate) pending_default: Option<SheetId>,
    pub(crate) sheets: Vec<SheetEntry>,
}

/// Which handles are still live. Membership here is the single source of
/// truth: a workbook or worksheet missing from the registry reports
/// released no matter what the backend would say.
#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) workbooks: Vec<WorkbookEntry>,
}

impl Registry {
    pub(crate) fn workbook(&self, id: WorkbookId) -> Option<&WorkbookEntry> {
        self.workbooks.iter().find(|wb| wb.id == id)
    }

    pub(crate) fn workbook_mut(&mut self, id: WorkbookId) -> Option<&mut WorkbookEntry> {
        self.workbooks.iter_mut().find(|wb| wb.id == id)
    }

    pub(crate) fn workbook_by_name(&self, name: &str) -> Option<&WorkbookEntry> {
        self.workbooks.iter().find(|wb| wb.name == name)
    }

    pub(crate) fn require_workbook(&self, id: WorkbookId) -> Result<&WorkbookEntry> {
        self.workbook(id).ok_or(Error::WorkbookReleased)
    }

    pub(crate) fn require_workbook_mut(&mut self, id: WorkbookId) -> Result<&mut WorkbookEntry> {
        self.workbook_mut(id).ok_or(Error::WorkbookReleased)
    }

    pub(crate) fn sheet(&self, workbook: WorkbookId, sheet: SheetId) -> Option<&SheetEntry> {
        self.workbook(workbook)?
            .sheets
            .iter()
            .find(|s| s.id == sheet)
    }

    pub(crate) fn require_sheet(&self, workbook: WorkbookId, sheet: SheetId) -> Result<&SheetEntry> {
        self.sheet(workbook, sheet).ok_or(Error::WorksheetReleased)
    }

    pub(crate) fn require_sheet_mut(
        &mut self,
        workbook: WorkbookId,
        sheet: SheetId,
    ) -> Result<&mut SheetEntry> {
        self.workbook_mut(workbook)
            .and_then(|wb| wb.sheets.iter_mut().find(|s| s.id == sheet))
            .ok_or(Error::WorksheetReleased)
    }

    pub(crate) fn remove_workbook(&mut self, id: WorkbookId) {
        self.workbooks.retain(|wb| wb.id != id);
    }

    pub(crate) fn remove_sheet(&mut self, workbook: WorkbookId, sheet: SheetId) {
        if let Some(wb) = self.workbook_mut(workbook) {
            wb.sheets.retain(|s| s.id != sheet);
            if wb.pending_default == Some(sheet) {
                wb.pending_default = None;
            }
        }
    }
}

pub(crate) struct Inner {
    pub(crate) backend: Box<dyn Automation>,
    pub(crate) registry: Registry,
    pub(crate) closed: bool,
}

/// A running spreadsheet application session.
///
/// Construction applies the automation posture: alerts off, window
/// hidden, leftover workbooks closed (all adjustable through
/// [`ExcelOptions`]). Dropping the session releases the application back
/// to the user: the window is shown if it was hidden and alerts are
/// re-enabled, but the application keeps running. Call [`Excel::close`]
/// instead to quit it outright.
///
/// Workbook, worksheet, and range handles borrow the session, so it
/// cannot be closed while any handle is alive. The session is
/// single-threaded; it is `!Sync` by construction.
pub struct Excel {
    pub(crate) inner: RefCell<Inner>,
}

impl Excel {
    /// Starts a session over `backend` with the default options.
    pub fn new(backend: impl Automation + 'static) -> Result<Self> {
        Self::with_options(backend, ExcelOptions::default())
    }

    /// Starts a session over `backend` with explicit options.
    pub fn with_options(backend: impl Automation + 'static, options: ExcelOptions) -> Result<Self> {
        let mut backend: Box<dyn Automation> = Box::new(backend);
        backend.set_display_alerts(options.display_alerts)?;
        backend.set_visible(options.visible)?;
        if options.close_existing {
            let count = backend.workbook_count()?;
            for index in (1..=count).rev() {
                let id = backend.workbook(&ObjectRef::Index(index))?;
                backend.close_workbook(id)?;
            }
            if count > 0 {
                tracing::debug!("closed {count} workbooks left over from an earlier session");
            }
        }
        tracing::debug!("automation session started");
        Ok(Self {
            inner: RefCell::new(Inner {
                backend,
                registry: Registry::default(),
                closed: false,
            }),
        })
    }

    /// Whether the application window is visible.
    pub fn visible(&self) -> Result<bool> {
        Ok(self.inner.borrow_mut().backend.visible()?)
    }

    /// Shows or hides the application window.
    pub fn set_visible(&self, visible: bool) -> Result<()> {
        Ok(self.inner.borrow_mut().backend.set_visible(visible)?)
    }

    /// The caller-set status bar text, or `None` while the application
    /// controls the bar.
    pub fn status_text(&self) -> Result<Option<String>> {
        Ok(self.inner.borrow_mut().backend.status_text()?)
    }

    /// Puts `text` on the status bar.
    pub fn set_status_text(&self, text: &str) -> Result<()> {
        Ok(self.inner.borrow_mut().backend.set_status_text(Some(text))?)
    }

    /// Gives the status bar back to the application.
    pub fn clear_status_text(&self) -> Result<()> {
        Ok(self.inner.borrow_mut().backend.set_status_text(None)?)
    }

    /// Resets the status bar: any caller text is cleared, then the bar is
    /// shown (`Some(true)`), hidden (`Some(false)`), or toggled (`None`).
    pub fn reset_status_bar(&self, show: Option<bool>) -> Result<()> {
        let inner = &mut *self.inner.borrow_mut();
        inner.backend.set_status_text(None)?;
        let show = match show {
            Some(value) => value,
            None => !inner.backend.status_bar_visible()?,
        };
        inner.backend.set_status_bar_visible(show)?;
        Ok(())
    }

    /// Number of open workbooks.
    pub fn workbook_count(&self) -> Result<u32> {
        Ok(self.inner.borrow_mut().backend.workbook_count()?)
    }

    /// Creates a workbook. Its stock sheets beyond the first are deleted
    /// right away; the remaining one sticks around until the first
    /// deliberate [`Workbook::add_worksheet`], which replaces it unless a
    /// handle captured it first.
    pub fn add_workbook(&self) -> Result<Workbook<'_>> {
        let inner = &mut *self.inner.borrow_mut();
        let Inner {
            backend, registry, ..
        } = inner;
        let id = backend.add_workbook()?;
        let count = backend.worksheet_count(id)?;
        for index in (2..=count).rev() {
            let sheet = backend.worksheet(id, &ObjectRef::Index(index))?;
            backend.delete_worksheet(sheet)?;
        }
        let marker = backend.worksheet(id, &ObjectRef::Index(1))?;
        let name = backend.workbook_name(id)?;
        tracing::debug!("added workbook {name}");
        registry.workbooks.push(WorkbookEntry {
            id,
            name,
            file_name: None,
            pending_default: Some(marker),
            sheets: Vec::new(),
        });
        Ok(Workbook::new(self, id))
    }

    /// Opens a workbook file.
    pub fn open_workbook(&self, path: impl AsRef<Path>) -> Result<Workbook<'_>> {
        self.open_with(path.as_ref(), None)
    }

    /// Opens a password-protected workbook file.
    pub fn open_workbook_with_password(
        &self,
        path: impl AsRef<Path>,
        password: &str,
    ) -> Result<Workbook<'_>> {
        self.open_with(path.as_ref(), Some(password))
    }

    fn open_with(&self, path: &Path, password: Option<&str>) -> Result<Workbook<'_>> {
        let inner = &mut *self.inner.borrow_mut();
        let Inner {
            backend, registry, ..
        } = inner;
        let id = backend.open_workbook(path, password)?;
        let name = backend.workbook_name(id)?;
        tracing::info!("opened workbook {name} from {}", path.display());
        registry.workbooks.push(WorkbookEntry {
            id,
            name,
            file_name: Some(path.to_path_buf()),
            pending_default: None,
            sheets: Vec::new(),
        });
        Ok(Workbook::new(self, id))
    }

    /// Resolves an open workbook by name or 1-based position. Repeated
    /// lookups of the same workbook share one registry entry, keyed by
    /// the workbook's current name.
    pub fn workbook(&self, reference: impl Into<ObjectRef>) -> Result<Workbook<'_>> {
        let reference = reference.into();
        let inner = &mut *self.inner.borrow_mut();
        let Inner {
            backend, registry, ..
        } = inner;
        let id = backend.workbook(&reference)?;
        let name = backend.workbook_name(id)?;
        if let Some(entry) = registry.workbook_by_name(&name) {
            return Ok(Workbook::new(self, entry.id));
        }
        registry.workbooks.push(WorkbookEntry {
            id,
            name,
            file_name: None,
            pending_default: None,
            sheets: Vec::new(),
        });
        Ok(Workbook::new(self, id))
    }

    /// True when a workbook resolves by name or position. Never fails;
    /// lookup errors read as absence.
    pub fn workbook_exists(&self, reference: impl Into<ObjectRef>) -> bool {
        let reference = reference.into();
        self.inner.borrow_mut().backend.workbook(&reference).is_ok()
    }

    /// Quits the application. Alerts are already suppressed, so unsaved
    /// changes are discarded without prompting. Consumes the session;
    /// dropping it afterwards does nothing more.
    pub fn close(mut self) -> Result<()> {
        let inner = self.inner.get_mut();
        inner.closed = true;
        inner.registry.workbooks.clear();
        inner.backend.quit()?;
        tracing::debug!("automation session closed");
        Ok(())
    }
}

impl Drop for Excel {
    /// Gives the application back to the user without quitting: shows the
    /// window if it was hidden and re-enables alerts. Errors have nowhere
    /// to go here and are swallowed.
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if inner.closed {
            return;
        }
        if !matches!(inner.backend.visible(), Ok(true)) {
            let _ = inner.backend.set_visible(true);
        }
        let _ = inner.backend.set_display_alerts(true);
        inner.registry.workbooks.clear();
        tracing::debug!("automation session released");
    }
}
