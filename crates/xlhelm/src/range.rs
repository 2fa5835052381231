//! Range handles: cell data, hyperlinks, and formatting.

use xlhelm_automation::{BorderSide, BorderSpec, FontSpec, FormatSpec, FromValue, RangeId, Value};

use crate::error::Result;
use crate::excel::Excel;

/// Handle to a rectangular cell region or a single cell.
///
/// Ranges carry no registry entry of their own; one whose sheet or
/// workbook has gone away fails at the backend on first use.
#[derive(Clone, Copy)]
pub struct Range<'a> {
    excel: &'a Excel,
    id: RangeId,
}

impl<'a> Range<'a> {
    pub(crate) fn new(excel: &'a Excel, id: RangeId) -> Self {
        Self { excel, id }
    }

    pub(crate) fn id(&self) -> RangeId {
        self.id
    }

    /// Row of the range's first cell.
    pub fn row(&self) -> Result<u32> {
        Ok(self.excel.inner.borrow_mut().backend.range_row(self.id)?)
    }

    /// Column of the range's first cell.
    pub fn column(&self) -> Result<u32> {
        Ok(self.excel.inner.borrow_mut().backend.range_column(self.id)?)
    }

    /// The value of the range's first cell.
    pub fn value(&self) -> Result<Value> {
        Ok(self.excel.inner.borrow_mut().backend.value(self.id)?)
    }

    /// The value of the first cell converted to `T`. Fails when the cell
    /// does not hold a `T`.
    pub fn value_as<T: FromValue>(&self) -> Result<T> {
        Ok(self.value()?.convert()?)
    }

    /// The value of the first cell converted leniently: a failed
    /// conversion reads as `T::default()`.
    pub fn value_or_default<T: FromValue + Default>(&self) -> Result<T> {
        Ok(self.value()?.convert_or_default())
    }

    /// Sets every cell of the range to `value`.
    pub fn set_value(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        Ok(self
            .excel
            .inner
            .borrow_mut()
            .backend
            .set_value(self.id, &value)?)
    }

    /// The relative `R1C1` formula of the first cell. A plain value cell
    /// reports its value rendered as text.
    pub fn formula(&self) -> Result<String> {
        Ok(self.excel.inner.borrow_mut().backend.formula(self.id)?)
    }

    /// Sets the relative `R1C1` formula of every cell of the range. Text
    /// without a leading `=` is stored as a plain value.
    pub fn set_formula(&self, formula: &str) -> Result<()> {
        Ok(self
            .excel
            .inner
            .borrow_mut()
            .backend
            .set_formula(self.id, formula)?)
    }

    /// Clears values and formulas, leaving formatting in place.
    pub fn clear_contents(&self) -> Result<()> {
        Ok(self.excel.inner.borrow_mut().backend.clear_contents(self.id)?)
    }

    /// Address of the range's first hyperlink, or `""` when it has none.
    pub fn hyperlink(&self) -> Result<String> {
        Ok(self.excel.inner.borrow_mut().backend.hyperlink(self.id)?)
    }

    /// Replaces the range's hyperlinks with a link to `url`. An empty
    /// `url` just removes the existing links.
    pub fn set_hyperlink(&self, url: &str) -> Result<()> {
        let inner = &mut *self.excel.inner.borrow_mut();
        inner.backend.clear_hyperlinks(self.id)?;
        if !url.is_empty() {
            inner.backend.add_hyperlink(self.id, url)?;
        }
        Ok(())
    }

    /// Applies border changes to the given edges.
    pub fn set_border(&self, sides: &[BorderSide], border: &BorderSpec) -> Result<()> {
        let inner = &mut *self.excel.inner.borrow_mut();
        for side in sides {
            inner.backend.set_border(self.id, *side, border)?;
        }
        Ok(())
    }

    /// Applies border changes to all four edges.
    pub fn set_border_all(&self, border: &BorderSpec) -> Result<()> {
        self.set_border(&BorderSide::ALL, border)
    }

    /// Applies font changes.
    pub fn set_font(&self, font: &FontSpec) -> Result<()> {
        Ok(self.excel.inner.borrow_mut().backend.set_font(self.id, font)?)
    }

    /// Applies formatting changes.
    pub fn set_format(&self, format: &FormatSpec) -> Result<()> {
        Ok(self.excel.inner.borrow_mut().backend.set_format(self.id, format)?)
    }

    /// Copies the range to the clipboard.
    pub fn copy_to_clipboard(&self) -> Result<()> {
        Ok(self.excel.inner.borrow_mut().backend.copy(self.id)?)
    }

    /// True when both ranges start at the same row and column.
    pub fn first_cell_eq(&self, other: &Range<'_>) -> Result<bool> {
        let inner = &mut *self.excel.inner.borrow_mut();
        let row = inner.backend.range_row(self.id)?;
        let column = inner.backend.range_column(self.id)?;
        let other_row = inner.backend.range_row(other.id)?;
        let other_column = inner.backend.range_column(other.id)?;
        Ok(row == other_row && column == other_column)
    }
}
