//! A strongly-referenced surface over spreadsheet automation.
//!
//! This crate wraps an external spreadsheet application behind plain Rust
//! handles: an [`Excel`] session owns the application, and [`Workbook`],
//! [`Worksheet`], and [`Range`] handles borrow it. Every operation is a
//! thin pass-through to the application plus the bookkeeping that keeps
//! handles honest: closed workbooks release their sheet handles, the
//! stock sheet of a fresh workbook is cleaned up, and dropping the
//! session restores the application to a visible, alert-enabled state.
//!
//! # Architecture
//!
//! ```text
//! host code
//!   └── Excel / Workbook / Worksheet / Range (this crate)
//!         └── Automation trait (xlhelm-automation crate)
//!               ├── ComExcel (xlhelm-com, Windows only)
//!               └── FakeExcel (in-memory, any platform)
//! ```
//!
//! # Example
//!
//! ```rust
//! use xlhelm::automation::FakeExcel;
//! use xlhelm::Excel;
//!
//! # fn example() -> xlhelm::Result<()> {
//! let excel = Excel::new(FakeExcel::new())?;
//! let workbook = excel.add_workbook()?;
//! let sheet = workbook.add_worksheet("Data")?;
//! sheet.set_value(1, "A", "Total")?;
//! sheet.set_value(1, "B", 42.0)?;
//! assert_eq!(sheet.value(1, "B")?.to_string(), "42");
//! excel.close()?;
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! The crate is single-threaded by design: handles use `RefCell` interior
//! mutability and are not `Sync`. Drive one application from one thread.

pub mod error;
pub mod excel;
pub mod range;
pub mod workbook;
pub mod worksheet;

pub use error::{Error, Result};
pub use excel::{Excel, ExcelOptions};
pub use range::Range;
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// The automation boundary this facade drives, re-exported so hosts need
/// only one dependency.
pub use xlhelm_automation as automation;
