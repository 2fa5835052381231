//! Windows backend for `xlhelm`, driving Excel through late-bound COM.
//!
//! [`ComExcel`] starts a private `Excel.Application` instance and
//! implements [`Automation`](xlhelm_automation::Automation) against it,
//! resolving every property and method by name at call time so no Excel
//! type library is needed at build time. On non-Windows targets the crate
//! compiles to nothing.
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use xlhelm::Excel;
//! use xlhelm_com::ComExcel;
//!
//! let excel = Excel::new(ComExcel::new()?)?;
//! let book = excel.add_workbook()?;
//! let sheet = book.add_worksheet("Data")?;
//! sheet.set_value(1, 1, "hello")?;
//! book.save_as("hello.xlsx")?;
//! excel.close()?;
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```

#[cfg(windows)]
mod backend;
#[cfg(windows)]
mod dispatch;

#[cfg(windows)]
pub use backend::ComExcel;
