//! Example: Build a small sales report through the automation facade
//!
//! Runs against the in-memory backend so it works on any platform; a
//! session over the real application only swaps the backend handed to
//! [`Excel::with_options`].

use xlhelm::automation::{FakeExcel, FindSpec, SortKey};
use xlhelm::{Excel, ExcelOptions, Result};

fn main() -> Result<()> {
    let excel = Excel::with_options(
        FakeExcel::new(),
        ExcelOptions {
            visible: false,
            ..ExcelOptions::default()
        },
    )?;

    let workbook = excel.add_workbook()?;
    let sheet = workbook.add_worksheet("Sales")?;

    // Header row
    sheet.set_value(1, "A", "Region")?;
    sheet.set_value(1, "B", "Amount")?;

    // Data rows
    for (row, region, amount) in [
        (2, "North", 1250.0),
        (3, "South", 980.0),
        (4, "East", 1430.0),
        (5, "West", 1105.0),
    ] {
        sheet.set_value(row, "A", region)?;
        sheet.set_value(row, "B", amount)?;
    }

    // Sort by amount, largest first, keeping the header in place
    let table = sheet.range("A1:B5")?;
    sheet.sort(table, &[SortKey::descending("B")], true)?;

    println!("Regions by sales:");
    for row in 2..=sheet.last_row("A")? {
        let name: String = sheet.value_as(row, "A")?;
        let amount: f64 = sheet.value_as(row, "B")?;
        println!("  {name:<6} {amount:>8.2}");
    }

    // Locate a region by name after the sort
    if let Some(hit) = sheet.find(&FindSpec::new("East"))? {
        println!("East is now in row {}", hit.row()?);
    }

    let headers = sheet.header_columns(1)?;
    println!("Amount lives in column {}", headers["Amount"]);

    workbook.save_as("sales.xlsx")?;
    excel.close()?;
    Ok(())
}
