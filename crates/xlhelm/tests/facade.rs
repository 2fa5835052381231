//! Tests for the session facade over the in-memory backend

use std::collections::HashSet;
use std::path::PathBuf;

use xlhelm::automation::{
    relative_formula, Automation, BorderSide, BorderSpec, BorderWeight, Color, FakeExcel,
    FindSpec, FontSpec, FormatSpec, HorizontalAlignment, LineStyle, PictureScale, PictureSizing,
    SaveFormat, SortKey, Value,
};
use xlhelm::{Error, Excel, ExcelOptions};

/// A session over a fresh fake, with a handle kept for inspection.
fn session() -> (Excel, FakeExcel) {
    let fake = FakeExcel::new();
    let excel = Excel::new(fake.clone()).unwrap();
    (excel, fake)
}

/// Test that a session starts hidden and quiet, and restores on release
#[test]
fn test_session_starts_hidden_and_quiet() {
    let fake = FakeExcel::new();
    let excel = Excel::new(fake.clone()).unwrap();
    assert!(!fake.is_visible());
    assert!(!fake.alerts_enabled());

    // Dropping the session hands the application back to the user.
    drop(excel);
    assert!(fake.is_visible());
    assert!(fake.alerts_enabled());
    assert!(!fake.is_quit());
}

/// Test the visibility option and the runtime toggle
#[test]
fn test_visibility_follows_the_options() {
    let fake = FakeExcel::new();
    let options = ExcelOptions {
        visible: true,
        ..ExcelOptions::default()
    };
    let excel = Excel::with_options(fake.clone(), options).unwrap();
    assert!(fake.is_visible());
    assert!(excel.visible().unwrap());

    excel.set_visible(false).unwrap();
    assert!(!fake.is_visible());
}

/// Test that startup sweeps away workbooks left over from earlier sessions
#[test]
fn test_startup_closes_leftover_workbooks() {
    let fake = FakeExcel::new();
    {
        let mut boot = fake.clone();
        boot.add_workbook().unwrap();
        boot.add_workbook().unwrap();
    }
    let excel = Excel::new(fake.clone()).unwrap();
    assert_eq!(excel.workbook_count().unwrap(), 0);
    assert!(fake.workbook_names().is_empty());
}

/// Test that the sweep can be turned off
#[test]
fn test_startup_can_keep_existing_workbooks() {
    let fake = FakeExcel::new();
    {
        let mut boot = fake.clone();
        boot.add_workbook().unwrap();
    }
    let options = ExcelOptions {
        close_existing: false,
        ..ExcelOptions::default()
    };
    let excel = Excel::with_options(fake.clone(), options).unwrap();
    assert_eq!(excel.workbook_count().unwrap(), 1);
    assert_eq!(fake.workbook_names(), vec!["Book1"]);
}

/// Test that close quits the application instead of restoring it
#[test]
fn test_close_quits_the_application() {
    let (excel, fake) = session();
    excel.add_workbook().unwrap();

    excel.close().unwrap();
    assert!(fake.is_quit());
    assert!(fake.workbook_names().is_empty());
    // A deliberate shutdown leaves the window and alerts alone.
    assert!(!fake.is_visible());
    assert!(!fake.alerts_enabled());
}

/// Test that a new workbook ends up with exactly the sheets added to it
#[test]
fn test_new_workbook_keeps_only_added_sheets() {
    let (excel, fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let data = workbook.add_worksheet("Data").unwrap();
    workbook.add_worksheet("Audit").unwrap();

    assert_eq!(fake.sheet_names("Book1").unwrap(), vec!["Data", "Audit"]);
    assert_eq!(workbook.worksheet_count().unwrap(), 2);
    assert_eq!(data.name().unwrap(), "Data");
}

/// Test that the stock sheet survives when a lookup captured it first
#[test]
fn test_stock_sheet_survives_when_looked_up() {
    let (excel, fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let stock = workbook.worksheet(1u32).unwrap();
    assert_eq!(stock.name().unwrap(), "Sheet1");

    workbook.add_worksheet("Data").unwrap();
    assert_eq!(fake.sheet_names("Book1").unwrap(), vec!["Sheet1", "Data"]);
}

/// Test that adding a sheet under an existing name adopts that sheet
#[test]
fn test_duplicate_sheet_names_adopt_the_existing_sheet() {
    let (excel, fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let first = workbook.add_worksheet("Data").unwrap();
    first.set_value(1, "A", 1.0).unwrap();

    let second = workbook.add_worksheet("Data").unwrap();
    assert_eq!(fake.sheet_names("Book1").unwrap(), vec!["Data"]);
    assert_eq!(second.value(1, "A").unwrap(), Value::Number(1.0));

    // Both handles point at the same sheet.
    second.set_name("Ledger").unwrap();
    assert_eq!(first.name().unwrap(), "Ledger");
}

/// Test that sheet names are cut to the 31 characters the application allows
#[test]
fn test_sheet_names_truncate_at_thirty_one_chars() {
    let (excel, _fake) = session();
    let workbook = excel.add_workbook().unwrap();

    let sheet = workbook.add_worksheet(&"x".repeat(40)).unwrap();
    assert_eq!(sheet.name().unwrap(), "x".repeat(31));

    sheet.set_name(&"y".repeat(35)).unwrap();
    assert_eq!(sheet.name().unwrap(), "y".repeat(31));
}

/// Test adding and moving sheets relative to anchors
#[test]
fn test_sheets_insert_and_move_relative_to_anchors() {
    let (excel, fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let a = workbook.add_worksheet("A").unwrap();
    let c = workbook.add_worksheet("C").unwrap();

    let b = workbook.add_worksheet_before("B", c).unwrap();
    assert_eq!(fake.sheet_names("Book1").unwrap(), vec!["A", "B", "C"]);

    workbook.add_worksheet_after("D", c).unwrap();
    assert_eq!(fake.sheet_names("Book1").unwrap(), vec!["A", "B", "C", "D"]);

    workbook.move_worksheet_before(c, a).unwrap();
    assert_eq!(fake.sheet_names("Book1").unwrap(), vec!["C", "A", "B", "D"]);

    workbook.move_worksheet_after(c, b).unwrap();
    assert_eq!(fake.sheet_names("Book1").unwrap(), vec!["A", "B", "C", "D"]);
}

/// Test that closing a workbook releases every handle into it
#[test]
fn test_closing_a_workbook_releases_handles() {
    let (excel, fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();
    let copy = workbook;

    workbook.close().unwrap();
    assert!(copy.is_released());
    assert!(sheet.is_released());
    assert!(matches!(copy.name().unwrap_err(), Error::WorkbookReleased));
    assert!(matches!(
        sheet.value(1, "A").unwrap_err(),
        Error::WorksheetReleased
    ));
    assert!(fake.workbook_names().is_empty());
}

/// Test that operations on released handles fail instead of resurrecting them
#[test]
fn test_released_handles_error() {
    let (excel, _fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();
    workbook.close().unwrap();

    assert!(matches!(
        workbook.add_worksheet("More").unwrap_err(),
        Error::WorkbookReleased
    ));
    assert!(matches!(
        workbook.save_as("report.xlsx").unwrap_err(),
        Error::WorkbookReleased
    ));
    assert!(matches!(
        sheet.set_value(1, "A", 1.0).unwrap_err(),
        Error::WorksheetReleased
    ));
}

/// Test that existence probes answer without failing
#[test]
fn test_exists_probes_do_not_fail() {
    let (excel, _fake) = session();
    assert!(!excel.workbook_exists("Book1"));

    let workbook = excel.add_workbook().unwrap();
    workbook.add_worksheet("Data").unwrap();
    assert!(excel.workbook_exists("Book1"));
    assert!(excel.workbook_exists(1u32));
    assert!(workbook.worksheet_exists("Data"));
    assert!(workbook.worksheet_exists(1u32));
    assert!(!workbook.worksheet_exists("Ghost"));

    workbook.close().unwrap();
    assert!(!workbook.worksheet_exists("Data"));
    assert!(!excel.workbook_exists("Book1"));
}

/// Test that lookups by name or index share one entry per workbook
#[test]
fn test_workbook_lookups_share_one_entry() {
    let (excel, _fake) = session();
    let first = excel.add_workbook().unwrap();
    let by_name = excel.workbook("Book1").unwrap();
    let by_index = excel.workbook(1u32).unwrap();
    assert_eq!(excel.workbook_count().unwrap(), 1);

    by_name.close().unwrap();
    assert!(first.is_released());
    assert!(by_index.is_released());
}

/// Test that deleting a sheet releases it, and the last sheet is protected
#[test]
fn test_deleting_a_sheet_releases_the_handle() {
    let (excel, fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let data = workbook.add_worksheet("Data").unwrap();
    let extra = workbook.add_worksheet("Extra").unwrap();

    extra.delete().unwrap();
    assert!(extra.is_released());
    assert_eq!(fake.sheet_names("Book1").unwrap(), vec!["Data"]);

    // The application refuses to delete the only remaining sheet.
    assert!(data.delete().is_err());
    assert!(!data.is_released());
}

/// Test that activation reaches the application
#[test]
fn test_activation_tracks_the_front_objects() {
    let (excel, fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let second = excel.add_workbook().unwrap();
    assert_eq!(fake.active_workbook_name(), None);

    workbook.activate().unwrap();
    assert_eq!(fake.active_workbook_name().as_deref(), Some("Book1"));
    second.activate().unwrap();
    assert_eq!(fake.active_workbook_name().as_deref(), Some("Book2"));

    let a = workbook.add_worksheet("A").unwrap();
    workbook.add_worksheet("B").unwrap();
    a.activate().unwrap();
    assert_eq!(fake.active_sheet_name("Book1").as_deref(), Some("A"));
}

/// Test value writes and the typed read paths
#[test]
fn test_values_round_trip_with_typed_reads() {
    let (excel, fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();

    sheet.set_value(1, "B", 42.0).unwrap();
    sheet.set_value_at("C2", "note").unwrap();
    sheet.set_value(3, "A", true).unwrap();

    assert_eq!(sheet.value(1, "B").unwrap(), Value::Number(42.0));
    assert_eq!(sheet.value_at("B1").unwrap(), Value::Number(42.0));
    assert_eq!(sheet.value(9, "A").unwrap(), Value::Empty);

    assert_eq!(sheet.value_as::<i64>(1, "B").unwrap(), 42);
    assert_eq!(sheet.value_as::<String>(1, "B").unwrap(), "42");
    assert!(sheet.value_as::<bool>(3, "A").unwrap());
    assert!(sheet.value_as::<bool>(1, "B").is_err());
    // The lenient read falls back to the default on a type mismatch.
    assert!(!sheet.value_or_default::<bool>(1, "B").unwrap());

    assert_eq!(
        fake.value_at("Book1", "Data", "C2").unwrap(),
        Value::Text("note".into())
    );
}

/// Test relative formulas end to end
#[test]
fn test_formulas_read_and_write_in_relative_form() {
    assert_eq!(relative_formula(5, "D", 3, "A").unwrap(), "R[-2]C[-3]");
    assert_eq!(relative_formula(5, "D", 5, "C").unwrap(), "RC[-1]");
    assert_eq!(relative_formula(2, "A", 2, "A").unwrap(), "RC");

    let (excel, _fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Calc").unwrap();

    sheet.set_formula(5, "D", "=R[-2]C[-3]*2").unwrap();
    assert_eq!(sheet.formula(5, "D").unwrap(), "=R[-2]C[-3]*2");
    assert_eq!(sheet.formula_at("D5").unwrap(), "=R[-2]C[-3]*2");

    // A plain value cell reports its value rendered as text.
    sheet.set_value(2, "A", 7.0).unwrap();
    assert_eq!(sheet.formula(2, "A").unwrap(), "7");

    // Text without a leading '=' is stored as a value, not a formula.
    sheet.set_formula_at("A3", "42").unwrap();
    assert_eq!(sheet.value_at("A3").unwrap(), Value::Number(42.0));
}

/// Test the header map: trimmed text, blanks skipped, first occurrence wins
#[test]
fn test_header_columns_first_occurrence_wins() {
    let (excel, _fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();

    sheet.set_value(1, "A", "Name").unwrap();
    sheet.set_value(1, "B", " Qty ").unwrap();
    sheet.set_value(1, "D", "Name").unwrap();

    let headers = sheet.header_columns(1).unwrap();
    assert_eq!(headers.len(), 2);
    assert_eq!(headers["Name"], 1);
    assert_eq!(headers["Qty"], 2);
}

/// Test that find continues forward and backward from the last hit
#[test]
fn test_find_walks_in_both_directions() {
    let (excel, _fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();
    sheet.set_value(1, "A", "x").unwrap();
    sheet.set_value(2, "B", "x").unwrap();

    // The scan starts after the first cell of the region and wraps, so
    // the hit in the top-left corner comes up last.
    let spec = FindSpec::new("x");
    let first = sheet.find(&spec).unwrap().unwrap();
    assert_eq!((first.row().unwrap(), first.column().unwrap()), (2, 2));

    let second = sheet.find_next(first).unwrap().unwrap();
    assert_eq!((second.row().unwrap(), second.column().unwrap()), (1, 1));

    let back = sheet.find_previous(second).unwrap().unwrap();
    assert_eq!((back.row().unwrap(), back.column().unwrap()), (2, 2));

    assert!(sheet.find(&FindSpec::new("missing")).unwrap().is_none());
}

/// Test that resuming with no earlier find scans the whole sheet
#[test]
fn test_find_next_falls_back_to_the_whole_sheet() {
    let (excel, _fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let first = workbook.add_worksheet("First").unwrap();
    let second = workbook.add_worksheet("Second").unwrap();
    first.set_value(1, "A", "marker").unwrap();
    second.set_value(3, "C", "marker").unwrap();

    // A find on one sheet leaves the application's search settings behind.
    assert!(first.find(&FindSpec::new("marker")).unwrap().is_some());

    // No find ran on the second sheet, so the resume covers all of it.
    let start = second.cell(1, "A").unwrap();
    let hit = second.find_next(start).unwrap().unwrap();
    assert_eq!((hit.row().unwrap(), hit.column().unwrap()), (3, 3));
}

/// Test substring matching and explicit start cells
#[test]
fn test_find_after_with_partial_matching() {
    let (excel, _fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();
    sheet.set_value(1, "A", "total amount").unwrap();
    sheet.set_value(3, "C", "amount").unwrap();

    let spec = FindSpec::new("amount").partial();
    let first = sheet.find(&spec).unwrap().unwrap();
    assert_eq!((first.row().unwrap(), first.column().unwrap()), (3, 3));

    let next = sheet.find_after(&spec, first).unwrap().unwrap();
    assert_eq!((next.row().unwrap(), next.column().unwrap()), (1, 1));
}

/// Test that find_all collects each match once despite the wraparound
#[test]
fn test_find_all_stops_after_wrapping() {
    let (excel, _fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();
    for (row, column) in [(1, "A"), (2, "B"), (3, "C")] {
        sheet.set_value(row, column, "x").unwrap();
    }
    sheet.set_value(2, "C", "decoy").unwrap();

    let matches = sheet.find_all(&FindSpec::new("x")).unwrap();
    assert_eq!(matches.len(), 3);

    let mut positions = HashSet::new();
    for hit in &matches {
        positions.insert((hit.row().unwrap(), hit.column().unwrap()));
    }
    assert_eq!(positions, HashSet::from([(1, 1), (2, 2), (3, 3)]));
}

/// Test that a region bounds the matches
#[test]
fn test_find_all_respects_the_region() {
    let (excel, _fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();
    sheet.set_value(1, "A", "t").unwrap();
    sheet.set_value(5, "E", "t").unwrap();

    let region = sheet.range("A1:C3").unwrap();
    let matches = sheet.find_all_in(region, &FindSpec::new("t")).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(
        (matches[0].row().unwrap(), matches[0].column().unwrap()),
        (1, 1)
    );
}

/// Test sorting below a header row
#[test]
fn test_sort_reorders_rows_below_the_header() {
    let (excel, _fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();
    sheet.set_value(1, "A", "amount").unwrap();
    sheet.set_value(1, "B", "label").unwrap();
    for (row, amount, label) in [(2, 30.0, "b"), (3, 10.0, "a"), (4, 20.0, "c")] {
        sheet.set_value(row, "A", amount).unwrap();
        sheet.set_value(row, "B", label).unwrap();
    }

    let region = sheet.range("A1:B4").unwrap();
    sheet.sort(region, &[SortKey::ascending("A")], true).unwrap();

    assert_eq!(sheet.value(1, "A").unwrap(), Value::Text("amount".into()));
    assert_eq!(sheet.value(2, "A").unwrap(), Value::Number(10.0));
    assert_eq!(sheet.value(2, "B").unwrap(), Value::Text("a".into()));
    assert_eq!(sheet.value(3, "A").unwrap(), Value::Number(20.0));
    assert_eq!(sheet.value(4, "A").unwrap(), Value::Number(30.0));

    // A key outside the region is rejected by the application.
    let region = sheet.range("A1:B4").unwrap();
    assert!(sheet.sort(region, &[SortKey::ascending("F")], true).is_err());
}

/// Test that the save format follows the extension unless overridden
#[test]
fn test_save_formats_follow_the_extension() {
    let (excel, fake) = session();
    let workbook = excel.add_workbook().unwrap();
    workbook.add_worksheet("Data").unwrap();

    workbook.save_as("report.csv").unwrap();
    // The application renames the workbook to the file name on save.
    assert_eq!(workbook.name().unwrap(), "report.csv");
    assert_eq!(
        workbook.file_name().unwrap(),
        Some(PathBuf::from("report.csv"))
    );

    workbook.save_as("legacy.xls").unwrap();
    workbook
        .save_as_with("custom.dat", Some(SaveFormat::Native), Some("secret"))
        .unwrap();

    let saves = fake.saves();
    assert_eq!(saves.len(), 3);
    assert_eq!(saves[0].format, SaveFormat::Csv);
    assert_eq!(saves[1].format, SaveFormat::Legacy);
    assert_eq!(saves[2].format, SaveFormat::Native);
    assert_eq!(saves[2].password.as_deref(), Some("secret"));
    // The record carries the name the workbook had when the call ran.
    assert_eq!(saves[2].workbook, "legacy.xls");
}

/// Test opening a file on disk
#[test]
fn test_open_workbook_takes_the_file_name() {
    let file = tempfile::Builder::new()
        .prefix("ledger")
        .suffix(".xlsx")
        .tempfile()
        .unwrap();
    let (excel, _fake) = session();

    let workbook = excel.open_workbook(file.path()).unwrap();
    let expected = file.path().file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(workbook.name().unwrap(), expected);
    assert_eq!(
        workbook.file_name().unwrap(),
        Some(file.path().to_path_buf())
    );
    assert_eq!(workbook.worksheet_count().unwrap(), 1);

    assert!(excel.open_workbook("no-such-file.xlsx").is_err());
}

/// Test the picture sizing rules
#[test]
fn test_picture_scaling_rules() {
    let image = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
    let (excel, fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Gallery").unwrap();

    // Proportional honors the first requested field only.
    let scale = PictureScale::new().with_width(120.0).with_height_percent(50.0);
    sheet
        .insert_picture(
            image.path(),
            sheet.cell(2, "B").unwrap(),
            PictureSizing::Proportional(scale),
        )
        .unwrap();

    // Stretch with any fixed size ignores the percentages outright.
    let scale = PictureScale::new().with_height(80.0).with_width_percent(50.0);
    sheet
        .insert_picture(
            image.path(),
            sheet.cell(10, "A").unwrap(),
            PictureSizing::Stretch(scale),
        )
        .unwrap();

    // With no fixed size the percentages apply, one per axis.
    let scale = PictureScale::new()
        .with_width_percent(50.0)
        .with_height_percent(40.0);
    sheet
        .insert_picture(
            image.path(),
            sheet.cell(20, "C").unwrap(),
            PictureSizing::Stretch(scale),
        )
        .unwrap();

    let pictures = fake.pictures_on("Book1", "Gallery");
    assert_eq!(pictures.len(), 3);

    assert_eq!(pictures[0].aspect_locked, Some(true));
    assert_eq!(pictures[0].width, Some(120.0));
    assert_eq!(pictures[0].height, None);
    assert_eq!(pictures[0].height_scale, None);
    assert_eq!(pictures[0].anchor, Some((2, 2)));

    assert_eq!(pictures[1].aspect_locked, Some(false));
    assert_eq!(pictures[1].height, Some(80.0));
    assert_eq!(pictures[1].width, None);
    assert_eq!(pictures[1].width_scale, None);
    assert_eq!(pictures[1].anchor, Some((10, 1)));

    assert_eq!(pictures[2].aspect_locked, Some(false));
    assert_eq!(pictures[2].width, None);
    assert_eq!(pictures[2].width_scale, Some(0.5));
    assert_eq!(pictures[2].height_scale, Some(0.4));
    assert_eq!(pictures[2].anchor, Some((20, 3)));
}

/// Test that a missing picture file fails before the application is called
#[test]
fn test_missing_picture_file_fails_up_front() {
    let (excel, fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();

    let err = sheet
        .insert_picture(
            "no-such-picture.png",
            sheet.cell(1, "A").unwrap(),
            PictureSizing::Original,
        )
        .unwrap_err();
    assert!(matches!(err, Error::PictureNotFound(_)));
    assert!(fake.pictures_on("Book1", "Data").is_empty());
}

/// Test setting, reading, and clearing hyperlinks
#[test]
fn test_hyperlinks_set_read_and_clear() {
    let (excel, fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();
    let cell = sheet.cell(1, "A").unwrap();

    cell.set_hyperlink("https://example.com/a").unwrap();
    assert_eq!(cell.hyperlink().unwrap(), "https://example.com/a");
    assert_eq!(
        fake.hyperlink_at("Book1", "Data", "A1").as_deref(),
        Some("https://example.com/a")
    );

    // An empty url removes the link.
    cell.set_hyperlink("").unwrap();
    assert_eq!(cell.hyperlink().unwrap(), "");
    assert_eq!(fake.hyperlink_at("Book1", "Data", "A1"), None);
}

/// Test copy and paste, including blanks overwriting the target
#[test]
fn test_copy_paste_overwrites_the_target_block() {
    let (excel, _fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();
    sheet.set_value(1, "A", 1.0).unwrap();
    sheet.set_value(2, "B", 4.0).unwrap();
    sheet.set_value(4, "B", "stale").unwrap();

    let source = sheet.range("A1:B2").unwrap();
    source.copy_to_clipboard().unwrap();
    sheet.paste(sheet.cell(4, "A").unwrap()).unwrap();

    assert_eq!(sheet.value(4, "A").unwrap(), Value::Number(1.0));
    assert_eq!(sheet.value(5, "B").unwrap(), Value::Number(4.0));
    // Blank source cells blank out what was there before.
    assert_eq!(sheet.value(4, "B").unwrap(), Value::Empty);
}

/// Test that row and column edits shift surrounding content
#[test]
fn test_row_and_column_edits_shift_cells() {
    let (excel, _fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();
    sheet.set_value(1, "A", "a").unwrap();
    sheet.set_value(1, "B", "b").unwrap();

    sheet.insert_column("B").unwrap();
    assert_eq!(sheet.value(1, "C").unwrap(), Value::Text("b".into()));
    assert_eq!(sheet.value(1, "B").unwrap(), Value::Empty);

    sheet.delete_column("A").unwrap();
    assert_eq!(sheet.value(1, "B").unwrap(), Value::Text("b".into()));

    sheet.insert_row(1).unwrap();
    assert_eq!(sheet.value(2, "B").unwrap(), Value::Text("b".into()));

    sheet.delete_row(1).unwrap();
    assert_eq!(sheet.value(1, "B").unwrap(), Value::Text("b".into()));
}

/// Test column widths, row heights, and the used-extent probes
#[test]
fn test_geometry_reads_and_writes() {
    let (excel, _fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();

    assert_eq!(sheet.column_width("C").unwrap(), 8.43);
    sheet.set_column_width("C", 22.5).unwrap();
    assert_eq!(sheet.column_width(3u32).unwrap(), 22.5);

    assert_eq!(sheet.row_height(2).unwrap(), 15.0);
    sheet.set_row_height(2, 28.5).unwrap();
    assert_eq!(sheet.row_height(2).unwrap(), 28.5);

    assert_eq!(sheet.last_row("A").unwrap(), 1);
    assert_eq!(sheet.last_column(1).unwrap(), 1);
    sheet.set_value(6, "A", "x").unwrap();
    sheet.set_value(6, "E", "y").unwrap();
    assert_eq!(sheet.last_row("A").unwrap(), 6);
    assert_eq!(sheet.last_column(6).unwrap(), 5);

    // Columns past ZZ are out of the supported reference range.
    assert!(sheet.column_width("ABC").is_err());
}

/// Test that formatting lands on every cell of the range
#[test]
fn test_formatting_covers_the_range() {
    let (excel, fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();
    let header = sheet.range("A1:C1").unwrap();

    let border = BorderSpec::new()
        .with_style(LineStyle::Solid)
        .with_weight(BorderWeight::Thin);
    header.set_border_all(&border).unwrap();
    header
        .set_font(&FontSpec::new().with_bold(true).with_color(Color::WHITE))
        .unwrap();
    header
        .set_format(
            &FormatSpec::new()
                .with_horizontal(HorizontalAlignment::Center)
                .with_fill(Color::BLUE),
        )
        .unwrap();

    let style = fake.style_at("Book1", "Data", "B1").unwrap();
    assert_eq!(style.bold, Some(true));
    assert_eq!(style.font_color, Some(Color::WHITE));
    assert_eq!(style.horizontal, Some(HorizontalAlignment::Center));
    assert_eq!(style.fill, Some(Color::BLUE));
    assert_eq!(style.borders.len(), 4);
    assert_eq!(style.borders[&BorderSide::Top].weight, Some(BorderWeight::Thin));
    assert_eq!(style.borders[&BorderSide::Left].style, Some(LineStyle::Solid));

    // The cell next to the range stays untouched.
    assert_eq!(fake.style_at("Book1", "Data", "D1"), None);
}

/// Test status bar text and the reset helper
#[test]
fn test_status_bar_control() {
    let (excel, fake) = session();

    excel.set_status_text("Working...").unwrap();
    assert_eq!(excel.status_text().unwrap().as_deref(), Some("Working..."));

    excel.clear_status_text().unwrap();
    assert_eq!(excel.status_text().unwrap(), None);

    // Without an explicit flag the reset flips the bar's visibility.
    excel.set_status_text("Busy").unwrap();
    excel.reset_status_bar(None).unwrap();
    assert_eq!(excel.status_text().unwrap(), None);
    let mut probe = fake.clone();
    assert!(!probe.status_bar_visible().unwrap());

    excel.reset_status_bar(Some(true)).unwrap();
    assert!(probe.status_bar_visible().unwrap());
}

/// Test whole-row and whole-column ranges against the used extent
#[test]
fn test_whole_row_and_column_ranges() {
    let (excel, _fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();
    sheet.set_value(3, "A", "seed").unwrap();

    let column = sheet.column("B").unwrap();
    column.set_value(0.0).unwrap();
    assert_eq!(sheet.value(3, "B").unwrap(), Value::Number(0.0));
    assert_eq!(sheet.value(4, "B").unwrap(), Value::Empty);

    let row = sheet.row(2).unwrap();
    row.set_value("row").unwrap();
    assert_eq!(sheet.value(2, "A").unwrap(), Value::Text("row".into()));
    assert_eq!(sheet.value(2, "B").unwrap(), Value::Text("row".into()));
}

/// Test clearing contents and comparing range anchors
#[test]
fn test_clear_contents_and_anchor_compare() {
    let (excel, _fake) = session();
    let workbook = excel.add_workbook().unwrap();
    let sheet = workbook.add_worksheet("Data").unwrap();
    sheet.set_value(1, "A", 5.0).unwrap();
    sheet.set_value(2, "B", "x").unwrap();

    sheet.all_cells().unwrap().clear_contents().unwrap();
    assert_eq!(sheet.value(1, "A").unwrap(), Value::Empty);
    assert_eq!(sheet.value(2, "B").unwrap(), Value::Empty);

    let a1 = sheet.cell(1, "A").unwrap();
    let block = sheet.range("A1:C3").unwrap();
    let b2 = sheet.cell(2, "B").unwrap();
    assert!(a1.first_cell_eq(&block).unwrap());
    assert!(!a1.first_cell_eq(&b2).unwrap());
}
