//! Formats, borders, fonts, and the enumerated codes behind them.
//!
//! The numeric discriminants are the automation surface's own constants so
//! backends can pass them through unchanged.

use std::path::Path;

/// Workbook file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum SaveFormat {
    /// Comma-separated text.
    Csv = 6,
    /// Legacy binary workbook (the 97-2003 era format).
    Legacy = 39,
    /// The application's default native format.
    #[default]
    Native = 51,
}

impl SaveFormat {
    /// Picks the format for a destination path: `.csv` and `.xls` map to
    /// their formats, everything else saves as [`SaveFormat::Native`].
    /// Extension matching is case-insensitive.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => SaveFormat::Csv,
            Some(ext) if ext.eq_ignore_ascii_case("xls") => SaveFormat::Legacy,
            _ => SaveFormat::Native,
        }
    }

    /// The numeric file-format code.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// One edge of a range border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum BorderSide {
    /// Left edge.
    Left = 7,
    /// Top edge.
    Top = 8,
    /// Bottom edge.
    Bottom = 9,
    /// Right edge.
    Right = 10,
}

impl BorderSide {
    /// All four edges, in application order.
    pub const ALL: [BorderSide; 4] = [
        BorderSide::Top,
        BorderSide::Bottom,
        BorderSide::Left,
        BorderSide::Right,
    ];

    /// The numeric edge code.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Border line styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum LineStyle {
    /// No line.
    None = -4142,
    /// A single solid line.
    #[default]
    Solid = 1,
    /// A dashed line.
    Dash = -4115,
    /// A dotted line.
    Dot = -4118,
    /// A double line.
    Double = -4119,
}

impl LineStyle {
    /// The numeric line-style code.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Border line weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum BorderWeight {
    /// Hairline.
    Hairline = 1,
    /// Thin.
    Thin = 2,
    /// Medium.
    #[default]
    Medium = -4138,
    /// Thick.
    Thick = 4,
}

impl BorderWeight {
    /// The numeric weight code.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Horizontal cell alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum HorizontalAlignment {
    /// Left-aligned.
    Left = -4131,
    /// Centered.
    Center = -4108,
    /// Right-aligned.
    Right = -4152,
}

impl HorizontalAlignment {
    /// The numeric alignment code.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Vertical cell alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum VerticalAlignment {
    /// Aligned to the top edge.
    Top = -4160,
    /// Centered.
    Middle = -4108,
    /// Aligned to the bottom edge.
    Bottom = -4107,
}

impl VerticalAlignment {
    /// The numeric alignment code.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Sort direction for one key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Ascending = 1,
    /// Largest first.
    Descending = 2,
}

impl SortOrder {
    /// The numeric order code.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Whole-cell or substring matching for find operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum MatchMode {
    /// The whole cell must equal the needle.
    #[default]
    Whole = 1,
    /// The cell must contain the needle.
    Part = 2,
}

impl MatchMode {
    /// The numeric look-at code.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Whether a find walks the sheet row-by-row or column-by-column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum SearchOrder {
    /// Walk each row left to right before moving down.
    #[default]
    ByRows = 1,
    /// Walk each column top to bottom before moving right.
    ByColumns = 2,
}

impl SearchOrder {
    /// The numeric search-order code.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Scan direction for find operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum SearchDirection {
    /// Toward higher positions, wrapping at the end.
    #[default]
    Forward = 1,
    /// Toward lower positions, wrapping at the start.
    Backward = 2,
}

impl SearchDirection {
    /// The numeric direction code.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// An RGB color, converted to the application's BGR code at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red component.
    pub r: u8,
    /// Green component.
    pub g: u8,
    /// Blue component.
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const GRAY: Color = Color::rgb(128, 128, 128);

    /// Creates a color from RGB components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// The BGR integer code the application expects.
    pub const fn code(self) -> i32 {
        (self.b as i32) << 16 | (self.g as i32) << 8 | self.r as i32
    }
}

/// Border changes for one or more edges. Unset fields leave the existing
/// border alone.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BorderSpec {
    /// Line style to apply.
    pub style: Option<LineStyle>,
    /// Line weight to apply.
    pub weight: Option<BorderWeight>,
    /// Line color to apply.
    pub color: Option<Color>,
}

impl BorderSpec {
    /// A spec that changes nothing until fields are set.
    pub const fn new() -> Self {
        Self {
            style: None,
            weight: None,
            color: None,
        }
    }

    /// Sets the line style.
    pub const fn with_style(mut self, style: LineStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// Sets the line weight.
    pub const fn with_weight(mut self, weight: BorderWeight) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Sets the line color.
    pub const fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

/// Font changes for a range. Unset fields leave the existing font alone.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FontSpec {
    /// Font family name, e.g. `"Calibri"`.
    pub name: Option<String>,
    /// Point size.
    pub size: Option<f64>,
    /// Bold on or off.
    pub bold: Option<bool>,
    /// Italic on or off.
    pub italic: Option<bool>,
    /// Text color.
    pub color: Option<Color>,
}

impl FontSpec {
    /// A spec that changes nothing until fields are set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the font family name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the point size.
    pub fn with_size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    /// Turns bold on or off.
    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = Some(bold);
        self
    }

    /// Turns italic on or off.
    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = Some(italic);
        self
    }

    /// Sets the text color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

/// Miscellaneous cell formatting. Unset fields leave the cell alone.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormatSpec {
    /// Named cell style, e.g. `"Currency"` or `"Percent"`.
    pub style: Option<String>,
    /// Horizontal alignment.
    pub horizontal: Option<HorizontalAlignment>,
    /// Vertical alignment.
    pub vertical: Option<VerticalAlignment>,
    /// Number format string, e.g. `"#,##0.00"` or `"@"` for text.
    pub number_format: Option<String>,
    /// Wrap text on or off.
    pub wrap_text: Option<bool>,
    /// Merge (or unmerge) the cells of the range.
    pub merge: Option<bool>,
    /// Background fill color.
    pub fill: Option<Color>,
}

impl FormatSpec {
    /// A spec that changes nothing until fields are set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the named cell style.
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Sets the horizontal alignment.
    pub fn with_horizontal(mut self, alignment: HorizontalAlignment) -> Self {
        self.horizontal = Some(alignment);
        self
    }

    /// Sets the vertical alignment.
    pub fn with_vertical(mut self, alignment: VerticalAlignment) -> Self {
        self.vertical = Some(alignment);
        self
    }

    /// Sets the number format string.
    pub fn with_number_format(mut self, format: impl Into<String>) -> Self {
        self.number_format = Some(format.into());
        self
    }

    /// Turns text wrapping on or off.
    pub fn with_wrap(mut self, wrap: bool) -> Self {
        self.wrap_text = Some(wrap);
        self
    }

    /// Merges or unmerges the range.
    pub fn with_merge(mut self, merge: bool) -> Self {
        self.merge = Some(merge);
        self
    }

    /// Sets the background fill color.
    pub fn with_fill(mut self, color: Color) -> Self {
        self.fill = Some(color);
        self
    }
}

/// Requested picture dimensions. Unset fields fall through to the sizing
/// rules in [`PictureSizing`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PictureScale {
    /// Fixed width in points.
    pub width: Option<f64>,
    /// Fixed height in points.
    pub height: Option<f64>,
    /// Width as a percentage of the natural size.
    pub width_percent: Option<f64>,
    /// Height as a percentage of the natural size.
    pub height_percent: Option<f64>,
}

impl PictureScale {
    /// A scale with nothing requested.
    pub const fn new() -> Self {
        Self {
            width: None,
            height: None,
            width_percent: None,
            height_percent: None,
        }
    }

    /// Requests a fixed width in points.
    pub const fn with_width(mut self, points: f64) -> Self {
        self.width = Some(points);
        self
    }

    /// Requests a fixed height in points.
    pub const fn with_height(mut self, points: f64) -> Self {
        self.height = Some(points);
        self
    }

    /// Requests a width percentage of the natural size.
    pub const fn with_width_percent(mut self, percent: f64) -> Self {
        self.width_percent = Some(percent);
        self
    }

    /// Requests a height percentage of the natural size.
    pub const fn with_height_percent(mut self, percent: f64) -> Self {
        self.height_percent = Some(percent);
        self
    }
}

/// How an inserted picture is sized.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PictureSizing {
    /// Keep the natural size.
    #[default]
    Original,
    /// Lock the aspect ratio and honor only the first requested field of
    /// the scale, checked in order: width, height, width percent, height
    /// percent.
    Proportional(PictureScale),
    /// Unlock the aspect ratio. Fixed dimensions win over percentages;
    /// within the winning pair both fields apply independently.
    Stretch(PictureScale),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_format_inferred_from_extension() {
        assert_eq!(SaveFormat::for_path(Path::new("out.csv")), SaveFormat::Csv);
        assert_eq!(SaveFormat::for_path(Path::new("out.XLS")), SaveFormat::Legacy);
        assert_eq!(SaveFormat::for_path(Path::new("out.xlsx")), SaveFormat::Native);
        assert_eq!(SaveFormat::for_path(Path::new("out")), SaveFormat::Native);
        assert_eq!(SaveFormat::for_path(Path::new("report.xlsm")), SaveFormat::Native);
    }

    #[test]
    fn codes_match_the_application() {
        assert_eq!(SaveFormat::Csv.code(), 6);
        assert_eq!(SaveFormat::Legacy.code(), 39);
        assert_eq!(SaveFormat::Native.code(), 51);
        assert_eq!(BorderSide::Left.code(), 7);
        assert_eq!(LineStyle::Solid.code(), 1);
        assert_eq!(LineStyle::None.code(), -4142);
        assert_eq!(BorderWeight::Medium.code(), -4138);
        assert_eq!(HorizontalAlignment::Center.code(), -4108);
        assert_eq!(VerticalAlignment::Bottom.code(), -4107);
    }

    #[test]
    fn color_codes_are_bgr() {
        assert_eq!(Color::rgb(0, 0, 0).code(), 0);
        assert_eq!(Color::rgb(255, 0, 0).code(), 0x0000_00FF);
        assert_eq!(Color::rgb(0, 0, 255).code(), 0x00FF_0000);
        assert_eq!(Color::rgb(255, 255, 255).code(), 0x00FF_FFFF);
    }

    #[test]
    fn specs_accumulate_fields() {
        let border = BorderSpec::new()
            .with_style(LineStyle::Dash)
            .with_weight(BorderWeight::Thick);
        assert_eq!(border.style, Some(LineStyle::Dash));
        assert_eq!(border.weight, Some(BorderWeight::Thick));
        assert_eq!(border.color, None);

        let font = FontSpec::new().with_name("Calibri").with_bold(true);
        assert_eq!(font.name.as_deref(), Some("Calibri"));
        assert_eq!(font.bold, Some(true));
        assert_eq!(font.size, None);
    }
}
