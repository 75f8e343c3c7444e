use super::layout::{Align, Cell, CellOpts, FontStyle, Page, PageGeometry, Rgb8, Sheet};
use super::{
    format_percent, group_thousands, AttendanceReport, ExportInput, RateTier, ReportError,
    LONG_STAMP_FORMAT, NO_DATA_MESSAGE, STORE_ERROR_MESSAGE,
};
use crate::escape::html_safe;
use chrono::NaiveDateTime;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect, Rgb,
};

pub const CONTENT_TYPE: &str = "application/pdf";

const DOCUMENT_TITLE: &str = "Student Attendance Report";
const PAGE_HEADING: &str = "STUDENT ATTENDANCE REPORT";
const SCOPE_NOTE: &str = "This report contains attendance data for all registered students.";
const LEGEND_NOTE: &str = "Color coding: Green (>=90%), Orange (75-89%), Red (<75%)";

const NAME_DISPLAY_LIMIT: usize = 25;
const NAME_TRUNCATED_LEN: usize = 22;

const SUMMARY_HEADER_FILL: Rgb8 = Rgb8::new(230, 230, 230);
const CLASS_HEADER_FILL: Rgb8 = Rgb8::new(200, 200, 200);
const STUDENT_HEADER_FILL: Rgb8 = Rgb8::new(100, 100, 100);
const EVEN_ROW_FILL: Rgb8 = Rgb8::new(245, 245, 245);

const SUMMARY_WIDTHS: [f32; 2] = [60.0, 60.0];
const CLASS_COLUMNS: [(&str, f32); 6] = [
    ("Class", 30.0),
    ("Students", 25.0),
    ("Present", 25.0),
    ("Absent", 25.0),
    ("Total Days", 25.0),
    ("Avg. Rate", 30.0),
];
const STUDENT_COLUMNS: [(&str, f32); 7] = [
    ("Student Name", 45.0),
    ("Roll No", 20.0),
    ("Class", 20.0),
    ("Present", 20.0),
    ("Absent", 20.0),
    ("Total", 20.0),
    ("Attendance %", 25.0),
];

#[derive(Debug, Clone)]
pub struct PdfOptions {
    /// Application name and author printed in the page footer.
    pub creator: String,
    pub author: String,
    pub geometry: PageGeometry,
    /// Multiplier applied to every font size.
    pub font_scale: f32,
    pub show_generated_at: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            creator: "Attendance Management System".to_string(),
            author: "School Administration".to_string(),
            geometry: PageGeometry::a4_portrait(),
            font_scale: 1.0,
            show_generated_at: true,
        }
    }
}

impl PdfOptions {
    fn pt(&self, size: f32) -> f32 {
        size * self.font_scale
    }
}

pub fn tier_fill(tier: RateTier) -> Rgb8 {
    match tier {
        RateTier::High => Rgb8::new(200, 255, 200),
        RateTier::Medium => Rgb8::new(255, 255, 200),
        RateTier::Low => Rgb8::new(255, 200, 200),
    }
}

pub fn tier_text(tier: RateTier) -> Rgb8 {
    match tier {
        RateTier::High => Rgb8::new(0, 120, 0),
        RateTier::Medium => Rgb8::new(150, 100, 0),
        RateTier::Low => Rgb8::new(180, 0, 0),
    }
}

/// Names longer than the column allows are cut to 22 characters plus `...`.
/// Truncation happens on the raw name so entities are never split.
pub fn display_name(raw: &str) -> String {
    if raw.chars().count() > NAME_DISPLAY_LIMIT {
        let head: String = raw.chars().take(NAME_TRUNCATED_LEN).collect();
        format!("{}...", html_safe(&head))
    } else {
        html_safe(raw)
    }
}

pub fn render_pdf(
    input: &ExportInput<'_>,
    generated_at: NaiveDateTime,
    options: &PdfOptions,
) -> Result<Vec<u8>, ReportError> {
    let pages = layout_report(input, generated_at, options);
    draw(&pages, options)
}

pub fn layout_report(
    input: &ExportInput<'_>,
    generated_at: NaiveDateTime,
    options: &PdfOptions,
) -> Vec<Page> {
    let mut sheet = Sheet::new(options.geometry);
    sheet.set_auto_page_break(true);
    sheet.add_page();
    sheet.set_font(FontStyle::Regular, options.pt(10.0));

    match input {
        ExportInput::StoreUnavailable => {
            sheet.cell(0.0, 10.0, STORE_ERROR_MESSAGE, CellOpts::text_line(Align::Center));
        }
        ExportInput::Report(report) if report.is_empty() => {
            sheet.cell(0.0, 10.0, NO_DATA_MESSAGE, CellOpts::text_line(Align::Center));
        }
        ExportInput::Report(report) => {
            summary_section(&mut sheet, report, generated_at, options);
            class_section(&mut sheet, report, options);
            student_section(&mut sheet, report, options);
            footer_notes(&mut sheet, options);
        }
    }

    let mut pages = sheet.finish();
    decorate_pages(&mut pages, generated_at, options);
    pages
}

fn section_title(sheet: &mut Sheet, title: &str, size: f32, gap: f32, options: &PdfOptions) {
    sheet.set_font(FontStyle::Bold, options.pt(size));
    sheet.cell(0.0, 10.0, title, CellOpts::text_line(Align::Center));
    sheet.ln(gap);
}

fn summary_section(
    sheet: &mut Sheet,
    report: &AttendanceReport,
    generated_at: NaiveDateTime,
    options: &PdfOptions,
) {
    section_title(sheet, "ATTENDANCE SUMMARY", 14.0, 5.0, options);

    let totals = &report.totals;
    let rows = [
        ("Metric".to_string(), "Value".to_string()),
        ("Total Students".to_string(), totals.total_students.to_string()),
        ("Total Present Days".to_string(), group_thousands(totals.total_present)),
        ("Total Absent Days".to_string(), group_thousands(totals.total_absent)),
        (
            "Overall Attendance Rate".to_string(),
            format_percent(totals.overall_percentage),
        ),
        (
            "Report Generated".to_string(),
            generated_at.format(LONG_STAMP_FORMAT).to_string(),
        ),
    ];

    sheet.set_fill_color(SUMMARY_HEADER_FILL);
    for (i, (metric, value)) in rows.into_iter().enumerate() {
        let header = i == 0;
        let style = if header { FontStyle::Bold } else { FontStyle::Regular };
        sheet.set_font(style, options.pt(10.0));
        let mut left = CellOpts::boxed(Align::Left);
        let mut right = CellOpts::boxed(Align::Center).end_row();
        if header {
            left = left.filled();
            right = right.filled();
        }
        sheet.cell(SUMMARY_WIDTHS[0], 8.0, metric, left);
        sheet.cell(SUMMARY_WIDTHS[1], 8.0, value, right);
    }
    sheet.ln(10.0);
}

fn class_section(sheet: &mut Sheet, report: &AttendanceReport, options: &PdfOptions) {
    if report.classes.is_empty() {
        return;
    }
    section_title(sheet, "CLASS-WISE ATTENDANCE SUMMARY", 12.0, 3.0, options);

    sheet.set_font(FontStyle::Bold, options.pt(9.0));
    sheet.set_fill_color(CLASS_HEADER_FILL);
    header_row(sheet, &CLASS_COLUMNS, 8.0);

    sheet.set_font(FontStyle::Regular, options.pt(9.0));
    for class in &report.classes {
        sheet.set_fill_color(tier_fill(RateTier::for_percentage(class.class_percentage)));
        let values = [
            html_safe(&class.class),
            class.student_count.to_string(),
            group_thousands(class.present_total),
            group_thousands(class.absent_total),
            group_thousands(class.total_days),
            format_percent(class.class_percentage),
        ];
        let last = values.len() - 1;
        for (i, (value, (_, width))) in values.into_iter().zip(CLASS_COLUMNS).enumerate() {
            let mut opts = CellOpts::boxed(Align::Center).filled();
            if i == last {
                opts = opts.end_row();
            }
            sheet.cell(width, 7.0, value, opts);
        }
    }
    sheet.ln(10.0);
}

fn student_section(sheet: &mut Sheet, report: &AttendanceReport, options: &PdfOptions) {
    section_title(sheet, "INDIVIDUAL STUDENT ATTENDANCE", 12.0, 3.0, options);

    sheet.set_font(FontStyle::Bold, options.pt(9.0));
    sheet.set_fill_color(STUDENT_HEADER_FILL);
    sheet.set_text_color(Rgb8::WHITE);
    header_row(sheet, &STUDENT_COLUMNS, 8.0);

    sheet.set_text_color(Rgb8::BLACK);
    sheet.set_font(FontStyle::Regular, options.pt(8.0));
    let widths: Vec<f32> = STUDENT_COLUMNS.iter().map(|(_, w)| *w).collect();
    for (row, s) in report.students.iter().enumerate() {
        sheet.set_fill_color(if row % 2 == 0 {
            EVEN_ROW_FILL
        } else {
            Rgb8::WHITE
        });
        let rate_color = tier_text(RateTier::for_percentage(s.percentage));
        let body = CellOpts::boxed(Align::Center).filled();

        sheet.set_text_color(rate_color);
        sheet.cell(
            widths[0],
            7.0,
            display_name(&s.student_name),
            CellOpts::boxed(Align::Left).filled(),
        );
        sheet.set_text_color(Rgb8::BLACK);
        sheet.cell(widths[1], 7.0, html_safe(&s.roll_no), body);
        sheet.cell(widths[2], 7.0, html_safe(&s.class), body);
        sheet.cell(widths[3], 7.0, s.presents.to_string(), body);
        sheet.cell(widths[4], 7.0, s.absents.to_string(), body);
        sheet.cell(widths[5], 7.0, s.total_classes.to_string(), body);
        sheet.set_text_color(rate_color);
        sheet.cell(widths[6], 7.0, format_percent(s.percentage), body.end_row());
        sheet.set_text_color(Rgb8::BLACK);
    }
}

fn footer_notes(sheet: &mut Sheet, options: &PdfOptions) {
    sheet.ln(10.0);
    sheet.set_font(FontStyle::Italic, options.pt(8.0));
    sheet.cell(0.0, 5.0, SCOPE_NOTE, CellOpts::text_line(Align::Center));
    sheet.cell(0.0, 5.0, LEGEND_NOTE, CellOpts::text_line(Align::Center));
}

fn header_row(sheet: &mut Sheet, columns: &[(&str, f32)], height: f32) {
    let last = columns.len() - 1;
    for (i, (title, width)) in columns.iter().enumerate() {
        let mut opts = CellOpts::boxed(Align::Center).filled();
        if i == last {
            opts = opts.end_row();
        }
        sheet.cell(*width, height, *title, opts);
    }
}

/// Adds the running page header and the page-number footer. These sit
/// outside the content margins and never move body cells.
const FOOTER_HEIGHT_MM: f32 = 5.0;

/// Centres the footer in the bottom margin, below the page break line.
fn footer_top(g: &PageGeometry) -> f32 {
    let gap = (g.margin_bottom - FOOTER_HEIGHT_MM).max(0.0);
    g.height_mm - FOOTER_HEIGHT_MM - gap / 2.0
}

fn decorate_pages(pages: &mut [Page], generated_at: NaiveDateTime, options: &PdfOptions) {
    let g = options.geometry;
    let total = pages.len();
    let banner = |y: f32, height: f32, text: String, style: FontStyle, size: f32| Cell {
        x: g.margin_left,
        y,
        width: g.content_width(),
        height,
        text,
        style,
        font_size: options.pt(size),
        align: Align::Center,
        border: false,
        fill: None,
        text_color: Rgb8::BLACK,
    };

    for (i, page) in pages.iter_mut().enumerate() {
        let mut chrome = vec![banner(
            8.0,
            6.0,
            PAGE_HEADING.to_string(),
            FontStyle::Bold,
            12.0,
        )];
        if options.show_generated_at {
            chrome.push(banner(
                14.0,
                5.0,
                format!("Generated on {}", generated_at.format(super::LONG_STAMP_FORMAT)),
                FontStyle::Regular,
                8.0,
            ));
        }
        let mut rule = banner(20.0, 0.3, String::new(), FontStyle::Regular, 8.0);
        rule.fill = Some(Rgb8::BLACK);
        chrome.push(rule);
        chrome.push(banner(
            footer_top(&g),
            FOOTER_HEIGHT_MM,
            format!(
                "{} | {} | Page {} of {}",
                options.creator,
                options.author,
                i + 1,
                total
            ),
            FontStyle::Italic,
            8.0,
        ));
        chrome.append(&mut page.cells);
        page.cells = chrome;
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn get(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Italic => &self.italic,
        }
    }
}

fn pdf_error(e: impl std::fmt::Display) -> ReportError {
    ReportError::Formatting(e.to_string())
}

fn draw(pages: &[Page], options: &PdfOptions) -> Result<Vec<u8>, ReportError> {
    let g = options.geometry;
    let (doc, first_page, first_layer) = PdfDocument::new(
        DOCUMENT_TITLE,
        Mm(g.width_mm),
        Mm(g.height_mm),
        "Layer 1",
    );
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?,
        italic: doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(pdf_error)?,
    };

    for (i, page) in pages.iter().enumerate() {
        let (page_idx, layer_idx) = if i == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(g.width_mm), Mm(g.height_mm), "Layer 1")
        };
        let layer = doc.get_page(page_idx).get_layer(layer_idx);
        for cell in &page.cells {
            draw_cell(&layer, cell, &fonts, g.height_mm);
        }
    }

    doc.save_to_bytes().map_err(pdf_error)
}

fn pdf_color(c: Rgb8) -> Color {
    Color::Rgb(Rgb::new(
        f32::from(c.r) / 255.0,
        f32::from(c.g) / 255.0,
        f32::from(c.b) / 255.0,
        None,
    ))
}

const PT_TO_MM: f32 = 0.3528;
const CELL_PADDING_MM: f32 = 1.0;

/// Rough Helvetica advance width; good enough to centre short table text.
fn estimate_text_width(text: &str, size_pt: f32, style: FontStyle) -> f32 {
    let em = match style {
        FontStyle::Bold => 0.56,
        _ => 0.5,
    };
    text.chars().count() as f32 * size_pt * PT_TO_MM * em
}

/// Left edge of the cell's text. Centred text wider than the cell starts at
/// the padding instead of spilling past the left border.
fn text_origin_x(cell: &Cell) -> f32 {
    let inset = cell.x + CELL_PADDING_MM;
    match cell.align {
        Align::Left => inset,
        Align::Center => {
            let text_width = estimate_text_width(&cell.text, cell.font_size, cell.style);
            (cell.x + (cell.width - text_width) / 2.0).max(inset)
        }
    }
}

fn draw_cell(layer: &PdfLayerReference, cell: &Cell, fonts: &Fonts, page_height: f32) {
    // PDF user space grows upwards from the bottom-left corner.
    let top = page_height - cell.y;
    let bottom = top - cell.height;
    let rect = || {
        Rect::new(
            Mm(cell.x),
            Mm(bottom),
            Mm(cell.x + cell.width),
            Mm(top),
        )
    };

    if let Some(fill) = cell.fill {
        layer.set_fill_color(pdf_color(fill));
        layer.add_rect(rect().with_mode(PaintMode::Fill));
    }
    if cell.border {
        layer.set_outline_color(pdf_color(Rgb8::BLACK));
        layer.set_outline_thickness(0.5);
        layer.add_rect(rect().with_mode(PaintMode::Stroke));
    }
    if cell.text.is_empty() {
        return;
    }

    let x = text_origin_x(cell);
    let baseline = top - cell.height / 2.0 - cell.font_size * PT_TO_MM * 0.35;
    layer.set_fill_color(pdf_color(cell.text_color));
    layer.use_text(
        cell.text.clone(),
        cell.font_size,
        Mm(x),
        Mm(baseline),
        fonts.get(cell.style),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_fixtures::{add_days, add_student, store};
    use crate::report::{aggregate, AggregateOptions, ClassSummary, StudentAttendanceSummary};
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .and_then(|d| d.and_hms_opt(14, 30, 0))
            .expect("timestamp")
    }

    fn all_cells(pages: &[Page]) -> impl Iterator<Item = &Cell> {
        pages.iter().flat_map(|p| p.cells.iter())
    }

    fn student(name: &str, percentage: f64) -> StudentAttendanceSummary {
        StudentAttendanceSummary {
            student_id: name.to_string(),
            student_name: name.to_string(),
            roll_no: "1".to_string(),
            class: "7A".to_string(),
            presents: 0,
            absents: 0,
            total_classes: 0,
            percentage,
            first_attendance: None,
            last_attendance: None,
        }
    }

    #[test]
    fn sections_appear_in_order_with_summary_values() {
        let conn = store();
        add_student(&conn, "s1", "Asha Rao", "1", "7A");
        add_student(&conn, "s2", "Ben Ode", "2", "8B");
        add_days(&conn, "s1", 600, 400);
        add_days(&conn, "s2", 500, 0);
        let report = aggregate(&conn, &AggregateOptions::default()).expect("aggregate");

        let pages = layout_report(&ExportInput::Report(&report), at(), &PdfOptions::default());
        let texts: Vec<&str> = all_cells(&pages).map(|c| c.text.as_str()).collect();
        let pos = |t: &str| texts.iter().position(|x| *x == t).expect(t);
        assert!(pos("ATTENDANCE SUMMARY") < pos("CLASS-WISE ATTENDANCE SUMMARY"));
        assert!(pos("CLASS-WISE ATTENDANCE SUMMARY") < pos("INDIVIDUAL STUDENT ATTENDANCE"));
        assert!(pos("INDIVIDUAL STUDENT ATTENDANCE") < pos(SCOPE_NOTE));
        assert!(texts.contains(&"1,100"));
        assert!(texts.contains(&"400"));
        assert!(texts.contains(&"73.33%"));
        assert!(texts.contains(&"October 16, 2026 at 2:30 PM"));

        let metric = pages[0].find("Metric").expect("summary header");
        assert_eq!(metric.fill, Some(SUMMARY_HEADER_FILL));
        assert_eq!(metric.style, FontStyle::Bold);
        let students_row = pages[0].find("Total Students").expect("summary row");
        assert_eq!(students_row.fill, None);
    }

    #[test]
    fn class_rows_are_tinted_by_rate_with_ninety_inclusive() {
        let mut report = AttendanceReport::default();
        report.students.push(student("x", 90.0));
        for (name, pct) in [("Hi", 90.0), ("Mid", 89.99), ("Lo", 74.99)] {
            report.classes.push(ClassSummary {
                class: name.to_string(),
                student_count: 1,
                present_total: 0,
                absent_total: 0,
                total_days: 0,
                class_percentage: pct,
            });
        }
        let pages = layout_report(&ExportInput::Report(&report), at(), &PdfOptions::default());
        let fill_of = |t: &str| pages[0].find(t).and_then(|c| c.fill);
        assert_eq!(fill_of("Hi"), Some(Rgb8::new(200, 255, 200)));
        assert_eq!(fill_of("Mid"), Some(Rgb8::new(255, 255, 200)));
        assert_eq!(fill_of("Lo"), Some(Rgb8::new(255, 200, 200)));
        assert_eq!(fill_of("Avg. Rate"), Some(CLASS_HEADER_FILL));
    }

    #[test]
    fn long_names_are_truncated_only_past_twenty_five_characters() {
        let exactly_25 = "Abcdefghij Klmnopqrst Uvw";
        let exactly_26 = "Abcdefghij Klmnopqrst Uvwx";
        assert_eq!(exactly_25.chars().count(), 25);
        assert_eq!(display_name(exactly_25), exactly_25);
        assert_eq!(display_name(exactly_26), "Abcdefghij Klmnopqrst ...");
        assert_eq!(display_name("Zoë & Co"), "Zoë &amp; Co");
        assert_eq!(
            display_name("O'Brien-Fitzgerald Alexandra"),
            "O&#039;Brien-Fitzgerald A..."
        );
    }

    #[test]
    fn student_rows_alternate_fill_and_colour_only_name_and_rate() {
        let mut report = AttendanceReport::default();
        report.students.push(student("Green", 95.0));
        report.students.push(student("Amber", 80.0));
        report.students.push(student("Red", 10.0));
        let pages = layout_report(&ExportInput::Report(&report), at(), &PdfOptions::default());
        let page = &pages[0];

        let green = page.find("Green").expect("green row");
        assert_eq!(green.fill, Some(EVEN_ROW_FILL));
        assert_eq!(green.text_color, Rgb8::new(0, 120, 0));
        let amber = page.find("Amber").expect("amber row");
        assert_eq!(amber.fill, Some(Rgb8::WHITE));
        assert_eq!(amber.text_color, Rgb8::new(150, 100, 0));
        let red = page.find("Red").expect("red row");
        assert_eq!(red.fill, Some(EVEN_ROW_FILL));
        assert_eq!(red.text_color, Rgb8::new(180, 0, 0));

        let row: Vec<&Cell> = page.cells.iter().filter(|c| c.y == amber.y).collect();
        assert_eq!(row.len(), STUDENT_COLUMNS.len());
        for cell in &row[1..row.len() - 1] {
            assert_eq!(cell.text_color, Rgb8::BLACK, "cell {:?}", cell.text);
        }
        assert_eq!(row[row.len() - 1].text, "80%");
        assert_eq!(row[row.len() - 1].text_color, Rgb8::new(150, 100, 0));

        let header = page.find("Student Name").expect("header");
        assert_eq!(header.fill, Some(STUDENT_HEADER_FILL));
        assert_eq!(header.text_color, Rgb8::WHITE);
    }

    #[test]
    fn empty_report_has_only_the_notice() {
        let report = AttendanceReport::default();
        let pages = layout_report(&ExportInput::Report(&report), at(), &PdfOptions::default());
        assert_eq!(pages.len(), 1);
        let notice = pages[0].find(NO_DATA_MESSAGE).expect("notice");
        assert_eq!(notice.align, Align::Center);
        assert!(pages[0].find("ATTENDANCE SUMMARY").is_none());
        assert!(pages[0].find("Total Students").is_none());
    }

    #[test]
    fn store_failure_has_only_the_error_cell() {
        let pages = layout_report(&ExportInput::StoreUnavailable, at(), &PdfOptions::default());
        assert_eq!(pages.len(), 1);
        let cell = pages[0].find(STORE_ERROR_MESSAGE).expect("error cell");
        assert_eq!(cell.align, Align::Center);
        assert!(pages[0].find("ATTENDANCE SUMMARY").is_none());
        assert!(pages[0].find("INDIVIDUAL STUDENT ATTENDANCE").is_none());
    }

    #[test]
    fn long_rosters_paginate_and_keep_order() {
        let mut report = AttendanceReport::default();
        for i in 0..80 {
            report.students.push(student(&format!("Pupil {:02}", i), 50.0));
        }
        let options = PdfOptions::default();
        let pages = layout_report(&ExportInput::Report(&report), at(), &options);
        assert!(pages.len() > 1);

        let limit = options.geometry.height_mm - options.geometry.margin_bottom;
        let names: Vec<&str> = all_cells(&pages)
            .filter(|c| c.text.starts_with("Pupil "))
            .map(|c| {
                assert!(c.y + c.height <= limit);
                c.text.as_str()
            })
            .collect();
        let expected: Vec<String> = (0..80).map(|i| format!("Pupil {:02}", i)).collect();
        assert_eq!(names, expected);

        let last = pages.len();
        assert!(pages[last - 1]
            .find(&format!(
                "Attendance Management System | School Administration | Page {} of {}",
                last, last
            ))
            .is_some());
    }

    #[test]
    fn footer_stays_clear_of_body_rows_at_the_smallest_margin() {
        let mut report = AttendanceReport::default();
        for i in 0..120 {
            report.students.push(student(&format!("Pupil {:03}", i), 80.0));
        }
        for margin in [10.0, 25.0, 40.0] {
            let mut options = PdfOptions::default();
            options.geometry.margin_bottom = margin;
            let pages = layout_report(&ExportInput::Report(&report), at(), &options);
            assert!(pages.len() > 1);

            let total = pages.len();
            for (i, page) in pages.iter().enumerate() {
                let footer_text = format!(
                    "Attendance Management System | School Administration | Page {} of {}",
                    i + 1,
                    total
                );
                let footer = page.find(&footer_text).expect("footer");
                assert!(footer.y + footer.height <= options.geometry.height_mm);
                for cell in page.cells.iter().filter(|c| c.text != footer_text) {
                    assert!(
                        cell.y + cell.height <= footer.y,
                        "{:?} overlaps the footer at margin {}",
                        cell.text,
                        margin
                    );
                }
            }
        }
    }

    #[test]
    fn default_footer_sits_where_it_always_has() {
        assert_eq!(footer_top(&PageGeometry::a4_portrait()), 282.0);
    }

    #[test]
    fn centred_text_never_starts_left_of_the_cell() {
        let mut cell = Cell {
            x: 40.0,
            y: 50.0,
            width: 10.0,
            height: 6.0,
            text: "A name far too long for this column".to_string(),
            border: true,
            align: Align::Center,
            fill: None,
            text_color: Rgb8::BLACK,
            style: FontStyle::Regular,
            font_size: 9.0,
        };
        assert_eq!(text_origin_x(&cell), 40.0 + CELL_PADDING_MM);

        cell.text = "7".to_string();
        let x = text_origin_x(&cell);
        assert!(x > 40.0 + CELL_PADDING_MM);
        assert!(x < 45.0);

        cell.align = Align::Left;
        assert_eq!(text_origin_x(&cell), 40.0 + CELL_PADDING_MM);
    }

    #[test]
    fn rendered_document_is_a_pdf() {
        let mut report = AttendanceReport::default();
        report.students.push(student("Solo", 100.0));
        let bytes = render_pdf(&ExportInput::Report(&report), at(), &PdfOptions::default())
            .expect("render");
        assert!(bytes.starts_with(b"%PDF"));
    }
}
