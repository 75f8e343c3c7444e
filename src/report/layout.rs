//! Cursor-based page layout for tabular reports.
//!
//! A [`Sheet`] places fixed-size cells left to right and top to bottom in
//! millimetres, starting a new page when a cell would cross the bottom
//! margin. The result is a plain list of pages and cells so that pagination
//! and styling can be inspected before anything is drawn.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const BLACK: Rgb8 = Rgb8::new(0, 0, 0);
    pub const WHITE: Rgb8 = Rgb8::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    /// Distance from the bottom edge at which content breaks to a new page.
    pub margin_bottom: f32,
}

impl PageGeometry {
    pub fn a4_portrait() -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margin_left: 15.0,
            margin_right: 15.0,
            margin_top: 27.0,
            margin_bottom: 25.0,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width_mm - self.margin_left - self.margin_right
    }

    fn break_line(&self) -> f32 {
        self.height_mm - self.margin_bottom
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub text: String,
    pub style: FontStyle,
    pub font_size: f32,
    pub align: Align,
    pub border: bool,
    pub fill: Option<Rgb8>,
    pub text_color: Rgb8,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub cells: Vec<Cell>,
}

impl Page {
    #[cfg(test)]
    pub fn find(&self, text: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.text == text)
    }
}

/// How a single cell is drawn and where the cursor goes afterwards.
#[derive(Debug, Clone, Copy)]
pub struct CellOpts {
    pub border: bool,
    pub fill: bool,
    pub align: Align,
    pub new_line: bool,
}

impl CellOpts {
    pub const fn boxed(align: Align) -> Self {
        Self {
            border: true,
            fill: false,
            align,
            new_line: false,
        }
    }

    pub const fn text_line(align: Align) -> Self {
        Self {
            border: false,
            fill: false,
            align,
            new_line: true,
        }
    }

    pub fn filled(mut self) -> Self {
        self.fill = true;
        self
    }

    pub fn end_row(mut self) -> Self {
        self.new_line = true;
        self
    }
}

pub struct Sheet {
    geometry: PageGeometry,
    pages: Vec<Page>,
    x: f32,
    y: f32,
    style: FontStyle,
    font_size: f32,
    fill_color: Rgb8,
    text_color: Rgb8,
    auto_page_break: bool,
}

impl Sheet {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            x: geometry.margin_left,
            y: geometry.margin_top,
            geometry,
            pages: Vec::new(),
            style: FontStyle::Regular,
            font_size: 10.0,
            fill_color: Rgb8::WHITE,
            text_color: Rgb8::BLACK,
            auto_page_break: true,
        }
    }

    pub fn set_auto_page_break(&mut self, enabled: bool) {
        self.auto_page_break = enabled;
    }

    pub fn add_page(&mut self) {
        self.pages.push(Page::default());
        self.x = self.geometry.margin_left;
        self.y = self.geometry.margin_top;
    }

    pub fn set_font(&mut self, style: FontStyle, size: f32) {
        self.style = style;
        self.font_size = size;
    }

    pub fn set_fill_color(&mut self, color: Rgb8) {
        self.fill_color = color;
    }

    pub fn set_text_color(&mut self, color: Rgb8) {
        self.text_color = color;
    }

    /// Places one cell at the cursor. A width of zero extends the cell to the
    /// right margin.
    pub fn cell(&mut self, width: f32, height: f32, text: impl Into<String>, opts: CellOpts) {
        if self.pages.is_empty() {
            self.add_page();
        }
        if self.auto_page_break && self.y + height > self.geometry.break_line() {
            let x = self.x;
            self.add_page();
            self.x = x;
        }
        let width = if width <= 0.0 {
            self.geometry.width_mm - self.geometry.margin_right - self.x
        } else {
            width
        };
        let cell = Cell {
            x: self.x,
            y: self.y,
            width,
            height,
            text: text.into(),
            style: self.style,
            font_size: self.font_size,
            align: opts.align,
            border: opts.border,
            fill: opts.fill.then_some(self.fill_color),
            text_color: self.text_color,
        };
        if let Some(page) = self.pages.last_mut() {
            page.cells.push(cell);
        }
        if opts.new_line {
            self.x = self.geometry.margin_left;
            self.y += height;
        } else {
            self.x += width;
        }
    }

    /// Moves the cursor to the left margin, `height` millimetres down.
    pub fn ln(&mut self, height: f32) {
        self.x = self.geometry.margin_left;
        self.y += height;
    }

    #[cfg(test)]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn finish(mut self) -> Vec<Page> {
        if self.pages.is_empty() {
            self.add_page();
        }
        self.pages
    }
}
