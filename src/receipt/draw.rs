use serde::{Deserialize, Serialize};

/// A4 in millimetres.
pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const PRIMARY: Rgb = Rgb(52, 152, 219);
pub const TEXT: Rgb = Rgb(45, 52, 54);
pub const LIGHT_TEXT: Rgb = Rgb(99, 110, 114);
pub const WHITE: Rgb = Rgb(255, 255, 255);
pub const PANEL: Rgb = Rgb(247, 247, 247);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// One drawing command of a fixed page layout. Coordinates are millimetres
/// from the top left corner of the page, text `y` is the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum DrawOp {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Option<Rgb>,
        stroke: Option<Rgb>,
    },
    Text {
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        color: Rgb,
        align: Align,
        text: String,
    },
}

/// Small builder keeping the current font state, the way a canvas API does.
#[derive(Debug)]
pub struct Canvas {
    ops: Vec<DrawOp>,
    size: f32,
    bold: bool,
    color: Rgb,
}

impl Canvas {
    pub fn new() -> Self {
        Canvas {
            ops: Vec::new(),
            size: 10.0,
            bold: false,
            color: TEXT,
        }
    }

    pub fn font(&mut self, size: f32, bold: bool) -> &mut Self {
        self.size = size;
        self.bold = bold;
        self
    }

    pub fn color(&mut self, color: Rgb) -> &mut Self {
        self.color = color;
        self
    }

    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, fill: Option<Rgb>, stroke: Option<Rgb>) -> &mut Self {
        self.ops.push(DrawOp::Rect {
            x,
            y,
            width,
            height,
            fill,
            stroke,
        });
        self
    }

    pub fn text(&mut self, text: &str, x: f32, y: f32) -> &mut Self {
        self.text_aligned(text, x, y, Align::Left)
    }

    pub fn text_aligned(&mut self, text: &str, x: f32, y: f32, align: Align) -> &mut Self {
        self.ops.push(DrawOp::Text {
            x,
            y,
            size: self.size,
            bold: self.bold,
            color: self.color,
            align,
            text: text.to_owned(),
        });
        self
    }

    pub fn finish(self) -> Vec<DrawOp> {
        self.ops
    }
}

/// Greedy word wrap by character count.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
