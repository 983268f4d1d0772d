use crate::receipt::draw::{Align, DrawOp, PAGE_HEIGHT, PAGE_WIDTH, Rgb};
use anyhow::{Context, Result, anyhow, bail};
use async_std::fs;
use async_std::path::PathBuf;
use printpdf::path::PaintMode;
use printpdf::{BuiltinFont, Color, Mm, PdfDocument, Rect};
use std::future::Future;
use std::io::BufWriter;
use tracing::{debug, info};

/// What a renderer is asked to turn into PDF bytes.
#[derive(Debug, Clone, Copy)]
pub enum RenderInput<'a> {
    /// A self-contained HTML document, as produced by `populate`.
    Html(&'a str),
    /// A fixed layout of drawing commands, as produced by `Receipt::layout`.
    Draw(&'a [DrawOp]),
}

pub trait PdfRenderer {
    fn render(&self, input: RenderInput<'_>) -> impl Future<Output = Result<Vec<u8>>>;
}

/// Somewhere to keep finished documents. Returns where the file can be read
/// back from.
pub trait BlobStore {
    fn put(&self, file_name: &str, bytes: Vec<u8>) -> impl Future<Output = Result<String>>;
}

/// Draws layouts with the PDF builtin Helvetica faces. HTML needs a browser
/// engine and is declined.
#[derive(Debug, Clone)]
pub struct PrintPdf {
    pub title: String,
}

impl PrintPdf {
    pub fn new(title: &str) -> Self {
        PrintPdf {
            title: title.to_owned(),
        }
    }

    fn draw(&self, ops: &[DrawOp]) -> Result<Vec<u8>> {
        let (doc, page, layer) = PdfDocument::new(&self.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| anyhow!("{:?}", e))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| anyhow!("{:?}", e))?;

        for op in ops {
            match op {
                DrawOp::Rect {
                    x,
                    y,
                    width,
                    height,
                    fill,
                    stroke,
                } => {
                    let mode = match (fill, stroke) {
                        (Some(_), Some(_)) => PaintMode::FillStroke,
                        (Some(_), None) => PaintMode::Fill,
                        (None, Some(_)) => PaintMode::Stroke,
                        (None, None) => continue,
                    };
                    if let Some(fill) = fill {
                        layer.set_fill_color(color(*fill));
                    }
                    if let Some(stroke) = stroke {
                        layer.set_outline_color(color(*stroke));
                    }
                    // page origin is bottom left
                    let rect = Rect::new(
                        Mm(*x),
                        Mm(PAGE_HEIGHT - y - height),
                        Mm(x + width),
                        Mm(PAGE_HEIGHT - y),
                    )
                    .with_mode(mode);
                    layer.add_rect(rect);
                }
                DrawOp::Text {
                    x,
                    y,
                    size,
                    bold: is_bold,
                    color: text_color,
                    align,
                    text,
                } => {
                    let font = if *is_bold { &bold } else { &regular };
                    let left = match align {
                        Align::Left => *x,
                        Align::Center => x - text_width(text, *size) / 2.0,
                        Align::Right => x - text_width(text, *size),
                    };
                    layer.set_fill_color(color(*text_color));
                    layer.use_text(text.as_str(), *size, Mm(left.max(0.0)), Mm(PAGE_HEIGHT - y), font);
                }
            }
        }

        let mut writer = BufWriter::new(Vec::<u8>::new());
        doc.save(&mut writer).map_err(|e| anyhow!("{:?}", e))?;
        writer.into_inner().context("Failed to flush PDF")
    }
}

impl PdfRenderer for PrintPdf {
    async fn render(&self, input: RenderInput<'_>) -> Result<Vec<u8>> {
        match input {
            RenderInput::Draw(ops) => self.draw(ops),
            RenderInput::Html(_) => bail!("HTML rendering needs a browser based renderer"),
        }
    }
}

fn color(Rgb(r, g, b): Rgb) -> Color {
    Color::Rgb(printpdf::Rgb::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        None,
    ))
}

/// Helvetica averages about half an em per character.
fn text_width(text: &str, size: f32) -> f32 {
    const PT_TO_MM: f32 = 25.4 / 72.0;
    text.chars().count() as f32 * size * 0.5 * PT_TO_MM
}

/// Files documents under a directory, addressed by `base_url` when given.
#[derive(Debug, Clone)]
pub struct DirStore {
    pub dir: PathBuf,
    pub base_url: Option<String>,
}

impl DirStore {
    pub fn new(dir: &str) -> Self {
        DirStore {
            dir: PathBuf::from(dir),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.trim_end_matches('/').to_owned());
        self
    }
}

impl BlobStore for DirStore {
    async fn put(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.dir.join(file_name);
        fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(match &self.base_url {
            Some(base_url) => format!("{}/{}", base_url, file_name),
            None => path.display().to_string(),
        })
    }
}

/// `REC-2024-0001.pdf`. Characters that are unsafe in a file name become `_`.
pub fn document_file_name(number: &str) -> String {
    let name: String = number
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() {
        "document.pdf".into()
    } else {
        format!("{}.pdf", name)
    }
}

/// Renders a document and keeps it in the store. Returns the stored location.
pub async fn publish<R, S>(renderer: &R, store: &S, number: &str, input: RenderInput<'_>) -> Result<String>
where
    R: PdfRenderer + ?Sized,
    S: BlobStore + ?Sized,
{
    let bytes = renderer
        .render(input)
        .await
        .with_context(|| format!("Failed to render {}", number))?;
    debug!("Rendered {} into {} bytes", number, bytes.len());
    let location = store
        .put(&document_file_name(number), bytes)
        .await
        .with_context(|| format!("Failed to store {}", number))?;
    info!("Published {} at {}", number, location);
    Ok(location)
}

#[cfg(test)]
mod publish_tests {
    use super::*;
    use crate::document::Party;
    use crate::receipt::Receipt;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        files: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl BlobStore for MemoryStore {
        async fn put(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
            self.files.lock().unwrap().insert(file_name.to_owned(), bytes);
            Ok(format!("memory://{}", file_name))
        }
    }

    #[test]
    fn file_names_are_safe() {
        assert_eq!(document_file_name("REC-2024-0001"), "REC-2024-0001.pdf");
        assert_eq!(document_file_name("A/7"), "A_7.pdf");
        assert_eq!(document_file_name(" "), "document.pdf");
    }

    #[async_std::test]
    async fn publishes_a_receipt_pdf() -> Result<()> {
        let receipt = Receipt::payment(
            "REC-2024-0001",
            Party::new("Walaka Software, Lda"),
            Party::new("Sample Client"),
            NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
            "Bank Transfer",
        );
        let ops = receipt.layout();
        let store = MemoryStore::default();
        let location = publish(&PrintPdf::new("Receipt"), &store, &receipt.number, RenderInput::Draw(&ops)).await?;
        assert_eq!(location, "memory://REC-2024-0001.pdf");

        let files = store.files.lock().unwrap();
        let bytes = files.get("REC-2024-0001.pdf").unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        Ok(())
    }

    #[async_std::test]
    async fn html_is_declined() {
        let store = MemoryStore::default();
        let result = publish(&PrintPdf::new("Invoice"), &store, "INV-1", RenderInput::Html("<html></html>")).await;
        assert!(result.is_err());
        assert!(store.files.lock().unwrap().is_empty());
    }
}
