//! PDF drawing for redeemed certificates.
//!
//! The page is A4 landscape with the template background stretched over
//! it. Positions below are given the way the template was designed: in
//! millimetres from the top edge, for a 10 mm text cell. printpdf wants
//! baselines measured from the bottom edge, so [`Layout`] converts.

use std::fs::File;
use std::path::{Path, PathBuf};

use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::{Image, ImageTransform, Mm, PdfDocument, PdfLayerReference};

use super::RenderError;
use crate::storage::Certificate;

pub const PAGE_WIDTH: f32 = 297.0;
pub const PAGE_HEIGHT: f32 = 210.0;

const HEADLINE_SIZE: f32 = 40.0;
const FOOTER_SIZE: f32 = 16.0;

const NAME_TOP: f32 = 110.0;
const TYPE_TOP: f32 = NAME_TOP + 26.0;
const FOOTER_TOP: f32 = PAGE_HEIGHT - 25.0;
const CELL_HEIGHT: f32 = 10.0;
const DATE_LEFT: f32 = 5.0;
const CODE_RIGHT: f32 = 7.0;

const PT_TO_MM: f32 = 25.4 / 72.0;

const ORGANIZATION: &str = "Austro Magnum";
const SUBJECT: &str = "Zertifikat";

pub const FONT_FILE: &str = "CutiveMono-Regular.ttf";
pub const BACKGROUND_FILE: &str = "background.png";

/// Template assets inside the template directory.
#[derive(Debug, Clone)]
pub struct Template {
    pub font: PathBuf,
    pub background: PathBuf,
}

impl Template {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            font: dir.join(FONT_FILE),
            background: dir.join(BACKGROUND_FILE),
        }
    }
}

/// Text baseline position in millimetres, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
}

/// Where each text element of a certificate goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub name: Placement,
    pub kind: Placement,
    pub date: Placement,
    pub code: Placement,
}

/// Baseline of text vertically centred in a cell whose top edge is `top`
/// millimetres below the page top.
fn baseline(top: f32, size_pt: f32) -> f32 {
    PAGE_HEIGHT - (top + CELL_HEIGHT / 2.0 + 0.3 * size_pt * PT_TO_MM)
}

impl Layout {
    /// Compute positions; `measure(text, size_pt)` returns the text width in
    /// millimetres.
    pub fn for_certificate(cert: &Certificate, measure: impl Fn(&str, f32) -> f32) -> Self {
        let centered = |text: &str, top: f32| Placement {
            x: (PAGE_WIDTH - measure(text, HEADLINE_SIZE)) / 2.0,
            y: baseline(top, HEADLINE_SIZE),
        };
        let footer = baseline(FOOTER_TOP, FOOTER_SIZE);

        Self {
            name: centered(&cert.name, NAME_TOP),
            kind: centered(&cert.kind, TYPE_TOP),
            date: Placement {
                x: DATE_LEFT,
                y: footer,
            },
            code: Placement {
                x: PAGE_WIDTH - (measure(&cert.code, FOOTER_SIZE) + CODE_RIGHT),
                y: footer,
            },
        }
    }
}

/// Horizontal advance measurement from the template font.
struct FontMetrics<'a> {
    face: ttf_parser::Face<'a>,
}

impl<'a> FontMetrics<'a> {
    fn parse(data: &'a [u8]) -> Result<Self, RenderError> {
        let face = ttf_parser::Face::parse(data, 0)
            .map_err(|e| RenderError::Template(format!("unreadable font: {e}")))?;
        Ok(Self { face })
    }

    /// Width of `text` at `size_pt`, in millimetres.
    fn text_width(&self, text: &str, size_pt: f32) -> f32 {
        let units: u32 = text
            .chars()
            .filter_map(|c| self.face.glyph_index(c))
            .filter_map(|glyph| self.face.glyph_hor_advance(glyph))
            .map(u32::from)
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let em = units as f32 / f32::from(self.face.units_per_em());
        em * size_pt * PT_TO_MM
    }
}

fn pdf_error(e: impl std::fmt::Display) -> RenderError {
    RenderError::Pdf(e.to_string())
}

/// Stretch the background image over the whole page.
fn draw_background(layer: &PdfLayerReference, path: &Path) -> Result<(), RenderError> {
    let file = File::open(path)
        .map_err(|e| RenderError::Template(format!("{}: {e}", path.display())))?;
    let decoder = PngDecoder::new(std::io::BufReader::new(file)).map_err(pdf_error)?;
    let image = Image::try_from(decoder).map_err(pdf_error)?;

    #[allow(clippy::cast_precision_loss)]
    let (width_px, height_px) = (image.image.width.0 as f32, image.image.height.0 as f32);
    if width_px <= 0.0 || height_px <= 0.0 {
        return Err(RenderError::Template(format!("{} is empty", path.display())));
    }

    // At this resolution the image is exactly one page wide.
    let dpi = width_px * 25.4 / PAGE_WIDTH;
    let natural_height = height_px / dpi * 25.4;

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(0.0)),
            translate_y: Some(Mm(0.0)),
            dpi: Some(dpi),
            scale_y: Some(PAGE_HEIGHT / natural_height),
            ..Default::default()
        },
    );
    Ok(())
}

/// Draw `cert` onto the template and return the encoded PDF.
///
/// Blocking; call from a blocking-capable thread.
pub fn render_certificate(cert: &Certificate, template: &Template) -> Result<Vec<u8>, RenderError> {
    let font_data = std::fs::read(&template.font)
        .map_err(|e| RenderError::Template(format!("{}: {e}", template.font.display())))?;
    let metrics = FontMetrics::parse(&font_data)?;
    let layout = Layout::for_certificate(cert, |text, size| metrics.text_width(text, size));

    let (doc, page, layer) = PdfDocument::new(
        format!("{SUBJECT} {}", cert.code),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        SUBJECT,
    );
    let doc = doc
        .with_author(ORGANIZATION)
        .with_creator(ORGANIZATION)
        .with_producer(ORGANIZATION)
        .with_subject(SUBJECT);
    let layer = doc.get_page(page).get_layer(layer);

    draw_background(&layer, &template.background)?;

    let font = doc
        .add_external_font(font_data.as_slice())
        .map_err(pdf_error)?;
    let texts = [
        (cert.name.as_str(), HEADLINE_SIZE, layout.name),
        (cert.kind.as_str(), HEADLINE_SIZE, layout.kind),
        (cert.date.as_str(), FOOTER_SIZE, layout.date),
        (cert.code.as_str(), FOOTER_SIZE, layout.code),
    ];
    for (text, size, at) in texts {
        layer.use_text(text, size, Mm(at.x), Mm(at.y), &font);
    }

    doc.save_to_bytes().map_err(pdf_error)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cert() -> Certificate {
        Certificate {
            id: 1,
            code: "01ARZ3NDEKTSV4RRFFQ69G5FAV".into(),
            kind: "Gold".into(),
            name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            tags: String::new(),
            date: "09.11.2024".into(),
            generated: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Every character is 2 mm wide regardless of size.
    fn fixed_width(text: &str, _size: f32) -> f32 {
        #[allow(clippy::cast_precision_loss)]
        let len = text.chars().count() as f32;
        len * 2.0
    }

    #[test]
    fn headline_text_is_centered() {
        let layout = Layout::for_certificate(&cert(), fixed_width);
        // "Jane Doe" = 16 mm, "Gold" = 8 mm
        assert!((layout.name.x - (PAGE_WIDTH - 16.0) / 2.0).abs() < f32::EPSILON);
        assert!((layout.kind.x - (PAGE_WIDTH - 8.0) / 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn footer_shares_a_baseline() {
        let layout = Layout::for_certificate(&cert(), fixed_width);
        assert!((layout.date.x - DATE_LEFT).abs() < f32::EPSILON);
        assert!((layout.date.y - layout.code.y).abs() < f32::EPSILON);
        // 26 characters = 52 mm, ending 7 mm from the right edge.
        assert!((layout.code.x + 52.0 + CODE_RIGHT - PAGE_WIDTH).abs() < 1e-3);
    }

    #[test]
    fn lines_run_top_to_bottom() {
        let layout = Layout::for_certificate(&cert(), fixed_width);
        assert!(layout.name.y > layout.kind.y);
        assert!(layout.kind.y > layout.date.y);
        assert!(layout.date.y > 0.0);
        assert!(layout.name.y < PAGE_HEIGHT);
    }

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|window| window == needle.as_bytes())
    }

    #[test]
    fn certificate_is_drawn_onto_the_template() {
        let dir = tempfile::TempDir::new().unwrap();
        crate::render::testing::install_template(dir.path());

        let pdf = render_certificate(&cert(), &Template::in_dir(dir.path())).unwrap();

        assert!(pdf.starts_with(b"%PDF"));
        assert!(contains(&pdf, ORGANIZATION));
        assert!(contains(&pdf, SUBJECT));
    }

    #[test]
    fn missing_font_is_a_template_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let template = Template::in_dir(dir.path());
        let err = render_certificate(&cert(), &template)
            .unwrap_err()
            .to_string();
        assert!(err.contains(FONT_FILE), "unexpected error: {err}");
    }

    #[test]
    fn garbage_font_is_a_template_error() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(FONT_FILE), b"not a font").unwrap();
        let template = Template::in_dir(dir.path());
        let result = render_certificate(&cert(), &template);
        assert!(matches!(result, Err(RenderError::Template(_))));
    }

    #[test]
    fn missing_background_is_a_template_error() {
        let dir = tempfile::TempDir::new().unwrap();
        crate::render::testing::install_template(dir.path());
        std::fs::remove_file(dir.path().join(BACKGROUND_FILE)).unwrap();

        let err = render_certificate(&cert(), &Template::in_dir(dir.path())).unwrap_err();
        assert!(matches!(err, RenderError::Template(ref m) if m.contains(BACKGROUND_FILE)), "{err}");
    }
}
