//! Frame composition.
//!
//! A frame is the single still image of a video: a base layer (photo or plain
//! color), a contrast overlay when a photo is used, and the content record's
//! text blocks stacked top to bottom.

use image::{imageops::FilterType, Rgb as Pixel, RgbImage};
use std::path::Path;
use tracing::{debug, warn};

use factreel_models::render::{
    ACCENT_COLOR, BACKGROUND_COLOR, CANVAS_HEIGHT, CANVAS_WIDTH, DIVIDER_COLOR,
    HASHTAG_BOTTOM_OFFSET, LAYOUT_TOP, MARGIN_X, OVERLAY_ALPHA,
};
use factreel_models::{ContentRecord, FontRole, Rgb, TextBlock};

use crate::error::{MediaError, MediaResult};
use crate::fonts::FontBook;
use crate::layout::wrap;

const TOP_RULE_HEIGHT: u32 = 6;
const DIVIDER_HEIGHT: u32 = 4;
const GAP_AFTER_TOP_RULE: u32 = 50;
const GAP_AFTER_TITLE: u32 = 40;
const GAP_AFTER_LEAD: u32 = 30;
const GAP_AFTER_DIVIDER: u32 = 60;

/// A line of text at its final position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub role: FontRole,
    pub color: Rgb,
    /// Left edge, `(canvas width - measured width) / 2`
    pub x: f32,
    /// Top edge
    pub y: u32,
}

/// A filled horizontal rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedRule {
    pub y: u32,
    pub height: u32,
    pub color: Rgb,
}

/// Positioned content of a frame, independent of any pixels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FramePlan {
    pub lines: Vec<PlacedLine>,
    pub rules: Vec<PlacedRule>,
    /// Cursor position after the last cursor-driven block
    pub content_bottom: u32,
    /// Fixed top edge of the hashtag line
    pub hashtag_y: u32,
}

impl FramePlan {
    /// Whether cursor-driven text runs into the pinned hashtag line.
    pub fn overflows(&self) -> bool {
        self.content_bottom > self.hashtag_y
    }
}

/// Composes frames for content records.
#[derive(Debug, Clone)]
pub struct FrameComposer {
    fonts: FontBook,
}

impl FrameComposer {
    pub fn new(fonts: FontBook) -> Self {
        Self { fonts }
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Lay out the record's text blocks.
    ///
    /// The cursor starts at [`LAYOUT_TOP`] and only moves down. The hashtag
    /// line is pinned near the bottom and may be overlapped by long bodies.
    pub fn plan(&self, record: &ContentRecord) -> FramePlan {
        let mut plan = FramePlan {
            hashtag_y: CANVAS_HEIGHT.saturating_sub(HASHTAG_BOTTOM_OFFSET),
            ..Default::default()
        };
        let mut y = LAYOUT_TOP;

        plan.rules.push(PlacedRule {
            y,
            height: TOP_RULE_HEIGHT,
            color: ACCENT_COLOR,
        });
        y += GAP_AFTER_TOP_RULE;

        y = self.place_block(&mut plan, &TextBlock::title(&record.title), y);
        y += GAP_AFTER_TITLE;

        plan.rules.push(PlacedRule {
            y,
            height: DIVIDER_HEIGHT,
            color: DIVIDER_COLOR,
        });
        y += GAP_AFTER_DIVIDER;

        if let Some(intro) = record.intro() {
            y = self.place_block(&mut plan, &TextBlock::lead(intro), y);
            y += GAP_AFTER_LEAD;
            plan.rules.push(PlacedRule {
                y,
                height: DIVIDER_HEIGHT,
                color: DIVIDER_COLOR,
            });
            y += GAP_AFTER_DIVIDER;
        }

        y = self.place_block(&mut plan, &TextBlock::body(&record.body), y);
        plan.content_bottom = y;

        let hashtags = TextBlock::hashtags(record.hashtags.trim());
        let hashtag_y = plan.hashtag_y;
        self.place_block(&mut plan, &hashtags, hashtag_y);

        plan
    }

    /// Wrap and center one block starting at `y`; returns the next cursor.
    fn place_block(&self, plan: &mut FramePlan, block: &TextBlock, mut y: u32) -> u32 {
        for line in wrap(&block.content, block.max_line_width_chars) {
            let width = self.fonts.measure(&line, block.font_role);
            plan.lines.push(PlacedLine {
                x: (CANVAS_WIDTH as f32 - width) / 2.0,
                y,
                text: line,
                role: block.font_role,
                color: block.color,
            });
            y += block.line_height_px;
        }
        y
    }

    /// Compose the frame for `record` over an optional background photo.
    ///
    /// Background bytes that cannot be decoded are ignored and the plain
    /// background color is used instead.
    pub fn compose(&self, record: &ContentRecord, background: Option<&[u8]>) -> MediaResult<RgbImage> {
        let plan = self.plan(record);
        if plan.overflows() {
            warn!(
                content_bottom = plan.content_bottom,
                hashtag_y = plan.hashtag_y,
                "Body text overlaps the hashtag line"
            );
        }

        let mut canvas = match background.and_then(decode_background) {
            Some(mut photo) => {
                darken(&mut photo, OVERLAY_ALPHA);
                photo
            }
            None => RgbImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, to_pixel(BACKGROUND_COLOR)),
        };

        for rule in &plan.rules {
            fill_rule(&mut canvas, rule);
        }
        self.draw_text(&mut canvas, &plan)?;

        Ok(canvas)
    }

    /// Compose and write the frame as PNG.
    pub fn compose_to_file(
        &self,
        record: &ContentRecord,
        background: Option<&[u8]>,
        path: &Path,
    ) -> MediaResult<()> {
        let frame = self.compose(record, background)?;
        frame.save_with_format(path, image::ImageFormat::Png)?;
        debug!("Frame written to {}", path.display());
        Ok(())
    }

    /// Rasterise every placed line in one pass and blend it onto `canvas`.
    fn draw_text(&self, canvas: &mut RgbImage, plan: &FramePlan) -> MediaResult<()> {
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{CANVAS_WIDTH}" height="{CANVAS_HEIGHT}" viewBox="0 0 {CANVAS_WIDTH} {CANVAS_HEIGHT}">"#
        );
        for line in plan.lines.iter().filter(|l| !l.text.is_empty()) {
            svg.push_str(&self.fonts.text_element(
                &line.text,
                line.role,
                line.x,
                line.y as f32,
                &line.color.to_hex(),
            ));
        }
        svg.push_str("</svg>");

        let tree = self.fonts.parse(&svg)?;
        let mut pixmap = resvg::tiny_skia::Pixmap::new(CANVAS_WIDTH, CANVAS_HEIGHT)
            .ok_or_else(|| MediaError::render_failed("failed to allocate text pixmap"))?;
        resvg::render(&tree, resvg::tiny_skia::Transform::identity(), &mut pixmap.as_mut());

        blend_premultiplied(canvas, pixmap.data());
        Ok(())
    }
}

fn decode_background(bytes: &[u8]) -> Option<RgbImage> {
    match image::load_from_memory(bytes) {
        Ok(img) => Some(
            img.resize_to_fill(CANVAS_WIDTH, CANVAS_HEIGHT, FilterType::Lanczos3)
                .to_rgb8(),
        ),
        Err(e) => {
            warn!("Background image could not be decoded, using plain canvas: {}", e);
            None
        }
    }
}

fn to_pixel(color: Rgb) -> Pixel<u8> {
    Pixel(color.to_array())
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

/// Composite black at `alpha` over the whole image.
fn darken(img: &mut RgbImage, alpha: u8) {
    let keep = 255 - u16::from(alpha);
    for px in img.pixels_mut() {
        for c in px.0.iter_mut() {
            *c = mul_div255(u16::from(*c), keep);
        }
    }
}

fn fill_rule(canvas: &mut RgbImage, rule: &PlacedRule) {
    let x_end = CANVAS_WIDTH.saturating_sub(MARGIN_X);
    let y_end = (rule.y + rule.height).min(canvas.height());
    for y in rule.y.min(y_end)..y_end {
        for x in MARGIN_X..x_end {
            canvas.put_pixel(x, y, to_pixel(rule.color));
        }
    }
}

/// Source-over of a premultiplied RGBA8 buffer onto an opaque RGB image.
fn blend_premultiplied(canvas: &mut RgbImage, rgba: &[u8]) {
    for (dst, src) in canvas.pixels_mut().zip(rgba.chunks_exact(4)) {
        let inv = 255 - u16::from(src[3]);
        if src[3] == 0 {
            continue;
        }
        for i in 0..3 {
            dst.0[i] = src[i].saturating_add(mul_div255(u16::from(dst.0[i]), inv));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer() -> FrameComposer {
        FrameComposer::new(FontBook::bundled())
    }

    /// Pixels inside the band of `line` that differ from `base`.
    fn ink_in_band(frame: &RgbImage, line: &PlacedLine, base: Pixel<u8>) -> Vec<Pixel<u8>> {
        let top = line.y;
        let bottom = (line.y + line.role.size_px() as u32).min(frame.height());
        (top..bottom)
            .flat_map(|y| (0..frame.width()).map(move |x| (x, y)))
            .map(|(x, y)| *frame.get_pixel(x, y))
            .filter(|px| *px != base)
            .collect()
    }

    fn record() -> ContentRecord {
        ContentRecord::new(
            "Le miel ne périme jamais",
            "Des pots de miel vieux de plus de 3000 ans ont été retrouvés \
             dans des tombes égyptiennes, toujours comestibles.",
            "#fait #insolite",
        )
    }

    #[test]
    fn test_plan_block_order() {
        let plan = composer().plan(&record());

        assert_eq!(plan.rules[0].y, LAYOUT_TOP);
        assert_eq!(plan.rules[0].color, ACCENT_COLOR);
        assert_eq!(plan.lines[0].text, "LE MIEL NE PÉRIME");
        assert_eq!(plan.lines[0].y, LAYOUT_TOP + GAP_AFTER_TOP_RULE);
        assert_eq!(plan.lines[1].text, "JAMAIS");
        assert_eq!(plan.lines[1].y, plan.lines[0].y + 90);

        // Divider sits below the title.
        assert_eq!(plan.rules[1].y, plan.lines[1].y + 90 + GAP_AFTER_TITLE);

        let last = plan.lines.last().unwrap();
        assert_eq!(last.text, "#fait #insolite");
        assert_eq!(last.y, CANVAS_HEIGHT - HASHTAG_BOTTOM_OFFSET);
        assert!(!plan.overflows());
    }

    #[test]
    fn test_plan_cursor_is_monotonic() {
        let plan = composer().plan(&record().with_intro("Saviez-vous que le miel est éternel ?"));
        let cursor_lines = &plan.lines[..plan.lines.len() - 1];
        assert!(cursor_lines.windows(2).all(|w| w[0].y < w[1].y));
        assert_eq!(plan.rules.len(), 3);
    }

    #[test]
    fn test_plan_reports_overflow() {
        let long_body = "mot ".repeat(400);
        let plan = composer().plan(&ContentRecord::new("Titre", long_body, "#tag"));
        assert!(plan.overflows());
        // The hashtag line stays pinned.
        assert_eq!(plan.lines.last().unwrap().y, plan.hashtag_y);
    }

    #[test]
    fn test_lines_are_centered() {
        let c = composer();
        let plan = c.plan(&record());
        for line in &plan.lines {
            let width = c.fonts().measure(&line.text, line.role);
            assert!((line.x - (CANVAS_WIDTH as f32 - width) / 2.0).abs() < 0.01);
        }
    }

    #[test]
    fn test_compose_without_background_uses_plain_color() {
        let frame = composer().compose(&record(), None).unwrap();
        assert_eq!(frame.dimensions(), (CANVAS_WIDTH, CANVAS_HEIGHT));
        // Corners are never covered by text or rules.
        assert_eq!(*frame.get_pixel(0, 0), to_pixel(BACKGROUND_COLOR));
        assert_eq!(
            *frame.get_pixel(CANVAS_WIDTH - 1, CANVAS_HEIGHT - 1),
            to_pixel(BACKGROUND_COLOR)
        );
        // Accent rule at the top of the layout.
        assert_eq!(*frame.get_pixel(CANVAS_WIDTH / 2, LAYOUT_TOP + 1), to_pixel(ACCENT_COLOR));
    }

    #[test]
    fn test_compose_with_undecodable_background_degrades() {
        let c = composer();
        let frame = c.compose(&record(), Some(b"not an image")).unwrap();
        assert_eq!(*frame.get_pixel(0, 0), to_pixel(BACKGROUND_COLOR));

        let plan = c.plan(&record());
        for line in &plan.lines {
            assert!(
                !ink_in_band(&frame, line, to_pixel(BACKGROUND_COLOR)).is_empty(),
                "no text drawn for {:?}",
                line.text
            );
        }
    }

    #[test]
    fn test_compose_draws_every_line() {
        let c = composer();
        let record = record().with_intro("Saviez-vous que le miel est éternel ?");
        let frame = c.compose(&record, None).unwrap();
        let plan = c.plan(&record);
        let base = to_pixel(BACKGROUND_COLOR);

        for line in &plan.lines {
            let ink = ink_in_band(&frame, line, base);
            assert!(!ink.is_empty(), "no text drawn for {:?}", line.text);
        }

        // Title glyphs are filled with the accent color.
        let title = &plan.lines[0];
        assert_eq!(title.role, FontRole::Title);
        assert!(ink_in_band(&frame, title, base).contains(&to_pixel(ACCENT_COLOR)));
    }

    #[test]
    fn test_bundled_faces_render_without_system_fonts() {
        let book = FontBook::bundled();
        assert!(book.face_count() >= 2);
        assert!(book.measure("MIEL", FontRole::Title) > 0.0);
        assert!(book.measure("miel", FontRole::Body) > 0.0);
    }

    #[test]
    fn test_compose_darkens_photo_background() {
        let photo = RgbImage::from_pixel(200, 300, Pixel([200, 100, 50]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        photo.write_to(&mut bytes, image::ImageFormat::Png).unwrap();

        let frame = composer().compose(&record(), Some(bytes.get_ref())).unwrap();
        assert_eq!(frame.dimensions(), (CANVAS_WIDTH, CANVAS_HEIGHT));
        let px = frame.get_pixel(0, 0).0;
        let expected = [mul_div255(200, 95), mul_div255(100, 95), mul_div255(50, 95)];
        for (got, want) in px.iter().zip(expected) {
            assert!(got.abs_diff(want) <= 2, "got {px:?}, want {expected:?}");
        }
    }

    #[test]
    fn test_compose_to_file_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame_0a1b2c3d.png");
        composer().compose_to_file(&record(), None, &path).unwrap();

        let reloaded = image::open(&path).unwrap();
        assert_eq!(reloaded.width(), CANVAS_WIDTH);
        assert_eq!(reloaded.height(), CANVAS_HEIGHT);
    }

    #[test]
    fn test_blend_premultiplied() {
        let mut canvas = RgbImage::from_pixel(2, 1, Pixel([100, 100, 100]));
        // Opaque white, then half-transparent black (premultiplied).
        blend_premultiplied(&mut canvas, &[255, 255, 255, 255, 0, 0, 0, 128]);
        assert_eq!(canvas.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(canvas.get_pixel(1, 0).0, [50, 50, 50]);
    }
}
