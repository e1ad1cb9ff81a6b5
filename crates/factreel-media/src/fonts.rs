//! Font loading and pixel text measurement.
//!
//! Text is laid out and rasterised through `usvg`, so the same shaping is
//! used for measuring a line and for drawing it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use usvg::fontdb;

use factreel_models::FontRole;

use crate::error::{MediaError, MediaResult};

/// Faces compiled into the binary so text always renders.
const BUNDLED_FACES: [&[u8]; 2] = [
    include_bytes!("../assets/fonts/DejaVuSans.ttf"),
    include_bytes!("../assets/fonts/DejaVuSans-Bold.ttf"),
];

/// Family name of [`BUNDLED_FACES`].
pub const BUNDLED_FAMILY: &str = "DejaVu Sans";

/// Optional font files overriding the system faces per role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontConfig {
    /// Face used for [`FontRole::Title`]
    pub title_font: Option<PathBuf>,
    /// Face used for [`FontRole::Body`] and [`FontRole::Small`]
    pub body_font: Option<PathBuf>,
}

impl FontConfig {
    pub fn new(title_font: Option<PathBuf>, body_font: Option<PathBuf>) -> Self {
        Self {
            title_font,
            body_font,
        }
    }
}

/// Shared font database plus the family chosen for each role.
#[derive(Clone)]
pub struct FontBook {
    db: Arc<fontdb::Database>,
    title_family: Option<String>,
    body_family: Option<String>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("faces", &self.db.len())
            .field("title_family", &self.title_family)
            .field("body_family", &self.body_family)
            .finish()
    }
}

impl FontBook {
    /// Load the bundled faces, system fonts and the configured files.
    ///
    /// Never fails: a missing or unreadable font file is logged and the role
    /// falls back to the bundled family.
    pub fn load(config: &FontConfig) -> Self {
        let mut db = bundled_database();
        db.load_system_fonts();

        let title_family = config
            .title_font
            .as_deref()
            .and_then(|path| load_font_file(&mut db, path));
        let body_family = config
            .body_font
            .as_deref()
            .and_then(|path| load_font_file(&mut db, path));

        debug!(faces = db.len(), "Font database loaded");

        Self {
            db: Arc::new(db),
            title_family,
            body_family,
        }
    }

    /// Font book with system fonts and no configured files.
    pub fn system() -> Self {
        Self::load(&FontConfig::default())
    }

    /// Font book with the bundled faces only, independent of the host.
    pub fn bundled() -> Self {
        Self {
            db: Arc::new(bundled_database()),
            title_family: None,
            body_family: None,
        }
    }

    /// Number of faces available.
    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    /// CSS font-family list for `role`, ending in a generic family.
    pub fn family_list(&self, role: FontRole) -> String {
        let configured = match role {
            FontRole::Title => self.title_family.as_deref(),
            FontRole::Body | FontRole::Small => self.body_family.as_deref(),
        };
        match configured {
            Some(name) => format!("'{}', sans-serif", name.replace('\'', "")),
            None => format!("{BUNDLED_FAMILY}, sans-serif"),
        }
    }

    /// Parsing options sharing this font database.
    pub fn svg_options(&self) -> usvg::Options<'static> {
        usvg::Options {
            fontdb: Arc::clone(&self.db),
            font_resolver: font_resolver(),
            ..Default::default()
        }
    }

    /// Rendered pixel width of `line` in `role`.
    ///
    /// Returns 0 when no face can render the text.
    pub fn measure(&self, line: &str, role: FontRole) -> f32 {
        if line.trim().is_empty() {
            return 0.0;
        }

        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">{}</svg>"#,
            self.text_element(line, role, 0.0, 0.0, "#000000")
        );

        match self.parse(&svg) {
            Ok(tree) => text_width(tree.root()),
            Err(e) => {
                warn!("Text measurement failed: {}", e);
                0.0
            }
        }
    }

    /// SVG `<text>` element for one line with its top-left corner at `(x, y)`.
    pub(crate) fn text_element(&self, line: &str, role: FontRole, x: f32, y: f32, fill: &str) -> String {
        let size = role.size_px();
        let weight = if role.is_bold() { "bold" } else { "normal" };
        // Baseline sits one ascent below the top edge.
        let baseline = y + size * 0.8;
        format!(
            r#"<text x="{x:.1}" y="{baseline:.1}" font-family="{family}" font-size="{size}" font-weight="{weight}" fill="{fill}" xml:space="preserve">{text}</text>"#,
            family = self.family_list(role),
            text = escape_xml(line),
        )
    }

    pub(crate) fn parse(&self, svg: &str) -> MediaResult<usvg::Tree> {
        usvg::Tree::from_str(svg, &self.svg_options())
            .map_err(|e| MediaError::render_failed(format!("svg parse: {e}")))
    }
}

fn bundled_database() -> fontdb::Database {
    let mut db = fontdb::Database::new();
    for face in BUNDLED_FACES {
        db.load_font_data(face.to_vec());
    }
    db
}

/// Load one font file, returning its family name.
fn load_font_file(db: &mut fontdb::Database, path: &Path) -> Option<String> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            warn!("Font {} unavailable, using default: {}", path.display(), e);
            return None;
        }
    };

    let ids = db.load_font_source(fontdb::Source::Binary(Arc::new(data)));
    let family = ids
        .first()
        .and_then(|id| db.face(*id))
        .and_then(|face| face.families.first())
        .map(|(name, _)| name.clone());

    if family.is_none() {
        warn!("Font {} could not be parsed, using default", path.display());
    }
    family
}

/// Resolver that always lands on some face, the bundled family last.
fn font_resolver() -> usvg::FontResolver<'static> {
    use usvg::FontResolver;

    FontResolver {
        select_font: Box::new(|font, fontdb| {
            let mut families = Vec::<fontdb::Family<'_>>::new();
            for family in font.families() {
                families.push(match family {
                    usvg::FontFamily::Serif => fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => fontdb::Family::Monospace,
                    usvg::FontFamily::Named(s) => fontdb::Family::Name(s),
                });
            }
            families.push(fontdb::Family::SansSerif);
            families.push(fontdb::Family::Name(BUNDLED_FAMILY));

            let style = match font.style() {
                usvg::FontStyle::Normal => fontdb::Style::Normal,
                usvg::FontStyle::Italic => fontdb::Style::Italic,
                usvg::FontStyle::Oblique => fontdb::Style::Oblique,
            };

            let query = fontdb::Query {
                families: &families,
                weight: fontdb::Weight(font.weight()),
                stretch: fontdb::Stretch::Normal,
                style,
            };

            if let Some(id) = fontdb.query(&query) {
                return Some(id);
            }
            fontdb.faces().next().map(|f| f.id)
        }),
        select_fallback: FontResolver::default_fallback_selector(),
    }
}

/// Sum of the widths of all text nodes under `group`.
fn text_width(group: &usvg::Group) -> f32 {
    group
        .children()
        .iter()
        .map(|node| match node {
            usvg::Node::Text(text) => text.bounding_box().width(),
            usvg::Node::Group(g) => text_width(g),
            _ => 0.0,
        })
        .sum()
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("#fait & <insolite>"), "#fait &amp; &lt;insolite&gt;");
        assert_eq!(escape_xml("l'eau"), "l&apos;eau");
    }

    #[test]
    fn test_missing_font_file_falls_back() {
        let config = FontConfig::new(Some("/nonexistent/Title.ttf".into()), None);
        let book = FontBook::load(&config);
        assert_eq!(book.family_list(FontRole::Title), "DejaVu Sans, sans-serif");
    }

    #[test]
    fn test_corrupt_font_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();

        let book = FontBook::load(&FontConfig::new(None, Some(path)));
        assert_eq!(book.family_list(FontRole::Body), "DejaVu Sans, sans-serif");
    }

    #[test]
    fn test_measure_blank_is_zero() {
        let book = FontBook::system();
        assert_eq!(book.measure("   ", FontRole::Body), 0.0);
    }

    #[test]
    fn test_bundled_family_is_always_loaded() {
        let book = FontBook::bundled();
        assert_eq!(book.face_count(), BUNDLED_FACES.len());
        assert!(FontBook::system().face_count() >= BUNDLED_FACES.len());
    }

    #[test]
    fn test_measure_grows_with_text() {
        let book = FontBook::bundled();
        let short = book.measure("MIEL", FontRole::Title);
        let long = book.measure("MIEL MIEL MIEL", FontRole::Title);
        assert!(short > 0.0);
        assert!(long > short);
        assert!(book.measure("miel", FontRole::Small) < book.measure("miel", FontRole::Title));
    }
}
