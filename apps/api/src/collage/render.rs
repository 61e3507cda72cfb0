//! Page rendering — draws an assembled collage onto physical pages.
//!
//! `Canvas` is the drawing capability ("draw image at position with given size on the
//! current page"). `PdfCanvas` implements it with lopdf: every distinct tile is embedded
//! once as an image XObject and referenced from each page that draws it.
//!
//! Rendering is CPU-bound; async callers run it inside `tokio::task::spawn_blocking`.

use std::collections::HashMap;

use chrono::Utc;
use image::{DynamicImage, GenericImageView};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document as PdfDocument, Object, ObjectId, Stream};
use thiserror::Error;

use crate::collage::assembler::Collage;
use crate::collage::catalog::ResolvedTile;
use crate::collage::code::TileId;
use crate::collage::grid::{Placement, PAGE_HEIGHT_PT, PAGE_WIDTH_PT};
use crate::collage::split::Side;

const PDF_VERSION: &str = "1.5";
const PRODUCER: &str = concat!("tilesheet ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF encoding failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("PDF serialization failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("placement references tile {0} which has no decoded image")]
    MissingTile(TileId),

    #[error("draw call outside of a page")]
    NoOpenPage,
}

// ────────────────────────────────────────────────────────────────────────────
// Canvas capability
// ────────────────────────────────────────────────────────────────────────────

pub trait Canvas {
    type Output;

    fn begin_page(&mut self, side: Side) -> Result<(), RenderError>;

    fn draw_image(&mut self, tile: &ResolvedTile, placement: &Placement)
        -> Result<(), RenderError>;

    fn end_page(&mut self) -> Result<(), RenderError>;

    fn finish(self) -> Result<Self::Output, RenderError>;
}

/// Draws both sides in print order, one page per side, then finalizes the canvas.
pub fn draw_collage<C: Canvas>(
    collage: &Collage,
    mut canvas: C,
) -> Result<C::Output, RenderError> {
    for page in collage.document.pages() {
        canvas.begin_page(page.side)?;
        for placement in &page.placements {
            let tile = collage
                .tiles
                .get(&placement.id)
                .ok_or_else(|| RenderError::MissingTile(placement.id.clone()))?;
            canvas.draw_image(tile, placement)?;
        }
        canvas.end_page()?;
    }
    canvas.finish()
}

/// Renders the collage to PDF bytes.
pub fn render_pdf(collage: &Collage) -> Result<Vec<u8>, RenderError> {
    draw_collage(collage, PdfCanvas::new())
}

// ────────────────────────────────────────────────────────────────────────────
// lopdf canvas
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct OpenPage {
    operations: Vec<Operation>,
    xobjects: Dictionary,
}

pub struct PdfCanvas {
    doc: PdfDocument,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    /// Embedded images by tile: (resource name, object id).
    images: HashMap<TileId, (String, ObjectId)>,
    open: Option<OpenPage>,
}

impl PdfCanvas {
    pub fn new() -> Self {
        let mut doc = PdfDocument::with_version(PDF_VERSION);
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
            images: HashMap::new(),
            open: None,
        }
    }

    fn image_ref(&mut self, tile: &ResolvedTile) -> (String, ObjectId) {
        if let Some(existing) = self.images.get(&tile.asset.id) {
            return existing.clone();
        }
        let name = format!("Tile{}", self.images.len() + 1);
        let id = embed_image(&mut self.doc, &tile.image);
        self.images.insert(tile.asset.id.clone(), (name.clone(), id));
        (name, id)
    }
}

impl Default for PdfCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas for PdfCanvas {
    type Output = Vec<u8>;

    fn begin_page(&mut self, _side: Side) -> Result<(), RenderError> {
        self.open = Some(OpenPage::default());
        Ok(())
    }

    fn draw_image(
        &mut self,
        tile: &ResolvedTile,
        placement: &Placement,
    ) -> Result<(), RenderError> {
        if self.open.is_none() {
            return Err(RenderError::NoOpenPage);
        }
        let (name, image_id) = self.image_ref(tile);
        let page = self.open.as_mut().ok_or(RenderError::NoOpenPage)?;

        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    placement.draw_width.into(),
                    0.into(),
                    0.into(),
                    placement.draw_height.into(),
                    placement.x.into(),
                    placement.bottom().into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);
        page.xobjects.set(name, image_id);
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), RenderError> {
        let page = self.open.take().ok_or(RenderError::NoOpenPage)?;

        let content = Content {
            operations: page.operations,
        };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode()?));
        let resources_id = self.doc.add_object(dictionary! {
            "XObject" => page.xobjects,
        });
        let media_box: Vec<Object> = vec![
            0.into(),
            0.into(),
            PAGE_WIDTH_PT.into(),
            PAGE_HEIGHT_PT.into(),
        ];
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => media_box,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>, RenderError> {
        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Producer" => Object::string_literal(PRODUCER),
            "CreationDate" => Object::string_literal(
                Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()
            ),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);

        self.doc.compress();
        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

/// Adds `image` as an 8-bit DeviceRGB image XObject, with a DeviceGray soft mask when
/// the source carries alpha.
fn embed_image(doc: &mut PdfDocument, image: &DynamicImage) -> ObjectId {
    let (width, height) = image.dimensions();
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };

    if image.color().has_alpha() {
        let alpha: Vec<u8> = image.to_rgba8().pixels().map(|p| p.0[3]).collect();
        let smask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        ));
        dict.set("SMask", smask_id);
    }

    doc.add_object(Stream::new(dict, image.to_rgb8().into_raw()))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collage::assembler::assemble_collage;
    use crate::collage::catalog::TileCatalog;
    use crate::collage::grid::LayoutConfig;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::path::Path;
    use tempfile::TempDir;

    fn fixture_catalog(dir: &Path) -> TileCatalog {
        RgbImage::from_pixel(300, 200, Rgb([0, 0, 255]))
            .save(dir.join("rgb.png"))
            .unwrap();
        RgbaImage::from_pixel(50, 80, Rgba([255, 0, 0, 128]))
            .save(dir.join("rgba.png"))
            .unwrap();
        TileCatalog::from_entries(dir, [("tl1", "rgb.png"), ("tl2", "rgba.png")])
    }

    /// Records the draw calls instead of producing bytes.
    #[derive(Default)]
    struct RecordingCanvas {
        pages: Vec<(Side, Vec<String>)>,
    }

    impl Canvas for RecordingCanvas {
        type Output = Vec<(Side, Vec<String>)>;

        fn begin_page(&mut self, side: Side) -> Result<(), RenderError> {
            self.pages.push((side, Vec::new()));
            Ok(())
        }

        fn draw_image(
            &mut self,
            tile: &ResolvedTile,
            _placement: &Placement,
        ) -> Result<(), RenderError> {
            let page = self.pages.last_mut().ok_or(RenderError::NoOpenPage)?;
            page.1.push(tile.asset.id.to_string());
            Ok(())
        }

        fn end_page(&mut self) -> Result<(), RenderError> {
            Ok(())
        }

        fn finish(self) -> Result<Self::Output, RenderError> {
            Ok(self.pages)
        }
    }

    fn draw_ops_per_page(bytes: &[u8]) -> Vec<usize> {
        let pdf = PdfDocument::load_mem(bytes).unwrap();
        pdf.get_pages()
            .values()
            .map(|page_id| {
                let raw = pdf.get_page_content(*page_id).unwrap();
                let content = Content::decode(&raw).unwrap();
                content
                    .operations
                    .iter()
                    .filter(|op| op.operator == "Do")
                    .count()
            })
            .collect()
    }

    #[test]
    fn test_draw_order_front_then_back() {
        let dir = TempDir::new().unwrap();
        let catalog = fixture_catalog(dir.path());
        let collage =
            assemble_collage("a:tl2|b:tl1|c:tl1", &catalog, &LayoutConfig::default()).unwrap();

        let pages = draw_collage(&collage, RecordingCanvas::default()).unwrap();
        assert_eq!(
            pages,
            vec![
                (Side::Front, vec!["tl2".to_string()]),
                (Side::Back, vec!["tl1".to_string(), "tl1".to_string()]),
            ]
        );
    }

    #[test]
    fn test_missing_tile_image_is_an_error() {
        let dir = TempDir::new().unwrap();
        let catalog = fixture_catalog(dir.path());
        let mut collage =
            assemble_collage("a:tl1|b:tl2", &catalog, &LayoutConfig::default()).unwrap();
        collage.tiles.clear();

        assert!(matches!(
            draw_collage(&collage, RecordingCanvas::default()),
            Err(RenderError::MissingTile(_))
        ));
    }

    #[test]
    fn test_pdf_has_two_tabloid_pages() {
        let dir = TempDir::new().unwrap();
        let catalog = fixture_catalog(dir.path());
        let collage =
            assemble_collage("a:tl1|b:tl2|c:tl1", &catalog, &LayoutConfig::default()).unwrap();

        let bytes = render_pdf(&collage).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let pdf = PdfDocument::load_mem(&bytes).unwrap();
        let pages = pdf.get_pages();
        assert_eq!(pages.len(), 2);
        for page_id in pages.values() {
            let page = pdf.get_object(*page_id).unwrap().as_dict().unwrap();
            let media_box: Vec<i64> = page
                .get(b"MediaBox")
                .unwrap()
                .as_array()
                .unwrap()
                .iter()
                .map(|o| o.as_i64().unwrap())
                .collect();
            assert_eq!(media_box, vec![0, 0, 792, 1224]);
        }
    }

    #[test]
    fn test_pdf_draw_count_matches_placements() {
        let dir = TempDir::new().unwrap();
        let catalog = fixture_catalog(dir.path());
        let collage = assemble_collage(
            "a:tl1|b:nope|c:tl2|d:tl1|e:tl2",
            &catalog,
            &LayoutConfig::default(),
        )
        .unwrap();

        let bytes = render_pdf(&collage).unwrap();
        assert_eq!(draw_ops_per_page(&bytes), vec![1, 3]);
    }

    #[test]
    fn test_drawn_tiles_stay_inside_media_box() {
        let dir = TempDir::new().unwrap();
        RgbImage::from_pixel(468, 288, Rgb([0, 128, 0]))
            .save(dir.path().join("card.png"))
            .unwrap();
        let catalog = TileCatalog::from_entries(dir.path(), [("tl1", "card.png")]);
        let code = (0..46)
            .map(|i| format!("l{i}:tl1"))
            .collect::<Vec<_>>()
            .join("|");
        let collage = assemble_collage(&code, &catalog, &LayoutConfig::default()).unwrap();

        let bytes = render_pdf(&collage).unwrap();
        let pdf = PdfDocument::load_mem(&bytes).unwrap();
        let (page_w, page_h) = (PAGE_WIDTH_PT as f32, PAGE_HEIGHT_PT as f32);
        let mut drawn = 0;
        for page_id in pdf.get_pages().values() {
            let content = Content::decode(&pdf.get_page_content(*page_id).unwrap()).unwrap();
            for op in content.operations.iter().filter(|op| op.operator == "cm") {
                let m: Vec<f32> = op.operands.iter().map(|o| o.as_float().unwrap()).collect();
                let (w, h, x, y) = (m[0], m[3], m[4], m[5]);
                assert!(x >= 0.0 && y >= 0.0, "tile below or left of page: {m:?}");
                assert!(x + w <= page_w, "tile past right edge: {m:?}");
                assert!(y + h <= page_h, "tile past top edge: {m:?}");
                drawn += 1;
            }
        }
        assert_eq!(drawn, 36);
    }

    #[test]
    fn test_first_row_hangs_from_grid_origin() {
        let dir = TempDir::new().unwrap();
        let catalog = fixture_catalog(dir.path());
        let collage = assemble_collage("a:tl1|b:tl1", &catalog, &LayoutConfig::default()).unwrap();

        let bytes = render_pdf(&collage).unwrap();
        let pdf = PdfDocument::load_mem(&bytes).unwrap();
        let pages = pdf.get_pages();
        let front = pages.values().next().unwrap();
        let content = Content::decode(&pdf.get_page_content(*front).unwrap()).unwrap();
        let cm = content
            .operations
            .iter()
            .find(|op| op.operator == "cm")
            .unwrap();
        let m: Vec<f32> = cm.operands.iter().map(|o| o.as_float().unwrap()).collect();
        // 300x200 scales to 234 x 156 then to 216 x 144; its top edge sits at 1116pt.
        assert!((m[5] + m[3] - 1116.0).abs() < 1e-3);
        assert!((m[3] - 144.0).abs() < 1e-3);
    }

    #[test]
    fn test_empty_collage_still_renders_two_pages() {
        let catalog = TileCatalog::from_entries(".", [("tl1", "x.png")]);
        let collage = assemble_collage("", &catalog, &LayoutConfig::default()).unwrap();

        let bytes = render_pdf(&collage).unwrap();
        assert_eq!(draw_ops_per_page(&bytes), vec![0, 0]);
    }

    #[test]
    fn test_repeated_tile_is_embedded_once() {
        let dir = TempDir::new().unwrap();
        let catalog = fixture_catalog(dir.path());
        let collage = assemble_collage(
            "a:tl1|b:tl1|c:tl1|d:tl1",
            &catalog,
            &LayoutConfig::default(),
        )
        .unwrap();

        let bytes = render_pdf(&collage).unwrap();
        let pdf = PdfDocument::load_mem(&bytes).unwrap();
        let rgb_images = pdf
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| {
                s.dict
                    .get(b"ColorSpace")
                    .and_then(|c| c.as_name())
                    .map(|n| n == b"DeviceRGB")
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(rgb_images, 1);
    }

    #[test]
    fn test_alpha_tile_gets_soft_mask() {
        let dir = TempDir::new().unwrap();
        let catalog = fixture_catalog(dir.path());
        let collage = assemble_collage("a:tl2", &catalog, &LayoutConfig::default()).unwrap();

        let bytes = render_pdf(&collage).unwrap();
        let pdf = PdfDocument::load_mem(&bytes).unwrap();
        let masked = pdf
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .any(|s| s.dict.get(b"SMask").is_ok());
        assert!(masked);
    }
}
