//! Watermark rendering.
//!
//! Every page of the input gets a marker string drawn over its existing
//! content: Helvetica, translucent, rotated about the page center. Page
//! count, page order, and page boxes are left exactly as they were.
//!
//! The original content streams are not rewritten. Each page's `/Contents`
//! becomes `[save, original..., restore + watermark]`, so whatever graphics
//! state the original leaves behind cannot leak into the watermark.

use std::io::{Read, Write};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{RenderError, Result};
use crate::metrics::{encode_text, measure};
use crate::pdf;

/// Visual parameters of the watermark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkStyle {
    /// Font size in points.
    pub font_size: f32,
    /// Fill and stroke opacity, `0.0..=1.0`.
    pub opacity: f32,
    /// Counter-clockwise rotation in degrees.
    pub rotation_degrees: f32,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            font_size: 50.0,
            opacity: 0.3,
            rotation_degrees: -45.0,
        }
    }
}

/// Summary of a completed render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderReport {
    pub page_count: usize,
}

/// Draws a text watermark on every page of a PDF.
#[derive(Debug, Clone, Default)]
pub struct WatermarkRenderer {
    style: WatermarkStyle,
}

/// Objects shared by every page of one render.
struct SharedObjects {
    font: ObjectId,
    ext_gstate: ObjectId,
    save: ObjectId,
}

impl WatermarkRenderer {
    pub fn new(style: WatermarkStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &WatermarkStyle {
        &self.style
    }

    /// Read a PDF from `src`, watermark every page, and write it to `dst`.
    ///
    /// Nothing is written to `dst` unless every page was watermarked.
    #[instrument(skip_all, fields(marker_len = marker.len()))]
    pub fn render<R: Read, W: Write>(
        &self,
        mut src: R,
        mut dst: W,
        marker: &str,
    ) -> Result<RenderReport> {
        let mut input = Vec::new();
        src.read_to_end(&mut input)?;
        let mut doc = self.apply(&input, marker)?;
        let page_count = doc.get_pages().len();

        doc.save_to(&mut dst)
            .map_err(|e| RenderError::Write(e.to_string()))?;
        dst.flush()?;

        debug!(page_count, "watermark rendered");
        Ok(RenderReport { page_count })
    }

    /// Watermark an in-memory PDF and return the modified document.
    pub fn apply(&self, input: &[u8], marker: &str) -> Result<Document> {
        let mut doc =
            Document::load_mem(input).map_err(|e| RenderError::Malformed(e.to_string()))?;
        if doc.is_encrypted() {
            return Err(RenderError::Malformed(
                "encrypted documents are not supported".to_string(),
            ));
        }

        let pages = doc.get_pages();
        let page_count = pages.len();
        if page_count == 0 {
            return Err(RenderError::Malformed("document has no pages".to_string()));
        }

        let shared = self.add_shared_objects(&mut doc);
        for (page, page_id) in pages {
            self.mark_page(&mut doc, page_id, &shared, marker)
                .map_err(|reason| RenderError::Page {
                    page,
                    page_count,
                    reason,
                })?;
        }
        Ok(doc)
    }

    fn add_shared_objects(&self, doc: &mut Document) -> SharedObjects {
        let font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let ext_gstate = doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => self.style.opacity,
            "CA" => self.style.opacity,
        });
        let save = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
        SharedObjects {
            font,
            ext_gstate,
            save,
        }
    }

    fn mark_page(
        &self,
        doc: &mut Document,
        page_id: ObjectId,
        shared: &SharedObjects,
        marker: &str,
    ) -> std::result::Result<(), String> {
        let [llx, lly, urx, ury] = pdf::media_box(doc, page_id)?;

        // Copy the effective resources onto the page itself, adding ours under
        // names the page does not already use.
        let mut resources = pdf::page_resources(doc, page_id)?;
        let mut fonts = pdf::resource_category(doc, &resources, b"Font")?;
        let mut states = pdf::resource_category(doc, &resources, b"ExtGState")?;
        let font_name = pdf::fresh_name(&fonts, "PVWmF");
        let gs_name = pdf::fresh_name(&states, "PVWmGS");
        fonts.set(font_name.as_bytes(), Object::Reference(shared.font));
        states.set(gs_name.as_bytes(), Object::Reference(shared.ext_gstate));
        resources.set("Font", Object::Dictionary(fonts));
        resources.set("ExtGState", Object::Dictionary(states));

        let overlay = self.overlay_content(
            marker,
            &font_name,
            &gs_name,
            ((llx + urx) / 2.0, (lly + ury) / 2.0),
        );
        // Leading newline: the previous stream may end mid-token.
        let mut bytes = b"\n".to_vec();
        bytes.extend(
            overlay
                .encode()
                .map_err(|e| format!("encode watermark content: {e}"))?,
        );
        let overlay_id = doc.add_object(Stream::new(dictionary! {}, bytes));

        let mut contents = vec![Object::Reference(shared.save)];
        contents.extend(pdf::content_refs(doc, page_id)?);
        contents.push(Object::Reference(overlay_id));

        let page = doc
            .get_dictionary_mut(page_id)
            .map_err(|e| format!("page object: {e}"))?;
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Array(contents));
        Ok(())
    }

    /// Content that restores the page's initial graphics state and draws the
    /// marker centered on `center`.
    fn overlay_content(
        &self,
        marker: &str,
        font_name: &str,
        gs_name: &str,
        center: (f32, f32),
    ) -> Content {
        let size = self.style.font_size;
        let extent = measure(marker, size);
        let (sin, cos) = self.style.rotation_degrees.to_radians().sin_cos();

        // Offset from the text origin to the middle of the glyph box, in
        // unrotated text space.
        let dx = -extent.width / 2.0;
        let dy = extent.descent - extent.height / 2.0;
        let origin_x = center.0 + cos * dx - sin * dy;
        let origin_y = center.1 + sin * dx + cos * dy;

        Content {
            operations: vec![
                Operation::new("Q", vec![]),
                Operation::new("q", vec![]),
                Operation::new("gs", vec![Object::Name(gs_name.as_bytes().to_vec())]),
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(font_name.as_bytes().to_vec()), size.into()],
                ),
                Operation::new(
                    "Tm",
                    vec![
                        cos.into(),
                        sin.into(),
                        (-sin).into(),
                        cos.into(),
                        origin_x.into(),
                        origin_y.into(),
                    ],
                ),
                Operation::new("Tj", vec![Object::string_literal(encode_text(marker))]),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::inspect;

    /// A document whose page tree carries shared resources and page size,
    /// with each page inheriting them.
    fn sample_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for n in 0..pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new(
                        "Tj",
                        vec![Object::string_literal(format!("Question {}", n + 1))],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_every_page_marked() {
        let renderer = WatermarkRenderer::default();
        let mut out = Vec::new();
        let report = renderer
            .render(&sample_pdf(3)[..], &mut out, "Confidential")
            .unwrap();
        assert_eq!(report.page_count, 3);

        let pages = inspect(&out, "Confidential").unwrap();
        assert_eq!(pages.len(), 3);
        for page in &pages {
            assert_eq!((page.width, page.height), (595.0, 842.0));
            assert!(page.marker_found);
            assert!((page.opacity.unwrap() - 0.3).abs() < 1e-4);
            assert!((page.rotation_degrees.unwrap() + 45.0).abs() < 1e-2);
        }
    }

    #[test]
    fn test_original_content_kept() {
        let renderer = WatermarkRenderer::default();
        let doc = renderer.apply(&sample_pdf(2), "Confidential").unwrap();
        for (n, page_id) in doc.get_pages() {
            let text = String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned();
            assert!(text.contains(&format!("Question {n}")));
            assert!(text.contains("Confidential"));
            // Original font resource still resolves on the page.
            let resources = pdf::page_resources(&doc, page_id).unwrap();
            let fonts = pdf::resource_category(&doc, &resources, b"Font").unwrap();
            assert!(fonts.has(b"F1"));
        }
    }

    #[test]
    fn test_marker_centered() {
        let renderer = WatermarkRenderer::default();
        let content = renderer.overlay_content("Confidential", "F", "G", (300.0, 400.0));
        let tm = content
            .operations
            .iter()
            .find(|op| op.operator == "Tm")
            .unwrap();
        let values: Vec<f32> = tm.operands.iter().filter_map(pdf::number).collect();
        let (a, b, c, d, e, f) = (values[0], values[1], values[2], values[3], values[4], values[5]);

        // Map the glyph-box center back through the text matrix.
        let extent = measure("Confidential", 50.0);
        let cx = extent.width / 2.0;
        let cy = extent.height / 2.0 - extent.descent;
        assert!((a * cx + c * cy + e - 300.0).abs() < 1e-2);
        assert!((b * cx + d * cy + f - 400.0).abs() < 1e-2);
    }

    #[test]
    fn test_rejects_garbage() {
        let renderer = WatermarkRenderer::default();
        let mut out = Vec::new();
        let err = renderer
            .render(&b"not a pdf at all"[..], &mut out, "Confidential")
            .unwrap_err();
        assert!(matches!(err, RenderError::Malformed(_)));
        assert!(out.is_empty());
    }

    #[test]
    fn test_page_without_media_box() {
        let mut doc = Document::load_mem(&sample_pdf(2)).unwrap();
        let pages_id = doc.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();
        doc.get_dictionary_mut(pages_id).unwrap().remove(b"MediaBox");
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let err = WatermarkRenderer::default()
            .apply(&bytes, "Confidential")
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::Page {
                page: 1,
                page_count: 2,
                ..
            }
        ));
    }
}
