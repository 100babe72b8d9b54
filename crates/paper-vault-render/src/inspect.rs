//! Read-back of rendered documents.
//!
//! Used to confirm that a rendered file carries the watermark on every page
//! without trusting the renderer's own bookkeeping.

use lopdf::content::Content;
use lopdf::{Document, Object};

use crate::error::{RenderError, Result};
use crate::metrics::encode_text;
use crate::pdf;

/// What was found on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageReport {
    pub page: u32,
    pub width: f32,
    pub height: f32,
    /// The marker text is drawn on this page.
    pub marker_found: bool,
    /// Fill opacity in effect when the marker is drawn.
    pub opacity: Option<f32>,
    /// Rotation of the text matrix used to draw the marker.
    pub rotation_degrees: Option<f32>,
}

/// Inspect every page of `bytes` for `marker`.
pub fn inspect(bytes: &[u8], marker: &str) -> Result<Vec<PageReport>> {
    let doc = Document::load_mem(bytes).map_err(|e| RenderError::Malformed(e.to_string()))?;
    let pages = doc.get_pages();
    let page_count = pages.len();
    let needle = encode_text(marker);

    pages
        .into_iter()
        .map(|(page, page_id)| -> Result<PageReport> {
            let fail = |reason: String| RenderError::Page {
                page,
                page_count,
                reason,
            };
            let [llx, lly, urx, ury] = pdf::media_box(&doc, page_id).map_err(fail)?;
            let raw = doc
                .get_page_content(page_id)
                .map_err(|e| fail(e.to_string()))?;
            let content = Content::decode(&raw).map_err(|e| fail(e.to_string()))?;

            let mut report = PageReport {
                page,
                width: urx - llx,
                height: ury - lly,
                marker_found: false,
                opacity: None,
                rotation_degrees: None,
            };
            let mut state_name: Option<Vec<u8>> = None;
            let mut rotation = None;
            for op in &content.operations {
                match (op.operator.as_str(), op.operands.as_slice()) {
                    ("gs", [Object::Name(name)]) => state_name = Some(name.clone()),
                    ("Tm", [a, b, ..]) => {
                        if let (Some(a), Some(b)) = (pdf::number(a), pdf::number(b)) {
                            rotation = Some(b.atan2(a).to_degrees());
                        }
                    }
                    ("Tj", [Object::String(text, _)]) if *text == needle => {
                        report.marker_found = true;
                        report.rotation_degrees = rotation;
                        report.opacity = match &state_name {
                            Some(name) => fill_opacity(&doc, page_id, name).map_err(fail)?,
                            None => None,
                        };
                    }
                    _ => {}
                }
            }
            Ok(report)
        })
        .collect()
}

fn fill_opacity(
    doc: &Document,
    page_id: lopdf::ObjectId,
    name: &[u8],
) -> std::result::Result<Option<f32>, String> {
    let resources = pdf::page_resources(doc, page_id)?;
    let states = pdf::resource_category(doc, &resources, b"ExtGState")?;
    let Ok(state) = states.get(name) else {
        return Ok(None);
    };
    match pdf::resolve(doc, state)? {
        Object::Dictionary(dict) => Ok(dict
            .get(b"ca")
            .ok()
            .and_then(|v| pdf::resolve(doc, v).ok())
            .and_then(pdf::number)),
        _ => Ok(None),
    }
}
