//! Page-tree helpers over `lopdf` objects.

use lopdf::{Dictionary, Document, Object, ObjectId};

/// Resolve an object, following one level of indirection.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object, String> {
    match obj {
        Object::Reference(id) => doc
            .get_object(*id)
            .map_err(|e| format!("dangling reference {id:?}: {e}")),
        other => Ok(other),
    }
}

/// Numeric value of an integer or real object.
pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Look up an inheritable page attribute, walking `/Parent` links.
pub(crate) fn inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>, String> {
    let mut current = Some(page_id);
    // A well-formed page tree is shallow; the bound guards against cycles.
    for _ in 0..64 {
        let Some(id) = current else {
            return Ok(None);
        };
        let node = doc
            .get_dictionary(id)
            .map_err(|e| format!("page tree node {id:?}: {e}"))?;
        if let Ok(value) = node.get(key) {
            return resolve(doc, value).map(Some);
        }
        current = match node.get(b"Parent") {
            Ok(Object::Reference(parent)) => Some(*parent),
            _ => None,
        };
    }
    Err("page tree too deep or cyclic".to_string())
}

/// The page's `/MediaBox` as `[llx, lly, urx, ury]`.
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> Result<[f32; 4], String> {
    let obj = inherited(doc, page_id, b"MediaBox")?.ok_or("page has no MediaBox")?;
    let Object::Array(items) = obj else {
        return Err("MediaBox is not an array".to_string());
    };
    if items.len() != 4 {
        return Err(format!("MediaBox has {} entries", items.len()));
    }
    let mut rect = [0.0f32; 4];
    for (slot, item) in rect.iter_mut().zip(items) {
        *slot = resolve(doc, item)
            .ok()
            .and_then(number)
            .ok_or("MediaBox entry is not a number")?;
    }
    Ok(rect)
}

/// The resources dictionary that applies to a page, cloned.
///
/// Missing resources yield an empty dictionary.
pub(crate) fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, String> {
    match inherited(doc, page_id, b"Resources")? {
        Some(Object::Dictionary(dict)) => Ok(dict.clone()),
        Some(_) => Err("Resources is not a dictionary".to_string()),
        None => Ok(Dictionary::new()),
    }
}

/// A named sub-dictionary of a resources dictionary (`/Font`, `/ExtGState`), cloned.
pub(crate) fn resource_category(
    doc: &Document,
    resources: &Dictionary,
    category: &[u8],
) -> Result<Dictionary, String> {
    match resources.get(category) {
        Ok(obj) => match resolve(doc, obj)? {
            Object::Dictionary(dict) => Ok(dict.clone()),
            _ => Err(format!(
                "/{} is not a dictionary",
                String::from_utf8_lossy(category)
            )),
        },
        Err(_) => Ok(Dictionary::new()),
    }
}

/// The first name of the form `{prefix}{n}` not already used in `dict`.
pub(crate) fn fresh_name(dict: &Dictionary, prefix: &str) -> String {
    (0u32..)
        .map(|n| format!("{prefix}{n}"))
        .find(|name| !dict.has(name.as_bytes()))
        .unwrap_or_else(|| prefix.to_string())
}

/// References to the content streams of a page, in drawing order.
pub(crate) fn content_refs(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, String> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| format!("page object: {e}"))?;
    let contents = match page.get(b"Contents") {
        Ok(obj) => obj,
        Err(_) => return Ok(Vec::new()),
    };
    match contents {
        Object::Array(items) => Ok(items.clone()),
        Object::Reference(id) => match doc.get_object(*id) {
            // An indirect array of stream references.
            Ok(Object::Array(items)) => Ok(items.clone()),
            Ok(Object::Stream(_)) => Ok(vec![Object::Reference(*id)]),
            Ok(_) => Err("Contents is neither a stream nor an array".to_string()),
            Err(e) => Err(format!("Contents: {e}")),
        },
        Object::Stream(_) => Err("Contents stream must be indirect".to_string()),
        _ => Err("Contents is neither a stream nor an array".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_fresh_name_skips_taken() {
        let dict = dictionary! { "PV0" => 1, "PV1" => 2 };
        assert_eq!(fresh_name(&dict, "PV"), "PV2");
        assert_eq!(fresh_name(&Dictionary::new(), "PV"), "PV0");
    }

    #[test]
    fn test_inherited_media_box() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );

        assert_eq!(media_box(&doc, page_id).unwrap(), [0.0, 0.0, 612.0, 792.0]);
        assert!(page_resources(&doc, page_id).unwrap().is_empty());
        assert!(content_refs(&doc, page_id).unwrap().is_empty());
    }
}
