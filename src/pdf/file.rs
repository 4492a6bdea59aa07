//! `lopdf`-backed documents on disk.
//!
//! Image references are the object ids of image XObjects reachable from a
//! page's resources, in resource dictionary order. Form XObjects are searched
//! depth-first at the position they appear; each image object is listed at
//! most once per page.

use crate::pdf::{DocumentSource, EmbeddedImage, PdfDocument, RawColor, RawImage};
use crate::trace::trace_debug;
use crate::util::{SymMatchError, SymMatchResult};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::path::{Path, PathBuf};

/// Parent links and nested forms are followed at most this deep.
const MAX_DEPTH: usize = 32;

/// Opens PDF files from the filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileSource;

impl DocumentSource for FileSource {
    type Handle = PathBuf;
    type Document = LoadedPdf;

    fn open(&self, path: &PathBuf) -> SymMatchResult<LoadedPdf> {
        LoadedPdf::open(path)
    }

    fn document_id(&self, path: &PathBuf) -> String {
        path.display().to_string()
    }
}

/// A parsed PDF with its pages in page-number order.
pub struct LoadedPdf {
    doc: Document,
    pages: Vec<ObjectId>,
}

impl LoadedPdf {
    /// Parses the PDF at `path`.
    pub fn open(path: &Path) -> SymMatchResult<Self> {
        let doc = Document::load(path).map_err(|err| SymMatchError::DocumentOpen {
            document: path.display().to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self::from_document(doc))
    }

    /// Parses a PDF held in memory; `name` is used in errors.
    pub fn from_bytes(name: &str, bytes: &[u8]) -> SymMatchResult<Self> {
        let doc = Document::load_mem(bytes).map_err(|err| SymMatchError::DocumentOpen {
            document: name.to_owned(),
            reason: err.to_string(),
        })?;
        Ok(Self::from_document(doc))
    }

    /// Wraps an already parsed document.
    pub fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages().into_values().collect();
        Self { doc, pages }
    }
}

impl PdfDocument for LoadedPdf {
    type ImageRef = ObjectId;

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_images(&self, page: usize) -> SymMatchResult<Vec<ObjectId>> {
        let page_id = *self.pages.get(page).ok_or_else(|| SymMatchError::ImageExtract {
            reason: format!("page index {page} out of range"),
        })?;
        let page_dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|err| extract_err("page dictionary", err))?;

        let mut images = Vec::new();
        if let Some(resources) = inherited_resources(&self.doc, page_dict) {
            collect_images(&self.doc, resources, 0, &mut images);
        }
        Ok(images)
    }

    fn extract_image(&self, id: &ObjectId) -> Option<EmbeddedImage> {
        match extract_embedded(&self.doc, *id) {
            Ok(image) => Some(image),
            Err(err) => {
                let reason = err.to_string();
                trace_debug!("image_extract_skipped", object = id.0, error = reason.as_str());
                None
            }
        }
    }
}

fn extract_err(what: &str, err: lopdf::Error) -> SymMatchError {
    SymMatchError::ImageExtract {
        reason: format!("{what}: {err}"),
    }
}

fn unsupported(what: impl Into<String>) -> SymMatchError {
    SymMatchError::ImageExtract {
        reason: what.into(),
    }
}

/// Follows a reference, returning `obj` itself if it is not one.
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn dict_entry<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().map(|obj| resolve(doc, obj))
}

fn as_dict<'a>(obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

fn as_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(*value as f64),
        _ => None,
    }
}

fn int_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> SymMatchResult<usize> {
    match dict_entry(doc, dict, key) {
        Some(Object::Integer(value)) if *value >= 0 => Ok(*value as usize),
        _ => Err(unsupported(format!(
            "missing or invalid /{}",
            String::from_utf8_lossy(key)
        ))),
    }
}

/// Resources of a page, walking up `/Parent` links when the page inherits them.
fn inherited_resources<'a>(doc: &'a Document, page: &'a Dictionary) -> Option<&'a Dictionary> {
    let mut node = page;
    for _ in 0..MAX_DEPTH {
        if let Some(resources) = dict_entry(doc, node, b"Resources").and_then(as_dict) {
            return Some(resources);
        }
        node = dict_entry(doc, node, b"Parent").and_then(as_dict)?;
    }
    None
}

fn collect_images(doc: &Document, resources: &Dictionary, depth: usize, out: &mut Vec<ObjectId>) {
    if depth >= MAX_DEPTH {
        return;
    }
    let Some(xobjects) = dict_entry(doc, resources, b"XObject").and_then(as_dict) else {
        return;
    };

    for (_, value) in xobjects.iter() {
        let Object::Reference(id) = value else {
            continue;
        };
        let Ok(Object::Stream(stream)) = doc.get_object(*id) else {
            continue;
        };
        match dict_entry(doc, &stream.dict, b"Subtype") {
            Some(Object::Name(name)) if name == b"Image" => {
                if !out.contains(id) {
                    out.push(*id);
                }
            }
            Some(Object::Name(name)) if name == b"Form" => {
                if let Some(inner) = dict_entry(doc, &stream.dict, b"Resources").and_then(as_dict)
                {
                    collect_images(doc, inner, depth + 1, out);
                }
            }
            _ => {}
        }
    }
}

fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict_entry(doc, dict, b"Filter") {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|item| match resolve(doc, item) {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn extract_embedded(doc: &Document, id: ObjectId) -> SymMatchResult<EmbeddedImage> {
    let stream = doc
        .get_object(id)
        .and_then(Object::as_stream)
        .map_err(|err| extract_err("image stream", err))?;
    let dict = &stream.dict;

    let filters = filter_names(doc, dict);
    match filters.last().map(Vec::as_slice) {
        Some(b"DCTDecode") | Some(b"JPXDecode") => {
            let leading = filters.len() - 1;
            let bytes = if leading == 0 {
                stream.content.clone()
            } else {
                undo_filters(doc, stream, &filters[..leading])?
            };
            return Ok(EmbeddedImage::Encoded(bytes));
        }
        Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
            let names: Vec<_> = filters
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect();
            return Err(unsupported(format!("unsupported filter chain {names:?}")));
        }
        _ => {}
    }

    let samples = if filters.is_empty() {
        stream.content.clone()
    } else {
        undo_filters(doc, stream, &filters)?
    };

    let width = int_entry(doc, dict, b"Width")?;
    let height = int_entry(doc, dict, b"Height")?;
    let image_mask = matches!(
        dict_entry(doc, dict, b"ImageMask"),
        Some(Object::Boolean(true))
    );
    let (color, bits_per_component) = if image_mask {
        (RawColor::Gray, 1)
    } else {
        let color = dict_entry(doc, dict, b"ColorSpace")
            .ok_or_else(|| unsupported("missing /ColorSpace"))
            .and_then(|cs| color_space(doc, cs, 0))?;
        let bpc = int_entry(doc, dict, b"BitsPerComponent")?;
        let bpc = u8::try_from(bpc).map_err(|_| unsupported(format!("bits per component {bpc}")))?;
        (color, bpc)
    };

    Ok(EmbeddedImage::Raw(RawImage {
        width,
        height,
        bits_per_component,
        color,
        invert: decode_inverted(doc, dict),
        samples,
    }))
}

/// Applies the decoders for `filters`, the leading part of the stream's chain.
///
/// The stream is re-wrapped without its image keys so `lopdf` only sees the
/// generic filters it can undo.
fn undo_filters(doc: &Document, stream: &Stream, filters: &[Vec<u8>]) -> SymMatchResult<Vec<u8>> {
    let mut dict = Dictionary::new();
    match filters {
        [single] => {
            dict.set("Filter", Object::Name(single.clone()));
            let parms = match dict_entry(doc, &stream.dict, b"DecodeParms") {
                Some(Object::Array(items)) => items.first().map(|item| resolve(doc, item)),
                other => other,
            };
            if let Some(Object::Dictionary(parms)) = parms {
                dict.set("DecodeParms", parms.clone());
            }
        }
        _ => {
            let names = filters.iter().map(|f| Object::Name(f.clone())).collect();
            dict.set("Filter", Object::Array(names));
        }
    }
    Stream::new(dict, stream.content.clone())
        .decompressed_content()
        .map_err(|err| extract_err("decompress", err))
}

fn color_space(doc: &Document, obj: &Object, depth: usize) -> SymMatchResult<RawColor> {
    if depth >= MAX_DEPTH {
        return Err(unsupported("color space nesting too deep"));
    }
    match resolve(doc, obj) {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Ok(RawColor::Gray),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(RawColor::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(RawColor::Cmyk),
            other => Err(unsupported(format!(
                "unsupported color space {}",
                String::from_utf8_lossy(other)
            ))),
        },
        Object::Array(items) => {
            let family = match items.first().map(|item| resolve(doc, item)) {
                Some(Object::Name(name)) => name.as_slice(),
                _ => return Err(unsupported("malformed color space array")),
            };
            match family {
                b"CalGray" => Ok(RawColor::Gray),
                b"CalRGB" => Ok(RawColor::Rgb),
                b"ICCBased" => icc_color(doc, items.get(1), depth),
                b"Indexed" | b"I" => indexed_color(doc, items, depth),
                other => Err(unsupported(format!(
                    "unsupported color space {}",
                    String::from_utf8_lossy(other)
                ))),
            }
        }
        _ => Err(unsupported("malformed color space")),
    }
}

fn icc_color(doc: &Document, profile: Option<&Object>, depth: usize) -> SymMatchResult<RawColor> {
    let Some(Object::Stream(stream)) = profile.map(|obj| resolve(doc, obj)) else {
        return Err(unsupported("malformed ICCBased color space"));
    };
    match dict_entry(doc, &stream.dict, b"N") {
        Some(Object::Integer(1)) => Ok(RawColor::Gray),
        Some(Object::Integer(3)) => Ok(RawColor::Rgb),
        Some(Object::Integer(4)) => Ok(RawColor::Cmyk),
        _ => match dict_entry(doc, &stream.dict, b"Alternate") {
            Some(alternate) => color_space(doc, alternate, depth + 1),
            None => Err(unsupported("ICCBased color space without /N")),
        },
    }
}

fn indexed_color(doc: &Document, items: &[Object], depth: usize) -> SymMatchResult<RawColor> {
    let (Some(base), Some(hival), Some(lookup)) = (items.get(1), items.get(2), items.get(3)) else {
        return Err(unsupported("malformed Indexed color space"));
    };
    let base = color_space(doc, base, depth + 1)?;
    let hival = match resolve(doc, hival) {
        Object::Integer(value) if (0..=255).contains(value) => *value as usize,
        _ => return Err(unsupported("invalid Indexed hival")),
    };
    let mut palette = match resolve(doc, lookup) {
        Object::String(bytes, _) => bytes.clone(),
        Object::Stream(stream) if filter_names(doc, &stream.dict).is_empty() => {
            stream.content.clone()
        }
        Object::Stream(stream) => stream
            .decompressed_content()
            .map_err(|err| extract_err("palette", err))?,
        _ => return Err(unsupported("invalid Indexed lookup")),
    };
    palette.truncate((hival + 1) * base.components());
    Ok(RawColor::Indexed {
        base: Box::new(base),
        palette,
    })
}

/// True when `/Decode` maps samples inversely (`[1 0 ...]`).
fn decode_inverted(doc: &Document, dict: &Dictionary) -> bool {
    let Some(Object::Array(items)) = dict_entry(doc, dict, b"Decode") else {
        return false;
    };
    let lo = items.first().map(|obj| resolve(doc, obj)).and_then(as_number);
    let hi = items.get(1).map(|obj| resolve(doc, obj)).and_then(as_number);
    matches!((lo, hi), (Some(lo), Some(hi)) if lo > hi)
}
