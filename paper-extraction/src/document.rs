//! Reading an uploaded paper into pages of raw text and embedded images.
//!
//! The pipeline only ever sees [`PaperDocument`]; how it was produced is
//! hidden behind [`DocumentLoader`] so tests can hand in pages directly.
//! [`LopdfLoader`] is the production reader.

use std::collections::HashSet;
use std::io::Cursor;
use std::panic;
use std::path::Path;

use image::{DynamicImage, ImageFormat};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ExtractionError, Result};
use crate::normalize::normalize_text;

/// An image XObject found on a page, PNG-encoded where it could be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub index: usize,
    pub data: Vec<u8>,
}

/// One page as read from the PDF. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub index: usize,
    pub text: String,
    pub images: Vec<EmbeddedImage>,
}

/// Text-only view of a page, small enough to carry through a workflow context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperDocument {
    pub pages: Vec<Page>,
}

impl PaperDocument {
    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    pub fn page_texts(&self) -> Vec<PageText> {
        self.pages
            .iter()
            .map(|page| PageText {
                index: page.index,
                text: page.text.clone(),
            })
            .collect()
    }

    pub fn full_text(&self) -> String {
        full_text(self.pages.iter().map(|page| page.text.as_str()))
    }

    pub fn image_count(&self) -> usize {
        self.pages.iter().map(|page| page.images.len()).sum()
    }
}

/// Join page texts in order and normalize the result.
///
/// A line break is inserted between pages that do not already end in one,
/// so the last word of a page never fuses with the first word of the next.
pub fn full_text<'a>(pages: impl IntoIterator<Item = &'a str>) -> String {
    let mut joined = String::new();
    for text in pages {
        if !joined.is_empty() && !joined.ends_with('\n') {
            joined.push('\n');
        }
        joined.push_str(text);
    }
    normalize_text(&joined)
}

/// Opens a stored PDF. Blocking: callers on an async runtime should use
/// `spawn_blocking`.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<PaperDocument>;
}

/// [`DocumentLoader`] backed by `lopdf` for structure and images, with page
/// text laid out by `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfLoader;

impl DocumentLoader for LopdfLoader {
    fn load(&self, path: &Path) -> Result<PaperDocument> {
        let bytes = std::fs::read(path)
            .map_err(|e| ExtractionError::Pdf(format!("Failed to read {}: {e}", path.display())))?;
        let doc = Document::load_mem(&bytes)
            .map_err(|e| ExtractionError::Pdf(format!("Failed to open {}: {e}", path.display())))?;

        // lopdf's own extractor only breaks lines at ET, so it is the fallback.
        // pdf-extract panics on some malformed content streams.
        let laid_out = match panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(&bytes)) {
            Ok(Ok(texts)) => texts,
            Ok(Err(e)) => {
                warn!(error = %e, "Text layout failed, using raw page text");
                Vec::new()
            }
            Err(_) => {
                warn!("Text layout panicked, using raw page text");
                Vec::new()
            }
        };

        let mut pages = Vec::new();
        for (index, (page_number, page_id)) in doc.get_pages().into_iter().enumerate() {
            let text = match laid_out.get(index) {
                Some(text) => text.clone(),
                None => doc.extract_text(&[page_number]).unwrap_or_else(|e| {
                    warn!(page = index, error = %e, "No extractable text on page");
                    String::new()
                }),
            };

            let images = page_images(&doc, page_id)
                .into_iter()
                .enumerate()
                .map(|(image_index, stream)| EmbeddedImage {
                    index: image_index,
                    data: image_bytes(&doc, stream),
                })
                .collect::<Vec<_>>();

            debug!(
                page = index,
                chars = text.len(),
                images = images.len(),
                "Read PDF page"
            );
            pages.push(Page {
                index,
                text,
                images,
            });
        }

        Ok(PaperDocument::new(pages))
    }
}

/// Image XObjects reachable from the page's `/Resources`, including those
/// drawn through Form XObjects, in dictionary order.
fn page_images(doc: &Document, page_id: ObjectId) -> Vec<&Stream> {
    let mut images = Vec::new();
    if let Some(resources) = page_resources(doc, page_id) {
        collect_images(doc, resources, &mut HashSet::new(), &mut images);
    }
    images
}

fn collect_images<'a>(
    doc: &'a Document,
    resources: &'a Dictionary,
    visited: &mut HashSet<ObjectId>,
    images: &mut Vec<&'a Stream>,
) {
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_dict().ok())
    else {
        return;
    };

    for (_, obj) in xobjects.iter() {
        // Forms may reference each other or themselves.
        if let Object::Reference(id) = obj {
            if !visited.insert(*id) {
                continue;
            }
        }
        let Object::Stream(stream) = resolve(doc, obj) else {
            continue;
        };
        if has_subtype(&stream.dict, b"Image") {
            images.push(stream);
        } else if has_subtype(&stream.dict, b"Form") {
            if let Some(nested) = stream
                .dict
                .get(b"Resources")
                .ok()
                .and_then(|obj| resolve(doc, obj).as_dict().ok())
            {
                collect_images(doc, nested, visited, images);
            }
        }
    }
}

/// `/Resources` may be inherited from an ancestor `/Pages` node.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;
    loop {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve(doc, resources).as_dict().ok();
        }
        let parent = node.get(b"Parent").ok()?;
        node = resolve(doc, parent).as_dict().ok()?;
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn has_subtype(dict: &Dictionary, subtype: &[u8]) -> bool {
    matches!(dict.get(b"Subtype"), Ok(Object::Name(name)) if name == subtype)
}

fn has_filter(dict: &Dictionary, filter: &[u8]) -> bool {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == filter,
        Ok(Object::Array(filters)) => filters
            .iter()
            .any(|f| matches!(f, Object::Name(name) if name == filter)),
        _ => false,
    }
}

/// PNG bytes for the stream when it can be decoded, otherwise its raw content.
fn image_bytes(doc: &Document, stream: &Stream) -> Vec<u8> {
    match decode_image(doc, stream) {
        Ok(image) => match encode_png(&image) {
            Ok(png) => png,
            Err(e) => {
                warn!(error = %e, "Keeping raw image bytes");
                stream.content.clone()
            }
        },
        Err(e) => {
            debug!(error = %e, "Image stream not decodable, keeping raw bytes");
            stream.content.clone()
        }
    }
}

fn decode_image(doc: &Document, stream: &Stream) -> Result<DynamicImage> {
    // DCTDecode content is a complete JPEG file.
    if has_filter(&stream.dict, b"DCTDecode") {
        return image::load_from_memory(&stream.content)
            .map_err(|e| ExtractionError::Image(format!("JPEG decode failed: {e}")));
    }

    let content = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    if let Ok(image) = image::load_from_memory(&content) {
        return Ok(image);
    }

    raw_pixels_to_image(doc, &stream.dict, content)
}

fn raw_pixels_to_image(doc: &Document, dict: &Dictionary, pixels: Vec<u8>) -> Result<DynamicImage> {
    let width = int_entry(dict, b"Width")? as u32;
    let height = int_entry(dict, b"Height")? as u32;
    let bits = int_entry(dict, b"BitsPerComponent").unwrap_or(8);
    if bits != 8 {
        return Err(ExtractionError::Image(format!(
            "Unsupported bits per component: {bits}"
        )));
    }

    let image = match color_channels(doc, dict) {
        1 => image::GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        3 => image::RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        channels => {
            return Err(ExtractionError::Image(format!(
                "Unsupported channel count: {channels}"
            )));
        }
    };

    image.ok_or_else(|| {
        ExtractionError::Image(format!("Pixel buffer does not match {width}x{height}"))
    })
}

fn color_channels(doc: &Document, dict: &Dictionary) -> u32 {
    let Ok(space) = dict.get(b"ColorSpace") else {
        return 3;
    };
    match resolve(doc, space) {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" => 1,
            b"DeviceCMYK" => 4,
            _ => 3,
        },
        Object::Array(parts) => match parts.first() {
            Some(Object::Name(name)) if name == b"ICCBased" => parts
                .get(1)
                .map(|stream| resolve(doc, stream))
                .and_then(|obj| obj.as_stream().ok())
                .and_then(|stream| int_entry(&stream.dict, b"N").ok())
                .map(|n| n as u32)
                .unwrap_or(3),
            // Palette lookups are not expanded.
            Some(Object::Name(name)) if name == b"Indexed" => 0,
            _ => 3,
        },
        _ => 3,
    }
}

fn int_entry(dict: &Dictionary, key: &[u8]) -> Result<i64> {
    dict.get(key)
        .and_then(Object::as_i64)
        .map_err(|_| {
            ExtractionError::Pdf(format!(
                "Missing integer /{} in image dictionary",
                String::from_utf8_lossy(key)
            ))
        })
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| ExtractionError::Image(format!("PNG encode failed: {e}")))?;
    Ok(buffer)
}
