//! Synthetic PDFs and rasters for integration tests.
#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

/// One embedded image in a synthetic page.
#[derive(Clone)]
pub enum TestImage {
    /// Unfiltered 8-bit DeviceGray samples.
    Gray {
        width: usize,
        height: usize,
        pixels: Vec<u8>,
    },
    /// Flate-compressed 8-bit DeviceRGB samples.
    Rgb {
        width: usize,
        height: usize,
        pixels: Vec<u8>,
    },
    /// A DCTDecode stream holding these bytes.
    Jpeg {
        width: usize,
        height: usize,
        bytes: Vec<u8>,
    },
    /// JPEG bytes additionally Flate-compressed: `[/FlateDecode /DCTDecode]`.
    FlateJpeg {
        width: usize,
        height: usize,
        bytes: Vec<u8>,
    },
    /// An image wrapped in a form XObject.
    InForm(Box<TestImage>),
}

impl TestImage {
    pub fn gray(width: usize, height: usize, pixels: Vec<u8>) -> Self {
        TestImage::Gray {
            width,
            height,
            pixels,
        }
    }

    /// A JPEG stream whose bytes do not decode.
    pub fn corrupt_jpeg() -> Self {
        TestImage::Jpeg {
            width: 16,
            height: 16,
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xDE, 0xAD],
        }
    }
}

/// Where page resources live.
#[derive(Clone, Copy, PartialEq)]
pub enum Resources {
    OnPage,
    /// First page's resources are set on the page tree node and inherited.
    Inherited,
}

fn image_stream(image: &TestImage) -> Stream {
    let (width, height, color, filter, content) = match image {
        TestImage::Gray {
            width,
            height,
            pixels,
        } => (*width, *height, "DeviceGray", None, pixels.clone()),
        TestImage::Rgb {
            width,
            height,
            pixels,
        } => (*width, *height, "DeviceRGB", None, pixels.clone()),
        TestImage::Jpeg {
            width,
            height,
            bytes,
        } => (*width, *height, "DeviceGray", Some("DCTDecode"), bytes.clone()),
        TestImage::FlateJpeg {
            width,
            height,
            bytes,
        } => {
            // Zero padding after the JPEG end marker keeps the payload
            // compressible; decoders stop at the marker.
            let mut padded = bytes.clone();
            padded.resize(bytes.len() + 4096, 0);
            (*width, *height, "DeviceGray", None, padded)
        }
        TestImage::InForm(_) => unreachable!("forms are built separately"),
    };
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color,
        "BitsPerComponent" => 8i64,
    };
    if let Some(filter) = filter {
        dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
    }
    let mut stream = Stream::new(dict, content);
    match image {
        TestImage::Rgb { .. } => {
            let _ = stream.compress();
        }
        TestImage::FlateJpeg { .. } => {
            stream.compress().unwrap();
            assert!(stream.dict.has(b"Filter"), "payload did not compress");
            stream.dict.set(
                "Filter",
                vec![
                    Object::Name(b"FlateDecode".to_vec()),
                    Object::Name(b"DCTDecode".to_vec()),
                ],
            );
        }
        _ => {}
    }
    stream
}

fn add_image(doc: &mut Document, image: &TestImage) -> ObjectId {
    match image {
        TestImage::InForm(inner) => {
            let inner_id = add_image(doc, inner);
            let content = Content {
                operations: vec![Operation::new("Do", vec![Object::Name(b"Inner".to_vec())])],
            };
            let form = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![0i64.into(), 0i64.into(), 1i64.into(), 1i64.into()],
                    "Resources" => dictionary! {
                        "XObject" => dictionary! { "Inner" => inner_id },
                    },
                },
                content.encode().unwrap(),
            );
            doc.add_object(form)
        }
        other => doc.add_object(image_stream(other)),
    }
}

/// Builds a PDF with one page per entry of `pages`.
pub fn build_pdf(pages: &[Vec<TestImage>], resources: Resources) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    let mut inherited: Option<Dictionary> = None;

    for (page_idx, images) in pages.iter().enumerate() {
        let mut xobjects = Dictionary::new();
        let mut operations = Vec::new();
        for (i, image) in images.iter().enumerate() {
            let id = add_image(&mut doc, image);
            let name = format!("Im{i}");
            xobjects.set(name.clone(), id);
            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new(
                "cm",
                vec![
                    100i64.into(),
                    0i64.into(),
                    0i64.into(),
                    100i64.into(),
                    (50 + 120 * i as i64).into(),
                    500i64.into(),
                ],
            ));
            operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
            operations.push(Operation::new("Q", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0i64.into(), 0i64.into(), 595i64.into(), 842i64.into()],
        };
        let page_resources = dictionary! { "XObject" => xobjects };
        if resources == Resources::Inherited && page_idx == 0 {
            inherited = Some(page_resources);
        } else {
            page.set("Resources", page_resources);
        }
        kids.push(doc.add_object(page).into());
    }

    let count = kids.len() as i64;
    let mut pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
    };
    if let Some(resources) = inherited {
        pages_dict.set("Resources", resources);
    }
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Writes a PDF built from `pages` into `dir/name`.
pub fn write_pdf(dir: &Path, name: &str, pages: &[Vec<TestImage>]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, build_pdf(pages, Resources::OnPage)).unwrap();
    path
}

/// Exclamation-mark glyph: dark bar and dot on a light background.
pub fn ex_mark(width: usize, height: usize) -> Vec<u8> {
    let mut data = vec![245u8; width * height];
    let bar_x0 = width * 2 / 5;
    let bar_x1 = width * 3 / 5;
    let bar_y1 = height * 13 / 20;
    let dot_y0 = height * 3 / 4;
    for y in 0..height {
        for x in bar_x0..bar_x1 {
            if (height / 10..bar_y1).contains(&y) || (dot_y0..height * 9 / 10).contains(&y) {
                data[y * width + x] = 15;
            }
        }
    }
    data
}

/// Diagonal stripes, uncorrelated with `ex_mark`.
pub fn stripes(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            data.push(if (x + 2 * y) % 7 < 3 { 30 } else { 220 });
        }
    }
    data
}

/// Seeded uniform noise.
pub fn noise(width: usize, height: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..width * height).map(|_| rng.random::<u8>()).collect()
}

/// Pastes `patch` into `canvas` at `(x0, y0)`.
pub fn paste(
    canvas: &mut [u8],
    canvas_width: usize,
    patch: &[u8],
    patch_width: usize,
    x0: usize,
    y0: usize,
) {
    for (y, row) in patch.chunks_exact(patch_width).enumerate() {
        let start = (y0 + y) * canvas_width + x0;
        canvas[start..start + patch_width].copy_from_slice(row);
    }
}

/// Saves a grayscale buffer as a PNG file.
pub fn write_png(path: &Path, width: usize, height: usize, data: Vec<u8>) {
    image::GrayImage::from_raw(width as u32, height as u32, data)
        .unwrap()
        .save(path)
        .unwrap();
}

/// Encodes a grayscale buffer as JPEG.
pub fn encode_jpeg(width: usize, height: usize, data: Vec<u8>) -> Vec<u8> {
    let img = image::GrayImage::from_raw(width as u32, height as u32, data).unwrap();
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, 95)
        .encode_image(&img)
        .unwrap();
    bytes
}
