//! Image handling for PDF documents

use crate::{PdfError, Result};
use image::{DynamicImage, GenericImageView, ImageReader, Rgba, RgbaImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::{Cursor, Write};

impl From<image::ImageError> for PdfError {
    fn from(err: image::ImageError) -> Self {
        PdfError::ImageError(err.to_string())
    }
}

/// Detected image format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// Detect image format from magic bytes
pub fn detect_format(data: &[u8]) -> Result<ImageFormat> {
    if data.len() < 8 {
        return Err(PdfError::ImageError("Image data too short".to_string()));
    }

    // JPEG starts with FF D8 FF
    if data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF {
        return Ok(ImageFormat::Jpeg);
    }

    // PNG starts with 89 50 4E 47 0D 0A 1A 0A
    if data[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return Ok(ImageFormat::Png);
    }

    Err(PdfError::ImageError("Unknown image format".to_string()))
}

/// Whether `data` is an image this crate can decode
pub fn is_image(data: &[u8]) -> bool {
    detect_format(data).is_ok() && image::load_from_memory(data).is_ok()
}

/// Rotate an image clockwise about its own center by `degrees`
///
/// The canvas grows to the rotated bounding box; uncovered corners are
/// transparent. Multiples of 90 are exact, a full turn returns the input
/// untouched. The result is PNG encoded.
pub fn rotate(data: &[u8], degrees: f64) -> Result<Vec<u8>> {
    let normalized = degrees.rem_euclid(360.0);
    if normalized == 0.0 {
        detect_format(data)?;
        return Ok(data.to_vec());
    }

    let source = image::load_from_memory(data)?;
    let rotated = if normalized == 90.0 {
        source.rotate90()
    } else if normalized == 180.0 {
        source.rotate180()
    } else if normalized == 270.0 {
        source.rotate270()
    } else {
        DynamicImage::ImageRgba8(rotate_arbitrary(&source.to_rgba8(), normalized))
    };

    log::debug!(
        "rotated {}x{} image by {normalized} degrees to {}x{}",
        source.width(),
        source.height(),
        rotated.width(),
        rotated.height()
    );

    let mut encoded = Vec::new();
    rotated.write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Png)?;
    Ok(encoded)
}

/// Pad to the rotated bounding box, then rotate in place
fn rotate_arbitrary(source: &RgbaImage, degrees: f64) -> RgbaImage {
    let (w, h) = (source.width() as f64, source.height() as f64);
    let theta = degrees.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let new_w = (w * cos + h * sin).ceil().max(1.0) as u32;
    let new_h = (w * sin + h * cos).ceil().max(1.0) as u32;

    // A wide image can have a bounding box narrower than itself
    let pad_w = new_w.max(source.width());
    let pad_h = new_h.max(source.height());
    let mut canvas = RgbaImage::from_pixel(pad_w, pad_h, Rgba([0, 0, 0, 0]));
    let offset_x = ((pad_w - source.width()) / 2) as i64;
    let offset_y = ((pad_h - source.height()) / 2) as i64;
    image::imageops::overlay(&mut canvas, source, offset_x, offset_y);

    let rotated = rotate_about_center(
        &canvas,
        theta as f32,
        Interpolation::Bilinear,
        Rgba([0, 0, 0, 0]),
    );
    image::imageops::crop_imm(&rotated, (pad_w - new_w) / 2, (pad_h - new_h) / 2, new_w, new_h)
        .to_image()
}

/// JPEG info including dimensions and color components
#[derive(Debug, Clone, Copy)]
struct JpegInfo {
    width: u32,
    height: u32,
    num_components: u8,
}

/// Get JPEG info including dimensions and color components
fn get_jpeg_info(data: &[u8]) -> Result<JpegInfo> {
    // SOF segment: marker (2), length (2), precision (1), height (2),
    // width (2), component count (1)
    let mut i = 2;
    while i + 10 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }

        let marker = data[i + 1];

        if (0xC0..=0xCF).contains(&marker) && marker != 0xC4 && marker != 0xC8 && marker != 0xCC {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            let num_components = data[i + 9];
            return Ok(JpegInfo {
                width,
                height,
                num_components,
            });
        }

        let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        if length < 2 {
            break;
        }
        i += 2 + length;
    }

    Err(PdfError::ImageError(
        "Could not parse JPEG info".to_string(),
    ))
}

fn deflate(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

/// Image XObject for PDF embedding
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Image width
    pub width: u32,
    /// Image height
    pub height: u32,
    /// Color space ("DeviceRGB", "DeviceGray", "DeviceCMYK")
    pub color_space: String,
    /// Bits per component
    pub bits_per_component: u8,
    /// PDF filter ("DCTDecode" for JPEG, "FlateDecode" otherwise)
    pub filter: String,
    /// Raw image data (compressed)
    pub data: Vec<u8>,
    /// Flate-compressed 8-bit alpha channel, when the image has one
    pub soft_mask: Option<Vec<u8>>,
}

impl ImageXObject {
    /// Create XObject from JPEG or PNG bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        match detect_format(data)? {
            ImageFormat::Jpeg => Self::from_jpeg(data),
            ImageFormat::Png => Self::from_png(data),
        }
    }

    /// Create XObject from JPEG data
    ///
    /// JPEG images are embedded directly with the DCTDecode filter.
    pub fn from_jpeg(data: &[u8]) -> Result<Self> {
        let info = get_jpeg_info(data)?;

        let color_space = match info.num_components {
            1 => "DeviceGray",
            4 => "DeviceCMYK",
            _ => "DeviceRGB",
        };

        Ok(Self {
            width: info.width,
            height: info.height,
            color_space: color_space.to_string(),
            bits_per_component: 8,
            filter: "DCTDecode".to_string(),
            data: data.to_vec(),
            soft_mask: None,
        })
    }

    /// Create XObject from PNG data
    ///
    /// PNG images are decoded and re-encoded with FlateDecode. An alpha
    /// channel becomes a soft mask so transparent pixels stay transparent.
    pub fn from_png(data: &[u8]) -> Result<Self> {
        let image = ImageReader::new(Cursor::new(data))
            .with_guessed_format()?
            .decode()?;
        Self::from_image(&image)
    }

    /// Create XObject from a decoded image
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        let has_alpha = image.color().has_alpha();
        let is_gray = matches!(
            image.color(),
            image::ColorType::L8 | image::ColorType::L16 | image::ColorType::La8 | image::ColorType::La16
        );

        let (raw, color_space) = if is_gray {
            (image.to_luma8().into_raw(), "DeviceGray")
        } else {
            (image.to_rgb8().into_raw(), "DeviceRGB")
        };

        let soft_mask = if has_alpha {
            let alpha: Vec<u8> = image.to_rgba8().pixels().map(|p| p[3]).collect();
            // A fully opaque mask adds nothing
            if alpha.iter().all(|&a| a == 255) {
                None
            } else {
                Some(deflate(&alpha)?)
            }
        } else {
            None
        };

        Ok(Self {
            width,
            height,
            color_space: color_space.to_string(),
            bits_per_component: 8,
            filter: "FlateDecode".to_string(),
            data: deflate(&raw)?,
            soft_mask,
        })
    }

    /// Convert to lopdf Stream object (without the soft mask reference)
    pub fn to_pdf_stream(&self) -> Stream {
        let mut dict = Dictionary::new();

        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", self.width as i64);
        dict.set("Height", self.height as i64);
        dict.set(
            "ColorSpace",
            Object::Name(self.color_space.as_bytes().to_vec()),
        );
        dict.set("BitsPerComponent", self.bits_per_component as i64);
        dict.set("Filter", Object::Name(self.filter.as_bytes().to_vec()));

        Stream::new(dict, self.data.clone())
    }

    /// Add the image (and its soft mask) to `doc`, returning the image ID
    pub fn add_to(&self, doc: &mut Document) -> ObjectId {
        let mut stream = self.to_pdf_stream();

        if let Some(mask) = &self.soft_mask {
            let mut mask_dict = Dictionary::new();
            mask_dict.set("Type", Object::Name(b"XObject".to_vec()));
            mask_dict.set("Subtype", Object::Name(b"Image".to_vec()));
            mask_dict.set("Width", self.width as i64);
            mask_dict.set("Height", self.height as i64);
            mask_dict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
            mask_dict.set("BitsPerComponent", 8);
            mask_dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
            let mask_id = doc.add_object(Stream::new(mask_dict, mask.clone()));
            stream.dict.set("SMask", Object::Reference(mask_id));
        }

        doc.add_object(stream)
    }
}

/// Generate operators to draw image at position
///
/// # Arguments
/// * `image_name` - Image resource name (e.g., "Im1")
/// * `x` - X coordinate in points
/// * `y` - Y coordinate in points (from bottom, PDF coordinates)
/// * `width` - Image width in points
/// * `height` - Image height in points
pub fn generate_image_operators(
    image_name: &str,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) -> Vec<u8> {
    format!("q\n{width} 0 0 {height} {x} {y} cm\n/{image_name} Do\nQ\n").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .expect("Failed to encode PNG");
        buf
    }

    fn rgba_square(size: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(size, size, Rgba([255, 0, 0, 255]));
        png_bytes(DynamicImage::ImageRgba8(img))
    }

    #[test]
    fn test_detect_jpeg() {
        let jpeg_header = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        assert_eq!(detect_format(&jpeg_header).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_detect_png() {
        let png_header = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(detect_format(&png_header).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_detect_unknown_and_short() {
        assert!(detect_format(&[0u8; 8]).is_err());
        assert!(detect_format(&[0u8; 3]).is_err());
        assert!(detect_format(&[0x89, 0, 0, 0, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(&rgba_square(4)));
        assert!(!is_image(b"not an image at all"));
        // Valid magic bytes but truncated body
        assert!(!is_image(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]));
    }

    #[test]
    fn test_get_jpeg_info() {
        let jpeg = vec![
            0xFF, 0xD8, // SOI
            0xFF, 0xC0, // SOF0
            0x00, 0x11, // Length
            0x08, // Precision
            0x00, 0x64, // Height (100)
            0x00, 0xC8, // Width (200)
            0x03, // Components
            0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01, 0xFF, 0xD9,
        ];

        let xobject = ImageXObject::from_bytes(&jpeg).expect("Failed to read JPEG");
        assert_eq!(xobject.width, 200);
        assert_eq!(xobject.height, 100);
        assert_eq!(xobject.color_space, "DeviceRGB");
        assert_eq!(xobject.filter, "DCTDecode");
        assert!(xobject.soft_mask.is_none());
    }

    #[test]
    fn test_get_jpeg_info_invalid() {
        let data = vec![0xFF, 0xD8, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert!(get_jpeg_info(&data).is_err());
    }

    #[test]
    fn test_from_png_grayscale() {
        let img: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_pixel(16, 8, Luma([128]));
        let xobject =
            ImageXObject::from_png(&png_bytes(DynamicImage::ImageLuma8(img))).expect("decode");

        assert_eq!((xobject.width, xobject.height), (16, 8));
        assert_eq!(xobject.color_space, "DeviceGray");
        assert!(xobject.soft_mask.is_none());
    }

    #[test]
    fn test_from_png_with_transparency_gets_soft_mask() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        let xobject =
            ImageXObject::from_png(&png_bytes(DynamicImage::ImageRgba8(img))).expect("decode");

        assert_eq!(xobject.color_space, "DeviceRGB");
        assert!(xobject.soft_mask.is_some());

        let mut doc = Document::with_version("1.7");
        let id = xobject.add_to(&mut doc);
        let stream = doc
            .get_object(id)
            .and_then(|o| o.as_stream())
            .expect("image stream");
        assert!(stream.dict.get(b"SMask").is_ok());
    }

    #[test]
    fn test_image_xobject_to_pdf_stream() {
        let xobject = ImageXObject {
            width: 100,
            height: 50,
            color_space: "DeviceRGB".to_string(),
            bits_per_component: 8,
            filter: "DCTDecode".to_string(),
            data: vec![1, 2, 3, 4, 5],
            soft_mask: None,
        };

        let stream = xobject.to_pdf_stream();
        let dict = stream.dict;

        assert_eq!(dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Image");
        assert_eq!(dict.get(b"Width").unwrap().as_i64().unwrap(), 100);
        assert_eq!(dict.get(b"Height").unwrap().as_i64().unwrap(), 50);
        assert_eq!(
            dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"DCTDecode"
        );
        assert_eq!(stream.content, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_rotate_zero_is_identity() {
        let original = rgba_square(10);
        assert_eq!(rotate(&original, 0.0).unwrap(), original);
        assert_eq!(rotate(&original, 360.0).unwrap(), original);
    }

    #[test]
    fn test_rotate_quarter_turn_swaps_dimensions() {
        let img = RgbaImage::from_pixel(20, 10, Rgba([0, 255, 0, 255]));
        let rotated = rotate(&png_bytes(DynamicImage::ImageRgba8(img)), 90.0).unwrap();
        let decoded = image::load_from_memory(&rotated).unwrap();
        assert_eq!(decoded.dimensions(), (10, 20));
    }

    #[test]
    fn test_rotate_quarter_turn_is_clockwise() {
        // Top-left pixel marked; a clockwise quarter turn moves it top-right
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let rotated = rotate(&png_bytes(DynamicImage::ImageRgba8(img)), 90.0).unwrap();
        let decoded = image::load_from_memory(&rotated).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(3, 0), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_rotate_arbitrary_expands_canvas() {
        let rotated = rotate(&rgba_square(10), 45.0).unwrap();
        let decoded = image::load_from_memory(&rotated).unwrap();
        // 10 * sqrt(2) rounded up
        assert_eq!(decoded.dimensions(), (15, 15));
        // Corners of the expanded canvas are transparent
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_rotate_wide_image_at_arbitrary_angles() {
        let wide = png_bytes(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            300,
            100,
            Rgba([0, 0, 255, 255]),
        )));
        let rotated = image::load_from_memory(&rotate(&wide, 45.0).unwrap()).unwrap();
        // (300 + 100) * sin 45, rounded up
        assert_eq!(rotated.dimensions(), (283, 283));
        assert_eq!(rotated.to_rgba8().get_pixel(141, 141)[3], 255);

        let strip = png_bytes(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            120,
            10,
            Rgba([0, 0, 255, 255]),
        )));
        let rotated = image::load_from_memory(&rotate(&strip, 10.0).unwrap()).unwrap();
        assert_eq!(rotated.dimensions(), (120, 31));
    }

    #[test]
    fn test_rotate_rejects_non_image() {
        assert!(rotate(b"garbage bytes!", 30.0).is_err());
        assert!(rotate(b"garbage bytes!", 0.0).is_err());
    }

    #[test]
    fn test_generate_image_operators() {
        let ops = generate_image_operators("Im1", 100.0, 200.0, 50.0, 75.0);
        let ops_str = String::from_utf8(ops).unwrap();
        assert_eq!(ops_str, "q\n50 0 0 75 100 200 cm\n/Im1 Do\nQ\n");
    }
}
