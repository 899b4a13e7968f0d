//! Image decoding and PNG output.
//!
//! Inputs are decoded to 8-bit sRGB by sniffing magic bytes: PNG through the
//! `png` crate and JPEG through `jpeg-decoder` (behind the `jpeg-decode`
//! feature). Masks and overlays are written back out as PNG.

use std::io::Cursor;
use std::path::Path;

use imgref::ImgVec;
use rgb::RGB8;

use crate::error::{Error, Result};
use crate::field::Mask;

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Container formats recognised by [`detect_format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

/// Identify an encoded image by its leading bytes.
#[must_use]
pub fn detect_format(data: &[u8]) -> Option<ImageFormat> {
    if data.starts_with(PNG_MAGIC) {
        Some(ImageFormat::Png)
    } else if data.starts_with(JPEG_MAGIC) {
        Some(ImageFormat::Jpeg)
    } else {
        None
    }
}

/// Decode PNG or JPEG bytes to RGB8.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for unrecognised data (or JPEG with
/// the `jpeg-decode` feature disabled) and [`Error::Codec`] if decoding
/// fails.
pub fn decode_image(data: &[u8]) -> Result<ImgVec<RGB8>> {
    match detect_format(data) {
        Some(ImageFormat::Png) => decode_png(data),
        #[cfg(feature = "jpeg-decode")]
        Some(ImageFormat::Jpeg) => decode_jpeg(data),
        #[cfg(not(feature = "jpeg-decode"))]
        Some(ImageFormat::Jpeg) => Err(Error::UnsupportedFormat(
            "JPEG (built without jpeg-decode)".to_string(),
        )),
        None => Err(Error::UnsupportedFormat("unrecognised image signature".to_string())),
    }
}

/// Read and decode an image file.
///
/// # Errors
///
/// Returns [`Error::ImageLoad`] naming the path for any read or decode
/// failure.
pub fn load_image(path: &Path) -> Result<ImgVec<RGB8>> {
    let data = std::fs::read(path).map_err(|e| Error::ImageLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    decode_image(&data).map_err(|e| Error::ImageLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn png_error(e: impl std::fmt::Display) -> Error {
    Error::Codec {
        codec: "png".to_string(),
        message: e.to_string(),
    }
}

/// Pixels of `stride` bytes whose first three are R, G, B.
fn rgb_chunks(bytes: &[u8], stride: usize) -> Vec<RGB8> {
    bytes
        .chunks_exact(stride)
        .map(|c| RGB8::new(c[0], c[1], c[2]))
        .collect()
}

/// Pixels of `stride` bytes whose first byte is gray.
fn gray_chunks(bytes: &[u8], stride: usize) -> Vec<RGB8> {
    bytes
        .chunks_exact(stride)
        .map(|c| RGB8::new(c[0], c[0], c[0]))
        .collect()
}

/// Decode a PNG, expanding palettes and dropping alpha and 16-bit precision.
pub fn decode_png(data: &[u8]) -> Result<ImgVec<RGB8>> {
    let mut decoder = png::Decoder::new(Cursor::new(data));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().map_err(png_error)?;

    let buf_size = reader
        .output_buffer_size()
        .ok_or_else(|| png_error("output buffer size unavailable"))?;
    let mut buf = vec![0u8; buf_size];
    let frame = reader.next_frame(&mut buf).map_err(png_error)?;
    let width = frame.width as usize;
    let height = frame.height as usize;
    let bytes = &buf[..frame.buffer_size()];

    let pixels: Vec<RGB8> = match frame.color_type {
        png::ColorType::Rgb => rgb_chunks(bytes, 3),
        png::ColorType::Rgba => rgb_chunks(bytes, 4),
        png::ColorType::Grayscale => gray_chunks(bytes, 1),
        png::ColorType::GrayscaleAlpha => gray_chunks(bytes, 2),
        other => return Err(png_error(format!("unsupported color type {other:?}"))),
    };
    if pixels.len() != width * height || width == 0 || height == 0 {
        return Err(png_error(format!("unexpected frame layout for {width}x{height}")));
    }
    Ok(ImgVec::new(pixels, width, height))
}

/// Decode a baseline or progressive JPEG.
///
/// # Errors
///
/// Returns an error if the data is invalid or uses CMYK.
#[cfg(feature = "jpeg-decode")]
pub fn decode_jpeg(data: &[u8]) -> Result<ImgVec<RGB8>> {
    let codec_err = |message: String| Error::Codec {
        codec: "jpeg-decoder".to_string(),
        message,
    };

    let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(data));
    let pixels = decoder.decode().map_err(|e| codec_err(e.to_string()))?;
    let info = decoder
        .info()
        .ok_or_else(|| codec_err("missing JPEG info after decode".to_string()))?;
    let width = usize::from(info.width);
    let height = usize::from(info.height);

    let rgb: Vec<RGB8> = match info.pixel_format {
        jpeg_decoder::PixelFormat::RGB24 => rgb_chunks(&pixels, 3),
        jpeg_decoder::PixelFormat::L8 => gray_chunks(&pixels, 1),
        // big-endian samples, keep the high byte
        jpeg_decoder::PixelFormat::L16 => gray_chunks(&pixels, 2),
        jpeg_decoder::PixelFormat::CMYK32 => {
            return Err(codec_err("CMYK JPEGs are not supported".to_string()));
        }
    };
    if rgb.len() != width * height || width == 0 || height == 0 {
        return Err(codec_err(format!("unexpected frame layout for {width}x{height}")));
    }
    Ok(ImgVec::new(rgb, width, height))
}

fn encode_png(width: usize, height: usize, color: png::ColorType, data: &[u8]) -> Result<Vec<u8>> {
    let w = u32::try_from(width).map_err(png_error)?;
    let h = u32::try_from(height).map_err(png_error)?;
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, w, h);
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().map_err(png_error)?;
        writer.write_image_data(data).map_err(png_error)?;
        writer.finish().map_err(png_error)?;
    }
    Ok(out)
}

/// Encode a mask as an 8-bit grayscale PNG.
pub fn encode_mask_png(mask: &Mask) -> Result<Vec<u8>> {
    let data: Vec<u8> = mask.pixels().collect();
    encode_png(mask.width(), mask.height(), png::ColorType::Grayscale, &data)
}

/// Encode an RGB8 image as PNG.
pub fn encode_rgb_png(image: &ImgVec<RGB8>) -> Result<Vec<u8>> {
    let data: Vec<u8> = image.pixels().flat_map(|p| [p.r, p.g, p.b]).collect();
    encode_png(image.width(), image.height(), png::ColorType::Rgb, &data)
}

/// Write a mask PNG to `path`.
pub fn save_mask_png(mask: &Mask, path: &Path) -> Result<()> {
    std::fs::write(path, encode_mask_png(mask)?)?;
    Ok(())
}

/// Write an RGB8 PNG to `path`.
pub fn save_rgb_png(image: &ImgVec<RGB8>, path: &Path) -> Result<()> {
    std::fs::write(path, encode_rgb_png(image)?)?;
    Ok(())
}
