use crate::SourceError;
use image::ImageReader;
use std::io::Cursor;

/// Pixel size of an encoded image, read from its header only.
pub fn read_dimensions(bytes: &[u8]) -> Result<(u32, u32), SourceError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| SourceError::Decode(e.to_string()))?
        .into_dimensions()
        .map_err(|e| SourceError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_dimensions() {
        let img = image::DynamicImage::new_rgb8(30, 60);
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        assert_eq!(read_dimensions(bytes.get_ref()).unwrap(), (30, 60));
    }

    #[test]
    fn test_reads_header_of_truncated_image() {
        let img = image::DynamicImage::new_rgb8(320, 200);
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        let bytes = bytes.into_inner();
        let idat = bytes.windows(4).position(|w| w == b"IDAT").unwrap();
        let truncated = &bytes[..idat + 12];

        assert!(image::load_from_memory(truncated).is_err());
        assert_eq!(read_dimensions(truncated).unwrap(), (320, 200));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        assert!(matches!(
            read_dimensions(b"definitely not an image"),
            Err(SourceError::Decode(_))
        ));
    }
}
