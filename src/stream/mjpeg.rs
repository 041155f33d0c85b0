//! MJPEG multipart framing
//!
//! Each encoded frame goes out as one part of a `multipart/x-mixed-replace`
//! response:
//!
//! ```text
//! --boundary\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: <n>\r\n
//! \r\n
//! <n bytes of JPEG>\r\n
//! ```

use bytes::{BufMut, Bytes, BytesMut};

/// Boundary token announced in the response `Content-Type`
pub const BOUNDARY: &str = "--boundary";

/// MIME type of the stream response
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=--boundary";

/// Wrap an encoded image in a multipart block
pub fn encode_part(content_type: &str, image: &[u8]) -> Bytes {
    let header = format!(
        "{}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
        BOUNDARY,
        content_type,
        image.len()
    );

    let mut part = BytesMut::with_capacity(header.len() + image.len() + 2);
    part.put_slice(header.as_bytes());
    part.put_slice(image);
    part.put_slice(b"\r\n");
    part.freeze()
}

/// Wrap JPEG bytes in a multipart block
pub fn jpeg_part(jpeg: &[u8]) -> Bytes {
    encode_part("image/jpeg", jpeg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_is_byte_exact() {
        let part = jpeg_part(&[0xFF, 0xD8, 0xFF, 0xD9]);
        let mut expected = b"--boundary\r\nContent-Type: image/jpeg\r\nContent-Length: 4\r\n\r\n".to_vec();
        expected.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xD9]);
        expected.extend_from_slice(b"\r\n");
        assert_eq!(&part[..], &expected[..]);
    }

    #[test]
    fn test_content_type_names_boundary() {
        assert!(STREAM_CONTENT_TYPE.ends_with(&format!("boundary={}", BOUNDARY)));
    }

    #[test]
    fn test_empty_image() {
        let part = jpeg_part(&[]);
        assert!(part.ends_with(b"Content-Length: 0\r\n\r\n\r\n"));
    }
}
