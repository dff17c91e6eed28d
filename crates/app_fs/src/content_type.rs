//! Best-effort content type detection

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Fallback when nothing better is known
pub const OCTET_STREAM: &str = "application/octet-stream";

const SNIFF_LEN: usize = 512;

/// (magic prefix, mime type)
const MAGIC: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xFF\xD8\xFF", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"BM", "image/bmp"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1F\x8B", "application/gzip"),
    (b"7z\xBC\xAF\x27\x1C", "application/x-7z-compressed"),
    (b"Rar!\x1A\x07", "application/vnd.rar"),
    (b"OggS", "audio/ogg"),
    (b"ID3", "audio/mpeg"),
];

/// Detect a file's content type
///
/// Tries the extension first, then sniffs the leading bytes. Never fails:
/// unreadable or unknown content is reported as `application/octet-stream`.
pub fn detect_content_type(path: &Path) -> String {
    if let Some(mime) = mime_guess::from_path(path).first() {
        return mime.essence_str().to_string();
    }

    match read_head(path) {
        Some(head) => sniff(&head).to_string(),
        None => OCTET_STREAM.to_string(),
    }
}

fn read_head(path: &Path) -> Option<Vec<u8>> {
    let mut file = File::open(path).ok()?;
    let mut head = vec![0u8; SNIFF_LEN];
    let mut filled = 0;

    while filled < SNIFF_LEN {
        match file.read(&mut head[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => return None,
        }
    }

    head.truncate(filled);
    Some(head)
}

fn sniff(head: &[u8]) -> &'static str {
    for (magic, mime) in MAGIC {
        if head.starts_with(magic) {
            return *mime;
        }
    }

    if head.len() >= 12 && &head[4..8] == b"ftyp" {
        return "video/mp4";
    }
    if head.len() >= 12 && head.starts_with(b"RIFF") && &head[8..12] == b"WEBP" {
        return "image/webp";
    }

    if looks_like_text(head) {
        return "text/plain";
    }

    OCTET_STREAM
}

fn looks_like_text(head: &[u8]) -> bool {
    if head.is_empty() {
        return false;
    }

    // A cut multi-byte sequence at the sniff boundary is still text
    let text = match std::str::from_utf8(head) {
        Ok(s) => s,
        Err(e) if e.error_len().is_none() => match std::str::from_utf8(&head[..e.valid_up_to()]) {
            Ok(s) => s,
            Err(_) => return false,
        },
        Err(_) => return false,
    };

    !text
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t' | '\x0C'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_extension_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"\x89PNG\r\n\x1a\n").unwrap();
        assert_eq!(detect_content_type(&path), "text/plain");
    }

    #[test]
    fn test_sniffs_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("image");
        fs::write(&png, b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR").unwrap();
        assert_eq!(detect_content_type(&png), "image/png");

        let text = dir.path().join("README");
        fs::write(&text, "plain words\n").unwrap();
        assert_eq!(detect_content_type(&text), "text/plain");
    }

    #[test]
    fn test_fails_open_to_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let blob = dir.path().join("blob");
        fs::write(&blob, [0u8, 1, 2, 3, 0xFE]).unwrap();
        assert_eq!(detect_content_type(&blob), OCTET_STREAM);

        let empty = dir.path().join("empty");
        fs::write(&empty, b"").unwrap();
        assert_eq!(detect_content_type(&empty), OCTET_STREAM);

        assert_eq!(detect_content_type(&dir.path().join("missing")), OCTET_STREAM);
    }
}
