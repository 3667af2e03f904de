use std::path::Path;

use mime::Mime;

/// Guesses the `Content-Type` and `Content-Encoding` of an upload from its
/// file name. A compression suffix (`.gz`, `.bz2`) becomes the encoding and
/// the type comes from the extension before it.
pub fn guess(path: &Path) -> (Option<Mime>, Option<&'static str>) {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.to_ascii_lowercase(),
        None => return (None, None),
    };
    let (stem, encoding) = match name.rsplit_once('.') {
        Some((stem, "gz")) => (stem, Some("gzip")),
        Some((stem, "bz2")) => (stem, Some("bzip2")),
        _ => (name.as_str(), None),
    };
    let mime = stem
        .rsplit_once('.')
        .and_then(|(_, ext)| from_extension(ext));
    (mime, encoding)
}

fn from_extension(ext: &str) -> Option<Mime> {
    let mime = match ext {
        "txt" | "text" | "log" => mime::TEXT_PLAIN,
        "html" | "htm" => mime::TEXT_HTML,
        "css" => mime::TEXT_CSS,
        "csv" => mime::TEXT_CSV,
        "xml" => mime::TEXT_XML,
        "js" => mime::APPLICATION_JAVASCRIPT,
        "json" => mime::APPLICATION_JSON,
        "pdf" => mime::APPLICATION_PDF,
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "bmp" => mime::IMAGE_BMP,
        "svg" => mime::IMAGE_SVG,
        "bin" => mime::APPLICATION_OCTET_STREAM,
        _ => return None,
    };
    Some(mime)
}
