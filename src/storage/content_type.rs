use std::path::Path;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Guess MIME type based on file extension
pub fn guess_mime_type(file_path: &Path) -> Option<String> {
    // Simple MIME type mapping
    let mime_types = [
        ("txt", "text/plain"),
        ("md", "text/markdown"),
        ("csv", "text/csv"),
        ("html", "text/html"),
        ("htm", "text/html"),
        ("css", "text/css"),
        ("js", "application/javascript"),
        ("json", "application/json"),
        ("xml", "application/xml"),
        ("pdf", "application/pdf"),
        ("zip", "application/zip"),
        ("tar", "application/x-tar"),
        ("gz", "application/gzip"),
        ("jpg", "image/jpeg"),
        ("jpeg", "image/jpeg"),
        ("png", "image/png"),
        ("gif", "image/gif"),
        ("svg", "image/svg+xml"),
        ("mp3", "audio/mpeg"),
        ("mp4", "video/mp4"),
        ("avi", "video/x-msvideo"),
        ("doc", "application/msword"),
        (
            "docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ),
        ("xls", "application/vnd.ms-excel"),
        (
            "xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ),
        ("ppt", "application/vnd.ms-powerpoint"),
        (
            "pptx",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ),
    ];

    file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .and_then(|ext| {
            mime_types
                .iter()
                .find(|(extension, _)| *extension == ext)
                .map(|(_, mime_type)| *mime_type)
        })
        .map(|mime_type| mime_type.to_string())
}

/// Content type sent with an upload of `file_path`
pub fn detect_content_type(file_path: &Path) -> String {
    guess_mime_type(file_path).unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}
