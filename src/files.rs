//! The static content store backing the default responder.
//!
//! Answers metadata queries against the content root: existence, byte
//! length, content type by file extension, and a content hash that is
//! stable per (uri, size, modification time) - the token the rule engine
//! compares conditional requests against.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

/// Common file extensions mapped to content types. Lookup uses the suffix
/// starting at the first dot in the URI, so ".tar.gz" is looked up whole.
const CONTENT_TYPES: &[(&str, &str)] = &[
    (".bmp", "image/bmp"),
    (".css", "text/css"),
    (".doc", "application/msword"),
    (".gz", "application/x-gzip"),
    (".gzip", "application/x-gzip"),
    (".htm", "text/html"),
    (".html", "text/html"),
    (".ico", "image/x-icon"),
    (".jfif", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".jpg", "image/jpeg"),
    (".js", "application/javascript"),
    (".json", "application/json"),
    (".mid", "application/x-midi"),
    (".midi", "application/x-midi"),
    (".mov", "video/quicktime"),
    (".mp3", "audio/mpeg3"),
    (".mpeg", "video/mpeg"),
    (".pdf", "application/pdf"),
    (".png", "image/png"),
    (".ps", "application/postscript"),
    (".rtf", "application/rtf"),
    (".shtml", "text/html"),
    (".tif", "image/tiff"),
    (".tiff", "image/tiff"),
    (".txt", "text/plain"),
    (".wav", "audio/wav"),
    (".xml", "application/xml"),
    (".zip", "application/x-compressed"),
];

pub struct FileStore {
    root: PathBuf,
    content_types: HashMap<&'static str, &'static str>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        tracing::debug!("content root is {}", root.display());
        Self {
            root,
            content_types: CONTENT_TYPES.iter().copied().collect(),
        }
    }

    /// True when the URI names a regular file under the root. Directories
    /// are not served.
    pub fn exists(&self, uri: &str) -> bool {
        self.resolve(uri).is_file()
    }

    pub fn length(&self, uri: &str) -> u64 {
        self.resolve(uri)
            .metadata()
            .map(|meta| meta.len())
            .unwrap_or(0)
    }

    /// Content type for a URI, by extension; "text/plain" when the
    /// extension is unknown or there is no dot at all.
    pub fn content_type(&self, uri: &str) -> &'static str {
        uri.find('.')
            .and_then(|dot| self.content_types.get(&uri[dot..]).copied())
            .unwrap_or("text/plain")
    }

    /// An opaque hash over (uri, length, mtime). Two requests for the same
    /// unchanged file see the same token; touching the file changes it.
    pub fn hash(&self, uri: &str) -> String {
        let (length, modified) = match self.resolve(uri).metadata() {
            Ok(meta) => {
                let modified = meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_millis())
                    .unwrap_or(0);
                (meta.len(), modified)
            }
            Err(_) => (0, 0),
        };

        let mut hasher = DefaultHasher::new();
        (uri, length, modified).hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }

    /// Filesystem path for a URI, for the writer to open at send time.
    pub fn path(&self, uri: &str) -> PathBuf {
        self.resolve(uri)
    }

    fn resolve(&self, uri: &str) -> PathBuf {
        self.root.join(uri.trim_start_matches('/'))
    }
}
