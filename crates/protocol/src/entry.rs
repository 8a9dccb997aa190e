//! File and folder records returned by the listing endpoint.

use serde::{Deserialize, Deserializer, Serialize};

/// One file or folder in a remote directory listing.
///
/// Entries are immutable snapshots; `name` is unique within the parent
/// directory and is what every mutating endpoint addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Public URL of the entry.
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    /// Last modified timestamp (unix seconds).
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: i64,
    /// Icon / type classifier chosen by the backend (e.g. `fa-folder`, `fa-image`).
    #[serde(default, deserialize_with = "null_as_default")]
    pub icon: String,
    /// Whether this is a file (false for folders).
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_file: bool,
    /// Whether this is an image the backend can thumbnail.
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_image: bool,
    /// Thumbnail URL for images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    /// Size, when the backend reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<EntrySize>,
}

/// Entry size as reported by the backend: either a byte count or a
/// preformatted string such as `"12.4 kB"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntrySize {
    Bytes(u64),
    Text(String),
}

/// Coarse classification of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Folder,
    Image,
    File,
}

impl FileEntry {
    /// Classify the entry.
    pub fn kind(&self) -> EntryKind {
        if !self.is_file {
            EntryKind::Folder
        } else if self.is_image {
            EntryKind::Image
        } else {
            EntryKind::File
        }
    }

    /// Whether this entry is a folder.
    pub fn is_folder(&self) -> bool {
        !self.is_file
    }

    /// Size formatted for display, or `None` when unknown.
    pub fn display_size(&self) -> Option<String> {
        match self.size.as_ref()? {
            EntrySize::Bytes(bytes) => Some(format_bytes(*bytes)),
            EntrySize::Text(text) => Some(text.clone()),
        }
    }
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Format a byte count with binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Body of `GET /file-manager/jsonitems`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListingResponse {
    /// Entries of the requested directory, in backend order.
    pub items: Vec<FileEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_entry() {
        let json = r#"{
            "name": "steak.jpg",
            "url": "https://cdn.example.com/storage/files/steak.jpg",
            "time": 1704067200,
            "icon": "fa-image",
            "is_file": true,
            "is_image": true,
            "thumb_url": "https://cdn.example.com/storage/files/thumbs/steak.jpg"
        }"#;
        let entry: FileEntry = serde_json::from_str(json).unwrap();

        assert_eq!(entry.name, "steak.jpg");
        assert_eq!(entry.time, 1704067200);
        assert_eq!(entry.kind(), EntryKind::Image);
        assert!(entry.thumb_url.is_some());
        assert!(entry.size.is_none());
    }

    #[test]
    fn test_folder_entry_with_missing_fields() {
        let json = r#"{"name": "menus", "is_file": false}"#;
        let entry: FileEntry = serde_json::from_str(json).unwrap();

        assert!(entry.is_folder());
        assert_eq!(entry.kind(), EntryKind::Folder);
        assert_eq!(entry.url, "");
        assert_eq!(entry.display_size(), None);
    }

    #[test]
    fn test_null_fields_fall_back_to_defaults() {
        let json = r#"{"name": "old.txt", "url": null, "time": null, "icon": null, "is_file": true, "is_image": null}"#;
        let entry: FileEntry = serde_json::from_str(json).unwrap();

        assert_eq!(entry.time, 0);
        assert_eq!(entry.url, "");
        assert_eq!(entry.icon, "");
        assert!(!entry.is_image);
        assert_eq!(entry.kind(), EntryKind::File);
    }

    #[test]
    fn test_size_accepts_number_or_text() {
        let numeric: FileEntry =
            serde_json::from_str(r#"{"name":"a.pdf","is_file":true,"size":2048}"#).unwrap();
        assert_eq!(numeric.size, Some(EntrySize::Bytes(2048)));
        assert_eq!(numeric.display_size().as_deref(), Some("2.0 KiB"));

        let text: FileEntry =
            serde_json::from_str(r#"{"name":"b.pdf","is_file":true,"size":"12.4 kB"}"#).unwrap();
        assert_eq!(text.display_size().as_deref(), Some("12.4 kB"));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_listing_response_preserves_order() {
        let json = r#"{"items":[
            {"name":"z.txt","is_file":true},
            {"name":"a.txt","is_file":true},
            {"name":"photos","is_file":false}
        ]}"#;
        let listing: ListingResponse = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = listing.items.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["z.txt", "a.txt", "photos"]);
    }
}
