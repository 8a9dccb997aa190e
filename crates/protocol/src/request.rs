//! Endpoint catalogue and request construction.
//!
//! Every file-manager call is an [`ApiRequest`]: an endpoint, an ordered list
//! of query pairs (repeated keys allowed, e.g. `items[]`) and an optional
//! multipart body. Percent-encoding happens once, in [`ApiRequest::url`].

use bytes::Bytes;
use url::Url;

use crate::error::{ProtocolError, Result};

/// Query key carrying the working directory on every call.
pub const WORKING_DIR: &str = "working_dir";

/// Repeated query key carrying the targeted entry names.
pub const ITEMS: &str = "items[]";

/// Multipart `type` field value for uploads.
pub const UPLOAD_TYPE: &str = "Files";

/// HTTP method used by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Remote file-manager endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Directory listing.
    JsonItems,
    /// Multipart upload.
    Upload,
    /// Delete files or folders.
    Delete,
    /// Create a folder.
    NewFolder,
    /// Rename an entry.
    Rename,
    /// Move entries to another folder.
    Move,
    /// Copy entries to another folder.
    Copy,
    /// Binary download.
    Download,
}

impl Endpoint {
    /// Path of the endpoint, relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::JsonItems => "/file-manager/jsonitems",
            Endpoint::Upload => "/file-manager/upload",
            Endpoint::Delete => "/file-manager/delete",
            Endpoint::NewFolder => "/file-manager/newfolder",
            Endpoint::Rename => "/file-manager/rename",
            Endpoint::Move => "/file-manager/domove",
            Endpoint::Copy => "/file-manager/docopy",
            Endpoint::Download => "/file-manager/download",
        }
    }

    /// HTTP method of the endpoint.
    pub fn method(self) -> Method {
        match self {
            Endpoint::Upload => Method::Post,
            _ => Method::Get,
        }
    }
}

/// A file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// File name sent with the multipart part.
    pub name: String,
    /// File content.
    pub content: Bytes,
    /// MIME type of the content, if known.
    pub mime: Option<String>,
}

impl UploadFile {
    /// Create an upload from a name and its content.
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            mime: None,
        }
    }

    /// Set the MIME type of the content.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// Request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// No body (GET endpoints).
    Empty,
    /// Multipart form with fields `upload`, `working_dir` and `type=Files`.
    Upload {
        file: UploadFile,
        working_dir: String,
    },
}

/// A fully described file-manager call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// Targeted endpoint.
    pub endpoint: Endpoint,
    /// Query pairs in wire order.
    pub query: Vec<(String, String)>,
    /// Request body.
    pub body: RequestBody,
}

impl ApiRequest {
    fn get(endpoint: Endpoint, query: Vec<(String, String)>) -> Self {
        Self {
            endpoint,
            query,
            body: RequestBody::Empty,
        }
    }

    /// `GET jsonitems?working_dir=`
    pub fn list(working_dir: &str) -> Self {
        Self::get(Endpoint::JsonItems, vec![pair(WORKING_DIR, working_dir)])
    }

    /// `POST upload` (multipart).
    pub fn upload(file: UploadFile, working_dir: &str) -> Self {
        Self {
            endpoint: Endpoint::Upload,
            query: Vec::new(),
            body: RequestBody::Upload {
                file,
                working_dir: working_dir.to_string(),
            },
        }
    }

    /// `GET delete?items[]=..&working_dir=`
    pub fn delete<S: AsRef<str>>(items: &[S], working_dir: &str) -> Self {
        let mut query = item_pairs(items);
        query.push(pair(WORKING_DIR, working_dir));
        Self::get(Endpoint::Delete, query)
    }

    /// `GET newfolder?name=&working_dir=`
    pub fn new_folder(name: &str, working_dir: &str) -> Self {
        Self::get(
            Endpoint::NewFolder,
            vec![pair("name", name), pair(WORKING_DIR, working_dir)],
        )
    }

    /// `GET rename?file=&new_name=&working_dir=`
    pub fn rename(file: &str, new_name: &str, working_dir: &str) -> Self {
        Self::get(
            Endpoint::Rename,
            vec![
                pair("file", file),
                pair("new_name", new_name),
                pair(WORKING_DIR, working_dir),
            ],
        )
    }

    /// `GET domove?items[]=..&destination=&working_dir=`
    pub fn move_items<S: AsRef<str>>(items: &[S], destination: &str, working_dir: &str) -> Self {
        Self::transfer(Endpoint::Move, items, destination, working_dir)
    }

    /// `GET docopy?items[]=..&destination=&working_dir=`
    pub fn copy_items<S: AsRef<str>>(items: &[S], destination: &str, working_dir: &str) -> Self {
        Self::transfer(Endpoint::Copy, items, destination, working_dir)
    }

    fn transfer<S: AsRef<str>>(
        endpoint: Endpoint,
        items: &[S],
        destination: &str,
        working_dir: &str,
    ) -> Self {
        let mut query = item_pairs(items);
        query.push(pair("destination", destination));
        query.push(pair(WORKING_DIR, working_dir));
        Self::get(endpoint, query)
    }

    /// `GET download?file=&working_dir=`
    pub fn download(file: &str, working_dir: &str) -> Self {
        Self::get(
            Endpoint::Download,
            vec![pair("file", file), pair(WORKING_DIR, working_dir)],
        )
    }

    /// Values of a query key, in order.
    pub fn query_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The working directory this request is scoped to.
    pub fn working_dir(&self) -> Option<&str> {
        match &self.body {
            RequestBody::Upload { working_dir, .. } => Some(working_dir.as_str()),
            RequestBody::Empty => self.query_values(WORKING_DIR).next(),
        }
    }

    /// Build the absolute URL of this request against an API base URL.
    ///
    /// The endpoint path is appended to the base path, so a base of
    /// `https://host/api` yields `https://host/api/file-manager/...`.
    ///
    /// The query is `application/x-www-form-urlencoded`, keys included: the
    /// repeated `items[]` key goes out as `items%5B%5D`, which form decoders
    /// (PHP, Laravel) read back as the `items` array.
    pub fn url(&self, base: &Url) -> Result<Url> {
        if base.cannot_be_a_base() {
            return Err(ProtocolError::InvalidUrl(format!(
                "{} cannot be used as an API base",
                base
            )));
        }
        let mut url = base.clone();
        let path = format!("{}{}", base.path().trim_end_matches('/'), self.endpoint.path());
        url.set_path(&path);
        url.set_fragment(None);
        if self.query.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(&self.query);
        }
        Ok(url)
    }
}

fn pair(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}

fn item_pairs<S: AsRef<str>>(items: &[S]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|item| pair(ITEMS, item.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://admin.moo.example/api").unwrap()
    }

    #[test]
    fn test_endpoint_paths_and_methods() {
        assert_eq!(Endpoint::JsonItems.path(), "/file-manager/jsonitems");
        assert_eq!(Endpoint::Move.path(), "/file-manager/domove");
        assert_eq!(Endpoint::Copy.path(), "/file-manager/docopy");
        assert_eq!(Endpoint::Upload.method(), Method::Post);
        assert_eq!(Endpoint::Delete.method(), Method::Get);
    }

    #[test]
    fn test_list_url() {
        let url = ApiRequest::list("/photos").url(&base()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://admin.moo.example/api/file-manager/jsonitems?working_dir=%2Fphotos"
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let base = Url::parse("http://localhost:8000/").unwrap();
        let url = ApiRequest::list("/").url(&base).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/file-manager/jsonitems?working_dir=%2F"
        );
    }

    #[test]
    fn test_delete_repeats_items_and_encodes_names() {
        let request = ApiRequest::delete(&["a b.txt", "c&d.png"], "/menus");
        let items: Vec<&str> = request.query_values(ITEMS).collect();
        assert_eq!(items, vec!["a b.txt", "c&d.png"]);

        let url = request.url(&base()).unwrap();
        assert_eq!(
            url.query(),
            Some("items%5B%5D=a+b.txt&items%5B%5D=c%26d.png&working_dir=%2Fmenus")
        );
    }

    #[test]
    fn test_item_keys_decode_to_array_syntax() {
        let request = ApiRequest::move_items(&["x.png", "y.png"], "/archive", "/photos");
        let url = request.url(&base()).unwrap();

        let keys: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
        assert_eq!(keys, vec!["items[]", "items[]", "destination", "working_dir"]);
    }

    #[test]
    fn test_url_rejects_non_base() {
        let base = Url::parse("mailto:chef@moo.example").unwrap();
        let err = ApiRequest::list("/").url(&base).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidUrl(_)));
    }

    #[test]
    fn test_rename_query() {
        let request = ApiRequest::rename("old.png", "new.png", "/");
        assert_eq!(
            request.query,
            vec![
                ("file".to_string(), "old.png".to_string()),
                ("new_name".to_string(), "new.png".to_string()),
                ("working_dir".to_string(), "/".to_string()),
            ]
        );
    }

    #[test]
    fn test_move_and_copy_queries() {
        let mv = ApiRequest::move_items(&["x"], "/dest", "/src");
        assert_eq!(mv.endpoint, Endpoint::Move);
        assert_eq!(mv.query_values("destination").next(), Some("/dest"));
        assert_eq!(mv.working_dir(), Some("/src"));

        let cp = ApiRequest::copy_items(&["x", "y"], "/dest", "/src");
        assert_eq!(cp.endpoint, Endpoint::Copy);
        assert_eq!(cp.query_values(ITEMS).count(), 2);
    }

    #[test]
    fn test_upload_body() {
        let request = ApiRequest::upload(UploadFile::new("menu.pdf", b"%PDF".to_vec()), "/menus");
        assert!(request.query.is_empty());
        assert_eq!(request.working_dir(), Some("/menus"));
        let url = request.url(&base()).unwrap();
        assert_eq!(url.query(), None);
        match request.body {
            RequestBody::Upload { file, .. } => {
                assert_eq!(file.name, "menu.pdf");
                assert_eq!(&file.content[..], b"%PDF");
            }
            RequestBody::Empty => panic!("expected multipart body"),
        }
    }

    #[test]
    fn test_download_and_new_folder() {
        let dl = ApiRequest::download("steak.jpg", "/photos");
        assert_eq!(dl.query_values("file").next(), Some("steak.jpg"));

        let nf = ApiRequest::new_folder("2024", "/photos");
        assert_eq!(nf.query_values("name").next(), Some("2024"));
        assert_eq!(nf.working_dir(), Some("/photos"));
    }
}
