//! # Moo File-Manager Protocol Library
//!
//! Wire model of the remote file-manager API consumed by the Moo Beef Steak
//! Prime admin tools.
//!
//! ## Overview
//!
//! The backend exposes one endpoint family under `/file-manager/*` and answers
//! with three unrelated shapes. This crate pins all of that down without doing
//! any I/O:
//!
//! - **Entries**: [`FileEntry`] records returned by the listing endpoint
//! - **Requests**: [`ApiRequest`] builders for every endpoint, including the
//!   repeated `items[]` query encoding
//! - **Payloads**: [`Payload`], the tagged `Json | PlainText | Binary` result,
//!   with per-operation interpretation (`items`, `status:"success"`, `"OK"`)
//! - **Errors**: [`ProtocolError`] for contract violations and the normalized
//!   [`TransportError`] `{kind, http_status, message}`
//!
//! ## Endpoint contract
//!
//! ```text
//! GET  /file-manager/jsonitems?working_dir=           -> { "items": [...] }
//! POST /file-manager/upload   (upload, working_dir, type=Files) -> { "status": "success" }
//! GET  /file-manager/delete?items[]=..&working_dir=   -> "OK" | error text
//! GET  /file-manager/newfolder?name=&working_dir=     -> "OK" | error text
//! GET  /file-manager/rename?file=&new_name=&working_dir= -> "OK" | error text
//! GET  /file-manager/domove|docopy?items[]=..&destination=&working_dir= -> "OK" | error text
//! GET  /file-manager/download?file=&working_dir=      -> bytes
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use fm_protocol::{ApiRequest, Payload};
//! use bytes::Bytes;
//!
//! let request = ApiRequest::delete(&["old-menu.pdf"], "/menus");
//! let base = url::Url::parse("https://admin.example.com/api").unwrap();
//! assert!(request.url(&base).unwrap().as_str().contains("items%5B%5D=old-menu.pdf"));
//!
//! let payload = Payload::classify(Some("text/html"), Bytes::from_static(b"OK"));
//! assert!(payload.into_ok_sentinel().is_ok());
//! ```
//!
//! ## Modules
//!
//! - [`entry`]: File entries and listing response
//! - [`request`]: Endpoints and request construction
//! - [`payload`]: Response classification and interpretation
//! - [`path`]: Working-directory normalization
//! - [`error`]: Error types

pub mod entry;
pub mod error;
pub mod path;
pub mod payload;
pub mod request;

pub use entry::{format_bytes, EntryKind, EntrySize, FileEntry, ListingResponse};
pub use error::{FailureParts, ProtocolError, Result, TransportError, TransportErrorKind};
pub use payload::{Payload, PayloadKind, OK_SENTINEL, UPLOAD_SUCCESS};
pub use request::{
    ApiRequest, Endpoint, Method, RequestBody, UploadFile, ITEMS, UPLOAD_TYPE, WORKING_DIR,
};
