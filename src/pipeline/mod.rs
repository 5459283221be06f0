//! Pipeline stages for first-page author extraction.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested alone and the two I/O stages can be swapped for fixtures.
//!
//! ## Data Flow
//!
//! ```text
//! render ──▶ encode ──▶ gateway ──▶ sanitize ──▶ mapper
//! (pdfium)   (PNG/b64)  (VLM)       (fences)     (JSON → AuthorRecord)
//! ```
//!
//! 1. [`render`]:   rasterise page 1; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 2. [`encode`]:   PNG-encode the page and wrap it as a base64 data URI
//! 3. [`gateway`]:  the only stage with network I/O; no retries
//! 4. [`sanitize`]: strip Markdown fences from the reply
//! 5. [`mapper`]:   parse `{"authors": [...]}` and build typed records

pub mod encode;
pub mod gateway;
pub mod mapper;
pub mod render;
pub mod sanitize;
