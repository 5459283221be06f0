//! First-page rasterisation via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which uses thread-local
//! state internally and is not safe to call from async contexts. Rendering is
//! moved onto tokio's blocking pool so the runtime's workers never stall.
//!
//! The document handle lives inside [`render_first_page_blocking`]; it is
//! dropped (and the file closed) on every return path, success or error.

use crate::error::RenderError;
use crate::pipeline::encode::encode_png;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Capability: turn a PDF's first page into PNG bytes.
///
/// Implemented by [`PdfiumRenderer`]; tests substitute fixtures.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render_first_page(&self, path: &Path) -> Result<Vec<u8>, RenderError>;
}

/// Renders with the pdfium shared library at a fixed magnification.
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    zoom: f32,
    library_path: Option<PathBuf>,
}

impl PdfiumRenderer {
    pub fn new(zoom: f32) -> Self {
        Self {
            zoom,
            library_path: None,
        }
    }

    /// Load pdfium from this file (or directory containing the platform library).
    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }
}

impl Default for PdfiumRenderer {
    fn default() -> Self {
        Self::new(2.0)
    }
}

#[async_trait]
impl PageRenderer for PdfiumRenderer {
    async fn render_first_page(&self, path: &Path) -> Result<Vec<u8>, RenderError> {
        let path = path.to_path_buf();
        let zoom = self.zoom;
        let library = self.library_path.clone();

        tokio::task::spawn_blocking(move || {
            render_first_page_blocking(&path, zoom, library.as_deref())
        })
        .await
        .map_err(|e| RenderError::TaskPanicked(e.to_string()))?
    }
}

/// Blocking implementation of first-page rendering.
fn render_first_page_blocking(
    pdf_path: &Path,
    zoom: f32,
    library: Option<&Path>,
) -> Result<Vec<u8>, RenderError> {
    check_pdf_header(pdf_path)?;

    let pdfium = bind_pdfium(library)?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| RenderError::Open {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    if pages.len() == 0 {
        return Err(RenderError::NoPages {
            path: pdf_path.to_path_buf(),
        });
    }

    let page = pages.get(0).map_err(|e| RenderError::Rasterise {
        path: pdf_path.to_path_buf(),
        detail: format!("{:?}", e),
    })?;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(zoom);
    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| RenderError::Rasterise {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

    let image = bitmap.as_image();
    debug!(
        "Rendered first page of {} at {}x → {}x{} px",
        pdf_path.display(),
        zoom,
        image.width(),
        image.height()
    );

    encode_png(&image).map_err(|e| RenderError::Encode(e.to_string()))
}

/// Reject missing files and non-PDFs before pdfium sees them.
fn check_pdf_header(path: &Path) -> Result<(), RenderError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RenderError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => RenderError::Open {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
    })?;

    let mut magic = Vec::with_capacity(4);
    file.take(4)
        .read_to_end(&mut magic)
        .map_err(|e| RenderError::Open {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    if magic != b"%PDF" {
        return Err(RenderError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

/// Bind pdfium: explicit path, then `PDFIUM_LIB_PATH`, then `./`, then the system library.
fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, RenderError> {
    let configured = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

    let bindings = match configured {
        Some(p) if p.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&p))
        }
        Some(p) => Pdfium::bind_to_library(&p),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| RenderError::Binding(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn missing_file_is_file_not_found() {
        let err = PdfiumRenderer::default()
            .render_first_page(Path::new("/definitely/not/here.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::FileNotFound { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn text_file_is_not_a_pdf() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"hello, world").unwrap();

        let err = PdfiumRenderer::default()
            .render_first_page(tmp.path())
            .await
            .unwrap_err();
        match err {
            RenderError::NotAPdf { magic, .. } => assert_eq!(magic, b"hell"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[test]
    fn empty_file_is_not_a_pdf() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let err = check_pdf_header(tmp.path()).unwrap_err();
        assert!(matches!(err, RenderError::NotAPdf { ref magic, .. } if magic.is_empty()));
    }

    #[test]
    fn pdf_header_is_accepted() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.7\n").unwrap();
        assert!(check_pdf_header(tmp.path()).is_ok());
    }

    #[tokio::test]
    async fn missing_pdfium_library_is_a_per_file_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.7\n").unwrap();

        let err = PdfiumRenderer::default()
            .with_library_path("/definitely/not/here/libpdfium.so")
            .render_first_page(tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Binding(_)), "got {err:?}");
    }
}
