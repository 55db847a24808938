use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::process::Command;

use covenant_core::config::OcrConfig;
use covenant_core::error::{CovenantError, Result};

/// Recognizes the text of every page of a PDF from its rendered pixels.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;
    async fn recognize(&self, pdf_bytes: &[u8]) -> Result<String>;
}

/// OCR through the Poppler `pdftoppm` rasterizer and the `tesseract` CLI.
///
/// Child processes are spawned with `kill_on_drop`, so dropping the
/// `recognize` future (request cancelled, timeout elapsed) terminates them.
pub struct TesseractOcr {
    pdftoppm_bin: String,
    tesseract_bin: String,
    language: String,
    dpi: u32,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            pdftoppm_bin: config.pdftoppm_bin.clone(),
            tesseract_bin: config.tesseract_bin.clone(),
            language: config.language.clone(),
            dpi: config.dpi,
        }
    }

    async fn run(bin: &str, args: &[&str]) -> Result<Output> {
        let output = Command::new(bin)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CovenantError::OcrUnavailable(format!("`{bin}` is not installed"))
                } else {
                    CovenantError::Ocr(format!("failed to spawn `{bin}`: {e}"))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CovenantError::Ocr(format!(
                "`{bin}` exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(output)
    }

    async fn rasterize(&self, pdf_path: &Path, work_dir: &Path) -> Result<Vec<PathBuf>> {
        let prefix = work_dir.join("page");
        let dpi = self.dpi.to_string();
        Self::run(
            &self.pdftoppm_bin,
            &[
                "-r",
                &dpi,
                "-png",
                &pdf_path.to_string_lossy(),
                &prefix.to_string_lossy(),
            ],
        )
        .await?;

        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(work_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(number) = page_number(&path) {
                pages.push((number, path));
            }
        }
        pages.sort_by_key(|(number, _)| *number);

        Ok(pages.into_iter().map(|(_, path)| path).collect())
    }

    async fn recognize_page(&self, image: &Path) -> Result<String> {
        let output = Self::run(
            &self.tesseract_bin,
            &[&image.to_string_lossy(), "stdout", "-l", &self.language],
        )
        .await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Page number of a `pdftoppm` output file (`page-1.png`, `page-001.png`).
fn page_number(path: &Path) -> Option<u32> {
    if path.extension()?.to_str()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (prefix, number) = stem.rsplit_once('-')?;
    if prefix != "page" {
        return None;
    }
    number.parse().ok()
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, pdf_bytes: &[u8]) -> Result<String> {
        let work_dir = tempfile::tempdir()?;
        let pdf_path = work_dir.path().join("input.pdf");
        tokio::fs::write(&pdf_path, pdf_bytes).await?;

        let pages = self.rasterize(&pdf_path, work_dir.path()).await?;
        if pages.is_empty() {
            return Err(CovenantError::Ocr("rasterizer produced no pages".into()));
        }

        tracing::debug!(pages = pages.len(), dpi = self.dpi, "Rasterized PDF for OCR");

        let mut texts = Vec::with_capacity(pages.len());
        for (i, page) in pages.iter().enumerate() {
            let text = self.recognize_page(page).await?;
            tracing::debug!(page = i + 1, chars = text.len(), "Recognized page");
            texts.push(text.trim().to_string());
        }

        Ok(texts.join("\n\n"))
    }
}
