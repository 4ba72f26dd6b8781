use anyhow::{anyhow, Context};
use domain::ports::TextExtractor;
use memmap2::Mmap;
use rayon::prelude::*;
use shared::types::Result;
use shared::utils::{file_name_lossy, is_pdf_file};
use std::fs::File;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

/// A PDF found under `<reports root>/<company>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    pub company: String,
    pub file_name: String,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct ReportScan {
    pub report: ReportFile,
    pub text: Result<String>,
}

pub struct ReportScanner {
    root_path: PathBuf,
}

impl ReportScanner {
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Every immediate subdirectory is a company; every PDF inside it is one of its reports.
    /// Sorted by company then file name. A missing root is created empty.
    pub fn collect_reports(&self) -> Result<Vec<ReportFile>> {
        if !self.root_path.exists() {
            std::fs::create_dir_all(&self.root_path).with_context(|| {
                format!("failed to create reports directory {}", self.root_path.display())
            })?;
            return Ok(Vec::new());
        }

        let mut reports = Vec::new();
        for entry in std::fs::read_dir(&self.root_path)
            .with_context(|| format!("failed to read {}", self.root_path.display()))?
        {
            let company_dir = entry?.path();
            if !company_dir.is_dir() {
                continue;
            }
            let company = file_name_lossy(&company_dir);
            for file in std::fs::read_dir(&company_dir)? {
                let path = file?.path();
                if is_pdf_file(&path) {
                    reports.push(ReportFile {
                        company: company.clone(),
                        file_name: file_name_lossy(&path),
                        path,
                    });
                }
            }
        }
        reports.sort_by(|a, b| {
            (a.company.as_str(), a.file_name.as_str()).cmp(&(b.company.as_str(), b.file_name.as_str()))
        });
        Ok(reports)
    }

    /// Extract every report in parallel; failures stay attached to their report.
    pub fn scan_reports(
        reports: &[ReportFile],
        extractor: &dyn TextExtractor,
    ) -> Vec<ReportScan> {
        tracing::info!("Extracting text from {} reports...", reports.len());
        reports
            .par_iter()
            .map(|report| ReportScan {
                report: report.clone(),
                text: extractor.extract_text(&report.path),
            })
            .collect()
    }
}

/// `pdf-extract` over a memory-mapped file.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String> {
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let mmap = unsafe { Mmap::map(&file)? };
        // pdf-extract panics on some malformed documents.
        let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(&mmap)
        }))
        .map_err(|_| anyhow!("PDF parser panicked on {}", path.display()))?;
        extracted.map_err(|e| anyhow!("failed to parse {}: {e:?}", path.display()))
    }
}
