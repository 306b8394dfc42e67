use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use lpgen_core::GenerationResult;

use crate::document::{build_document, DocumentOptions};
use crate::sandbox::{embed_frame, host_page, SandboxPolicy, Viewport};

/// File name of the standalone preview document.
pub const DOCUMENT_FILE: &str = "preview.html";
/// File name of the host page containing the sandboxed frame.
pub const FRAME_FILE: &str = "frame.html";

/// A rendered preview of one completed job.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub job_id: String,
    /// Standalone document with CSS/JS inlined.
    pub document: String,
    /// `<iframe>` markup embedding [`document`](Self::document) in a sandbox.
    pub frame: String,
    pub viewport: Viewport,
    pub rendered_at: DateTime<Utc>,
}

/// Paths written by [`Preview::write_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewFiles {
    pub document: PathBuf,
    pub frame: PathBuf,
}

impl Preview {
    /// Write the standalone document and the sandboxed host page into
    /// `dir`, creating it if needed. Existing files are overwritten.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<PreviewFiles> {
        std::fs::create_dir_all(dir)?;

        let document = dir.join(DOCUMENT_FILE);
        std::fs::write(&document, &self.document)?;

        let frame = dir.join(FRAME_FILE);
        let title = format!("Preview {}", self.job_id);
        std::fs::write(&frame, host_page(&self.frame, &title))?;

        tracing::debug!(job_id = %self.job_id, dir = %dir.display(), "Preview written");
        Ok(PreviewFiles { document, frame })
    }
}

/// Builds previews with fixed document options and sandbox policy.
#[derive(Debug, Clone, Default)]
pub struct PreviewRenderer {
    options: DocumentOptions,
    policy: SandboxPolicy,
    viewport: Viewport,
}

impl PreviewRenderer {
    pub fn new(options: DocumentOptions, policy: SandboxPolicy, viewport: Viewport) -> Self {
        Self {
            options,
            policy,
            viewport,
        }
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Render a completed result. Every call produces a fresh preview;
    /// nothing from an earlier render is carried over.
    pub fn render(&self, job_id: &str, result: &GenerationResult) -> Preview {
        let document = build_document(result, &self.options);
        let frame = embed_frame(&document, &self.options.title, &self.policy, self.viewport);

        tracing::info!(
            job_id,
            document_bytes = document.len(),
            viewport = ?self.viewport,
            "Preview rendered",
        );

        Preview {
            job_id: job_id.to_string(),
            document,
            frame,
            viewport: self.viewport,
            rendered_at: Utc::now(),
        }
    }
}
