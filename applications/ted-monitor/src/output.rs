use crate::render::{MacroKind, MacroRenderer};
use crate::snapshot::Snapshot;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Writes rendered macros as `<name>.ted` files into one directory.
pub struct OutputSink {
    dir: PathBuf,
}

impl OutputSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, kind: MacroKind) -> PathBuf {
        self.dir.join(format!("{}.ted", kind.name()))
    }

    /// Render every catalogue macro and overwrite its file. Blank renders
    /// leave the previous file in place. Returns the number of files written.
    pub async fn write_all(&self, renderer: &MacroRenderer, snapshot: &Snapshot) -> usize {
        let mut written = 0;
        for kind in MacroKind::ALL {
            let path = self.path_for(kind);
            let content = renderer.render_kind(kind, snapshot);
            if content.trim().is_empty() {
                debug!(path = %path.display(), "nothing to render; leaving file untouched");
                continue;
            }

            debug!(path = %path.display(), "generating macro output");
            match tokio::fs::write(&path, content).await {
                Ok(()) => written += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to write macro output")
                }
            }
        }
        written
    }
}
