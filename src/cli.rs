//! Filesystem side of the `sealbox` binary: reading inputs, writing outputs
//! atomically, and turning a finished batch into an exit status.
//!
//! Outputs never replace an existing file unless the caller opts in; a
//! refused or failed write leaves no partial file behind.

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::batch::{BatchItem, BatchOutcome, BatchSummary};
use crate::metadata::extension_of;

/// MIME type recorded when the extension is not recognised.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Best-effort MIME type from a file name's extension.
pub fn guess_content_type(name: &str) -> &'static str {
    match extension_of(name).as_str() {
        "txt" | "log"    => "text/plain",
        "md"             => "text/markdown",
        "csv"            => "text/csv",
        "html" | "htm"   => "text/html",
        "css"            => "text/css",
        "js"             => "text/javascript",
        "json"           => "application/json",
        "xml"            => "application/xml",
        "pdf"            => "application/pdf",
        "zip"            => "application/zip",
        "gz"             => "application/gzip",
        "tar"            => "application/x-tar",
        "doc"            => "application/msword",
        "docx"           => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx"           => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "png"            => "image/png",
        "jpg" | "jpeg"   => "image/jpeg",
        "gif"            => "image/gif",
        "webp"           => "image/webp",
        "svg"            => "image/svg+xml",
        "mp3"            => "audio/mpeg",
        "wav"            => "audio/wav",
        "mp4"            => "video/mp4",
        "webm"           => "video/webm",
        _                => DEFAULT_CONTENT_TYPE,
    }
}

/// Read every input into a [`BatchItem`].  `content_type` overrides the
/// per-file guess when given.
pub fn read_inputs(paths: &[PathBuf], content_type: Option<&str>) -> Result<Vec<BatchItem>> {
    paths
        .iter()
        .map(|path| {
            let content = std::fs::read(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let name = path
                .file_name()
                .with_context(|| format!("{} has no file name", path.display()))?
                .to_string_lossy()
                .into_owned();
            let mime = content_type.unwrap_or_else(|| guess_content_type(&name));
            Ok(BatchItem::new(name, mime, content))
        })
        .collect()
}

/// Write each successful outcome into `output_dir`, report failures, and
/// fail if any file failed, was skipped, or could not be written.
///
/// Returns the paths written, in input order.
pub fn finish(
    outcomes:   &[BatchOutcome],
    output_dir: &Path,
    overwrite:  bool,
    verb:       &str,
) -> Result<Vec<PathBuf>> {
    if !output_dir.exists() {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("creating {}", output_dir.display()))?;
    }
    let mut written = Vec::new();
    let mut write_errors = 0usize;
    for outcome in outcomes {
        match &outcome.result {
            Ok(out) => {
                let dest = output_dir.join(&out.name);
                match write_atomic(&dest, &out.bytes, overwrite) {
                    Ok(()) => {
                        println!("  {verb}  {} → {}", outcome.name, dest.display());
                        written.push(dest);
                    }
                    Err(e) => {
                        eprintln!("  failed  {}: {e:#}", outcome.name);
                        write_errors += 1;
                    }
                }
            }
            Err(e) => eprintln!("  failed  {}: {e}", outcome.name),
        }
    }
    let summary = BatchSummary::from(outcomes);
    let failed = summary.failed + write_errors;
    if failed > 0 || summary.cancelled > 0 {
        bail!(
            "{} of {} file(s) failed, {} skipped",
            failed,
            outcomes.len(),
            summary.cancelled
        );
    }
    Ok(written)
}

/// Write via a temp file in the destination directory so a failure never
/// leaves a partial output behind.  Refuses to replace `dest` unless
/// `overwrite` is set.
pub fn write_atomic(dest: &Path, data: &[u8], overwrite: bool) -> Result<()> {
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".sealbox-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .with_context(|| format!("creating temp file in {}", parent.display()))?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    let persisted = if overwrite {
        tmp.persist(dest)
    } else {
        tmp.persist_noclobber(dest)
    };
    match persisted {
        Ok(_) => Ok(()),
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
            bail!("{} already exists (use --force to overwrite)", dest.display())
        }
        Err(e) => Err(e.error).with_context(|| format!("writing {}", dest.display())),
    }
}
