//! Filing processed documents under `<root>/<region>/<company>_<doctype><ext>`

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{BizsheetError, Result};

/// Folder used when the region is unknown
pub const FALLBACK_REGION: &str = "기타";

const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Make a company name usable as a file name
pub fn sanitize_name(name: &str) -> String {
    name.replace('㈜', "(주)")
        .chars()
        .filter(|c| !FORBIDDEN.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// First word of the region, or the fallback folder
pub fn region_folder(region: Option<&str>) -> String {
    region
        .and_then(|r| r.split_whitespace().next())
        .map(sanitize_name)
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| FALLBACK_REGION.to_string())
}

/// `{company}_{doctype}{.ext}` with the extension of `source`
pub fn archive_file_name(company: &str, doc_type: &str, source: &Path) -> String {
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    format!("{}_{}{}", sanitize_name(company), doc_type, ext)
}

/// First free path for `file_name` in `dir`, adding ` (1)`, ` (2)`, ... before
/// the extension
pub fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match file_name.rfind('.') {
        Some(pos) if pos > 0 => file_name.split_at(pos),
        _ => (file_name, ""),
    };
    (1..)
        .map(|n| dir.join(format!("{} ({}){}", stem, n, ext)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Only a move across filesystems is retried as copy and remove
fn needs_copy(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices
}

fn move_file(source: &Path, target: &Path) -> io::Result<()> {
    match fs::rename(source, target) {
        Err(e) if needs_copy(&e) => {
            fs::copy(source, target)?;
            fs::remove_file(source)
        }
        other => other,
    }
}

/// Move `source` into `dir` under a collision-free `file_name`
pub fn move_unique(source: &Path, dir: &Path, file_name: &str) -> Result<PathBuf> {
    if !source.is_file() {
        return Err(BizsheetError::archive(source, "source file does not exist"));
    }
    fs::create_dir_all(dir).map_err(|e| BizsheetError::archive(source, e))?;
    let target = unique_destination(dir, file_name);
    move_file(source, &target).map_err(|e| BizsheetError::archive(source, e))?;
    tracing::info!(from = %source.display(), to = %target.display(), "document archived");
    Ok(target)
}

/// File `source` under `root/<region>/<company>_<doc_type><ext>`.
///
/// Returns the final path.
pub fn archive(
    source: &Path,
    root: &Path,
    company: &str,
    doc_type: &str,
    region: Option<&str>,
) -> Result<PathBuf> {
    if sanitize_name(company).is_empty() {
        return Err(BizsheetError::archive(source, "company name is empty"));
    }
    let dir = root.join(region_folder(region));
    move_unique(source, &dir, &archive_file_name(company, doc_type, source))
}
