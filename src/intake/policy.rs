use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use super::blob::Blob;

pub const DEFAULT_MAX_SIZE: u64 = 20 * 1024 * 1024;

/// Why the drop mechanism refused a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("file type {mime} is not accepted")]
    FileInvalidType { mime: String },

    #[error("file is larger than {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("too many files")]
    TooManyFiles,

    #[error("uploads are disabled")]
    Disabled,
}

impl Rejection {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::FileInvalidType { .. } => "file-invalid-type",
            Self::FileTooLarge { .. } => "file-too-large",
            Self::TooManyFiles => "too-many-files",
            Self::Disabled => "disabled",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectedFile {
    pub name: String,
    pub code: &'static str,
    pub message: String,
}

impl RejectedFile {
    fn new(blob: &Blob, why: &Rejection) -> Self {
        Self {
            name: blob.name().to_string(),
            code: why.code(),
            message: why.to_string(),
        }
    }
}

/// Outcome of a drop: what goes on to `add_files`, and what was refused.
#[derive(Debug, Default)]
pub struct Dropped {
    pub accepted: Vec<Blob>,
    pub rejected: Vec<RejectedFile>,
}

/// Accept rules of the drop/pick surface.
#[derive(Debug, Clone)]
pub struct AcceptPolicy {
    /// MIME pattern (`image/*`, `application/pdf`) -> allowed extensions.
    pub accept: BTreeMap<String, Vec<String>>,
    pub max_size: u64,
    pub max_files: usize,
    pub disabled: bool,
    pub multiple: bool,
}

impl Default for AcceptPolicy {
    fn default() -> Self {
        let exts = |xs: &[&str]| xs.iter().map(ToString::to_string).collect::<Vec<_>>();
        let mut accept = BTreeMap::new();
        accept.insert(
            "image/*".to_string(),
            exts(&[".jpeg", ".jpg", ".png", ".gif", ".webp"]),
        );
        accept.insert("application/pdf".to_string(), exts(&[".pdf"]));
        Self {
            accept,
            max_size: DEFAULT_MAX_SIZE,
            max_files: 1,
            disabled: false,
            multiple: true,
        }
    }
}

fn mime_matches(pattern: &str, mime: &str) -> bool {
    let mime = mime.trim().to_ascii_lowercase();
    let pattern = pattern.trim().to_ascii_lowercase();
    pattern.strip_suffix("/*").map_or_else(
        || mime == pattern,
        |major| mime.split('/').next() == Some(major),
    )
}

impl AcceptPolicy {
    #[must_use]
    pub const fn is_disabled(&self, current_len: usize) -> bool {
        self.disabled || current_len >= self.max_files
    }

    fn type_allowed(&self, name: &str, mime: &str) -> bool {
        if self.accept.keys().any(|p| mime_matches(p, mime)) {
            return true;
        }
        let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let dotted = format!(".{}", ext.to_ascii_lowercase());
        self.accept
            .values()
            .flatten()
            .any(|e| e.eq_ignore_ascii_case(&dotted))
    }

    /// # Errors
    ///
    /// Returns the first rule the candidate breaks.
    pub fn check(&self, name: &str, mime: &str, size: u64) -> Result<(), Rejection> {
        if !self.type_allowed(name, mime) {
            return Err(Rejection::FileInvalidType {
                mime: mime.to_string(),
            });
        }
        if size > self.max_size {
            return Err(Rejection::FileTooLarge {
                size,
                max: self.max_size,
            });
        }
        Ok(())
    }

    /// Split a drop into accepted and rejected candidates.
    /// The count cap is left to the controller, which truncates silently.
    #[must_use]
    pub fn sort(&self, candidates: Vec<Blob>, current_len: usize) -> Dropped {
        let mut out = Dropped::default();

        let blanket = if self.is_disabled(current_len) {
            Some(Rejection::Disabled)
        } else if !self.multiple && candidates.len() > 1 {
            Some(Rejection::TooManyFiles)
        } else {
            None
        };
        if let Some(why) = blanket {
            out.rejected = candidates.iter().map(|b| RejectedFile::new(b, &why)).collect();
            return out;
        }

        for blob in candidates {
            match self.check(blob.name(), blob.mime(), blob.size()) {
                Ok(()) => out.accepted.push(blob),
                Err(why) => {
                    tracing::debug!(name = %blob.name(), code = why.code(), "candidate rejected");
                    out.rejected.push(RejectedFile::new(&blob, &why));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(name: &str, mime: &str, len: usize) -> Blob {
        Blob::new(name, mime, vec![0u8; len])
    }

    #[test]
    fn wildcard_and_exact_patterns() {
        let p = AcceptPolicy::default();
        assert!(p.check("a.png", "image/png", 10).is_ok());
        assert!(p.check("a.heic", "image/heic", 10).is_ok());
        assert!(p.check("doc.pdf", "application/pdf", 10).is_ok());
        assert_eq!(
            p.check("a.txt", "text/plain", 10),
            Err(Rejection::FileInvalidType {
                mime: "text/plain".into()
            })
        );
    }

    #[test]
    fn extension_rescues_generic_mime() {
        let p = AcceptPolicy::default();
        assert!(p.check("scan.PDF", "application/octet-stream", 1).is_ok());
        assert!(p.check("noext", "application/octet-stream", 1).is_err());
    }

    #[test]
    fn size_ceiling_is_inclusive() {
        let p = AcceptPolicy {
            max_size: 4,
            ..AcceptPolicy::default()
        };
        assert!(p.check("a.png", "image/png", 4).is_ok());
        let err = p.check("a.png", "image/png", 5).unwrap_err();
        assert_eq!(err.code(), "file-too-large");
    }

    #[test]
    fn disabled_when_full_or_flagged() {
        let p = AcceptPolicy::default();
        assert!(!p.is_disabled(0));
        assert!(p.is_disabled(1));
        let off = AcceptPolicy {
            disabled: true,
            ..AcceptPolicy::default()
        };
        assert!(off.is_disabled(0));
    }

    #[test]
    fn sort_splits_candidates() {
        let p = AcceptPolicy {
            max_size: 8,
            max_files: 5,
            ..AcceptPolicy::default()
        };
        let dropped = p.sort(
            vec![
                blob("ok.jpg", "image/jpeg", 3),
                blob("big.png", "image/png", 9),
                blob("notes.txt", "text/plain", 1),
            ],
            0,
        );
        assert_eq!(dropped.accepted.len(), 1);
        assert_eq!(dropped.accepted[0].name(), "ok.jpg");
        let codes: Vec<_> = dropped.rejected.iter().map(|r| r.code).collect();
        assert_eq!(codes, ["file-too-large", "file-invalid-type"]);
    }

    #[test]
    fn sort_rejects_everything_when_full() {
        let p = AcceptPolicy::default();
        let dropped = p.sort(vec![blob("a.png", "image/png", 1)], 1);
        assert!(dropped.accepted.is_empty());
        assert_eq!(dropped.rejected[0].code, "disabled");
    }

    #[test]
    fn single_mode_refuses_batches() {
        let p = AcceptPolicy {
            multiple: false,
            max_files: 3,
            ..AcceptPolicy::default()
        };
        let dropped = p.sort(
            vec![blob("a.png", "image/png", 1), blob("b.png", "image/png", 1)],
            0,
        );
        assert!(dropped.accepted.is_empty());
        assert!(dropped.rejected.iter().all(|r| r.code == "too-many-files"));
    }
}
