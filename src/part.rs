//! Classification of uploaded multipart fields.

/// Field name carrying the document that drives the compilation.
pub const PRIMARY_SOURCE_PART: &str = "latex";

/// Prefix for fields carrying files the primary source may reference.
pub const AUXILIARY_PREFIX: &str = "file.";

/// What an uploaded part is, decided from its field name alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartKind {
    PrimarySource,
    /// Carries the full field name, e.g. `file.logo`.
    AuxiliaryResource(String),
    Ignored,
}

impl PartKind {
    pub fn classify(name: &str) -> Self {
        if name == PRIMARY_SOURCE_PART {
            PartKind::PrimarySource
        } else if name.starts_with(AUXILIARY_PREFIX) {
            PartKind::AuxiliaryResource(name.to_string())
        } else {
            PartKind::Ignored
        }
    }

    /// Whether the part's body should be written into the workspace.
    pub fn is_kept(&self) -> bool {
        !matches!(self, PartKind::Ignored)
    }
}

/// Reduce a client-declared filename to a bare basename.
///
/// Both `/` and `\` are treated as separators so that neither Unix nor
/// Windows style paths can climb out of the workspace. Returns `None` when
/// nothing usable is left (`""`, `"."`, `".."`, or a trailing separator).
///
/// Names starting with `-` are refused: the source name is passed to the
/// toolchain as a positional argument and must never parse as an option.
pub fn sanitize_filename(declared: &str) -> Option<&str> {
    let base = declared.rsplit(&['/', '\\'][..]).next()?;
    match base {
        "" | "." | ".." => None,
        base if base.starts_with('-') => None,
        base if base.contains('\0') => None,
        base => Some(base),
    }
}
