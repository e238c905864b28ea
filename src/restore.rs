//! Round-trip restoration of hub-only fields
//!
//! After a spoke object is mapped up to the hub, the fields the spoke cannot
//! express are sitting at their zero value. A [`PreservedField`] knows how to
//! copy one such field out of the hub object decoded from the side channel.
//!
//! Restoration is targeted: fields the spoke *can* express keep whatever came
//! through the live mapping, since that reflects the caller's current edits.

use std::fmt;

/// One hub field that a spoke version has no representation for
pub struct PreservedField<H> {
    /// JSON path of the field in the hub object (e.g. "spec.image.computeGallery")
    pub path: &'static str,
    restore: fn(&H, &mut H) -> bool,
}

impl<H> PreservedField<H> {
    /// `restore` copies the field from its first argument into its second when
    /// it is set there, and reports whether it did.
    pub const fn new(path: &'static str, restore: fn(&H, &mut H) -> bool) -> Self {
        Self { path, restore }
    }

    /// Copy this field from `decoded` into `dest` if it is set in `decoded`
    pub fn apply(&self, decoded: &H, dest: &mut H) -> bool {
        (self.restore)(decoded, dest)
    }

    /// Whether a JSON path lies at or below this field
    pub fn covers(&self, path: &str) -> bool {
        match path.strip_prefix(self.path) {
            Some(rest) => rest.is_empty() || rest.starts_with('.') || rest.starts_with('['),
            None => false,
        }
    }
}

impl<H> fmt::Debug for PreservedField<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreservedField").field("path", &self.path).finish()
    }
}

/// Restore every field of `fields` from `decoded` into `dest`.
///
/// Returns the paths that were actually copied.
pub fn restore<H>(decoded: &H, dest: &mut H, fields: &[PreservedField<H>]) -> Vec<&'static str> {
    fields
        .iter()
        .filter_map(|field| field.apply(decoded, dest).then_some(field.path))
        .collect()
}

/// Whether any of `fields` covers `path`
pub fn covers<H>(fields: &[PreservedField<H>], path: &str) -> bool {
    fields.iter().any(|field| field.covers(path))
}

/// Overwrite `dest` with `decoded` when `decoded` is set
pub fn restore_option<T: Clone>(decoded: &Option<T>, dest: &mut Option<T>) -> bool {
    match decoded {
        Some(value) => {
            *dest = Some(value.clone());
            true
        }
        None => false,
    }
}

/// Overwrite `dest` with `decoded` when `decoded` is non-empty
pub fn restore_vec<T: Clone>(decoded: &[T], dest: &mut Vec<T>) -> bool {
    if decoded.is_empty() {
        return false;
    }
    *dest = decoded.to_vec();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Sample {
        kept: String,
        extra: Option<String>,
        tags: Vec<String>,
    }

    fn extra(from: &Sample, to: &mut Sample) -> bool {
        restore_option(&from.extra, &mut to.extra)
    }

    fn tags(from: &Sample, to: &mut Sample) -> bool {
        restore_vec(&from.tags, &mut to.tags)
    }

    static FIELDS: &[PreservedField<Sample>] = &[
        PreservedField::new("spec.extra", extra),
        PreservedField::new("spec.tags", tags),
    ];

    #[test]
    fn test_restore_is_targeted() {
        let decoded = Sample {
            kept: "stale".to_string(),
            extra: Some("x".to_string()),
            tags: vec!["a".to_string()],
        };
        let mut dest = Sample {
            kept: "edited".to_string(),
            ..Default::default()
        };

        let restored = restore(&decoded, &mut dest, FIELDS);

        assert_eq!(restored, vec!["spec.extra", "spec.tags"]);
        assert_eq!(dest.kept, "edited");
        assert_eq!(dest.extra.as_deref(), Some("x"));
        assert_eq!(dest.tags, vec!["a".to_string()]);
    }

    #[test]
    fn test_unset_fields_leave_dest_untouched() {
        let decoded = Sample::default();
        let mut dest = Sample {
            kept: "k".to_string(),
            extra: Some("mapped".to_string()),
            tags: vec!["mapped".to_string()],
        };
        let before = dest.clone();

        assert!(restore(&decoded, &mut dest, FIELDS).is_empty());
        assert_eq!(dest, before);
    }

    #[test]
    fn test_covers_paths() {
        let field = &FIELDS[0];
        assert!(field.covers("spec.extra"));
        assert!(field.covers("spec.extra.nested"));
        assert!(field.covers("spec.extra[0]"));
        assert!(!field.covers("spec.extraneous"));
        assert!(!field.covers("spec"));
        assert!(covers(FIELDS, "spec.tags[2]"));
        assert!(!covers(FIELDS, "spec.kept"));
    }
}
