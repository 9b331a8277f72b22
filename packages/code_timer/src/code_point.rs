use std::fmt;
use std::ptr;

/// Immutable description of an instrumented source location.
///
/// Code points are identified by address, not by value: two descriptors with identical
/// fields declared at different places are different code points. Use [`code_point!`] to
/// declare one at the current source location.
///
/// [`code_point!`]: crate::code_point
#[derive(Debug)]
pub struct CodePoint {
    tag: &'static str,
    file: &'static str,
    line: u32,
}

impl CodePoint {
    /// Creates a descriptor. Intended for `static` items; see [`code_point!`][crate::code_point].
    #[must_use]
    pub const fn new(tag: &'static str, file: &'static str, line: u32) -> Self {
        Self { tag, file, line }
    }

    /// The label given to the instrumented region.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        self.tag
    }

    /// The source file containing the instrumented region.
    #[must_use]
    pub const fn file(&self) -> &'static str {
        self.file
    }

    /// The source line of the instrumented region.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// The identity of this code point.
    #[must_use]
    pub fn id(&'static self) -> CodePointId {
        CodePointId(ptr::from_ref(self).addr())
    }
}

impl fmt::Display for CodePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.tag, self.file, self.line)
    }
}

/// Identity of a `'static` [`CodePoint`], usable as a map key.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CodePointId(usize);

/// Declares a [`CodePoint`] for the current source location and evaluates to a
/// `&'static CodePoint`.
///
/// Every expansion site owns one descriptor, so evaluating the same expansion again (in a
/// loop, or on every call of a function) yields the same code point.
///
/// # Examples
///
/// ```
/// use code_timer::{CodePoint, code_point};
///
/// fn parse() -> &'static CodePoint {
///     code_point!("parse")
/// }
///
/// assert_eq!(parse().tag(), "parse");
/// assert_eq!(parse().id(), parse().id());
/// ```
#[macro_export]
macro_rules! code_point {
    ($tag:expr) => {{
        static CODE_POINT: $crate::CodePoint =
            $crate::CodePoint::new($tag, ::core::file!(), ::core::line!());
        &CODE_POINT
    }};
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(CodePoint: Send, Sync);

    fn site() -> &'static CodePoint {
        crate::code_point!("site")
    }

    #[test]
    fn macro_captures_location() {
        let cp = crate::code_point!("here");

        assert_eq!(cp.tag(), "here");
        assert!(cp.file().ends_with("code_point.rs"));
        assert!(cp.line() > 0);
    }

    #[test]
    fn same_site_is_same_identity() {
        assert_eq!(site().id(), site().id());
        assert!(ptr::eq(site(), site()));
    }

    #[test]
    fn equal_fields_at_different_sites_are_different_identities() {
        static A: CodePoint = CodePoint::new("same", "same.rs", 1);
        static B: CodePoint = CodePoint::new("same", "same.rs", 1);

        assert_ne!(A.id(), B.id());
    }

    #[test]
    fn display_shows_tag_and_location() {
        static CP: CodePoint = CodePoint::new("solve", "solver.rs", 42);

        assert_eq!(CP.to_string(), "solve (solver.rs:42)");
    }
}
