#![deny(clippy::all, clippy::pedantic, clippy::cargo)]

//! Case-preserving, ascii case-insensitive string slices.
//!
//! Used for the keys of the submesh name tag language, where `Convex`,
//! `CONVEX` and `convex` all mean the same thing.

use std::{
    fmt::{self, Display},
    hash::{Hash, Hasher},
};

#[derive(Debug)]
#[repr(transparent)]
pub struct UncasedStr(str);

impl UncasedStr {
    pub fn new<S: AsRef<str> + ?Sized>(s: &S) -> &Self {
        // SAFETY: `UncasedStr` is a `repr(transparent)` wrapper around `str`
        unsafe { &*(s.as_ref() as *const str as *const Self) }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if this string equals any of `candidates`, ignoring ascii case.
    #[must_use]
    pub fn is_any_of(&self, candidates: &[&str]) -> bool {
        candidates.iter().any(|c| self == *c)
    }
}

impl PartialEq for UncasedStr {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for UncasedStr {}

impl PartialEq<str> for UncasedStr {
    fn eq(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl PartialEq<&str> for UncasedStr {
    fn eq(&self, other: &&str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl Hash for UncasedStr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0
            .bytes()
            .for_each(|b| state.write_u8(b.to_ascii_lowercase()));
    }
}

impl Display for UncasedStr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub trait AsUncased {
    fn as_uncased(&self) -> &UncasedStr;
}

impl AsUncased for str {
    fn as_uncased(&self) -> &UncasedStr {
        UncasedStr::new(self)
    }
}

impl AsUncased for String {
    fn as_uncased(&self) -> &UncasedStr {
        UncasedStr::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_ascii_case() {
        assert_eq!("FragmentGroup".as_uncased(), "fragmentgroup".as_uncased());
        assert!("EdgeVFX".as_uncased().is_any_of(&["edgevfx", "param1_edgevfx"]));
        assert!(!"edge".as_uncased().is_any_of(&["edgevfx", "param1_edgevfx"]));
    }
}
