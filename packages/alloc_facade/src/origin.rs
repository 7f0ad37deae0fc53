use std::borrow::Cow;
use std::fmt;
use std::panic::Location;

use crate::constants::UNKNOWN_ORIGIN;

/// Where an allocation came from, for leak diagnostics.
///
/// Every allocating function of this crate is `#[track_caller]` and captures an origin
/// automatically. Construct one explicitly to attach a human-readable tag, for example the name
/// of the subsystem or data structure that owns the block.
///
/// # Examples
///
/// ```
/// use alloc_facade::Origin;
///
/// let origin = Origin::tagged("texture cache");
/// assert!(origin.to_string().starts_with("texture cache ("));
///
/// assert_eq!(Origin::unknown().to_string(), "unknown");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Origin {
    location: Option<&'static Location<'static>>,
    tag: Option<Cow<'static, str>>,
}

impl Origin {
    /// The source location of the caller.
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        Self {
            location: Some(Location::caller()),
            tag: None,
        }
    }

    /// A tag plus the source location of the caller.
    #[must_use]
    #[track_caller]
    pub fn tagged(tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            location: Some(Location::caller()),
            tag: Some(tag.into()),
        }
    }

    /// No information about the origin. Recorded as the literal `unknown`.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            location: None,
            tag: None,
        }
    }

    /// The captured source location, if any.
    #[must_use]
    pub fn location(&self) -> Option<&'static Location<'static>> {
        self.location
    }

    /// The caller-supplied tag, if any.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.tag, self.location) {
            (Some(tag), Some(location)) => {
                write!(f, "{tag} ({}:{})", location.file(), location.line())
            }
            (None, Some(location)) => write!(f, "{}:{}", location.file(), location.line()),
            (Some(tag), None) => f.write_str(tag),
            (None, None) => f.write_str(UNKNOWN_ORIGIN),
        }
    }
}
