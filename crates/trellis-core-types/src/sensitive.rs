//! Redacting wrapper for credentials
//!
//! Plain-text passwords only exist between reading a users manifest and
//! hashing them. Holding them in `Sensitive` keeps them out of `{:?}` and
//! `{}` output along the way.

use std::fmt;

const REDACTED: &str = "<redacted>";

/// Value that never prints its contents
///
/// ```
/// use trellis_core_types::Sensitive;
///
/// let password = Sensitive::from("s3cret".to_string());
/// assert_eq!(format!("{:?}", password), "Sensitive(<redacted>)");
/// assert_eq!(password.expose(), "s3cret");
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the secret; callers must not log the result
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Sensitive<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sensitive").field(&format_args!("{}", REDACTED)).finish()
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}
