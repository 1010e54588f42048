//! Link name validation.
//!
//! Valid link names:
//! - Must be non-empty
//! - Must not contain `/` (the path separator)
//! - Must not be `.` (a path component that normalization drops)
//! - Must not be the reserved namespace name in the root group

use tessera_registry::RESERVED_NAME;

use crate::error::{LinkError, LinkResult};

/// Validate a link name, returning `Ok(())` if valid.
///
/// `in_root` is `true` when the link is being added to the root group, where
/// the reserved namespace name is also rejected.
///
/// # Examples
///
/// ```
/// use tessera_links::validate_link_name;
///
/// assert!(validate_link_name("temperature", false).is_ok());
/// assert!(validate_link_name("a/b", false).is_err());
/// assert!(validate_link_name("__db__", true).is_err());
/// assert!(validate_link_name("__db__", false).is_ok());
/// ```
pub fn validate_link_name(name: &str, in_root: bool) -> LinkResult<()> {
    let invalid = |reason: &str| LinkError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("link name must not be empty"));
    }
    if name.contains('/') {
        return Err(invalid("must not contain '/'"));
    }
    if name == "." {
        return Err(invalid("'.' refers to the containing group"));
    }
    if in_root && name == RESERVED_NAME {
        return Err(invalid("reserved name"));
    }
    Ok(())
}
