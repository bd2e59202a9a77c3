//! Per-identity storage namespacing.
//!
//! Every object lives under `"{owner_id}/"`. A caller may only obtain a
//! capability (presigned URL) for names under their own prefix, and the check
//! must run before the URL is generated.

use crate::{auth::AuthUser, error::AuthError};

/// The storage prefix owned by `identity`, e.g. `"5/"`.
pub fn object_prefix(identity: &AuthUser) -> String {
    format!("{}/", identity.id)
}

/// Builds the object name for a fresh upload: the caller's prefix followed by
/// the user-supplied file name with empty, `.` and `..` segments removed.
///
/// Returns `None` when nothing addressable remains after sanitizing.
pub fn scoped_object_name(identity: &AuthUser, filename: &str) -> Option<String> {
    let sanitized = sanitize_key(filename);
    if sanitized.is_empty() {
        return None;
    }
    Some(format!("{}{}", object_prefix(identity), sanitized))
}

/// Fails with `Forbidden` unless `object_name` sits under the caller's prefix.
///
/// Names that only reach the prefix through navigation segments
/// (`"5/../4/secret.pdf"`) or that name the prefix itself are refused as well.
pub fn authorize_object_access(identity: &AuthUser, object_name: &str) -> Result<(), AuthError> {
    let prefix = object_prefix(identity);

    let Some(rest) = object_name.strip_prefix(prefix.as_str()) else {
        tracing::warn!(
            user_id = identity.id,
            object_name,
            "object access outside caller namespace"
        );
        return Err(AuthError::Forbidden);
    };

    if rest.is_empty() || sanitize_key(rest) != rest {
        tracing::warn!(user_id = identity.id, object_name, "malformed object name");
        return Err(AuthError::Forbidden);
    }

    Ok(())
}

/// Drops empty, `.` and `..` segments from a `/`-separated key.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn user(id: i64) -> AuthUser {
        AuthUser {
            id,
            username: format!("user{id}"),
            role: Role::User,
        }
    }

    #[test]
    fn prefix_is_id_and_slash() {
        assert_eq!(object_prefix(&user(5)), "5/");
    }

    #[test]
    fn scoped_names_land_under_prefix() {
        assert_eq!(
            scoped_object_name(&user(5), "photo.png").as_deref(),
            Some("5/photo.png")
        );
        assert_eq!(
            scoped_object_name(&user(5), "../../4/secret.pdf").as_deref(),
            Some("5/4/secret.pdf")
        );
        assert_eq!(scoped_object_name(&user(5), "../.."), None);
    }

    #[test]
    fn prefix_must_match_whole_segment() {
        // "50/" starts with "5" but not with "5/".
        assert_eq!(
            authorize_object_access(&user(5), "50/photo.png"),
            Err(AuthError::Forbidden)
        );
    }

    #[test]
    fn navigation_segments_are_refused() {
        assert_eq!(
            authorize_object_access(&user(5), "5/../4/secret.pdf"),
            Err(AuthError::Forbidden)
        );
        assert_eq!(
            authorize_object_access(&user(5), "5//photo.png"),
            Err(AuthError::Forbidden)
        );
        assert_eq!(authorize_object_access(&user(5), "5/"), Err(AuthError::Forbidden));
    }

    #[test]
    fn nested_names_are_allowed() {
        assert_eq!(authorize_object_access(&user(5), "5/albums/2024/a.png"), Ok(()));
    }
}
