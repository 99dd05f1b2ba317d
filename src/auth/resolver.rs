// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! Identity resolution: token subject to stored identity.

use crate::models::User;
use crate::storage::{Storage, StorageResult};

/// Load the identity behind a verified token subject.
///
/// Unknown subjects and soft-deactivated identities (`is_active = false`)
/// both resolve as `None`; the distinction is invisible to the caller of
/// the failing request. A storage failure propagates as an error, which
/// the gate turns into a 500, never into a denial.
pub fn resolve(storage: &dyn Storage, subject: &str) -> StorageResult<Option<User>> {
    Ok(storage.get_user(subject)?.filter(|user| user.is_active))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, UserPatch};
    use crate::storage::MemoryStorage;

    #[test]
    fn resolves_an_active_identity() {
        let storage = MemoryStorage::new();
        let user = storage
            .create_user(NewUser {
                email: "a@example.com".into(),
                role: None,
                tier: None,
            })
            .unwrap();

        let resolved = resolve(&storage, &user.id).unwrap().unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[test]
    fn unknown_subject_resolves_as_absent() {
        let storage = MemoryStorage::new();
        assert!(resolve(&storage, "ghost").unwrap().is_none());
    }

    #[test]
    fn deactivated_identity_resolves_as_absent() {
        let storage = MemoryStorage::new();
        let user = storage
            .create_user(NewUser {
                email: "b@example.com".into(),
                role: None,
                tier: None,
            })
            .unwrap();
        storage
            .update_user(
                &user.id,
                UserPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(resolve(&storage, &user.id).unwrap().is_none());
    }
}
