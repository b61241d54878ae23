use super::{CoreError, lock_caller, require_user, stats};
use crate::clock::Clock;
use crate::model::account::{Feedback, NewUser, ProfileResponse, User, UserChanges};
use crate::store::Store;
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_FEEDBACK_KIND: &str = "general";

fn ensure_username_free(
    store: &mut dyn Store,
    username: &str,
    except: Option<i64>,
) -> Result<(), CoreError> {
    match store.find_user_by_username(username)? {
        Some(other) if Some(other.id) != except => {
            Err(CoreError::UsernameTaken(username.to_string()))
        }
        _ => Ok(()),
    }
}

fn ensure_email_free(
    store: &mut dyn Store,
    email: &str,
    except: Option<i64>,
) -> Result<(), CoreError> {
    match store.find_user_by_email(email)? {
        Some(other) if Some(other.id) != except => Err(CoreError::EmailTaken(email.to_string())),
        _ => Ok(()),
    }
}

/// Creates a student account on the free plan.
pub fn register(
    store: &mut dyn Store,
    clock: &dyn Clock,
    username: &str,
    email: &str,
    group: &str,
    credential_hash: Option<String>,
) -> Result<User, CoreError> {
    let new_user = NewUser::student(username, email, group, credential_hash, clock.now())
        .map_err(CoreError::ValidationFailed)?;

    ensure_username_free(store, &new_user.username, None)?;
    ensure_email_free(store, &new_user.email, None)?;

    let user = store.insert_user(&new_user)?;
    info!("Registered user {} ({})", user.id, user.username);
    Ok(user)
}

pub fn profile(store: &mut dyn Store, user_id: i64) -> Result<ProfileResponse, CoreError> {
    let user = require_user(store, user_id)?;
    let stats = stats::user_stats(store, user_id)?;
    Ok(ProfileResponse { user, stats })
}

pub fn update_profile(
    store: &mut dyn Store,
    user_id: i64,
    changes: UserChanges,
) -> Result<User, CoreError> {
    let current = lock_caller(store, user_id)?;
    if changes.is_empty() {
        return Ok(current);
    }

    let changes = UserChanges {
        username: changes.username.map(|u| u.trim().to_string()),
        email: changes.email.map(|e| e.trim().to_string()),
        group: changes.group.map(|g| g.trim().to_string()),
        subscription: changes.subscription,
    };

    if let Some(username) = &changes.username {
        if username.is_empty() {
            return Err(CoreError::ValidationFailed(
                "Username must not be empty.".to_string(),
            ));
        }
        ensure_username_free(store, username, Some(user_id))?;
    }
    if let Some(email) = &changes.email {
        if !email.contains('@') {
            return Err(CoreError::ValidationFailed(format!(
                "'{}' is not a valid email address.",
                email
            )));
        }
        ensure_email_free(store, email, Some(user_id))?;
    }
    if changes.group.as_deref().is_some_and(str::is_empty) {
        return Err(CoreError::ValidationFailed(
            "Group must not be empty.".to_string(),
        ));
    }

    let user = store.update_user(user_id, &changes)?;
    info!("Updated profile of user {}", user_id);
    Ok(user)
}

pub fn submit_feedback(
    store: &mut dyn Store,
    clock: &dyn Clock,
    user_id: i64,
    kind: Option<&str>,
    message: &str,
) -> Result<Feedback, CoreError> {
    require_user(store, user_id)?;
    let message = message.trim();
    if message.is_empty() {
        return Err(CoreError::ValidationFailed(
            "Feedback message must not be empty.".to_string(),
        ));
    }
    let kind = kind
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .unwrap_or(DEFAULT_FEEDBACK_KIND);

    let feedback = store.insert_feedback(&Feedback {
        id: Uuid::new_v4(),
        user_id,
        kind: kind.to_string(),
        message: message.to_string(),
        status: "new".to_string(),
        created_at: clock.now(),
    })?;
    info!("Feedback {} received from user {}", feedback.id, user_id);
    Ok(feedback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::account::{Role, Subscription};
    use crate::scoring::ErrorKind;
    use crate::scoring::fixtures::{clock, epoch, student, tables};

    #[test]
    fn register_creates_free_student() {
        let mut store = tables();
        let clock = clock();

        let user = register(&mut store, &clock, " alice ", "alice@cybersib.ru", "IB-21", None).unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.subscription, Subscription::Free);
        assert_eq!(
            user.avatar_url.as_deref(),
            Some("https://robohash.org/alice.png?set=set4")
        );
        assert_eq!(user.created_at, epoch());
    }

    #[test]
    fn register_rejects_duplicates_and_bad_input() {
        let mut store = tables();
        let clock = clock();
        register(&mut store, &clock, "alice", "alice@cybersib.ru", "IB-21", None).unwrap();

        let err = register(&mut store, &clock, "alice", "other@cybersib.ru", "IB-21", None)
            .unwrap_err();
        assert!(matches!(err, CoreError::UsernameTaken(_)));
        let err = register(&mut store, &clock, "alicia", "alice@cybersib.ru", "IB-21", None)
            .unwrap_err();
        assert!(matches!(err, CoreError::EmailTaken(_)));
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        for (username, email, group) in [
            ("", "x@cybersib.ru", "IB-21"),
            ("bob", "not-an-email", "IB-21"),
            ("bob", "bob@cybersib.ru", "  "),
        ] {
            let err = register(&mut store, &clock, username, email, group, None).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        }
        assert_eq!(store.list_users().unwrap().len(), 1);
    }

    #[test]
    fn profile_of_new_user_has_zero_points() {
        let mut store = tables();
        let user = student(&mut store, "alice");

        let profile = profile(&mut store, user.id).unwrap();

        assert_eq!(profile.user, user);
        assert_eq!(profile.stats.total_points, 0);
        assert!(matches!(
            super::profile(&mut store, 999).unwrap_err(),
            CoreError::UserNotFound(999)
        ));
    }

    #[test]
    fn update_profile_checks_uniqueness_against_others_only() {
        let mut store = tables();
        let alice = student(&mut store, "alice");
        student(&mut store, "bob");

        let same = update_profile(
            &mut store,
            alice.id,
            UserChanges {
                username: Some("alice".to_string()),
                subscription: Some(Subscription::Premium),
                ..UserChanges::default()
            },
        )
        .unwrap();
        assert_eq!(same.subscription, Subscription::Premium);

        let err = update_profile(
            &mut store,
            alice.id,
            UserChanges {
                username: Some("bob".to_string()),
                ..UserChanges::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::UsernameTaken(_)));

        let err = update_profile(
            &mut store,
            alice.id,
            UserChanges {
                email: Some("nowhere".to_string()),
                ..UserChanges::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);

        let unchanged = update_profile(&mut store, alice.id, UserChanges::default()).unwrap();
        assert_eq!(unchanged.username, "alice");
    }

    #[test]
    fn feedback_defaults_kind_and_requires_message() {
        let mut store = tables();
        let clock = clock();
        let user = student(&mut store, "alice");

        let feedback = submit_feedback(&mut store, &clock, user.id, None, "Lab 3 hint is off").unwrap();
        assert_eq!(feedback.kind, "general");
        assert_eq!(feedback.status, "new");
        assert_eq!(feedback.created_at, epoch());

        let bug = submit_feedback(&mut store, &clock, user.id, Some("bug"), "x").unwrap();
        assert_eq!(bug.kind, "bug");
        assert_ne!(bug.id, feedback.id);

        let err = submit_feedback(&mut store, &clock, user.id, None, "   ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    }
}
