use std::sync::{Arc, RwLock};

use log::debug;
use overload_domain::{Identity, SessionService, StorageError, Subscription};

/// Authentication state of the running application.
///
/// The context is kept current by a subscription to the identity provider. Dropping the
/// context ends the subscription.
#[derive(Debug)]
pub struct AuthContext {
    identity: Arc<RwLock<Option<Identity>>>,
    _subscription: Subscription,
}

impl AuthContext {
    pub fn new<S: SessionService>(session: &S) -> Self {
        let identity = Arc::new(RwLock::new(session.current_identity()));
        let shared = Arc::clone(&identity);
        let subscription = session.subscribe(Box::new(move |changed| {
            debug!(
                "authentication state changed: {}",
                changed.map_or("signed out".to_string(), |i| format!("signed in as {}", i.email))
            );
            if let Ok(mut identity) = shared.write() {
                *identity = changed.cloned();
            }
        }));
        Self {
            identity,
            _subscription: subscription,
        }
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.identity.read().ok().and_then(|identity| identity.clone())
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.identity().is_some()
    }

    /// Identity of the signed in user, for operations that must not run without one.
    pub fn require_identity(&self) -> Result<Identity, StorageError> {
        self.identity().ok_or(StorageError::NoSession)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use overload_domain::{
        CreateError, DeleteError, Email, Listener, Name, Password, ReadError, User,
    };
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Default)]
    struct Session {
        listeners: Arc<Mutex<Vec<(usize, Listener)>>>,
        current: Mutex<Option<Identity>>,
    }

    impl Session {
        fn change(&self, identity: Option<Identity>) {
            *self.current.lock().unwrap() = identity.clone();
            for (_, listener) in self.listeners.lock().unwrap().iter() {
                listener(identity.as_ref());
            }
        }
    }

    impl SessionService for Session {
        async fn register(&self, _: Email, _: Password, _: Name) -> Result<User, CreateError> {
            Err(CreateError::Conflict)
        }

        async fn login(&self, _: Email, _: Password) -> Result<Identity, ReadError> {
            Err(ReadError::NotFound)
        }

        async fn logout(&self) -> Result<(), DeleteError> {
            Ok(())
        }

        async fn reset_password(&self, _: Email) -> Result<(), ReadError> {
            Ok(())
        }

        fn current_identity(&self) -> Option<Identity> {
            self.current.lock().unwrap().clone()
        }

        fn subscribe(&self, listener: Listener) -> Subscription {
            let mut listeners = self.listeners.lock().unwrap();
            let id = listeners.len();
            listeners.push((id, listener));
            let listeners = Arc::clone(&self.listeners);
            Subscription::new(move || {
                listeners.lock().unwrap().retain(|(i, _)| *i != id);
            })
        }
    }

    fn identity() -> Identity {
        Identity {
            uid: 1.into(),
            email: Email::new("alice@example.com").unwrap(),
        }
    }

    #[test]
    fn test_auth_context_follows_session() {
        let session = Session::default();
        let context = AuthContext::new(&session);

        assert!(!context.is_signed_in());
        assert!(matches!(
            context.require_identity(),
            Err(StorageError::NoSession)
        ));

        session.change(Some(identity()));

        assert_eq!(context.identity(), Some(identity()));
        assert_eq!(context.require_identity().unwrap(), identity());

        session.change(None);

        assert!(!context.is_signed_in());
    }

    #[test]
    fn test_auth_context_starts_with_current_identity() {
        let session = Session::default();
        session.change(Some(identity()));

        assert_eq!(AuthContext::new(&session).identity(), Some(identity()));
    }

    #[test]
    fn test_auth_context_unsubscribes_on_drop() {
        let session = Session::default();
        let context = AuthContext::new(&session);

        assert_eq!(session.listeners.lock().unwrap().len(), 1);

        drop(context);

        assert!(session.listeners.lock().unwrap().is_empty());
    }
}
