use std::fmt;

use derive_more::{AsRef, Display};

use crate::{CreateError, DeleteError, Name, ReadError, User, UserID, ValidationError};

/// Callback invoked with the new identity whenever the authentication state changes.
pub type Listener = Box<dyn Fn(Option<&Identity>) + Send + Sync>;

#[allow(async_fn_in_trait)]
pub trait SessionService {
    /// Create an identity and the matching user profile.
    async fn register(
        &self,
        email: Email,
        password: Password,
        name: Name,
    ) -> Result<User, CreateError>;
    async fn login(&self, email: Email, password: Password) -> Result<Identity, ReadError>;
    async fn logout(&self) -> Result<(), DeleteError>;
    async fn reset_password(&self, email: Email) -> Result<(), ReadError>;

    fn current_identity(&self) -> Option<Identity>;
    fn subscribe(&self, listener: Listener) -> Subscription;

    fn validate_email(&self, email: &str) -> Result<Email, ValidationError> {
        Email::new(email)
    }

    fn validate_password(&self, password: &str) -> Result<Password, ValidationError> {
        Password::new(password)
    }
}

/// Identity provider of the hosted backend.
#[allow(async_fn_in_trait)]
pub trait SessionRepository {
    async fn sign_up(&self, email: &Email, password: &Password) -> Result<Identity, CreateError>;
    async fn sign_in(&self, email: &Email, password: &Password) -> Result<Identity, ReadError>;
    async fn sign_out(&self) -> Result<(), DeleteError>;
    async fn send_password_reset(&self, email: &Email) -> Result<(), ReadError>;

    fn current_identity(&self) -> Option<Identity>;
    /// The listener is called once with the current state and then on every change until the
    /// returned subscription is dropped.
    fn subscribe(&self, listener: Listener) -> Subscription;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: UserID,
    pub email: Email,
}

#[derive(AsRef, Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Email(String);

impl Email {
    pub fn new(email: &str) -> Result<Self, ValidationError> {
        let email = email.trim();

        if email.is_empty() {
            return Err(ValidationError::Empty("email".to_string()));
        }

        match email.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && domain.contains('.') && !domain.contains('@') =>
            {
                Ok(Email(email.to_lowercase()))
            }
            _ => Err(ValidationError::invalid(
                "email",
                "must be a valid email address",
            )),
        }
    }
}

#[derive(AsRef, Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub const MIN_LEN: usize = 6;

    pub fn new(password: &str) -> Result<Self, ValidationError> {
        if password.is_empty() {
            return Err(ValidationError::Empty("password".to_string()));
        }

        if password.chars().count() < Self::MIN_LEN {
            return Err(ValidationError::invalid(
                "password",
                format!("must be at least {} characters", Self::MIN_LEN),
            ));
        }

        Ok(Password(password.to_string()))
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Password(***)")
    }
}

/// Handle of an authentication state subscription. Dropping it unsubscribes.
#[must_use]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
