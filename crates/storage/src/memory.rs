use std::{
    collections::{BTreeMap, VecDeque},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use ::log::SetLoggerError;
use anyhow::anyhow;
use overload_app::{
    Settings, SettingsRepository,
    log::{self, Repository as _},
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    BackendError, BlobStore, Change, Changes, Document, DocumentStore, Filter, domain,
    document::DocumentRepository,
};

pub type MemoryRepository =
    DocumentRepository<MemoryDocumentStore, MemoryBlobStore, MemoryIdentityProvider>;

/// Domain and application services configured by `settings`.
pub type Services = (
    domain::Service<MemoryRepository>,
    overload_app::Service<MemoryApp>,
);

/// Repository backed entirely by in-memory collaborators.
#[must_use]
pub fn repository(settings: &Settings) -> MemoryRepository {
    DocumentRepository::new(
        MemoryDocumentStore::default(),
        MemoryBlobStore::new(&settings.backend.storage_bucket),
        MemoryIdentityProvider::default(),
        settings.collections.clone(),
    )
}

#[must_use]
pub fn services(settings: Settings) -> Services {
    let service = domain::Service::new(repository(&settings));
    let app = overload_app::Service::new(MemoryApp {
        log: Arc::new(MemoryLog::new(settings.log_capacity)),
        settings: MemorySettings::new(settings),
    });
    (service, app)
}

/// Create the services and install the logger at the configured level.
///
/// Log records are kept in the log of the returned application service.
///
/// # Errors
///
/// Returns an error if a logger has already been installed.
pub fn init(settings: Settings) -> Result<Services, SetLoggerError> {
    let level = settings.log_level;
    let (service, app) = services(settings);
    log::init(app.repository().log(), level)?;
    ::log::info!("logging at level {level}");
    Ok((service, app))
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, BackendError> {
    mutex
        .lock()
        .map_err(|_| BackendError::Other(anyhow!("lock poisoned")))
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<BTreeMap<String, BTreeMap<String, Document>>>,
    offline: AtomicBool,
}

impl MemoryDocumentStore {
    /// While offline every operation fails with `BackendError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    fn collections(
        &self,
    ) -> Result<MutexGuard<'_, BTreeMap<String, BTreeMap<String, Document>>>, BackendError> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(BackendError::Unavailable);
        }
        lock(&self.collections)
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, collection: &str, document: Document) -> Result<String, BackendError> {
        let id = Uuid::new_v4().to_string();
        self.collections()?
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), document);
        Ok(id)
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<(), BackendError> {
        self.collections()?
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError> {
        Ok(self
            .collections()?
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<(String, Document)>, BackendError> {
        Ok(self
            .collections()?
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|(_, document)| filter.matches(document))
                    .map(|(id, document)| (id.clone(), document.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        changes: Changes,
    ) -> Result<(), BackendError> {
        let mut collections = self.collections()?;
        let document = collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id))
            .ok_or(BackendError::NotFound)?;
        for (field, change) in changes {
            apply(document, field, change);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), BackendError> {
        if let Some(documents) = self.collections()?.get_mut(collection) {
            documents.remove(id);
        }
        Ok(())
    }
}

fn apply(document: &mut Document, field: String, change: Change) {
    match change {
        Change::Set(value) => {
            document.insert(field, value);
        }
        Change::ArrayUnion(value) => match document.get_mut(&field) {
            Some(Value::Array(values)) => {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            _ => {
                document.insert(field, Value::Array(vec![value]));
            }
        },
        Change::ArrayRemove(value) => {
            if let Some(Value::Array(values)) = document.get_mut(&field) {
                values.retain(|v| *v != value);
            }
        }
    }
}

pub struct MemoryBlobStore {
    bucket: String,
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            blobs: Mutex::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.lock().ok()?.get(key).cloned()
    }
}

impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, content: Vec<u8>) -> Result<(), BackendError> {
        lock(&self.blobs)?.insert(key.to_string(), content);
        Ok(())
    }

    fn url(&self, key: &str) -> String {
        format!("https://{}/{key}", self.bucket)
    }
}

struct Account {
    uid: domain::UserID,
    password: domain::Password,
}

type SharedListener = Arc<dyn Fn(Option<&domain::Identity>) + Send + Sync>;

#[derive(Default)]
pub struct MemoryIdentityProvider {
    accounts: Mutex<BTreeMap<domain::Email, Account>>,
    current: Mutex<Option<domain::Identity>>,
    listeners: Arc<Mutex<BTreeMap<u64, SharedListener>>>,
    next_listener: AtomicU64,
    password_resets: Mutex<Vec<domain::Email>>,
}

impl MemoryIdentityProvider {
    /// Addresses a password reset was requested for, oldest first.
    #[must_use]
    pub fn password_resets(&self) -> Vec<domain::Email> {
        self.password_resets
            .lock()
            .map(|resets| resets.clone())
            .unwrap_or_default()
    }

    fn change(&self, identity: Option<domain::Identity>) -> Result<(), domain::StorageError> {
        *self.current.lock().map_err(poisoned)? = identity.clone();
        // listeners may unsubscribe while being notified
        let listeners = self
            .listeners
            .lock()
            .map_err(poisoned)?
            .values()
            .cloned()
            .collect::<Vec<_>>();
        for listener in listeners {
            listener(identity.as_ref());
        }
        Ok(())
    }
}

fn poisoned<T>(_: T) -> domain::StorageError {
    domain::StorageError::Other("lock poisoned".into())
}

impl domain::SessionRepository for MemoryIdentityProvider {
    async fn sign_up(
        &self,
        email: &domain::Email,
        password: &domain::Password,
    ) -> Result<domain::Identity, domain::CreateError> {
        let identity = {
            let mut accounts = self.accounts.lock().map_err(poisoned)?;
            if accounts.contains_key(email) {
                return Err(domain::CreateError::Conflict);
            }
            let uid = domain::UserID::from(Uuid::new_v4());
            accounts.insert(
                email.clone(),
                Account {
                    uid,
                    password: password.clone(),
                },
            );
            domain::Identity {
                uid,
                email: email.clone(),
            }
        };
        self.change(Some(identity.clone()))?;
        Ok(identity)
    }

    async fn sign_in(
        &self,
        email: &domain::Email,
        password: &domain::Password,
    ) -> Result<domain::Identity, domain::ReadError> {
        let identity = match self.accounts.lock().map_err(poisoned)?.get(email) {
            Some(account) if account.password == *password => domain::Identity {
                uid: account.uid,
                email: email.clone(),
            },
            _ => {
                return Err(domain::ReadError::Storage(
                    domain::StorageError::PermissionDenied,
                ));
            }
        };
        self.change(Some(identity.clone()))?;
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), domain::DeleteError> {
        Ok(self.change(None)?)
    }

    async fn send_password_reset(&self, email: &domain::Email) -> Result<(), domain::ReadError> {
        if !self.accounts.lock().map_err(poisoned)?.contains_key(email) {
            return Err(domain::ReadError::NotFound);
        }
        ::log::debug!("sending password reset to {email}");
        self.password_resets
            .lock()
            .map_err(poisoned)?
            .push(email.clone());
        Ok(())
    }

    fn current_identity(&self) -> Option<domain::Identity> {
        self.current.lock().ok()?.clone()
    }

    fn subscribe(&self, listener: domain::Listener) -> domain::Subscription {
        listener(self.current_identity().as_ref());
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.insert(id, Arc::from(listener));
        }
        let listeners = Arc::clone(&self.listeners);
        domain::Subscription::new(move || {
            if let Ok(mut listeners) = listeners.lock() {
                listeners.remove(&id);
            }
        })
    }
}

/// Log entries kept in memory, newest first.
pub struct MemoryLog {
    capacity: usize,
    entries: Mutex<VecDeque<log::Entry>>,
}

impl MemoryLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::new()),
        }
    }
}

impl log::Repository for MemoryLog {
    fn read_entries(&self) -> Result<VecDeque<log::Entry>, log::Error> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .map_err(|err| log::Error::Unknown(err.to_string()))
    }

    fn write_entry(&self, entry: log::Entry) -> Result<(), log::Error> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|err| log::Error::Unknown(err.to_string()))?;
        entries.push_front(entry);
        entries.truncate(self.capacity);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySettings {
    settings: Mutex<Settings>,
}

impl MemorySettings {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl SettingsRepository for MemorySettings {
    async fn read_settings(&self) -> Result<Settings, String> {
        self.settings
            .lock()
            .map(|settings| settings.clone())
            .map_err(|err| err.to_string())
    }

    async fn write_settings(&self, settings: Settings) -> Result<(), String> {
        *self.settings.lock().map_err(|err| err.to_string())? = settings;
        Ok(())
    }
}

/// Log and settings storage of the application.
pub struct MemoryApp {
    log: Arc<MemoryLog>,
    settings: MemorySettings,
}

impl MemoryApp {
    #[must_use]
    pub fn log(&self) -> Arc<MemoryLog> {
        Arc::clone(&self.log)
    }
}

impl log::Repository for MemoryApp {
    fn read_entries(&self) -> Result<VecDeque<log::Entry>, log::Error> {
        self.log.read_entries()
    }

    fn write_entry(&self, entry: log::Entry) -> Result<(), log::Error> {
        self.log.write_entry(entry)
    }
}

impl SettingsRepository for MemoryApp {
    async fn read_settings(&self) -> Result<Settings, String> {
        self.settings.read_settings().await
    }

    async fn write_settings(&self, settings: Settings) -> Result<(), String> {
        self.settings.write_settings(settings).await
    }
}
