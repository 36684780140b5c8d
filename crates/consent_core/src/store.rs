//! Cookie-backed owner of the current consent record.

use shared::{
    domain::{ConsentRecord, DEFAULT_CONSENT_COOKIE},
    protocol::{ChangeOrigin, ConsentEvent, StorageChange},
};
use storage::{
    cookie_exists, decode_envelope, read_cookie_value, write_cookie_value, ChangeSource,
    CookieJar, CookieOptions,
};
use tokio::sync::{broadcast, broadcast::error::TryRecvError};
use tracing::{debug, error, warn};

const EVENT_CAPACITY: usize = 64;

pub struct ConsentStore<J> {
    jar: J,
    key: String,
    default: ConsentRecord,
    options: CookieOptions,
    current: ConsentRecord,
    changes: Option<broadcast::Receiver<StorageChange>>,
    events: broadcast::Sender<ConsentEvent>,
}

impl<J: CookieJar> ConsentStore<J> {
    /// Loads the record persisted under `key`, or `default` when there is
    /// none or it cannot be decoded.
    pub fn open(
        jar: J,
        key: impl Into<String>,
        default: ConsentRecord,
        options: CookieOptions,
    ) -> Self {
        let key = key.into();
        let current = read_cookie_value(&jar, &key, default);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        debug!(key = %key, ?current, "consent store opened");
        Self {
            jar,
            key,
            default,
            options,
            current,
            changes: None,
            events,
        }
    }

    pub fn with_defaults(jar: J) -> Self {
        Self::open(
            jar,
            DEFAULT_CONSENT_COOKIE,
            ConsentRecord::default(),
            CookieOptions::default(),
        )
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn consent(&self) -> ConsentRecord {
        self.current
    }

    /// Whether the jar currently holds a cookie under this store's key.
    pub fn is_persisted(&self) -> bool {
        cookie_exists(&self.jar, &self.key)
    }

    /// Reads the persisted record without adopting it.
    pub fn read(&self) -> ConsentRecord {
        read_cookie_value(&self.jar, &self.key, self.default)
    }

    /// Re-reads the jar and adopts its record.
    pub fn reload(&mut self) -> ConsentRecord {
        self.adopt_persisted();
        self.current
    }

    fn adopt_persisted(&mut self) -> bool {
        let persisted = self.read();
        if persisted == self.current {
            return false;
        }
        self.replace(persisted, ChangeOrigin::External);
        true
    }

    /// Replaces the record, then persists it. A failed write is logged and
    /// leaves the new in-memory record in place.
    pub fn write(&mut self, record: ConsentRecord) {
        self.replace(record, ChangeOrigin::Local);

        if let Err(err) = write_cookie_value(&self.jar, &self.key, &record, &self.options) {
            error!(key = %self.key, "error saving cookie: {err:#}");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsentEvent> {
        self.events.subscribe()
    }

    /// Registers with `source`; pending notifications are applied by
    /// [`ConsentStore::poll_external_changes`].
    pub fn attach<S: ChangeSource + ?Sized>(&mut self, source: &S) {
        self.changes = Some(source.subscribe());
    }

    pub fn is_attached(&self) -> bool {
        self.changes.is_some()
    }

    /// Adopts `change` when it targets this store's key and was written by
    /// another jar handle. Returns whether it did. Removed or undecodable
    /// values fall back to the default record.
    pub fn apply_external_change(&mut self, change: &StorageChange) -> bool {
        if change.key != self.key {
            return false;
        }
        if change.writer.is_some() && change.writer == self.jar.writer_id() {
            debug!(key = %self.key, "skipping own write");
            return false;
        }

        let record = match change.new_value.as_deref() {
            Some(raw) => decode_envelope(raw).unwrap_or_else(|err| {
                warn!(key = %self.key, "error parsing cookie value: {err}");
                self.default
            }),
            None => self.default,
        };
        self.replace(record, ChangeOrigin::External);
        true
    }

    /// Applies every buffered notification in arrival order and returns how
    /// many were adopted. Overflowed buffers are recovered by re-reading the
    /// jar.
    pub fn poll_external_changes(&mut self) -> usize {
        let mut adopted = 0;
        loop {
            let next = match self.changes.as_mut() {
                Some(changes) => changes.try_recv(),
                None => break,
            };
            match next {
                Ok(change) => {
                    if self.apply_external_change(&change) {
                        adopted += 1;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(key = %self.key, skipped, "missed storage changes; re-reading cookie");
                    if self.adopt_persisted() {
                        adopted += 1;
                    }
                }
                Err(TryRecvError::Closed) => {
                    debug!(key = %self.key, "storage change source closed");
                    self.changes = None;
                    break;
                }
            }
        }
        adopted
    }

    fn replace(&mut self, record: ConsentRecord, origin: ChangeOrigin) {
        self.current = record;
        debug!(
            key = %self.key,
            essentials = record.essentials(),
            analytics = record.analytics(),
            marketing = record.marketing(),
            ?origin,
            "consent changed"
        );
        let _ = self.events.send(ConsentEvent::Changed { record, origin });
    }
}
