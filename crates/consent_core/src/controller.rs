//! Banner and modal decisions mapped onto consent record replacements.

use shared::{
    domain::{ConsentRecord, ConsentUpdate},
    protocol::ConsentEvent,
};
use storage::CookieJar;
use tokio::sync::broadcast;

use crate::{store::ConsentStore, view::ModalView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    ClickOutside,
    CancelKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentAction {
    AcceptAll,
    DeclineAll,
    ManageCookies,
    ToggleAnalytics(bool),
    ToggleMarketing(bool),
    Save,
    Dismiss(DismissReason),
}

impl ConsentAction {
    pub fn name(&self) -> &'static str {
        match self {
            ConsentAction::AcceptAll => "accept_all",
            ConsentAction::DeclineAll => "decline_all",
            ConsentAction::ManageCookies => "manage_cookies",
            ConsentAction::ToggleAnalytics(_) => "toggle_analytics",
            ConsentAction::ToggleMarketing(_) => "toggle_marketing",
            ConsentAction::Save => "save",
            ConsentAction::Dismiss(_) => "dismiss",
        }
    }
}

/// Owns the consent store and the modal's open flag. Hand one instance to
/// every surface that shows or changes consent.
pub struct ConsentController<J> {
    store: ConsentStore<J>,
    modal_open: bool,
}

impl<J: CookieJar> ConsentController<J> {
    pub fn new(store: ConsentStore<J>) -> Self {
        Self {
            store,
            modal_open: false,
        }
    }

    pub fn consent(&self) -> ConsentRecord {
        self.store.consent()
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal_open
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsentEvent> {
        self.store.subscribe()
    }

    pub fn store(&self) -> &ConsentStore<J> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ConsentStore<J> {
        &mut self.store
    }

    /// Toggle state shown by the preference modal, if it is open.
    pub fn modal(&self) -> Option<ModalView> {
        self.modal_open.then(|| ModalView::new(self.consent()))
    }

    /// Applies one user action and returns the resulting record.
    ///
    /// Toggles write through immediately, so dismissing the modal keeps
    /// whatever was toggled before it closed.
    pub fn dispatch(&mut self, action: ConsentAction) -> ConsentRecord {
        tracing::debug!(action = action.name(), modal_open = self.modal_open, "consent action");

        match action {
            ConsentAction::AcceptAll => {
                self.store.write(ConsentRecord::accept_all());
                self.modal_open = false;
            }
            ConsentAction::DeclineAll => {
                self.store.write(ConsentRecord::decline_all());
                self.modal_open = false;
            }
            ConsentAction::ManageCookies => self.modal_open = true,
            ConsentAction::ToggleAnalytics(value) => {
                self.toggle(ConsentUpdate::analytics(value), action)
            }
            ConsentAction::ToggleMarketing(value) => {
                self.toggle(ConsentUpdate::marketing(value), action)
            }
            ConsentAction::Save => {
                let current = self.store.consent();
                self.store.write(current);
                self.modal_open = false;
            }
            ConsentAction::Dismiss(_) => self.modal_open = false,
        }

        self.store.consent()
    }

    /// Merges `update` over the current record and persists the result.
    pub fn request_consent_update(&mut self, update: ConsentUpdate) -> ConsentRecord {
        let record = self.store.consent().with_update(update);
        self.store.write(record);
        record
    }

    pub fn poll_external_changes(&mut self) -> usize {
        self.store.poll_external_changes()
    }

    fn toggle(&mut self, update: ConsentUpdate, action: ConsentAction) {
        if !self.modal_open {
            tracing::debug!(action = action.name(), "ignoring toggle while modal is closed");
            return;
        }
        self.request_consent_update(update);
    }
}
