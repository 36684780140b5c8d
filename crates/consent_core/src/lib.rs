//! Consent state for a cookie banner and preference modal.
//!
//! [`ConsentStore`] keeps the record in sync with a cookie jar and with
//! change notifications from other owners of the jar; [`ConsentController`]
//! turns banner and modal actions into new records.

pub mod controller;
pub mod store;
pub mod view;

pub use controller::{ConsentAction, ConsentController, DismissReason};
pub use shared::{
    domain::{ConsentCategory, ConsentRecord, ConsentUpdate, DEFAULT_CONSENT_COOKIE},
    protocol::{ChangeOrigin, ConsentEvent, StorageChange},
};
pub use store::ConsentStore;
pub use view::{CategoryToggle, ModalView};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
