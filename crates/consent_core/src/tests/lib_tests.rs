use super::*;
use storage::{
    encode_envelope, find_cookie, CookieJar, CookieOptions, MemoryCookieJar, StorageChangeHub,
};

struct FailingJar;

impl CookieJar for FailingJar {
    fn cookie_string(&self) -> anyhow::Result<String> {
        Ok(String::new())
    }

    fn set_cookie(&self, _line: &str) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("cookie writes blocked"))
    }
}

fn controller(jar: MemoryCookieJar) -> ConsentController<MemoryCookieJar> {
    ConsentController::new(ConsentStore::with_defaults(jar))
}

fn persisted(jar: &MemoryCookieJar) -> Option<String> {
    let cookies = jar.cookie_string().expect("cookies");
    find_cookie(&cookies, DEFAULT_CONSENT_COOKIE).map(str::to_string)
}

fn seeded_jar(record: ConsentRecord) -> MemoryCookieJar {
    let jar = MemoryCookieJar::new();
    let line = format!(
        "{DEFAULT_CONSENT_COOKIE}={}",
        encode_envelope(&record).expect("encode")
    );
    jar.set_cookie(&line).expect("seed");
    jar
}

#[test]
fn starts_with_everything_granted_when_nothing_is_persisted() {
    let controller = controller(MemoryCookieJar::new());
    assert_eq!(controller.consent(), ConsentRecord::new(true, true));
    assert!(controller.consent().essentials());
    assert!(!controller.is_modal_open());
    assert!(!controller.store().is_persisted());
}

#[test]
fn loads_persisted_record_on_open() {
    let controller = controller(seeded_jar(ConsentRecord::new(true, false)));
    assert_eq!(controller.consent(), ConsentRecord::new(true, false));
    assert!(controller.store().is_persisted());
}

#[test]
fn undecodable_cookie_opens_with_default() {
    let jar = MemoryCookieJar::new();
    jar.set_cookie("cookieConsent=%7B%22essentials").expect("seed");
    let store = ConsentStore::open(
        jar,
        "cookieConsent",
        ConsentRecord::decline_all(),
        CookieOptions::default(),
    );
    assert_eq!(store.consent(), ConsentRecord::decline_all());
}

#[test]
fn decline_all_on_banner_persists_and_keeps_modal_closed() {
    let jar = MemoryCookieJar::new();
    let mut controller = controller(jar.clone());

    let record = controller.dispatch(ConsentAction::DeclineAll);

    assert_eq!(record, ConsentRecord::new(false, false));
    assert!(record.essentials());
    assert!(!controller.is_modal_open());
    assert_eq!(
        persisted(&jar),
        Some(encode_envelope(&record).expect("encode"))
    );
}

#[test]
fn accept_all_is_idempotent() {
    let mut controller = controller(seeded_jar(ConsentRecord::decline_all()));
    let once = controller.dispatch(ConsentAction::AcceptAll);
    let twice = controller.dispatch(ConsentAction::AcceptAll);
    assert_eq!(once, ConsentRecord::accept_all());
    assert_eq!(once, twice);
}

#[test]
fn accept_and_decline_close_an_open_modal() {
    let mut controller = controller(MemoryCookieJar::new());

    controller.dispatch(ConsentAction::ManageCookies);
    controller.dispatch(ConsentAction::DeclineAll);
    assert!(!controller.is_modal_open());

    controller.dispatch(ConsentAction::ManageCookies);
    let record = controller.dispatch(ConsentAction::AcceptAll);
    assert!(!controller.is_modal_open());
    assert_eq!(record, ConsentRecord::accept_all());
}

#[test]
fn manage_toggle_analytics_off_then_save() {
    let jar = MemoryCookieJar::new();
    let mut controller = controller(jar.clone());

    let before = controller.dispatch(ConsentAction::ManageCookies);
    assert_eq!(before, ConsentRecord::accept_all());
    assert!(controller.is_modal_open());

    controller.dispatch(ConsentAction::ToggleAnalytics(false));
    assert!(controller.is_modal_open());
    let saved = controller.dispatch(ConsentAction::Save);

    assert_eq!(saved, ConsentRecord::new(false, before.marketing()));
    assert!(!controller.is_modal_open());
    assert_eq!(persisted(&jar), Some(encode_envelope(&saved).expect("encode")));
}

#[test]
fn toggle_is_kept_when_modal_is_dismissed_by_outside_click() {
    let jar = seeded_jar(ConsentRecord::decline_all());
    let mut controller = controller(jar.clone());

    controller.dispatch(ConsentAction::ManageCookies);
    controller.dispatch(ConsentAction::ToggleMarketing(true));
    let record = controller.dispatch(ConsentAction::Dismiss(DismissReason::ClickOutside));

    assert_eq!(record, ConsentRecord::new(false, true));
    assert!(!controller.is_modal_open());
    assert_eq!(persisted(&jar), Some(encode_envelope(&record).expect("encode")));
}

#[test]
fn cancel_key_closes_modal_without_changing_consent() {
    let mut controller = controller(seeded_jar(ConsentRecord::new(true, false)));
    controller.dispatch(ConsentAction::ManageCookies);
    let record = controller.dispatch(ConsentAction::Dismiss(DismissReason::CancelKey));
    assert_eq!(record, ConsentRecord::new(true, false));
    assert!(!controller.is_modal_open());
}

#[test]
fn toggles_are_ignored_while_modal_is_closed() {
    let jar = MemoryCookieJar::new();
    let mut controller = controller(jar.clone());

    let record = controller.dispatch(ConsentAction::ToggleAnalytics(false));

    assert_eq!(record, ConsentRecord::accept_all());
    assert_eq!(persisted(&jar), None);
}

#[test]
fn essentials_stays_granted_through_every_action() {
    let mut controller = controller(MemoryCookieJar::new());
    let mut events = controller.subscribe();
    let actions = [
        ConsentAction::DeclineAll,
        ConsentAction::ManageCookies,
        ConsentAction::ToggleAnalytics(true),
        ConsentAction::ToggleMarketing(false),
        ConsentAction::Save,
        ConsentAction::ManageCookies,
        ConsentAction::ToggleMarketing(true),
        ConsentAction::Dismiss(DismissReason::CancelKey),
        ConsentAction::AcceptAll,
    ];

    for action in actions {
        assert!(controller.dispatch(action).essentials(), "{action:?}");
    }
    controller.request_consent_update(ConsentUpdate {
        analytics: Some(false),
        marketing: Some(false),
    });

    while let Ok(event) = events.try_recv() {
        assert!(event.record().essentials());
    }
    assert!(controller.consent().essentials());
}

#[test]
fn request_update_merges_partial_values() {
    let jar = MemoryCookieJar::new();
    let mut controller = controller(jar.clone());

    let record = controller.request_consent_update(ConsentUpdate::marketing(false));
    assert_eq!(record, ConsentRecord::new(true, false));

    let record = controller.request_consent_update(ConsentUpdate::default());
    assert_eq!(record, ConsentRecord::new(true, false));
    assert_eq!(persisted(&jar), Some(encode_envelope(&record).expect("encode")));
}

#[test]
fn every_accepted_change_is_published() {
    let mut controller = controller(MemoryCookieJar::new());
    let mut events = controller.subscribe();

    controller.dispatch(ConsentAction::DeclineAll);
    controller.dispatch(ConsentAction::ManageCookies);
    controller.dispatch(ConsentAction::ToggleAnalytics(true));

    assert_eq!(
        events.try_recv().expect("decline"),
        ConsentEvent::Changed {
            record: ConsentRecord::decline_all(),
            origin: ChangeOrigin::Local,
        }
    );
    assert_eq!(
        events.try_recv().expect("toggle").record(),
        ConsentRecord::new(true, false)
    );
    assert!(events.try_recv().is_err());
}

#[test]
fn failed_write_keeps_in_memory_record() {
    let mut store = ConsentStore::with_defaults(FailingJar);
    store.write(ConsentRecord::decline_all());
    assert_eq!(store.consent(), ConsentRecord::decline_all());
    assert_eq!(store.read(), ConsentRecord::default());
}

#[test]
fn external_change_for_tracked_key_is_adopted() {
    let mut store = ConsentStore::with_defaults(MemoryCookieJar::new());
    let raw = encode_envelope(&ConsentRecord::decline_all()).expect("encode");

    assert!(store.apply_external_change(&StorageChange::updated(DEFAULT_CONSENT_COOKIE, raw)));
    assert_eq!(store.consent(), ConsentRecord::decline_all());
}

#[test]
fn external_change_for_other_key_is_ignored() {
    let mut store = ConsentStore::with_defaults(seeded_jar(ConsentRecord::decline_all()));
    assert!(!store.apply_external_change(&StorageChange::removed("theme")));
    assert_eq!(store.consent(), ConsentRecord::decline_all());
}

#[test]
fn undecodable_external_change_falls_back_to_default() {
    let mut store = ConsentStore::with_defaults(seeded_jar(ConsentRecord::decline_all()));
    let mut events = store.subscribe();

    assert!(store.apply_external_change(&StorageChange::updated(
        DEFAULT_CONSENT_COOKIE,
        "%zz-not-json"
    )));

    assert_eq!(store.consent(), ConsentRecord::default());
    assert_eq!(
        events.try_recv().expect("event"),
        ConsentEvent::Changed {
            record: ConsentRecord::default(),
            origin: ChangeOrigin::External,
        }
    );
}

#[test]
fn external_removal_falls_back_to_default() {
    let mut store = ConsentStore::with_defaults(seeded_jar(ConsentRecord::decline_all()));
    store.apply_external_change(&StorageChange::removed(DEFAULT_CONSENT_COOKIE));
    assert_eq!(store.consent(), ConsentRecord::default());
}

#[test]
fn other_tab_adopts_decision_after_polling() {
    let hub = StorageChangeHub::default();
    let jar = MemoryCookieJar::new().with_change_hub(hub.clone());
    let mut first_tab = controller(jar.clone());
    let mut second_tab = controller(jar);
    second_tab.store_mut().attach(&hub);

    first_tab.dispatch(ConsentAction::DeclineAll);
    assert_eq!(second_tab.consent(), ConsentRecord::accept_all());

    assert_eq!(second_tab.poll_external_changes(), 1);
    assert_eq!(second_tab.consent(), ConsentRecord::decline_all());
    assert_eq!(second_tab.poll_external_changes(), 0);
}

#[test]
fn latest_external_change_wins() {
    let hub = StorageChangeHub::default();
    let mut store = ConsentStore::with_defaults(MemoryCookieJar::new());
    store.attach(&hub);

    for record in [
        ConsentRecord::decline_all(),
        ConsentRecord::new(true, false),
        ConsentRecord::new(false, true),
    ] {
        let raw = encode_envelope(&record).expect("encode");
        hub.publish(StorageChange::updated(DEFAULT_CONSENT_COOKIE, raw));
    }

    assert_eq!(store.poll_external_changes(), 3);
    assert_eq!(store.consent(), ConsentRecord::new(false, true));
}

#[test]
fn lagged_subscription_recovers_from_jar() {
    let hub = StorageChangeHub::new(1);
    let jar = MemoryCookieJar::new().with_change_hub(hub.clone());
    let mut writer = ConsentStore::with_defaults(jar.clone());
    let mut reader = ConsentStore::with_defaults(jar);
    reader.attach(&hub);

    writer.write(ConsentRecord::decline_all());
    writer.write(ConsentRecord::new(true, false));
    writer.write(ConsentRecord::new(false, true));

    assert!(reader.poll_external_changes() >= 1);
    assert_eq!(reader.consent(), ConsentRecord::new(false, true));
}

#[test]
fn closed_source_detaches_store() {
    let hub = StorageChangeHub::default();
    let mut store = ConsentStore::with_defaults(MemoryCookieJar::new());
    store.attach(&hub);
    drop(hub);

    assert_eq!(store.poll_external_changes(), 0);
    assert!(!store.is_attached());
}

#[test]
fn reload_adopts_jar_contents() {
    let jar = MemoryCookieJar::new();
    let mut store = ConsentStore::with_defaults(jar.clone());
    let line = format!(
        "{DEFAULT_CONSENT_COOKIE}={}",
        encode_envelope(&ConsentRecord::decline_all()).expect("encode")
    );
    jar.set_cookie(&line).expect("external write");

    assert_eq!(store.reload(), ConsentRecord::decline_all());
}

#[test]
fn modal_view_locks_essentials() {
    let mut controller = controller(seeded_jar(ConsentRecord::new(false, true)));
    assert!(controller.modal().is_none());

    controller.dispatch(ConsentAction::ManageCookies);
    let view = controller.modal().expect("open modal");
    let essentials = view.toggle(ConsentCategory::Essentials).expect("essentials");
    assert!(essentials.enabled && essentials.locked);
    let analytics = view.toggle(ConsentCategory::Analytics).expect("analytics");
    assert!(!analytics.enabled && !analytics.locked);
    assert!(view.toggle(ConsentCategory::Marketing).expect("marketing").enabled);

    let json = serde_json::to_value(&view).expect("json");
    assert_eq!(json["toggles"][0]["category"], "essentials");
}

#[test]
fn custom_key_and_options_are_used_for_writes() {
    let jar = MemoryCookieJar::new();
    let options = CookieOptions {
        max_age: Some(-1),
        ..CookieOptions::default()
    };
    let mut store = ConsentStore::open(jar.clone(), "consent_v2", ConsentRecord::default(), options);

    store.write(ConsentRecord::decline_all());

    assert_eq!(store.key(), "consent_v2");
    assert_eq!(store.consent(), ConsentRecord::decline_all());
    assert!(!store.is_persisted());
}

#[test]
fn own_writes_are_not_adopted_as_external_changes() {
    let hub = StorageChangeHub::default();
    let mut controller = controller(MemoryCookieJar::new().with_change_hub(hub.clone()));
    controller.store_mut().attach(&hub);
    let mut events = controller.subscribe();

    controller.dispatch(ConsentAction::DeclineAll);

    assert_eq!(controller.poll_external_changes(), 0);
    assert_eq!(controller.consent(), ConsentRecord::decline_all());
    assert_eq!(
        events.try_recv().expect("decline"),
        ConsentEvent::Changed {
            record: ConsentRecord::decline_all(),
            origin: ChangeOrigin::Local,
        }
    );
    assert!(events.try_recv().is_err());
}

#[test]
fn lag_caused_by_own_writes_adopts_nothing() {
    let hub = StorageChangeHub::new(1);
    let mut store =
        ConsentStore::with_defaults(MemoryCookieJar::new().with_change_hub(hub.clone()));
    store.attach(&hub);
    let mut events = store.subscribe();

    store.write(ConsentRecord::decline_all());
    store.write(ConsentRecord::new(true, false));
    store.write(ConsentRecord::new(false, true));

    assert_eq!(store.poll_external_changes(), 0);
    assert_eq!(store.consent(), ConsentRecord::new(false, true));

    let mut origins = Vec::new();
    while let Ok(event) = events.try_recv() {
        let ConsentEvent::Changed { origin, .. } = event;
        origins.push(origin);
    }
    assert_eq!(origins, vec![ChangeOrigin::Local; 3]);
}
