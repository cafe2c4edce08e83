use super::*;
use crate::notice::RecordingSink;
use crate::settings::{MemorySettingsStore, StickyNoteSettings};
use crate::vault::{MemoryVault, Vault};
use sticky_testing::{ms, TestRuntime};

struct Fixture {
    runtime: TestRuntime,
    vault: Rc<MemoryVault>,
    store: Rc<MemorySettingsStore>,
    sink: Rc<RecordingSink>,
    services: NoteServices,
}

fn fixture() -> Fixture {
    let runtime = TestRuntime::new();
    let vault = Rc::new(
        MemoryVault::new()
            .with_note("Sticky/today.md", "# today\n")
            .with_note("Sticky/other.md", "# other\n"),
    );
    let store = Rc::new(MemorySettingsStore::new());
    let sink = Rc::new(RecordingSink::new());
    let services = NoteServices::with_settings(
        &runtime.handle(),
        vault.clone(),
        store.clone(),
        sink.clone(),
        StickyNoteSettings::default(),
    );
    Fixture {
        runtime,
        vault,
        store,
        sink,
        services,
    }
}

fn today() -> NotePath {
    NotePath::new("Sticky/today.md")
}

fn read(vault: &MemoryVault, path: &str) -> String {
    vault.read(&NotePath::new(path)).unwrap()
}

#[test]
fn typing_burst_saves_latest_text_once() {
    let f = fixture();
    let session = NoteSession::open(&f.services, today()).unwrap();

    assert_eq!(session.edit("a"), Invoke::Scheduled);
    f.runtime.advance_to(ms(200));
    assert_eq!(session.edit("ab"), Invoke::Coalesced);
    f.runtime.advance_to(ms(400));
    session.edit("abc");
    assert!(session.has_unsaved_changes());

    f.runtime.advance_to(ms(1_399));
    assert_eq!(read(&f.vault, "Sticky/today.md"), "# today\n");
    f.runtime.advance_to(ms(1_400));

    assert_eq!(read(&f.vault, "Sticky/today.md"), "abc");
    assert_eq!(f.vault.writes(), 1);
    assert!(!session.has_unsaved_changes());
}

#[test]
fn set_content_replaces_pending_auto_save() {
    let f = fixture();
    let session = NoteSession::open(&f.services, today()).unwrap();

    session.edit("draft");
    session.set_content("final").unwrap();
    f.runtime.advance_by(ms(5_000));

    assert_eq!(session.content().unwrap(), "final");
    assert_eq!(f.vault.writes(), 1);
}

#[test]
fn leaving_raw_mode_saves_pending_edits() {
    let f = fixture();
    let session = NoteSession::open(&f.services, today()).unwrap();

    session.toggle_edit_mode(true);
    session.edit("typed in raw mode");
    session.toggle_edit_mode(false);

    assert_eq!(read(&f.vault, "Sticky/today.md"), "typed in raw mode");
    assert!(!session.state().is_edit_mode);
    f.runtime.advance_by(ms(500));
    assert_eq!(
        f.sink.messages(),
        vec!["✨ Switched to Live Preview Mode".to_owned()]
    );
}

#[test]
fn entering_raw_mode_keeps_edits_pending() {
    let f = fixture();
    let session = NoteSession::open(&f.services, today()).unwrap();

    session.edit("still typing");
    session.toggle_edit_mode(true);

    assert!(session.has_unsaved_changes());
    assert_eq!(f.vault.writes(), 0);
}

#[test]
fn display_text_reflects_state() {
    let f = fixture();
    let session = NoteSession::new(&f.services);
    assert_eq!(session.display_text(), "Sticky Note [LIVE]");

    session.set_file(today()).unwrap();
    session.toggle_edit_mode(true);
    session.toggle_pin(true);
    session.toggle_favorite(true).unwrap();

    assert_eq!(session.display_text(), "today [RAW] 📌 ⭐");
    session.toggle_pin(false);
    assert_eq!(session.display_text(), "today [RAW] ⭐");
}

#[test]
fn favorites_persist_across_sessions() {
    let f = fixture();

    let detached = NoteSession::new(&f.services);
    detached.toggle_favorite(true).unwrap();
    assert_eq!(f.store.saves(), 0);
    assert!(!detached.state().is_favorited);

    let session = NoteSession::open(&f.services, today()).unwrap();
    session.toggle_favorite(true).unwrap();
    session.toggle_favorite(true).unwrap();
    assert_eq!(
        f.services.settings().favorite_files,
        vec!["Sticky/today.md".to_owned()]
    );
    assert_eq!(f.store.saves(), 2);
    assert!(f.store.json().unwrap().contains("Sticky/today.md"));

    let reopened = NoteSession::open(&f.services, today()).unwrap();
    assert!(reopened.state().is_favorited);

    reopened.toggle_favorite(false).unwrap();
    assert!(f.services.settings().favorite_files.is_empty());
}

#[test]
fn failed_favorite_save_changes_nothing() {
    let f = fixture();
    let session = NoteSession::open(&f.services, today()).unwrap();
    f.store.set_read_only(true);

    assert!(matches!(
        session.toggle_favorite(true),
        Err(SessionError::Settings(_))
    ));

    assert!(!session.state().is_favorited);
    assert!(f.services.settings().favorite_files.is_empty());
    assert_eq!(f.store.saves(), 0);
    assert_eq!(session.display_text(), "today [LIVE]");

    f.store.set_read_only(false);
    session.toggle_favorite(true).unwrap();
    assert!(session.state().is_favorited);
    assert_eq!(f.store.saves(), 1);
}

#[test]
fn failed_auto_save_is_reported() {
    let f = fixture();
    let session = NoteSession::open(&f.services, today()).unwrap();
    f.vault.set_read_only(true);

    session.edit("lost");
    f.runtime.advance_by(ms(1_000));
    assert!(!session.has_unsaved_changes());
    f.runtime.advance_by(ms(500));

    assert_eq!(
        f.sink.last().as_deref(),
        Some("❌ Failed to save today")
    );
    assert_eq!(read(&f.vault, "Sticky/today.md"), "# today\n");
}

#[test]
fn close_saves_and_stops_auto_save() {
    let f = fixture();
    let session = NoteSession::open(&f.services, today()).unwrap();

    session.edit("bye");
    session.close();
    session.close();

    assert!(session.is_closed());
    assert_eq!(read(&f.vault, "Sticky/today.md"), "bye");
    assert_eq!(session.edit("after close"), Invoke::Disposed);
    assert!(matches!(
        session.set_content("after close"),
        Err(SessionError::Closed)
    ));
    f.runtime.advance_by(ms(5_000));
    assert_eq!(read(&f.vault, "Sticky/today.md"), "bye");
}

#[test]
fn switching_files_saves_edits_to_the_previous_file() {
    let f = fixture();
    let session = NoteSession::open(&f.services, today()).unwrap();

    session.toggle_edit_mode(true);
    session.edit("today edited");
    session.set_file(NotePath::new("Sticky/other.md")).unwrap();

    assert_eq!(read(&f.vault, "Sticky/today.md"), "today edited");
    assert_eq!(read(&f.vault, "Sticky/other.md"), "# other\n");
    assert!(!session.state().is_edit_mode);
    assert_eq!(session.content().unwrap(), "# other\n");
}

#[test]
fn missing_file_is_rejected_and_state_kept() {
    let f = fixture();
    let session = NoteSession::open(&f.services, today()).unwrap();

    let err = session
        .set_file(NotePath::new("Sticky/missing.md"))
        .unwrap_err();

    assert!(matches!(err, SessionError::Vault(VaultError::NotFound(_))));
    assert_eq!(session.file(), Some(today()));
}

#[test]
fn detached_session_has_no_content_to_write() {
    let f = fixture();
    let session = NoteSession::new(&f.services);

    assert_eq!(session.content().unwrap(), "");
    assert!(matches!(session.set_content("x"), Err(SessionError::NoFile)));
    session.edit("nowhere to go");
    f.runtime.advance_by(ms(2_000));
    assert_eq!(f.vault.writes(), 0);
}
