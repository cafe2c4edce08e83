use std::cell::{Ref, RefCell};
use std::rc::Rc;

use sticky_core::RuntimeHandle;

use crate::notice::{NoticeSink, Notifier};
use crate::settings::{SettingsError, SettingsStore, StickyNoteSettings};
use crate::vault::Vault;

/// Host collaborators shared by every open note.
///
/// Cloning is cheap; all clones see the same settings and notifier.
#[derive(Clone)]
pub struct NoteServices {
    runtime: RuntimeHandle,
    vault: Rc<dyn Vault>,
    store: Rc<dyn SettingsStore>,
    settings: Rc<RefCell<StickyNoteSettings>>,
    notifier: Rc<Notifier>,
}

impl NoteServices {
    /// Loads settings from `store` and wires up the notifier.
    pub fn load(
        runtime: &RuntimeHandle,
        vault: Rc<dyn Vault>,
        store: Rc<dyn SettingsStore>,
        sink: Rc<dyn NoticeSink>,
    ) -> Result<Self, SettingsError> {
        let settings = store.load()?;
        Ok(Self::with_settings(runtime, vault, store, sink, settings))
    }

    pub fn with_settings(
        runtime: &RuntimeHandle,
        vault: Rc<dyn Vault>,
        store: Rc<dyn SettingsStore>,
        sink: Rc<dyn NoticeSink>,
        settings: StickyNoteSettings,
    ) -> Self {
        Self {
            runtime: runtime.clone(),
            vault,
            store,
            settings: Rc::new(RefCell::new(settings)),
            notifier: Rc::new(Notifier::new(runtime, sink)),
        }
    }

    pub fn runtime(&self) -> &RuntimeHandle {
        &self.runtime
    }

    pub fn vault(&self) -> &Rc<dyn Vault> {
        &self.vault
    }

    pub fn notifier(&self) -> &Rc<Notifier> {
        &self.notifier
    }

    pub fn settings(&self) -> Ref<'_, StickyNoteSettings> {
        self.settings.borrow()
    }

    /// Applies `update` to a copy of the settings and persists it. The
    /// in-memory settings only change once the save succeeds.
    pub fn update_settings(
        &self,
        update: impl FnOnce(&mut StickyNoteSettings),
    ) -> Result<(), SettingsError> {
        let mut updated = self.settings.borrow().clone();
        update(&mut updated);
        self.store.save(&updated)?;
        *self.settings.borrow_mut() = updated;
        Ok(())
    }

    pub fn notify(&self, message: &str) {
        self.notifier.show(message, false);
    }

    pub fn notify_forced(&self, message: &str) {
        self.notifier.show(message, true);
    }
}
