//! Sticky notes built on the `sticky-core` runtime.
//!
//! A [`StickyBoard`] owns the open notes. Each note is a [`NoteSession`]
//! that edits one file of a [`Vault`] and saves typed text through a
//! debouncer. User-facing messages go through a [`Notifier`] that folds
//! repeats and bursts. Everything runs on the single runtime thread; hosts
//! supply the vault, the settings store, the window host and the notice
//! sink.

pub mod board;
pub mod naming;
pub mod notice;
pub mod services;
pub mod session;
pub mod settings;
pub mod vault;

pub use board::{
    grid_layout, BoardError, HeadlessWindows, NoteId, Opened, StickyBoard, WindowEvent, WindowHost,
    WindowId, WindowRect, WindowSize,
};
pub use notice::{LogSink, NoticeSink, Notifier, RecordingSink};
pub use services::NoteServices;
pub use session::{NoteSession, SessionError, SessionState};
pub use settings::{
    JsonFileStore, MemorySettingsStore, SettingsError, SettingsStore, StickyNoteSettings,
};
pub use vault::{FsVault, MemoryVault, NotePath, Vault, VaultError};
