use std::cell::Cell;
use std::error::Error;
use std::path::PathBuf;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use sticky_core::{FrameBatcher, Throttler};
use sticky_notes::{
    FsVault, HeadlessWindows, JsonFileStore, LogSink, MemorySettingsStore, MemoryVault,
    NoteServices, SettingsStore, StickyBoard, Vault, WindowSize,
};
use sticky_runtime_std::StdRuntime;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const KEYSTROKE_INTERVAL: Duration = Duration::from_millis(40);
const SCREEN: WindowSize = WindowSize {
    width: 1920,
    height: 1080,
};
const TYPED_TEXT: &str = "Buy milk, call the plumber, water the plants.";

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    println!("=== Sticky Notes Demo ===");
    println!("Types into a new sticky note and lets the debounced auto-save write it.");
    println!("Pass a directory to keep the notes on disk; RUST_LOG=debug shows timers.");
    println!();

    let runtime = StdRuntime::new();
    let (vault, store): (Rc<dyn Vault>, Rc<dyn SettingsStore>) =
        match std::env::args().nth(1).map(PathBuf::from) {
            Some(root) => {
                std::fs::create_dir_all(&root)?;
                let store = JsonFileStore::new(root.join(".sticky").join("data.json"));
                (Rc::new(FsVault::new(root)), Rc::new(store))
            }
            None => (
                Rc::new(MemoryVault::new()),
                Rc::new(MemorySettingsStore::new()),
            ),
        };
    let services = NoteServices::load(
        &runtime.runtime_handle(),
        vault,
        store,
        Rc::new(LogSink),
    )?;
    let mut board = StickyBoard::new(services, HeadlessWindows::new());

    let id = board.create_new_note()?;
    let session = board
        .session(id)
        .ok_or("new note is not on the board")?;
    session.toggle_edit_mode(true);

    // Preview redraws at most once per frame, the status line at most 4x/s.
    let redraws = Rc::new(Cell::new(0u32));
    let preview = {
        let redraws = redraws.clone();
        FrameBatcher::new(&runtime.runtime_handle(), move |text: String| {
            redraws.set(redraws.get() + 1);
            log::debug!("preview: {} chars", text.len());
        })
    };
    let status = Throttler::new(
        &runtime.runtime_handle(),
        Duration::from_millis(250),
        |words: usize| println!("  status: {words} words"),
    );

    let mut typed = String::new();
    for ch in TYPED_TEXT.chars() {
        typed.push(ch);
        session.edit(typed.clone());
        preview.invoke(typed.clone());
        status.invoke(typed.split_whitespace().count());
        runtime.pump();
        thread::sleep(KEYSTROKE_INTERVAL);
    }
    println!("typed {} keystrokes, preview redrawn {} times", typed.len(), redraws.get());

    if !runtime.run_until_idle(FRAME_INTERVAL, Duration::from_secs(5)) {
        log::warn!("runtime did not settle");
    }
    println!("saved content: {:?}", session.content()?);
    println!("title: {}", session.display_text());

    session.toggle_edit_mode(false);
    board.open(None)?;
    board.open(None)?;
    for (note, rect) in board.organize(SCREEN) {
        println!("  {note} at ({}, {}) {}x{}", rect.x, rect.y, rect.width, rect.height);
    }
    board.focus_next();

    let closed = board.close_all(false);
    runtime.run_until_idle(FRAME_INTERVAL, Duration::from_secs(5));
    println!("closed {closed} notes");
    Ok(())
}
