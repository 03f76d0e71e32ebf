pub(crate) mod browser;
mod clients {
    pub mod console;
    pub mod telegram;
}
mod storage {
    pub mod fs_store;
}

pub use browser::{
    chromium::ChromiumLauncher, click_in_any_frame, ElementQuery, FrameRef, Launcher, Surface,
};
pub use clients::{console::ConsoleNotifier, telegram::TelegramClient};
pub use storage::fs_store::FileStateStore;
