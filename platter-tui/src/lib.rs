//! Terminal UI for Platter - widgets, themes, and layout
//!
//! Provides a vintage CRT-style terminal interface for two decks and a mixer.

mod app;
mod theme;
pub mod widgets;

pub use app::{App, AppState, MessageType, PeakHold};
pub use theme::{Lamp, Theme, CRT_AMBER, CRT_GREEN, CYBERPUNK};
pub use widgets::status_bar::HelpWidget;
pub use widgets::{
    BrowserState, BrowserWidget, CrossfaderWidget, DeckWidget, MasterVuMeterWidget,
    StatusBarWidget, VisualizerWidget,
};
