//! UI Widgets for Platter

mod browser;
mod crossfader;
mod deck;
pub mod status_bar;
mod visualizer;
mod vu_meter;

pub use browser::{BrowserState, BrowserWidget};
pub use crossfader::CrossfaderWidget;
pub use deck::DeckWidget;
pub use status_bar::StatusBarWidget;
pub use visualizer::VisualizerWidget;
pub use vu_meter::MasterVuMeterWidget;
