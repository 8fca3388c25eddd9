//! File browser widget for picking tracks to load onto a deck

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{
        Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget,
        Widget,
    },
};
use std::path::{Path, PathBuf};

/// State for the browser widget
#[derive(Debug, Clone, Default)]
pub struct BrowserState {
    /// Folder currently listed
    pub folder: Option<PathBuf>,
    /// Audio files in the folder, sorted
    pub entries: Vec<PathBuf>,
    pub selected_index: usize,
    pub scroll_offset: usize,
}

impl BrowserState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the listing with the contents of a new folder
    pub fn set_entries(&mut self, folder: PathBuf, entries: Vec<PathBuf>) {
        self.folder = Some(folder);
        self.entries = entries;
        self.selected_index = 0;
        self.scroll_offset = 0;
    }

    pub fn select_next(&mut self) {
        let count = self.entries.len();
        if count > 0 && self.selected_index < count - 1 {
            self.selected_index += 1;
        }
    }

    pub fn select_prev(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
        }
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
        self.scroll_offset = 0;
    }

    pub fn select_last(&mut self) {
        if !self.entries.is_empty() {
            self.selected_index = self.entries.len() - 1;
        }
    }

    /// Currently highlighted file
    pub fn selected(&self) -> Option<&Path> {
        self.entries.get(self.selected_index).map(PathBuf::as_path)
    }

    /// Keep the selection visible
    fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected_index >= self.scroll_offset + visible_height {
            self.scroll_offset = self.selected_index - visible_height + 1;
        }
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        }
    }
}

/// Widget listing the audio files of one folder
pub struct BrowserWidget<'a> {
    state: &'a mut BrowserState,
    theme: &'a Theme,
    is_focused: bool,
}

impl<'a> BrowserWidget<'a> {
    pub fn new(state: &'a mut BrowserState, theme: &'a Theme) -> Self {
        Self {
            state,
            theme,
            is_focused: false,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.is_focused = focused;
        self
    }

    fn entry_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }
}

impl Widget for BrowserWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let folder = self
            .state
            .folder
            .as_ref()
            .map(|f| f.display().to_string())
            .unwrap_or_else(|| "no folder".to_string());
        let title = format!(" FILES [{}] {} ", self.state.entries.len(), folder);

        let border_style = if self.is_focused {
            self.theme.border_active()
        } else {
            self.theme.border()
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Span::styled(title, self.theme.title()));

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.height < 1 || inner.width < 10 {
            return;
        }

        if self.state.entries.is_empty() {
            let hint = Line::from(Span::styled(
                "No audio files here - :cd <folder> to browse",
                self.theme.dim(),
            ));
            Paragraph::new(hint).render(inner, buf);
            return;
        }

        let list_width = inner.width.saturating_sub(1);
        let list_height = inner.height as usize;
        self.state.update_scroll(list_height);
        let scroll_offset = self.state.scroll_offset;

        for (i, path) in self
            .state
            .entries
            .iter()
            .skip(scroll_offset)
            .take(list_height)
            .enumerate()
        {
            let is_selected = scroll_offset + i == self.state.selected_index;
            let style = if is_selected {
                self.theme.highlight()
            } else {
                self.theme.normal()
            };
            let name: String = Self::entry_name(path)
                .chars()
                .take(list_width as usize)
                .collect();
            let row = Rect::new(inner.x, inner.y + i as u16, list_width, 1);
            Paragraph::new(Line::from(Span::styled(name, style))).render(row, buf);
        }

        if self.state.entries.len() > list_height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight);
            let mut scrollbar_state =
                ScrollbarState::new(self.state.entries.len()).position(scroll_offset);
            let scrollbar_area = Rect::new(inner.x + inner.width - 1, inner.y, 1, inner.height);
            StatefulWidget::render(scrollbar, scrollbar_area, buf, &mut scrollbar_state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> BrowserState {
        let mut state = BrowserState::new();
        state.set_entries(
            PathBuf::from("/music"),
            vec![
                PathBuf::from("/music/a.mp3"),
                PathBuf::from("/music/b.wav"),
                PathBuf::from("/music/c.flac"),
            ],
        );
        state
    }

    #[test]
    fn test_browser_navigation() {
        let mut state = listing();
        assert_eq!(state.selected_index, 0);

        state.select_next();
        state.select_next();
        state.select_next();
        assert_eq!(state.selected_index, 2);

        state.select_prev();
        assert_eq!(state.selected(), Some(Path::new("/music/b.wav")));

        state.select_first();
        assert_eq!(state.selected_index, 0);
        state.select_last();
        assert_eq!(state.selected_index, 2);
    }

    #[test]
    fn test_empty_browser_has_no_selection() {
        let mut state = BrowserState::new();
        state.select_next();
        state.select_last();
        assert_eq!(state.selected_index, 0);
        assert!(state.selected().is_none());
    }

    #[test]
    fn test_scroll_follows_selection() {
        let mut state = listing();
        state.select_last();
        state.update_scroll(2);
        assert_eq!(state.scroll_offset, 1);
        state.select_first();
        state.update_scroll(2);
        assert_eq!(state.scroll_offset, 0);
    }

    #[test]
    fn test_render_lists_file_names() {
        let theme = Theme::default();
        let mut state = listing();
        let area = Rect::new(0, 0, 30, 6);
        let mut buf = Buffer::empty(area);
        BrowserWidget::new(&mut state, &theme).render(area, &mut buf);

        let row: String = (1..29u16).map(|x| buf[(x, 1u16)].symbol().to_string()).collect();
        assert!(row.starts_with("a.mp3"));
    }
}
