use ratatui::style::{Modifier, Style};
use ratatui::widgets::Borders;

/// Visual settings of the popup menu.
#[derive(Clone, Debug)]
pub struct PopupMenuStyle<'a> {
    pub block_style: Style,
    pub border_style: Style,
    pub highlight_style: Style,
    pub shortcut_style: Style,
    pub separator_style: Style,
    pub highlight_symbol: &'a str,
    pub borders: Borders,
    /// Show the submenu title in the border of nested panels.
    pub show_titles: bool,
}

impl Default for PopupMenuStyle<'_> {
    fn default() -> Self {
        Self {
            block_style: Style::default(),
            border_style: Style::default(),
            highlight_style: Style::default().add_modifier(Modifier::REVERSED),
            shortcut_style: Style::default().add_modifier(Modifier::DIM),
            separator_style: Style::default().add_modifier(Modifier::DIM),
            highlight_symbol: "",
            borders: Borders::ALL,
            show_titles: true,
        }
    }
}
