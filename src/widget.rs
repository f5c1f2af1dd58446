use ratatui::layout::{Constraint, Rect};
use ratatui::prelude::Buffer;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Cell, Clear, Row, StatefulWidget, Table, Widget};

use crate::glyphs::MenuGlyphs;
use crate::retained::MenuEntry;
use crate::state::{MenuPanel, PopupMenuState};
use crate::style::PopupMenuStyle;
use crate::toolkit::{Menu, MenuAction};

const COLUMN_SPACING: u16 = 2;

/// Cascading popup menu (one bordered table per open panel).
pub struct PopupMenu<'a> {
    style: PopupMenuStyle<'a>,
    glyphs: MenuGlyphs<'a>,
}

impl Default for PopupMenu<'_> {
    fn default() -> Self {
        Self::new(PopupMenuStyle::default())
    }
}

impl<'a> PopupMenu<'a> {
    pub const fn new(style: PopupMenuStyle<'a>) -> Self {
        Self {
            style,
            glyphs: MenuGlyphs::unicode(),
        }
    }

    pub const fn glyphs(mut self, glyphs: MenuGlyphs<'a>) -> Self {
        self.glyphs = glyphs;
        self
    }

    fn block(&self, panel: &MenuPanel, nested: bool) -> Block<'a> {
        let mut block = Block::default()
            .borders(self.style.borders)
            .style(self.style.block_style)
            .border_style(self.style.border_style);
        if nested && self.style.show_titles && !panel.title.is_empty() {
            block = block.title(Line::from(panel.title.clone()));
        }
        block
    }

    /// Returns the label and trailing column texts of one entry.
    fn columns(&self, entry: &MenuEntry) -> Option<(String, String)> {
        match entry {
            MenuEntry::Action(action) => Some((
                action.label(),
                action
                    .shortcut()
                    .map(|shortcut| shortcut.to_string())
                    .unwrap_or_default(),
            )),
            MenuEntry::Menu(menu) => Some((menu.title(), self.glyphs.submenu.to_owned())),
            MenuEntry::Separator => None,
        }
    }

    fn column_widths(&self, entries: &[MenuEntry]) -> (u16, u16) {
        let mut label_width = 0;
        let mut trailing_width = 0;
        for (label, trailing) in entries.iter().filter_map(|entry| self.columns(entry)) {
            label_width = label_width.max(Span::raw(label).width());
            trailing_width = trailing_width.max(Span::raw(trailing).width());
        }
        (saturate(label_width), saturate(trailing_width))
    }

    fn build_rows(&self, entries: &[MenuEntry], widths: (u16, u16)) -> Vec<Row<'a>> {
        let (label_width, trailing_width) = widths;
        let mut rows = Vec::with_capacity(entries.len());
        for entry in entries {
            let row = match self.columns(entry) {
                Some((label, trailing)) => {
                    let trailing = Line::from(Span::styled(trailing, self.style.shortcut_style))
                        .right_aligned();
                    Row::new([Cell::from(label), Cell::from(trailing)])
                }
                None => {
                    let rule = |width: u16| self.glyphs.separator.repeat(usize::from(width));
                    Row::new([Cell::from(rule(label_width)), Cell::from(rule(trailing_width))])
                        .style(self.style.separator_style)
                }
            };
            rows.push(row);
        }
        rows
    }
}

/// Sizes a panel and places it at `origin`, clamped to `area`.
fn place_panel(block: &Block<'_>, origin: (u16, u16), content: (u16, u16), area: Rect) -> Rect {
    let outer = Rect::new(0, 0, u16::MAX / 2, u16::MAX / 2);
    let inner = block.inner(outer);
    let frame_width = outer.width - inner.width;
    let frame_height = outer.height - inner.height;

    let width = content.0.saturating_add(frame_width).min(area.width);
    let height = content.1.saturating_add(frame_height).min(area.height);
    let x = origin.0.clamp(area.x, area.right().saturating_sub(width));
    let y = origin.1.clamp(area.y, area.bottom().saturating_sub(height));
    Rect::new(x, y, width, height)
}

fn saturate(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

impl StatefulWidget for PopupMenu<'_> {
    type State = PopupMenuState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let symbol_width = saturate(Span::raw(self.style.highlight_symbol).width());
        let mut origin = (state.anchor().x, state.anchor().y);

        for (depth, panel) in state.panels_mut().iter_mut().enumerate() {
            let widths = self.column_widths(&panel.entries);
            let content_width = symbol_width
                .saturating_add(widths.0)
                .saturating_add(COLUMN_SPACING)
                .saturating_add(widths.1);
            let content_height = saturate(panel.entries.len());

            let block = self.block(panel, depth > 0);
            let rect = place_panel(&block, origin, (content_width, content_height), area);
            let rows_area = block.inner(rect);

            let rows = self.build_rows(&panel.entries, widths);
            let table = Table::new(
                rows,
                [Constraint::Length(widths.0), Constraint::Length(widths.1)],
            )
            .column_spacing(COLUMN_SPACING)
            .style(self.style.block_style)
            .block(block)
            .row_highlight_style(self.style.highlight_style)
            .highlight_symbol(self.style.highlight_symbol);

            Widget::render(Clear, rect, buf);
            StatefulWidget::render(table, rect, buf, &mut panel.table);
            panel.area = rect;
            panel.rows_area = rows_area;

            // The next panel opens to the right, level with the selected row.
            let selected_row = panel
                .table
                .selected()
                .map_or(0, |idx| idx.saturating_sub(panel.table.offset()));
            origin = (
                rect.right(),
                rows_area.y.saturating_add(saturate(selected_row)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use ratatui::layout::Position;

    use super::*;
    use crate::retained::Retained;
    use crate::shortcut::{Shortcut, ShortcutScope};
    use crate::toolkit::Toolkit;

    fn row_text(buffer: &Buffer, y: u16) -> String {
        (buffer.area.x..buffer.area.right())
            .map(|x| buffer[(x, y)].symbol())
            .collect()
    }

    #[test]
    fn renders_entries_and_separator() {
        let menu = Retained::new().root_menu();
        menu.add_action("Download")
            .set_shortcut(Shortcut::from("Ctrl+D"), ShortcutScope::Widget);
        let submit = menu.add_action("Submit");
        menu.insert_separator(&submit);

        let mut state = PopupMenuState::new();
        state.open(&menu, Position::new(1, 1));

        let area = Rect::new(0, 0, 30, 8);
        let mut buffer = Buffer::empty(area);
        PopupMenu::default().render(area, &mut buffer, &mut state);

        assert!(row_text(&buffer, 2).contains("Download"));
        assert!(row_text(&buffer, 2).contains("Ctrl+D"));
        assert!(row_text(&buffer, 3).contains("──"));
        assert!(row_text(&buffer, 4).contains("Submit"));
    }

    #[test]
    fn panels_are_clamped_and_cascade() {
        let menu = Retained::new().root_menu();
        let vcs = menu.add_menu("Version Control");
        vcs.add_action("Check Out");

        let mut state = PopupMenuState::new();
        state.open(&menu, Position::new(25, 9));
        state.open_submenu();

        let area = Rect::new(0, 0, 40, 10);
        let mut buffer = Buffer::empty(area);
        PopupMenu::default()
            .glyphs(MenuGlyphs::ascii())
            .render(area, &mut buffer, &mut state);

        let panels = state.panels_mut();
        assert!(area.contains(panels[0].area.as_position()));
        assert_eq!(panels[0].area.bottom(), area.bottom());
        assert!(panels[1].area.x >= panels[0].area.x);
        assert!(panels[1].area.right() <= area.right());
    }

    #[test]
    fn oversized_labels_saturate_panel_width() {
        let menu = Retained::new().root_menu();
        menu.add_action(&"x".repeat(70_000))
            .set_shortcut(Shortcut::from("Ctrl+Shift+F12"), ShortcutScope::Widget);

        let mut state = PopupMenuState::new();
        state.open(&menu, Position::new(0, 0));

        let area = Rect::new(0, 0, 20, 4);
        let mut buffer = Buffer::empty(area);
        PopupMenu::default().render(area, &mut buffer, &mut state);

        assert_eq!(state.panels_mut()[0].area.width, area.width);
    }
}
