// Two-pane file browser: each pane hosts its own menu tree, both trees share one workspace context.
//
// Right click (or `m`) opens the context menu of a pane, Tab switches focus, shortcuts such as
// Ctrl+D, Ctrl+S and F5 fire in the focused pane. Library logs go to a file in the temp dir.
use std::cell::{Cell, RefCell};
use std::env;
use std::error::Error;
use std::fs::File;
use std::io;
use std::rc::Rc;
use std::sync::Mutex;

use chrono::Local;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseButton, MouseEventKind,
};
use crossterm::execute;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, List, ListState, Paragraph};
use ratatui::{DefaultTerminal, Frame};

use tui_menutree::prelude::*;

struct Pane {
    title: &'static str,
    files: Vec<String>,
    selected: Cell<usize>,
    area: Cell<Rect>,
}

impl Pane {
    fn new(title: &'static str, files: &[&str]) -> Self {
        Self {
            title,
            files: files.iter().map(|&file| file.to_owned()).collect(),
            selected: Cell::new(0),
            area: Cell::new(Rect::default()),
        }
    }

    fn selected_file(&self) -> Option<&str> {
        self.files.get(self.selected.get()).map(String::as_str)
    }

    fn move_selection(&self, delta: isize) {
        let last = self.files.len().saturating_sub(1);
        let next = self.selected.get().saturating_add_signed(delta).min(last);
        self.selected.set(next);
    }

    // Selects the row under a terminal cell and returns the pane-local point.
    fn select_at(&self, position: Position) -> Option<Point> {
        let area = self.area.get();
        if !area.contains(position) {
            return None;
        }
        let inner = Block::default().borders(Borders::ALL).inner(area);
        if inner.contains(position) {
            let row = usize::from(position.y - inner.y);
            if row < self.files.len() {
                self.selected.set(row);
            }
        }
        Some(Point::new(
            i32::from(position.x - area.x),
            i32::from(position.y - area.y),
        ))
    }

    // Pane-local point just below the selected row, used for keyboard-opened menus.
    fn selected_point(&self) -> Point {
        let row = i32::try_from(self.selected.get()).unwrap_or(i32::MAX);
        Point::new(2, row.saturating_add(2))
    }
}

// Shared application state handed to every callback and validator.
struct Workspace {
    panes: [Pane; 2],
    focus: Cell<usize>,
    log: RefCell<Vec<String>>,
}

impl Workspace {
    fn new() -> Self {
        Self {
            panes: [
                Pane::new(
                    "Depot",
                    &[
                        "D:/art/hero.psd",
                        "D:/art/villain.psd",
                        "//depot/main/levels/intro.map",
                        "//depot/main/scripts/boot.lua",
                    ],
                ),
                Pane::new(
                    "Local",
                    &["C:/work/notes.txt", "C:/work/todo.md", "C:/work/build.log"],
                ),
            ],
            focus: Cell::new(0),
            log: RefCell::new(Vec::new()),
        }
    }

    fn record(&self, message: impl AsRef<str>) {
        let stamp = Local::now().format("%H:%M:%S");
        self.log
            .borrow_mut()
            .push(format!("{stamp}  {}", message.as_ref()));
    }

    fn depot_file(&self) -> &str {
        self.panes[0].selected_file().unwrap_or("-")
    }

    fn local_file(&self) -> &str {
        self.panes[1].selected_file().unwrap_or("-")
    }
}

fn popup_style() -> PopupMenuStyle<'static> {
    PopupMenuStyle {
        block_style: Style::default()
            .fg(Color::Rgb(221, 227, 235))
            .bg(Color::Rgb(36, 42, 54)),
        border_style: Style::default().fg(Color::Rgb(92, 110, 140)),
        highlight_style: Style::default()
            .fg(Color::Rgb(255, 255, 255))
            .bg(Color::Rgb(52, 66, 96))
            .add_modifier(Modifier::BOLD),
        shortcut_style: Style::default().fg(Color::Rgb(136, 192, 208)),
        ..PopupMenuStyle::default()
    }
}

fn draw_workspace(frame: &mut Frame, workspace: &Workspace) {
    let [body, log_area, help_area] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(8),
        Constraint::Length(1),
    ])
    .areas(frame.area());
    let pane_areas: [Rect; 2] =
        Layout::horizontal([Constraint::Fill(1), Constraint::Fill(1)]).areas(body);

    for (idx, (pane, area)) in workspace.panes.iter().zip(pane_areas).enumerate() {
        pane.area.set(area);
        let focused = workspace.focus.get() == idx;
        let border = if focused {
            Style::default().fg(Color::Rgb(229, 201, 133))
        } else {
            Style::default().fg(Color::Rgb(92, 110, 140))
        };
        let list = List::new(pane.files.iter().map(String::as_str))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(pane.title),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        let mut list_state = ListState::default().with_selected(Some(pane.selected.get()));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    let log = workspace.log.borrow();
    let skip = log.len().saturating_sub(usize::from(log_area.height.saturating_sub(2)));
    let lines: Vec<Line> = log[skip..].iter().map(|entry| Line::from(entry.as_str())).collect();
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Activity")),
        log_area,
    );
    frame.render_widget(
        Line::from("right click / m: menu   tab: focus   up/down: select   q: quit"),
        help_area,
    );
}

// Runs a modal popup loop on the shared terminal while a menu is shown.
struct TerminalPresenter {
    terminal: Rc<RefCell<DefaultTerminal>>,
    workspace: Rc<Workspace>,
}

impl Presenter for TerminalPresenter {
    fn present(&mut self, menu: &RetainedMenu, at: Point) -> Option<RetainedAction> {
        let mut state = PopupMenuState::new();
        state.open(menu, at.into());
        let mut terminal = self.terminal.borrow_mut();

        loop {
            let drawn = terminal.draw(|frame| {
                draw_workspace(frame, &self.workspace);
                frame.render_stateful_widget(
                    PopupMenu::new(popup_style()),
                    frame.area(),
                    &mut state,
                );
            });
            if drawn.is_err() {
                return None;
            }

            let outcome = match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => state.handle_key(key),
                Ok(Event::Mouse(mouse)) if matches!(mouse.kind, MouseEventKind::Down(_)) => {
                    state.handle_click(Position::new(mouse.column, mouse.row))
                }
                Ok(_) => MenuEvent::Unhandled,
                Err(_) => return None,
            };
            match outcome {
                MenuEvent::Activated(action) => return Some(action),
                MenuEvent::Dismissed => return None,
                MenuEvent::Handled | MenuEvent::Unhandled => {}
            }
        }
    }
}

fn depot_tree(
    toolkit: Retained,
    workspace: Rc<Workspace>,
) -> Result<MenuTree<Retained, Workspace>, MenuError> {
    let tree = MenuTree::with_context(toolkit, "depot", workspace);
    tree.action("Version Control/Download")
        .shortcut("Ctrl+D")
        .priority(11)
        .register(|ws: &Workspace| ws.record(format!("Downloaded {}", ws.depot_file())))?;
    tree.action("Version Control/Check Out")
        .priority(12)
        .validator(|ws: &Workspace| ws.depot_file().contains("D:"))
        .register(|ws: &Workspace| ws.record(format!("Checked out {}", ws.depot_file())))?;
    tree.action("Version Control/History/Show Log")
        .priority(15)
        .register(|ws: &Workspace| ws.record(format!("History of {}", ws.depot_file())))?;
    tree.action("Submit")
        .shortcut("Ctrl+S")
        .priority(40)
        .register(|ws: &Workspace| ws.record(format!("Submitted {}", ws.depot_file())))?;
    tree.action("Refresh")
        .shortcut("F5")
        .register(|ws: &Workspace| ws.record("Refreshed depot view"))?;
    Ok(tree)
}

fn local_tree(
    toolkit: Retained,
    workspace: Rc<Workspace>,
) -> Result<MenuTree<Retained, Workspace>, MenuError> {
    let tree = MenuTree::with_context(toolkit, "local", workspace);
    tree.action("Local Control/Submit")
        .shortcut("Ctrl+S")
        .priority(10)
        .register(|ws: &Workspace| ws.record(format!("Submitted local {}", ws.local_file())))?;
    tree.action("Local Control/Revert")
        .priority(11)
        .register(|ws: &Workspace| ws.record(format!("Reverted {}", ws.local_file())))?;
    tree.action("Reveal in Explorer")
        .shortcut("Ctrl+E")
        .priority(20)
        .register(|ws: &Workspace| ws.record(format!("Revealed {}", ws.local_file())))?;
    Ok(tree)
}

fn run_app(
    terminal: &RefCell<DefaultTerminal>,
    workspace: &Workspace,
    widgets: &[RetainedWidget; 2],
) -> io::Result<()> {
    loop {
        terminal
            .borrow_mut()
            .draw(|frame| draw_workspace(frame, workspace))?;
        for (pane, widget) in workspace.panes.iter().zip(widgets) {
            widget.set_origin(pane.area.get().as_position().into());
        }

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let focus = workspace.focus.get();
                let plain = key.modifiers.difference(KeyModifiers::SHIFT).is_empty();
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc if plain => break,
                    KeyCode::Tab => workspace.focus.set(1 - focus),
                    KeyCode::Up => workspace.panes[focus].move_selection(-1),
                    KeyCode::Down => workspace.panes[focus].move_selection(1),
                    KeyCode::Char('m') if plain => {
                        let point = workspace.panes[focus].selected_point();
                        widgets[focus].request_context_menu(point);
                    }
                    _ => {
                        if !widgets[focus].dispatch_key(&key) {
                            tracing::debug!(?key, "key not bound in focused pane");
                        }
                    }
                }
            }
            Event::Mouse(mouse) if matches!(mouse.kind, MouseEventKind::Down(_)) => {
                let position = Position::new(mouse.column, mouse.row);
                for (idx, pane) in workspace.panes.iter().enumerate() {
                    let Some(point) = pane.select_at(position) else {
                        continue;
                    };
                    workspace.focus.set(idx);
                    if mouse.kind == MouseEventKind::Down(MouseButton::Right) {
                        widgets[idx].request_context_menu(point);
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn run(
    terminal: &Rc<RefCell<DefaultTerminal>>,
    workspace: &Rc<Workspace>,
) -> Result<(), Box<dyn Error>> {
    let toolkit = Retained::with_presenter(TerminalPresenter {
        terminal: Rc::clone(terminal),
        workspace: Rc::clone(workspace),
    });
    let depot = depot_tree(toolkit.clone(), Rc::clone(workspace))?;
    let local = local_tree(toolkit, Rc::clone(workspace))?;

    // The depot pane ships a built-in save; the depot tree's Ctrl+S replaces it.
    let depot_pane = RetainedWidget::new();
    let builtin_save = RetainedAction::with_shortcut("Save", "Ctrl+S");
    let log_target = Rc::clone(workspace);
    builtin_save.connect_triggered(Rc::new(move || log_target.record("Built-in save")));
    depot_pane.add_action(&builtin_save);
    depot.add_widget(&depot_pane)?;

    let local_pane = local.attach_new(RetainedWidget::new)?;

    run_app(terminal, workspace, &[depot_pane, local_pane])?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let log_path = env::temp_dir().join("tui-menutree-demo.log");
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(File::create(&log_path)?))
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let workspace = Rc::new(Workspace::new());
    workspace.record(format!("Logging to {}", log_path.display()));

    let terminal = Rc::new(RefCell::new(ratatui::init()));
    let result = execute!(io::stdout(), EnableMouseCapture)
        .map_err(Into::into)
        .and_then(|()| run(&terminal, &workspace));
    let _ = execute!(io::stdout(), DisableMouseCapture);
    ratatui::restore();
    result
}
