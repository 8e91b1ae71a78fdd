use {
    crate::{
        player::SortKey,
        state::{DashboardState, RefreshCommand},
    },
    crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind},
    ratatui::{backend::CrosstermBackend, Terminal},
    std::{sync::Arc, time::Duration},
    tokio::sync::{mpsc, RwLock},
};

/// How long to wait for a key before redrawing
const FRAME_INTERVAL: Duration = Duration::from_millis(250);

/// What a key press asks the loop to do
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Quit,
    Redraw,
    Send(RefreshCommand),
}

/// Run the TUI event loop until `q` or Esc
///
/// Keys: Tab switches view, `k`/`l` sort by kills/level, Up/Down move the
/// selection, Enter opens the selected player, Backspace closes it, `r`
/// refreshes immediately.
pub async fn run_ui(
    state: Arc<RwLock<DashboardState>>,
    commands: mpsc::Sender<RefreshCommand>,
    source: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    crossterm::terminal::enable_raw_mode()?;

    // Alternate screen keeps stderr logs off the dashboard
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::cursor::Hide
    )?;
    terminal.clear()?;

    let result = event_loop(&mut terminal, &state, &commands, &source).await;

    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    crossterm::terminal::disable_raw_mode()?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &Arc<RwLock<DashboardState>>,
    commands: &mpsc::Sender<RefreshCommand>,
    source: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        {
            let state = state.read().await;
            let area = terminal.size()?;
            terminal.draw(|f| crate::ui::layout::render_layout(f, area, &state, source))?;
        }

        if !crossterm::event::poll(FRAME_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = crossterm::event::read()? else {
            continue;
        };

        let action = {
            let mut state = state.write().await;
            handle_key(&mut state, key)
        };
        match action {
            Action::Quit => return Ok(()),
            Action::Redraw => {}
            Action::Send(command) => {
                if commands.try_send(command).is_err() {
                    log::debug!("Refresh task busy, dropped command");
                }
            }
        }
    }
}

fn handle_key(state: &mut DashboardState, key: KeyEvent) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::Redraw;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Tab => {
            state.toggle_view();
            Action::Redraw
        }
        KeyCode::Char('k') => {
            state.set_sort(SortKey::Kills);
            Action::Redraw
        }
        KeyCode::Char('l') => {
            state.set_sort(SortKey::Level);
            Action::Redraw
        }
        KeyCode::Down => {
            state.select_next();
            Action::Redraw
        }
        KeyCode::Up => {
            state.select_previous();
            Action::Redraw
        }
        KeyCode::Enter => match state.selected_uuid() {
            Some(uuid) => Action::Send(RefreshCommand::Detail(uuid)),
            None => Action::Redraw,
        },
        KeyCode::Backspace => {
            state.clear_detail();
            Action::Redraw
        }
        KeyCode::Char('r') => {
            state.set_refreshing();
            Action::Send(RefreshCommand::Refresh)
        }
        _ => Action::Redraw,
    }
}
