use std::{collections::BTreeSet, io::stdout, path::PathBuf, time::Duration};

use crate::gui::error::GuiError;

use crossterm::{
    event::{self, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{
        block::{Position, Title},
        *,
    },
    Terminal,
};

/// Lets the user tick any number of serial devices. Returns the ticked
/// ones in list order, or an empty list if the user quit.
pub fn device_selector(available_ports: Vec<PathBuf>) -> Result<Vec<PathBuf>, GuiError> {
    if available_ports.is_empty() {
        return Err(GuiError::NoDevices);
    }

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let res = select_loop(&mut terminal, &available_ports);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    let ticked = res?;
    Ok(available_ports
        .into_iter()
        .enumerate()
        .filter(|(i, _)| ticked.contains(i))
        .map(|(_, p)| p)
        .collect())
}

fn select_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    available_ports: &[PathBuf],
) -> Result<BTreeSet<usize>, GuiError> {
    let n_ports = available_ports.len();
    let mut cursor = 0;
    let mut ticked = BTreeSet::new();
    let mut list_state = ListState::default().with_selected(Some(cursor));

    loop {
        let title = Title::from(" Testbed Nodes ".magenta().bold());
        let instructions = Title::from(Line::from(vec![
            " Navigate ".into(),
            "<Up>/<Down>".magenta().bold(),
            " Toggle ".into(),
            "<Space>".magenta().bold(),
            " Start ".into(),
            "<Enter>".magenta().bold(),
            " Quit ".into(),
            "<Q> ".magenta().bold(),
        ]));
        let block = Block::default()
            .title(title.alignment(Alignment::Center))
            .title(
                instructions
                    .alignment(Alignment::Center)
                    .position(Position::Bottom),
            )
            .borders(Borders::ALL);
        let port_names = available_ports.iter().enumerate().map(|(i, p)| {
            let mark = if ticked.contains(&i) { "[x]" } else { "[ ]" };
            format!("{mark} {}", p.to_string_lossy())
        });
        let list = List::new(port_names)
            .style(Style::default().fg(Color::White))
            .highlight_symbol(">>")
            .highlight_style(Style::default().fg(Color::Magenta))
            .block(block);
        list_state.select(Some(cursor));
        terminal.draw(|frame| {
            let area = frame.size();
            frame.render_stateful_widget(list, area, &mut list_state);
        })?;

        if event::poll(Duration::from_millis(16))? {
            if let event::Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Down => {
                            cursor = (cursor + 1) % n_ports;
                        }
                        KeyCode::Up => {
                            cursor = (cursor + n_ports - 1) % n_ports;
                        }
                        KeyCode::Char(' ') => {
                            if !ticked.remove(&cursor) {
                                ticked.insert(cursor);
                            }
                        }
                        KeyCode::Enter => {
                            // nothing ticked means the highlighted one
                            if ticked.is_empty() {
                                ticked.insert(cursor);
                            }
                            return Ok(ticked);
                        }
                        KeyCode::Char('q') => return Ok(BTreeSet::new()),
                        _ => {}
                    }
                }
            }
        }
    }
}
