use std::{io::stdout, sync::mpsc, thread::spawn, time::Duration};

use crate::gui::error::GuiError;

use crossterm::{
    event::{self, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};

use ratatui::{
    prelude::*,
    widgets::{block::Title, *},
    Terminal,
};

enum ThreadMessage {
    Stop,
}

/// Generates a gui that runs a function until the user provides input.
///
/// The function can be thought of as a recursive fold. `init` contains the
/// inital state of the loop, then `f` is called on the inital state to produce
/// a new state, and then `f` is called on that new state, and so on until the
/// user indicates that this should stop. After every step `describe` renders
/// the state into the lines shown on screen.
pub fn fold_until_stop<F, D, T>(title: &str, init: T, f: F, describe: D) -> Result<T, GuiError>
where
    F: Fn(T) -> T + Send + 'static,
    D: Fn(&T) -> Vec<String> + Send + 'static,
    T: Send + 'static,
{
    let (stop_tx, stop_rx) = mpsc::channel();
    let (status_tx, status_rx) = mpsc::channel::<Vec<String>>();
    let (res_tx, res_rx) = mpsc::channel();

    let th = spawn(move || {
        let mut val = init;

        loop {
            val = f(val);
            // the screen may already be gone, keep folding regardless
            let _ = status_tx.send(describe(&val));
            if let Ok(ThreadMessage::Stop) = stop_rx.try_recv() {
                // only fails if the gui side has given up waiting
                let _ = res_tx.send(val);
                break;
            }
        }
    });

    let drawn = run_screen(title, &status_rx);

    stop_tx.send(ThreadMessage::Stop)?;
    let res = res_rx.recv()?;
    th.join().map_err(|_| GuiError::JoinError)?;
    drawn?;

    Ok(res)
}

fn run_screen(title: &str, status_rx: &mpsc::Receiver<Vec<String>>) -> Result<(), GuiError> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let drawn = Terminal::new(CrosstermBackend::new(stdout()))
        .map_err(GuiError::from)
        .and_then(|mut terminal| {
            terminal.clear()?;
            draw_until_key(&mut terminal, title, status_rx)
        });
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    drawn
}

fn draw_until_key<B: Backend>(
    terminal: &mut Terminal<B>,
    title: &str,
    status_rx: &mpsc::Receiver<Vec<String>>,
) -> Result<(), GuiError> {
    let mut status = vec![" Waiting for data... ".to_owned()];

    loop {
        if let Some(latest) = status_rx.try_iter().last() {
            status = latest;
        }

        let title = Title::from(format!(" {title} ").magenta().bold());
        let instructions = Title::from(Line::from(vec![
            " Press any key to stop ".into(),
        ]));
        let text = Paragraph::new(
            status
                .iter()
                .map(|l| Line::from(l.as_str()))
                .collect::<Vec<_>>(),
        );
        let block = Block::default()
            .title(title.alignment(Alignment::Center))
            .title(
                instructions
                    .alignment(Alignment::Center)
                    .position(block::Position::Bottom),
            )
            .borders(Borders::ALL);
        terminal.draw(|frame| {
            let area = frame.size();
            frame.render_widget(text.block(block), area);
        })?;

        if event::poll(Duration::from_millis(16))? {
            if let event::Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(());
                }
            }
        }
    }
}
