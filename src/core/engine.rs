use anyhow::Result;
use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::DefaultTerminal;
use tracing::info;

use crate::api::GameApi;
use crate::core::command::Command;
use crate::core::driver::Driver;
use crate::input;
use crate::view;

/// Interactive front end: terminal input, driver events and redraws on one task.
pub struct Engine<A: GameApi> {
    driver: Driver<A>,
}

impl<A: GameApi> Engine<A> {
    pub fn new(driver: Driver<A>) -> Self {
        Self { driver }
    }

    pub async fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        let mut events = EventStream::new();
        self.driver.dispatch(Command::NewGame);

        loop {
            terminal.draw(|f| view::render(f, self.driver.controller()))?;

            tokio::select! {
                // 1. INPUT
                maybe_event = events.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) => match input::map_key(key) {
                            Some(Command::Quit) => break,
                            Some(command) => self.driver.dispatch(command),
                            None => {}
                        },
                        // resize and friends just trigger the redraw above
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => break,
                    }
                }

                // 2. NETWORK + TIMERS
                _ = self.driver.pump() => {}
            }
        }

        info!("leaving interactive session");
        Ok(())
    }
}
