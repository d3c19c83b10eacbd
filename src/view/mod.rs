//! Terminal rendering of the controller state. Pure: reads, never mutates.

pub mod board;
pub mod panels;

use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color as TermColor, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Wrap};
use ratatui::Frame;

use crate::api::GameMode;
use crate::core::controller::Controller;

const KEYS: &str = "r/b/y/g/p color  ←/→ column  Enter drop  1-5 drop  a autoplay  n new  \
m mode  t agent  +/- speed  l learn  d debug  e eval  s train  x stop  w save  q quit";

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

pub fn render(frame: &mut Frame, ctl: &Controller) {
    let [header, body, status, keys] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(10),
        Constraint::Length(3),
        Constraint::Length(2),
    ])
    .areas(frame.area());

    let ai_key = if ctl.ai_move_enabled() {
        if ctl.autoplay_active() {
            Span::styled("[AI stop]", Style::default().fg(TermColor::Yellow))
        } else {
            Span::styled("[AI play]", Style::default().fg(TermColor::Green))
        }
    } else {
        Span::styled("[AI play]", Style::default().fg(TermColor::DarkGray))
    };
    let title = Line::from(vec![
        Span::styled(" COLOR LINK ", Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED)),
        Span::raw(format!(
            "  mode {}  agent {}  delay {:.1}s  learning {}  debug {}  ",
            ctl.mode().label(),
            ctl.agent().label(),
            ctl.ai_delay().as_secs_f64(),
            on_off(ctl.learning()),
            on_off(ctl.debug()),
        )),
        ai_key,
    ]);
    frame.render_widget(Paragraph::new(title), header);

    let [left, right] = Layout::horizontal([Constraint::Length(26), Constraint::Min(30)]).areas(body);

    // nothing game-related until the first snapshot arrives
    if let Some(state) = ctl.game() {
        let [board_area, target_area, _] = Layout::vertical([
            Constraint::Length(9),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .areas(left);
        board::render_board(frame, board_area, ctl, state);
        board::render_target(frame, target_area, ctl, state);

        match ctl.mode() {
            GameMode::Normal => board::render_history(frame, right, state),
            mode => {
                let [history, panel] =
                    Layout::vertical([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(right);
                board::render_history(frame, history, state);
                if mode == GameMode::Eval {
                    panels::render_evaluation(frame, panel, ctl);
                } else {
                    panels::render_training(frame, panel, ctl);
                }
            }
        }
    } else {
        frame.render_widget(
            Paragraph::new("Connecting to the game server...").block(Block::bordered()),
            body,
        );
    }

    frame.render_widget(
        Paragraph::new(ctl.message())
            .wrap(Wrap { trim: true })
            .block(Block::bordered().title(" Status ")),
        status,
    );
    frame.render_widget(
        Paragraph::new(KEYS)
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(TermColor::DarkGray)),
        keys,
    );
}
