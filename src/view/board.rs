use ratatui::layout::Rect;
use ratatui::style::{Color as TermColor, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, List, ListItem, Paragraph};
use ratatui::Frame;

use crate::api::{Color, GameState, BOARD_SIZE};
use crate::core::controller::Controller;

pub fn term_color(color: Color) -> TermColor {
    match color {
        Color::Red => TermColor::Red,
        Color::Blue => TermColor::Blue,
        Color::Yellow => TermColor::Yellow,
        Color::Green => TermColor::Green,
        Color::Purple => TermColor::Magenta,
    }
}

fn swatch(color: Color) -> Span<'static> {
    Span::styled("███", Style::default().fg(term_color(color)))
}

pub fn render_board(frame: &mut Frame, area: Rect, ctl: &Controller, state: &GameState) {
    let mut lines = Vec::with_capacity(BOARD_SIZE + 2);

    let header: Vec<Span> = (0..BOARD_SIZE)
        .map(|col| {
            let label = format!(" {}  ", col + 1);
            if col == ctl.cursor() {
                Span::styled(label, Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED))
            } else {
                Span::raw(label)
            }
        })
        .collect();
    lines.push(Line::from(header));

    for row in 0..BOARD_SIZE {
        let mut spans = Vec::with_capacity(BOARD_SIZE * 2);
        for col in 0..BOARD_SIZE {
            match state.cell(row, col) {
                Some(color) => spans.push(swatch(color)),
                None => spans.push(Span::raw(" · ")),
            }
            spans.push(Span::raw(" "));
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(vec![
        Span::raw("Color: "),
        swatch(ctl.selected_color()),
        Span::raw(format!(" {}", ctl.selected_color())),
    ]));

    frame.render_widget(Paragraph::new(lines).block(Block::bordered().title(" Board ")), area);
}

pub fn render_target(frame: &mut Frame, area: Rect, ctl: &Controller, state: &GameState) {
    let mut spans = Vec::new();
    for i in 0..state.sequence_length {
        spans.push(Span::raw(format!("{}:", i + 1)));
        let revealed = ctl
            .reveal_target()
            .then(|| state.target_sequence.as_ref().and_then(|t| t.get(i).copied()))
            .flatten();
        match revealed {
            Some(color) => spans.push(swatch(color)),
            None => spans.push(Span::styled(" ? ", Style::default().fg(TermColor::Gray).add_modifier(Modifier::REVERSED))),
        }
        spans.push(Span::raw("  "));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).block(Block::bordered().title(" Target ")),
        area,
    );
}

/// Newest move first.
pub fn render_history(frame: &mut Frame, area: Rect, state: &GameState) {
    let items: Vec<ListItem> = state
        .history
        .iter()
        .enumerate()
        .rev()
        .map(|(i, mv)| {
            ListItem::new(Line::from(vec![
                Span::raw(format!("{:>3}. ", i + 1)),
                swatch(mv.color),
                Span::raw(format!(" col {}  ", mv.column + 1)),
                Span::styled(format!("{} HIT", mv.hits), Style::default().fg(TermColor::Green)),
                Span::raw(" / "),
                Span::styled(format!("{} BLOW", mv.blows), Style::default().fg(TermColor::Yellow)),
            ]))
        })
        .collect();
    let title = format!(" History {}/{} ", state.turn(), state.turn_limit());
    frame.render_widget(List::new(items).block(Block::bordered().title(title)), area);
}
