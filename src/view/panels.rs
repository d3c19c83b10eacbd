use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color as TermColor, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Gauge, List, ListItem, Paragraph, Row, Table};
use ratatui::Frame;

use crate::core::controller::Controller;
use crate::core::evaluation::AgentRecord;
use crate::core::training::{format_elapsed, LogLevel};

fn min_turns(rec: &AgentRecord) -> String {
    rec.min_turns.map_or_else(|| "-".to_string(), |m| m.to_string())
}

fn avg_turns(rec: &AgentRecord) -> String {
    rec.avg_turns().map_or_else(|| "-".to_string(), |a| format!("{a:.1}"))
}

pub fn render_evaluation(frame: &mut Frame, area: Rect, ctl: &Controller) {
    let block = Block::bordered().title(" Evaluation ");
    let Some(run) = ctl.evaluation() else {
        let hint = Paragraph::new("Press 'e' to start, 'x' to stop.").block(block);
        frame.render_widget(hint, area);
        return;
    };

    let inner = block.inner(area);
    frame.render_widget(block, area);
    let [summary, gauge, table] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(1),
        Constraint::Min(3),
    ])
    .areas(inner);

    let current = run.current();
    let text = vec![
        Line::from(format!(
            "{}  win rate {:.1}%  avg turns {}  min turns {}",
            current.agent.label(),
            current.win_rate() * 100.0,
            avg_turns(current),
            min_turns(current)
        )),
        Line::from(if run.is_running() { "running" } else { "stopped" }),
    ];
    frame.render_widget(Paragraph::new(text), summary);

    frame.render_widget(
        Gauge::default()
            .ratio(run.progress().clamp(0.0, 1.0))
            .label(format!("{}/{}", run.completed_games(), run.total_games())),
        gauge,
    );

    let best = run.best().map(|b| b.agent);
    let rows: Vec<Row> = run
        .ranking()
        .into_iter()
        .map(|rec| {
            let row = Row::new(vec![
                rec.agent.label().to_string(),
                format!("{:.1}%", rec.win_rate() * 100.0),
                avg_turns(rec),
                min_turns(rec),
            ]);
            if Some(rec.agent) == best && run.completed_games() > 0 {
                row.style(Style::default().add_modifier(Modifier::BOLD).fg(TermColor::Green))
            } else {
                row
            }
        })
        .collect();
    let widths = [
        Constraint::Min(24),
        Constraint::Length(9),
        Constraint::Length(10),
        Constraint::Length(10),
    ];
    let header = Row::new(vec!["Agent", "Win rate", "Avg turns", "Min turns"])
        .style(Style::default().add_modifier(Modifier::UNDERLINED));
    frame.render_widget(Table::new(rows, widths).header(header), table);
}

fn level_style(level: LogLevel) -> Style {
    match level {
        LogLevel::Info => Style::default(),
        LogLevel::Success => Style::default().fg(TermColor::Green),
        LogLevel::Warning => Style::default().fg(TermColor::Yellow),
        LogLevel::Error => Style::default().fg(TermColor::Red),
    }
}

pub fn render_training(frame: &mut Frame, area: Rect, ctl: &Controller) {
    let run = ctl.training();
    let block = Block::bordered().title(format!(" Training ({}) ", run.config.agent.label()));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let [summary, gauge, log] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(1),
        Constraint::Min(3),
    ])
    .areas(inner);

    let stats = &run.stats;
    let text = vec![
        Line::from(format!(
            "games {}  won {}  win rate {:.1}%  avg turns {:.1}",
            stats.games_played, stats.games_won, stats.win_rate, stats.avg_turns
        )),
        Line::from(if run.is_running() {
            "running ('x' stops, 'w' saves the model)"
        } else {
            "idle ('s' starts, 'w' saves the model)"
        }),
    ];
    frame.render_widget(Paragraph::new(text), summary);

    frame.render_widget(
        Gauge::default()
            .percent(run.progress_percent().round() as u16)
            .label(format!(
                "{}/{} ({})",
                stats.games_played,
                run.config.episodes,
                format_elapsed(stats.elapsed_time)
            )),
        gauge,
    );

    let visible = log.height as usize;
    let items: Vec<ListItem> = run
        .log
        .entries()
        .rev()
        .take(visible)
        .map(|entry| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("[{}] ", entry.at.format("%H:%M:%S")),
                    Style::default().fg(TermColor::DarkGray),
                ),
                Span::styled(entry.message.clone(), level_style(entry.level)),
            ]))
        })
        .collect();
    frame.render_widget(List::new(items), log);
}
