//! Top processes table with per-cell coloring.

use hostpulse::ranker::RankedProcess;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table},
};

use crate::ui::util::truncate_middle;

const COLS: [Constraint; 4] = [
    Constraint::Length(8),  // PID
    Constraint::Min(12),    // Name
    Constraint::Length(8),  // CPU %
    Constraint::Length(8),  // Mem %
];

pub fn draw_top_processes(f: &mut ratatui::Frame<'_>, area: Rect, procs: &[RankedProcess]) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Top Processes ({})", procs.len()));

    // Name column width: total minus fixed columns and borders
    let name_w = area.width.saturating_sub(2 + 8 + 8 + 8 + 3).max(4) as usize;

    let rows = procs.iter().enumerate().map(|(i, p)| {
        let cpu_fg = match p.cpu_percent {
            x if x < 25.0 => Color::Green,
            x if x < 60.0 => Color::Yellow,
            _ => Color::Red,
        };
        let mem_fg = match p.memory_percent {
            x if x < 5.0 => Color::Blue,
            x if x < 20.0 => Color::Magenta,
            _ => Color::Red,
        };
        let zebra = if i % 2 == 0 {
            Style::default()
        } else {
            Style::default().bg(Color::Rgb(30, 30, 36))
        };
        Row::new(vec![
            Cell::from(p.pid.to_string()),
            Cell::from(truncate_middle(&p.name, name_w)),
            Cell::from(format!("{:>5.1}%", p.cpu_percent)).style(Style::default().fg(cpu_fg)),
            Cell::from(format!("{:>5.1}%", p.memory_percent)).style(Style::default().fg(mem_fg)),
        ])
        .style(zebra)
    });

    let header = Row::new(vec!["PID", "Name", "CPU %", "Mem %"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let table = Table::new(rows, COLS).header(header).block(block);
    f.render_widget(table, area);
}
