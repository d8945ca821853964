//! CPU / memory / disk gauges and the load average line.

use hostpulse::types::{DynamicSnapshot, StaticInfo};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Gauge, Paragraph},
};

use crate::ui::util::human;

fn level_color(pct: f64) -> Color {
    match pct {
        x if x < 50.0 => Color::Cyan,
        x if x < 80.0 => Color::Yellow,
        _ => Color::Red,
    }
}

fn gauge(f: &mut ratatui::Frame<'_>, area: Rect, title: &str, pct: f64, label: String) {
    let g = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .gauge_style(Style::default().fg(level_color(pct)))
        .percent(pct.clamp(0.0, 100.0).round() as u16)
        .label(label);
    f.render_widget(g, area);
}

pub fn draw_gauges(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    snap: Option<&DynamicSnapshot>,
    info: Option<&StaticInfo>,
) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    let Some(d) = snap else {
        for (i, t) in ["CPU", "Memory", "Disk"].iter().enumerate() {
            gauge(f, cols[i], t, 0.0, "--".into());
        }
        return;
    };
    let mem_total = info.map(|s| human(s.total_memory_bytes)).unwrap_or_else(|| "?".into());
    let disk_total = info.map(|s| human(s.total_disk_bytes)).unwrap_or_else(|| "?".into());

    gauge(f, cols[0], "CPU", d.cpu_percent, format!("{:.1}%", d.cpu_percent));
    gauge(
        f,
        cols[1],
        "Memory",
        d.memory_percent,
        format!("{:.1}% ({} / {})", d.memory_percent, human(d.memory_used_bytes), mem_total),
    );
    gauge(
        f,
        cols[2],
        "Disk",
        d.disk_percent,
        format!("{:.1}% ({} / {})", d.disk_percent, human(d.disk_used_bytes), disk_total),
    );
}

pub fn draw_load(f: &mut ratatui::Frame<'_>, area: Rect, snap: Option<&DynamicSnapshot>) {
    let text = match snap {
        Some(d) => {
            let la = d.load_average;
            let gpu = d.gpu_percent.map(|g| format!(" | GPU {g:.1}%")).unwrap_or_default();
            format!("load avg: {:.2} {:.2} {:.2}{gpu}", la.load1, la.load5, la.load15)
        }
        None => "load avg: --".into(),
    };
    f.render_widget(Paragraph::new(text), area);
}
