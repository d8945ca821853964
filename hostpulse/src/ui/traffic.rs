//! 7-day traffic bars and the hourly throughput line.

use chrono::NaiveDate;
use hostpulse::types::{DailyReport, HourlyReport};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{BarChart, Block, Borders, Paragraph, Sparkline},
};

use crate::ui::util::{human, human_rate};

const MIB: u64 = 1024 * 1024;

fn day_label(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%a").to_string())
        .unwrap_or_else(|_| date.to_string())
}

pub fn draw_daily(f: &mut ratatui::Frame<'_>, area: Rect, report: Option<&DailyReport>) {
    let Some(r) = report else {
        let p = Paragraph::new("no data")
            .block(Block::default().borders(Borders::ALL).title("Traffic (7d)"));
        f.render_widget(p, area);
        return;
    };
    let title = match r.since_boot {
        Some(sb) => format!(
            "Traffic (7d, down MiB) — since boot ↓{} ↑{}",
            human(sb.down_bytes),
            human(sb.up_bytes)
        ),
        None => "Traffic (7d, down MiB)".into(),
    };
    // oldest first so the newest day is the rightmost bar
    let labels: Vec<(String, u64)> = r
        .oldest_first()
        .map(|d| (day_label(&d.date), d.down_bytes / MIB))
        .collect();
    let data: Vec<(&str, u64)> = labels.iter().map(|(l, v)| (l.as_str(), *v)).collect();

    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .data(data.as_slice())
        .bar_width(5)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    f.render_widget(chart, area);
}

pub fn draw_hourly(f: &mut ratatui::Frame<'_>, area: Rect, report: Option<&HourlyReport>) {
    let (series, peak): (Vec<u64>, f64) = match report {
        Some(r) => {
            let s: Vec<u64> = r.oldest_first().map(|p| p.down_bps.max(0.0).round() as u64).collect();
            let peak = r.points.iter().map(|p| p.down_bps).fold(0.0_f64, f64::max);
            (s, peak)
        }
        None => (Vec::new(), 0.0),
    };
    let max_points = area.width.saturating_sub(2) as usize;
    let start = series.len().saturating_sub(max_points);
    let spark = Sparkline::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Download, last hour — peak {}", human_rate(peak))),
        )
        .data(&series[start..])
        .style(Style::default().fg(Color::Magenta));
    f.render_widget(spark, area);
}
