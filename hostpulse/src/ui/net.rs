//! Network sparklines (download/upload) over the rolling window.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Sparkline},
};

pub fn draw_net_spark(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    series: &[u64],
    color: Color,
) {
    let max_points = area.width.saturating_sub(2) as usize;
    let start = series.len().saturating_sub(max_points);

    let spark = Sparkline::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string()),
        )
        .data(&series[start..])
        .style(Style::default().fg(color));
    f.render_widget(spark, area);
}
