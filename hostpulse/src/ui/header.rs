//! Top header: host identity, uptime and stream state.

use hostpulse::types::StaticInfo;
use hostpulse::uptime::Uptime;
use hostpulse::ws::StreamStatus;
use ratatui::{
    layout::Rect,
    widgets::{Block, Borders},
};

pub fn draw_header(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    info: Option<&StaticInfo>,
    uptime: Option<&Uptime>,
    status: StreamStatus,
) {
    let stream = match status {
        StreamStatus::Connecting => "net: connecting",
        StreamStatus::Connected => "net: live",
        StreamStatus::Disconnected => "net: offline",
    };
    let title = if let Some(si) = info {
        let ip = si.local_ip.as_deref().unwrap_or("N/A");
        let up = uptime
            .map(|u| if u.formatted.is_empty() { "<1m".to_string() } else { u.formatted.clone() })
            .unwrap_or_else(|| "--".into());
        let count = |n: Option<u32>| n.map(|n| n.to_string()).unwrap_or_else(|| "?".into());
        format!(
            "hostpulse — {} | {} ({}C/{}T) | ip: {} | up: {} | {}  (press 'q' to quit)",
            si.os_version,
            si.cpu_info,
            count(si.cpu_cores),
            count(si.cpu_logical_cores),
            ip,
            up,
            stream
        )
    } else {
        format!("hostpulse — loading host info... | {stream}  (press 'q' to quit)")
    };
    f.render_widget(Block::default().title(title).borders(Borders::BOTTOM), area);
}
