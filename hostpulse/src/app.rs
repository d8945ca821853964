//! App state and main loop: input handling, periodic redraw, and drawing from the session views.

use std::{io, time::Duration};

use anyhow::Context;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use hostpulse::session::Views;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Color,
    Terminal,
};
use tokio::time::{interval, MissedTickBehavior};

use crate::ui::{
    gauges::{draw_gauges, draw_load},
    header::draw_header,
    net::draw_net_spark,
    processes::draw_top_processes,
    traffic::{draw_daily, draw_hourly},
    util::human_rate,
};

pub struct App {
    views: Views,
    should_quit: bool,
    redraw_every: Duration,
}

impl App {
    pub fn new(views: Views) -> Self {
        Self {
            views,
            should_quit: false,
            redraw_every: Duration::from_millis(250),
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        // Terminal setup
        enable_raw_mode().context("enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        // Main loop
        let res = self.event_loop(&mut terminal).await;

        // Teardown
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> anyhow::Result<()> {
        let mut events = EventStream::new();
        let mut ticker = interval(self.redraw_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            terminal.draw(|f| self.draw(f))?;

            tokio::select! {
                maybe = events.next() => match maybe {
                    Some(Ok(Event::Key(k))) if k.kind == KeyEventKind::Press => {
                        if matches!(
                            k.code,
                            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc
                        ) {
                            self.should_quit = true;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e).context("read terminal event"),
                    None => self.should_quit = true,
                },
                _ = ticker.tick() => {}
            }
            if self.should_quit {
                break;
            }
        }
        Ok(())
    }

    pub fn draw(&self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();
        let info = self.views.static_info();
        let snap = self.views.dynamic();
        let uptime = self.views.uptime();
        let window = self.views.throughput();

        // Root rows: header, gauges, load, middle (net + procs), traffic
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(10),
                Constraint::Length(9),
            ])
            .split(area);

        draw_header(
            f,
            rows[0],
            info.as_deref(),
            uptime.as_ref(),
            self.views.stream_status(),
        );
        draw_gauges(f, rows[1], snap.as_deref(), info.as_deref());
        draw_load(f, rows[2], snap.as_deref());

        let mid = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(rows[3]);
        let nets = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(mid[0]);

        let now = window.latest();
        let peak = window.peak();
        draw_net_spark(
            f,
            nets[0],
            &format!(
                "Download — now: {} | peak: {}",
                human_rate(now.download_bps),
                human_rate(peak.download_bps)
            ),
            &window.download_series(),
            Color::Green,
        );
        draw_net_spark(
            f,
            nets[1],
            &format!(
                "Upload — now: {} | peak: {}",
                human_rate(now.upload_bps),
                human_rate(peak.upload_bps)
            ),
            &window.upload_series(),
            Color::Blue,
        );
        draw_top_processes(f, mid[1], &self.views.top_processes());

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[4]);
        draw_daily(f, bottom[0], self.views.daily().as_deref());
        draw_hourly(f, bottom[1], self.views.hourly().as_deref());
    }
}
