//! hostpulse: live host telemetry in the terminal.
//!
//! Three feeds come together here: a one-shot static snapshot, a polled
//! dynamic snapshot, and a streamed cumulative network counter. Each feed owns
//! one watch cell; the UI only ever reads them through [`session::Views`].

pub mod error;
pub mod history;
pub mod http;
pub mod logging;
pub mod poller;
pub mod profiles;
pub mod rate;
pub mod ranker;
pub mod session;
pub mod types;
pub mod uptime;
pub mod ws;
