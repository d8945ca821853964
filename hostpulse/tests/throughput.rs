//! Rate derivation from cumulative counters and the rolling window it feeds.
use hostpulse::history::RollingWindow;
use hostpulse::rate::{rate_between, ThroughputEstimator};
use hostpulse::types::{CounterReading, Rate};
use hostpulse::ws::StreamDecoder;
use proptest::prelude::*;

fn reading(timestamp_ms: i64, bytes_sent: u64, bytes_received: u64) -> CounterReading {
    CounterReading {
        timestamp_ms,
        bytes_sent,
        bytes_received,
    }
}

#[test]
fn one_second_of_traffic() {
    let prev = reading(0, 500, 1_000);
    let next = reading(1_000, 1_500, 3_000);
    let rate = rate_between(&prev, &next).expect("rate");
    assert_eq!(rate.download_bps, 2_000.0);
    assert_eq!(rate.upload_bps, 1_000.0);
}

#[test]
fn received_counter_going_down_reports_zero() {
    let rate = rate_between(&reading(0, 0, 5_000), &reading(1_000, 0, 4_000)).expect("rate");
    assert_eq!(rate.download_bps, 0.0);
    assert_eq!(rate.upload_bps, 0.0);
}

#[test]
fn first_reading_yields_nothing() {
    let mut est = ThroughputEstimator::new();
    assert_eq!(est.observe(reading(1_000, 100, 200)), None);
    assert_eq!(est.previous(), Some(&reading(1_000, 100, 200)));
}

#[test]
fn two_readings_one_second_apart() {
    let mut est = ThroughputEstimator::new();
    est.observe(reading(0, 1_000, 5_000));
    let rate = est.observe(reading(1_000, 1_500, 7_000)).expect("rate");
    assert_eq!(rate.download_bps, 2_000.0);
    assert_eq!(rate.upload_bps, 500.0);
}

#[test]
fn half_second_interval_doubles_rate() {
    let rate = rate_between(&reading(10_000, 0, 0), &reading(10_500, 100, 400)).unwrap();
    assert_eq!(rate.download_bps, 800.0);
    assert_eq!(rate.upload_bps, 200.0);
}

#[test]
fn counter_reset_clamps_to_zero() {
    let mut est = ThroughputEstimator::new();
    est.observe(reading(0, 9_000, 9_000));
    let rate = est.observe(reading(1_000, 10, 20)).expect("rate");
    assert_eq!(rate, Rate::default());
    // the reset reading becomes the new baseline
    let rate = est.observe(reading(2_000, 110, 220)).expect("rate");
    assert_eq!(rate.upload_bps, 100.0);
    assert_eq!(rate.download_bps, 200.0);
}

#[test]
fn same_timestamp_yields_nothing_but_replaces_previous() {
    let mut est = ThroughputEstimator::new();
    est.observe(reading(5_000, 0, 0));
    assert_eq!(est.observe(reading(5_000, 50, 50)), None);
    assert_eq!(est.previous(), Some(&reading(5_000, 50, 50)));
    // clock went backwards
    assert_eq!(est.observe(reading(4_000, 60, 60)), None);
    let rate = est.observe(reading(5_000, 160, 1_060)).expect("rate");
    assert_eq!(rate.upload_bps, 100.0);
    assert_eq!(rate.download_bps, 1_000.0);
}

#[test]
fn reset_forgets_previous() {
    let mut est = ThroughputEstimator::new();
    est.observe(reading(0, 0, 0));
    est.reset();
    assert!(est.previous().is_none());
    assert_eq!(est.observe(reading(1_000, 10, 10)), None);
}

#[test]
fn decoder_handles_counters_rates_and_garbage() {
    let mut dec = StreamDecoder::new();
    assert_eq!(
        dec.ingest(r#"{"bytes_sent":0,"bytes_recv":0}"#, 0).unwrap(),
        None
    );
    let rate = dec
        .ingest(r#"{"bytes_sent":2048,"bytes_recv":4096}"#, 2_000)
        .unwrap()
        .expect("rate");
    assert_eq!(rate.upload_bps, 1024.0);
    assert_eq!(rate.download_bps, 2048.0);

    let err = dec.ingest("not json", 3_000).unwrap_err();
    assert!(err.is_protocol());
    let err = dec.ingest(r#"{"hello":"world"}"#, 3_000).unwrap_err();
    assert!(err.is_protocol());
    // a dropped message leaves the baseline alone
    let rate = dec
        .ingest(r#"{"bytes_sent":3072,"bytes_recv":4096}"#, 3_000)
        .unwrap()
        .expect("rate");
    assert_eq!(rate.upload_bps, 1024.0);
    assert_eq!(rate.download_bps, 0.0);

    // precomputed rates pass through, negatives clamped
    let rate = dec
        .ingest(r#"{"up_bps":-5.0,"down_bps":123.5}"#, 3_500)
        .unwrap()
        .expect("rate");
    assert_eq!(rate, Rate::clamped(123.5, 0.0));

    dec.reset();
    assert_eq!(
        dec.ingest(r#"{"bytes_sent":9999,"bytes_recv":9999}"#, 4_000).unwrap(),
        None
    );
}

#[test]
fn window_starts_full_of_zeros() {
    let w = RollingWindow::new(30);
    assert_eq!(w.len(), 30);
    assert_eq!(w.capacity(), 30);
    assert!(w.samples().all(|s| s.download_bps == 0.0 && s.upload_bps == 0.0));
    let idx: Vec<u64> = w.samples().map(|s| s.sequence_index).collect();
    assert_eq!(idx, (0..30).collect::<Vec<_>>());
    assert_eq!(w.peak(), Rate::default());
}

#[test]
fn window_evicts_oldest_after_capacity_plus_one() {
    let mut w = RollingWindow::new(3);
    for i in 1..=4 {
        w.push(Rate {
            download_bps: i as f64,
            upload_bps: 0.0,
        });
    }
    assert_eq!(w.len(), 3);
    assert_eq!(w.download_series(), vec![2, 3, 4]);
    let idx: Vec<u64> = w.samples().map(|s| s.sequence_index).collect();
    assert_eq!(idx, vec![4, 5, 6]);
    assert_eq!(w.latest().download_bps, 4.0);
    assert_eq!(w.peak().download_bps, 4.0);
}

#[test]
fn window_capacity_floor_is_one() {
    let mut w = RollingWindow::new(0);
    assert_eq!(w.len(), 1);
    let s = w.push(Rate::clamped(7.0, 3.0));
    assert_eq!(w.len(), 1);
    assert_eq!(w.latest(), s);
}

proptest! {
    #[test]
    fn rates_never_negative(
        start in 0i64..1_000_000,
        steps in prop::collection::vec((-500i64..5_000, 0u64..1_000_000, 0u64..1_000_000), 1..50),
    ) {
        let mut est = ThroughputEstimator::new();
        let mut t = start;
        est.observe(reading(t, 0, 0));
        for (dt, sent, recv) in steps {
            t += dt;
            if let Some(rate) = est.observe(reading(t, sent, recv)) {
                prop_assert!(rate.download_bps >= 0.0);
                prop_assert!(rate.upload_bps >= 0.0);
                prop_assert!(dt > 0);
            }
        }
    }

    #[test]
    fn monotone_counters_give_exact_rates(
        start in 0i64..1_000_000,
        steps in prop::collection::vec((1i64..10_000, 0u64..10_000_000, 0u64..10_000_000), 1..50),
    ) {
        let mut est = ThroughputEstimator::new();
        let (mut t, mut sent, mut recv) = (start, 0u64, 0u64);
        est.observe(reading(t, sent, recv));
        for (dt, dsent, drecv) in steps {
            t += dt;
            sent += dsent;
            recv += drecv;
            let rate = est.observe(reading(t, sent, recv));
            prop_assert!(rate.is_some());
            let rate = rate.unwrap();
            let secs = dt as f64 / 1000.0;
            prop_assert_eq!(rate.download_bps, drecv as f64 / secs);
            prop_assert_eq!(rate.upload_bps, dsent as f64 / secs);
            prop_assert!(rate.download_bps >= 0.0 && rate.upload_bps >= 0.0);
        }
    }

    #[test]
    fn window_length_is_constant(cap in 1usize..64, pushes in 0usize..200) {
        let mut w = RollingWindow::new(cap);
        let mut last = None;
        for i in 0..pushes {
            let s = w.push(Rate::clamped(i as f64, 0.0));
            if let Some(prev) = last {
                prop_assert_eq!(s.sequence_index, prev + 1);
            }
            last = Some(s.sequence_index);
            prop_assert_eq!(w.len(), cap);
        }
        let idx: Vec<u64> = w.samples().map(|s| s.sequence_index).collect();
        prop_assert!(idx.windows(2).all(|p| p[0] < p[1]));
        prop_assert_eq!(w.len(), cap);
    }
}
