//! Live monitor fan-out
//!
//! The acquisition loop publishes converted frames (and gap markers) into a
//! bounded, drop-oldest queue; a console sink on its own thread republishes
//! them at a capped refresh rate. The publisher never blocks: when the
//! queue is full the oldest pending update is discarded in favor of the
//! new one. The monitor is a best-effort observer; it cannot stall the
//! logger or escalate errors beyond a visual gap indicator.

use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::channel::Channel;
use crate::convert::ConvertedFrame;

/// What the monitor observes for one tick
#[derive(Debug, Clone)]
pub enum MonitorUpdate {
    Frame(ConvertedFrame),
    Gap { tick: u64 },
}

/// Non-blocking publishing side of the monitor queue
pub struct MonitorPublisher {
    tx: Sender<MonitorUpdate>,
    rx: Receiver<MonitorUpdate>,
}

impl MonitorPublisher {
    /// Hand an update to the monitor without ever blocking
    ///
    /// Under backpressure the oldest queued update is dropped to make room;
    /// a disconnected monitor is ignored entirely.
    pub fn publish(&self, update: MonitorUpdate) {
        if let Err(TrySendError::Full(update)) = self.tx.try_send(update) {
            let _ = self.rx.try_recv();
            let _ = self.tx.try_send(update);
        }
    }
}

/// Bounded monitor queue; returns the publisher and the consuming end
pub fn channel(capacity: usize) -> (MonitorPublisher, Receiver<MonitorUpdate>) {
    let (tx, rx) = bounded(capacity.max(1));
    let publisher = MonitorPublisher {
        tx,
        rx: rx.clone(),
    };
    (publisher, rx)
}

/// Caps how often the display refreshes, independent of sample rate
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(refresh_hz: f64) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / refresh_hz.max(0.1)),
            last: None,
        }
    }

    /// True at most once per interval
    pub fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Horizontal bar for a value on a 0..max scale
///
/// Negative values (drift below the zero point) render as a single `-` so
/// they stay visible without growing leftwards.
pub fn value_bar(value: f64, max_value: f64, width: usize) -> String {
    if value < 0.0 {
        let mut bar = String::from("-");
        bar.push_str(&" ".repeat(width.saturating_sub(1)));
        return bar;
    }
    let normalized = (value / max_value).clamp(0.0, 1.0);
    let filled = ((normalized * width as f64) as usize).min(width);
    let mut bar = "█".repeat(filled);
    bar.push_str(&" ".repeat(width - filled));
    bar
}

/// One console line for the latest frame
pub fn render_row(frame: &ConvertedFrame, scales: &[(Channel, f64)], gap_pending: bool) -> String {
    let mut row = format!("T+{:7.2}s", frame.time_s);
    for (channel, value) in &frame.values {
        let scale = scales
            .iter()
            .find(|(c, _)| c == channel)
            .map(|(_, s)| *s)
            .unwrap_or(1.0);
        row.push_str(&format!(
            " | {:>11} {:8.2} {:<3} [{}]",
            channel.label(),
            value,
            channel.unit(),
            value_bar(*value, scale, 20)
        ));
    }
    row.push_str(if gap_pending { " | GAP " } else { "       " });
    row
}

/// Spawn the console display sink over the receiving end of the queue
///
/// Drains the queue, keeps only the newest frame, and redraws at
/// `refresh_hz`. `scales` gives each channel's full-scale physical value
/// for the bar graphs. The thread exits when every publisher is gone.
pub fn spawn_console_sink(
    rx: Receiver<MonitorUpdate>,
    refresh_hz: f64,
    scales: Vec<(Channel, f64)>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut throttle = Throttle::new(refresh_hz);
        let mut latest: Option<ConvertedFrame> = None;
        let mut gap_pending = false;

        loop {
            match rx.recv_timeout(Duration::from_millis(50)) {
                Ok(MonitorUpdate::Frame(frame)) => latest = Some(frame),
                Ok(MonitorUpdate::Gap { .. }) => gap_pending = true,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            // Only the newest update matters to the display
            while let Ok(update) = rx.try_recv() {
                match update {
                    MonitorUpdate::Frame(frame) => latest = Some(frame),
                    MonitorUpdate::Gap { .. } => gap_pending = true,
                }
            }

            if throttle.ready() {
                if let Some(frame) = &latest {
                    print!("\r{}", render_row(frame, &scales, gap_pending));
                    io::stdout().flush().ok();
                    gap_pending = false;
                }
            }
        }
        println!();
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tick: u64, thrust: f64) -> ConvertedFrame {
        ConvertedFrame {
            tick,
            time_s: tick as f64 * 0.005,
            values: vec![(Channel::Thrust, thrust)],
        }
    }

    #[test]
    fn test_full_queue_drops_oldest() {
        let (publisher, rx) = channel(3);
        for tick in 0..10 {
            publisher.publish(MonitorUpdate::Frame(frame(tick, tick as f64)));
        }

        let mut received = Vec::new();
        while let Ok(update) = rx.try_recv() {
            if let MonitorUpdate::Frame(frame) = update {
                received.push(frame.tick);
            }
        }
        assert_eq!(received.len(), 3);
        // The newest update always survives
        assert_eq!(*received.last().unwrap(), 9);
        // What remains is in publish order
        assert!(received.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_publish_after_receiver_gone_is_silent() {
        let (publisher, rx) = channel(2);
        drop(rx);
        // rx clone inside the publisher keeps the channel alive; publish
        // must still be a no-op rather than a panic or a block
        publisher.publish(MonitorUpdate::Gap { tick: 1 });
        publisher.publish(MonitorUpdate::Gap { tick: 2 });
        publisher.publish(MonitorUpdate::Gap { tick: 3 });
    }

    #[test]
    fn test_throttle_caps_rate() {
        let mut throttle = Throttle::new(10.0);
        assert!(throttle.ready());
        assert!(!throttle.ready());
        std::thread::sleep(Duration::from_millis(120));
        assert!(throttle.ready());
    }

    #[test]
    fn test_value_bar_bounds() {
        assert_eq!(value_bar(0.0, 100.0, 10), " ".repeat(10));
        assert_eq!(value_bar(100.0, 100.0, 10), "█".repeat(10));
        assert_eq!(value_bar(150.0, 100.0, 10), "█".repeat(10));
        assert!(value_bar(-5.0, 100.0, 10).starts_with('-'));
    }

    #[test]
    fn test_render_row_marks_gap() {
        let row = render_row(&frame(4, 120.0), &[(Channel::Thrust, 1000.0)], true);
        assert!(row.contains("thrust"));
        assert!(row.contains("GAP"));
        let row = render_row(&frame(4, 120.0), &[(Channel::Thrust, 1000.0)], false);
        assert!(!row.contains("GAP"));
    }
}
