use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::controller::SessionEvent;

const TICK: Duration = Duration::from_secs(1);

/// Sends [`SessionEvent::Tick`] once per second until `shutdown` changes or the
/// receiving side of `events` is dropped.
pub fn spawn_ticker(
    events: mpsc::Sender<SessionEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    if events.send(SessionEvent::Tick).await.is_err() {
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_every_second_until_shutdown() {
        let (tx, mut rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);
        let started = Instant::now();
        let handle = spawn_ticker(tx, stop_rx);

        for expected in 1..=3u64 {
            assert_eq!(rx.recv().await, Some(SessionEvent::Tick));
            assert_eq!(started.elapsed().as_secs(), expected);
        }

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        let (_stop_tx, stop_rx) = watch::channel(false);
        let handle = spawn_ticker(tx, stop_rx);

        drop(rx);
        tokio::time::advance(Duration::from_secs(2)).await;
        handle.await.unwrap();
    }
}
