use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::driver::SessionCommand;

/// Countdown source owned by exactly one session.
///
/// Sends one `SessionCommand::Tick` per period into the session's command
/// channel. Holds only a weak sender so a running timer never keeps the
/// channel open on its own. Dropping the timer aborts the task.
#[derive(Debug)]
pub struct SessionTimer {
    task: JoinHandle<()>,
}

impl SessionTimer {
    /// Spawn the tick task. The first tick fires one `period` from now.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(period: Duration, sink: mpsc::WeakSender<SessionCommand>) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(commands) = sink.upgrade() else {
                    break;
                };
                if commands.send(SessionCommand::Tick).await.is_err() {
                    break;
                }
            }
        });
        Self { task }
    }

    /// Stop ticking. No further `Tick` is sent after this returns.
    pub fn stop(self) {
        self.task.abort();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_until_stopped() {
        let (tx, mut rx) = mpsc::channel(8);
        let timer = SessionTimer::start(Duration::from_secs(1), tx.downgrade());

        for _ in 0..3 {
            let cmd = rx.recv().await.unwrap();
            assert!(matches!(cmd, SessionCommand::Tick));
        }
        timer.stop();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn exits_when_channel_owner_is_gone() {
        let (tx, rx) = mpsc::channel::<SessionCommand>(8);
        let timer = SessionTimer::start(Duration::from_secs(1), tx.downgrade());
        drop(tx);
        drop(rx);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!timer.is_running());
    }
}
