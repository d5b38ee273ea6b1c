use crate::job::JobId;
use crate::ports::PacketTransmit;
use crate::queue::ProbeQueue;
use multicast_probe_domain::{ProbeConfig, ProbeError, ProbeRecord};
use std::future::poll_fn;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::time::DelayQueue;
use tracing::{debug, info, warn};

enum Command {
    Post {
        record: Arc<ProbeRecord>,
        immediate: bool,
    },
    Clear,
}

/// Handle to a running probe scheduler.
///
/// The scheduler runs as a single task owning all of its state, so every
/// handle method only enqueues a command and never blocks. Shutting down
/// (or dropping the last handle) cancels all pending probes.
#[derive(Clone)]
pub struct ProbeScheduler {
    commands: mpsc::UnboundedSender<Command>,
    shutdown: CancellationToken,
}

impl ProbeScheduler {
    /// Spawns a scheduler bound to one transmit path.
    pub fn spawn(transmit: Arc<dyn PacketTransmit>, config: ProbeConfig) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        tokio::spawn(run(
            receiver,
            shutdown.clone(),
            transmit,
            Duration::from_millis(config.defer_millis),
        ));
        Self { commands, shutdown }
    }

    /// Queues a probe asserting `record`.
    ///
    /// Non-immediate probes are deferred by the configured interval so
    /// that probes posted close together can share one packet.
    ///
    /// # Panics
    ///
    /// Panics if the record's key is a wildcard pattern: a probe asserts
    /// one concrete record, and only the outgoing question is widened to
    /// the ANY type.
    pub fn post(&self, record: Arc<ProbeRecord>, immediate: bool) -> Result<(), ProbeError> {
        assert!(
            !record.key().is_wildcard(),
            "cannot probe for a wildcard key: {}",
            record.key()
        );
        self.commands
            .send(Command::Post { record, immediate })
            .map_err(|_| ProbeError::SchedulerStopped)
    }

    /// Cancels every pending probe.
    pub fn clear(&self) -> Result<(), ProbeError> {
        self.commands
            .send(Command::Clear)
            .map_err(|_| ProbeError::SchedulerStopped)
    }

    /// Stops the scheduler task, cancelling every pending probe. Calling
    /// this more than once is harmless.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

async fn run(
    mut commands: mpsc::UnboundedReceiver<Command>,
    shutdown: CancellationToken,
    transmit: Arc<dyn PacketTransmit>,
    defer: Duration,
) {
    let mut queue = ProbeQueue::new();
    let mut timers: DelayQueue<JobId> = DelayQueue::new();

    info!("probe scheduler started");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            command = commands.recv() => match command {
                Some(Command::Post { record, immediate }) => {
                    let delay = if immediate { Duration::ZERO } else { defer };
                    let deadline = Instant::now() + delay;
                    let id = queue.insert(&mut timers, record, deadline);
                    debug!(job = id.0, pending = queue.len(), immediate, "accepted new probe job");
                }
                Some(Command::Clear) => queue.clear(&mut timers),
                None => break,
            },
            Some(expired) = poll_fn(|cx| timers.poll_expired(cx)) => {
                let id = expired.into_inner();
                queue.timer_consumed(id);
                if let Some(packet) = queue.assemble(&mut timers, id, transmit.mtu()) {
                    debug!(bytes = packet.len(), pending = queue.len(), "sending probe packet");
                    if let Err(error) = transmit.send(packet).await {
                        warn!(error = %error, "failed to send probe packet");
                    }
                }
            }
        }
    }

    queue.clear(&mut timers);
    info!("probe scheduler stopped");
}
