use multicast_probe_domain::ProbeRecord;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::time::delay_queue;

/// Identity of one pending probe job, stable for the job's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct JobId(pub(crate) u64);

/// One pending probe: the record to assert and the timer driving its
/// delivery.
#[derive(Debug)]
pub(crate) struct ProbeJob {
    pub(crate) id: JobId,
    pub(crate) record: Arc<ProbeRecord>,
    pub(crate) deadline: Instant,
    /// Present while the job waits for delivery; consumed when the timer
    /// fires, canceled when the job is destroyed early.
    pub(crate) timer: Option<delay_queue::Key>,
    /// Selection mark, meaningful only inside one packet-build pass.
    pub(crate) chosen: bool,
}
