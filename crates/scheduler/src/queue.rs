use crate::job::{JobId, ProbeJob};
use multicast_probe_domain::ProbeRecord;
use multicast_probe_wire::{
    EstimateSize, ProbePacket, DNS_PACKET_HEADER_SIZE, DNS_PACKET_MAX_SIZE,
};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::time::DelayQueue;
use tracing::warn;

/// Pending probe jobs for one interface, in arrival order.
///
/// Arrival order is load-bearing: packet assembly scans front to back and
/// stops at the first candidate that does not fit, so earlier probes are
/// never starved by later, smaller ones.
pub(crate) struct ProbeQueue {
    jobs: Vec<ProbeJob>,
    next_id: u64,
}

impl ProbeQueue {
    pub(crate) fn new() -> Self {
        Self {
            jobs: Vec::new(),
            next_id: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Creates a job for `record` and registers its delivery timer.
    pub(crate) fn insert(
        &mut self,
        timers: &mut DelayQueue<JobId>,
        record: Arc<ProbeRecord>,
        deadline: Instant,
    ) -> JobId {
        let id = JobId(self.next_id);
        self.next_id += 1;

        let mut job = ProbeJob {
            id,
            record,
            deadline,
            timer: None,
            chosen: false,
        };
        job.timer = Some(timers.insert_at(id, job.deadline));
        self.jobs.push(job);
        id
    }

    /// Marks the job's one-shot timer as fired. The registration is gone
    /// from the timer queue at this point; only the job's view changes.
    pub(crate) fn timer_consumed(&mut self, id: JobId) {
        if let Some(job) = self.jobs.iter_mut().find(|job| job.id == id) {
            job.timer = None;
        }
    }

    /// Destroys every pending job, canceling outstanding timers.
    pub(crate) fn clear(&mut self, timers: &mut DelayQueue<JobId>) {
        for mut job in self.jobs.drain(..) {
            if let Some(key) = job.timer.take() {
                timers.try_remove(&key);
            }
        }
    }

    /// Builds the outgoing packet for the job whose timer just fired,
    /// consuming it and any other queued jobs that fit.
    ///
    /// Returns `None` when nothing is to be sent: the seed job vanished
    /// before delivery, or its record cannot fit even the largest packet
    /// the protocol allows (the job is dropped in that case).
    pub(crate) fn assemble(
        &mut self,
        timers: &mut DelayQueue<JobId>,
        seed: JobId,
        mtu: usize,
    ) -> Option<ProbePacket> {
        debug_assert!(self.jobs.iter().all(|job| !job.chosen));

        let seed_idx = self.jobs.iter().position(|job| job.id == seed)?;

        let mut packet = ProbePacket::new(mtu);
        let mut questions: u16 = 1;

        if !self.add_probe_question(&mut packet, seed_idx) {
            // The seed alone exceeds the interface packet: retry with a
            // packet sized for exactly this probe, capped at the protocol
            // ceiling. No coalescing on this path.
            return self.assemble_oversize(timers, seed_idx);
        }

        // Fill up with more probes while they keep fitting.
        let mut idx = 0;
        while idx < self.jobs.len() {
            if !self.jobs[idx].chosen {
                if !self.add_probe_question(&mut packet, idx) {
                    break;
                }
                questions += 1;
            }
            idx += 1;
        }

        packet.set_question_count(questions);

        // Authority pass: the chosen records themselves.
        let mut records: u16 = 0;
        let mut idx = 0;
        while idx < self.jobs.len() {
            if !self.jobs[idx].chosen {
                idx += 1;
                continue;
            }
            if !packet.append_record(&self.jobs[idx].record, false, None) {
                warn!(
                    record = %self.jobs[idx].record.key(),
                    "bad probe size estimate, truncating packet"
                );
                for job in &mut self.jobs[idx..] {
                    job.chosen = false;
                }
                break;
            }
            self.release(timers, idx);
            records += 1;
        }

        packet.set_authority_count(records);

        debug_assert!(self.jobs.iter().all(|job| !job.chosen));
        Some(packet)
    }

    /// Appends the shared ANY-type question for `self.jobs[idx]` and marks
    /// it chosen, along with every queued same-key job that still fits.
    ///
    /// Returns `false`, leaving the packet untouched, when the question
    /// plus a reservation for the record itself exceeds the packet.
    fn add_probe_question(&mut self, packet: &mut ProbePacket, idx: usize) -> bool {
        let job = &self.jobs[idx];
        debug_assert!(!job.chosen);

        let size = job.record.key().estimate_size() + job.record.estimate_size();
        if size > packet.space() {
            return false;
        }

        let question = job.record.key().to_any();
        let appended = packet.append_question(&question, false);
        assert!(appended, "question append failed after space check");
        self.jobs[idx].chosen = true;

        // Pick up other jobs probing under the same name. Stop at the
        // first one that no longer fits; later arrivals wait their turn.
        for i in 0..self.jobs.len() {
            let job = &self.jobs[i];
            if job.chosen {
                continue;
            }
            if job.record.key().class() != question.class()
                || job.record.key().name() != question.name()
            {
                continue;
            }
            if job.record.estimate_size() > packet.space() {
                break;
            }
            self.jobs[i].chosen = true;
        }

        true
    }

    /// Single-job fallback for a record that overflows the interface MTU.
    fn assemble_oversize(
        &mut self,
        timers: &mut DelayQueue<JobId>,
        seed_idx: usize,
    ) -> Option<ProbePacket> {
        let job = self.release(timers, seed_idx);

        let size = (job.record.key().estimate_size()
            + job.record.estimate_size()
            + DNS_PACKET_HEADER_SIZE)
            .min(DNS_PACKET_MAX_SIZE);
        let mut packet = ProbePacket::new(size);

        let question = job.record.key().to_any();
        let appended =
            packet.append_question(&question, false) && packet.append_record(&job.record, false, None);
        if !appended {
            warn!(record = %job.record.key(), "probe record too large, cannot send");
            return None;
        }

        packet.set_question_count(1);
        packet.set_authority_count(1);
        Some(packet)
    }

    /// Removes the job at `idx`, canceling its timer if still pending.
    fn release(&mut self, timers: &mut DelayQueue<JobId>, idx: usize) -> ProbeJob {
        let mut job = self.jobs.remove(idx);
        if let Some(key) = job.timer.take() {
            timers.try_remove(&key);
        }
        job
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multicast_probe_domain::{DnsClass, DomainName, RecordData};
    use std::net::Ipv4Addr;
    use std::time::Duration;

    fn name(s: &str) -> DomainName {
        DomainName::new(s).unwrap()
    }

    fn a_record(n: &str, last_octet: u8) -> Arc<ProbeRecord> {
        Arc::new(
            ProbeRecord::new(
                name(n),
                DnsClass::IN,
                120,
                RecordData::A(Ipv4Addr::new(192, 0, 2, last_octet)),
            )
            .unwrap(),
        )
    }

    fn txt_record(n: &str, payload_len: usize) -> Arc<ProbeRecord> {
        Arc::new(
            ProbeRecord::new(
                name(n),
                DnsClass::IN,
                120,
                RecordData::TXT(vec!["x".repeat(payload_len)]),
            )
            .unwrap(),
        )
    }

    /// TXT record whose rdata overflows even the largest allowed packet.
    fn giant_record(n: &str) -> Arc<ProbeRecord> {
        Arc::new(
            ProbeRecord::new(
                name(n),
                DnsClass::IN,
                120,
                RecordData::TXT((0..48).map(|_| "x".repeat(250)).collect()),
            )
            .unwrap(),
        )
    }

    fn question_count(packet: &ProbePacket) -> u16 {
        let bytes = packet.as_bytes();
        u16::from_be_bytes([bytes[4], bytes[5]])
    }

    fn authority_count(packet: &ProbePacket) -> u16 {
        let bytes = packet.as_bytes();
        u16::from_be_bytes([bytes[8], bytes[9]])
    }

    fn insert(queue: &mut ProbeQueue, timers: &mut DelayQueue<JobId>, record: Arc<ProbeRecord>) -> JobId {
        queue.insert(timers, record, Instant::now() + Duration::from_millis(70))
    }

    /// Puts the queue into its post-expiry state for `id`: the scheduler
    /// task would have received this registration from the timer queue, so
    /// tests pull it out by hand.
    fn consume_timer(queue: &mut ProbeQueue, timers: &mut DelayQueue<JobId>, id: JobId) {
        let job = queue.jobs.iter_mut().find(|job| job.id == id).unwrap();
        if let Some(key) = job.timer.take() {
            timers.try_remove(&key);
        }
    }

    // Sizes used below, for the name "probe.local" (11 octets): the
    // question encodes to 17 octets, a first A record to 27, and further
    // A records under the same name to 16 thanks to name compression.
    // The reservation figures are 16 for the key and 26 for an A record.

    #[tokio::test]
    async fn test_insert_keeps_arrival_order_and_registers_timer() {
        let mut queue = ProbeQueue::new();
        let mut timers = DelayQueue::new();

        let deadline = Instant::now() + Duration::from_millis(70);
        let first = queue.insert(&mut timers, a_record("a.local", 1), deadline);
        let second = queue.insert(&mut timers, a_record("b.local", 2), deadline);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.jobs[0].id, first);
        assert_eq!(queue.jobs[1].id, second);
        assert_eq!(queue.jobs[0].deadline, deadline);
        assert!(queue.jobs.iter().all(|job| job.timer.is_some()));
        assert!(queue.jobs.iter().all(|job| !job.chosen));
        assert_eq!(timers.len(), 2);
    }

    #[tokio::test]
    async fn test_assemble_for_vanished_job_sends_nothing() {
        let mut queue = ProbeQueue::new();
        let mut timers = DelayQueue::new();

        let id = insert(&mut queue, &mut timers, a_record("probe.local", 1));
        queue.clear(&mut timers);

        assert!(queue.assemble(&mut timers, id, 1452).is_none());
    }

    #[tokio::test]
    async fn test_single_job_packet() {
        let mut queue = ProbeQueue::new();
        let mut timers = DelayQueue::new();

        let id = insert(&mut queue, &mut timers, a_record("probe.local", 1));
        consume_timer(&mut queue, &mut timers, id);
        let packet = queue.assemble(&mut timers, id, 1452).unwrap();

        assert_eq!(question_count(&packet), 1);
        assert_eq!(authority_count(&packet), 1);
        assert_eq!(queue.len(), 0);
        assert_eq!(timers.len(), 0);
    }

    #[tokio::test]
    async fn test_same_key_jobs_share_one_question() {
        let mut queue = ProbeQueue::new();
        let mut timers = DelayQueue::new();

        let seed = insert(&mut queue, &mut timers, a_record("probe.local", 1));
        insert(&mut queue, &mut timers, a_record("probe.local", 2));
        consume_timer(&mut queue, &mut timers, seed);

        let packet = queue.assemble(&mut timers, seed, 1452).unwrap();

        assert_eq!(question_count(&packet), 1);
        assert_eq!(authority_count(&packet), 2);
        assert_eq!(queue.len(), 0);
        // the coalesced job's own timer was canceled with it
        assert_eq!(timers.len(), 0);
    }

    #[tokio::test]
    async fn test_same_key_scan_stops_at_first_non_fit() {
        let mut queue = ProbeQueue::new();
        let mut timers = DelayQueue::new();

        let seed = insert(&mut queue, &mut timers, a_record("probe.local", 1));
        // reservation 22 + 101 = 123 octets: over the 71 left after the question
        insert(&mut queue, &mut timers, txt_record("probe.local", 100));
        // would fit, but sits behind the oversized one
        insert(&mut queue, &mut timers, a_record("probe.local", 3));
        consume_timer(&mut queue, &mut timers, seed);

        let packet = queue.assemble(&mut timers, seed, 100).unwrap();

        assert_eq!(question_count(&packet), 1);
        assert_eq!(authority_count(&packet), 1);
        assert_eq!(queue.len(), 2);
        assert!(queue.jobs.iter().all(|job| !job.chosen));
        assert!(queue.jobs.iter().all(|job| job.timer.is_some()));
    }

    #[tokio::test]
    async fn test_unrelated_jobs_fill_the_packet() {
        let mut queue = ProbeQueue::new();
        let mut timers = DelayQueue::new();

        let seed = insert(&mut queue, &mut timers, a_record("one.local", 1));
        insert(&mut queue, &mut timers, a_record("two.local", 2));
        consume_timer(&mut queue, &mut timers, seed);

        let packet = queue.assemble(&mut timers, seed, 1452).unwrap();

        assert_eq!(question_count(&packet), 2);
        assert_eq!(authority_count(&packet), 2);
        assert_eq!(queue.len(), 0);
        assert_eq!(timers.len(), 0);
    }

    #[tokio::test]
    async fn test_fill_stops_at_first_non_fit() {
        let mut queue = ProbeQueue::new();
        let mut timers = DelayQueue::new();

        let seed = insert(&mut queue, &mut timers, a_record("probe.local", 1));
        // reservation 16 + 31 = 47 octets: over the 46 left after the seed question
        insert(&mut queue, &mut timers, txt_record("other.local", 8));
        // would fit in the remaining 46, but the scan stops at the non-fit
        insert(&mut queue, &mut timers, a_record("small.local", 3));
        consume_timer(&mut queue, &mut timers, seed);

        let packet = queue.assemble(&mut timers, seed, 75).unwrap();

        assert_eq!(question_count(&packet), 1);
        assert_eq!(authority_count(&packet), 1);
        assert_eq!(queue.len(), 2);
        assert!(queue.jobs.iter().all(|job| !job.chosen));
    }

    #[tokio::test]
    async fn test_filled_job_brings_its_same_key_followers() {
        let mut queue = ProbeQueue::new();
        let mut timers = DelayQueue::new();

        let seed = insert(&mut queue, &mut timers, a_record("one.local", 1));
        insert(&mut queue, &mut timers, a_record("two.local", 2));
        insert(&mut queue, &mut timers, a_record("two.local", 3));
        consume_timer(&mut queue, &mut timers, seed);

        let packet = queue.assemble(&mut timers, seed, 1452).unwrap();

        // both two.local records ride on the one filled question
        assert_eq!(question_count(&packet), 2);
        assert_eq!(authority_count(&packet), 3);
        assert_eq!(queue.len(), 0);
    }

    #[tokio::test]
    async fn test_optimistic_estimate_truncates_packet() {
        let mut queue = ProbeQueue::new();
        let mut timers = DelayQueue::new();

        // Budget 62: after the header and question 33 octets remain, so the
        // per-record reservation of 26 admits both followers, but encoding
        // the seed record leaves only 6 and the first follower needs 16.
        let seed = insert(&mut queue, &mut timers, a_record("probe.local", 1));
        insert(&mut queue, &mut timers, a_record("probe.local", 2));
        insert(&mut queue, &mut timers, a_record("probe.local", 3));
        consume_timer(&mut queue, &mut timers, seed);

        let packet = queue.assemble(&mut timers, seed, 62).unwrap();

        // the packet still goes out with what fit
        assert_eq!(question_count(&packet), 1);
        assert_eq!(authority_count(&packet), 1);

        // the two followers stay queued, unmarked, with their own timers
        assert_eq!(queue.len(), 2);
        assert!(queue.jobs.iter().all(|job| !job.chosen));
        assert!(queue.jobs.iter().all(|job| job.timer.is_some()));
        assert_eq!(timers.len(), 2);
    }

    #[tokio::test]
    async fn test_record_over_mtu_gets_its_own_packet() {
        let mut queue = ProbeQueue::new();
        let mut timers = DelayQueue::new();

        let seed = insert(&mut queue, &mut timers, a_record("probe.local", 1));
        let other = insert(&mut queue, &mut timers, a_record("other.local", 2));
        consume_timer(&mut queue, &mut timers, seed);

        // 30 octets cannot hold the 42-octet reservation
        let packet = queue.assemble(&mut timers, seed, 30).unwrap();

        assert_eq!(question_count(&packet), 1);
        assert_eq!(authority_count(&packet), 1);
        assert!(packet.len() > 30);

        // no coalescing on the oversize path
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.jobs[0].id, other);
    }

    #[tokio::test]
    async fn test_record_over_protocol_ceiling_is_dropped() {
        let mut queue = ProbeQueue::new();
        let mut timers = DelayQueue::new();

        let seed = insert(&mut queue, &mut timers, giant_record("probe.local"));
        let other = insert(&mut queue, &mut timers, a_record("other.local", 2));
        consume_timer(&mut queue, &mut timers, seed);

        assert!(queue.assemble(&mut timers, seed, 1452).is_none());

        // the oversized job is gone for good; the rest keeps working
        assert_eq!(queue.len(), 1);
        consume_timer(&mut queue, &mut timers, other);
        let packet = queue.assemble(&mut timers, other, 1452).unwrap();
        assert_eq!(question_count(&packet), 1);
        assert_eq!(authority_count(&packet), 1);
    }

    #[tokio::test]
    async fn test_clear_cancels_all_timers() {
        let mut queue = ProbeQueue::new();
        let mut timers = DelayQueue::new();

        for i in 0..3 {
            insert(&mut queue, &mut timers, a_record("probe.local", i));
        }
        assert_eq!(timers.len(), 3);

        queue.clear(&mut timers);
        assert_eq!(queue.len(), 0);
        assert_eq!(timers.len(), 0);

        // clearing an empty queue is a no-op
        queue.clear(&mut timers);
        assert_eq!(queue.len(), 0);
    }

    #[tokio::test]
    async fn test_deadline_is_never_early() {
        let mut queue = ProbeQueue::new();
        let mut timers = DelayQueue::new();

        let before = Instant::now();
        let deadline = Instant::now() + Duration::from_millis(70);
        queue.insert(&mut timers, a_record("probe.local", 1), deadline);

        assert!(queue.jobs[0].deadline >= before + Duration::from_millis(70));
    }
}
