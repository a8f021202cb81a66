//! In-process SPMD runtime: one thread per rank, channel mailboxes.
//!
//! Sends are eager; the payload is handed to the destination mailbox before
//! `isend` returns, so waiting on a send never blocks. Receives match on
//! `(source, tag)` plus a per-pair sequence number, which gives MPI's
//! non-overtaking order.
//!
//! Dropping a [`LocalComm`] tells every peer the rank has exited; a receive
//! that can no longer be satisfied then fails instead of blocking forever.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::comm::{Communicator, Payload, PendingRecv, PendingSend, RecvRequest, SendRequest, Tag};
use crate::foundation::error::{CompositorError, CompositorResult};

struct Envelope {
    source: usize,
    tag: Tag,
    seq: u64,
    payload: Payload,
}

enum Message {
    Data(Envelope),
    /// The named rank dropped its endpoint; nothing more will come from it.
    Exited(usize),
}

struct Mailbox {
    inbox: Receiver<Message>,
    unexpected: Mutex<Vec<Envelope>>,
    exited: Mutex<HashSet<usize>>,
}

impl Mailbox {
    fn take(&self, source: usize, tag: Tag, seq: u64) -> CompositorResult<Payload> {
        let matches = |e: &Envelope| e.source == source && e.tag == tag && e.seq == seq;
        {
            let mut stash = self.unexpected.lock().map_err(poisoned)?;
            if let Some(pos) = stash.iter().position(matches) {
                return Ok(stash.swap_remove(pos).payload);
            }
        }
        loop {
            // A rank's data always precedes its exit notice in the inbox, so
            // once the notice is seen everything it sent is already stashed.
            if self.exited.lock().map_err(poisoned)?.contains(&source) {
                return Err(CompositorError::communication(format!(
                    "rank {source} exited before sending tag {tag} (message #{seq})"
                )));
            }
            let msg = self.inbox.recv().map_err(|_| {
                CompositorError::communication(format!(
                    "mailbox closed while waiting for rank {source} tag {tag}"
                ))
            })?;
            match msg {
                Message::Data(env) if matches(&env) => return Ok(env.payload),
                Message::Data(env) => self.unexpected.lock().map_err(poisoned)?.push(env),
                Message::Exited(rank) => {
                    tracing::debug!(rank, "peer exited");
                    self.exited.lock().map_err(poisoned)?.insert(rank);
                }
            }
        }
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> CompositorError {
    CompositorError::communication("mailbox lock poisoned")
}

/// One rank's endpoint in a [`LocalCluster`].
pub struct LocalComm {
    rank: usize,
    outboxes: Arc<[Sender<Message>]>,
    mailbox: Arc<Mailbox>,
    sent: Mutex<HashMap<(usize, Tag), u64>>,
    posted: Mutex<HashMap<(usize, Tag), u64>>,
}

impl std::fmt::Debug for LocalComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalComm")
            .field("rank", &self.rank)
            .field("size", &self.outboxes.len())
            .finish()
    }
}

impl Drop for LocalComm {
    fn drop(&mut self) {
        for (peer, outbox) in self.outboxes.iter().enumerate() {
            if peer != self.rank {
                // a peer that is already gone needs no notice
                let _ = outbox.send(Message::Exited(self.rank));
            }
        }
    }
}

fn next_seq(counters: &Mutex<HashMap<(usize, Tag), u64>>, key: (usize, Tag)) -> CompositorResult<u64> {
    let mut map = counters.lock().map_err(poisoned)?;
    let slot = map.entry(key).or_insert(0);
    let seq = *slot;
    *slot += 1;
    Ok(seq)
}

struct Delivered;

impl PendingSend for Delivered {
    fn wait(self: Box<Self>) -> CompositorResult<()> {
        Ok(())
    }
}

struct LocalRecv {
    mailbox: Arc<Mailbox>,
    source: usize,
    tag: Tag,
    seq: u64,
}

impl PendingRecv for LocalRecv {
    fn wait(self: Box<Self>) -> CompositorResult<Payload> {
        self.mailbox.take(self.source, self.tag, self.seq)
    }
}

impl LocalComm {
    fn check_peer(&self, peer: usize) -> CompositorResult<()> {
        if peer >= self.outboxes.len() {
            return Err(CompositorError::communication(format!(
                "rank {peer} is outside a communicator of {} ranks",
                self.outboxes.len()
            )));
        }
        Ok(())
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.outboxes.len()
    }

    fn isend(&self, dest: usize, tag: Tag, payload: Payload) -> CompositorResult<SendRequest> {
        self.check_peer(dest)?;
        let seq = next_seq(&self.sent, (dest, tag))?;
        tracing::trace!(from = self.rank, to = dest, tag, len = payload.len(), "isend");
        self.outboxes[dest]
            .send(Message::Data(Envelope {
                source: self.rank,
                tag,
                seq,
                payload,
            }))
            .map_err(|_| CompositorError::communication(format!("rank {dest} has exited")))?;
        Ok(SendRequest::new(dest, tag, Box::new(Delivered)))
    }

    fn irecv(&self, source: usize, tag: Tag) -> CompositorResult<RecvRequest> {
        self.check_peer(source)?;
        let seq = next_seq(&self.posted, (source, tag))?;
        Ok(RecvRequest::new(
            source,
            tag,
            Box::new(LocalRecv {
                mailbox: Arc::clone(&self.mailbox),
                source,
                tag,
                seq,
            }),
        ))
    }
}

/// Factory for in-process communicators.
pub struct LocalCluster;

impl LocalCluster {
    /// One connected endpoint per rank, in rank order.
    pub fn communicators(size: usize) -> Vec<LocalComm> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| unbounded()).unzip();
        let outboxes: Arc<[Sender<Message>]> = senders.into();
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| LocalComm {
                rank,
                outboxes: Arc::clone(&outboxes),
                mailbox: Arc::new(Mailbox {
                    inbox,
                    unexpected: Mutex::new(Vec::new()),
                    exited: Mutex::new(HashSet::new()),
                }),
                sent: Mutex::new(HashMap::new()),
                posted: Mutex::new(HashMap::new()),
            })
            .collect()
    }

    /// Run `f` once per rank on its own thread and collect the results in
    /// rank order. A panicking rank re-panics on the caller; peers still
    /// waiting on it see a [`CompositorError::Communication`] error.
    pub fn run<T, F>(size: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(LocalComm) -> T + Sync,
    {
        let comms = Self::communicators(size);
        let f = &f;
        std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| s.spawn(move || f(comm)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/comm/local.rs"]
mod tests;
