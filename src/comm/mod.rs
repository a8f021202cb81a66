//! MPI-like message passing used by the compositor.
//!
//! A [`Communicator`] supplies rank identity and non-blocking point-to-point
//! transfers. Blocking send/receive and the collectives the compositor needs
//! (gather, variable-length gather, all-to-all, barrier) are provided on top
//! of them using reserved negative tags.

pub mod local;

use crate::foundation::error::{CompositorError, CompositorResult};

/// Message tag. Non-negative values belong to callers.
pub type Tag = i32;

pub(crate) const TAG_GATHER: Tag = -1;
pub(crate) const TAG_GATHERV: Tag = -2;
pub(crate) const TAG_ALL_TO_ALL: Tag = -3;
pub(crate) const TAG_BARRIER_IN: Tag = -4;
pub(crate) const TAG_BARRIER_OUT: Tag = -5;

/// Typed message body.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Counts, sizes and integer extents.
    I64(Vec<i64>),
    /// Pixel data.
    F32(Vec<f32>),
    /// Metadata records.
    F64(Vec<f64>),
}

impl Payload {
    /// Element count.
    pub fn len(&self) -> usize {
        match self {
            Self::I64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
        }
    }

    /// True when the message carries no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::I64(_) => "i64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
        }
    }

    /// Unwrap an `i64` body.
    pub fn into_i64(self) -> CompositorResult<Vec<i64>> {
        match self {
            Self::I64(v) => Ok(v),
            other => Err(mismatch("i64", &other)),
        }
    }

    /// Unwrap an `f32` body.
    pub fn into_f32(self) -> CompositorResult<Vec<f32>> {
        match self {
            Self::F32(v) => Ok(v),
            other => Err(mismatch("f32", &other)),
        }
    }

    /// Unwrap an `f64` body.
    pub fn into_f64(self) -> CompositorResult<Vec<f64>> {
        match self {
            Self::F64(v) => Ok(v),
            other => Err(mismatch("f64", &other)),
        }
    }
}

fn mismatch(expected: &str, got: &Payload) -> CompositorError {
    CompositorError::communication(format!(
        "expected {expected} payload, received {} ({} elements)",
        got.kind(),
        got.len()
    ))
}

/// Backend half of an outstanding send.
pub trait PendingSend: Send {
    /// Block until the send buffer may be released.
    fn wait(self: Box<Self>) -> CompositorResult<()>;
}

/// Backend half of an outstanding receive.
pub trait PendingRecv: Send {
    /// Block until the matching message has arrived.
    fn wait(self: Box<Self>) -> CompositorResult<Payload>;
}

/// Owned handle to a posted send. Waiting consumes it.
#[must_use = "posted sends must be waited on before the frame ends"]
pub struct SendRequest {
    dest: usize,
    tag: Tag,
    inner: Box<dyn PendingSend>,
}

impl SendRequest {
    /// Wrap a backend handle.
    pub fn new(dest: usize, tag: Tag, inner: Box<dyn PendingSend>) -> Self {
        Self { dest, tag, inner }
    }

    /// Destination rank.
    pub fn dest(&self) -> usize {
        self.dest
    }

    /// Message tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Block until complete.
    pub fn wait(self) -> CompositorResult<()> {
        self.inner.wait()
    }
}

/// Owned handle to a posted receive. Waiting consumes it and yields the data.
#[must_use = "posted receives must be waited on"]
pub struct RecvRequest {
    source: usize,
    tag: Tag,
    inner: Box<dyn PendingRecv>,
}

impl RecvRequest {
    /// Wrap a backend handle.
    pub fn new(source: usize, tag: Tag, inner: Box<dyn PendingRecv>) -> Self {
        Self { source, tag, inner }
    }

    /// Source rank.
    pub fn source(&self) -> usize {
        self.source
    }

    /// Message tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Block until the message has arrived.
    pub fn wait(self) -> CompositorResult<Payload> {
        self.inner.wait()
    }
}

/// Wait for every send; the first failure is reported after all have been
/// waited.
pub fn wait_all_send(reqs: Vec<SendRequest>) -> CompositorResult<()> {
    let mut first_err = None;
    for r in reqs {
        if let Err(e) = r.wait() {
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), Err)
}

/// Wait for every receive, returning payloads in request order.
pub fn wait_all_recv(reqs: Vec<RecvRequest>) -> CompositorResult<Vec<Payload>> {
    reqs.into_iter().map(RecvRequest::wait).collect()
}

/// SPMD message-passing substrate.
///
/// Receives posted on the same `(source, tag)` pair match messages in posting
/// order, independent of the order in which they are waited.
pub trait Communicator {
    /// This process's rank.
    fn rank(&self) -> usize;

    /// Number of ranks.
    fn size(&self) -> usize;

    /// Post a send.
    fn isend(&self, dest: usize, tag: Tag, payload: Payload) -> CompositorResult<SendRequest>;

    /// Post a receive.
    fn irecv(&self, source: usize, tag: Tag) -> CompositorResult<RecvRequest>;

    /// Blocking send.
    fn send(&self, dest: usize, tag: Tag, payload: Payload) -> CompositorResult<()> {
        self.isend(dest, tag, payload)?.wait()
    }

    /// Blocking receive.
    fn recv(&self, source: usize, tag: Tag) -> CompositorResult<Payload> {
        self.irecv(source, tag)?.wait()
    }

    /// Collect one value per rank at `root`, in rank order.
    fn gather_i64(&self, root: usize, value: i64) -> CompositorResult<Option<Vec<i64>>> {
        if self.rank() != root {
            self.send(root, TAG_GATHER, Payload::I64(vec![value]))?;
            return Ok(None);
        }
        let reqs = self.post_from_all_but_self(TAG_GATHER)?;
        let mut out = vec![0; self.size()];
        out[root] = value;
        for (src, req) in reqs {
            let v = req.wait()?.into_i64()?;
            out[src] = *v.first().ok_or_else(|| {
                CompositorError::protocol(format!("empty gather contribution from rank {src}"))
            })?;
        }
        Ok(Some(out))
    }

    /// Variable-length gather of `f32` values at `root`.
    ///
    /// `counts` (required at the root) announces how many values each rank
    /// contributes; the result is the rank-ordered concatenation.
    fn gatherv_f32(
        &self,
        root: usize,
        values: Vec<f32>,
        counts: Option<&[i64]>,
    ) -> CompositorResult<Option<Vec<f32>>> {
        if self.rank() != root {
            self.send(root, TAG_GATHERV, Payload::F32(values))?;
            return Ok(None);
        }
        let counts = counts
            .filter(|c| c.len() == self.size())
            .ok_or_else(|| CompositorError::validation("gatherv root needs one count per rank"))?;

        let mut parts: Vec<Option<Vec<f32>>> = vec![None; self.size()];
        parts[root] = Some(values);
        for (src, req) in self.post_from_all_but_self(TAG_GATHERV)? {
            parts[src] = Some(req.wait()?.into_f32()?);
        }

        let total = counts.iter().map(|&c| c.max(0) as usize).sum();
        let mut out = Vec::with_capacity(total);
        for (src, part) in parts.into_iter().enumerate() {
            let part = part.unwrap_or_default();
            if part.len() as i64 != counts[src] {
                return Err(CompositorError::protocol(format!(
                    "rank {src} announced {} values but sent {}",
                    counts[src],
                    part.len()
                )));
            }
            out.extend(part);
        }
        Ok(Some(out))
    }

    /// Exchange `per_rank` values with every rank: block `j` of `send` goes
    /// to rank `j`, block `i` of the result came from rank `i`.
    fn all_to_all_i64(&self, send: &[i64], per_rank: usize) -> CompositorResult<Vec<i64>> {
        let size = self.size();
        let me = self.rank();
        if send.len() != per_rank * size {
            return Err(CompositorError::validation(format!(
                "all-to-all expects {} values, got {}",
                per_rank * size,
                send.len()
            )));
        }

        let recvs = self.post_from_all_but_self(TAG_ALL_TO_ALL)?;
        let mut sends = Vec::with_capacity(size.saturating_sub(1));
        for dest in (0..size).filter(|&d| d != me) {
            let block = send[dest * per_rank..(dest + 1) * per_rank].to_vec();
            sends.push(self.isend(dest, TAG_ALL_TO_ALL, Payload::I64(block))?);
        }

        let mut out = vec![0; per_rank * size];
        out[me * per_rank..(me + 1) * per_rank]
            .copy_from_slice(&send[me * per_rank..(me + 1) * per_rank]);
        for (src, req) in recvs {
            let block = req.wait()?.into_i64()?;
            if block.len() != per_rank {
                return Err(CompositorError::protocol(format!(
                    "all-to-all block from rank {src} has {} values, expected {per_rank}",
                    block.len()
                )));
            }
            out[src * per_rank..(src + 1) * per_rank].copy_from_slice(&block);
        }
        wait_all_send(sends)?;
        Ok(out)
    }

    /// Block until every rank has entered the barrier.
    fn barrier(&self) -> CompositorResult<()> {
        let size = self.size();
        if self.rank() != 0 {
            self.send(0, TAG_BARRIER_IN, Payload::I64(Vec::new()))?;
            self.recv(0, TAG_BARRIER_OUT)?;
            return Ok(());
        }
        for (_, req) in self.post_from_all_but_self(TAG_BARRIER_IN)? {
            req.wait()?;
        }
        let mut sends = Vec::with_capacity(size.saturating_sub(1));
        for dest in 1..size {
            sends.push(self.isend(dest, TAG_BARRIER_OUT, Payload::I64(Vec::new()))?);
        }
        wait_all_send(sends)
    }

    /// Post a receive on `tag` from every other rank.
    #[doc(hidden)]
    fn post_from_all_but_self(&self, tag: Tag) -> CompositorResult<Vec<(usize, RecvRequest)>> {
        let me = self.rank();
        (0..self.size())
            .filter(|&src| src != me)
            .map(|src| Ok((src, self.irecv(src, tag)?)))
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/comm/mod.rs"]
mod tests;
