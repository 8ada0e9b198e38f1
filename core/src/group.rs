//! Collective communication over a closed, fixed-size worker group.
//!
//! A [`WorkerGroup`] wires up `comm_sz` endpoints over a full mesh of
//! unbounded channels, one dedicated inbox per peer, so collective data is
//! always consumed in strict rank order regardless of arrival interleaving.
//! Every value crossing between members travels as a bincode-encoded frame.
//!
//! All four primitives are collective: every member must call the same
//! primitive at the same logical point in its program, or the group
//! deadlocks. The primitives cannot detect a skewed call sequence; keeping
//! the sequence identical on every member is the caller's obligation.

use herd_common::{HerdError, Result};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// A single unit of data in flight between two members.
type Frame = Vec<u8>;

/// Values that can cross between group members.
pub trait Payload: bincode::Encode + bincode::Decode<()> + Send + 'static {}

impl<T> Payload for T where T: bincode::Encode + bincode::Decode<()> + Send + 'static {}

fn encode<T: Payload>(value: &T) -> Result<Frame> {
    bincode::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| HerdError::channel_error_with_source("failed to encode frame", e))
}

fn decode<T: Payload>(frame: &[u8]) -> Result<T> {
    let (value, _) = bincode::decode_from_slice(frame, bincode::config::standard())
        .map_err(|e| HerdError::channel_error_with_source("failed to decode frame", e))?;
    Ok(value)
}

/// Builder for the endpoints of a fixed-membership group.
///
/// The group exists only as the set of endpoints it hands out; once
/// [`into_endpoints`](WorkerGroup::into_endpoints) is called, each endpoint
/// is exclusively owned by the member task that runs it.
#[derive(Debug)]
pub struct WorkerGroup {
    endpoints: Vec<GroupChannel>,
}

impl WorkerGroup {
    /// Create the channel mesh for a group of `comm_sz` members.
    pub fn new(comm_sz: usize) -> Result<Self> {
        if comm_sz == 0 {
            return Err(HerdError::configuration_error(
                "worker group needs at least one member",
            ));
        }

        // Full mesh: one channel per ordered (from, to) pair. peer_rows[from]
        // collects senders indexed by destination, inbox_rows[to] collects
        // receivers indexed by origin.
        let mut peer_rows: Vec<Vec<mpsc::UnboundedSender<Frame>>> =
            (0..comm_sz).map(|_| Vec::with_capacity(comm_sz)).collect();
        let mut inbox_rows: Vec<Vec<mpsc::UnboundedReceiver<Frame>>> =
            (0..comm_sz).map(|_| Vec::with_capacity(comm_sz)).collect();
        for from in 0..comm_sz {
            for to in 0..comm_sz {
                let (tx, rx) = mpsc::unbounded_channel();
                peer_rows[from].push(tx);
                inbox_rows[to].push(rx);
            }
        }

        let endpoints = peer_rows
            .into_iter()
            .zip(inbox_rows)
            .enumerate()
            .map(|(rank, (peers, inboxes))| GroupChannel {
                rank,
                comm_sz,
                peers,
                inboxes,
            })
            .collect();

        debug!(comm_sz, "worker group mesh created");
        Ok(Self { endpoints })
    }

    pub fn comm_sz(&self) -> usize {
        self.endpoints.len()
    }

    /// Consume the group, yielding one endpoint per member in rank order.
    pub fn into_endpoints(self) -> Vec<GroupChannel> {
        self.endpoints
    }
}

/// One member's endpoint into the group.
///
/// A member blocks inside a collective until every peer involved has reached
/// the matching call; there is no partial or asynchronous collective. A peer
/// that hangs up (its endpoint dropped) surfaces as a fatal
/// [`HerdError::ChannelError`] rather than a retry.
#[derive(Debug)]
pub struct GroupChannel {
    rank: usize,
    comm_sz: usize,
    /// peers[r] sends frames to member r. The self entry exists but is unused.
    peers: Vec<mpsc::UnboundedSender<Frame>>,
    /// inboxes[r] receives frames sent by member r, in that member's send order.
    inboxes: Vec<mpsc::UnboundedReceiver<Frame>>,
}

impl GroupChannel {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn comm_sz(&self) -> usize {
        self.comm_sz
    }

    fn send_to(&self, to: usize, frame: Frame) -> Result<()> {
        trace!(from = self.rank, to, len = frame.len(), "send frame");
        self.peers[to]
            .send(frame)
            .map_err(|_| HerdError::channel_error(format!("member {to} hung up")))
    }

    async fn recv_from(&mut self, from: usize) -> Result<Frame> {
        let frame = self.inboxes[from]
            .recv()
            .await
            .ok_or_else(|| HerdError::channel_error(format!("member {from} hung up")))?;
        trace!(from, to = self.rank, len = frame.len(), "recv frame");
        Ok(frame)
    }

    /// Every member receives the value sent by `root`.
    ///
    /// Only the root's `value` argument is meaningful; every other member
    /// passes `None` and the argument is ignored.
    pub async fn broadcast<T: Payload>(&mut self, value: Option<T>, root: usize) -> Result<T> {
        debug_assert!(root < self.comm_sz);
        if self.rank == root {
            let value = value.ok_or_else(|| {
                HerdError::protocol_error("broadcast root must supply a value")
            })?;
            let frame = encode(&value)?;
            for to in 0..self.comm_sz {
                if to != self.rank {
                    self.send_to(to, frame.clone())?;
                }
            }
            Ok(value)
        } else {
            let frame = self.recv_from(root).await?;
            decode(&frame)
        }
    }

    /// Split `root`'s full sequence into `comm_sz` contiguous chunks of
    /// `chunk_len` elements and deliver the chunk at each member's rank.
    ///
    /// Only the root supplies `full`; its length must be exactly
    /// `chunk_len * comm_sz`. Every member, the root included, receives its
    /// own chunk.
    pub async fn scatter<T: Payload + Clone>(
        &mut self,
        full: Option<&[T]>,
        chunk_len: usize,
        root: usize,
    ) -> Result<Vec<T>> {
        debug_assert!(root < self.comm_sz);
        if self.rank == root {
            let full = full.ok_or_else(|| {
                HerdError::protocol_error("scatter root must supply the full sequence")
            })?;
            if full.len() != chunk_len * self.comm_sz {
                return Err(HerdError::protocol_error(format!(
                    "scatter length mismatch: {} elements cannot split into {} chunks of {}",
                    full.len(),
                    self.comm_sz,
                    chunk_len
                )));
            }
            let mut own = Vec::new();
            for (to, chunk) in full.chunks(chunk_len).enumerate() {
                if to == self.rank {
                    own = chunk.to_vec();
                } else {
                    self.send_to(to, encode(&chunk.to_vec())?)?;
                }
            }
            Ok(own)
        } else {
            let frame = self.recv_from(root).await?;
            let chunk: Vec<T> = decode(&frame)?;
            if chunk.len() != chunk_len {
                return Err(HerdError::channel_error(format!(
                    "scatter chunk from member {root} has {} elements, expected {chunk_len}",
                    chunk.len()
                )));
            }
            Ok(chunk)
        }
    }

    /// Concatenate every member's chunk, in rank order, on `dest`.
    ///
    /// Only `dest` receives the assembled sequence; every other member
    /// receives `None`.
    pub async fn gather<T: Payload + Clone>(
        &mut self,
        chunk: &[T],
        chunk_len: usize,
        dest: usize,
    ) -> Result<Option<Vec<T>>> {
        debug_assert!(dest < self.comm_sz);
        debug_assert_eq!(chunk.len(), chunk_len);
        if self.rank == dest {
            let mut full = Vec::with_capacity(chunk_len * self.comm_sz);
            for from in 0..self.comm_sz {
                if from == self.rank {
                    full.extend_from_slice(chunk);
                } else {
                    let frame = self.recv_from(from).await?;
                    let piece: Vec<T> = decode(&frame)?;
                    if piece.len() != chunk_len {
                        return Err(HerdError::channel_error(format!(
                            "gather chunk from member {from} has {} elements, expected {chunk_len}",
                            piece.len()
                        )));
                    }
                    full.extend(piece);
                }
            }
            Ok(Some(full))
        } else {
            self.send_to(dest, encode(&chunk.to_vec())?)?;
            Ok(None)
        }
    }

    /// Every member receives the minimum of all members' local value.
    ///
    /// Implemented as a gather to rank 0 followed by a broadcast, so rank 0
    /// anchors the reduction regardless of who the run's leader is.
    pub async fn all_reduce_min(&mut self, local: i64) -> Result<i64> {
        let gathered = self.gather(&[local], 1, 0).await?;
        let min = gathered.map(|values| values.into_iter().min().unwrap_or(local));
        self.broadcast(min, 0).await
    }
}
