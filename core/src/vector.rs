//! Local slices and leader-side vector generation.
//!
//! A [`LocalSlice`] is one member's contiguous portion of a conceptually
//! global vector; the rank-ordered concatenation of all slices reconstructs
//! the global vector exactly. Slices are allocated fallibly so a single
//! member's out-of-memory condition becomes a group verdict instead of a
//! local crash, and they live exactly from the orchestrator's allocation
//! step to the end of the run, on every exit path.

use crate::barrier;
use crate::config::GroupConfig;
use crate::group::GroupChannel;
use herd_common::{HerdError, Result};
use rand::Rng;
use tracing::debug;

/// A member-owned, fixed-length slice of the global vector.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSlice {
    data: Vec<f64>,
}

impl LocalSlice {
    /// Allocate a zero-filled slice of `local_n` elements.
    ///
    /// Allocation failure is reported as a [`HerdError::ResourceError`]
    /// rather than aborting the process, so the caller can feed it into the
    /// group barrier.
    pub fn allocate(local_n: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(local_n)
            .map_err(|e| HerdError::ResourceError {
                message: format!("cannot allocate local vector of {local_n} elements"),
                source: Some(e.into()),
            })?;
        data.resize(local_n, 0.0);
        Ok(Self { data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::ops::Deref for LocalSlice {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.data
    }
}

impl std::ops::DerefMut for LocalSlice {
    fn deref_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

/// Allocate `count` independent slices of `local_n` elements each, under a
/// single group vote.
///
/// Every member allocates its whole batch, then the group votes once with
/// context `"allocation"`; any member's failure aborts every member before
/// any slice is used.
pub async fn allocate_slices(
    channel: &mut GroupChannel,
    cfg: &GroupConfig,
    local_n: usize,
    count: usize,
) -> Result<Vec<LocalSlice>> {
    let mut slices = Vec::with_capacity(count);
    let mut local_ok = true;
    for _ in 0..count {
        match LocalSlice::allocate(local_n) {
            Ok(slice) => slices.push(slice),
            Err(_) => {
                local_ok = false;
                break;
            }
        }
    }
    barrier::check(
        channel,
        cfg,
        local_ok,
        "allocation",
        "cannot allocate local vector(s)",
    )
    .await?;
    debug!(rank = cfg.rank(), count, local_n, "slices allocated");
    Ok(slices)
}

/// Fill one input vector with uniform-random values in [0,1) and distribute
/// it across the group.
///
/// The leader allocates a transient full-length buffer, fills it from `rng`,
/// scatters equal chunks, and drops the buffer; non-leaders only receive
/// their chunk. The group votes on the transient allocation with context
/// `"generation"` before any data moves. `rng` is the run-level generator,
/// seeded once per run — reseeding per call from a low-resolution clock can
/// hand successive calls identical sequences.
pub async fn generate<R: Rng>(
    channel: &mut GroupChannel,
    cfg: &GroupConfig,
    out: &mut LocalSlice,
    n: usize,
    rng: &mut R,
) -> Result<()> {
    let local_n = out.len();
    debug_assert_eq!(local_n * cfg.comm_sz(), n);

    let mut full: Vec<f64> = Vec::new();
    let local_ok = if cfg.is_leader() {
        full.try_reserve_exact(n).is_ok()
    } else {
        true
    };
    barrier::check(
        channel,
        cfg,
        local_ok,
        "generation",
        "cannot allocate temporary vector",
    )
    .await?;

    let chunk = if cfg.is_leader() {
        full.extend((0..n).map(|_| rng.r#gen::<f64>()));
        channel.scatter(Some(&full[..]), local_n, cfg.leader()).await?
    } else {
        channel.scatter(None, local_n, cfg.leader()).await?
    };
    out.copy_from_slice(&chunk);
    Ok(())
}
