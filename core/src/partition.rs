//! Size agreement and slice-length derivation.
//!
//! The leader obtains the global vector order from its input source; the
//! group broadcasts it, validates it, and derives each member's local slice
//! length. A size that is not positive or does not divide evenly across the
//! group is a configuration error for everyone, raised before any slice is
//! allocated.

use crate::barrier;
use crate::config::GroupConfig;
use crate::group::GroupChannel;
use herd_common::Result;
use tracing::debug;

/// The group's agreed problem size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeAgreement {
    /// Global vector order.
    pub n: usize,
    /// Length of each member's local slice, `n / comm_sz`.
    pub local_n: usize,
}

/// Agree the global vector order across the group.
///
/// Only the leader supplies `leader_n`; every other member passes `None` and
/// receives the broadcast value. Every member then validates
/// `n > 0 && n % comm_sz == 0` and votes; a failed vote aborts the run with
/// context `"size agreement"`. On success `local_n` is derived identically
/// on every member with no further communication.
pub async fn agree_size(
    channel: &mut GroupChannel,
    cfg: &GroupConfig,
    leader_n: Option<i64>,
) -> Result<SizeAgreement> {
    let n = channel.broadcast(leader_n, cfg.leader()).await?;
    let local_ok = n > 0 && n % cfg.comm_sz() as i64 == 0;
    barrier::check(
        channel,
        cfg,
        local_ok,
        "size agreement",
        "n must be positive and evenly divisible by the worker count",
    )
    .await?;

    let n = n as usize;
    let local_n = n / cfg.comm_sz();
    debug!(rank = cfg.rank(), n, local_n, "size agreed");
    Ok(SizeAgreement { n, local_n })
}

/// Agree the scalar parameter across the group.
///
/// A plain broadcast from the leader; any integer is legal, so no vote
/// follows.
pub async fn agree_scalar(
    channel: &mut GroupChannel,
    cfg: &GroupConfig,
    leader_scalar: Option<i64>,
) -> Result<i64> {
    channel.broadcast(leader_scalar, cfg.leader()).await
}
