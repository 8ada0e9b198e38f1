//! Group-wide consensus on a local ok/fail flag.
//!
//! Every fallible step in a run produces a local boolean; the barrier turns
//! those independent signals into one group-wide verdict. A failure on any
//! single member is visible to, and terminates, all members. There is no
//! partial continuation and no per-member retry past a failed barrier.

use crate::config::GroupConfig;
use crate::group::GroupChannel;
use herd_common::{HerdError, Result};
use tracing::debug;

/// Vote this member's `local_ok` flag and block until the whole group has
/// voted.
///
/// The flags are combined with logical AND via an all-reduce minimum: any
/// member voting 0 makes the group verdict 0. On a failed verdict the leader
/// writes one diagnostic line to the error stream and every member returns
/// [`HerdError::Aborted`]; the callers unwind from there, releasing their
/// slices on the way out. A member that is locally ok still blocks here
/// until every peer has voted.
pub async fn check(
    channel: &mut GroupChannel,
    cfg: &GroupConfig,
    local_ok: bool,
    context: &str,
    message: &str,
) -> Result<()> {
    let verdict = channel.all_reduce_min(i64::from(local_ok)).await?;
    if verdict == 0 {
        debug!(rank = cfg.rank(), context, "group verdict: abort");
        if cfg.is_leader() {
            eprintln!("Proc {} > In {}, {}", cfg.rank(), context, message);
        }
        return Err(HerdError::Aborted {
            rank: cfg.rank(),
            context: context.to_string(),
            message: message.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::WorkerGroup;

    async fn vote_all(comm_sz: usize, failing_rank: Option<usize>) -> Vec<Result<()>> {
        let group = WorkerGroup::new(comm_sz).unwrap();
        let handles: Vec<_> = group
            .into_endpoints()
            .into_iter()
            .map(|mut ch| {
                tokio::spawn(async move {
                    let cfg = GroupConfig::new(ch.comm_sz(), ch.rank());
                    let local_ok = failing_rank != Some(ch.rank());
                    check(&mut ch, &cfg, local_ok, "allocation", "cannot allocate").await
                })
            })
            .collect();
        let mut results = Vec::with_capacity(comm_sz);
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        results
    }

    #[tokio::test]
    async fn test_all_ok_passes() {
        for result in vote_all(4, None).await {
            assert!(result.is_ok());
        }
    }

    #[tokio::test]
    async fn test_single_failure_aborts_every_member() {
        for (rank, result) in vote_all(4, Some(2)).await.into_iter().enumerate() {
            match result.unwrap_err() {
                HerdError::Aborted {
                    rank: r,
                    context,
                    message,
                } => {
                    assert_eq!(r, rank);
                    assert_eq!(context, "allocation");
                    assert_eq!(message, "cannot allocate");
                }
                other => panic!("expected Aborted, got {other}"),
            }
        }
    }

    #[tokio::test]
    async fn test_leader_failure_aborts_every_member() {
        for result in vote_all(3, Some(0)).await {
            assert!(result.unwrap_err().is_aborted());
        }
    }
}
