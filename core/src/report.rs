//! Gathering results back to the leader and rendering previews.
//!
//! Presentation never mutates a slice: every member hands its chunk to a
//! gather, and only the leader prints. Long vectors are truncated to the
//! first ten values, an ellipsis, and the last ten.

use crate::barrier;
use crate::config::GroupConfig;
use crate::group::GroupChannel;
use crate::vector::LocalSlice;
use herd_common::Result;

const PREVIEW_HEAD: usize = 10;
const PREVIEW_TAIL: usize = 10;

/// Render the truncated preview of a full-length vector.
///
/// The first `min(10, n)` values at 3-decimal precision, `"..."` when
/// `n > 20`, then the values at indices `n-10..n` that sit at index 10 or
/// beyond. For `10 <= n <= 20` the two windows meet (or overlap is filtered
/// out), so everything prints without an ellipsis.
pub fn preview(values: &[f64]) -> String {
    let n = values.len();
    let mut out = String::new();
    for v in values.iter().take(PREVIEW_HEAD) {
        out.push_str(&format!("{v:.3} "));
    }
    if n > PREVIEW_HEAD + PREVIEW_TAIL {
        out.push_str("... ");
    }
    for (i, v) in values.iter().enumerate().skip(n.saturating_sub(PREVIEW_TAIL)) {
        if i >= PREVIEW_HEAD {
            out.push_str(&format!("{v:.3} "));
        }
    }
    out.trim_end().to_string()
}

/// Gather the group's slices into a full-length vector on the leader and
/// print a titled preview there.
///
/// Every member participates in the gather; non-leaders print nothing. The
/// leader's transient gather destination is subject to the same group vote
/// as any other allocation, with context `"presentation"`.
pub async fn present(
    channel: &mut GroupChannel,
    cfg: &GroupConfig,
    local: &LocalSlice,
    n: usize,
    title: &str,
) -> Result<()> {
    debug_assert_eq!(local.len() * cfg.comm_sz(), n);

    let local_ok = if cfg.is_leader() {
        let mut probe: Vec<f64> = Vec::new();
        probe.try_reserve_exact(n).is_ok()
    } else {
        true
    };
    barrier::check(
        channel,
        cfg,
        local_ok,
        "presentation",
        "cannot allocate temporary vector",
    )
    .await?;

    let gathered = channel.gather(&local[..], local.len(), cfg.leader()).await?;
    if let Some(values) = gathered {
        println!("{title}");
        println!("{}", preview(&values));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::WorkerGroup;

    fn indexed(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn test_preview_long_vector_is_truncated() {
        let rendered = preview(&indexed(25));
        let fields: Vec<&str> = rendered.split_whitespace().collect();
        assert_eq!(fields.len(), 21);
        assert_eq!(fields[10], "...");
        assert_eq!(fields[..10], indexed(10).iter().map(|v| format!("{v:.3}")).collect::<Vec<_>>()[..]);
        assert_eq!(fields[11], "15.000");
        assert_eq!(fields[20], "24.000");
    }

    #[test]
    fn test_preview_mid_length_prints_everything_without_ellipsis() {
        // 10 <= n <= 20: the head window plus the tail values at index >= 10
        // cover the whole vector, with no gap and no ellipsis.
        let rendered = preview(&indexed(15));
        let fields: Vec<&str> = rendered.split_whitespace().collect();
        assert_eq!(fields.len(), 15);
        assert!(!rendered.contains("..."));
        assert_eq!(fields[10], "10.000");
        assert_eq!(fields[14], "14.000");

        let rendered = preview(&indexed(20));
        assert_eq!(rendered.split_whitespace().count(), 20);
        assert!(!rendered.contains("..."));
    }

    #[test]
    fn test_preview_short_vector_prints_all() {
        let rendered = preview(&indexed(5));
        assert_eq!(rendered, "0.000 1.000 2.000 3.000 4.000");
    }

    #[test]
    fn test_preview_boundary_at_21_gains_ellipsis() {
        let rendered = preview(&indexed(21));
        let fields: Vec<&str> = rendered.split_whitespace().collect();
        assert_eq!(fields.len(), 21);
        assert_eq!(fields[10], "...");
        // indices 11..21 survive the i >= 10 filter
        assert_eq!(fields[11], "11.000");
    }

    #[tokio::test]
    async fn test_present_runs_lockstep_without_deadlock() {
        let group = WorkerGroup::new(2).unwrap();
        let handles: Vec<_> = group
            .into_endpoints()
            .into_iter()
            .map(|mut ch| {
                tokio::spawn(async move {
                    let cfg = GroupConfig::new(ch.comm_sz(), ch.rank());
                    let mut slice = LocalSlice::allocate(3).unwrap();
                    slice.fill(cfg.rank() as f64);
                    present(&mut ch, &cfg, &slice, 6, "Vector x is:").await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    }
}
