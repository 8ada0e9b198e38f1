//! Wiring a full run: size agreement, allocation, generation, kernels,
//! gathering, timing.
//!
//! Every member executes the identical sequence of collective calls in
//! lockstep; no member may skip or reorder one, or the whole group stalls.
//! The member tasks are spawned here and joined before the run reports its
//! outcome.

use crate::config::GroupConfig;
use crate::group::{GroupChannel, WorkerGroup};
use crate::vector::LocalSlice;
use crate::{ops, partition, report, vector};
use herd_common::{HerdError, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Instant;
use tracing::{debug, info};

/// Which kernels a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum KernelSet {
    /// Elementwise sum of the two inputs.
    Sum,
    /// Sum, elementwise product, and the scalar product of each input.
    Extended,
}

/// One run's configuration, identical on every member.
///
/// The three historical program shapes collapse into this: the plain sum is
/// `KernelSet::Sum`, the sum/product/scalar program is `KernelSet::Extended`,
/// and the single-process variant is either with a group of one.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunPlan {
    /// Global vector order, as read on the leader. Validated by the group,
    /// not here.
    pub n: i64,
    /// Scalar parameter; required for [`KernelSet::Extended`].
    pub scalar: Option<i64>,
    pub kernels: KernelSet,
    /// Preview the generated inputs before computing.
    pub preview_inputs: bool,
    /// Seed for the input generator; entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl RunPlan {
    fn validate(&self) -> Result<()> {
        if self.kernels == KernelSet::Extended && self.scalar.is_none() {
            return Err(HerdError::configuration_error(
                "the extended kernel set needs a scalar parameter",
            ));
        }
        Ok(())
    }

    /// Slices a member needs: two inputs plus one output per kernel.
    fn slice_count(&self) -> usize {
        match self.kernels {
            KernelSet::Sum => 3,
            KernelSet::Extended => 6,
        }
    }
}

/// Execute one full run across a group of `comm_sz` members.
///
/// Spawns one task per member, all running [`run_member`] with the same
/// plan, and joins them all. Any member's error is the run's error; when the
/// group aborted by consensus, the leader's verdict is the one reported.
pub async fn run(plan: RunPlan, comm_sz: usize) -> Result<()> {
    plan.validate()?;
    let group = WorkerGroup::new(comm_sz)?;
    info!(comm_sz, kernels = ?plan.kernels, n = plan.n, "starting run");

    let handles: Vec<_> = group
        .into_endpoints()
        .into_iter()
        .map(|endpoint| {
            let plan = plan.clone();
            tokio::spawn(run_member(endpoint, plan))
        })
        .collect();

    let mut first_err = None;
    for (rank, joined) in futures::future::join_all(handles).await.into_iter().enumerate() {
        let result = joined.map_err(|e| {
            HerdError::channel_error_with_source(format!("member {rank} task failed"), e)
        })?;
        if let Err(e) = result {
            debug!(rank, error = %e, "member finished with error");
            first_err.get_or_insert(e);
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => {
            info!("run complete");
            Ok(())
        }
    }
}

/// The symmetric per-member sequence.
///
/// Collective call order, identical everywhere: agree size → agree scalar
/// (extended only) → allocate the slice batch under one vote → generate each
/// input → optional input previews → kernels between two timestamps → output
/// previews → elapsed line on the leader. Slices are dropped when this
/// function returns, on success and on the abort path alike.
pub async fn run_member(mut channel: GroupChannel, plan: RunPlan) -> Result<()> {
    let cfg = GroupConfig::new(channel.comm_sz(), channel.rank());
    let mut rng = match plan.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let leader_n = cfg.is_leader().then_some(plan.n);
    let agreement = partition::agree_size(&mut channel, &cfg, leader_n).await?;

    let scalar = match plan.kernels {
        KernelSet::Extended => {
            let leader_scalar = if cfg.is_leader() { plan.scalar } else { None };
            Some(partition::agree_scalar(&mut channel, &cfg, leader_scalar).await?)
        }
        KernelSet::Sum => None,
    };

    let mut slices =
        vector::allocate_slices(&mut channel, &cfg, agreement.local_n, plan.slice_count()).await?;

    for input in &mut slices[..2] {
        vector::generate(&mut channel, &cfg, input, agreement.n, &mut rng).await?;
    }

    if plan.preview_inputs {
        report::present(&mut channel, &cfg, &slices[0], agreement.n, "Vector x is:").await?;
        report::present(&mut channel, &cfg, &slices[1], agreement.n, "Vector y is:").await?;
    }

    // Every member takes both timestamps; only the leader's elapsed value is
    // printed.
    let started = Instant::now();
    compute(&plan, scalar, &mut slices);
    let elapsed = started.elapsed();

    present_outputs(&mut channel, &cfg, &plan, &slices, agreement.n).await?;

    if cfg.is_leader() {
        println!("\nTook {:.6} seconds to run", elapsed.as_secs_f64());
    }
    Ok(())
}

/// Run the plan's kernels over the slice batch: inputs at 0..2, outputs
/// after.
fn compute(plan: &RunPlan, scalar: Option<i64>, slices: &mut [LocalSlice]) {
    let (inputs, outputs) = slices.split_at_mut(2);
    let (x, y) = (&inputs[0], &inputs[1]);
    ops::vector_sum(x, y, &mut outputs[0]);
    if plan.kernels == KernelSet::Extended {
        let scalar = scalar.unwrap_or_default();
        ops::elementwise_product(x, y, &mut outputs[1]);
        ops::scalar_product(x, scalar, &mut outputs[2]);
        ops::scalar_product(y, scalar, &mut outputs[3]);
    }
}

async fn present_outputs(
    channel: &mut GroupChannel,
    cfg: &GroupConfig,
    plan: &RunPlan,
    slices: &[LocalSlice],
    n: usize,
) -> Result<()> {
    report::present(channel, cfg, &slices[2], n, "The sum is").await?;
    if plan.kernels == KernelSet::Extended {
        report::present(channel, cfg, &slices[3], n, "The dot product is").await?;
        report::present(channel, cfg, &slices[4], n, "The product of x by scalar is").await?;
        report::present(channel, cfg, &slices[5], n, "The product of y by scalar is").await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn sum_plan(n: i64) -> RunPlan {
        RunPlan {
            n,
            scalar: None,
            kernels: KernelSet::Sum,
            preview_inputs: false,
            seed: Some(42),
        }
    }

    #[tokio::test]
    async fn test_sum_run_completes() {
        run(sum_plan(10_000), 4).await.unwrap();
    }

    #[tokio::test]
    async fn test_extended_run_completes() {
        let plan = RunPlan {
            n: 96,
            scalar: Some(-3),
            kernels: KernelSet::Extended,
            preview_inputs: true,
            seed: Some(1),
        };
        run(plan, 4).await.unwrap();
    }

    #[tokio::test]
    async fn test_single_member_run_completes() {
        run(sum_plan(10), 1).await.unwrap();
    }

    #[tokio::test]
    async fn test_indivisible_size_aborts_whole_group() {
        let err = run(sum_plan(7), 3).await.unwrap_err();
        match err {
            HerdError::Aborted { rank, context, .. } => {
                assert_eq!(rank, 0);
                assert_eq!(context, "size agreement");
            }
            other => panic!("expected Aborted, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_extended_without_scalar_rejected_before_spawn() {
        let plan = RunPlan {
            scalar: None,
            kernels: KernelSet::Extended,
            ..sum_plan(8)
        };
        let err = run(plan, 2).await.unwrap_err();
        assert!(matches!(err, HerdError::ConfigurationError { .. }));
    }

    /// The full pipeline by hand, with the gathered result checked element
    /// for element against the leader's source vectors.
    #[tokio::test]
    async fn test_distributed_sum_matches_elementwise_sum() {
        let n = 10_000;
        let comm_sz = 4;
        let seed = 99;

        let mut reference = StdRng::seed_from_u64(seed);
        let x: Vec<f64> = (0..n).map(|_| reference.r#gen()).collect();
        let y: Vec<f64> = (0..n).map(|_| reference.r#gen()).collect();
        let expected: Vec<f64> = x.iter().zip(&y).map(|(a, b)| a + b).collect();

        let group = WorkerGroup::new(comm_sz).unwrap();
        let handles: Vec<_> = group
            .into_endpoints()
            .into_iter()
            .map(|mut ch| {
                tokio::spawn(async move {
                    let cfg = GroupConfig::new(ch.comm_sz(), ch.rank());
                    let mut rng = StdRng::seed_from_u64(seed);
                    let leader_n = cfg.is_leader().then_some(n as i64);
                    let agreement =
                        partition::agree_size(&mut ch, &cfg, leader_n).await.unwrap();
                    assert_eq!(agreement.local_n, 2_500);

                    let mut slices =
                        vector::allocate_slices(&mut ch, &cfg, agreement.local_n, 3)
                            .await
                            .unwrap();
                    for input in &mut slices[..2] {
                        vector::generate(&mut ch, &cfg, input, agreement.n, &mut rng)
                            .await
                            .unwrap();
                    }
                    let (inputs, outputs) = slices.split_at_mut(2);
                    ops::vector_sum(&inputs[0], &inputs[1], &mut outputs[0]);
                    ch.gather(&outputs[0][..], agreement.local_n, cfg.leader())
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        let gathered = results[0].clone().unwrap();
        assert_eq!(gathered.len(), n);
        assert_eq!(gathered, expected);
    }
}
