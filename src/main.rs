mod blackboard; // shared, lock-protected body
mod settings; // configuration loading

use anyhow::Context;
use sphinx_kinematics::{Body, sample_transforms};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use blackboard::{footholds, move_keep_feet_fixed, share, snapshot};
use settings::{DEFAULT_CONFIG_PATH, load_config};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let settings = load_config(DEFAULT_CONFIG_PATH)
        .with_context(|| format!("loading configuration from {}", DEFAULT_CONFIG_PATH))?;

    let geometry = &settings.body;
    let body = Body::with_yaw_convention(
        geometry.initial_transform(),
        geometry.d1,
        geometry.d2,
        geometry.link_length,
        settings.solver.yaw_convention,
    )
    .context("planting feet for the initial body pose")?;
    info!(%body, "Body constructed with feet planted.");

    let bb = share(body);
    info!(footholds = ?footholds(&bb), "Initial footholds");
    let start = *snapshot(&bb).transform();
    let target = settings.trajectory.target.to_transform();
    info!(%start, %target, steps = settings.trajectory.steps, "Following trajectory with feet fixed...");

    let (mut accepted, mut rejected) = (0usize, 0usize);
    // The first sample is the start pose itself.
    for (step, candidate) in sample_transforms(start, target, settings.trajectory.steps)
        .enumerate()
        .skip(1)
    {
        match move_keep_feet_fixed(&bb, candidate) {
            Ok(()) => {
                accepted += 1;
                debug!(step, %candidate, "Keyframe accepted");
            }
            Err(e) => {
                rejected += 1;
                warn!(step, error = %e, "Keyframe rejected; holding previous pose");
            }
        }
    }

    let body = snapshot(&bb);
    for (id, leg) in body.legs() {
        info!(leg = %id, %leg, knee = ?leg.knee_position(), "Final leg state");
    }
    info!(accepted, rejected, final_pose = %body.transform(), "Trajectory complete.");
    Ok(())
}
