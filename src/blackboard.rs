use parking_lot::RwLock;
use std::sync::Arc;

use sphinx_kinematics::{Body, KinematicsError, Transform, Vector3};
use tracing::debug;

/// A body shared between threads. Writers hold the lock for the whole
/// constrained update, so readers see either the old or the new pose.
pub type SharedBody = Arc<RwLock<Body>>;

pub fn share(body: Body) -> SharedBody {
    Arc::new(RwLock::new(body))
}

pub fn snapshot(bb: &SharedBody) -> Body {
    (*bb.read()).clone()
}

pub fn footholds(bb: &SharedBody) -> [Vector3<f64>; 3] {
    bb.read().footholds()
}

pub fn move_keep_feet_fixed(bb: &SharedBody, candidate: Transform) -> Result<(), KinematicsError> {
    let mut g = bb.write();
    g.set_body_transform_keep_feet_fixed(candidate)?;
    debug!(transform = %g.transform(), "shared body updated");
    Ok(())
}
