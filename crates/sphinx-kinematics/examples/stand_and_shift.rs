use sphinx_kinematics::*;

fn main() {
    let d1 = 0.5;
    let d2 = 1.0;
    let link_length = 1.0;
    let start = Transform::from_translation(0.0, 0.0, 1.5);
    let target = Transform::from_rpy(Vector3::new(0.1, 0.05, 1.3), 0.0, 0.0, 0.2);
    let num_steps = 10;

    match Body::new(start, d1, d2, link_length) {
        Ok(mut body) => {
            println!("Initializing body...");
            println!("  Geometry:");
            println!("    d1:          {} m", body.d1());
            println!("    d2:          {} m", body.d2());
            println!("    Link Length: {} m", body.link_length());
            println!("  Initial Legs:");
            for (id, leg) in body.legs() {
                println!("    {}: {}", id, leg);
            }
            println!("\nShifting body with feet fixed...");

            for (i, candidate) in sample_transforms(start, target, num_steps).enumerate().skip(1) {
                match body.set_body_transform_keep_feet_fixed(candidate) {
                    Ok(()) => println!("Step {:>2}: {}", i, body.transform()),
                    Err(e) => {
                        eprintln!("Step {:>2} rejected: {}", i, e);
                        break; // Stop at the first infeasible pose
                    }
                }
            }

            println!("\nShift complete.");
            for (id, leg) in body.legs() {
                println!("  {}: {}", id, leg);
            }
        }
        Err(e) => {
            eprintln!("Failed to build body: {}", e);
            eprintln!("Please ensure the body height is within reach of the legs (2 * {}).", link_length);
        }
    }
}
