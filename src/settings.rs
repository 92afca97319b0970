use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use sphinx_kinematics::{Transform, Vector3, YawConvention};
use tracing::{error, info};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Application settings, loaded from TOML with `SPHINX__*` environment overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub body: BodySettings,
    pub trajectory: TrajectorySettings,
    #[serde(default)]
    pub solver: SolverSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BodySettings {
    pub d1: f64,
    pub d2: f64,
    pub link_length: f64,
    /// Initial height of the body frame above the ground plane.
    pub height: f64,
}

impl BodySettings {
    pub fn initial_transform(&self) -> Transform {
        Transform::from_translation(0.0, 0.0, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrajectorySettings {
    pub steps: usize,
    pub target: PoseSettings,
}

/// A pose as a translation plus roll/pitch/yaw in radians.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PoseSettings {
    pub translation: [f64; 3],
    #[serde(default)]
    pub rpy: [f64; 3],
}

impl PoseSettings {
    pub fn to_transform(&self) -> Transform {
        let [x, y, z] = self.translation;
        let [roll, pitch, yaw] = self.rpy;
        Transform::from_rpy(Vector3::new(x, y, z), roll, pitch, yaw)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SolverSettings {
    #[serde(default)]
    pub yaw_convention: YawConvention,
}

pub fn load_config(path: &str) -> Result<Settings, ConfigError> {
    info!("Attempting to load configuration from {}", path);

    let builder = Config::builder()
        .add_source(File::new(path, FileFormat::Toml).required(true))
        .add_source(Environment::with_prefix("SPHINX").prefix_separator("__").separator("__"));

    match deserialize(builder) {
        Ok(settings) => {
            info!("Successfully loaded configuration: {:?}", settings);
            Ok(settings)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}

fn deserialize(builder: ConfigBuilder<DefaultState>) -> Result<Settings, ConfigError> {
    builder.build()?.try_deserialize()
}
