use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// How far the velocity field pushes the content around. Higher values
    /// warp more. Taken as given.
    pub distortion_strength: f32,

    /// The side of the square canvas in pixels.
    pub canvas_size: u32,

    /// The side of the square simulation grid.
    pub fluid_size: u32,
    pub velocity_dissipation: f32,
    pub pressure_iterations: u32,

    pub splat_force: f32,
    pub splat_radius: f32,
    pub pointer_threshold: f32,

    /// Re-capture the content every this many frames.
    pub capture_interval: u32,

    /// The longest timestep, in seconds, that a single frame may advance the
    /// simulation by.
    pub max_timestep: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            distortion_strength: 0.15,
            canvas_size: 700,
            fluid_size: 128,
            velocity_dissipation: 0.98,
            pressure_iterations: 20,
            splat_force: 10.0,
            splat_radius: 0.001,
            pointer_threshold: 0.001,
            capture_interval: 30,
            max_timestep: 0.016,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "distortionStrength": 0.4 }"#).unwrap();

        assert_eq!(settings.distortion_strength, 0.4);
        assert_eq!(
            settings,
            Settings {
                distortion_strength: 0.4,
                ..Default::default()
            }
        );
    }

    #[test]
    fn strength_is_not_clamped() {
        let settings: Settings =
            serde_json::from_str(r#"{ "distortionStrength": -12.5 }"#).unwrap();
        assert_eq!(settings.distortion_strength, -12.5);
    }

    #[test]
    fn uses_camel_case_keys() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["captureInterval"], 30);
        assert_eq!(json["pressureIterations"], 20);
    }
}
