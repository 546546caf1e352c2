use std::collections::BTreeMap;

use sketch::{UniformSet, UniformValue, UpdateHook};
use sketchconfig::UniformSetting;
use tracing::warn;

pub const U_PULSE: &str = "u_pulse";

/// Update hook for the viewer: static uniforms from the config file plus the
/// optional `u_pulse` demo uniform.
#[derive(Debug, Default)]
pub struct ViewerHook {
    statics: Vec<(String, UniformValue)>,
    demo: bool,
}

impl ViewerHook {
    pub fn new(demo: bool, uniforms: &BTreeMap<String, UniformSetting>) -> Self {
        let statics = uniforms
            .iter()
            .filter_map(|(name, setting)| match uniform_value(setting) {
                Some(value) => Some((name.clone(), value)),
                None => {
                    warn!(uniform = %name, "ignoring uniform with unsupported component count");
                    None
                }
            })
            .collect();
        Self { statics, demo }
    }
}

impl UpdateHook for ViewerHook {
    fn init(&mut self, uniforms: &mut UniformSet) {
        for (name, value) in &self.statics {
            uniforms.set(name.as_str(), *value);
        }
        if self.demo {
            uniforms.set(U_PULSE, pulse(0.0));
        }
    }

    fn update(&mut self, time_ms: f64, uniforms: &mut UniformSet) {
        if self.demo {
            uniforms.set(U_PULSE, pulse(time_ms));
        }
    }
}

/// `0.5 + 0.5 * sin(t)` with `t` in seconds.
pub fn pulse(time_ms: f64) -> f32 {
    (0.5 + 0.5 * (time_ms * 0.001).sin()) as f32
}

fn uniform_value(setting: &UniformSetting) -> Option<UniformValue> {
    match *setting.components() {
        [x] => Some(UniformValue::Float(x)),
        [x, y] => Some(UniformValue::Vec2([x, y])),
        [x, y, z] => Some(UniformValue::Vec3([x, y, z])),
        [x, y, z, w] => Some(UniformValue::Vec4([x, y, z, w])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketch::SurfaceSize;

    fn statics() -> BTreeMap<String, UniformSetting> {
        let mut uniforms = BTreeMap::new();
        uniforms.insert("u_speed".to_string(), UniformSetting::Scalar(1.5));
        uniforms.insert(
            "u_tint".to_string(),
            UniformSetting::Vector(vec![1.0, 0.4, 0.2]),
        );
        uniforms.insert("u_bad".to_string(), UniformSetting::Vector(vec![]));
        uniforms
    }

    #[test]
    fn init_declares_static_uniforms() {
        let mut hook = ViewerHook::new(false, &statics());
        let mut uniforms = UniformSet::new(SurfaceSize::new(4, 4));
        hook.init(&mut uniforms);

        assert_eq!(uniforms.float("u_speed"), Some(1.5));
        assert_eq!(
            uniforms.get("u_tint"),
            Some(UniformValue::Vec3([1.0, 0.4, 0.2]))
        );
        assert!(!uniforms.contains("u_bad"));
        assert!(!uniforms.contains(U_PULSE));
    }

    #[test]
    fn demo_hook_drives_pulse() {
        let mut hook = ViewerHook::new(true, &BTreeMap::new());
        let mut uniforms = UniformSet::new(SurfaceSize::new(4, 4));
        hook.init(&mut uniforms);
        assert_eq!(uniforms.float(U_PULSE), Some(0.5));

        hook.update(std::f64::consts::FRAC_PI_2 * 1000.0, &mut uniforms);
        let pulse = uniforms.float(U_PULSE).unwrap();
        assert!((pulse - 1.0).abs() < 1e-6);
    }

    #[test]
    fn pulse_stays_in_unit_range() {
        for step in 0..100 {
            let value = pulse(step as f64 * 137.0);
            assert!((0.0..=1.0).contains(&value));
        }
    }
}
