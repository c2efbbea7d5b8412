pub const BASE_DENSITY: f32 = 0.1;
pub const MAX_DENSITY: f32 = 20.0;
pub const BASE_NOISE: f32 = 1.0;
pub const MIN_NOISE: f32 = -22.0;
pub const MAX_NOISE: f32 = 22.0;
pub const MAX_SWIRL: f32 = 200.0;
pub const MAX_TIME_SCALE: f32 = 5.0;
pub const MIN_TIME_SCALE: f32 = 0.1;

/// Shader parameters for one region, recomputed every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionParameters {
    pub density: f32,
    pub noise: f32,
    pub swirl: f32,
    pub time_scale: f32,
}

impl RegionParameters {
    /// Output when neither channel is active.
    pub const REST: RegionParameters = RegionParameters {
        density: BASE_DENSITY,
        noise: BASE_NOISE,
        swirl: 0.0,
        time_scale: 1.0,
    };
}

impl Default for RegionParameters {
    fn default() -> Self {
        Self::REST
    }
}

/// Formula branch selected by which channels are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    /// Only the right channel is active.
    Excitation,
    /// Only the left channel is active.
    Dampening,
    /// Both channels are active.
    Blend,
    /// Neither channel is active.
    Rest,
}

impl Regime {
    /// First match wins: excitation, dampening, blend, rest.
    pub fn classify(left: f32, right: f32) -> Self {
        if right > 0.0 && left <= 0.0 {
            Regime::Excitation
        } else if left > 0.0 && right <= 0.0 {
            Regime::Dampening
        } else if left > 0.0 && right > 0.0 {
            Regime::Blend
        } else {
            Regime::Rest
        }
    }
}

/// Maps a normalized channel pair onto region parameters.
///
/// Inputs are expected in `[0, 1]`; clamping them is the caller's job (see
/// `ChannelState::normalized`). Each regime evaluates to [`RegionParameters::REST`]
/// at its own zero boundary, so the mapping has no jump when a channel
/// crosses zero.
pub fn map(left: f32, right: f32) -> RegionParameters {
    match Regime::classify(left, right) {
        Regime::Excitation => RegionParameters {
            density: (BASE_DENSITY + right * (MAX_DENSITY - BASE_DENSITY))
                .clamp(BASE_DENSITY, MAX_DENSITY),
            noise: BASE_NOISE,
            swirl: 0.0,
            time_scale: (1.0 + right * (MAX_TIME_SCALE - 1.0)).clamp(1.0, MAX_TIME_SCALE),
        },
        Regime::Dampening => RegionParameters {
            density: BASE_DENSITY,
            noise: (BASE_NOISE + left * (MIN_NOISE - BASE_NOISE)).clamp(MIN_NOISE, MAX_NOISE),
            swirl: left * MAX_SWIRL,
            time_scale: (1.0 - left).clamp(MIN_TIME_SCALE, 1.0),
        },
        Regime::Blend => {
            let comb = (left + right) / 2.0;
            RegionParameters {
                density: (BASE_DENSITY - comb * BASE_DENSITY).clamp(BASE_DENSITY, MAX_DENSITY),
                noise: (BASE_NOISE + comb * (MAX_NOISE - BASE_NOISE))
                    .clamp(MIN_NOISE, MAX_NOISE),
                swirl: comb * MAX_SWIRL,
                time_scale: ((1.0 - left) + right * (MAX_TIME_SCALE - 1.0))
                    .clamp(MIN_TIME_SCALE, MAX_TIME_SCALE),
            }
        }
        Regime::Rest => RegionParameters::REST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn grid() -> impl Iterator<Item = (f32, f32)> {
        (0..=20).flat_map(|l| (0..=20).map(move |r| (l as f32 / 20.0, r as f32 / 20.0)))
    }

    #[test]
    fn outputs_stay_within_ranges() {
        for (left, right) in grid() {
            let params = map(left, right);
            assert!(
                (BASE_DENSITY..=MAX_DENSITY).contains(&params.density),
                "density {params:?} for ({left}, {right})"
            );
            assert!((MIN_NOISE..=MAX_NOISE).contains(&params.noise));
            assert!((0.0..=MAX_SWIRL).contains(&params.swirl));
            assert!((MIN_TIME_SCALE..=MAX_TIME_SCALE).contains(&params.time_scale));
        }
    }

    #[test]
    fn rest_when_both_channels_idle() {
        assert_eq!(Regime::classify(0.0, 0.0), Regime::Rest);
        assert_eq!(
            map(0.0, 0.0),
            RegionParameters {
                density: BASE_DENSITY,
                noise: BASE_NOISE,
                swirl: 0.0,
                time_scale: 1.0,
            }
        );
    }

    #[test]
    fn left_only_dampens() {
        assert_eq!(Regime::classify(0.5, 0.0), Regime::Dampening);
        let params = map(0.5, 0.0);
        assert!(close(params.density, 0.1));
        assert!(close(params.noise, -10.5));
        assert!(close(params.swirl, 100.0));
        assert!(close(params.time_scale, 0.5));
    }

    #[test]
    fn right_only_excites() {
        assert_eq!(Regime::classify(0.0, 1.0), Regime::Excitation);
        let params = map(0.0, 1.0);
        assert!(close(params.density, MAX_DENSITY));
        assert_eq!(params.noise, BASE_NOISE);
        assert_eq!(params.swirl, 0.0);
        assert!(close(params.time_scale, MAX_TIME_SCALE));
    }

    #[test]
    fn both_channels_blend() {
        assert_eq!(Regime::classify(1.0, 1.0), Regime::Blend);
        let params = map(1.0, 1.0);
        assert!(close(params.density, BASE_DENSITY));
        assert!(close(params.noise, MAX_NOISE));
        assert!(close(params.swirl, MAX_SWIRL));
        assert!(close(params.time_scale, 4.0));

        let low = map(1.0, 0.01);
        assert!(close(low.time_scale, MIN_TIME_SCALE));
    }

    #[test]
    fn continuous_across_zero_boundaries() {
        let rest = map(0.0, 0.0);
        let epsilon = 1e-6;
        for params in [map(epsilon, 0.0), map(0.0, epsilon), map(epsilon, epsilon)] {
            assert!(close(params.density, rest.density));
            assert!(close(params.noise, rest.noise));
            assert!(close(params.swirl, rest.swirl));
            assert!(close(params.time_scale, rest.time_scale));
        }
    }

    #[test]
    fn identical_inputs_give_identical_bits() {
        for (left, right) in grid() {
            let first = map(left, right);
            let second = map(left, right);
            assert_eq!(first.density.to_bits(), second.density.to_bits());
            assert_eq!(first.noise.to_bits(), second.noise.to_bits());
            assert_eq!(first.swirl.to_bits(), second.swirl.to_bits());
            assert_eq!(first.time_scale.to_bits(), second.time_scale.to_bits());
        }
    }
}
