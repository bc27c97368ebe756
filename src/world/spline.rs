//! Continent shaping curves
//!
//! Catmull-Rom splines keyed by the raw continent noise value (-1 to 1).
//! One curve lifts or sinks the terrain, the other controls how hard the
//! density field is squashed toward the base height.

#[derive(Clone, Copy, Debug)]
struct SplinePoint {
    input: f32,
    output: f32,
}

#[derive(Clone, Debug)]
pub struct TerrainSpline {
    points: Vec<SplinePoint>,
}

impl TerrainSpline {
    /// Points must be sorted by input.
    pub fn new(pairs: &[(f32, f32)]) -> Self {
        let points = pairs
            .iter()
            .map(|&(input, output)| SplinePoint { input, output })
            .collect();
        Self { points }
    }

    pub fn sample(&self, t: f32) -> f32 {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return 0.0;
        };
        if t <= first.input {
            return first.output;
        }
        if t >= last.input {
            return last.output;
        }

        // Segment [i, i + 1] containing t
        let i = self
            .points
            .windows(2)
            .position(|pair| t <= pair[1].input)
            .unwrap_or(self.points.len() - 2);

        let p1 = self.points[i];
        let p2 = self.points[i + 1];
        let p0 = if i > 0 { self.points[i - 1] } else { p1 };
        let p3 = self.points.get(i + 2).copied().unwrap_or(p2);

        let span = p2.input - p1.input;
        if span <= f32::EPSILON {
            return p2.output;
        }
        let segment_t = (t - p1.input) / span;
        catmull_rom(p0.output, p1.output, p2.output, p3.output, segment_t)
    }

    /// How far the terrain is lifted (positive) or sunk below the default height.
    pub fn continent_height_offset() -> Self {
        Self::new(&[(-1.0, -0.3), (-0.4, -0.2), (0.4, 0.4), (1.0, 0.6)])
    }

    /// Strength of the vertical density squash.
    pub fn continent_squash() -> Self {
        Self::new(&[(-1.0, 0.0), (-0.25, 0.2), (0.25, 0.8), (1.0, 0.0)])
    }
}

fn catmull_rom(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;

    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}
