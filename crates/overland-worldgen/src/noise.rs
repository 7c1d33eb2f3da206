//! Coherent 2D noise for climate fields.
//!
//! A self-contained simplex implementation keyed by a 64-bit seed. The
//! world only ever samples it at integer tile coordinates scaled by a
//! channel frequency, so everything here is plain `f64` math with no
//! platform-dependent state.

use overland_common::TileCoord;

/// Largest tile magnitude fed into the noise math.
///
/// Tile coordinates are clamped into `±NOISE_COORD_LIMIT` before float
/// conversion; inside this domain every product with a sane frequency is
/// exactly representable and the simplex lattice stays stable. Queries
/// beyond it are a precondition violation and flatten to the boundary
/// value instead of wrapping, which keeps the field continuous.
pub const NOISE_COORD_LIMIT: i64 = 1 << 40;

/// Floor to i64 without going through `f64::floor`'s full rounding path.
#[inline]
fn fast_floor(t: f64) -> i64 {
    let i = t as i64;
    if t < i as f64 {
        i - 1
    } else {
        i
    }
}

/// Simple 2D simplex noise.
///
/// Permutation-table gradient noise after Ken Perlin's simplex scheme:
/// skew the plane into simplex cells, sum the radial contribution of the
/// three surrounding corners.
#[derive(Debug, Clone)]
pub struct SimplexNoise {
    perm: [u8; 512],
}

impl SimplexNoise {
    /// Skew factor, (sqrt(3) - 1) / 2.
    const F2: f64 = 0.366_025_403_784_438_65;
    /// Unskew factor, (3 - sqrt(3)) / 6.
    const G2: f64 = 0.211_324_865_405_187_1;

    /// Unit gradients: axes and diagonals.
    const GRAD2: [[f64; 2]; 8] = [
        [1.0, 0.0],
        [-1.0, 0.0],
        [0.0, 1.0],
        [0.0, -1.0],
        [std::f64::consts::FRAC_1_SQRT_2, std::f64::consts::FRAC_1_SQRT_2],
        [-std::f64::consts::FRAC_1_SQRT_2, std::f64::consts::FRAC_1_SQRT_2],
        [std::f64::consts::FRAC_1_SQRT_2, -std::f64::consts::FRAC_1_SQRT_2],
        [-std::f64::consts::FRAC_1_SQRT_2, -std::f64::consts::FRAC_1_SQRT_2],
    ];

    /// Creates a noise generator whose permutation table is a
    /// Fisher-Yates shuffle driven by an LCG over `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let mut p: [u8; 256] = std::array::from_fn(|i| i as u8);

        let mut state = seed;
        for i in (1..256).rev() {
            state = state
                .wrapping_mul(2_862_933_555_777_941_757)
                .wrapping_add(3_037_000_493);
            let j = ((state >> 33) % (i as u64 + 1)) as usize;
            p.swap(i, j);
        }

        // Double the table so corner lookups never wrap an index.
        let mut perm = [0u8; 512];
        perm[..256].copy_from_slice(&p);
        perm[256..].copy_from_slice(&p);

        Self { perm }
    }

    /// Samples the noise at `(x, y)`.
    ///
    /// Returns a value in approximately [-1, 1].
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        // Skew into simplex cell space.
        let s = (x + y) * Self::F2;
        let i = fast_floor(x + s);
        let j = fast_floor(y + s);

        // Unskew the cell origin back to input space.
        let t = (i + j) as f64 * Self::G2;
        let x0 = x - (i as f64 - t);
        let y0 = y - (j as f64 - t);

        // Which triangle of the cell are we in?
        let (i1, j1) = if x0 > y0 { (1i64, 0i64) } else { (0i64, 1i64) };

        let x1 = x0 - i1 as f64 + Self::G2;
        let y1 = y0 - j1 as f64 + Self::G2;
        let x2 = x0 - 1.0 + 2.0 * Self::G2;
        let y2 = y0 - 1.0 + 2.0 * Self::G2;

        let ii = (i & 255) as usize;
        let jj = (j & 255) as usize;

        let g0 = self.gradient(ii, jj);
        let g1 = self.gradient(ii + i1 as usize, jj + j1 as usize);
        let g2 = self.gradient(ii + 1, jj + 1);

        let n = Self::corner(x0, y0, g0) + Self::corner(x1, y1, g1) + Self::corner(x2, y2, g2);

        // Empirical scale bringing the sum into [-1, 1].
        70.0 * n
    }

    /// Looks up the gradient for a lattice corner.
    #[inline]
    fn gradient(&self, ii: usize, jj: usize) -> [f64; 2] {
        let idx = usize::from(self.perm[ii + usize::from(self.perm[jj])]) & 7;
        Self::GRAD2[idx]
    }

    /// Radial falloff contribution of one corner.
    #[inline]
    fn corner(x: f64, y: f64, grad: [f64; 2]) -> f64 {
        let t = 0.5 - x * x - y * y;
        if t <= 0.0 {
            return 0.0;
        }
        let t2 = t * t;
        t2 * t2 * (grad[0] * x + grad[1] * y)
    }
}

/// One octaved climate channel: a seeded noise source plus the sampling
/// profile (frequency, octave count, falloff) applied over tile space.
#[derive(Debug, Clone)]
pub struct NoiseChannel {
    noise: SimplexNoise,
    frequency: f64,
    octaves: u32,
    lacunarity: f64,
    persistence: f64,
}

impl NoiseChannel {
    /// Default octave count per channel.
    pub const DEFAULT_OCTAVES: u32 = 3;
    /// Default frequency multiplier between octaves.
    pub const DEFAULT_LACUNARITY: f64 = 2.0;
    /// Default amplitude falloff between octaves.
    pub const DEFAULT_PERSISTENCE: f64 = 0.5;

    /// Creates a channel with the default octave profile.
    #[must_use]
    pub fn new(seed: u64, frequency: f64) -> Self {
        Self {
            noise: SimplexNoise::new(seed),
            frequency,
            octaves: Self::DEFAULT_OCTAVES,
            lacunarity: Self::DEFAULT_LACUNARITY,
            persistence: Self::DEFAULT_PERSISTENCE,
        }
    }

    /// Overrides the octave count.
    #[must_use]
    pub fn with_octaves(mut self, octaves: u32) -> Self {
        self.octaves = octaves.max(1);
        self
    }

    /// Samples the channel at a tile, normalized to [0, 1].
    ///
    /// Octaves are summed as fractal Brownian motion and divided by the
    /// accumulated amplitude, so the normalization holds for any octave
    /// profile.
    #[must_use]
    pub fn sample01(&self, tile: TileCoord) -> f64 {
        let x = clamp_tile(tile.x) * self.frequency;
        let y = clamp_tile(tile.y) * self.frequency;

        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut max_value = 0.0;

        for _ in 0..self.octaves {
            total += self.noise.sample(x * frequency, y * frequency) * amplitude;
            max_value += amplitude;
            amplitude *= self.persistence;
            frequency *= self.lacunarity;
        }

        (total / max_value).mul_add(0.5, 0.5).clamp(0.0, 1.0)
    }
}

/// Clamps a tile coordinate into the stable noise domain.
#[inline]
fn clamp_tile(v: i64) -> f64 {
    v.clamp(-NOISE_COORD_LIMIT, NOISE_COORD_LIMIT) as f64
}
