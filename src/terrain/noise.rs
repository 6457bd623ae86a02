//! Keyed hashing and wrap-aware lattice value noise.
//!
//! Everything here is a pure function of seed + channel + integer inputs, so
//! generation stays reproducible regardless of query order. Lattice noise
//! wraps in x at each octave's period to keep the world seamless across the
//! antimeridian; y is wrapped only when the world config asks for it.

/// Fractal octave table for elevation synthesis: (frequency, amplitude).
pub(crate) const ELEVATION_OCTAVES: [(u32, f64); 4] =
    [(2, 0.60), (4, 0.25), (8, 0.10), (16, 0.05)];

/// FNV-1a over a channel label, usable for const channel keys.
pub(crate) const fn channel_key(label: &str) -> u64 {
    let bytes = label.as_bytes();
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        i += 1;
    }
    hash
}

/// splitmix64 finalizer.
#[inline]
fn mix(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Keyed 64-bit hash of a pair of grid integers.
pub(crate) fn hash_u64(seed: u64, channel: u64, a: i64, b: i64) -> u64 {
    let mut h = seed ^ channel.wrapping_mul(0x9e37_79b9_7f4a_7c15);
    h = mix(h ^ (a as u64).wrapping_mul(0xff51_afd7_ed55_8ccd));
    mix(h ^ (b as u64).wrapping_mul(0xc4ce_b9fe_1a85_ec53))
}

/// Top 53 bits of a hash as a unit float in [0, 1).
pub(crate) fn unit_f64(hash: u64) -> f64 {
    (hash >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}

/// White noise in [0, 1) for a grid coordinate on a channel.
pub(crate) fn noise01(seed: u64, channel: u64, a: i64, b: i64) -> f64 {
    unit_f64(hash_u64(seed, channel, a, b))
}

/// Lattice corner value, wrapped in x at `x_period` and in y at `y_period`
/// when given. The period is folded into the key so octaves sharing lattice
/// cells stay decorrelated.
pub(crate) fn lattice_noise(
    seed: u64,
    channel: u64,
    ix: i64,
    iy: i64,
    x_period: u32,
    y_period: Option<u32>,
) -> f64 {
    let ix = ix.rem_euclid(i64::from(x_period));
    let iy = match y_period {
        Some(period) => iy.rem_euclid(i64::from(period)),
        None => iy,
    };
    noise01(seed, channel ^ mix(u64::from(x_period)), ix, iy)
}

fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

/// Bilinearly interpolated value noise over a `freq`-cell lattice spanning
/// the unit square, with smoothstep easing.
pub(crate) fn value_noise(
    seed: u64,
    channel: u64,
    x: f64,
    y: f64,
    freq: u32,
    wrap_y: bool,
) -> f64 {
    let sx = x * f64::from(freq);
    let sy = y * f64::from(freq);
    let ix = sx.floor();
    let iy = sy.floor();
    let fx = sx - ix;
    let fy = sy - iy;
    let (ix, iy) = (ix as i64, iy as i64);
    let y_period = if wrap_y { Some(freq) } else { None };

    let corner = |cx: i64, cy: i64| lattice_noise(seed, channel, cx, cy, freq, y_period);
    let ux = smoothstep(fx);
    let uy = smoothstep(fy);

    let top = corner(ix, iy) * (1.0 - ux) + corner(ix + 1, iy) * ux;
    let bottom = corner(ix, iy + 1) * (1.0 - ux) + corner(ix + 1, iy + 1) * ux;
    top * (1.0 - uy) + bottom * uy
}

/// Four-octave fractal value noise in [0, 1].
pub(crate) fn fractal01(seed: u64, channel: u64, x: f64, y: f64, wrap_y: bool) -> f64 {
    ELEVATION_OCTAVES
        .iter()
        .map(|&(freq, amplitude)| amplitude * value_noise(seed, channel, x, y, freq, wrap_y))
        .sum()
}
