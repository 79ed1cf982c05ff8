//! Pure interpolation numerics: the Catmull-Rom spline used by vector
//! channels and the packed-quaternion codec used by rotation channels.

use glam::{Quat, Vec3};

const COMPONENT_BITS: u32 = 10;
const COMPONENT_MASK: u32 = (1 << COMPONENT_BITS) - 1;
const COMPONENT_MAX: f32 = COMPONENT_MASK as f32;

/// Components other than the largest fit in [-1/sqrt(2), 1/sqrt(2)].
const COMPONENT_RANGE: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// A rotation key quantized to 32 bits.
///
/// Smallest-three layout: bits 31..30 hold the index of the
/// largest-magnitude component, which is dropped and reconstructed from the
/// unit-length constraint; the remaining three components are stored in
/// component order as 10-bit values spanning [-1/sqrt(2), 1/sqrt(2)].
/// Decompression is a pure function of the packed bits, so a packed value
/// always reproduces the same quaternion.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct PackedQuat(pub u32);

impl PackedQuat {
    pub fn from_quat(q: Quat) -> Self {
        let q = q.normalize();
        let components = [q.x, q.y, q.z, q.w];

        let mut largest = 0;
        for i in 1..4 {
            if components[i].abs() > components[largest].abs() {
                largest = i;
            }
        }

        // q and -q encode the same rotation; canonicalize so the dropped
        // component is non-negative and comes back as a plain square root.
        let sign = if components[largest] < 0.0 { -1.0 } else { 1.0 };

        let mut packed = (largest as u32) << 30;
        let mut shift = 20i32;
        for (i, &component) in components.iter().enumerate() {
            if i == largest {
                continue;
            }
            let normalized = (component * sign / COMPONENT_RANGE + 1.0) * 0.5;
            let quantized = (normalized * COMPONENT_MAX).round().clamp(0.0, COMPONENT_MAX);
            packed |= (quantized as u32) << shift;
            shift -= COMPONENT_BITS as i32;
        }

        Self(packed)
    }

    pub fn to_quat(self) -> Quat {
        let largest = (self.0 >> 30) as usize;

        let mut components = [0.0f32; 4];
        let mut sum = 0.0f32;
        let mut shift = 20i32;
        for (i, component) in components.iter_mut().enumerate() {
            if i == largest {
                continue;
            }
            let quantized = (self.0 >> shift) & COMPONENT_MASK;
            *component = (quantized as f32 / COMPONENT_MAX * 2.0 - 1.0) * COMPONENT_RANGE;
            sum += *component * *component;
            shift -= COMPONENT_BITS as i32;
        }
        components[largest] = (1.0 - sum).max(0.0).sqrt();

        Quat::from_xyzw(components[0], components[1], components[2], components[3])
    }
}

impl From<Quat> for PackedQuat {
    fn from(q: Quat) -> Self {
        Self::from_quat(q)
    }
}

impl From<PackedQuat> for Quat {
    fn from(packed: PackedQuat) -> Self {
        packed.to_quat()
    }
}

/// Uniform Catmull-Rom spline through `p1` and `p2`; `p0` and `p3` shape the
/// tangents. `t` is the local parameter in [0, 1] between `p1` and `p2`.
pub fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * (2.0 * p1
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}

/// Local interpolation parameter between two key times.
///
/// A result outside [0, 1] means corrupt key data or a broken clock
/// upstream; that is a defect to catch, not something to clamp away.
pub(crate) fn local_t(ticks: f32, time0: f32, time1: f32) -> f32 {
    let t = (ticks - time0) / (time1 - time0);
    debug_assert!(
        t.is_finite() && (0.0..=1.0).contains(&t),
        "interpolation parameter out of range: {t} (ticks {ticks} between {time0} and {time1})"
    );
    t
}
