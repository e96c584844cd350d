//! Extended Kalman filter track estimator.
//!
//! 8-dimensional state [px, py, pz, vx, vy, vz, ax, ay] under a
//! constant-acceleration process model, with nonlinear per-sensor
//! observation models. Interchangeable with the weighted-mean filter
//! behind the fusion `ingest`/`decay` contract.
//!
//! Filter-internal angles are radians; conversion from the degree-bearing
//! interface happens at entry.

use tracing::debug;

use skyfence_core::constants::{EKF_MAX_POSITION_VARIANCE, EKF_MAX_PREDICTION_COUNT};
use skyfence_core::enums::SensorKind;
use skyfence_core::observation::SensorObservation;
use skyfence_core::types::{Position, Velocity};

const N: usize = 8;

/// Per-track filter state.
#[derive(Debug, Clone)]
pub struct EkfState {
    /// [px, py, pz, vx, vy, vz, ax, ay]
    pub x: [f64; N],
    pub p: [[f64; N]; N],
    /// Consecutive predict-only steps since the last measurement update.
    pub prediction_count: u32,
}

impl EkfState {
    /// Initialize from a localizing observation.
    pub fn from_observation(obs: &SensorObservation, base: &Position) -> Option<EkfState> {
        let bearing = obs.bearing_deg?;
        let range = obs.range?;
        let altitude = obs.altitude.unwrap_or(base.z);
        let horiz = horizontal_component(range, altitude - base.z);
        let pos = base.offset_polar_deg(bearing, horiz, altitude);

        let mut p = [[0.0; N]; N];
        for (i, var) in [25.0, 25.0, 25.0, 16.0, 16.0, 16.0, 4.0, 4.0]
            .iter()
            .enumerate()
        {
            p[i][i] = *var;
        }

        Some(EkfState {
            x: [pos.x, pos.y, pos.z, 0.0, 0.0, 0.0, 0.0, 0.0],
            p,
            prediction_count: 0,
        })
    }

    pub fn position(&self) -> Position {
        Position::new(self.x[0], self.x[1], self.x[2])
    }

    pub fn velocity(&self) -> Velocity {
        Velocity::new(self.x[3], self.x[4], self.x[5])
    }

    pub fn acceleration(&self) -> Velocity {
        Velocity::new(self.x[6], self.x[7], 0.0)
    }

    /// Validity is lost after too many predict-only steps or once the
    /// position covariance diverges.
    pub fn is_valid(&self) -> bool {
        let max_pos_var = self.p[0][0].max(self.p[1][1]).max(self.p[2][2]);
        self.prediction_count <= EKF_MAX_PREDICTION_COUNT
            && max_pos_var <= EKF_MAX_POSITION_VARIANCE
    }

    /// Constant-acceleration time update.
    pub fn predict(&mut self, dt: f64) {
        let f = transition(dt);
        self.x = mat_vec(&f, &self.x);

        let fp = mat_mul(&f, &self.p);
        let ft = transpose(&f);
        let mut p = mat_mul(&fp, &ft);

        // Process noise, loosest on the acceleration states.
        let q = [0.05, 0.05, 0.05, 0.5, 0.5, 0.3, 1.5, 1.5];
        for i in 0..N {
            p[i][i] += q[i] * dt;
        }
        self.p = p;
        self.prediction_count += 1;
    }

    /// Measurement update dispatched on the observing sensor.
    pub fn update(&mut self, obs: &SensorObservation, base: &Position) {
        match obs.sensor {
            SensorKind::Radar => self.update_radar(obs, base),
            SensorKind::Acoustic => self.update_bearing(obs, base),
            SensorKind::Eo => self.update_eo(obs, base),
        }
        self.prediction_count = 0;
    }

    fn update_radar(&mut self, obs: &SensorObservation, base: &Position) {
        let (Some(range), Some(bearing_deg), Some(altitude)) =
            (obs.range, obs.bearing_deg, obs.altitude)
        else {
            return;
        };
        let radial = obs.meta.radial_velocity.unwrap_or(0.0);
        let z = [range, bearing_deg.to_radians(), altitude, radial];

        let (rx, ry, rz, r, rh2) = self.relative(base);
        let h = [
            self.h_range(base),
            bearing_rad(rx, ry),
            self.x[2],
            self.h_radial(base),
        ];

        let mut jac = [[0.0; N]; 4];
        // range
        jac[0][0] = rx / r;
        jac[0][1] = ry / r;
        jac[0][2] = rz / r;
        // bearing = atan2(rx, ry)
        jac[1][0] = ry / rh2;
        jac[1][1] = -rx / rh2;
        // altitude
        jac[2][2] = 1.0;
        // radial = -(r·v)/|r|
        let (vx, vy, vz) = (self.x[3], self.x[4], self.x[5]);
        let s = h[3];
        jac[3][0] = -vx / r - s * rx / (r * r);
        jac[3][1] = -vy / r - s * ry / (r * r);
        jac[3][2] = -vz / r - s * rz / (r * r);
        jac[3][3] = -rx / r;
        jac[3][4] = -ry / r;
        jac[3][5] = -rz / r;

        let conf = obs.confidence.max(0.1);
        let r_diag = [
            25.0 / conf,
            (2.0f64).to_radians().powi(2) / conf,
            9.0 / conf,
            1.0 / conf,
        ];

        let mut innovation = [0.0; 4];
        for i in 0..4 {
            innovation[i] = z[i] - h[i];
        }
        innovation[1] = wrap_rad(innovation[1]);

        self.correct::<4>(&jac, &innovation, &r_diag);
    }

    fn update_bearing(&mut self, obs: &SensorObservation, base: &Position) {
        let Some(bearing_deg) = obs.bearing_deg else {
            return;
        };
        let (rx, ry, _, _, rh2) = self.relative(base);
        let h = bearing_rad(rx, ry);

        let mut jac = [[0.0; N]; 1];
        jac[0][0] = ry / rh2;
        jac[0][1] = -rx / rh2;

        let conf = obs.confidence.max(0.1);
        let r_diag = [(8.0f64).to_radians().powi(2) / conf];
        let innovation = [wrap_rad(bearing_deg.to_radians() - h)];

        self.correct::<1>(&jac, &innovation, &r_diag);
    }

    fn update_eo(&mut self, obs: &SensorObservation, base: &Position) {
        let (Some(range), Some(bearing_deg), Some(altitude)) =
            (obs.range, obs.bearing_deg, obs.altitude)
        else {
            return;
        };
        let z = [range, bearing_deg.to_radians(), altitude];

        let (rx, ry, rz, r, rh2) = self.relative(base);
        let h = [self.h_range(base), bearing_rad(rx, ry), self.x[2]];

        let mut jac = [[0.0; N]; 3];
        jac[0][0] = rx / r;
        jac[0][1] = ry / r;
        jac[0][2] = rz / r;
        jac[1][0] = ry / rh2;
        jac[1][1] = -rx / rh2;
        jac[2][2] = 1.0;

        let conf = obs.confidence.max(0.1);
        let r_diag = [
            4.0 / conf,
            (1.0f64).to_radians().powi(2) / conf,
            2.25 / conf,
        ];

        let mut innovation = [0.0; 3];
        for i in 0..3 {
            innovation[i] = z[i] - h[i];
        }
        innovation[1] = wrap_rad(innovation[1]);

        self.correct::<3>(&jac, &innovation, &r_diag);
    }

    /// Generic EKF correction step for an M-dimensional measurement.
    fn correct<const M: usize>(
        &mut self,
        jac: &[[f64; N]; M],
        innovation: &[f64; M],
        r_diag: &[f64; M],
    ) {
        let jac_t = transpose(jac);
        let pht = mat_mul(&self.p, &jac_t);
        let mut s = mat_mul(jac, &pht);
        for i in 0..M {
            s[i][i] += r_diag[i];
        }

        let s_inv = match invert(s) {
            Some(inv) => inv,
            None => {
                // Near-singular innovation covariance: regularize and retry.
                debug!("EKF innovation covariance near-singular, regularizing");
                let mut reg = s;
                for (i, row) in reg.iter_mut().enumerate() {
                    row[i] += 1e-6;
                }
                match invert(reg) {
                    Some(inv) => inv,
                    None => return,
                }
            }
        };

        let k = mat_mul(&pht, &s_inv);

        for i in 0..N {
            let mut dx = 0.0;
            for j in 0..M {
                dx += k[i][j] * innovation[j];
            }
            self.x[i] += dx;
        }

        // P = (I - K H) P
        let kh = mat_mul(&k, jac);
        let mut ikh = [[0.0; N]; N];
        for i in 0..N {
            for j in 0..N {
                ikh[i][j] = if i == j { 1.0 } else { 0.0 } - kh[i][j];
            }
        }
        self.p = mat_mul(&ikh, &self.p);
    }

    /// Relative position to the base, with degeneracy floors applied.
    fn relative(&self, base: &Position) -> (f64, f64, f64, f64, f64) {
        let rx = self.x[0] - base.x;
        let ry = self.x[1] - base.y;
        let rz = self.x[2] - base.z;
        let r = (rx * rx + ry * ry + rz * rz).sqrt().max(1.0);
        let rh2 = (rx * rx + ry * ry).max(1.0);
        (rx, ry, rz, r, rh2)
    }

    fn h_range(&self, base: &Position) -> f64 {
        let (rx, ry, rz, _, _) = self.relative(base);
        (rx * rx + ry * ry + rz * rz).sqrt()
    }

    fn h_radial(&self, base: &Position) -> f64 {
        let (rx, ry, rz, r, _) = self.relative(base);
        -(rx * self.x[3] + ry * self.x[4] + rz * self.x[5]) / r
    }
}

/// Horizontal component of a slant range given the altitude delta.
pub(crate) fn horizontal_component(range: f64, dz: f64) -> f64 {
    (range * range - dz * dz).max(0.0).sqrt().max(1.0)
}

fn bearing_rad(rx: f64, ry: f64) -> f64 {
    rx.atan2(ry)
}

fn wrap_rad(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(std::f64::consts::TAU);
    if wrapped > std::f64::consts::PI {
        wrapped - std::f64::consts::TAU
    } else {
        wrapped
    }
}

fn transition(dt: f64) -> [[f64; N]; N] {
    let mut f = [[0.0; N]; N];
    for (i, row) in f.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    let half_dt2 = 0.5 * dt * dt;
    f[0][3] = dt;
    f[1][4] = dt;
    f[2][5] = dt;
    f[0][6] = half_dt2;
    f[1][7] = half_dt2;
    f[3][6] = dt;
    f[4][7] = dt;
    f
}

fn mat_vec<const R: usize, const C: usize>(m: &[[f64; C]; R], v: &[f64; C]) -> [f64; R] {
    let mut out = [0.0; R];
    for i in 0..R {
        for j in 0..C {
            out[i] += m[i][j] * v[j];
        }
    }
    out
}

fn mat_mul<const R: usize, const K: usize, const C: usize>(
    a: &[[f64; K]; R],
    b: &[[f64; C]; K],
) -> [[f64; C]; R] {
    let mut out = [[0.0; C]; R];
    for i in 0..R {
        for k in 0..K {
            let aik = a[i][k];
            if aik == 0.0 {
                continue;
            }
            for j in 0..C {
                out[i][j] += aik * b[k][j];
            }
        }
    }
    out
}

fn transpose<const R: usize, const C: usize>(m: &[[f64; C]; R]) -> [[f64; R]; C] {
    let mut out = [[0.0; R]; C];
    for i in 0..R {
        for j in 0..C {
            out[j][i] = m[i][j];
        }
    }
    out
}

/// Gauss-Jordan inversion with partial pivoting.
fn invert<const M: usize>(m: [[f64; M]; M]) -> Option<[[f64; M]; M]> {
    let mut a = m;
    let mut inv = [[0.0; M]; M];
    for (i, row) in inv.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    for col in 0..M {
        let mut pivot = col;
        for row in col + 1..M {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        inv.swap(col, pivot);

        let scale = a[col][col];
        for j in 0..M {
            a[col][j] /= scale;
            inv[col][j] /= scale;
        }
        for row in 0..M {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..M {
                a[row][j] -= factor * a[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }
    Some(inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyfence_core::enums::SensorKind;
    use skyfence_core::observation::{ObservationMeta, SensorObservation};

    fn radar_obs(time: f64, bearing: f64, range: f64, alt: f64, radial: f64) -> SensorObservation {
        SensorObservation {
            sensor: SensorKind::Radar,
            time,
            drone_id: Some(1),
            bearing_deg: Some(bearing),
            range: Some(range),
            altitude: Some(alt),
            confidence: 0.9,
            classification: None,
            class_confidence: None,
            meta: ObservationMeta {
                radial_velocity: Some(radial),
                ..ObservationMeta::default()
            },
        }
    }

    #[test]
    fn test_invert_identity() {
        let m = [[2.0, 0.0], [0.0, 4.0]];
        let inv = invert(m).unwrap();
        assert!((inv[0][0] - 0.5).abs() < 1e-12);
        assert!((inv[1][1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_invert_singular_returns_none() {
        let m = [[1.0, 2.0], [2.0, 4.0]];
        assert!(invert(m).is_none());
    }

    #[test]
    fn test_filter_converges_on_moving_target() {
        // Target due north at 400m flying south at 15 m/s.
        let base = Position::default();
        let first = radar_obs(0.0, 0.0, 400.0, 60.0, 15.0);
        let mut ekf = EkfState::from_observation(&first, &base).unwrap();
        ekf.update(&first, &base);

        let dt = 0.5;
        for step in 1..=20 {
            let t = step as f64 * dt;
            let true_y = 400.0 - 15.0 * t;
            ekf.predict(dt);
            ekf.update(&radar_obs(t, 0.0, true_y.hypot(60.0), 60.0, 15.0), &base);
        }

        let pos = ekf.position();
        let vel = ekf.velocity();
        let true_y = 400.0 - 15.0 * 10.0;
        assert!(
            (pos.y - true_y).abs() < 25.0,
            "position estimate off: {} vs {}",
            pos.y,
            true_y
        );
        assert!(
            (vel.y + 15.0).abs() < 6.0,
            "velocity estimate off: {}",
            vel.y
        );
        assert!(ekf.is_valid());
    }

    #[test]
    fn test_prediction_only_loses_validity() {
        let base = Position::default();
        let first = radar_obs(0.0, 45.0, 300.0, 50.0, 10.0);
        let mut ekf = EkfState::from_observation(&first, &base).unwrap();
        ekf.update(&first, &base);
        for _ in 0..(EKF_MAX_PREDICTION_COUNT + 1) {
            ekf.predict(0.5);
        }
        assert!(!ekf.is_valid());
    }

    #[test]
    fn test_bearing_only_update_rotates_estimate() {
        let base = Position::default();
        let first = radar_obs(0.0, 0.0, 200.0, 40.0, 0.0);
        let mut ekf = EkfState::from_observation(&first, &base).unwrap();

        let acoustic = SensorObservation {
            sensor: SensorKind::Acoustic,
            time: 1.0,
            drone_id: Some(1),
            bearing_deg: Some(10.0),
            range: None,
            altitude: None,
            confidence: 0.7,
            classification: None,
            class_confidence: None,
            meta: ObservationMeta::default(),
        };
        ekf.update(&acoustic, &base);

        let bearing = base.bearing_deg_to(&ekf.position());
        assert!(
            bearing > 0.05 && bearing < 10.0,
            "bearing should move toward the measurement: {bearing}"
        );
    }
}
