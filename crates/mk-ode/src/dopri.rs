//! Embedded Dormand-Prince 5(4) integrator with adaptive step control.

use crate::error::{OdeError, OdeResult};
use crate::system::OdeSystem;

// Dormand-Prince coefficients
const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// 4th-order weights (error reference)
const B1: f64 = 5179.0 / 57600.0;
const B3: f64 = 7571.0 / 16695.0;
const B4: f64 = 393.0 / 640.0;
const B5: f64 = -92097.0 / 339200.0;
const B6: f64 = 187.0 / 2100.0;
const B7: f64 = 1.0 / 40.0;

// 5th-order weights (advancing solution, local extrapolation)
const BH1: f64 = 35.0 / 384.0;
const BH3: f64 = 500.0 / 1113.0;
const BH4: f64 = 125.0 / 192.0;
const BH5: f64 = -2187.0 / 6784.0;
const BH6: f64 = 11.0 / 84.0;

// Error = y5 - y4
const E1: f64 = BH1 - B1;
const E3: f64 = BH3 - B3;
const E4: f64 = BH4 - B4;
const E5: f64 = BH5 - B5;
const E6: f64 = BH6 - B6;
const E7: f64 = -B7;

const H_MIN: f64 = 1e-14;

/// Serial Dormand-Prince 5(4) integrator owning its solution state.
///
/// The integrator keeps the current `(t, y)`, the working step size and
/// the FSAL derivative between `advance` calls; `reinit` discards that
/// history, which is how callers invalidate it after mutating `y`
/// out-of-band. All work arrays are allocated once in `new`.
pub struct Dopri5 {
    n: usize,
    t: f64,
    y: Vec<f64>,
    rtol: f64,
    atol: Vec<f64>,
    max_steps: usize,
    h: f64,
    fsal_valid: bool,
    initialised: bool,
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    k5: Vec<f64>,
    k6: Vec<f64>,
    k7: Vec<f64>,
    y_tmp: Vec<f64>,
    y_new: Vec<f64>,
}

impl Dopri5 {
    /// Allocate an integrator for `n_eq` equations.
    pub fn new(n_eq: usize) -> Self {
        Self {
            n: n_eq,
            t: 0.0,
            y: vec![0.0; n_eq],
            rtol: 1e-6,
            atol: vec![1e-9; n_eq],
            max_steps: 100_000,
            h: 0.0,
            fsal_valid: false,
            initialised: false,
            k1: vec![0.0; n_eq],
            k2: vec![0.0; n_eq],
            k3: vec![0.0; n_eq],
            k4: vec![0.0; n_eq],
            k5: vec![0.0; n_eq],
            k6: vec![0.0; n_eq],
            k7: vec![0.0; n_eq],
            y_tmp: vec![0.0; n_eq],
            y_new: vec![0.0; n_eq],
        }
    }

    /// Set the initial value problem. Clears all step history.
    pub fn init(&mut self, t0: f64, y0: &[f64]) -> OdeResult<()> {
        if y0.len() != self.n {
            return Err(OdeError::DimensionMismatch {
                expected: self.n,
                got: y0.len(),
            });
        }
        self.t = t0;
        self.y.copy_from_slice(y0);
        self.h = 0.0;
        self.fsal_valid = false;
        self.initialised = true;
        Ok(())
    }

    /// Reinitialise at `(t, y)`, discarding accumulated step history.
    pub fn reinit(&mut self, t: f64, y: &[f64]) -> OdeResult<()> {
        self.init(t, y)
    }

    /// Scalar relative tolerance plus a per-equation absolute tolerance
    /// vector. Values are taken as given; callers validate signs.
    pub fn set_tolerances(&mut self, rtol: f64, atol: &[f64]) -> OdeResult<()> {
        if atol.len() != self.n {
            return Err(OdeError::DimensionMismatch {
                expected: self.n,
                got: atol.len(),
            });
        }
        self.rtol = rtol;
        self.atol.copy_from_slice(atol);
        Ok(())
    }

    /// Step budget for each `advance` call.
    pub fn set_max_steps(&mut self, n: usize) {
        self.max_steps = n;
    }

    /// Time of the last accepted step.
    pub fn time(&self) -> f64 {
        self.t
    }

    /// Solution at the last accepted step.
    pub fn state(&self) -> &[f64] {
        &self.y
    }

    /// Advance to `t_end`. On error the internal state stays at the last
    /// accepted step; read it back through [`time`](Self::time) and
    /// [`state`](Self::state).
    pub fn advance<S: OdeSystem>(&mut self, sys: &S, t_end: f64) -> OdeResult<()> {
        if !self.initialised {
            return Err(OdeError::NotInitialised);
        }
        if sys.n_dim() != self.n {
            return Err(OdeError::DimensionMismatch {
                expected: self.n,
                got: sys.n_dim(),
            });
        }
        if t_end <= self.t {
            return Ok(());
        }
        if self.n == 0 {
            self.t = t_end;
            return Ok(());
        }

        let n = self.n;
        let span = t_end - self.t;
        if self.h <= 0.0 {
            self.h = (span * 1e-3).max(H_MIN);
        }
        if !self.fsal_valid {
            sys.rhs(self.t, &self.y, &mut self.k1);
            self.fsal_valid = true;
        }

        let mut steps = 0;
        while self.t < t_end {
            if steps >= self.max_steps {
                return Err(OdeError::MaxStepsExceeded {
                    max_steps: self.max_steps,
                    t: self.t,
                });
            }
            steps += 1;

            let h = self.h.min(t_end - self.t);
            let t = self.t;

            // Stage 2
            for i in 0..n {
                self.y_tmp[i] = self.y[i] + h * A21 * self.k1[i];
            }
            sys.rhs(t + h / 5.0, &self.y_tmp, &mut self.k2);

            // Stage 3
            for i in 0..n {
                self.y_tmp[i] = self.y[i] + h * (A31 * self.k1[i] + A32 * self.k2[i]);
            }
            sys.rhs(t + 3.0 * h / 10.0, &self.y_tmp, &mut self.k3);

            // Stage 4
            for i in 0..n {
                self.y_tmp[i] =
                    self.y[i] + h * (A41 * self.k1[i] + A42 * self.k2[i] + A43 * self.k3[i]);
            }
            sys.rhs(t + 4.0 * h / 5.0, &self.y_tmp, &mut self.k4);

            // Stage 5
            for i in 0..n {
                self.y_tmp[i] = self.y[i]
                    + h * (A51 * self.k1[i]
                        + A52 * self.k2[i]
                        + A53 * self.k3[i]
                        + A54 * self.k4[i]);
            }
            sys.rhs(t + 8.0 * h / 9.0, &self.y_tmp, &mut self.k5);

            // Stage 6
            for i in 0..n {
                self.y_tmp[i] = self.y[i]
                    + h * (A61 * self.k1[i]
                        + A62 * self.k2[i]
                        + A63 * self.k3[i]
                        + A64 * self.k4[i]
                        + A65 * self.k5[i]);
            }
            sys.rhs(t + h, &self.y_tmp, &mut self.k6);

            // 5th-order solution (local extrapolation)
            for i in 0..n {
                self.y_new[i] = self.y[i]
                    + h * (BH1 * self.k1[i]
                        + BH3 * self.k3[i]
                        + BH4 * self.k4[i]
                        + BH5 * self.k5[i]
                        + BH6 * self.k6[i]);
            }

            // Clamp tiny negative excursions before the FSAL evaluation:
            // state components are molecule counts and must not leave the
            // non-negative orthant by more than the absolute tolerance.
            for i in 0..n {
                if self.y_new[i] < 0.0 && self.y_new[i] >= -self.atol[i] {
                    self.y_new[i] = 0.0;
                }
            }

            // Stage 7 (FSAL: first same as last)
            sys.rhs(t + h, &self.y_new, &mut self.k7);

            // Error estimate against mixed tolerance
            let mut err_norm = 0.0;
            for i in 0..n {
                let ei = h
                    * (E1 * self.k1[i]
                        + E3 * self.k3[i]
                        + E4 * self.k4[i]
                        + E5 * self.k5[i]
                        + E6 * self.k6[i]
                        + E7 * self.k7[i]);
                let sc = self.atol[i] + self.rtol * self.y[i].abs().max(self.y_new[i].abs());
                err_norm += (ei / sc) * (ei / sc);
            }
            err_norm = (err_norm / n as f64).sqrt();

            if err_norm <= 1.0 {
                // Accept step
                self.t = t + h;
                std::mem::swap(&mut self.y, &mut self.y_new);
                std::mem::swap(&mut self.k1, &mut self.k7);
            } else if h <= H_MIN {
                return Err(OdeError::StepSizeUnderflow { t: self.t });
            }

            // Step-size controller
            let factor = if err_norm == 0.0 {
                5.0
            } else {
                (0.9 * err_norm.powf(-0.2)).clamp(0.2, 5.0)
            };
            self.h = (h * factor).max(H_MIN);
        }

        Ok(())
    }
}
