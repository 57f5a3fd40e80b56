// ============================================================================
// NATURAL CUBIC SPLINE — smooth interpolation through curve control points
// ============================================================================

/// Interpolates smoothly through a set of (x, y) control points using a
/// natural cubic spline (second derivative zero at both endpoints).
///
/// Control points must be added in strictly increasing x order. The second
/// derivative table is rebuilt lazily on the first `interpolate` call after
/// a mutation.
#[derive(Debug, Clone, Default)]
pub struct SplineInterpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
    y2: Vec<f64>,
    dirty: bool,
}

impl SplineInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn add(&mut self, x: f64, y: f64) {
        debug_assert!(
            self.xs.last().is_none_or(|&last| x > last),
            "control points must be added in increasing x order"
        );
        self.xs.push(x);
        self.ys.push(y);
        self.dirty = true;
    }

    pub fn interpolate(&mut self, x: f64) -> f64 {
        if self.dirty {
            self.rebuild();
            self.dirty = false;
        }

        let n = self.xs.len();
        match n {
            0 => 0.0,
            1 => self.ys[0],
            _ => {
                // Binary search for the bracketing interval.
                let mut lo = 0usize;
                let mut hi = n - 1;
                while hi - lo > 1 {
                    let mid = (hi + lo) / 2;
                    if self.xs[mid] > x {
                        hi = mid;
                    } else {
                        lo = mid;
                    }
                }

                let h = self.xs[hi] - self.xs[lo];
                let a = (self.xs[hi] - x) / h;
                let b = (x - self.xs[lo]) / h;

                a * self.ys[lo]
                    + b * self.ys[hi]
                    + ((a * a * a - a) * self.y2[lo] + (b * b * b - b) * self.y2[hi])
                        * (h * h)
                        / 6.0
            }
        }
    }

    // Tridiagonal solve for the second derivatives at each control point,
    // with the natural boundary condition y2[0] = y2[n-1] = 0.
    fn rebuild(&mut self) {
        let n = self.xs.len();
        self.y2 = vec![0.0; n];
        if n < 3 {
            return;
        }

        let mut u = vec![0.0; n - 1];
        for i in 1..n - 1 {
            let wx = self.xs[i + 1] - self.xs[i - 1];
            let sig = (self.xs[i] - self.xs[i - 1]) / wx;
            let p = sig * self.y2[i - 1] + 2.0;

            self.y2[i] = (sig - 1.0) / p;

            let ddy_dx_right =
                (self.ys[i + 1] - self.ys[i]) / (self.xs[i + 1] - self.xs[i]);
            let ddy_dx_left =
                (self.ys[i] - self.ys[i - 1]) / (self.xs[i] - self.xs[i - 1]);
            u[i] = (6.0 * (ddy_dx_right - ddy_dx_left) / wx - sig * u[i - 1]) / p;
        }

        self.y2[n - 1] = 0.0;
        for i in (0..n - 1).rev() {
            self.y2[i] = self.y2[i] * self.y2[i + 1] + u[i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_control_points() {
        let mut spline = SplineInterpolator::new();
        for &(x, y) in &[(0.0, 0.0), (64.0, 100.0), (128.0, 90.0), (255.0, 255.0)] {
            spline.add(x, y);
        }
        for &(x, y) in &[(0.0, 0.0), (64.0, 100.0), (128.0, 90.0), (255.0, 255.0)] {
            assert!((spline.interpolate(x) - y).abs() < 1e-9);
        }
    }

    #[test]
    fn two_points_interpolate_linearly() {
        let mut spline = SplineInterpolator::new();
        spline.add(0.0, 0.0);
        spline.add(255.0, 255.0);
        for x in [0.0, 10.0, 127.5, 200.0, 255.0] {
            assert!((spline.interpolate(x) - x).abs() < 1e-9);
        }
    }

    #[test]
    fn single_point_is_constant() {
        let mut spline = SplineInterpolator::new();
        spline.add(128.0, 42.0);
        assert_eq!(spline.interpolate(0.0), 42.0);
        assert_eq!(spline.interpolate(255.0), 42.0);
    }

    #[test]
    fn interior_value_stays_smoothly_between_neighbors() {
        let mut spline = SplineInterpolator::new();
        spline.add(0.0, 0.0);
        spline.add(100.0, 50.0);
        spline.add(255.0, 255.0);
        let mid = spline.interpolate(50.0);
        assert!(mid > 0.0 && mid < 60.0);
    }
}
