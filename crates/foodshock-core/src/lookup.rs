//! Piecewise-linear lookup table for the model's tabulated schedules.
//!
//! Every tabulated relationship (the fish decline curve, the industrial
//! construction ramps, the crop disruption trajectory) is encoded as one of
//! these tables and evaluated at whole months. Step schedules are encoded
//! with a breakpoint on each side of the jump, which keeps whole-month
//! evaluation exact.
//!
//! Outside the defined range, values are clamped to the endpoint values;
//! that is how every schedule extends flat past its last tabulated month.

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LookupTable {
    pub name: String,
    /// x values, must be strictly increasing
    pub x: Vec<f64>,
    /// y values, same length as x
    pub y: Vec<f64>,
}

impl LookupTable {
    pub fn new(name: impl Into<String>, x: Vec<f64>, y: Vec<f64>) -> Self {
        assert_eq!(x.len(), y.len(), "LookupTable x and y must have equal length");
        assert!(x.len() >= 2, "LookupTable must have at least 2 points");
        assert!(
            x.windows(2).all(|w| w[0] < w[1]),
            "LookupTable x must be strictly increasing"
        );
        Self { name: name.into(), x, y }
    }

    /// A table whose x axis is whole months 0, 1, .., y.len() - 1.
    pub fn from_monthly(name: impl Into<String>, y: Vec<f64>) -> Self {
        let x = (0..y.len()).map(|i| i as f64).collect();
        Self::new(name, x, y)
    }

    /// Evaluate the table at `x_in` using piecewise linear interpolation.
    /// Values outside [x[0], x[n-1]] are clamped to the endpoint y values.
    pub fn eval(&self, x_in: f64) -> f64 {
        let x_clamped = x_in.clamp(self.x[0], *self.x.last().unwrap());

        // Binary search for the segment holding x_clamped
        let pos = self.x.partition_point(|&xi| xi <= x_clamped);

        if pos == 0 {
            return self.y[0];
        }
        if pos >= self.x.len() {
            return *self.y.last().unwrap();
        }

        let x0 = self.x[pos - 1];
        let x1 = self.x[pos];
        let y0 = self.y[pos - 1];
        let y1 = self.y[pos];

        // Linear interpolation
        let t = (x_clamped - x0) / (x1 - x0);
        y0 + t * (y1 - y0)
    }

    /// Evaluate at a whole month.
    pub fn eval_month(&self, month: usize) -> f64 {
        self.eval(month as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolates_between_knots() {
        let t = LookupTable::new("decline", vec![0.0, 11.0], vec![100.0, 90.0]);
        assert!((t.eval(0.0) - 100.0).abs() < 1e-9);
        assert!((t.eval(11.0) - 90.0).abs() < 1e-9);
        assert!((t.eval(5.5) - 95.0).abs() < 1e-9);
    }

    #[test]
    fn test_clamps_outside_the_table() {
        let t = LookupTable::new("ramp", vec![0.0, 1.0], vec![5.0, 10.0]);
        assert!((t.eval(-3.0) - 5.0).abs() < 1e-9);
        assert!((t.eval(40.0) - 10.0).abs() < 1e-9);
        assert!((t.eval_month(1000) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_step_schedule_is_exact_at_whole_months() {
        // a jump encoded with breakpoints on both sides of the step
        let t = LookupTable::new(
            "step",
            vec![0.0, 4.0, 5.0, 7.0, 8.0],
            vec![0.0, 0.0, 9.79, 9.79, 20.0],
        );
        assert_eq!(t.eval_month(4), 0.0);
        assert_eq!(t.eval_month(5), 9.79);
        assert_eq!(t.eval_month(7), 9.79);
        assert_eq!(t.eval_month(8), 20.0);
    }

    #[test]
    fn test_from_monthly_hits_every_entry() {
        let t = LookupTable::from_monthly("series", vec![1.0, 0.8, 0.5, 0.4]);
        for (m, expected) in [(0, 1.0), (1, 0.8), (2, 0.5), (3, 0.4), (9, 0.4)] {
            assert!((t.eval_month(m) - expected).abs() < 1e-12);
        }
    }

    #[test]
    #[should_panic(expected = "strictly increasing")]
    fn test_rejects_unsorted_x() {
        let _ = LookupTable::new("bad", vec![0.0, 2.0, 1.0], vec![0.0, 1.0, 2.0]);
    }
}
