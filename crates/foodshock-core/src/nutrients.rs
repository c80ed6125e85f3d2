//! The nutrient triple: the value type threaded through the whole model.
//!
//! A `Nutrients` carries (kcals, fat, protein) either as one scalar per
//! nutrient or as one monthly series per nutrient, together with three
//! free-form unit tags. Arithmetic demands exact tag equality, except that a
//! "ratio"-tagged operand may multiply anything and the result adopts the
//! other operand's units.
//!
//! Unit mismatches and scalar/series form mismatches are programmer errors
//! and panic immediately rather than propagating.

use serde::{Deserialize, Serialize};

use crate::conversions::Conversions;

/// Tag appended to a unit string when the value is a monthly series.
const EACH_MONTH: &str = " each month";

/// The three unit tags of a nutrient triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutrientUnits {
    pub kcals: String,
    pub fat: String,
    pub protein: String,
}

impl NutrientUnits {
    pub fn new(
        kcals: impl Into<String>,
        fat: impl Into<String>,
        protein: impl Into<String>,
    ) -> Self {
        Self {
            kcals: kcals.into(),
            fat: fat.into(),
            protein: protein.into(),
        }
    }

    /// The model's canonical absolute units.
    pub fn billion_kcals_thousand_tons() -> Self {
        Self::new("billion kcals", "thousand tons", "thousand tons")
    }

    pub fn billion_kcals_thousand_tons_each_month() -> Self {
        Self::billion_kcals_thousand_tons().each_month()
    }

    pub fn ratio() -> Self {
        Self::new("ratio", "ratio", "ratio")
    }

    pub fn ratio_each_month() -> Self {
        Self::ratio().each_month()
    }

    pub fn percent_fed_each_month() -> Self {
        Self::new("percent fed", "percent fed", "percent fed").each_month()
    }

    /// Convert element tags to series tags by appending " each month".
    pub fn each_month(&self) -> Self {
        let tag = |u: &str| {
            if u.ends_with(EACH_MONTH) {
                u.to_string()
            } else {
                format!("{u}{EACH_MONTH}")
            }
        };
        Self::new(tag(&self.kcals), tag(&self.fat), tag(&self.protein))
    }

    /// Convert series tags back to element tags by stripping " each month".
    pub fn without_each_month(&self) -> Self {
        let tag = |u: &str| u.strip_suffix(EACH_MONTH).unwrap_or(u).to_string();
        Self::new(tag(&self.kcals), tag(&self.fat), tag(&self.protein))
    }

    pub fn is_each_month(&self) -> bool {
        self.kcals.ends_with(EACH_MONTH)
    }

    /// True when all three tags carry the dimensionless "ratio" unit.
    pub fn is_ratio(&self) -> bool {
        let ratio = |u: &str| u == "ratio" || u == "ratio each month";
        ratio(&self.kcals) && ratio(&self.fat) && ratio(&self.protein)
    }

    /// True when all three tags are identical (required before comparing
    /// nutrients against each other).
    pub fn all_equal(&self) -> bool {
        self.kcals == self.fat && self.fat == self.protein
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Values {
    Scalar {
        kcals: f64,
        fat: f64,
        protein: f64,
    },
    Series {
        kcals: Vec<f64>,
        fat: Vec<f64>,
        protein: Vec<f64>,
    },
}

/// A (kcals, fat, protein) amount, scalar or monthly series, with units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    values: Values,
    units: NutrientUnits,
}

impl Nutrients {
    // ---- constructors -----------------------------------------------------

    pub fn scalar(kcals: f64, fat: f64, protein: f64, units: NutrientUnits) -> Self {
        assert!(
            !units.is_each_month(),
            "scalar nutrients must not carry 'each month' units, got {units:?}"
        );
        Self {
            values: Values::Scalar { kcals, fat, protein },
            units,
        }
    }

    pub fn series(kcals: Vec<f64>, fat: Vec<f64>, protein: Vec<f64>, units: NutrientUnits) -> Self {
        assert!(
            kcals.len() == fat.len() && fat.len() == protein.len(),
            "nutrient series lengths differ: {} / {} / {}",
            kcals.len(),
            fat.len(),
            protein.len()
        );
        assert!(
            units.is_each_month(),
            "series nutrients must carry 'each month' units, got {units:?}"
        );
        Self {
            values: Values::Series { kcals, fat, protein },
            units,
        }
    }

    /// A series with the given kcals and zero fat and protein.
    pub fn series_from_kcals(kcals: Vec<f64>, units: NutrientUnits) -> Self {
        let n = kcals.len();
        Self::series(kcals, vec![0.0; n], vec![0.0; n], units)
    }

    pub fn zero_series(nmonths: usize, units: NutrientUnits) -> Self {
        Self::series(
            vec![0.0; nmonths],
            vec![0.0; nmonths],
            vec![0.0; nmonths],
            units,
        )
    }

    /// The multiplicative identity ratio.
    pub fn ratio_one() -> Self {
        Self::scalar(1.0, 1.0, 1.0, NutrientUnits::ratio())
    }

    /// The annihilating ratio.
    pub fn ratio_zero() -> Self {
        Self::scalar(0.0, 0.0, 0.0, NutrientUnits::ratio())
    }

    // ---- accessors --------------------------------------------------------

    pub fn units(&self) -> &NutrientUnits {
        &self.units
    }

    /// Retag the three nutrients. The new tags must agree with the value
    /// form (series values keep "each month" tags).
    pub fn with_units(mut self, units: NutrientUnits) -> Self {
        assert_eq!(
            self.is_series(),
            units.is_each_month(),
            "unit tags must match the scalar/series form, got {units:?}"
        );
        self.units = units;
        self
    }

    pub fn is_series(&self) -> bool {
        matches!(self.values, Values::Series { .. })
    }

    /// Number of months for a series; panics on a scalar.
    pub fn nmonths(&self) -> usize {
        match &self.values {
            Values::Series { kcals, .. } => kcals.len(),
            Values::Scalar { .. } => panic!("nmonths() called on scalar nutrients"),
        }
    }

    pub fn kcals(&self) -> f64 {
        match &self.values {
            Values::Scalar { kcals, .. } => *kcals,
            Values::Series { .. } => panic!("kcals() called on series nutrients"),
        }
    }

    pub fn fat(&self) -> f64 {
        match &self.values {
            Values::Scalar { fat, .. } => *fat,
            Values::Series { .. } => panic!("fat() called on series nutrients"),
        }
    }

    pub fn protein(&self) -> f64 {
        match &self.values {
            Values::Scalar { protein, .. } => *protein,
            Values::Series { .. } => panic!("protein() called on series nutrients"),
        }
    }

    pub fn kcals_series(&self) -> &[f64] {
        match &self.values {
            Values::Series { kcals, .. } => kcals,
            Values::Scalar { .. } => panic!("kcals_series() called on scalar nutrients"),
        }
    }

    pub fn fat_series(&self) -> &[f64] {
        match &self.values {
            Values::Series { fat, .. } => fat,
            Values::Scalar { .. } => panic!("fat_series() called on scalar nutrients"),
        }
    }

    pub fn protein_series(&self) -> &[f64] {
        match &self.values {
            Values::Series { protein, .. } => protein,
            Values::Scalar { .. } => panic!("protein_series() called on scalar nutrients"),
        }
    }

    /// Extract month `i` of a series as a scalar triple.
    pub fn month_at(&self, i: usize) -> Nutrients {
        match &self.values {
            Values::Series { kcals, fat, protein } => Nutrients::scalar(
                kcals[i],
                fat[i],
                protein[i],
                self.units.without_each_month(),
            ),
            Values::Scalar { .. } => panic!("month_at() called on scalar nutrients"),
        }
    }

    // ---- arithmetic -------------------------------------------------------

    fn assert_same_units(&self, other: &Self, op: &str) {
        assert!(
            self.units == other.units,
            "unit mismatch in {op}: {:?} vs {:?}",
            self.units,
            other.units
        );
    }

    fn zip_with(&self, other: &Self, units: NutrientUnits, f: impl Fn(f64, f64) -> f64) -> Self {
        match (&self.values, &other.values) {
            (
                Values::Scalar { kcals, fat, protein },
                Values::Scalar {
                    kcals: k2,
                    fat: f2,
                    protein: p2,
                },
            ) => Nutrients {
                values: Values::Scalar {
                    kcals: f(*kcals, *k2),
                    fat: f(*fat, *f2),
                    protein: f(*protein, *p2),
                },
                units,
            },
            (
                Values::Series { kcals, fat, protein },
                Values::Series {
                    kcals: k2,
                    fat: f2,
                    protein: p2,
                },
            ) => {
                assert_eq!(kcals.len(), k2.len(), "nutrient series lengths differ");
                let zip = |a: &[f64], b: &[f64]| {
                    a.iter().zip(b).map(|(x, y)| f(*x, *y)).collect::<Vec<_>>()
                };
                Nutrients {
                    values: Values::Series {
                        kcals: zip(kcals, k2),
                        fat: zip(fat, f2),
                        protein: zip(protein, p2),
                    },
                    units,
                }
            }
            // Series x scalar broadcasts the scalar across months.
            (
                Values::Series { kcals, fat, protein },
                Values::Scalar {
                    kcals: k2,
                    fat: f2,
                    protein: p2,
                },
            ) => Nutrients {
                values: Values::Series {
                    kcals: kcals.iter().map(|x| f(*x, *k2)).collect(),
                    fat: fat.iter().map(|x| f(*x, *f2)).collect(),
                    protein: protein.iter().map(|x| f(*x, *p2)).collect(),
                },
                units,
            },
            (Values::Scalar { .. }, Values::Series { .. }) => {
                panic!("cannot combine scalar nutrients with series nutrients in this order")
            }
        }
    }

    fn map(&self, units: NutrientUnits, f: impl Fn(f64) -> f64) -> Self {
        match &self.values {
            Values::Scalar { kcals, fat, protein } => Nutrients {
                values: Values::Scalar {
                    kcals: f(*kcals),
                    fat: f(*fat),
                    protein: f(*protein),
                },
                units,
            },
            Values::Series { kcals, fat, protein } => Nutrients {
                values: Values::Series {
                    kcals: kcals.iter().copied().map(&f).collect(),
                    fat: fat.iter().copied().map(&f).collect(),
                    protein: protein.iter().copied().map(&f).collect(),
                },
                units,
            },
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        self.assert_same_units(other, "add");
        self.zip_with(other, self.units.clone(), |a, b| a + b)
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.assert_same_units(other, "sub");
        self.zip_with(other, self.units.clone(), |a, b| a - b)
    }

    pub fn neg(&self) -> Self {
        self.map(self.units.clone(), |a| -a)
    }

    /// Elementwise multiplication. At least one operand must carry ratio
    /// units; the result adopts the other operand's units (series tags win
    /// when a series meets a scalar).
    pub fn mul(&self, other: &Self) -> Self {
        let units = if other.units.is_ratio() {
            self.units.clone()
        } else if self.units.is_ratio() {
            other.units.clone()
        } else {
            panic!(
                "multiplying nutrients requires one ratio operand: {:?} x {:?}",
                self.units, other.units
            );
        };
        let units = if self.is_series() || other.is_series() {
            units.each_month()
        } else {
            units
        };
        if !self.is_series() && other.is_series() {
            // broadcasting is symmetric; keep the series on the left
            other.zip_with(self, units, |a, b| a * b)
        } else {
            self.zip_with(other, units, |a, b| a * b)
        }
    }

    pub fn mul_scalar(&self, factor: f64) -> Self {
        self.map(self.units.clone(), |a| a * factor)
    }

    /// Elementwise division of like-united triples, yielding a ratio.
    pub fn div(&self, other: &Self) -> Self {
        self.assert_same_units(other, "div");
        let units = if self.is_series() {
            NutrientUnits::ratio_each_month()
        } else {
            NutrientUnits::ratio()
        };
        self.zip_with(other, units, |a, b| a / b)
    }

    pub fn div_scalar(&self, divisor: f64) -> Self {
        self.map(self.units.clone(), |a| a / divisor)
    }

    /// Elementwise minimum with another like-united triple.
    pub fn elementwise_min(&self, other: &Self) -> Self {
        self.assert_same_units(other, "min");
        self.zip_with(other, self.units.clone(), f64::min)
    }

    /// Elementwise maximum with another like-united triple.
    pub fn elementwise_max(&self, other: &Self) -> Self {
        self.assert_same_units(other, "max");
        self.zip_with(other, self.units.clone(), f64::max)
    }

    /// Sum a series over all months into a scalar triple.
    pub fn sum_over_months(&self) -> Self {
        match &self.values {
            Values::Series { kcals, fat, protein } => Nutrients::scalar(
                kcals.iter().sum(),
                fat.iter().sum(),
                protein.iter().sum(),
                self.units.without_each_month(),
            ),
            Values::Scalar { .. } => panic!("sum_over_months() called on scalar nutrients"),
        }
    }

    /// Running (cumulative) sum over months.
    pub fn running_sum(&self) -> Self {
        match &self.values {
            Values::Series { kcals, fat, protein } => {
                let cumsum = |v: &[f64]| {
                    v.iter()
                        .scan(0.0, |acc, x| {
                            *acc += x;
                            Some(*acc)
                        })
                        .collect::<Vec<_>>()
                };
                Nutrients {
                    values: Values::Series {
                        kcals: cumsum(kcals),
                        fat: cumsum(fat),
                        protein: cumsum(protein),
                    },
                    units: self.units.clone(),
                }
            }
            Values::Scalar { .. } => panic!("running_sum() called on scalar nutrients"),
        }
    }

    pub fn clip_negative_to_zero(&self) -> Self {
        self.map(self.units.clone(), |a| a.max(0.0))
    }

    pub fn round_to(&self, decimals: u32) -> Self {
        let scale = 10f64.powi(decimals as i32);
        self.map(self.units.clone(), move |a| (a * scale).round() / scale)
    }

    // ---- predicates -------------------------------------------------------

    /// Collect every compared value, skipping fat / protein when excluded.
    fn included_values(&self, ctx: &Conversions) -> Vec<f64> {
        let mut out = Vec::new();
        match &self.values {
            Values::Scalar { kcals, fat, protein } => {
                out.push(*kcals);
                if ctx.include_fat {
                    out.push(*fat);
                }
                if ctx.include_protein {
                    out.push(*protein);
                }
            }
            Values::Series { kcals, fat, protein } => {
                out.extend_from_slice(kcals);
                if ctx.include_fat {
                    out.extend_from_slice(fat);
                }
                if ctx.include_protein {
                    out.extend_from_slice(protein);
                }
            }
        }
        out
    }

    fn included_pairs(&self, other: &Self, ctx: &Conversions) -> Vec<(f64, f64)> {
        self.assert_same_units(other, "compare");
        let a = self.included_values(ctx);
        let b = other.included_values(ctx);
        assert_eq!(a.len(), b.len(), "nutrient series lengths differ");
        a.into_iter().zip(b).collect()
    }

    pub fn all_greater_than(&self, other: &Self, ctx: &Conversions) -> bool {
        self.included_pairs(other, ctx).iter().all(|(a, b)| a > b)
    }

    pub fn all_greater_than_or_equal_to(&self, other: &Self, ctx: &Conversions) -> bool {
        self.included_pairs(other, ctx).iter().all(|(a, b)| a >= b)
    }

    pub fn all_less_than(&self, other: &Self, ctx: &Conversions) -> bool {
        self.included_pairs(other, ctx).iter().all(|(a, b)| a < b)
    }

    pub fn all_less_than_or_equal_to(&self, other: &Self, ctx: &Conversions) -> bool {
        self.included_pairs(other, ctx).iter().all(|(a, b)| a <= b)
    }

    pub fn all_equals(&self, other: &Self, ctx: &Conversions) -> bool {
        self.included_pairs(other, ctx).iter().all(|(a, b)| a == b)
    }

    pub fn any_greater_than(&self, other: &Self, ctx: &Conversions) -> bool {
        self.included_pairs(other, ctx).iter().any(|(a, b)| a > b)
    }

    pub fn any_greater_than_or_equal_to(&self, other: &Self, ctx: &Conversions) -> bool {
        self.included_pairs(other, ctx).iter().any(|(a, b)| a >= b)
    }

    pub fn any_less_than(&self, other: &Self, ctx: &Conversions) -> bool {
        self.included_pairs(other, ctx).iter().any(|(a, b)| a < b)
    }

    pub fn any_less_than_or_equal_to(&self, other: &Self, ctx: &Conversions) -> bool {
        self.included_pairs(other, ctx).iter().any(|(a, b)| a <= b)
    }

    pub fn all_equals_zero(&self, ctx: &Conversions) -> bool {
        self.included_values(ctx).iter().all(|a| *a == 0.0)
    }

    pub fn any_equals_zero(&self, ctx: &Conversions) -> bool {
        self.included_values(ctx).iter().any(|a| *a == 0.0)
    }

    pub fn all_greater_than_or_equal_to_zero(&self, ctx: &Conversions) -> bool {
        self.included_values(ctx).iter().all(|a| *a >= 0.0)
    }

    /// Minimum over included nutrients (and months, for a series). All three
    /// unit tags must match before nutrients are comparable to each other.
    pub fn min_nutrient(&self, ctx: &Conversions) -> f64 {
        assert!(
            self.units.all_equal(),
            "min_nutrient requires identical unit tags, got {:?}",
            self.units
        );
        self.included_values(ctx)
            .into_iter()
            .fold(f64::INFINITY, f64::min)
    }

    /// Maximum over included nutrients (and months, for a series).
    pub fn max_nutrient(&self, ctx: &Conversions) -> f64 {
        assert!(
            self.units.all_equal(),
            "max_nutrient requires identical unit tags, got {:?}",
            self.units
        );
        self.included_values(ctx)
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn has_nan(&self) -> bool {
        match &self.values {
            Values::Scalar { kcals, fat, protein } => {
                kcals.is_nan() || fat.is_nan() || protein.is_nan()
            }
            Values::Series { kcals, fat, protein } => kcals
                .iter()
                .chain(fat)
                .chain(protein)
                .any(|v| v.is_nan()),
        }
    }

    /// Where kcals are zero, fat and protein must be zero too (unless that
    /// nutrient is globally excluded).
    pub fn fat_protein_zero_where_kcals_zero(&self, ctx: &Conversions) -> bool {
        let check = |k: f64, f: f64, p: f64| {
            k != 0.0
                || ((f == 0.0 || ctx.exclude_fat()) && (p == 0.0 || ctx.exclude_protein()))
        };
        match &self.values {
            Values::Scalar { kcals, fat, protein } => check(*kcals, *fat, *protein),
            Values::Series { kcals, fat, protein } => kcals
                .iter()
                .zip(fat)
                .zip(protein)
                .all(|((k, f), p)| check(*k, *f, *p)),
        }
    }

    // ---- unit conversions -------------------------------------------------

    /// Convert an absolute (billion kcals / thousand tons) amount into
    /// percent of the population's monthly need, per nutrient.
    pub fn in_units_percent_fed(&self, ctx: &Conversions) -> Self {
        let units = if self.is_series() {
            NutrientUnits::percent_fed_each_month()
        } else {
            NutrientUnits::percent_fed_each_month().without_each_month()
        };
        let scaled = |v: f64, needed: f64| v / needed * 100.0;
        match &self.values {
            Values::Scalar { kcals, fat, protein } => Nutrients {
                values: Values::Scalar {
                    kcals: scaled(*kcals, ctx.billion_kcals_needed),
                    fat: scaled(*fat, ctx.thou_tons_fat_needed),
                    protein: scaled(*protein, ctx.thou_tons_protein_needed),
                },
                units,
            },
            Values::Series { kcals, fat, protein } => Nutrients {
                values: Values::Series {
                    kcals: kcals.iter().map(|v| scaled(*v, ctx.billion_kcals_needed)).collect(),
                    fat: fat.iter().map(|v| scaled(*v, ctx.thou_tons_fat_needed)).collect(),
                    protein: protein
                        .iter()
                        .map(|v| scaled(*v, ctx.thou_tons_protein_needed))
                        .collect(),
                },
                units,
            },
        }
    }
}

impl std::ops::Add for Nutrients {
    type Output = Nutrients;
    fn add(self, rhs: Nutrients) -> Nutrients {
        Nutrients::add(&self, &rhs)
    }
}

impl std::ops::Sub for Nutrients {
    type Output = Nutrients;
    fn sub(self, rhs: Nutrients) -> Nutrients {
        Nutrients::sub(&self, &rhs)
    }
}

impl std::ops::Neg for Nutrients {
    type Output = Nutrients;
    fn neg(self) -> Nutrients {
        Nutrients::neg(&self)
    }
}

impl std::ops::Mul<f64> for Nutrients {
    type Output = Nutrients;
    fn mul(self, rhs: f64) -> Nutrients {
        self.mul_scalar(rhs)
    }
}

impl std::ops::Mul for Nutrients {
    type Output = Nutrients;
    fn mul(self, rhs: Nutrients) -> Nutrients {
        Nutrients::mul(&self, &rhs)
    }
}
