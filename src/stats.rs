//! Pairwise Pearson correlation across numeric measures.

use crate::aggregate::Measure;
use crate::metric::Metric;
use crate::types::EnrichedRecord;

/// Measures included in the standard correlation matrix.
pub const CORRELATED_MEASURES: [Measure; 6] = [
    Measure::Sales,
    Measure::Quantity,
    Measure::Discount,
    Measure::Profit,
    Measure::ShippingCost,
    Measure::ProfitMargin,
];

/// Square matrix of correlation coefficients, indexed like `measures`.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub measures: Vec<Measure>,
    pub values: Vec<Vec<Metric>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: Measure, b: Measure) -> Option<Metric> {
        let i = self.measures.iter().position(|m| *m == a)?;
        let j = self.measures.iter().position(|m| *m == b)?;
        Some(self.values[i][j])
    }
}

/// Pearson correlation over the pairs where both values are defined.
///
/// Undefined with fewer than two pairs or when either side has zero
/// variance.
pub fn pearson(pairs: &[(f64, f64)]) -> Metric {
    let n = pairs.len();
    if n < 2 {
        return Metric::Undefined;
    }
    let nf = n as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / nf;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    Metric::ratio(sxy, denom)
        .value()
        .map_or(Metric::Undefined, |r| Metric::Value(r.clamp(-1.0, 1.0)))
}

pub fn correlation_matrix(records: &[EnrichedRecord], measures: &[Measure]) -> CorrelationMatrix {
    let columns: Vec<Vec<Metric>> = measures
        .iter()
        .map(|m| records.iter().map(|r| m.value(r)).collect())
        .collect();

    let values = (0..measures.len())
        .map(|i| {
            (0..measures.len())
                .map(|j| {
                    let pairs: Vec<(f64, f64)> = columns[i]
                        .iter()
                        .zip(&columns[j])
                        .filter_map(|(a, b)| Some((a.value()?, b.value()?)))
                        .collect();
                    pearson(&pairs)
                })
                .collect()
        })
        .collect();

    CorrelationMatrix {
        measures: measures.to_vec(),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pearson_perfect() {
        let up: Vec<(f64, f64)> = (0..5)
            .map(|i| (f64::from(i), 2.0 * f64::from(i) + 1.0))
            .collect();
        assert_relative_eq!(pearson(&up).value().unwrap(), 1.0, epsilon = 1e-12);
        let down: Vec<(f64, f64)> = (0..5).map(|i| (f64::from(i), -f64::from(i))).collect();
        assert_relative_eq!(pearson(&down).value().unwrap(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_degenerate() {
        assert!(pearson(&[(1.0, 2.0)]).is_undefined());
        assert!(pearson(&[(1.0, 2.0), (1.0, 3.0)]).is_undefined());
    }

    #[test]
    fn test_pearson_known_value() {
        let pairs = [(1.0, 2.0), (2.0, 1.0), (3.0, 4.0), (4.0, 3.0)];
        assert_relative_eq!(pearson(&pairs).value().unwrap(), 0.6, epsilon = 1e-12);
    }
}
