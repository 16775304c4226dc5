//! Squared-distance kernel of the matching engine.

/// Cluster x model matrix of summed squared differences
///
/// `observed[p][i]` is parameter `p` of cluster `i`, `models[p][j]` the same
/// parameter of model snapshot `j`.
pub fn distance_matrix(observed: &[Vec<f64>], models: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let clusters = observed.first().map_or(0, Vec::len);
    let snapshots = models.first().map_or(0, Vec::len);

    let mut matrix = vec![vec![0.0; snapshots]; clusters];
    for (obs, sim) in observed.iter().zip(models) {
        for (row, &x) in matrix.iter_mut().zip(obs) {
            for (cell, &y) in row.iter_mut().zip(sim) {
                let diff = x - y;
                *cell += diff * diff;
            }
        }
    }
    matrix
}

/// Column of the minimum in each row
///
/// First occurrence wins ties; NaN never wins, and a row with no finite
/// comparison yields `None`.
pub fn argmin_rows(matrix: &[Vec<f64>]) -> Vec<Option<usize>> {
    matrix
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .filter(|(_, d)| !d.is_nan())
                .fold(None, |best: Option<(usize, f64)>, (j, &d)| match best {
                    Some((_, b)) if b <= d => best,
                    _ => Some((j, d)),
                })
                .map(|(j, _)| j)
        })
        .collect()
}

/// Nearest model snapshot of every cluster
pub fn nearest_models(observed: &[Vec<f64>], models: &[Vec<f64>]) -> Vec<Option<usize>> {
    argmin_rows(&distance_matrix(observed, models))
}
