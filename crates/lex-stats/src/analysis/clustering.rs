//! K-means clustering on standardized numeric columns.

use super::{ensure_all_numeric, standardize};
use crate::config::AnalysisSettings;
use crate::error::{Result, StatsError};
use crate::reporting::{Report, TextReport};
use crate::utils::{complete_rows, truncate_name};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Convergence threshold on the summed squared centre shift.
const TOLERANCE: f64 = 1e-4;

/// Name of the label column added to the clustered rows.
pub const CLUSTER_COLUMN: &str = "Cluster";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansParams {
    pub k: usize,
    pub seed: u64,
    pub n_init: usize,
    pub max_iter: usize,
}

impl KMeansParams {
    pub fn new(k: usize) -> Self {
        Self::from_settings(k, &AnalysisSettings::default())
    }

    pub fn from_settings(k: usize, settings: &AnalysisSettings) -> Self {
        Self {
            k,
            seed: settings.kmeans_seed,
            n_init: settings.kmeans_n_init,
            max_iter: settings.kmeans_max_iter,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KMeansResult {
    pub columns: Vec<String>,
    pub k: usize,
    pub n_samples: usize,
    /// Lloyd iterations of the winning restart.
    pub iterations: usize,
    /// Within-cluster sum of squares in standardized space.
    pub inertia: f64,
    /// Labels in `1..=k`, one per complete row.
    pub labels: Vec<u32>,
    /// `centers[cluster][variable]` in the original scale.
    pub centers: Vec<Vec<f64>>,
    pub counts: Vec<usize>,
    /// Selected columns of the complete rows plus the `Cluster` column.
    #[serde(skip)]
    pub labeled: DataFrame,
}

impl KMeansResult {
    /// Points for a scatter plot: the first two selected columns with labels.
    ///
    /// A single selected column is plotted against itself.
    pub fn scatter(&self) -> Result<Vec<(f64, f64, u32)>> {
        let x_name = &self.columns[0];
        let y_name = self.columns.get(1).unwrap_or(x_name);
        let x = crate::utils::numeric_values(&self.labeled, x_name)?;
        let y = crate::utils::numeric_values(&self.labeled, y_name)?;
        Ok(x.into_iter()
            .zip(y)
            .zip(&self.labels)
            .map(|((a, b), &label)| (a.unwrap_or(f64::NAN), b.unwrap_or(f64::NAN), label))
            .collect())
    }
}

/// Cluster the complete rows of `columns` into `params.k` groups.
pub fn run_kmeans(df: &DataFrame, columns: &[String], params: &KMeansParams) -> Result<KMeansResult> {
    info!("Running K-means (k={}) on {} columns", params.k, columns.len());
    if params.k == 0 || params.n_init == 0 || params.max_iter == 0 {
        return Err(StatsError::InvalidConfig(
            "k, n_init and max_iter must all be at least 1".to_string(),
        ));
    }
    ensure_all_numeric(df, columns)?;

    let raw = complete_rows(df, columns)?;
    let n = raw.len();
    if n < params.k {
        return Err(StatsError::insufficient(
            format!("K-means with k={}", params.k),
            params.k,
            n,
        ));
    }

    let mut scaled = raw.clone();
    let (means, scales) = standardize(&mut scaled);

    let mut best: Option<Fit> = None;
    for restart in 0..params.n_init {
        let seed = params.seed.wrapping_add(restart as u64);
        let fit = lloyd(&scaled, params.k, params.max_iter, seed);
        debug!("Restart {}: inertia {:.4} after {} iterations", restart, fit.inertia, fit.iterations);
        if best.as_ref().is_none_or(|b| fit.inertia < b.inertia) {
            best = Some(fit);
        }
    }
    let fit = best.ok_or_else(|| StatsError::Numerical("K-means produced no fit".to_string()))?;

    let mut counts = vec![0usize; params.k];
    for &label in &fit.labels {
        counts[label] += 1;
    }
    let centers = fit
        .centroids
        .iter()
        .map(|c| {
            c.iter()
                .zip(means.iter().zip(&scales))
                .map(|(z, (m, s))| z * s + m)
                .collect()
        })
        .collect();
    let labels: Vec<u32> = fit.labels.iter().map(|&l| l as u32 + 1).collect();

    let mut frame_columns: Vec<Column> = columns
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let values: Vec<f64> = raw.iter().map(|row| row[j]).collect();
            Column::from(Series::new(name.as_str().into(), values))
        })
        .collect();
    frame_columns.push(Column::from(Series::new(CLUSTER_COLUMN.into(), labels.clone())));

    Ok(KMeansResult {
        columns: columns.to_vec(),
        k: params.k,
        n_samples: n,
        iterations: fit.iterations,
        inertia: fit.inertia,
        labels,
        centers,
        counts,
        labeled: DataFrame::new(frame_columns)?,
    })
}

struct Fit {
    centroids: Vec<Vec<f64>>,
    labels: Vec<usize>,
    inertia: f64,
    iterations: usize,
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(c, centroid)| (c, squared_distance(point, centroid)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

/// K-means++ seeding: each new centre is drawn with probability
/// proportional to its squared distance from the nearest chosen centre.
fn kmeans_plus_plus(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = data.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(data[rng.gen_range(0..n)].clone());

    let mut min_dists = vec![f64::INFINITY; n];
    while centroids.len() < k {
        if let Some(last) = centroids.last() {
            for (i, point) in data.iter().enumerate() {
                min_dists[i] = min_dists[i].min(squared_distance(point, last));
            }
        }

        let total: f64 = min_dists.iter().sum();
        let chosen = if total <= f64::EPSILON {
            rng.gen_range(0..n)
        } else {
            let target = rng.r#gen::<f64>() * total;
            let mut cumulative = 0.0;
            min_dists
                .iter()
                .position(|d| {
                    cumulative += d;
                    cumulative >= target
                })
                .unwrap_or(n - 1)
        };
        centroids.push(data[chosen].clone());
    }
    centroids
}

fn lloyd(data: &[Vec<f64>], k: usize, max_iter: usize, seed: u64) -> Fit {
    let mut rng = StdRng::seed_from_u64(seed);
    let d = data[0].len();
    let mut centroids = kmeans_plus_plus(data, k, &mut rng);
    let mut labels = vec![0usize; data.len()];
    let mut iterations = 0;

    for iter in 0..max_iter {
        iterations = iter + 1;
        for (i, point) in data.iter().enumerate() {
            labels[i] = nearest(point, &centroids).0;
        }

        let mut sums = vec![vec![0.0; d]; k];
        let mut counts = vec![0usize; k];
        for (point, &c) in data.iter().zip(&labels) {
            counts[c] += 1;
            for (s, v) in sums[c].iter_mut().zip(point) {
                *s += v;
            }
        }

        let mut shift = 0.0;
        for c in 0..k {
            // empty cluster keeps its centre
            if counts[c] == 0 {
                continue;
            }
            let updated: Vec<f64> = sums[c].iter().map(|s| s / counts[c] as f64).collect();
            shift += squared_distance(&centroids[c], &updated);
            centroids[c] = updated;
        }

        if shift <= TOLERANCE {
            break;
        }
    }

    // final assignment against the settled centres
    let mut inertia = 0.0;
    for (i, point) in data.iter().enumerate() {
        let (c, dist) = nearest(point, &centroids);
        labels[i] = c;
        inertia += dist;
    }

    Fit {
        centroids,
        labels,
        inertia,
        iterations,
    }
}

impl Report for KMeansResult {
    fn report(&self) -> String {
        let mut report = TextReport::new(&format!("K-Means Clustering (K={})", self.k));
        report.line(format!("Sample size: {}", self.n_samples));
        report.line(format!("Iterations: {}", self.iterations));
        report.line(format!("Inertia (within-cluster sum of squares): {:.2}", self.inertia));

        report.section("Cluster centres (original scale)");
        let mut header = vec!["Cluster".to_string(), "Count".to_string()];
        header.extend(self.columns.iter().map(|c| truncate_name(c, 8)));
        let rows: Vec<Vec<String>> = self
            .centers
            .iter()
            .zip(&self.counts)
            .enumerate()
            .map(|(i, (center, count))| {
                let mut row = vec![format!("C{}", i + 1), count.to_string()];
                row.extend(center.iter().map(|v| format!("{:.2}", v)));
                row
            })
            .collect();
        report.table(&header, &rows);

        report.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn three_blobs() -> DataFrame {
        df![
            "x" => [1.0, 1.2, 0.8, 1.1, 10.0, 10.2, 9.8, 10.1, 20.0, 20.3, 19.7, 20.1],
            "y" => [1.0, 0.9, 1.1, 1.2, 5.0, 5.1, 4.9, 5.2, 1.0, 0.8, 1.2, 1.1],
        ]
        .unwrap()
    }

    #[test]
    fn test_labels_in_range_and_blobs_recovered() {
        let result = run_kmeans(&three_blobs(), &cols(&["x", "y"]), &KMeansParams::new(3)).unwrap();

        assert!(result.labels.iter().all(|&l| (1..=3).contains(&l)));
        assert_eq!(result.n_samples, 12);
        let mut counts = result.counts.clone();
        counts.sort();
        assert_eq!(counts, vec![4, 4, 4]);

        // each blob shares one label
        for blob in result.labels.chunks(4) {
            assert!(blob.iter().all(|&l| l == blob[0]));
        }
        assert_eq!(result.labeled.width(), 3);
        assert_eq!(
            result.labeled.column(CLUSTER_COLUMN).unwrap().dtype(),
            &DataType::UInt32
        );
    }

    #[test]
    fn test_deterministic_for_a_seed() {
        let columns = cols(&["x", "y"]);
        let a = run_kmeans(&three_blobs(), &columns, &KMeansParams::new(3)).unwrap();
        let b = run_kmeans(&three_blobs(), &columns, &KMeansParams::new(3)).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.inertia, b.inertia);
    }

    #[test]
    fn test_seeding_picks_distinct_points() {
        let data = vec![vec![0.0, 0.0], vec![5.0, 0.0], vec![0.0, 5.0]];
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut centroids = kmeans_plus_plus(&data, 3, &mut rng);
            centroids.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
            assert_eq!(centroids, vec![vec![0.0, 0.0], vec![0.0, 5.0], vec![5.0, 0.0]]);
        }
    }

    #[test]
    fn test_inertia_non_increasing_in_k() {
        let columns = cols(&["x", "y"]);
        let inertias: Vec<f64> = (1..=3)
            .map(|k| run_kmeans(&three_blobs(), &columns, &KMeansParams::new(k)).unwrap().inertia)
            .collect();

        assert!(inertias.iter().all(|&v| v >= 0.0));
        assert!(inertias.windows(2).all(|w| w[1] <= w[0] + 1e-9));
    }

    #[test]
    fn test_centers_in_original_scale() {
        let result = run_kmeans(&three_blobs(), &cols(&["x", "y"]), &KMeansParams::new(3)).unwrap();
        let mut xs: Vec<f64> = result.centers.iter().map(|c| c[0]).collect();
        xs.sort_by(|a, b| a.total_cmp(b));
        assert!((xs[0] - 1.025).abs() < 1e-9);
        assert!((xs[1] - 10.025).abs() < 1e-9);
        assert!((xs[2] - 20.025).abs() < 1e-9);
    }

    #[test]
    fn test_fewer_rows_than_clusters() {
        let df = df![
            "x" => [Some(1.0), None, Some(3.0)],
        ]
        .unwrap();

        assert!(matches!(
            run_kmeans(&df, &cols(&["x"]), &KMeansParams::new(3)),
            Err(StatsError::InsufficientSample { .. })
        ));
    }

    #[test]
    fn test_zero_clusters_rejected() {
        assert!(matches!(
            run_kmeans(&three_blobs(), &cols(&["x"]), &KMeansParams::new(0)),
            Err(StatsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_single_column_scatter_and_report() {
        let result = run_kmeans(&three_blobs(), &cols(&["x"]), &KMeansParams::new(2)).unwrap();
        let points = result.scatter().unwrap();
        assert_eq!(points.len(), 12);
        assert!(points.iter().all(|(a, b, _)| a == b));

        let text = result.report();
        assert!(text.starts_with("=== K-Means Clustering (K=2) ==="));
        assert!(text.contains("Sample size: 12"));
        assert!(text.contains("C2"));
    }
}
