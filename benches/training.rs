use concrete_strength::config::DataTransformationConfig;
use concrete_strength::preprocessing::FeaturePipeline;
use concrete_strength::training::{GridSearchCV, ModelKind, ParamGrid, ParamSet, ParamValue};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

fn create_mix_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let x = Array2::from_shape_fn((n_rows, n_features), |(i, _)| {
        let base = if i % 3 == 0 { 400.0 } else { 150.0 };
        base + rng.gen::<f64>() * 50.0
    });
    let y = x
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|v| v.ln_1p()).sum::<f64>() + rng.gen::<f64>() * 0.1)
        .collect();
    (x, y)
}

fn transformation_config() -> DataTransformationConfig {
    DataTransformationConfig {
        transformed_train_dir: PathBuf::from("unused"),
        preprocessed_object_file_path: PathBuf::from("unused.json"),
        outlier_iqr_factor: 1.5,
        knn_neighbors: 3,
        max_clusters: 10,
        random_state: 42,
    }
}

fn bench_feature_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_pipeline");
    group.sample_size(10);

    for n_rows in [500, 1000, 2000].iter() {
        let (x, _) = create_mix_data(*n_rows, 8);
        let columns: Vec<String> = (0..8).map(|i| format!("feature_{}", i)).collect();

        group.bench_with_input(BenchmarkId::new("fit_transform", n_rows), &x, |b, x| {
            b.iter(|| {
                let mut pipeline = FeaturePipeline::new(columns.clone(), &transformation_config());
                pipeline.fit_transform(black_box(x)).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_grid_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_search");
    group.sample_size(10);

    let (x, y) = create_mix_data(1000, 8);
    let mut forest_grid = ParamGrid::new();
    forest_grid.insert("n_estimators".to_string(), vec![ParamValue::Int(10), ParamValue::Int(20)]);
    forest_grid.insert("max_depth".to_string(), vec![ParamValue::Int(4), ParamValue::Null]);

    let mut ridge_grid = ParamGrid::new();
    ridge_grid.insert(
        "alpha".to_string(),
        vec![ParamValue::Float(0.1), ParamValue::Float(1.0), ParamValue::Float(10.0)],
    );

    let searches = [
        ("Ridge", ModelKind::Ridge, ridge_grid),
        ("RandomForestRegressor", ModelKind::RandomForestRegressor, forest_grid),
    ];

    for (name, kind, grid) in searches {
        group.bench_function(BenchmarkId::new("fit", name), |b| {
            b.iter(|| {
                GridSearchCV::new(kind, ParamSet::new(), grid.clone())
                    .fit(black_box(&x), black_box(&y))
                    .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_feature_pipeline, bench_grid_search);
criterion_main!(benches);
