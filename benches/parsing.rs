use criterion::{Criterion, criterion_group, criterion_main};
use delistat_core::Value;
use delistat_core::normalize::normalize_column_name;
use delistat_source_ckan::data_loader::extract_records;
use serde_json::json;
use std::hint::black_box;

fn benchmark_value_inference(c: &mut Criterion) {
    let cells = ["1234", " 56.5 ", "Robo con violencia", "", "n/a", "Región de Ñuble"];

    c.bench_function("infer cell values", |b| {
        b.iter(|| {
            for cell in &cells {
                black_box(Value::infer(black_box(cell)));
            }
        })
    });
}

fn benchmark_column_normalization(c: &mut Criterion) {
    c.bench_function("normalize column name", |b| {
        b.iter(|| normalize_column_name(black_box("  Región del Libertador Bernardo O'Higgins ")))
    });
}

fn benchmark_ckan_page_decoding(c: &mut Criterion) {
    let records: Vec<_> = (0..1000)
        .map(|i| {
            json!({
                "_id": i,
                "Región": "Maule",
                "Delito": "Robo",
                "Mes": (i % 12 + 1).to_string(),
                "Cantidad": (i * 3).to_string(),
            })
        })
        .collect();
    let page = json!({"success": true, "result": {"records": records, "total": 1000}});

    c.bench_function("decode 1000 CKAN records", |b| {
        b.iter(|| extract_records(black_box(&page), Some("result.records")).unwrap())
    });
}

criterion_group!(
    benches,
    benchmark_value_inference,
    benchmark_column_normalization,
    benchmark_ckan_page_decoding
);
criterion_main!(benches);
