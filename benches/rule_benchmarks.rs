//! Performance benchmarks for the fleet engine.
//!
//! Covers the pure rule evaluation and a full create/delete round through the
//! HTTP router over the in-memory store.
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use std::str::FromStr;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;

use fleet_engine::api::{AppState, create_router};
use fleet_engine::config::{AdmissionRules, ConfigLoader, PricingRules};
use fleet_engine::models::{CargoType, DeliveryInput, Destination, DriverId, TruckId};
use fleet_engine::rules::{
    AdmissionRequest, LoadSnapshot, PricingMode, evaluate_admission, price_delivery,
};
use fleet_engine::store::MemoryStore;

use axum::{Router, body::Body, http::Request};
use tower::ServiceExt;

fn delivery_input(cargo_type: CargoType, value: &str, destination: Destination) -> DeliveryInput {
    DeliveryInput {
        cargo_type,
        value: Decimal::from_str(value).unwrap(),
        destination,
        delivery_time: "2026-10-05T10:00:00Z".parse().unwrap(),
        truck_id: TruckId(1),
        driver_id: DriverId(1),
        insurance: None,
        dangerous: None,
        valuable: None,
    }
}

/// Benchmark: pricing a delivery for every destination.
fn bench_pricing(c: &mut Criterion) {
    let rules = PricingRules::default();
    let mut group = c.benchmark_group("pricing");

    for destination in [
        Destination::Northeast,
        Destination::Argentina,
        Destination::Amazon,
        Destination::Other,
    ] {
        let input = delivery_input(CargoType::Fuel, "40000", destination);
        group.bench_with_input(
            BenchmarkId::from_parameter(destination),
            &input,
            |b, input| b.iter(|| price_delivery(black_box(input), PricingMode::Creation, &rules)),
        );
    }

    group.finish();
}

/// Benchmark: evaluating admission against a load with every rule violated.
fn bench_admission(c: &mut Criterion) {
    let rules = AdmissionRules::default();
    let request = AdmissionRequest::for_input(&delivery_input(
        CargoType::Standard,
        "100",
        Destination::Northeast,
    ));
    let load = LoadSnapshot {
        truck_deliveries: 4,
        driver_deliveries: 2,
        destination_deliveries: Some(1),
    };

    c.bench_function("evaluate_admission", |b| {
        b.iter(|| evaluate_admission(black_box(&request), black_box(&load), &rules))
    });
}

async fn send(router: &Router, method: &str, uri: &str, body: String) -> Vec<u8> {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

/// Benchmark: create a delivery through the router, then delete it so the
/// quotas never fill up.
fn bench_create_delete_round(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let config = ConfigLoader::load("./config/logistics").expect("Failed to load config");
    let router = create_router(AppState::new(config, Arc::new(MemoryStore::new())));

    rt.block_on(async {
        let truck = serde_json::json!({ "license_plate": "ABC1234" });
        let driver = serde_json::json!({ "name": "Ana Souza", "license": "12345678901" });
        send(&router, "POST", "/api/truck", truck.to_string()).await;
        send(&router, "POST", "/api/driver", driver.to_string()).await;
    });

    let body = serde_json::json!({
        "type": "fuel",
        "value": 40000,
        "destination": "argentina",
        "delivery_time": "2026-10-05T10:00:00Z",
        "truck_id": 1,
        "driver_id": 1
    })
    .to_string();

    c.bench_function("create_delete_round", |b| {
        b.to_async(&rt).iter(|| async {
            let created = send(&router, "POST", "/api/delivery", body.clone()).await;
            let created: serde_json::Value = serde_json::from_slice(&created).unwrap();
            let uri = format!("/api/delivery/{}", created["id"]);
            black_box(send(&router, "DELETE", &uri, String::new()).await)
        })
    });
}

criterion_group!(benches, bench_pricing, bench_admission, bench_create_delete_round);
criterion_main!(benches);
