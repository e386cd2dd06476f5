use crate::labels::{Category, ClassLabel};
use opentelemetry::{
    global,
    metrics::{Counter, Histogram, MeterProvider},
    KeyValue,
};
use prometheus::Registry;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Failed to build prometheus exporter: {0}")]
    Exporter(String),
}

pub struct Metrics {
    predictions_total: Counter<u64>,
    blocked_total: Counter<u64>,
    inference_duration: Histogram<u64>,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .map_err(|e| MetricsError::Exporter(e.to_string()))?;

        let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
            .with_reader(exporter)
            .build();

        let meter = provider.meter("nsfw_prediction");
        global::set_meter_provider(provider);

        let predictions_total = meter
            .u64_counter("predictions_total")
            .with_description("Total number of classified images")
            .build();

        let blocked_total = meter
            .u64_counter("blocked_total")
            .with_description("Total number of uploads rejected as NSFW")
            .build();

        let boundaries = generate_boundaries((10, 50, 100, 500, 2000));

        let inference_duration = meter
            .u64_histogram("inference_duration_ms")
            .with_boundaries(boundaries)
            .with_description("Duration of decode, preprocessing and inference in milliseconds")
            .build();

        Ok(Metrics {
            predictions_total,
            blocked_total,
            inference_duration,
            registry,
        })
    }

    pub fn record_prediction(&self, class_label: ClassLabel, category: Category) {
        let attributes = [
            KeyValue::new("class", class_label.as_str()),
            KeyValue::new("category", category.as_str()),
        ];
        self.predictions_total.add(1, &attributes);
    }

    pub fn record_blocked(&self, class_label: ClassLabel) {
        let attributes = [KeyValue::new("class", class_label.as_str())];
        self.blocked_total.add(1, &attributes);
    }

    pub fn record_inference_duration(&self, duration_ms: u64) {
        self.inference_duration.record(duration_ms, &[]);
    }
}

fn generate_boundaries(parts: (i32, i32, i32, i32, i32)) -> Vec<f64> {
    let first_step: usize = 10;
    let middle_step: usize = 25;
    let end_step: usize = 100;
    let tail_step: usize = 500;
    let first_part = (parts.0..=parts.1).step_by(first_step);
    let middle_part = (parts.1..=parts.2).step_by(middle_step);
    let end_part = (parts.2..=parts.3).step_by(end_step);
    let tail_part = (parts.3..=parts.4).step_by(tail_step);

    let mut seen = HashSet::new();
    first_part
        .chain(middle_part)
        .chain(end_part)
        .chain(tail_part)
        .filter(|&x| seen.insert(x))
        .map(|x| x as f64)
        .collect()
}
