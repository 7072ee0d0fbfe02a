use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::LazyLock;

pub static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("transit-intel"));

// --- Chat completion ---

pub static GEN_AI_TOKEN_USAGE: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("gen_ai.client.token.usage")
        .with_description("Number of tokens used per LLM call")
        .with_unit("{token}")
        .build()
});

pub static GEN_AI_OPERATION_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("gen_ai.client.operation.duration")
        .with_description("Duration of LLM operations in seconds")
        .with_unit("s")
        .build()
});

pub static GEN_AI_ERROR_COUNT: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("gen_ai.client.error.count")
        .with_description("Number of LLM call errors")
        .with_unit("{error}")
        .build()
});

// --- Intel generation ---

pub static INTEL_GENERATION_ATTEMPTS: LazyLock<Histogram<u64>> = LazyLock::new(|| {
    METER
        .u64_histogram("intel.generation.attempts")
        .with_description("Upstream attempts used per generation")
        .with_unit("{attempt}")
        .with_boundaries(vec![1.0, 2.0])
        .build()
});

pub static INTEL_CORRECTIONS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("intel.corrections")
        .with_description("Corrective prompts sent after a rejected reply")
        .with_unit("{correction}")
        .build()
});

pub static INTEL_LINK_CHECKS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("intel.link.checks")
        .with_description("Live URL checks by verdict")
        .with_unit("{check}")
        .build()
});

pub static INTEL_FIXTURE_HITS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("intel.fixture.hits")
        .with_description("Generations served from the override fixture")
        .with_unit("{generation}")
        .build()
});

// --- City profiles ---

pub static CITY_PROFILES: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("city.profiles")
        .with_description("City profile generations by outcome")
        .with_unit("{profile}")
        .build()
});

pub static CITY_GENERATION_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("city.generation.duration")
        .with_description("Total city profile generation duration in seconds")
        .with_unit("s")
        .build()
});

// --- HTTP ---

pub static HTTP_REQUESTS_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("http.requests.total")
        .with_description("Total number of HTTP requests")
        .with_unit("{request}")
        .build()
});

pub static HTTP_REQUEST_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("http.request.duration")
        .with_description("HTTP request duration in milliseconds")
        .with_unit("ms")
        .with_boundaries(vec![
            1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
        ])
        .build()
});
