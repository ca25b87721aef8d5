//! Example demonstrating the comparison pipeline's tracing output.
//!
//! Run with: cargo run -p mouldsight-core --example compare_tracing

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use mouldsight_core::{
    ComparisonRequest, DefectCatalog, InspectionConfig, InspectionEngineFactory, InspectionPool,
    PoolConfig,
};
use tracing_subscriber::{fmt, EnvFilter};

fn encode(image: GrayImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    if let Err(e) = DynamicImage::ImageLuma8(image).write_to(&mut buffer, ImageFormat::Png) {
        eprintln!("Failed to encode image: {}", e);
    }
    buffer.into_inner()
}

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::new("mouldsight_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    println!("=== MouldSight Comparison Tracing Demo ===\n");

    let master = GrayImage::from_pixel(200, 200, Luma([128]));
    let mut part = master.clone();
    for y in 10..50 {
        for x in 10..50 {
            part.put_pixel(x, y, Luma([0]));
        }
    }

    let engine = match InspectionEngineFactory::create(
        InspectionConfig::default(),
        Arc::new(DefectCatalog::standard()),
    ) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Failed to create engine: {}", e);
            return;
        }
    };

    let pool = InspectionPool::new(engine, &PoolConfig::default());
    let master = encode(master);

    let results = pool
        .compare_all(vec![
            ComparisonRequest::new(master.clone(), master.clone()),
            ComparisonRequest::new(master.clone(), encode(part)),
            ComparisonRequest::new(master, b"not an image".to_vec()),
        ])
        .await;

    for (i, result) in results.iter().enumerate() {
        match result.similarity_score() {
            Some(score) => {
                println!("\n✅ Part {}: {:.2}% ({:?})", i + 1, score, result.severity());
                println!("{}", result.defect_description().unwrap_or_default());
                println!("{}", result.fix_instructions().unwrap_or_default());
            }
            None => println!("\n❌ Part {}: {}", i + 1, result.error().unwrap_or_default()),
        }
    }
}
