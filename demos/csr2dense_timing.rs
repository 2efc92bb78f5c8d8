//! Time the CSR-to-dense conversion on the simulated device
//!
//! Usage: cargo run --example csr2dense_timing -- <matrix.mtx> [iterations]
//!
//! Without arguments a random 512x512 matrix is generated. Set
//! `SPBENCH_LOG_FORMAT=json` for JSON log lines.

use spbench::spbench_core::{mmio, BenchmarkCase};
use spbench::{
    run_case, CsrMatrix, DCsr2Dense, DenseLayout, HostDenseConversion, HostDevice, Measurement,
    RunConfig, SCsr2Dense, StatisticalTimer,
};
use std::path::PathBuf;
use std::sync::Arc;

fn print_measurement(m: &Measurement) {
    println!(
        "{:<22} samples={:<4} mean={:>10.0}ns median={:>10.0}ns  {:.3} {}",
        m.timing.label,
        m.timing.samples,
        m.timing.mean_ns,
        m.timing.median_ns,
        m.metrics.bandwidth,
        m.bandwidth_formula
    );
}

fn time_case<C: BenchmarkCase>(case: &mut C, config: &RunConfig) -> spbench::Result<()> {
    let measurement = run_case(case, config)?;
    print_measurement(&measurement);
    Ok(())
}

fn main() -> spbench::Result<()> {
    match std::env::var("SPBENCH_LOG_FORMAT").as_deref() {
        Ok("json") => spbench::init_tracing_json(),
        _ => spbench::init_tracing(),
    }

    let mut args = std::env::args().skip(1);
    let (path, generated) = match args.next() {
        Some(p) => (PathBuf::from(p), false),
        None => {
            let path = std::env::temp_dir().join(format!("csr2dense-{}.mtx", uuid::Uuid::new_v4()));
            let triplets: Vec<(usize, usize, f64)> = (0..512)
                .flat_map(|r| (0..8).map(move |k| (r, (r * 31 + k * 67) % 512, 1.0 + k as f64)))
                .collect();
            let matrix = CsrMatrix::from_triplets(512, 512, &triplets)?;
            mmio::write_csr(&path, &matrix)?;
            (path, true)
        }
    };
    let iterations = args.next().and_then(|s| s.parse().ok()).unwrap_or(20);

    let device = Arc::new(HostDevice::new());
    let timer = Arc::new(StatisticalTimer::new());

    for layout in [DenseLayout::ColumnMajor, DenseLayout::RowMajor] {
        println!("layout: {layout:?}");
        let config = RunConfig::for_matrix(&path)
            .with_layout(layout)
            .with_iterations(1, iterations);

        let mut single: SCsr2Dense<_> =
            SCsr2Dense::new(device.clone(), HostDenseConversion::new(device.clone()), timer.clone())?
                .with_layout(layout);
        time_case(&mut single, &config)?;

        let mut double: DCsr2Dense<_> =
            DCsr2Dense::new(device.clone(), HostDenseConversion::new(device.clone()), timer.clone())?
                .with_layout(layout);
        time_case(&mut double, &config)?;
    }

    if generated {
        std::fs::remove_file(&path)?;
    }
    Ok(())
}
