//! Console report for a finished run.

use std::fmt;
use std::time::Duration;

use sketches_ddsketch::DDSketch;
use yansi::Paint;

use crate::harness::RunReport;

/// Prints the aggregated run report to stdout.
pub fn print(report: &RunReport) {
    println!();
    println!(
        "{} ({} iterations, {} products added, {:.0?} elapsed)",
        "## RESULTS".bold(),
        report.iterations.bold().blue(),
        report.products_added,
        report.elapsed,
    );
    if report.failures > 0 {
        println!(
            "{}",
            format!("{} FAILED ITERATIONS", report.failures).bold().red()
        );
    }
    if report.iterations == 0 {
        return;
    }

    print_step("iteration", &report.iteration_timing, report.elapsed);
    print_step("login", &report.login_timing, report.elapsed);
    print_step("add to cart", &report.add_to_cart_timing, report.elapsed);
    print_step("place order", &report.place_order_timing, report.elapsed);
}

fn print_step(name: &str, sketch: &DDSketch, elapsed: Duration) {
    if sketch.count() == 0 {
        return;
    }
    let ops = sketch.count();
    let ops_ps = ops as f64 / elapsed.as_secs_f64();
    println!(
        "{} ({ops} ops, {:.2} ops/s)",
        name.to_uppercase().bold().green(),
        ops_ps
    );
    print_percentiles(sketch, Duration::from_secs_f64);
}

fn print_percentiles<T: fmt::Debug>(sketch: &DDSketch, map: impl Fn(f64) -> T) {
    let ops = sketch.count();
    let avg = map(sketch.sum().unwrap() / ops as f64);
    let p50 = map(sketch.quantile(0.5).unwrap().unwrap());
    let p90 = map(sketch.quantile(0.9).unwrap().unwrap());
    let p99 = map(sketch.quantile(0.99).unwrap().unwrap());
    println!(
        "  avg: {:.2?}; p50: {p50:.2?}; p90: {p90:.2?}; p99: {p99:.2?}",
        avg.bold()
    );
}
