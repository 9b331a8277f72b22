//! Demonstrates timing recursive and paused work with `code_timer`.
//!
//! Diagnostics about misuse are emitted through `tracing`; this example installs a
//! subscriber so they are printed.
//!
//! Run with: `cargo run --example code_timer_basic`

use std::hint::black_box;
use std::thread;
use std::time::Duration;

use code_timer::{Allocator, PeakMemory, Registry, code_point, timed_scope};

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

fn fibonacci(registry: &Registry, n: u64) -> u64 {
    timed_scope!(registry, "fibonacci");

    if n < 2 {
        n
    } else {
        fibonacci(registry, n - 1).wrapping_add(fibonacci(registry, n - 2))
    }
}

fn load_document(registry: &Registry) -> Vec<u8> {
    let interval = registry.enter(code_point!("load_document"));

    let document = vec![7_u8; 256 * 1024];
    thread::sleep(Duration::from_millis(20));

    {
        // Waiting for confirmation is not part of loading.
        let _paused = interval.pause();
        thread::sleep(Duration::from_millis(50));
    }

    black_box(fibonacci(registry, 15));

    document
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    if let Err(error) = code_timer::calibrate() {
        eprintln!("cannot time anything on this platform: {error}");
        return;
    }

    let registry = Registry::builder()
        .collector(|_| Box::new(PeakMemory::new()))
        .build();

    let document = load_document(&registry);
    println!("Loaded {} bytes.", document.len());

    // Misuse is repaired and reported through tracing.
    let frame = registry.frame(code_point!("unbalanced"));
    frame.stop(false);

    registry.report().print_to_stdout();
}
