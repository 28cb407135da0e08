use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spillsort::MergeCursor;
use std::fs;
use std::path::Path;
use std::sync::Once;

static INIT_ONCE: Once = Once::new();

/// Opt-in test logging: `RUST_LOG=spillsort=debug cargo test -- --nocapture`.
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}

/// Deterministic printable records, 50–99 bytes each.
pub fn random_records(n: usize, seed: u64) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let len = rng.gen_range(50..100);
            (0..len).map(|_| rng.sample(Alphanumeric)).collect()
        })
        .collect()
}

/// Drain a cursor to completion, asserting no latched error.
pub fn drain(cursor: &mut MergeCursor) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    while cursor.next() {
        out.push(cursor.current().to_vec());
    }
    assert!(cursor.error().is_none(), "cursor error: {:?}", cursor.error());
    out
}

/// Names of the entries currently in `dir`, sorted.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
