use rand::Rng;
use serde::Serialize;

use super::assets::AssetRecord;

pub const RECENT_COUNT: usize = 20;
pub const RANDOM_COUNT: usize = 20;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DashboardSample {
    pub recent: Vec<AssetRecord>,
    pub random: Vec<AssetRecord>,
}

/// Sort by path descending and take the first `RECENT_COUNT` as recent. Then draw up to
/// `RANDOM_COUNT` of the rest without replacement: each draw swap-removes the pick from the
/// pool, so every draw is uniform over what remains and the loop runs exactly `n` times.
pub fn sample_dashboard<R: Rng + ?Sized>(mut assets: Vec<AssetRecord>, rng: &mut R) -> DashboardSample {
    assets.sort_by(|a, b| b.path.cmp(&a.path));
    let mut pool = assets.split_off(RECENT_COUNT.min(assets.len()));
    let recent = assets;

    let n = RANDOM_COUNT.min(pool.len());
    let mut random = Vec::with_capacity(n);
    for _ in 0..n {
        let i = rng.gen_range(0..pool.len());
        random.push(pool.swap_remove(i));
    }
    DashboardSample { recent, random }
}

/// Public URLs of every asset whose path starts with `prefix`; empty prefix selects all.
pub fn batch_export(assets: &[AssetRecord], prefix: &str) -> Vec<String> {
    assets.iter()
        .filter(|a| a.path.starts_with(prefix))
        .map(|a| a.url.clone())
        .collect()
}

#[cfg(test)]
#[path = "sampling_tests.rs"]
mod sampling_tests;
