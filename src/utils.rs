use std::time::Duration;

pub fn ts_hm() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

pub fn chunk_vec<T: Clone>(items: &[T], chunk_size: usize) -> Vec<Vec<T>> {
    if chunk_size == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut idx = 0;
    while idx < items.len() {
        let end = (idx + chunk_size).min(items.len());
        chunks.push(items[idx..end].to_vec());
        idx = end;
    }
    chunks
}

/// Exponential backoff with jitter, capped at `max_delay`. Used by the
/// marketplace clients' per-page retry loop (attempt count resets to zero
/// once a page succeeds).
pub async fn backoff_with_jitter(attempt: u32, base_delay: Duration, max_delay: Duration) {
    use rand::Rng;
    let exp = base_delay.as_secs_f64() * 2f64.powi(attempt as i32);
    let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
    let delay = Duration::from_secs_f64((exp + jitter).min(max_delay.as_secs_f64()));
    tokio::time::sleep(delay).await;
}

pub fn interval_secs(secs: u64) -> tokio::time::Interval {
    tokio::time::interval(Duration::from_secs(secs))
}

