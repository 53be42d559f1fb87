use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use parking_lot::Mutex;

/// Performance metrics for a stream reader
///
/// Counters are atomic so a handle can be cloned out of the reader and
/// inspected between calls to `next()`.
#[derive(Debug)]
pub struct ReaderMetrics {
    // Operation counts
    /// Number of record fetches
    fetch_count: AtomicUsize,
    /// Number of full passes over all shards
    pass_count: AtomicUsize,

    // Data metrics
    /// Number of records received
    record_count: AtomicUsize,
    /// Compressed bytes received
    bytes_fetched: AtomicUsize,
    /// Bytes after decompression
    bytes_decompressed: AtomicUsize,
    /// Number of data envelopes decoded
    data_messages: AtomicUsize,
    /// Number of non-data envelopes discarded
    skipped_messages: AtomicUsize,
    /// Number of events decoded
    event_count: AtomicUsize,

    // Timing metrics
    /// Total fetch duration in nanoseconds
    fetch_duration_ns: AtomicU64,
    /// Last fetch duration
    last_fetch_duration: Mutex<Duration>,
    /// Total decode duration in nanoseconds
    decode_duration_ns: AtomicU64,

    // Internal state
    /// Start time of the metrics collector
    start_time: Instant,
}

impl Default for ReaderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            fetch_count: AtomicUsize::new(0),
            pass_count: AtomicUsize::new(0),

            record_count: AtomicUsize::new(0),
            bytes_fetched: AtomicUsize::new(0),
            bytes_decompressed: AtomicUsize::new(0),
            data_messages: AtomicUsize::new(0),
            skipped_messages: AtomicUsize::new(0),
            event_count: AtomicUsize::new(0),

            fetch_duration_ns: AtomicU64::new(0),
            last_fetch_duration: Mutex::new(Duration::from_secs(0)),
            decode_duration_ns: AtomicU64::new(0),

            start_time: Instant::now(),
        }
    }

    /// Increment fetch count
    pub fn increment_fetches(&self) {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment pass count
    pub fn increment_passes(&self) {
        self.pass_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Add received records
    pub fn add_records(&self, count: usize) {
        self.record_count.fetch_add(count, Ordering::Relaxed);
    }

    /// Add compressed bytes received
    pub fn add_bytes_fetched(&self, bytes: usize) {
        self.bytes_fetched.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Add decompressed bytes
    pub fn add_bytes_decompressed(&self, bytes: usize) {
        self.bytes_decompressed.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a decoded data envelope and its events
    pub fn record_data_message(&self, events: usize) {
        self.data_messages.fetch_add(1, Ordering::Relaxed);
        self.event_count.fetch_add(events, Ordering::Relaxed);
    }

    /// Record a discarded non-data envelope
    pub fn record_skipped_message(&self) {
        self.skipped_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fetch duration
    pub fn record_fetch_duration(&self, duration: Duration) {
        self.fetch_duration_ns.fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
        *self.last_fetch_duration.lock() = duration;
    }

    /// Record a decode duration
    pub fn record_decode_duration(&self, duration: Duration) {
        self.decode_duration_ns.fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Get number of fetches
    pub fn get_fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::Relaxed)
    }

    /// Get number of completed passes
    pub fn get_pass_count(&self) -> usize {
        self.pass_count.load(Ordering::Relaxed)
    }

    /// Get number of records received
    pub fn get_record_count(&self) -> usize {
        self.record_count.load(Ordering::Relaxed)
    }

    /// Get compressed bytes received
    pub fn get_bytes_fetched(&self) -> usize {
        self.bytes_fetched.load(Ordering::Relaxed)
    }

    /// Get decompressed bytes
    pub fn get_bytes_decompressed(&self) -> usize {
        self.bytes_decompressed.load(Ordering::Relaxed)
    }

    /// Get number of data envelopes
    pub fn get_data_message_count(&self) -> usize {
        self.data_messages.load(Ordering::Relaxed)
    }

    /// Get number of discarded envelopes
    pub fn get_skipped_message_count(&self) -> usize {
        self.skipped_messages.load(Ordering::Relaxed)
    }

    /// Get number of decoded events
    pub fn get_event_count(&self) -> usize {
        self.event_count.load(Ordering::Relaxed)
    }

    /// Get total fetch duration
    pub fn get_fetch_duration(&self) -> Duration {
        Duration::from_nanos(self.fetch_duration_ns.load(Ordering::Relaxed))
    }

    /// Get last fetch duration
    pub fn get_last_fetch_duration(&self) -> Duration {
        *self.last_fetch_duration.lock()
    }

    /// Get total decode duration
    pub fn get_decode_duration(&self) -> Duration {
        Duration::from_nanos(self.decode_duration_ns.load(Ordering::Relaxed))
    }

    /// Get overall compression ratio (decompressed / compressed)
    pub fn get_compression_ratio(&self) -> f64 {
        let fetched = self.get_bytes_fetched();
        if fetched == 0 {
            return 1.0;
        }

        self.get_bytes_decompressed() as f64 / fetched as f64
    }

    /// Get uptime
    pub fn get_uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.fetch_count.store(0, Ordering::Relaxed);
        self.pass_count.store(0, Ordering::Relaxed);

        self.record_count.store(0, Ordering::Relaxed);
        self.bytes_fetched.store(0, Ordering::Relaxed);
        self.bytes_decompressed.store(0, Ordering::Relaxed);
        self.data_messages.store(0, Ordering::Relaxed);
        self.skipped_messages.store(0, Ordering::Relaxed);
        self.event_count.store(0, Ordering::Relaxed);

        self.fetch_duration_ns.store(0, Ordering::Relaxed);
        *self.last_fetch_duration.lock() = Duration::from_secs(0);
        self.decode_duration_ns.store(0, Ordering::Relaxed);
    }

    /// Get a report of all metrics
    pub fn get_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Reader Metrics Report ===\n\n");

        let uptime = self.get_uptime();
        report.push_str(&format!("Uptime: {:?}\n\n", uptime));

        report.push_str("Operation Counts:\n");
        report.push_str(&format!("  Fetches: {}\n", self.get_fetch_count()));
        report.push_str(&format!("  Passes: {}\n\n", self.get_pass_count()));

        report.push_str("Data Metrics:\n");
        report.push_str(&format!("  Records: {}\n", self.get_record_count()));
        report.push_str(&format!("  Bytes Fetched: {}\n", self.get_bytes_fetched()));
        report.push_str(&format!("  Bytes Decompressed: {}\n", self.get_bytes_decompressed()));
        report.push_str(&format!("  Compression Ratio: {:.2}\n", self.get_compression_ratio()));
        report.push_str(&format!("  Data Messages: {}\n", self.get_data_message_count()));
        report.push_str(&format!("  Skipped Messages: {}\n", self.get_skipped_message_count()));
        report.push_str(&format!("  Events: {}\n\n", self.get_event_count()));

        report.push_str("Performance Metrics:\n");
        if self.get_fetch_count() > 0 {
            let avg_fetch = self.get_fetch_duration().as_micros() / self.get_fetch_count() as u128;
            report.push_str(&format!("  Avg. Fetch Time: {}µs\n", avg_fetch));
        }
        report.push_str(&format!("  Last Fetch Time: {:?}\n", self.get_last_fetch_duration()));
        report.push_str(&format!("  Total Decode Time: {:?}\n", self.get_decode_duration()));

        let uptime_secs = uptime.as_secs_f64();
        if uptime_secs > 0.0 {
            report.push_str("\nThroughput Metrics:\n");
            report.push_str(&format!(
                "  Events/sec: {:.2}\n",
                self.get_event_count() as f64 / uptime_secs
            ));
            report.push_str(&format!(
                "  Fetched Bytes/sec: {:.2}\n",
                self.get_bytes_fetched() as f64 / uptime_secs
            ));
        }

        report
    }
}
