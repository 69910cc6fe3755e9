//! Traffic profiles.
//!
//! A profile is a statistical description of the protocol being
//! impersonated: a weighted distribution of packet sizes and one of
//! inter-packet delays, plus one-shot overrides that a peer can plant via
//! control frames. Overrides and sampling share one lock so a concurrent
//! set/get pair linearizes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;

/// Name of the profile handlers fall back to when none is configured.
pub const DEFAULT_PROFILE: &str = "http2-api";

/// One bucket of the packet-size distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeBucket {
    /// Target packet size in bytes
    pub size: usize,
    /// Probability mass of this bucket
    pub weight: f64,
}

/// One bucket of the inter-packet delay distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayBucket {
    /// Target inter-packet delay
    pub delay: Duration,
    /// Probability mass of this bucket
    pub weight: f64,
}

#[derive(Default)]
struct Overrides {
    next_size: Option<usize>,
    next_delay: Option<Duration>,
}

/// Statistical shape of the traffic to mimic.
///
/// Shared by reference across connections using the same profile name; the
/// mutable override state lives behind an internal mutex.
pub struct TrafficProfile {
    name: String,
    sizes: Vec<SizeBucket>,
    delays: Vec<DelayBucket>,
    overrides: Mutex<Overrides>,
}

impl TrafficProfile {
    /// Create a profile from explicit distributions.
    ///
    /// Weights within each distribution should sum to about 1.0; sampling
    /// tolerates a deficit by returning the last bucket.
    pub fn new(
        name: impl Into<String>,
        sizes: Vec<SizeBucket>,
        delays: Vec<DelayBucket>,
    ) -> Self {
        Self {
            name: name.into(),
            sizes,
            delays,
            overrides: Mutex::new(Overrides::default()),
        }
    }

    /// Build a profile from raw capture data.
    ///
    /// Histograms by exact value; each bucket weighs `count / total`,
    /// sorted ascending by value.
    pub fn from_capture(
        name: impl Into<String>,
        packet_sizes: &[usize],
        delays: &[Duration],
    ) -> Self {
        Self::new(
            name,
            size_distribution(packet_sizes),
            delay_distribution(delays),
        )
    }

    /// Profile name (registry key).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Packet-size distribution buckets.
    pub fn size_buckets(&self) -> &[SizeBucket] {
        &self.sizes
    }

    /// Delay distribution buckets.
    pub fn delay_buckets(&self) -> &[DelayBucket] {
        &self.delays
    }

    /// Sample the next target packet size.
    ///
    /// A pending one-shot override wins and is consumed; otherwise a
    /// weighted draw over the distribution. Empty distributions sample 0.
    pub fn packet_size(&self) -> usize {
        let mut overrides = self.overrides.lock();
        if let Some(size) = overrides.next_size.take() {
            return size;
        }
        if self.sizes.is_empty() {
            return 0;
        }

        let r: f64 = rand::thread_rng().gen();
        let mut cumulative = 0.0;
        for bucket in &self.sizes {
            cumulative += bucket.weight;
            if r <= cumulative {
                return bucket.size;
            }
        }
        self.sizes.last().map(|b| b.size).unwrap_or(0)
    }

    /// Sample the next inter-packet delay. Same algorithm as
    /// [`packet_size`](Self::packet_size) over the delay buckets.
    pub fn delay(&self) -> Duration {
        let mut overrides = self.overrides.lock();
        if let Some(delay) = overrides.next_delay.take() {
            return delay;
        }
        if self.delays.is_empty() {
            return Duration::ZERO;
        }

        let r: f64 = rand::thread_rng().gen();
        let mut cumulative = 0.0;
        for bucket in &self.delays {
            cumulative += bucket.weight;
            if r <= cumulative {
                return bucket.delay;
            }
        }
        self.delays.last().map(|b| b.delay).unwrap_or(Duration::ZERO)
    }

    /// Plant a one-shot packet-size override; 0 clears any pending one.
    pub fn set_next_packet_size(&self, size: usize) {
        self.overrides.lock().next_size = (size > 0).then_some(size);
    }

    /// Plant a one-shot delay override; a zero delay clears any pending one.
    pub fn set_next_delay(&self, delay: Duration) {
        self.overrides.lock().next_delay = (!delay.is_zero()).then_some(delay);
    }
}

fn size_distribution(values: &[usize]) -> Vec<SizeBucket> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut freq: BTreeMap<usize, usize> = BTreeMap::new();
    for &v in values {
        *freq.entry(v).or_insert(0) += 1;
    }
    let total = values.len() as f64;
    freq.into_iter()
        .map(|(size, count)| SizeBucket {
            size,
            weight: count as f64 / total,
        })
        .collect()
}

fn delay_distribution(values: &[Duration]) -> Vec<DelayBucket> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut freq: BTreeMap<Duration, usize> = BTreeMap::new();
    for &v in values {
        *freq.entry(v).or_insert(0) += 1;
    }
    let total = values.len() as f64;
    freq.into_iter()
        .map(|(delay, count)| DelayBucket {
            delay,
            weight: count as f64 / total,
        })
        .collect()
}

/// Named profiles available to a handler.
///
/// Owned by the handler rather than living in process globals; profiles are
/// handed out behind `Arc` so connections sharing a name share override
/// state.
pub struct ProfileRegistry {
    profiles: HashMap<String, Arc<TrafficProfile>>,
}

impl ProfileRegistry {
    /// Registry preloaded with the built-in profiles
    /// (`youtube`, `zoom`, `http2-api`).
    pub fn builtin() -> Self {
        let mut registry = Self {
            profiles: HashMap::new(),
        };
        registry.insert(TrafficProfile::new(
            "youtube",
            vec![
                SizeBucket { size: 1400, weight: 0.4 },
                SizeBucket { size: 1200, weight: 0.3 },
                SizeBucket { size: 1000, weight: 0.2 },
                SizeBucket { size: 800, weight: 0.1 },
            ],
            vec![
                DelayBucket { delay: Duration::from_millis(10), weight: 0.5 },
                DelayBucket { delay: Duration::from_millis(20), weight: 0.3 },
                DelayBucket { delay: Duration::from_millis(30), weight: 0.2 },
            ],
        ));
        registry.insert(TrafficProfile::new(
            "zoom",
            vec![
                SizeBucket { size: 500, weight: 0.3 },
                SizeBucket { size: 600, weight: 0.4 },
                SizeBucket { size: 700, weight: 0.3 },
            ],
            vec![
                DelayBucket { delay: Duration::from_millis(30), weight: 0.4 },
                DelayBucket { delay: Duration::from_millis(40), weight: 0.4 },
                DelayBucket { delay: Duration::from_millis(50), weight: 0.2 },
            ],
        ));
        registry.insert(TrafficProfile::new(
            "http2-api",
            vec![
                SizeBucket { size: 200, weight: 0.2 },
                SizeBucket { size: 500, weight: 0.3 },
                SizeBucket { size: 1000, weight: 0.3 },
                SizeBucket { size: 1500, weight: 0.2 },
            ],
            vec![
                DelayBucket { delay: Duration::from_millis(5), weight: 0.3 },
                DelayBucket { delay: Duration::from_millis(10), weight: 0.4 },
                DelayBucket { delay: Duration::from_millis(15), weight: 0.3 },
            ],
        ));
        registry
    }

    /// Register a profile under its own name.
    pub fn insert(&mut self, profile: TrafficProfile) {
        self.profiles
            .insert(profile.name().to_string(), Arc::new(profile));
    }

    /// Look up a profile by name.
    pub fn get(&self, name: &str) -> Option<Arc<TrafficProfile>> {
        self.profiles.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bucket_profile() -> TrafficProfile {
        TrafficProfile::new(
            "test",
            vec![
                SizeBucket { size: 100, weight: 0.5 },
                SizeBucket { size: 200, weight: 0.5 },
            ],
            vec![
                DelayBucket { delay: Duration::from_millis(1), weight: 0.5 },
                DelayBucket { delay: Duration::from_millis(2), weight: 0.5 },
            ],
        )
    }

    #[test]
    fn test_size_override_is_one_shot() {
        let profile = two_bucket_profile();
        profile.set_next_packet_size(1234);
        assert_eq!(profile.packet_size(), 1234);

        // Next draw comes from the distribution.
        let sampled = profile.packet_size();
        assert!(sampled == 100 || sampled == 200, "got {sampled}");
    }

    #[test]
    fn test_delay_override_is_one_shot() {
        let profile = two_bucket_profile();
        profile.set_next_delay(Duration::from_millis(42));
        assert_eq!(profile.delay(), Duration::from_millis(42));

        let sampled = profile.delay();
        assert!(
            sampled == Duration::from_millis(1) || sampled == Duration::from_millis(2),
            "got {sampled:?}"
        );
    }

    #[test]
    fn test_zero_override_clears() {
        let profile = two_bucket_profile();
        profile.set_next_packet_size(1234);
        profile.set_next_packet_size(0);
        let sampled = profile.packet_size();
        assert!(sampled == 100 || sampled == 200);
    }

    #[test]
    fn test_empty_distribution_samples_zero() {
        let profile = TrafficProfile::new("empty", Vec::new(), Vec::new());
        assert_eq!(profile.packet_size(), 0);
        assert_eq!(profile.delay(), Duration::ZERO);
    }

    #[test]
    fn test_samples_stay_within_buckets() {
        let profile = two_bucket_profile();
        for _ in 0..200 {
            let size = profile.packet_size();
            assert!(size == 100 || size == 200);
        }
    }

    #[test]
    fn test_underweight_distribution_falls_to_last_bucket() {
        // Weights sum to 0; every draw overruns the walk and lands on the
        // final bucket.
        let profile = TrafficProfile::new(
            "deficit",
            vec![
                SizeBucket { size: 10, weight: 0.0 },
                SizeBucket { size: 20, weight: 0.0 },
            ],
            Vec::new(),
        );
        for _ in 0..10 {
            assert_eq!(profile.packet_size(), 20);
        }
    }

    #[test]
    fn test_from_capture_histogram() {
        let profile = TrafficProfile::from_capture(
            "capture",
            &[500, 1400, 1400, 1400, 500],
            &[Duration::from_millis(10), Duration::from_millis(10)],
        );

        let sizes = profile.size_buckets();
        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes[0].size, 500);
        assert!((sizes[0].weight - 0.4).abs() < f64::EPSILON);
        assert_eq!(sizes[1].size, 1400);
        assert!((sizes[1].weight - 0.6).abs() < f64::EPSILON);

        let delays = profile.delay_buckets();
        assert_eq!(delays.len(), 1);
        assert!((delays[0].weight - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_builtin_registry() {
        let registry = ProfileRegistry::builtin();
        for name in ["youtube", "zoom", "http2-api"] {
            let profile = registry.get(name).unwrap();
            assert_eq!(profile.name(), name);
            assert!(!profile.size_buckets().is_empty());
        }
        assert!(registry.get(DEFAULT_PROFILE).is_some());
        assert!(registry.get("quic").is_none());
    }
}
