//! Deterministic, human readable names.
//!
//! Names are valid DNS-1123 labels so they can double as namespace and
//! release names on the cluster.

use xxhash_rust::xxh3::xxh3_64;

const ADJECTIVES: &[&str] = &[
    "amber", "bold", "brisk", "calm", "clever", "crisp", "daring", "eager", "fancy", "gentle",
    "glad", "golden", "happy", "humble", "jolly", "keen", "lively", "lucky", "mellow", "merry",
    "nimble", "noble", "plucky", "proud", "quiet", "rapid", "silent", "snappy", "steady", "sunny",
    "swift", "witty",
];

const NOUNS: &[&str] = &[
    "badger", "beacon", "cedar", "comet", "coral", "falcon", "fern", "galaxy", "harbor", "heron",
    "island", "lagoon", "lantern", "maple", "meadow", "nebula", "orchid", "otter", "pebble",
    "pine", "quartz", "raven", "river", "sparrow", "summit", "thistle", "tundra", "valley",
    "walrus", "willow", "yarrow", "zephyr",
];

/// Builds `<adjective>-<noun>-<hex>` from the given parts. Equal parts always
/// produce equal names.
pub fn human_name(parts: &[&[u8]]) -> String {
    let mut buf = Vec::with_capacity(parts.iter().map(|p| p.len() + 1).sum());
    for part in parts {
        buf.extend_from_slice(part);
        // separator keeps ("ab", "c") and ("a", "bc") apart
        buf.push(0);
    }
    let hash = xxh3_64(&buf);

    let adjective = ADJECTIVES[(hash % ADJECTIVES.len() as u64) as usize];
    let noun = NOUNS[((hash >> 16) % NOUNS.len() as u64) as usize];
    format!("{}-{}-{:06x}", adjective, noun, (hash >> 32) & 0xff_ffff)
}
