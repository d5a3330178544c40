//! Configuration access port trait.
//!
//! Lookups are by `[section] key`. Numeric getters fall back to `default`
//! when the key is absent or does not parse; validation is the place that
//! tells those two cases apart.

pub trait ConfigPort {
    /// Whether the key is written in the file at all, even with a blank value.
    fn has_key(&self, section: &str, key: &str) -> bool;
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
}
