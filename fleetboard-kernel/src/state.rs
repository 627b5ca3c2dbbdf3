use parking_lot::Mutex;
use std::sync::Arc;
use time::OffsetDateTime;

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Horloge unix en secondes fractionnaires ; c'est cette valeur qui alimente
/// `last_seen` et les comparaisons de fenêtre d'activité.
pub fn unix_now() -> f64 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1e9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_now_fractional() {
        let now = unix_now();
        // après 2020, et sub-seconde exploitable pour les fenêtres
        assert!(now > 1_577_836_800.0);
        assert_eq!(now as i64, now.trunc() as i64);
    }
}
