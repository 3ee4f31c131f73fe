use snowflake::SnowflakeIdGenerator;
use std::sync::Mutex;

static ID_GENERATOR: Mutex<Option<SnowflakeIdGenerator>> = Mutex::new(None);

/// Initialise the Snowflake id generator.
///
/// `machine_id`: machine identifier (0-31)
/// `node_id`: node identifier (0-31)
///
/// Only the first call takes effect; re-seeding a live generator could hand
/// out an id that was already issued in the current millisecond.
pub fn init(machine_id: i32, node_id: i32) {
    let mut gen = ID_GENERATOR.lock().unwrap_or_else(|e| e.into_inner());
    if gen.is_none() {
        *gen = Some(SnowflakeIdGenerator::new(machine_id, node_id));
    }
}

/// Returns the next process-wide 64-bit id.
///
/// Ids come from a single mutex-guarded generator, so successive calls within
/// one process are strictly increasing.
pub fn next_id() -> i64 {
    let mut gen = ID_GENERATOR.lock().unwrap_or_else(|e| e.into_inner());
    let generator = gen.get_or_insert_with(|| SnowflakeIdGenerator::new(1, 1));
    generator.generate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_next_id_returns_unique_ids() {
        init(1, 1);
        let mut ids = HashSet::new();
        for _ in 0..1000 {
            let id = next_id();
            assert!(id > 0);
            assert!(ids.insert(id), "Duplicate ID generated");
        }
    }

    #[test]
    fn test_next_id_is_increasing() {
        let a = next_id();
        let b = next_id();
        assert!(b > a, "expected {b} > {a}");
    }
}
