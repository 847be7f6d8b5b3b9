//! Run identifier generation.

use uuid::Uuid;

/// Generates unique, prefixed run identifiers.
#[derive(Clone, Debug, Default)]
pub struct IdGenerator;

impl IdGenerator {
    pub fn new() -> Self {
        Self
    }

    /// A unique run id of the form `run-<uuid>`.
    pub fn generate_run_id(&self) -> String {
        format!("run-{}", Uuid::new_v4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_prefixed_and_unique() {
        let ids = IdGenerator::new();
        let a = ids.generate_run_id();
        let b = ids.generate_run_id();
        assert!(a.starts_with("run-"));
        assert_ne!(a, b);
    }
}
