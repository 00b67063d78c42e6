use serde::{Deserialize, Serialize};

/// servicing configuration, passed to the engine at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicingConfig {
    /// days between consecutive installment due dates
    pub installment_interval_days: u32,
}

impl ServicingConfig {
    /// weekly installments
    pub fn standard() -> Self {
        Self {
            installment_interval_days: 7,
        }
    }
}

impl Default for ServicingConfig {
    fn default() -> Self {
        Self::standard()
    }
}
