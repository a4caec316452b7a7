use rust_decimal::Decimal;
use treasury_domain::CENT;

/// Numeric thresholds the services compare against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    /// Allowed distance of a project's ratio sum from 1.
    pub ratio_tolerance: Decimal,
    /// Remainders below this are considered settled by the netting plan.
    pub settlement_epsilon: Decimal,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ratio_tolerance: Decimal::new(1, 4),
            settlement_epsilon: CENT,
        }
    }
}
