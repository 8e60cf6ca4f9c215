use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("iterations must be positive")]
    NoIterations,

    #[error("time horizon must be at least one year")]
    EmptyHorizon,

    #[error("asset list is empty")]
    EmptyAssetMix,

    #[error("asset weights sum to zero, aggregate portfolio parameters would all be zero")]
    ZeroWeight,

    #[error("{field} must be a finite number")]
    NonFinite { field: String },

    #[error("{field} must not be negative")]
    NegativeAmount { field: String },

    #[error("{field} must be greater than -100%, got {value}")]
    InvalidRate { field: String, value: f64 },

    #[error("income source '{name}' ends ({end}) before it starts ({start})")]
    InvalidIncomeWindow { name: String, start: i32, end: i32 },
}
