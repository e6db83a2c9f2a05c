//! Language model catalog domain

mod registry;
mod descriptor;
mod pricing;

pub use registry::{default_models, ModelCatalog, StaticModelCatalog};
pub use descriptor::{Complexity, CostSensitivity, ModelDescriptor, TaskKind};
pub use pricing::{ModelPricing, PricingTier};
