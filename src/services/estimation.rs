//! Estimation (BOQ) provider contract.
//!
//! The estimation system is an external collaborator; this module fixes the
//! payload shapes the procurement core consumes and ships an in-memory
//! implementation for tests and development.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;

/// One material row of a project's bill of quantities.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MaterialRequirement {
    pub material_id: Uuid,
    pub material_name: String,
    pub unit: String,
    pub material_rate: Decimal,
    pub total_qty: Decimal,
}

/// One work-scope/component row of a project's estimation.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentRequirement {
    pub component_name: String,
    pub unit: String,
    pub total_volume: Decimal,
}

/// Source of BOQ defaults and the active item catalog for project-bound
/// documents.
#[async_trait]
pub trait EstimationProvider: Send + Sync {
    async fn material_requirements(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<MaterialRequirement>, ServiceError>;

    async fn component_requirements(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<ComponentRequirement>, ServiceError>;
}

/// In-memory estimation fixture keyed by project id.
#[derive(Default)]
pub struct InMemoryEstimationProvider {
    materials: DashMap<Uuid, Vec<MaterialRequirement>>,
    components: DashMap<Uuid, Vec<ComponentRequirement>>,
}

impl InMemoryEstimationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_materials(&self, project_id: Uuid, requirements: Vec<MaterialRequirement>) {
        self.materials.insert(project_id, requirements);
    }

    pub fn set_components(&self, project_id: Uuid, requirements: Vec<ComponentRequirement>) {
        self.components.insert(project_id, requirements);
    }
}

#[async_trait]
impl EstimationProvider for InMemoryEstimationProvider {
    async fn material_requirements(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<MaterialRequirement>, ServiceError> {
        Ok(self
            .materials
            .get(&project_id)
            .map(|r| r.clone())
            .unwrap_or_default())
    }

    async fn component_requirements(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<ComponentRequirement>, ServiceError> {
        Ok(self
            .components
            .get(&project_id)
            .map(|r| r.clone())
            .unwrap_or_default())
    }
}
