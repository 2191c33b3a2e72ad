//! Repository port for the location cache.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Location;

#[async_trait]
pub trait LocationRepository: Send + Sync {
    /// Store a new location. Names are unique.
    async fn create(&self, location: &Location) -> DomainResult<()>;

    /// Get a location by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<Location>>;

    /// Get a location by its exact name.
    async fn get_by_name(&self, name: &str) -> DomainResult<Option<Location>>;

    /// List all locations by name.
    async fn list(&self) -> DomainResult<Vec<Location>>;

    /// Delete a location. Tasks referencing it keep their data but lose the link.
    async fn delete(&self, id: Uuid) -> DomainResult<()>;
}
