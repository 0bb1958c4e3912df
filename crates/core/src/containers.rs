//! Department and category management.
//!
//! These are thin data-entry operations; the one piece with real weight is
//! deletion, which must honour the destructive cascade invariant: removing a
//! category removes every contained file, all of its metadata, and the blobs
//! on disk. Blob removal is best-effort and happens before the row cascade,
//! matching the file-deletion asymmetry.

use crate::error::{DepotError, DepotResult};
use crate::DepotService;
use depot_store::{Category, Department, NewCategory, NewDepartment};
use depot_types::NonEmptyText;

impl DepotService {
    /// Creates a department. Names are unique across the system; a duplicate
    /// surfaces as `DepotError::Store(UniqueViolation)`.
    pub fn create_department(
        &self,
        actor_id: u64,
        name: &str,
        description: Option<String>,
    ) -> DepotResult<Department> {
        let name = NonEmptyText::new(name)
            .map_err(|_| DepotError::InvalidInput("department name cannot be empty".into()))?;

        self.database().transaction(|tables| {
            let department = tables.insert_department(NewDepartment {
                name,
                description,
                created_by: actor_id,
            })?;
            tracing::info!(department_id = department.id, name = %department.name, "department created");
            Ok(department)
        })
    }

    /// Lists all departments.
    pub fn list_departments(&self) -> Vec<Department> {
        self.database().read(|t| t.departments())
    }

    /// Creates a category within a department. Names are unique per
    /// department.
    ///
    /// # Errors
    ///
    /// - `DepotError::InvalidInput` if the name is empty
    /// - `DepotError::DepartmentNotFound` if the department does not exist
    /// - `DepotError::Store(UniqueViolation)` on a duplicate name
    pub fn create_category(
        &self,
        actor_id: u64,
        department_id: u64,
        name: &str,
        description: Option<String>,
    ) -> DepotResult<Category> {
        let name = NonEmptyText::new(name)
            .map_err(|_| DepotError::InvalidInput("category name cannot be empty".into()))?;

        self.database().transaction(|tables| {
            tables
                .department(department_id)
                .map_err(|_| DepotError::DepartmentNotFound(department_id))?;
            let category = tables.insert_category(NewCategory {
                department_id,
                name,
                description,
                created_by: actor_id,
            })?;
            tracing::info!(
                category_id = category.id,
                department_id,
                name = %category.name,
                "category created"
            );
            Ok(category)
        })
    }

    /// Lists the categories of a department.
    ///
    /// # Errors
    ///
    /// Returns `DepotError::DepartmentNotFound` if the department does not
    /// exist.
    pub fn list_categories(&self, department_id: u64) -> DepotResult<Vec<Category>> {
        self.database().read(|tables| {
            tables
                .department(department_id)
                .map_err(|_| DepotError::DepartmentNotFound(department_id))?;
            Ok(tables.categories_in_department(department_id))
        })
    }

    /// Updates a category's name and description.
    pub fn update_category(
        &self,
        category_id: u64,
        name: &str,
        description: Option<String>,
    ) -> DepotResult<Category> {
        let name = NonEmptyText::new(name)
            .map_err(|_| DepotError::InvalidInput("category name cannot be empty".into()))?;

        self.database().transaction(|tables| {
            tables
                .update_category(category_id, name, description)
                .map_err(|e| match e {
                    depot_store::StoreError::NotFound { .. } => {
                        DepotError::CategoryNotFound(category_id)
                    }
                    other => DepotError::Store(other),
                })
        })
    }

    /// Deletes a category: every contained file's blobs first (best-effort),
    /// then the cascading row delete in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `DepotError::CategoryNotFound` if the category does not exist.
    pub fn delete_category(&self, category_id: u64) -> DepotResult<Category> {
        let file_ids: Vec<u64> = self
            .database()
            .read(|tables| {
                tables
                    .category(category_id)
                    .map_err(|_| DepotError::CategoryNotFound(category_id))?;
                Ok::<_, DepotError>(
                    tables
                        .files_in_category(category_id)
                        .into_iter()
                        .map(|f| f.id)
                        .collect(),
                )
            })?;

        self.delete_blobs_for_files(&file_ids);

        self.database().transaction(|tables| {
            let category = tables
                .delete_category(category_id)
                .map_err(|_| DepotError::CategoryNotFound(category_id))?;
            tracing::info!(category_id, files = file_ids.len(), "category deleted");
            Ok(category)
        })
    }

    /// Deletes a department, cascading through all its categories and files.
    ///
    /// # Errors
    ///
    /// Returns `DepotError::DepartmentNotFound` if the department does not
    /// exist.
    pub fn delete_department(&self, department_id: u64) -> DepotResult<Department> {
        let file_ids: Vec<u64> = self.database().read(|tables| {
            tables
                .department(department_id)
                .map_err(|_| DepotError::DepartmentNotFound(department_id))?;
            Ok::<_, DepotError>(
                tables
                    .categories_in_department(department_id)
                    .into_iter()
                    .flat_map(|c| tables.files_in_category(c.id))
                    .map(|f| f.id)
                    .collect(),
            )
        })?;

        self.delete_blobs_for_files(&file_ids);

        self.database().transaction(|tables| {
            let department = tables
                .delete_department(department_id)
                .map_err(|_| DepotError::DepartmentNotFound(department_id))?;
            tracing::info!(department_id, files = file_ids.len(), "department deleted");
            Ok(department)
        })
    }

    /// Best-effort removal of every blob referenced by the given files.
    fn delete_blobs_for_files(&self, file_ids: &[u64]) {
        for path in self.storage_paths_for_files(file_ids) {
            if let Err(e) = self.blobs().delete(&path) {
                tracing::warn!(path = %path, error = %e, "blob delete failed during cascade");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::RawUpload;
    use crate::CoreConfig;
    use depot_store::{Database, StoreError};
    use std::fs;
    use tempfile::TempDir;

    const ACTOR: u64 = 1;

    fn service(temp: &TempDir) -> DepotService {
        let root = temp.path().join("blobs");
        fs::create_dir_all(&root).unwrap();
        DepotService::new(Database::new(), CoreConfig::with_defaults(root)).unwrap()
    }

    fn ingest_named(service: &DepotService, category_id: u64, name: &str) -> String {
        let batch = service
            .ingest(
                category_id,
                ACTOR,
                vec![RawUpload {
                    filename: name.into(),
                    mime_type: None,
                    content: b"payload".to_vec(),
                }],
            )
            .unwrap();
        batch.succeeded[0].metadata.storage_path.clone()
    }

    #[test]
    fn create_and_list_containers() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);

        let department = service
            .create_department(ACTOR, "Finance", Some("Money things".into()))
            .unwrap();
        let category = service
            .create_category(ACTOR, department.id, "Invoices", None)
            .unwrap();

        assert_eq!(service.list_departments().len(), 1);
        let categories = service.list_categories(department.id).unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].id, category.id);
    }

    #[test]
    fn duplicate_names_surface_unique_violation() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);

        let department = service.create_department(ACTOR, "Finance", None).unwrap();
        assert!(matches!(
            service.create_department(ACTOR, "Finance", None),
            Err(DepotError::Store(StoreError::UniqueViolation { .. }))
        ));

        service
            .create_category(ACTOR, department.id, "Invoices", None)
            .unwrap();
        assert!(matches!(
            service.create_category(ACTOR, department.id, "Invoices", None),
            Err(DepotError::Store(StoreError::UniqueViolation { .. }))
        ));
    }

    #[test]
    fn create_category_requires_department() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        assert!(matches!(
            service.create_category(ACTOR, 9, "Orphans", None),
            Err(DepotError::DepartmentNotFound(9))
        ));
    }

    #[test]
    fn update_category_renames() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        let department = service.create_department(ACTOR, "Finance", None).unwrap();
        let category = service
            .create_category(ACTOR, department.id, "Invoices", None)
            .unwrap();

        let updated = service
            .update_category(category.id, "Receipts", Some("renamed".into()))
            .unwrap();
        assert_eq!(updated.name, "Receipts");
        assert_eq!(updated.description.as_deref(), Some("renamed"));
    }

    #[test]
    fn delete_category_removes_files_and_blobs() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        let department = service.create_department(ACTOR, "Ops", None).unwrap();
        let category = service
            .create_category(ACTOR, department.id, "Logs", None)
            .unwrap();
        let path_a = ingest_named(&service, category.id, "a.log");
        let path_b = ingest_named(&service, category.id, "b.log");

        service.delete_category(category.id).unwrap();

        assert!(!service.blobs().exists(&path_a));
        assert!(!service.blobs().exists(&path_b));
        assert!(service.database().read(|t| t.category(category.id).is_err()));
        assert!(service
            .database()
            .read(|t| t.files_in_category(category.id).is_empty()));
    }

    #[test]
    fn delete_department_cascades_through_categories() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        let department = service.create_department(ACTOR, "Ops", None).unwrap();
        let a = service
            .create_category(ACTOR, department.id, "Logs", None)
            .unwrap();
        let b = service
            .create_category(ACTOR, department.id, "Dumps", None)
            .unwrap();
        let path_a = ingest_named(&service, a.id, "a.log");
        let path_b = ingest_named(&service, b.id, "core.dmp");

        service.delete_department(department.id).unwrap();

        assert!(!service.blobs().exists(&path_a));
        assert!(!service.blobs().exists(&path_b));
        assert!(service.list_departments().is_empty());
    }

    #[test]
    fn delete_missing_containers_not_found() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        assert!(matches!(
            service.delete_category(1),
            Err(DepotError::CategoryNotFound(1))
        ));
        assert!(matches!(
            service.delete_department(1),
            Err(DepotError::DepartmentNotFound(1))
        ));
    }
}
