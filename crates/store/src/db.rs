//! Table storage and transaction scoping.
//!
//! [`Tables`] holds the four entity tables plus per-table id counters, and
//! implements every row operation with the constraint checks a relational
//! backend would enforce. [`Database`] wraps `Tables` in a mutex and exposes
//! the two access shapes the core uses:
//!
//! - [`Database::read`] for constraint-free queries
//! - [`Database::transaction`] for mutation with guaranteed rollback: the
//!   closure gets `&mut Tables`; returning `Err` restores the snapshot taken
//!   when the transaction began
//!
//! Holding the mutex for the whole transaction serialises writers, which is
//! what gives the unique-constraint checks their atomicity.

use crate::entities::{
    Category, Department, FileMetadata, FileRecord, NewCategory, NewDepartment, NewFile,
    NewFileMetadata,
};
use crate::{StoreError, StoreResult};
use chrono::Utc;
use depot_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// The full table set.
///
/// `BTreeMap` keying keeps iteration ordered by id, so listings are
/// deterministic without a separate sort.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tables {
    departments: BTreeMap<u64, Department>,
    categories: BTreeMap<u64, Category>,
    files: BTreeMap<u64, FileRecord>,
    file_metadata: BTreeMap<u64, FileMetadata>,

    next_department_id: u64,
    next_category_id: u64,
    next_file_id: u64,
    next_metadata_id: u64,
}

impl Tables {
    fn allocate(counter: &mut u64) -> u64 {
        *counter += 1;
        *counter
    }

    // --- departments ---

    /// Inserts a department, enforcing global name uniqueness.
    pub fn insert_department(&mut self, new: NewDepartment) -> StoreResult<Department> {
        let name = new.name.as_str();
        if self.departments.values().any(|d| d.name == name) {
            return Err(StoreError::UniqueViolation {
                constraint: "departments.name",
                value: name.to_owned(),
            });
        }

        let now = Utc::now();
        let id = Self::allocate(&mut self.next_department_id);
        let department = Department {
            id,
            name: name.to_owned(),
            description: new.description,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        };
        self.departments.insert(id, department.clone());
        Ok(department)
    }

    /// Looks up a department by id.
    pub fn department(&self, id: u64) -> StoreResult<&Department> {
        self.departments.get(&id).ok_or(StoreError::NotFound {
            entity: "department",
            id,
        })
    }

    /// Lists all departments in id order.
    pub fn departments(&self) -> Vec<Department> {
        self.departments.values().cloned().collect()
    }

    /// Updates a department's name and description, re-checking name uniqueness.
    pub fn update_department(
        &mut self,
        id: u64,
        name: NonEmptyText,
        description: Option<String>,
    ) -> StoreResult<Department> {
        if self
            .departments
            .values()
            .any(|d| d.id != id && d.name == name.as_str())
        {
            return Err(StoreError::UniqueViolation {
                constraint: "departments.name",
                value: name.as_str().to_owned(),
            });
        }

        let department = self
            .departments
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                entity: "department",
                id,
            })?;
        department.name = name.into_inner();
        department.description = description;
        department.updated_at = Utc::now();
        Ok(department.clone())
    }

    /// Deletes a department, cascading to its categories (and their files).
    pub fn delete_department(&mut self, id: u64) -> StoreResult<Department> {
        let department = self
            .departments
            .remove(&id)
            .ok_or(StoreError::NotFound {
                entity: "department",
                id,
            })?;

        let category_ids: Vec<u64> = self
            .categories
            .values()
            .filter(|c| c.department_id == id)
            .map(|c| c.id)
            .collect();
        for category_id in category_ids {
            // Ignore NotFound: the id came from the live table a moment ago.
            let _ = self.delete_category(category_id);
        }

        Ok(department)
    }

    // --- categories ---

    /// Inserts a category, enforcing per-department name uniqueness and the
    /// department foreign key.
    pub fn insert_category(&mut self, new: NewCategory) -> StoreResult<Category> {
        if !self.departments.contains_key(&new.department_id) {
            return Err(StoreError::ForeignKey(format!(
                "category references missing department {}",
                new.department_id
            )));
        }

        let name = new.name.as_str();
        if self
            .categories
            .values()
            .any(|c| c.department_id == new.department_id && c.name == name)
        {
            return Err(StoreError::UniqueViolation {
                constraint: "categories.department_id_name",
                value: name.to_owned(),
            });
        }

        let now = Utc::now();
        let id = Self::allocate(&mut self.next_category_id);
        let category = Category {
            id,
            department_id: new.department_id,
            name: name.to_owned(),
            description: new.description,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        };
        self.categories.insert(id, category.clone());
        Ok(category)
    }

    /// Looks up a category by id.
    pub fn category(&self, id: u64) -> StoreResult<&Category> {
        self.categories.get(&id).ok_or(StoreError::NotFound {
            entity: "category",
            id,
        })
    }

    /// Lists the categories of a department in id order.
    pub fn categories_in_department(&self, department_id: u64) -> Vec<Category> {
        self.categories
            .values()
            .filter(|c| c.department_id == department_id)
            .cloned()
            .collect()
    }

    /// Updates a category's name and description, re-checking per-department
    /// name uniqueness.
    pub fn update_category(
        &mut self,
        id: u64,
        name: NonEmptyText,
        description: Option<String>,
    ) -> StoreResult<Category> {
        let department_id = self.category(id)?.department_id;
        if self
            .categories
            .values()
            .any(|c| c.id != id && c.department_id == department_id && c.name == name.as_str())
        {
            return Err(StoreError::UniqueViolation {
                constraint: "categories.department_id_name",
                value: name.as_str().to_owned(),
            });
        }

        let category = self.categories.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "category",
            id,
        })?;
        category.name = name.into_inner();
        category.description = description;
        category.updated_at = Utc::now();
        Ok(category.clone())
    }

    /// Deletes a category, cascading to its files and their metadata.
    pub fn delete_category(&mut self, id: u64) -> StoreResult<Category> {
        let category = self.categories.remove(&id).ok_or(StoreError::NotFound {
            entity: "category",
            id,
        })?;

        let file_ids: Vec<u64> = self
            .files
            .values()
            .filter(|f| f.category_id == id)
            .map(|f| f.id)
            .collect();
        for file_id in file_ids {
            let _ = self.delete_file(file_id);
        }

        Ok(category)
    }

    // --- files ---

    /// Inserts a file row.
    ///
    /// Enforces the category foreign key and the **global** uniqueness of
    /// `hash` — the constraint the ingestion engine's collision handling
    /// reacts to.
    pub fn insert_file(&mut self, new: NewFile) -> StoreResult<FileRecord> {
        if !self.categories.contains_key(&new.category_id) {
            return Err(StoreError::ForeignKey(format!(
                "file references missing category {}",
                new.category_id
            )));
        }

        if self.files.values().any(|f| f.hash == new.hash) {
            return Err(StoreError::UniqueViolation {
                constraint: "files.hash",
                value: new.hash.to_string(),
            });
        }

        let now = Utc::now();
        let id = Self::allocate(&mut self.next_file_id);
        let file = FileRecord {
            id,
            category_id: new.category_id,
            hash: new.hash,
            current_metadata_id: None,
            created_by: new.created_by,
            updated_by: new.updated_by,
            created_at: now,
            updated_at: now,
        };
        self.files.insert(id, file.clone());
        Ok(file)
    }

    /// Looks up a file by id.
    pub fn file(&self, id: u64) -> StoreResult<&FileRecord> {
        self.files.get(&id).ok_or(StoreError::NotFound {
            entity: "file",
            id,
        })
    }

    /// Lists the files of a category in id order.
    pub fn files_in_category(&self, category_id: u64) -> Vec<FileRecord> {
        self.files
            .values()
            .filter(|f| f.category_id == category_id)
            .cloned()
            .collect()
    }

    /// Points a file at its authoritative metadata row and bumps attribution.
    pub fn update_file_current_metadata(
        &mut self,
        file_id: u64,
        metadata_id: u64,
        updated_by: u64,
    ) -> StoreResult<FileRecord> {
        if !self.file_metadata.contains_key(&metadata_id) {
            return Err(StoreError::ForeignKey(format!(
                "current_metadata_id references missing metadata {metadata_id}"
            )));
        }

        let file = self.files.get_mut(&file_id).ok_or(StoreError::NotFound {
            entity: "file",
            id: file_id,
        })?;
        file.current_metadata_id = Some(metadata_id);
        file.updated_by = updated_by;
        file.updated_at = Utc::now();
        Ok(file.clone())
    }

    /// Deletes a file row, cascading to all its metadata rows.
    pub fn delete_file(&mut self, id: u64) -> StoreResult<FileRecord> {
        let file = self.files.remove(&id).ok_or(StoreError::NotFound {
            entity: "file",
            id,
        })?;
        self.file_metadata.retain(|_, m| m.file_id != id);
        Ok(file)
    }

    // --- file metadata ---

    /// Inserts a metadata row, enforcing the file foreign key.
    pub fn insert_metadata(&mut self, new: NewFileMetadata) -> StoreResult<FileMetadata> {
        if !self.files.contains_key(&new.file_id) {
            return Err(StoreError::ForeignKey(format!(
                "metadata references missing file {}",
                new.file_id
            )));
        }

        let id = Self::allocate(&mut self.next_metadata_id);
        let metadata = FileMetadata {
            id,
            file_id: new.file_id,
            filename: new.filename,
            storage_path: new.storage_path,
            mime_type: new.mime_type,
            size: new.size,
            source_action: new.source_action,
            created_by: new.created_by,
            created_at: Utc::now(),
        };
        self.file_metadata.insert(id, metadata.clone());
        Ok(metadata)
    }

    /// Looks up a metadata row by id.
    pub fn metadata(&self, id: u64) -> StoreResult<&FileMetadata> {
        self.file_metadata.get(&id).ok_or(StoreError::NotFound {
            entity: "file_metadata",
            id,
        })
    }

    /// Resolves a file's current metadata row, if the pointer is set.
    pub fn current_metadata(&self, file_id: u64) -> StoreResult<Option<&FileMetadata>> {
        let file = self.file(file_id)?;
        Ok(match file.current_metadata_id {
            Some(metadata_id) => self.file_metadata.get(&metadata_id),
            None => None,
        })
    }

    /// Lists all metadata rows of a file in id (i.e. creation) order.
    pub fn metadata_for_file(&self, file_id: u64) -> Vec<FileMetadata> {
        self.file_metadata
            .values()
            .filter(|m| m.file_id == file_id)
            .cloned()
            .collect()
    }

    /// Rewrites the filename of a metadata row in place.
    ///
    /// Only the display name changes; `storage_path`, `mime_type` and `size`
    /// stay as captured at upload time.
    pub fn update_metadata_filename(
        &mut self,
        metadata_id: u64,
        filename: String,
    ) -> StoreResult<FileMetadata> {
        let metadata = self
            .file_metadata
            .get_mut(&metadata_id)
            .ok_or(StoreError::NotFound {
                entity: "file_metadata",
                id: metadata_id,
            })?;
        metadata.filename = filename;
        Ok(metadata.clone())
    }
}

/// Shared handle over the table set.
#[derive(Debug, Default)]
pub struct Database {
    inner: Mutex<Tables>,
}

impl Database {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a database from a previously captured table snapshot.
    pub fn from_tables(tables: Tables) -> Self {
        Self {
            inner: Mutex::new(tables),
        }
    }

    /// Runs a closure against an immutable view of the tables.
    pub fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let guard = self.inner.lock().expect("store mutex poisoned");
        f(&guard)
    }

    /// Runs a closure inside a transaction.
    ///
    /// The pre-transaction state is snapshotted; if the closure returns `Err`
    /// the snapshot is restored, discarding every mutation the closure made.
    /// The error is handed back unchanged so callers keep their own taxonomy.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Tables) -> Result<T, E>,
    {
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        let snapshot = guard.clone();
        match f(&mut guard) {
            Ok(value) => Ok(value),
            Err(e) => {
                *guard = snapshot;
                Err(e)
            }
        }
    }

    /// Captures a copy of the current table state, e.g. for serialisation.
    pub fn snapshot(&self) -> Tables {
        self.inner.lock().expect("store mutex poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_types::{ContentHash, NonEmptyText};

    fn seed(tables: &mut Tables) -> (Department, Category) {
        let department = tables
            .insert_department(NewDepartment {
                name: NonEmptyText::new("Finance").unwrap(),
                description: None,
                created_by: 1,
            })
            .unwrap();
        let category = tables
            .insert_category(NewCategory {
                department_id: department.id,
                name: NonEmptyText::new("Invoices").unwrap(),
                description: Some("Incoming invoices".into()),
                created_by: 1,
            })
            .unwrap();
        (department, category)
    }

    fn hash(seed: u8) -> ContentHash {
        ContentHash::from_digest(&[seed; 32])
    }

    fn insert_file_with_metadata(tables: &mut Tables, category_id: u64, seed_byte: u8) -> u64 {
        let file = tables
            .insert_file(NewFile {
                category_id,
                hash: hash(seed_byte),
                created_by: 1,
                updated_by: 1,
            })
            .unwrap();
        let metadata = tables
            .insert_metadata(NewFileMetadata {
                file_id: file.id,
                filename: format!("file-{seed_byte}.txt"),
                storage_path: format!("categories/{category_id}/files/file-{seed_byte}.txt"),
                mime_type: "text/plain".into(),
                size: 10,
                source_action: "upload".into(),
                created_by: 1,
            })
            .unwrap();
        tables
            .update_file_current_metadata(file.id, metadata.id, 1)
            .unwrap();
        file.id
    }

    #[test]
    fn department_names_globally_unique() {
        let mut tables = Tables::default();
        seed(&mut tables);

        let duplicate = tables.insert_department(NewDepartment {
            name: NonEmptyText::new("Finance").unwrap(),
            description: None,
            created_by: 2,
        });
        assert!(matches!(
            duplicate,
            Err(StoreError::UniqueViolation {
                constraint: "departments.name",
                ..
            })
        ));
    }

    #[test]
    fn category_names_unique_per_department() {
        let mut tables = Tables::default();
        let (department, _) = seed(&mut tables);

        let duplicate = tables.insert_category(NewCategory {
            department_id: department.id,
            name: NonEmptyText::new("Invoices").unwrap(),
            description: None,
            created_by: 1,
        });
        assert!(matches!(duplicate, Err(StoreError::UniqueViolation { .. })));

        // Same name in a different department is fine.
        let other = tables
            .insert_department(NewDepartment {
                name: NonEmptyText::new("Legal").unwrap(),
                description: None,
                created_by: 1,
            })
            .unwrap();
        assert!(tables
            .insert_category(NewCategory {
                department_id: other.id,
                name: NonEmptyText::new("Invoices").unwrap(),
                description: None,
                created_by: 1,
            })
            .is_ok());
    }

    #[test]
    fn file_hash_unique_across_categories() {
        let mut tables = Tables::default();
        let (department, category) = seed(&mut tables);
        let second = tables
            .insert_category(NewCategory {
                department_id: department.id,
                name: NonEmptyText::new("Receipts").unwrap(),
                description: None,
                created_by: 1,
            })
            .unwrap();

        tables
            .insert_file(NewFile {
                category_id: category.id,
                hash: hash(7),
                created_by: 1,
                updated_by: 1,
            })
            .unwrap();

        let duplicate = tables.insert_file(NewFile {
            category_id: second.id,
            hash: hash(7),
            created_by: 1,
            updated_by: 1,
        });
        assert!(matches!(
            duplicate,
            Err(StoreError::UniqueViolation {
                constraint: "files.hash",
                ..
            })
        ));
    }

    #[test]
    fn insert_file_checks_category_fk() {
        let mut tables = Tables::default();
        let missing = tables.insert_file(NewFile {
            category_id: 99,
            hash: hash(1),
            created_by: 1,
            updated_by: 1,
        });
        assert!(matches!(missing, Err(StoreError::ForeignKey(_))));
    }

    #[test]
    fn current_metadata_pointer_checks_fk() {
        let mut tables = Tables::default();
        let (_, category) = seed(&mut tables);
        let file = tables
            .insert_file(NewFile {
                category_id: category.id,
                hash: hash(2),
                created_by: 1,
                updated_by: 1,
            })
            .unwrap();
        assert!(file.current_metadata_id.is_none());

        let dangling = tables.update_file_current_metadata(file.id, 42, 1);
        assert!(matches!(dangling, Err(StoreError::ForeignKey(_))));
    }

    #[test]
    fn delete_file_cascades_metadata() {
        let mut tables = Tables::default();
        let (_, category) = seed(&mut tables);
        let file_id = insert_file_with_metadata(&mut tables, category.id, 3);

        assert_eq!(tables.metadata_for_file(file_id).len(), 1);
        tables.delete_file(file_id).unwrap();
        assert!(tables.metadata_for_file(file_id).is_empty());
        assert!(tables.file(file_id).is_err());
    }

    #[test]
    fn delete_category_cascades_files_and_metadata() {
        let mut tables = Tables::default();
        let (_, category) = seed(&mut tables);
        let a = insert_file_with_metadata(&mut tables, category.id, 4);
        let b = insert_file_with_metadata(&mut tables, category.id, 5);

        tables.delete_category(category.id).unwrap();

        assert!(tables.file(a).is_err());
        assert!(tables.file(b).is_err());
        assert!(tables.metadata_for_file(a).is_empty());
        assert!(tables.metadata_for_file(b).is_empty());
    }

    #[test]
    fn delete_department_cascades_everything() {
        let mut tables = Tables::default();
        let (department, category) = seed(&mut tables);
        let file_id = insert_file_with_metadata(&mut tables, category.id, 6);

        tables.delete_department(department.id).unwrap();

        assert!(tables.department(department.id).is_err());
        assert!(tables.category(category.id).is_err());
        assert!(tables.file(file_id).is_err());
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let db = Database::new();
        db.transaction::<_, StoreError, _>(|tables| {
            seed(tables);
            Ok(())
        })
        .unwrap();

        let before = db.read(|t| t.departments().len());
        let result: Result<(), StoreError> = db.transaction(|tables| {
            tables.insert_department(NewDepartment {
                name: NonEmptyText::new("Ephemeral").unwrap(),
                description: None,
                created_by: 1,
            })?;
            Err(StoreError::NotFound {
                entity: "file",
                id: 1,
            })
        });
        assert!(result.is_err());
        assert_eq!(db.read(|t| t.departments().len()), before);
    }

    #[test]
    fn transaction_commits_on_ok() {
        let db = Database::new();
        db.transaction::<_, StoreError, _>(|tables| {
            seed(tables);
            Ok(())
        })
        .unwrap();
        assert_eq!(db.read(|t| t.departments().len()), 1);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let db = Database::new();
        db.transaction::<_, StoreError, _>(|tables| {
            let (_, category) = seed(tables);
            insert_file_with_metadata(tables, category.id, 9);
            Ok(())
        })
        .unwrap();

        let json = serde_json::to_string(&db.snapshot()).unwrap();
        let restored: Tables = serde_json::from_str(&json).unwrap();
        let db2 = Database::from_tables(restored);

        assert_eq!(db2.read(|t| t.departments().len()), 1);
        let file = db2.read(|t| t.file(1).cloned()).unwrap();
        assert_eq!(file.hash, hash(9));
        assert!(file.current_metadata_id.is_some());

        // Id allocation continues past restored rows.
        let next = db2
            .transaction::<_, StoreError, _>(|tables| {
                tables.insert_department(NewDepartment {
                    name: NonEmptyText::new("Legal").unwrap(),
                    description: None,
                    created_by: 1,
                })
            })
            .unwrap();
        assert_eq!(next.id, 2);
    }
}
