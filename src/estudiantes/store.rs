use chrono::Utc;

use crate::error::{ApiError, Result};

use super::dto::{Estudiante, EstudianteInput, TableStats};

pub const TREE_NAME: &str = "estudiantes";
const META_TREE_NAME: &str = "estudiantes_meta";
const LAST_ID_KEY: &[u8] = b"last_id";

/// Row store for estudiantes on top of sled.
///
/// Rows live in one tree keyed by big-endian id, so iteration order is id
/// order. The last assigned id is persisted in a second tree so ids are never
/// handed out twice, even after deletes and restarts.
pub struct EstudianteStore {
    tree: sled::Tree,
    meta: sled::Tree,
}

impl EstudianteStore {
    pub fn new(tree: sled::Tree, meta: sled::Tree) -> Result<Self> {
        if meta.get(LAST_ID_KEY)?.is_none() {
            if let Some((key, _)) = tree.last()? {
                let highest = Self::decode_id(&key)?;
                meta.insert(LAST_ID_KEY, highest.to_be_bytes().to_vec())?;
            }
        }

        Ok(Self { tree, meta })
    }

    pub fn open(db: &sled::Db) -> Result<Self> {
        Self::new(db.open_tree(TREE_NAME)?, db.open_tree(META_TREE_NAME)?)
    }

    pub fn list(&self) -> Result<Vec<Estudiante>> {
        self.tree
            .iter()
            .values()
            .map(|value| Self::decode(&value?))
            .collect()
    }

    pub fn get(&self, id: u64) -> Result<Estudiante> {
        Self::ensure_valid_id(id)?;
        match self.tree.get(Self::key(id))? {
            Some(value) => Self::decode(&value),
            None => Err(ApiError::not_found(id)),
        }
    }

    pub fn create(&self, input: EstudianteInput) -> Result<Estudiante> {
        let input = input.normalized()?;
        let id = self.next_id()?;
        let now = Utc::now().timestamp();
        let estudiante = Estudiante {
            id,
            nombre: input.nombre,
            edad: input.edad,
            email: input.email,
            carrera: input.carrera,
            created_at: now,
            updated_at: now,
        };

        self.tree
            .insert(Self::key(id), serde_json::to_vec(&estudiante)?)?;
        self.tree.flush()?;
        self.meta.flush()?;
        Ok(estudiante)
    }

    pub fn update(&self, id: u64, input: EstudianteInput) -> Result<Estudiante> {
        Self::ensure_valid_id(id)?;
        let input = input.normalized()?;
        let now = Utc::now().timestamp();

        // The closure may run more than once under contention, so it only
        // reports failures through `failure` instead of returning early.
        let mut failure: Option<ApiError> = None;
        let updated = self.tree.update_and_fetch(Self::key(id), |old| {
            failure = None;
            let old = old?;
            let mut current: Estudiante = match serde_json::from_slice(old) {
                Ok(current) => current,
                Err(e) => {
                    failure = Some(ApiError::internal(format!(
                        "Failed to parse estudiante record: {}",
                        e
                    )));
                    return Some(old.to_vec());
                }
            };
            current.nombre = input.nombre.clone();
            current.edad = input.edad;
            current.email = input.email.clone();
            current.carrera = input.carrera.clone();
            current.updated_at = now;
            match serde_json::to_vec(&current) {
                Ok(encoded) => Some(encoded),
                Err(e) => {
                    failure = Some(ApiError::from(e));
                    Some(old.to_vec())
                }
            }
        })?;

        if let Some(err) = failure {
            return Err(err);
        }

        match updated {
            Some(value) => {
                self.tree.flush()?;
                Self::decode(&value)
            }
            None => Err(ApiError::not_found(id)),
        }
    }

    pub fn delete(&self, id: u64) -> Result<Estudiante> {
        Self::ensure_valid_id(id)?;
        match self.tree.remove(Self::key(id))? {
            Some(value) => {
                self.tree.flush()?;
                Self::decode(&value)
            }
            None => Err(ApiError::not_found(id)),
        }
    }

    /// Removes every row and returns how many were removed. The id sequence
    /// is left alone.
    pub fn delete_all(&self) -> Result<usize> {
        let removed = self.tree.len();
        self.tree.clear()?;
        self.tree.flush()?;
        Ok(removed)
    }

    pub fn count(&self) -> usize {
        self.tree.len()
    }

    pub fn stats(&self) -> Result<TableStats> {
        let min_id = match self.tree.first()? {
            Some((key, _)) => Some(Self::decode_id(&key)?),
            None => None,
        };
        let max_id = match self.tree.last()? {
            Some((key, _)) => Some(Self::decode_id(&key)?),
            None => None,
        };

        Ok(TableStats {
            total_estudiantes: self.tree.len(),
            min_id,
            max_id,
        })
    }

    fn next_id(&self) -> Result<u64> {
        let bumped = self.meta.update_and_fetch(LAST_ID_KEY, |old| {
            let last = old
                .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
                .map(u64::from_be_bytes)
                .unwrap_or(0);
            Some((last + 1).to_be_bytes().to_vec())
        })?;

        match bumped {
            Some(value) => Self::decode_id(&value),
            None => Err(ApiError::internal("Id sequence vanished")),
        }
    }

    fn ensure_valid_id(id: u64) -> Result<()> {
        if id == 0 {
            Err(ApiError::validation_error("id must be greater than or equal to 1"))
        } else {
            Ok(())
        }
    }

    fn key(id: u64) -> [u8; 8] {
        id.to_be_bytes()
    }

    fn decode_id(key: &[u8]) -> Result<u64> {
        let bytes: [u8; 8] = key
            .try_into()
            .map_err(|_| ApiError::internal(format!("Malformed estudiante key: {:?}", key)))?;
        Ok(u64::from_be_bytes(bytes))
    }

    fn decode(value: &[u8]) -> Result<Estudiante> {
        serde_json::from_slice(value)
            .map_err(|e| ApiError::internal(format!("Failed to parse estudiante record: {}", e)))
    }
}
