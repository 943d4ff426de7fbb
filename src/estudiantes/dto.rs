use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

pub const NOMBRE_MAX_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estudiante {
    pub id: u64,
    pub nombre: String,
    pub edad: u32,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub carrera: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Body accepted by create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstudianteInput {
    pub nombre: String,
    pub edad: u32,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub carrera: Option<String>,
}

impl EstudianteInput {
    /// Trims text fields and checks them. Blank optional fields become `None`.
    pub fn normalized(self) -> Result<Self> {
        let nombre = self.nombre.trim().to_string();
        if nombre.is_empty() {
            return Err(ApiError::validation_error("nombre cannot be empty"));
        }
        if nombre.chars().count() > NOMBRE_MAX_LEN {
            return Err(ApiError::validation_error(format!(
                "nombre cannot exceed {} characters",
                NOMBRE_MAX_LEN
            )));
        }

        let email = non_blank(self.email);
        if let Some(ref email) = email {
            if !email.contains('@') {
                return Err(ApiError::validation_error("email must contain '@'"));
            }
        }

        Ok(Self {
            nombre,
            edad: self.edad,
            email,
            carrera: non_blank(self.carrera),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub mensaje: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteAllQuery {
    #[serde(default)]
    pub confirmacion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteAllResponse {
    pub mensaje: String,
    pub eliminados: usize,
    pub restantes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub total_estudiantes: usize,
    pub min_id: Option<u64>,
    pub max_id: Option<u64>,
}
