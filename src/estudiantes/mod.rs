pub mod dto;
pub(crate) mod handler;
mod helpers;
pub mod store;

pub use dto::{
    DeleteAllQuery, DeleteAllResponse, Estudiante, EstudianteInput, MessageResponse, TableStats,
};
pub(crate) use helpers::{map_error, HandlerError};
pub use store::EstudianteStore;
