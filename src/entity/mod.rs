//! Entity module - SeaORM entity definitions
//!
//! One module per table

pub mod departamento;
pub mod funcao;
pub mod funcionario;
pub mod unidade;
pub mod usuario;
