//! Usuario entity - login accounts
//!
//! Table: usuarios

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usuarios")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Nome de usuário (único)
    #[sea_orm(column_type = "String(Some(150))", unique)]
    pub username: String,

    /// Senha (hash bcrypt)
    #[sea_orm(column_type = "String(Some(128))")]
    #[serde(skip_serializing)]
    pub password: String,

    #[sea_orm(column_type = "String(Some(254))", nullable)]
    pub email: Option<String>,

    #[sea_orm(column_type = "String(Some(150))")]
    pub first_name: String,

    #[sea_orm(column_type = "String(Some(150))")]
    pub last_name: String,

    /// Administrador: gerencia usuários e tudo mais
    pub is_admin: bool,

    /// Pode editar funcionários e cadastros auxiliares
    pub can_edit: bool,

    /// false = excluído (soft delete)
    pub ativo: bool,

    pub date_joined: DateTimeUtc,

    #[sea_orm(nullable)]
    pub last_login: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// User as returned by the API (no password hash)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UsuarioResponse {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub can_edit: bool,
    pub ativo: bool,
    pub date_joined: DateTimeUtc,
    pub last_login: Option<DateTimeUtc>,
}

impl From<Model> for UsuarioResponse {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            is_admin: model.is_admin,
            can_edit: model.can_edit,
            ativo: model.ativo,
            date_joined: model.date_joined,
            last_login: model.last_login,
        }
    }
}
