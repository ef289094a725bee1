//! Funcao entity - Job function lookup table
//!
//! Table: funcoes

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "funcoes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Nome (único, sem diferenciar maiúsculas)
    #[sea_orm(column_type = "String(Some(100))", unique)]
    pub nome: String,

    /// false = excluído (soft delete)
    pub ativo: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::funcionario::Entity")]
    Funcionario,
}

impl Related<super::funcionario::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Funcionario.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
