//! Funcionario entity - directory entries
//!
//! Table: funcionarios

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "funcionarios")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "String(Some(200))")]
    pub nome: String,

    /// Ramal telefônico
    #[sea_orm(column_type = "String(Some(20))", nullable)]
    pub ramal: Option<String>,

    #[sea_orm(column_type = "String(Some(200))", nullable)]
    pub email: Option<String>,

    #[sea_orm(column_type = "String(Some(20))", nullable)]
    pub whatsapp: Option<String>,

    /// Usuário do Teams
    #[sea_orm(column_type = "String(Some(200))", nullable)]
    pub teams: Option<String>,

    /// false = excluído (soft delete)
    pub ativo: bool,

    #[sea_orm(nullable)]
    pub departamento_id: Option<i32>,

    #[sea_orm(nullable)]
    pub funcao_id: Option<i32>,

    #[sea_orm(nullable)]
    pub unidade_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::departamento::Entity",
        from = "Column::DepartamentoId",
        to = "super::departamento::Column::Id",
        on_delete = "SetNull"
    )]
    Departamento,

    #[sea_orm(
        belongs_to = "super::funcao::Entity",
        from = "Column::FuncaoId",
        to = "super::funcao::Column::Id",
        on_delete = "SetNull"
    )]
    Funcao,

    #[sea_orm(
        belongs_to = "super::unidade::Entity",
        from = "Column::UnidadeId",
        to = "super::unidade::Column::Id",
        on_delete = "SetNull"
    )]
    Unidade,
}

impl Related<super::departamento::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Departamento.def()
    }
}

impl Related<super::funcao::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Funcao.def()
    }
}

impl Related<super::unidade::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Unidade.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Employee as returned by the API, with lookup names resolved
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FuncionarioResponse {
    pub id: i32,
    pub nome: String,
    pub ramal: Option<String>,
    pub email: Option<String>,
    pub whatsapp: Option<String>,
    pub teams: Option<String>,
    pub ativo: bool,
    pub departamento_id: Option<i32>,
    pub departamento: Option<String>,
    pub funcao_id: Option<i32>,
    pub funcao: Option<String>,
    pub unidade_id: Option<i32>,
    pub unidade: Option<String>,
}

impl From<Model> for FuncionarioResponse {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            nome: model.nome,
            ramal: model.ramal,
            email: model.email,
            whatsapp: model.whatsapp,
            teams: model.teams,
            ativo: model.ativo,
            departamento_id: model.departamento_id,
            departamento: None,
            funcao_id: model.funcao_id,
            funcao: None,
            unidade_id: model.unidade_id,
            unidade: None,
        }
    }
}
