//! Lookup tables: departamentos, funcoes, unidades
//!
//! The three tables share one shape (id, nome, ativo) and one set of rules, so
//! the service functions here are generic over [`LookupTable`], which each
//! entity implements through `impl_lookup_table!`.

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{contains_pattern, required_text};
use crate::entity::{departamento, funcao, funcionario, unidade};
use crate::error::{AppError, AppResult};
use crate::permission::Resource;

const MAX_NOME_CHARS: usize = 100;

/// A row of any lookup table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupRecord {
    pub id: i32,
    pub nome: String,
    pub ativo: bool,
}

/// Lookup row as returned by the API
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LookupResponse {
    pub id: i32,
    pub nome: String,
    pub ativo: bool,
    /// Active employees pointing at this row
    pub funcionarios_count: u64,
}

impl LookupResponse {
    fn new(record: LookupRecord, funcionarios_count: u64) -> Self {
        Self {
            id: record.id,
            nome: record.nome,
            ativo: record.ativo,
            funcionarios_count,
        }
    }
}

/// Partial update of a lookup row
#[derive(Debug, Default, Deserialize)]
pub struct LookupChanges {
    pub nome: Option<String>,
    pub ativo: Option<bool>,
}

/// Per-table queries. Implemented for each lookup entity.
#[async_trait]
pub trait LookupTable: Send + Sync + 'static {
    const RESOURCE: Resource;
    const NOT_FOUND: &'static str;
    const NAME_TAKEN: &'static str;
    const IN_USE: &'static str;

    /// Active rows ordered by name. `search` keeps names containing it,
    /// ignoring case.
    async fn list_active<C: ConnectionTrait>(
        db: &C,
        search: Option<&str>,
    ) -> Result<Vec<LookupRecord>, DbErr>;

    async fn find_record<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<LookupRecord>, DbErr>;

    /// Case-insensitive name lookup over all rows, active or not
    async fn find_by_name<C: ConnectionTrait>(
        db: &C,
        nome: &str,
        exclude_id: Option<i32>,
    ) -> Result<Option<LookupRecord>, DbErr>;

    async fn insert_record<C: ConnectionTrait>(db: &C, nome: &str) -> Result<LookupRecord, DbErr>;

    async fn save_record<C: ConnectionTrait>(db: &C, record: &LookupRecord) -> Result<LookupRecord, DbErr>;

    async fn names<C: ConnectionTrait>(db: &C, ids: Vec<i32>) -> Result<HashMap<i32, String>, DbErr>;

    async fn count_active_funcionarios<C: ConnectionTrait>(db: &C, id: i32) -> Result<u64, DbErr>;

    /// Active employee counts for every referenced row
    async fn active_counts<C: ConnectionTrait>(db: &C) -> Result<HashMap<i32, u64>, DbErr>;

    /// Clear the reference from inactive employees; returns rows touched
    async fn detach_funcionarios<C: ConnectionTrait>(db: &C, id: i32) -> Result<u64, DbErr>;
}

macro_rules! record_from {
    ($entity:ident) => {
        |m: $entity::Model| LookupRecord {
            id: m.id,
            nome: m.nome,
            ativo: m.ativo,
        }
    };
}

macro_rules! impl_lookup_table {
    ($entity:ident, $fk:ident, $resource:expr, $not_found:expr, $name_taken:expr, $in_use:expr) => {
        #[async_trait]
        impl LookupTable for $entity::Entity {
            const RESOURCE: Resource = $resource;
            const NOT_FOUND: &'static str = $not_found;
            const NAME_TAKEN: &'static str = $name_taken;
            const IN_USE: &'static str = $in_use;

            async fn list_active<C: ConnectionTrait>(
                db: &C,
                search: Option<&str>,
            ) -> Result<Vec<LookupRecord>, DbErr> {
                let mut query = $entity::Entity::find().filter($entity::Column::Ativo.eq(true));
                if let Some(text) = search {
                    query = query.filter(
                        Expr::expr(Func::lower(Expr::col($entity::Column::Nome)))
                            .like(LikeExpr::new(contains_pattern(text)).escape('\\')),
                    );
                }
                let rows = query
                    .order_by_asc($entity::Column::Nome)
                    .all(db)
                    .await?;
                Ok(rows.into_iter().map(record_from!($entity)).collect())
            }

            async fn find_record<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<LookupRecord>, DbErr> {
                let row = $entity::Entity::find_by_id(id).one(db).await?;
                Ok(row.map(record_from!($entity)))
            }

            async fn find_by_name<C: ConnectionTrait>(
                db: &C,
                nome: &str,
                exclude_id: Option<i32>,
            ) -> Result<Option<LookupRecord>, DbErr> {
                let mut query = $entity::Entity::find().filter(
                    Expr::expr(Func::lower(Expr::col($entity::Column::Nome)))
                        .eq(nome.to_lowercase()),
                );
                if let Some(id) = exclude_id {
                    query = query.filter($entity::Column::Id.ne(id));
                }
                let row = query.one(db).await?;
                Ok(row.map(record_from!($entity)))
            }

            async fn insert_record<C: ConnectionTrait>(db: &C, nome: &str) -> Result<LookupRecord, DbErr> {
                let row = $entity::ActiveModel {
                    nome: Set(nome.to_string()),
                    ativo: Set(true),
                    ..Default::default()
                }
                .insert(db)
                .await?;
                Ok(record_from!($entity)(row))
            }

            async fn save_record<C: ConnectionTrait>(
                db: &C,
                record: &LookupRecord,
            ) -> Result<LookupRecord, DbErr> {
                let row = $entity::ActiveModel {
                    id: Set(record.id),
                    nome: Set(record.nome.clone()),
                    ativo: Set(record.ativo),
                }
                .update(db)
                .await?;
                Ok(record_from!($entity)(row))
            }

            async fn names<C: ConnectionTrait>(
                db: &C,
                ids: Vec<i32>,
            ) -> Result<HashMap<i32, String>, DbErr> {
                if ids.is_empty() {
                    return Ok(HashMap::new());
                }
                let rows = $entity::Entity::find()
                    .filter($entity::Column::Id.is_in(ids))
                    .all(db)
                    .await?;
                Ok(rows.into_iter().map(|m| (m.id, m.nome)).collect())
            }

            async fn count_active_funcionarios<C: ConnectionTrait>(
                db: &C,
                id: i32,
            ) -> Result<u64, DbErr> {
                funcionario::Entity::find()
                    .filter(funcionario::Column::$fk.eq(id))
                    .filter(funcionario::Column::Ativo.eq(true))
                    .count(db)
                    .await
            }

            async fn active_counts<C: ConnectionTrait>(db: &C) -> Result<HashMap<i32, u64>, DbErr> {
                let rows: Vec<(Option<i32>, i64)> = funcionario::Entity::find()
                    .select_only()
                    .column(funcionario::Column::$fk)
                    .column_as(Expr::col(funcionario::Column::Id).count(), "total")
                    .filter(funcionario::Column::Ativo.eq(true))
                    .filter(funcionario::Column::$fk.is_not_null())
                    .group_by(funcionario::Column::$fk)
                    .into_tuple()
                    .all(db)
                    .await?;
                Ok(rows
                    .into_iter()
                    .filter_map(|(id, total)| id.map(|id| (id, total.max(0) as u64)))
                    .collect())
            }

            async fn detach_funcionarios<C: ConnectionTrait>(db: &C, id: i32) -> Result<u64, DbErr> {
                let result = funcionario::Entity::update_many()
                    .col_expr(funcionario::Column::$fk, Expr::value(Option::<i32>::None))
                    .filter(funcionario::Column::$fk.eq(id))
                    .filter(funcionario::Column::Ativo.eq(false))
                    .exec(db)
                    .await?;
                Ok(result.rows_affected)
            }
        }
    };
}

impl_lookup_table!(
    departamento,
    DepartamentoId,
    Resource::Departamento,
    "Departamento não encontrado",
    "Já existe um departamento com este nome",
    "Não é possível excluir departamento com funcionários vinculados"
);

impl_lookup_table!(
    funcao,
    FuncaoId,
    Resource::Funcao,
    "Função não encontrada",
    "Já existe uma função com este nome",
    "Não é possível excluir função com funcionários vinculados"
);

impl_lookup_table!(
    unidade,
    UnidadeId,
    Resource::Unidade,
    "Unidade não encontrada",
    "Já existe uma unidade com este nome",
    "Não é possível excluir unidade com funcionários vinculados"
);

/// Active rows ordered by name, with active employee counts.
/// A blank `search` lists everything.
pub async fn list<T: LookupTable>(
    db: &DatabaseConnection,
    search: Option<&str>,
) -> AppResult<Vec<LookupResponse>> {
    let search = search.map(str::trim).filter(|s| !s.is_empty());
    let records = T::list_active(db, search).await?;
    let counts = T::active_counts(db).await?;
    Ok(records
        .into_iter()
        .map(|r| {
            let count = counts.get(&r.id).copied().unwrap_or(0);
            LookupResponse::new(r, count)
        })
        .collect())
}

pub async fn get<T: LookupTable>(db: &DatabaseConnection, id: i32) -> AppResult<LookupResponse> {
    let record = find_active::<T, _>(db, id).await?;
    let count = T::count_active_funcionarios(db, id).await?;
    Ok(LookupResponse::new(record, count))
}

/// Create a row. A soft-deleted row with the same name (ignoring case) is
/// reactivated under the new spelling instead.
pub async fn create<T: LookupTable>(db: &DatabaseConnection, nome: &str) -> AppResult<LookupResponse> {
    let nome = required_text(nome, "Nome", MAX_NOME_CHARS)?;

    let txn = db.begin().await?;
    let record = match T::find_by_name(&txn, &nome, None).await? {
        Some(existing) if existing.ativo => {
            return Err(AppError::Validation(T::NAME_TAKEN.to_string()));
        }
        Some(mut existing) => {
            tracing::info!("Reactivating lookup row id={} as '{}'", existing.id, nome);
            existing.nome = nome;
            existing.ativo = true;
            T::save_record(&txn, &existing).await?
        }
        None => T::insert_record(&txn, &nome).await?,
    };
    let count = T::count_active_funcionarios(&txn, record.id).await?;
    txn.commit().await?;

    Ok(LookupResponse::new(record, count))
}

pub async fn update<T: LookupTable>(
    db: &DatabaseConnection,
    id: i32,
    changes: LookupChanges,
) -> AppResult<LookupResponse> {
    let txn = db.begin().await?;
    let mut record = find_active::<T, _>(&txn, id).await?;

    if let Some(nome) = changes.nome {
        let nome = required_text(&nome, "Nome", MAX_NOME_CHARS)?;
        if T::find_by_name(&txn, &nome, Some(id)).await?.is_some() {
            return Err(AppError::Validation(T::NAME_TAKEN.to_string()));
        }
        record.nome = nome;
    }

    if changes.ativo == Some(false) {
        deactivate::<T, _>(&txn, &mut record).await?;
    }

    let record = T::save_record(&txn, &record).await?;
    let count = T::count_active_funcionarios(&txn, id).await?;
    txn.commit().await?;

    Ok(LookupResponse::new(record, count))
}

/// Soft delete, refused while active employees reference the row
pub async fn delete<T: LookupTable>(db: &DatabaseConnection, id: i32) -> AppResult<()> {
    let txn = db.begin().await?;
    let mut record = find_active::<T, _>(&txn, id).await?;
    deactivate::<T, _>(&txn, &mut record).await?;
    T::save_record(&txn, &record).await?;
    txn.commit().await?;
    Ok(())
}

/// Fails with a validation error unless `id` names an active row.
/// Used when an employee points at a lookup.
pub async fn ensure_reference<T: LookupTable, C: ConnectionTrait>(db: &C, id: i32) -> AppResult<()> {
    match T::find_record(db, id).await? {
        Some(record) if record.ativo => Ok(()),
        _ => Err(AppError::Validation(T::NOT_FOUND.to_string())),
    }
}

async fn find_active<T: LookupTable, C: ConnectionTrait>(db: &C, id: i32) -> AppResult<LookupRecord> {
    match T::find_record(db, id).await? {
        Some(record) if record.ativo => Ok(record),
        _ => Err(AppError::NotFound(T::NOT_FOUND.to_string())),
    }
}

async fn deactivate<T: LookupTable, C: ConnectionTrait>(
    db: &C,
    record: &mut LookupRecord,
) -> AppResult<()> {
    let in_use = T::count_active_funcionarios(db, record.id).await?;
    if in_use > 0 {
        return Err(AppError::Conflict(T::IN_USE.to_string()));
    }
    let detached = T::detach_funcionarios(db, record.id).await?;
    if detached > 0 {
        tracing::info!("Cleared lookup id={} from {} inactive employees", record.id, detached);
    }
    record.ativo = false;
    Ok(())
}
