//! Employee directory entries

use sea_orm::sea_query::{Condition, Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    Order, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::Deserialize;
use std::collections::HashMap;

use super::lookup::{ensure_reference, LookupTable};
use super::{
    contains_pattern, double_option, normalize_email, optional_text, parse_ordering, required_text,
    Ordering,
};
use crate::entity::funcionario::{self, FuncionarioResponse};
use crate::entity::{departamento, funcao, unidade};
use crate::error::{AppError, AppResult, OptionExt};

const MAX_NOME: usize = 200;
const MAX_RAMAL: usize = 20;
const MAX_EMAIL: usize = 200;
const MAX_WHATSAPP: usize = 20;
const MAX_TEAMS: usize = 200;

const NOT_FOUND: &str = "Funcionário não encontrado";

const ORDERING_FIELDS: [&str; 2] = ["nome", "ramal"];

/// Raw query string of the listing and search endpoints.
/// Values stay strings so a bad number can be reported instead of rejected.
#[derive(Debug, Default)]
pub struct SearchParams {
    pub q: Option<String>,
    pub busca: Option<String>,
    pub search: Option<String>,
    pub departamento_id: Option<String>,
    pub funcao_id: Option<String>,
    pub unidade_id: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    pub text: Option<String>,
    pub departamento_id: Option<i32>,
    pub funcao_id: Option<i32>,
    pub unidade_id: Option<i32>,
}

impl SearchParams {
    /// Collect decoded query pairs. A repeated key keeps its last value;
    /// unknown keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "q" => &mut params.q,
                "busca" => &mut params.busca,
                "search" => &mut params.search,
                "departamento_id" => &mut params.departamento_id,
                "funcao_id" => &mut params.funcao_id,
                "unidade_id" => &mut params.unidade_id,
                "ordering" => &mut params.ordering,
                _ => continue,
            };
            *slot = Some(value);
        }
        params
    }

    /// Normalize the parameters. On a non-numeric id the name of the
    /// offending parameter is returned.
    pub fn parse(&self) -> Result<SearchFilter, &'static str> {
        let text = [&self.q, &self.busca, &self.search]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(str::to_string);

        Ok(SearchFilter {
            text,
            departamento_id: parse_id(&self.departamento_id, "departamento_id")?,
            funcao_id: parse_id(&self.funcao_id, "funcao_id")?,
            unidade_id: parse_id(&self.unidade_id, "unidade_id")?,
        })
    }
}

fn sort(descending: bool) -> Order {
    if descending {
        Order::Desc
    } else {
        Order::Asc
    }
}

fn parse_id(value: &Option<String>, name: &'static str) -> Result<Option<i32>, &'static str> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v.parse().map(Some).map_err(|_| name),
    }
}

/// Result of a listing
#[derive(Debug)]
pub struct SearchOutcome {
    pub funcionarios: Vec<FuncionarioResponse>,
    /// Set when a filter was malformed and ignored
    pub ignored_param: Option<&'static str>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewFuncionario {
    #[serde(default)]
    pub nome: String,
    pub ramal: Option<String>,
    pub email: Option<String>,
    pub whatsapp: Option<String>,
    pub teams: Option<String>,
    pub departamento_id: Option<i32>,
    pub funcao_id: Option<i32>,
    pub unidade_id: Option<i32>,
}

/// Partial update; `Some(None)` clears a nullable field
#[derive(Debug, Default, Deserialize)]
pub struct FuncionarioChanges {
    pub nome: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub ramal: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub whatsapp: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub teams: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub departamento_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub funcao_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub unidade_id: Option<Option<i32>>,
}

/// Active employees matching the parameters, ordered by name unless
/// `ordering` asks for `nome`/`ramal` (prefix `-` for descending)
pub async fn search(db: &DatabaseConnection, params: &SearchParams) -> AppResult<SearchOutcome> {
    let (filter, ignored_param) = match params.parse() {
        Ok(filter) => (filter, None),
        Err(param) => {
            tracing::warn!("Ignoring search filters: invalid value for {}", param);
            (SearchFilter::default(), Some(param))
        }
    };

    let mut query = funcionario::Entity::find().filter(funcionario::Column::Ativo.eq(true));

    if let Some(text) = &filter.text {
        let pattern = contains_pattern(text);
        let matches = |col: sea_orm::sea_query::SimpleExpr| {
            Expr::expr(Func::lower(col)).like(LikeExpr::new(pattern.clone()).escape('\\'))
        };

        query = query
            .join(JoinType::LeftJoin, funcionario::Relation::Departamento.def())
            .join(JoinType::LeftJoin, funcionario::Relation::Funcao.def())
            .join(JoinType::LeftJoin, funcionario::Relation::Unidade.def())
            .filter(
                Condition::any()
                    .add(matches(Expr::col((funcionario::Entity, funcionario::Column::Nome)).into()))
                    .add(matches(Expr::col((funcionario::Entity, funcionario::Column::Ramal)).into()))
                    .add(matches(Expr::col((funcionario::Entity, funcionario::Column::Email)).into()))
                    .add(matches(
                        Expr::col((funcionario::Entity, funcionario::Column::Whatsapp)).into(),
                    ))
                    .add(matches(Expr::col((departamento::Entity, departamento::Column::Nome)).into()))
                    .add(matches(Expr::col((funcao::Entity, funcao::Column::Nome)).into()))
                    .add(matches(Expr::col((unidade::Entity, unidade::Column::Nome)).into())),
            );
    }
    if let Some(id) = filter.departamento_id {
        query = query.filter(funcionario::Column::DepartamentoId.eq(id));
    }
    if let Some(id) = filter.funcao_id {
        query = query.filter(funcionario::Column::FuncaoId.eq(id));
    }
    if let Some(id) = filter.unidade_id {
        query = query.filter(funcionario::Column::UnidadeId.eq(id));
    }

    query = match parse_ordering(params.ordering.as_deref(), &ORDERING_FIELDS) {
        Some(Ordering {
            field: "ramal",
            descending,
        }) => query
            .order_by(funcionario::Column::Ramal, sort(descending))
            .order_by_asc(funcionario::Column::Nome),
        Some(Ordering { descending, .. }) => {
            query.order_by(funcionario::Column::Nome, sort(descending))
        }
        None => query.order_by_asc(funcionario::Column::Nome),
    };

    let rows = query.order_by_asc(funcionario::Column::Id).all(db).await?;

    let names = LookupNames::load(db, &rows).await?;
    let funcionarios = rows.into_iter().map(|m| names.apply(m)).collect();

    Ok(SearchOutcome {
        funcionarios,
        ignored_param,
    })
}

pub async fn get(db: &DatabaseConnection, id: i32) -> AppResult<FuncionarioResponse> {
    let model = find_active(db, id).await?;
    respond(db, model).await
}

pub async fn create(db: &DatabaseConnection, input: NewFuncionario) -> AppResult<FuncionarioResponse> {
    let nome = required_text(&input.nome, "Nome", MAX_NOME)?;
    let ramal = optional_text(input.ramal, "Ramal", MAX_RAMAL)?;
    let email = normalize_email(input.email, MAX_EMAIL)?;
    let whatsapp = optional_text(input.whatsapp, "WhatsApp", MAX_WHATSAPP)?;
    let teams = optional_text(input.teams, "Teams", MAX_TEAMS)?;

    let txn = db.begin().await?;
    check_references(&txn, input.departamento_id, input.funcao_id, input.unidade_id).await?;
    check_unique(&txn, email.as_deref(), ramal.as_deref(), None).await?;

    let model = funcionario::ActiveModel {
        nome: Set(nome),
        ramal: Set(ramal),
        email: Set(email),
        whatsapp: Set(whatsapp),
        teams: Set(teams),
        ativo: Set(true),
        departamento_id: Set(input.departamento_id),
        funcao_id: Set(input.funcao_id),
        unidade_id: Set(input.unidade_id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::info!("Created funcionario id={} '{}'", model.id, model.nome);
    respond(db, model).await
}

pub async fn update(
    db: &DatabaseConnection,
    id: i32,
    changes: FuncionarioChanges,
) -> AppResult<FuncionarioResponse> {
    let txn = db.begin().await?;
    let mut model = find_active(&txn, id).await?;

    if let Some(nome) = changes.nome {
        model.nome = required_text(&nome, "Nome", MAX_NOME)?;
    }
    if let Some(ramal) = changes.ramal {
        model.ramal = optional_text(ramal, "Ramal", MAX_RAMAL)?;
    }
    if let Some(email) = changes.email {
        model.email = normalize_email(email, MAX_EMAIL)?;
    }
    if let Some(whatsapp) = changes.whatsapp {
        model.whatsapp = optional_text(whatsapp, "WhatsApp", MAX_WHATSAPP)?;
    }
    if let Some(teams) = changes.teams {
        model.teams = optional_text(teams, "Teams", MAX_TEAMS)?;
    }
    if let Some(departamento_id) = changes.departamento_id {
        model.departamento_id = departamento_id;
    }
    if let Some(funcao_id) = changes.funcao_id {
        model.funcao_id = funcao_id;
    }
    if let Some(unidade_id) = changes.unidade_id {
        model.unidade_id = unidade_id;
    }

    check_references(&txn, model.departamento_id, model.funcao_id, model.unidade_id).await?;
    check_unique(&txn, model.email.as_deref(), model.ramal.as_deref(), Some(id)).await?;

    let model = funcionario::ActiveModel {
        id: Set(model.id),
        nome: Set(model.nome),
        ramal: Set(model.ramal),
        email: Set(model.email),
        whatsapp: Set(model.whatsapp),
        teams: Set(model.teams),
        ativo: Set(model.ativo),
        departamento_id: Set(model.departamento_id),
        funcao_id: Set(model.funcao_id),
        unidade_id: Set(model.unidade_id),
    }
    .update(&txn)
    .await?;
    txn.commit().await?;

    respond(db, model).await
}

/// Soft delete
pub async fn delete(db: &DatabaseConnection, id: i32) -> AppResult<()> {
    let txn = db.begin().await?;
    let model = find_active(&txn, id).await?;
    let mut active: funcionario::ActiveModel = model.into();
    active.ativo = Set(false);
    active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!("Deactivated funcionario id={}", id);
    Ok(())
}

async fn find_active<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<funcionario::Model> {
    funcionario::Entity::find_by_id(id)
        .filter(funcionario::Column::Ativo.eq(true))
        .one(db)
        .await?
        .ok_or_not_found(NOT_FOUND)
}

async fn respond(db: &DatabaseConnection, model: funcionario::Model) -> AppResult<FuncionarioResponse> {
    let names = LookupNames::load(db, std::slice::from_ref(&model)).await?;
    Ok(names.apply(model))
}

async fn check_references<C: ConnectionTrait>(
    db: &C,
    departamento_id: Option<i32>,
    funcao_id: Option<i32>,
    unidade_id: Option<i32>,
) -> AppResult<()> {
    if let Some(id) = departamento_id {
        ensure_reference::<departamento::Entity, _>(db, id).await?;
    }
    if let Some(id) = funcao_id {
        ensure_reference::<funcao::Entity, _>(db, id).await?;
    }
    if let Some(id) = unidade_id {
        ensure_reference::<unidade::Entity, _>(db, id).await?;
    }
    Ok(())
}

/// Email (ignoring case) and ramal must not be in use by another active employee
async fn check_unique<C: ConnectionTrait>(
    db: &C,
    email: Option<&str>,
    ramal: Option<&str>,
    exclude_id: Option<i32>,
) -> AppResult<()> {
    let others = || {
        let query = funcionario::Entity::find().filter(funcionario::Column::Ativo.eq(true));
        match exclude_id {
            Some(id) => query.filter(funcionario::Column::Id.ne(id)),
            None => query,
        }
    };

    if let Some(email) = email {
        let taken = others()
            .filter(
                Expr::expr(Func::lower(Expr::col(funcionario::Column::Email)))
                    .eq(email.to_lowercase()),
            )
            .one(db)
            .await?;
        if taken.is_some() {
            return Err(AppError::Validation(
                "Já existe um funcionário com este e-mail".to_string(),
            ));
        }
    }

    if let Some(ramal) = ramal {
        let taken = others()
            .filter(funcionario::Column::Ramal.eq(ramal))
            .one(db)
            .await?;
        if taken.is_some() {
            return Err(AppError::Validation(
                "Já existe um funcionário com este ramal".to_string(),
            ));
        }
    }

    Ok(())
}

/// Lookup names for a batch of employees
struct LookupNames {
    departamentos: HashMap<i32, String>,
    funcoes: HashMap<i32, String>,
    unidades: HashMap<i32, String>,
}

impl LookupNames {
    async fn load(db: &DatabaseConnection, rows: &[funcionario::Model]) -> AppResult<Self> {
        let ids = |f: fn(&funcionario::Model) -> Option<i32>| {
            let mut ids: Vec<i32> = rows.iter().filter_map(f).collect();
            ids.sort_unstable();
            ids.dedup();
            ids
        };

        Ok(Self {
            departamentos: departamento::Entity::names(db, ids(|m| m.departamento_id)).await?,
            funcoes: funcao::Entity::names(db, ids(|m| m.funcao_id)).await?,
            unidades: unidade::Entity::names(db, ids(|m| m.unidade_id)).await?,
        })
    }

    fn apply(&self, model: funcionario::Model) -> FuncionarioResponse {
        let lookup = |map: &HashMap<i32, String>, id: Option<i32>| id.and_then(|id| map.get(&id).cloned());
        let departamento = lookup(&self.departamentos, model.departamento_id);
        let funcao = lookup(&self.funcoes, model.funcao_id);
        let unidade = lookup(&self.unidades, model.unidade_id);

        FuncionarioResponse {
            departamento,
            funcao,
            unidade,
            ..FuncionarioResponse::from(model)
        }
    }
}
