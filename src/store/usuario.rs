//! Login accounts

use std::sync::OnceLock;

use chrono::Utc;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    Order, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;

use super::{
    contains_pattern, double_option, normalize_email, optional_text, parse_ordering,
    required_text, Ordering,
};
use crate::config::AdminConfig;
use crate::entity::usuario::{self, UsuarioResponse};
use crate::error::{AppError, AppResult, OptionExt};
use crate::middleware::CurrentUser;

const MAX_USERNAME: usize = 150;
const MAX_NAME: usize = 150;
const MAX_EMAIL: usize = 254;
const MIN_PASSWORD: usize = 6;

const NOT_FOUND: &str = "Usuário não encontrado";

const ORDERING_FIELDS: [&str; 3] = ["username", "first_name", "date_joined"];

/// Hash checked when the username is unknown, so that case costs the same
/// bcrypt work as a wrong password
static DUMMY_HASH: OnceLock<String> = OnceLock::new();

/// Query string of the user listing
#[derive(Debug, Default, Deserialize)]
pub struct UsuarioListParams {
    pub search: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewUsuario {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub password_confirm: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub is_admin: Option<bool>,
    pub can_edit: Option<bool>,
}

/// Partial update of an account
#[derive(Debug, Default, Deserialize)]
pub struct UsuarioChanges {
    pub username: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_admin: Option<bool>,
    pub can_edit: Option<bool>,
    pub ativo: Option<bool>,
}

impl UsuarioChanges {
    /// True when the change touches a field only admins may set
    pub fn touches_privileges(&self) -> bool {
        self.is_admin.is_some() || self.can_edit.is_some() || self.ativo.is_some()
    }

    /// True when applied to the actor's own account it would lock them out
    /// or strip their admin rights
    fn demotes(&self, actor: &CurrentUser) -> bool {
        self.ativo == Some(false) || (actor.is_admin && self.is_admin == Some(false))
    }
}

/// Active user by id
pub async fn find_active<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<Option<usuario::Model>> {
    Ok(usuario::Entity::find_by_id(id)
        .filter(usuario::Column::Ativo.eq(true))
        .one(db)
        .await?)
}

/// Check credentials. Unknown, inactive and wrong-password logins are
/// indistinguishable to the caller.
pub async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
    cost: u32,
) -> AppResult<Option<usuario::Model>> {
    let Some(user) = usuario::Entity::find()
        .filter(usuario::Column::Username.eq(username))
        .one(db)
        .await?
    else {
        let _ = bcrypt::verify(password, dummy_hash(cost)?);
        tracing::warn!("Login failed: user not found - {}", username);
        return Ok(None);
    };

    if !bcrypt::verify(password, &user.password).unwrap_or(false) {
        tracing::warn!("Login failed: wrong password - {}", username);
        return Ok(None);
    }

    if !user.ativo {
        tracing::warn!("Login failed: user inactive - {}", username);
        return Ok(None);
    }

    Ok(Some(user))
}

/// Stamp `last_login`
pub async fn record_login(db: &DatabaseConnection, user: usuario::Model) -> AppResult<usuario::Model> {
    let mut active: usuario::ActiveModel = user.into();
    active.last_login = Set(Some(Utc::now()));
    Ok(active.update(db).await?)
}

fn dummy_hash(cost: u32) -> AppResult<&'static str> {
    if let Some(hash) = DUMMY_HASH.get() {
        return Ok(hash);
    }
    let hash = bcrypt::hash("ramais-dummy-password", cost)?;
    Ok(DUMMY_HASH.get_or_init(|| hash))
}

/// Admins see every account; others only their own. `search` matches
/// username, names and e-mail; `ordering` accepts `username`, `first_name`
/// or `date_joined`, `-` prefixed for descending.
pub async fn list(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    params: &UsuarioListParams,
) -> AppResult<Vec<UsuarioResponse>> {
    let mut query = usuario::Entity::find();
    if !actor.is_admin {
        query = query.filter(usuario::Column::Id.eq(actor.id));
    }

    if let Some(text) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(text);
        let matches = |col: usuario::Column| {
            Expr::expr(Func::lower(Expr::col(col))).like(LikeExpr::new(pattern.clone()).escape('\\'))
        };
        query = query.filter(
            Condition::any()
                .add(matches(usuario::Column::Username))
                .add(matches(usuario::Column::FirstName))
                .add(matches(usuario::Column::LastName))
                .add(matches(usuario::Column::Email)),
        );
    }

    query = match parse_ordering(params.ordering.as_deref(), &ORDERING_FIELDS) {
        Some(Ordering { field, descending }) => {
            let column = match field {
                "first_name" => usuario::Column::FirstName,
                "date_joined" => usuario::Column::DateJoined,
                _ => usuario::Column::Username,
            };
            let order = if descending { Order::Desc } else { Order::Asc };
            query.order_by(column, order)
        }
        None => query,
    };

    let users = query.order_by_asc(usuario::Column::Username).all(db).await?;
    Ok(users.into_iter().map(UsuarioResponse::from).collect())
}

/// A non-admin asking for another account gets the same answer as for a
/// missing one.
pub async fn get(db: &DatabaseConnection, actor: &CurrentUser, id: i32) -> AppResult<UsuarioResponse> {
    if !actor.is_admin && actor.id != id {
        return Err(AppError::NotFound(NOT_FOUND.to_string()));
    }
    let user = usuario::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    Ok(user.into())
}

pub async fn create(db: &DatabaseConnection, input: NewUsuario, cost: u32) -> AppResult<UsuarioResponse> {
    let username = required_text(&input.username, "Nome de usuário", MAX_USERNAME)?;
    check_password(&input.password, input.password_confirm.as_deref())?;
    let email = normalize_email(input.email, MAX_EMAIL)?;
    let first_name = name_field(&input.first_name, "Nome")?;
    let last_name = name_field(&input.last_name, "Sobrenome")?;
    let hash = bcrypt::hash(&input.password, cost)?;

    let txn = db.begin().await?;
    check_username(&txn, &username, None).await?;
    let user = usuario::ActiveModel {
        username: Set(username),
        password: Set(hash),
        email: Set(email),
        first_name: Set(first_name),
        last_name: Set(last_name),
        is_admin: Set(input.is_admin.unwrap_or(false)),
        can_edit: Set(input.can_edit.unwrap_or(true)),
        ativo: Set(true),
        date_joined: Set(Utc::now()),
        last_login: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::info!("Created user id={} '{}'", user.id, user.username);
    Ok(user.into())
}

/// Apply changes. Privilege fields are checked by the caller; here the
/// actor is only kept from deactivating or demoting their own account.
pub async fn update(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    id: i32,
    changes: UsuarioChanges,
    cost: u32,
) -> AppResult<UsuarioResponse> {
    if actor.id == id && changes.demotes(actor) {
        return Err(AppError::Validation(
            "Não é possível desativar ou rebaixar o próprio usuário".to_string(),
        ));
    }

    let password_hash = match changes.password.as_deref() {
        Some(password) => {
            check_password(password, changes.password_confirm.as_deref())?;
            Some(bcrypt::hash(password, cost)?)
        }
        None => None,
    };

    let txn = db.begin().await?;
    let mut user = usuario::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_not_found(NOT_FOUND)?;

    if let Some(username) = changes.username {
        let username = required_text(&username, "Nome de usuário", MAX_USERNAME)?;
        check_username(&txn, &username, Some(id)).await?;
        user.username = username;
    }
    if let Some(hash) = password_hash {
        user.password = hash;
    }
    if let Some(email) = changes.email {
        user.email = normalize_email(email, MAX_EMAIL)?;
    }
    if let Some(first_name) = changes.first_name {
        user.first_name = name_field(&first_name, "Nome")?;
    }
    if let Some(last_name) = changes.last_name {
        user.last_name = name_field(&last_name, "Sobrenome")?;
    }
    if let Some(is_admin) = changes.is_admin {
        user.is_admin = is_admin;
    }
    if let Some(can_edit) = changes.can_edit {
        user.can_edit = can_edit;
    }
    if let Some(ativo) = changes.ativo {
        user.ativo = ativo;
    }

    let user = usuario::ActiveModel {
        id: Set(user.id),
        username: Set(user.username),
        password: Set(user.password),
        email: Set(user.email),
        first_name: Set(user.first_name),
        last_name: Set(user.last_name),
        is_admin: Set(user.is_admin),
        can_edit: Set(user.can_edit),
        ativo: Set(user.ativo),
        date_joined: Set(user.date_joined),
        last_login: Set(user.last_login),
    }
    .update(&txn)
    .await?;
    txn.commit().await?;

    Ok(user.into())
}

/// Soft delete. An admin cannot remove their own account.
pub async fn delete(db: &DatabaseConnection, actor: &CurrentUser, id: i32) -> AppResult<()> {
    if actor.id == id {
        return Err(AppError::Validation(
            "Não é possível excluir o próprio usuário".to_string(),
        ));
    }

    let txn = db.begin().await?;
    let user = find_active(&txn, id).await?.ok_or_not_found(NOT_FOUND)?;
    let mut active: usuario::ActiveModel = user.into();
    active.ativo = Set(false);
    active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!("Deactivated user id={} by {}", id, actor.username);
    Ok(())
}

/// Create the configured admin account when the user table is empty
pub async fn ensure_default_admin(
    db: &DatabaseConnection,
    admin: &AdminConfig,
    cost: u32,
) -> AppResult<()> {
    if usuario::Entity::find().count(db).await? > 0 {
        return Ok(());
    }

    let input = NewUsuario {
        username: admin.username.clone(),
        password: admin.password.clone(),
        first_name: "Administrador".to_string(),
        is_admin: Some(true),
        can_edit: Some(true),
        ..Default::default()
    };
    create(db, input, cost).await?;
    tracing::warn!(
        "No users found; created default admin '{}'. Change its password.",
        admin.username
    );
    Ok(())
}

async fn check_username<C: ConnectionTrait>(
    db: &C,
    username: &str,
    exclude_id: Option<i32>,
) -> AppResult<()> {
    let mut query = usuario::Entity::find().filter(usuario::Column::Username.eq(username));
    if let Some(id) = exclude_id {
        query = query.filter(usuario::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(AppError::Validation("Nome de usuário já existe".to_string()));
    }
    Ok(())
}

fn check_password(password: &str, confirm: Option<&str>) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD {
        return Err(AppError::Validation(format!(
            "A senha deve ter pelo menos {} caracteres",
            MIN_PASSWORD
        )));
    }
    if confirm.is_some_and(|c| c != password) {
        return Err(AppError::Validation("As senhas não coincidem".to_string()));
    }
    Ok(())
}

/// First/last names may be blank
fn name_field(value: &str, field: &str) -> AppResult<String> {
    Ok(optional_text(Some(value.to_string()), field, MAX_NAME)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_password() {
        assert!(check_password("secret1", None).is_ok());
        assert!(check_password("secret1", Some("secret1")).is_ok());
        assert!(matches!(check_password("abc", None), Err(AppError::Validation(_))));
        assert!(matches!(
            check_password("secret1", Some("secret2")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_touches_privileges() {
        let plain: UsuarioChanges = serde_json::from_str(r#"{"first_name": "Ana"}"#).unwrap();
        assert!(!plain.touches_privileges());

        let raise: UsuarioChanges = serde_json::from_str(r#"{"is_admin": true}"#).unwrap();
        assert!(raise.touches_privileges());

        let reactivate: UsuarioChanges = serde_json::from_str(r#"{"ativo": true}"#).unwrap();
        assert!(reactivate.touches_privileges());
    }

    #[test]
    fn test_self_demotion_detected() {
        let admin = CurrentUser {
            id: 1,
            username: "admin".to_string(),
            is_admin: true,
            can_edit: true,
        };
        let off: UsuarioChanges = serde_json::from_str(r#"{"ativo": false}"#).unwrap();
        assert!(off.demotes(&admin));
        let demote: UsuarioChanges = serde_json::from_str(r#"{"is_admin": false}"#).unwrap();
        assert!(demote.demotes(&admin));
        let keep: UsuarioChanges =
            serde_json::from_str(r#"{"is_admin": true, "ativo": true}"#).unwrap();
        assert!(!keep.demotes(&admin));
    }

    #[test]
    fn test_dummy_hash_is_reused() {
        let first = dummy_hash(4).unwrap();
        let second = dummy_hash(4).unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(!bcrypt::verify("admin123", first).unwrap());
    }

    #[test]
    fn test_name_field() {
        assert_eq!(name_field("  ", "Nome").unwrap(), "");
        assert_eq!(name_field(" Ana ", "Nome").unwrap(), "Ana");
    }
}
