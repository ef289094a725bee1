//! Authorization rules
//!
//! Pure decisions over an explicit actor. Handlers call [`authorize`] before
//! touching the store; nothing here reads the session or the database.

use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;

/// Record types that can be written through the API
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Usuario,
    Departamento,
    Funcao,
    Unidade,
    Funcionario,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl CurrentUser {
    /// Admins and users with the edit flag may change directory data
    pub fn can_write_directory(&self) -> bool {
        self.is_admin || self.can_edit
    }
}

/// Decide whether `actor` may perform `action` on `resource`.
///
/// `target_user_id` is only consulted for [`Resource::Usuario`] updates, where
/// a non-admin may touch their own record and nobody else's.
pub fn authorize(
    actor: &CurrentUser,
    resource: Resource,
    action: Action,
    target_user_id: Option<i32>,
) -> AppResult<()> {
    let allowed = match resource {
        Resource::Usuario => match action {
            Action::Create | Action::Delete => actor.is_admin,
            Action::Update => actor.is_admin || target_user_id == Some(actor.id),
        },
        Resource::Departamento
        | Resource::Funcao
        | Resource::Unidade
        | Resource::Funcionario => actor.can_write_directory(),
    };

    if allowed {
        Ok(())
    } else {
        tracing::warn!(
            "Permission denied: user={} resource={:?} action={:?} target={:?}",
            actor.username,
            resource,
            action,
            target_user_id
        );
        Err(AppError::Forbidden(denied_message(resource, action).to_string()))
    }
}

/// Privilege fields (`is_admin`, `can_edit`, `ativo`) are admin-only even on
/// the actor's own record.
pub fn authorize_privilege_change(actor: &CurrentUser) -> AppResult<()> {
    if actor.is_admin {
        Ok(())
    } else {
        tracing::warn!("Privilege change denied: user={}", actor.username);
        Err(AppError::Forbidden(
            "Apenas administradores podem alterar permissões".to_string(),
        ))
    }
}

fn denied_message(resource: Resource, action: Action) -> &'static str {
    match (resource, action) {
        (Resource::Usuario, Action::Create) => "Apenas administradores podem criar usuários",
        (Resource::Usuario, Action::Delete) => "Apenas administradores podem excluir usuários",
        (Resource::Usuario, Action::Update) => "Você só pode editar seus próprios dados",
        _ => "Acesso negado",
    }
}
