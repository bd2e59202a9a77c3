/// Audit actions recorded for account lifecycle changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    RegisterUser,
    CreateUser,
    DeleteUser,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::RegisterUser => "REGISTER_USER",
            AuditAction::CreateUser => "CREATE_USER",
            AuditAction::DeleteUser => "DELETE_USER",
        }
    }
}

/// Emits an audit event on the `audit` target. Collectors route this target
/// separately from request logs; nothing here blocks the response.
pub fn record(action: AuditAction, details: impl AsRef<str>) {
    tracing::info!(
        target: "audit",
        action = action.as_str(),
        details = details.as_ref(),
        "audit event"
    );
}
