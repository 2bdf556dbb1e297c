//! Purpose: Name the remote procedures and classify them as queries or mutations.
//! Exports: `Procedure`, `ProcedureKind`.
//! Role: Single source for wire names used by the server router and the remote client.
//! Invariants: Wire names are stable (`createContact`, `getContacts`, ...).
//! Invariants: Queries may be issued with GET; mutations require POST.

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Procedure {
    Healthcheck,
    CreateContact,
    GetContacts,
    GetContact,
    UpdateContact,
    DeleteContact,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcedureKind {
    Query,
    Mutation,
}

impl Procedure {
    pub const ALL: [Procedure; 6] = [
        Procedure::Healthcheck,
        Procedure::CreateContact,
        Procedure::GetContacts,
        Procedure::GetContact,
        Procedure::UpdateContact,
        Procedure::DeleteContact,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Procedure::Healthcheck => "healthcheck",
            Procedure::CreateContact => "createContact",
            Procedure::GetContacts => "getContacts",
            Procedure::GetContact => "getContact",
            Procedure::UpdateContact => "updateContact",
            Procedure::DeleteContact => "deleteContact",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Procedure::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn kind(self) -> ProcedureKind {
        match self {
            Procedure::Healthcheck | Procedure::GetContacts | Procedure::GetContact => {
                ProcedureKind::Query
            }
            Procedure::CreateContact | Procedure::UpdateContact | Procedure::DeleteContact => {
                ProcedureKind::Mutation
            }
        }
    }
}
