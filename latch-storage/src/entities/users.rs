//! User accounts

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
    /// Login identifier (unique)
    #[sea_orm(unique)]
    pub email: String,
    /// Password hash (bcrypt)
    pub password: String,
    pub active: bool,
    pub is_super_user: bool,
    pub phone1: Option<String>,
    pub phone2: Option<String>,
    pub created_at: DateTimeUtc,
    /// Bumped on every profile or membership change
    pub updated_at: DateTimeUtc,
    /// Soft-delete marker
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_roles::Entity")]
    UserRoles,
    #[sea_orm(has_many = "super::user_tenants::Entity")]
    UserTenants,
}

impl Related<super::user_roles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserRoles.def()
    }
}

impl Related<super::user_tenants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserTenants.def()
    }
}

impl Related<super::roles::Entity> for Entity {
    fn to() -> RelationDef {
        super::user_roles::Relation::Role.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::user_roles::Relation::User.def().rev())
    }
}

impl Related<super::tenants::Entity> for Entity {
    fn to() -> RelationDef {
        super::user_tenants::Relation::Tenant.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::user_tenants::Relation::User.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
