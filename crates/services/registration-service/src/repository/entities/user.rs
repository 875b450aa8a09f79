//! User database entity for SeaORM.

use sea_orm::entity::prelude::*;
use sea_orm::Set;

use domain::{
    DomainError, FarmerDetails, HerderDetails, RegistrationProfile, RoleAttributes, User, UserRole,
};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub role: String,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub enabled: bool,
    pub verified: bool,
    pub farm_name: Option<String>,
    pub farm_size_hectares: Option<f64>,
    pub primary_crops: Option<String>,
    pub farming_experience_years: Option<i32>,
    pub herd_type: Option<String>,
    pub herd_size: Option<i32>,
    pub grazing_area: Option<String>,
    pub herding_experience_years: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    /// Insertable row for a confirmed registration.
    pub fn from_profile(id: Uuid, profile: RegistrationProfile, now: DateTimeUtc) -> Self {
        let (farmer, herder) = match profile.attributes {
            RoleAttributes::Farmer(details) => (details, HerderDetails::default()),
            RoleAttributes::Herder(details) => (FarmerDetails::default(), details),
            RoleAttributes::Admin => (FarmerDetails::default(), HerderDetails::default()),
        };

        ActiveModel {
            id: Set(id),
            first_name: Set(profile.first_name),
            last_name: Set(profile.last_name),
            email: Set(profile.email),
            password_hash: Set(profile.password_hash),
            phone_number: Set(profile.phone_number),
            role: Set(profile.role.as_str().to_string()),
            location: Set(profile.location),
            bio: Set(profile.bio),
            enabled: Set(true),
            verified: Set(profile.verified),
            farm_name: Set(farmer.farm_name),
            farm_size_hectares: Set(farmer.farm_size_hectares),
            primary_crops: Set(farmer.primary_crops),
            farming_experience_years: Set(farmer.farming_experience_years),
            herd_type: Set(herder.herd_type),
            herd_size: Set(herder.herd_size),
            grazing_area: Set(herder.grazing_area),
            herding_experience_years: Set(herder.herding_experience_years),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

/// Convert database model to domain entity
impl TryFrom<Model> for User {
    type Error = DomainError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let role: UserRole = model.role.parse()?;
        let attributes = match role {
            UserRole::Farmer => RoleAttributes::Farmer(FarmerDetails {
                farm_name: model.farm_name,
                farm_size_hectares: model.farm_size_hectares,
                primary_crops: model.primary_crops,
                farming_experience_years: model.farming_experience_years,
            }),
            UserRole::Herder => RoleAttributes::Herder(HerderDetails {
                herd_type: model.herd_type,
                herd_size: model.herd_size,
                grazing_area: model.grazing_area,
                herding_experience_years: model.herding_experience_years,
            }),
            UserRole::Admin => RoleAttributes::Admin,
        };

        Ok(User {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            password_hash: model.password_hash,
            phone_number: model.phone_number,
            role,
            attributes,
            location: model.location,
            bio: model.bio,
            enabled: model.enabled,
            verified: model.verified,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
