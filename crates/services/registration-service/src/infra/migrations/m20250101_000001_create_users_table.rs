//! Migration: Create users table with farmer and herder profile columns.

use sea_orm_migration::prelude::*;

use domain::{MAX_BIO_LENGTH, MAX_NAME_LENGTH};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Users::FirstName)
                            .string_len(MAX_NAME_LENGTH as u32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::LastName)
                            .string_len(MAX_NAME_LENGTH as u32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::PhoneNumber).string().null())
                    .col(ColumnDef::new(Users::Role).string_len(16).not_null())
                    .col(ColumnDef::new(Users::Location).string().null())
                    .col(
                        ColumnDef::new(Users::Bio)
                            .string_len(MAX_BIO_LENGTH as u32)
                            .null(),
                    )
                    .col(ColumnDef::new(Users::Enabled).boolean().not_null().default(true))
                    .col(ColumnDef::new(Users::Verified).boolean().not_null().default(false))
                    // Farmer profile
                    .col(ColumnDef::new(Users::FarmName).string().null())
                    .col(ColumnDef::new(Users::FarmSizeHectares).double().null())
                    .col(ColumnDef::new(Users::PrimaryCrops).string().null())
                    .col(ColumnDef::new(Users::FarmingExperienceYears).integer().null())
                    // Herder profile
                    .col(ColumnDef::new(Users::HerdType).string().null())
                    .col(ColumnDef::new(Users::HerdSize).integer().null())
                    .col(ColumnDef::new(Users::GrazingArea).string().null())
                    .col(ColumnDef::new(Users::HerdingExperienceYears).integer().null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_phone_number")
                    .table(Users::Table)
                    .col(Users::PhoneNumber)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    PasswordHash,
    PhoneNumber,
    Role,
    Location,
    Bio,
    Enabled,
    Verified,
    FarmName,
    FarmSizeHectares,
    PrimaryCrops,
    FarmingExperienceYears,
    HerdType,
    HerdSize,
    GrazingArea,
    HerdingExperienceYears,
    CreatedAt,
    UpdatedAt,
}
