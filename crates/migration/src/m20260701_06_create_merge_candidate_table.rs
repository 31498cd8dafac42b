use sea_orm_migration::{
  prelude::*,
  schema::{boolean, float, json_binary, string, timestamp_with_time_zone, uuid},
};

use crate::m20260701_01_create_entity_table::Entity as EntityTable;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(MergeCandidate::Table)
          .if_not_exists()
          .col(uuid(MergeCandidate::Id).primary_key())
          .col(uuid(MergeCandidate::EntityAId).not_null())
          .col(uuid(MergeCandidate::EntityBId).not_null())
          .col(float(MergeCandidate::Confidence).not_null())
          .col(boolean(MergeCandidate::AutoEligible).not_null())
          .col(string(MergeCandidate::Reason).not_null())
          .col(json_binary(MergeCandidate::MatchingFacts).not_null())
          .col(json_binary(MergeCandidate::Context).not_null())
          .col(string(MergeCandidate::Status).not_null().default("pending"))
          .col(
            timestamp_with_time_zone(MergeCandidate::CreatedAt)
              .not_null()
              .default(Expr::current_timestamp()),
          )
          .col(
            timestamp_with_time_zone(MergeCandidate::UpdatedAt)
              .not_null()
              .default(Expr::current_timestamp()),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_merge_candidate_entity_a")
              .from(MergeCandidate::Table, MergeCandidate::EntityAId)
              .to(EntityTable::Table, EntityTable::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_merge_candidate_entity_b")
              .from(MergeCandidate::Table, MergeCandidate::EntityBId)
              .to(EntityTable::Table, EntityTable::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    // entity_a_id < entity_b_id is enforced in application code; this index
    // is what makes the pair lookup (and the upsert-on-conflict) O(1).
    manager
      .create_index(
        Index::create()
          .if_not_exists()
          .name("idx_merge_candidate_pair")
          .table(MergeCandidate::Table)
          .col(MergeCandidate::EntityAId)
          .col(MergeCandidate::EntityBId)
          .unique()
          .to_owned(),
      )
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(MergeCandidate::Table).to_owned())
      .await
  }
}

#[derive(Iden)]
pub enum MergeCandidate {
  Table,
  Id,
  EntityAId,
  EntityBId,
  Confidence,
  AutoEligible,
  Reason,
  MatchingFacts,
  Context,
  Status,
  CreatedAt,
  UpdatedAt,
}
