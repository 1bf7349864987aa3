use sea_orm_migration::{prelude::*, sea_orm::DatabaseBackend};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // No foreign key: copies outlive a deleted original.
        manager
            .alter_table(
                Table::alter()
                    .table(Todos::Table)
                    .add_column(fk_id_nullable_col(manager, Todos::OriginalTodoId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_todos_original_todo_id")
                    .table(Todos::Table)
                    .col(Todos::OriginalTodoId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .if_exists()
                    .name("idx_todos_original_todo_id")
                    .table(Todos::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(Todos::Table)
                    .drop_column(Todos::OriginalTodoId)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}

fn fk_id_nullable_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.to_owned()
}

#[derive(Iden)]
enum Todos {
    Table,
    OriginalTodoId,
}
