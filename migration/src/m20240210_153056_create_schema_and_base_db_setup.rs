use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create the service's schema
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS social_connect;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("SET search_path TO social_connect, public;")
            .await?;

        // Grant the base DB user that executes all queries access to the schema
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DO $$ BEGIN
                    GRANT ALL PRIVILEGES ON DATABASE social_connect TO social;
                    GRANT ALL ON SCHEMA social_connect TO social;

                    ALTER DEFAULT PRIVILEGES IN SCHEMA social_connect GRANT ALL ON TABLES TO social;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA social_connect GRANT ALL ON SEQUENCES TO social;
                END $$;
            "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DO $$ BEGIN
                    ALTER DEFAULT PRIVILEGES IN SCHEMA social_connect REVOKE ALL ON SEQUENCES FROM social;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA social_connect REVOKE ALL ON TABLES FROM social;
                    REVOKE ALL ON SCHEMA social_connect FROM social;
                    REVOKE ALL PRIVILEGES ON DATABASE social_connect FROM social;
                END $$;
            "#,
            )
            .await?;

        // Drop the schema (CASCADE will remove all objects in it)
        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS social_connect CASCADE;")
            .await?;

        Ok(())
    }
}
