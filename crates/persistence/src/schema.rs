//! ScyllaDB schema creation.

use scylla::Session;

use crate::error::PersistenceError;

pub async fn create_keyspace(session: &Session, keyspace: &str, replication_factor: u8) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {keyspace} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {replication_factor}}}"
    );

    session
        .query_unpaged(query, &[])
        .await
        .map_err(|e| PersistenceError::Schema(format!("failed to create keyspace: {e}")))?;

    Ok(())
}

pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    let sessions_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {keyspace}.conversation_sessions (
            session_id UUID,
            user_id UUID,
            collection_id UUID,
            name TEXT,
            status TEXT,
            context_window_size INT,
            max_messages INT,
            created_at TIMESTAMP,
            updated_at TIMESTAMP,
            PRIMARY KEY (session_id)
        )
        "#
    );
    session
        .query_unpaged(sessions_table, &[])
        .await
        .map_err(|e| PersistenceError::Schema(format!("failed to create conversation_sessions table: {e}")))?;

    let messages_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {keyspace}.conversation_messages (
            session_id UUID,
            message_id TIMEUUID,
            role TEXT,
            message_type TEXT,
            content TEXT,
            metadata_json TEXT,
            created_at TIMESTAMP,
            PRIMARY KEY ((session_id), message_id)
        ) WITH CLUSTERING ORDER BY (message_id DESC)
        "#
    );
    session
        .query_unpaged(messages_table, &[])
        .await
        .map_err(|e| PersistenceError::Schema(format!("failed to create conversation_messages table: {e}")))?;

    let token_warnings_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {keyspace}.token_warnings (
            user_id UUID,
            warning_id TIMEUUID,
            session_id UUID,
            kind TEXT,
            current_tokens INT,
            limit_tokens INT,
            percentage DOUBLE,
            severity TEXT,
            message TEXT,
            suggested_action TEXT,
            created_at TIMESTAMP,
            acknowledged_at TIMESTAMP,
            PRIMARY KEY ((user_id), warning_id)
        ) WITH CLUSTERING ORDER BY (warning_id DESC)
        "#
    );
    session
        .query_unpaged(token_warnings_table, &[])
        .await
        .map_err(|e| PersistenceError::Schema(format!("failed to create token_warnings table: {e}")))?;

    let pipelines_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {keyspace}.pipelines (
            user_id UUID,
            pipeline_id UUID,
            provider_id UUID,
            model TEXT,
            config_json TEXT,
            is_default BOOLEAN,
            PRIMARY KEY ((user_id), pipeline_id)
        )
        "#
    );
    session
        .query_unpaged(pipelines_table, &[])
        .await
        .map_err(|e| PersistenceError::Schema(format!("failed to create pipelines table: {e}")))?;

    let providers_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {keyspace}.providers (
            user_id UUID,
            provider_id UUID,
            kind TEXT,
            api_key TEXT,
            endpoint TEXT,
            is_default BOOLEAN,
            PRIMARY KEY ((user_id), provider_id)
        )
        "#
    );
    session
        .query_unpaged(providers_table, &[])
        .await
        .map_err(|e| PersistenceError::Schema(format!("failed to create providers table: {e}")))?;

    tracing::info!("all tables created successfully");
    Ok(())
}
