use std::{collections::HashMap, path::PathBuf, sync::Arc, time::Duration};

use {
    axum::{
        Router,
        routing::{get, post},
    },
    tower_http::cors::{Any, CorsLayer},
    tracing::{info, warn},
};

use {
    convoy_channels::{
        ChannelConnector, ConnectorRegistry, MessageEventSink, Platform,
    },
    convoy_common::time::now_ts,
    convoy_config::ConvoyConfig,
    convoy_pipeline::{
        Ingestor, KeywordClassifier, OutboundSender,
        classify::{Classifier, DEFAULT_URGENCY_TERMS},
    },
    convoy_storage::{
        ContactStore, ConversationStore, MessageStore, SqliteContactStore,
        SqliteConversationStore, SqliteMessageStore,
    },
    convoy_telegram::TelegramConnector,
    convoy_whatsapp::WhatsAppConnector,
};

use crate::{
    api, broadcast::{ClientRegistry, LiveEventSink},
    state::{AccountAuth, AccountBinding, GatewayState},
    webhooks, ws,
};

/// Wire stores, connectors, and the pipeline from config. Everything is
/// constructed once here and injected; route handlers see only
/// [`GatewayState`].
pub fn build_state(config: &ConvoyConfig, pool: sqlx::SqlitePool) -> Arc<GatewayState> {
    let contacts: Arc<dyn ContactStore> = Arc::new(SqliteContactStore::new(pool.clone()));
    let conversations: Arc<dyn ConversationStore> =
        Arc::new(SqliteConversationStore::new(pool.clone()));
    let messages: Arc<dyn MessageStore> = Arc::new(SqliteMessageStore::new(pool));

    let clients = Arc::new(ClientRegistry::new());
    let sink: Arc<dyn MessageEventSink> = Arc::new(LiveEventSink::new(Arc::clone(&clients)));

    let urgency_terms = if config.classifier.urgency_terms.is_empty() {
        DEFAULT_URGENCY_TERMS.iter().map(|t| (*t).to_string()).collect()
    } else {
        config.classifier.urgency_terms.clone()
    };
    let classifier: Arc<dyn Classifier> = Arc::new(KeywordClassifier::new(
        urgency_terms,
        config.classifier.score_step,
    ));

    let ingestor = Arc::new(Ingestor::new(
        Arc::clone(&contacts),
        Arc::clone(&conversations),
        Arc::clone(&messages),
        classifier,
        Arc::clone(&sink),
    ));

    let mut accounts = HashMap::new();
    let mut tenant_registries: HashMap<String, ConnectorRegistry> = HashMap::new();

    for account in &config.accounts.telegram {
        let mut connector = TelegramConnector::new(account.bot_token.clone());
        if let Some(api_base) = &account.api_base {
            connector = connector.with_api_base(api_base.clone());
        }
        let connector: Arc<dyn ChannelConnector> = Arc::new(connector);
        accounts.insert(
            (Platform::Telegram, account.id.clone()),
            AccountBinding {
                tenant_id: account.tenant_id.clone(),
                platform: Platform::Telegram,
                connector: Arc::clone(&connector),
                auth: AccountAuth::Telegram {
                    secret_token: account.secret_token.clone(),
                },
            },
        );
        tenant_registries
            .entry(account.tenant_id.clone())
            .or_default()
            .register(connector);
    }

    for account in &config.accounts.whatsapp {
        let mut connector =
            WhatsAppConnector::new(account.access_token.clone(), account.phone_number_id.clone());
        if let Some(api_base) = &account.api_base {
            connector = connector.with_api_base(api_base.clone());
        }
        let connector: Arc<dyn ChannelConnector> = Arc::new(connector);
        accounts.insert(
            (Platform::Whatsapp, account.id.clone()),
            AccountBinding {
                tenant_id: account.tenant_id.clone(),
                platform: Platform::Whatsapp,
                connector: Arc::clone(&connector),
                auth: AccountAuth::Whatsapp {
                    verify_token: account.verify_token.clone(),
                    app_secret: account.app_secret.clone(),
                },
            },
        );
        tenant_registries
            .entry(account.tenant_id.clone())
            .or_default()
            .register(connector);
    }

    let senders = tenant_registries
        .into_iter()
        .map(|(tenant_id, registry)| {
            let sender = Arc::new(OutboundSender::new(
                Arc::new(registry),
                Arc::clone(&conversations),
                Arc::clone(&messages),
                Arc::clone(&sink),
            ));
            (tenant_id, sender)
        })
        .collect();

    Arc::new(GatewayState {
        accounts,
        contacts,
        conversations,
        messages,
        ingestor,
        senders,
        clients,
    })
}

/// Build the gateway router (shared between production startup and tests).
pub fn build_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws::ws_upgrade_handler))
        .route(
            "/webhooks/telegram/{account_id}",
            post(webhooks::telegram_webhook),
        )
        .route(
            "/webhooks/whatsapp/{account_id}",
            get(webhooks::whatsapp_verify).post(webhooks::whatsapp_webhook),
        )
        .route("/api/conversations", get(api::list_conversations))
        .route(
            "/api/conversations/{conversation_id}/messages",
            get(api::list_messages).post(api::send_message),
        )
        .route(
            "/api/conversations/{conversation_id}/close",
            post(api::close_conversation),
        )
        .route("/api/contacts", get(api::list_contacts))
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "ok": true }))
}

/// Open the database, run migrations, and serve until shutdown.
pub async fn run(config: ConvoyConfig, data_dir_override: Option<PathBuf>) -> anyhow::Result<()> {
    let data_dir = data_dir_override.unwrap_or_else(convoy_config::data_dir);
    std::fs::create_dir_all(&data_dir).ok();

    let db_path = config
        .database
        .path
        .clone()
        .unwrap_or_else(|| data_dir.join("convoy.db"));
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
    let pool = sqlx::SqlitePool::connect(&db_url).await?;
    convoy_storage::run_migrations(&pool).await?;

    let state = build_state(&config, pool);

    if config.ingest.idle_timeout_minutes > 0 {
        tokio::spawn(idle_sweep_loop(
            Arc::clone(&state.conversations),
            config.ingest.sweep_interval_secs.max(1),
            config.ingest.idle_timeout_minutes,
        ));
    }

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, db = %db_path.display(), "convoy gateway listening");
    axum::serve(listener, build_app(state)).await?;
    Ok(())
}

/// Periodically close conversations with no traffic inside the idle window.
/// A later inbound event starts a fresh active conversation; the closed row
/// is never reopened.
async fn idle_sweep_loop(
    conversations: Arc<dyn ConversationStore>,
    interval_secs: u64,
    idle_timeout_minutes: u64,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;
        let cutoff = now_ts() - (idle_timeout_minutes * 60) as i64;
        match conversations.close_idle(cutoff).await {
            Ok(0) => {},
            Ok(closed) => info!(closed, "idle sweep closed conversations"),
            Err(e) => warn!(error = %e, "idle sweep failed"),
        }
    }
}
