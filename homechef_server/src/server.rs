use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};
use homechef_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    OrderFlowApi,
    ReviewApi,
    ShiftApi,
    SqliteDatabase,
};
use log::*;
use tokio::sync::watch;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    routes::{
        accept_order,
        active_shift,
        call_delivery,
        close_shift,
        create_order,
        deliver,
        health,
        open_shift,
        order_by_id,
        orders_for_shift,
        orders_for_user,
        pick_up,
        rating,
        reject_order,
        submit_review,
    },
    workers::start_pipeline_workers,
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = if config.database_url.is_empty() {
        SqliteDatabase::new(25).await
    } else {
        SqliteDatabase::new_with_url(&config.database_url, 25).await
    }
    .map_err(|e| ServerError::InitializeError(e.to_string()))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handles = start_pipeline_workers(&config, db.clone(), shutdown_rx)?;

    // Delivery notifications ride the in-process hook system. Richer channels (push, SMS) subscribe the same way.
    let mut hooks = EventHooks::default();
    hooks.on_order_delivered(|event| {
        Box::pin(async move {
            info!(
                "📣️ Order {} delivered to user #{}; notifying subscribers",
                event.order.id, event.order.user_id
            );
        })
    });
    hooks.on_order_rejected(|event| {
        Box::pin(async move {
            info!("📣️ Order {} was rejected; notifying user #{}", event.order.id, event.order.user_id);
        })
    });
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let srv = create_server_instance(config, db, producers)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));

    // The HTTP server is down; let the pipeline workers finish their in-flight work and exit.
    let _ = shutdown_tx.send(true);
    for handle in worker_handles {
        if let Err(e) = handle.await {
            warn!("🕰️ A pipeline worker ended abnormally: {e}");
        }
    }
    result
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let order_api = OrderFlowApi::new(db.clone(), producers.clone());
        let review_api = ReviewApi::new(db.clone());
        let shift_api = ShiftApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("hc::access_log"))
            .app_data(web::Data::new(order_api))
            .app_data(web::Data::new(review_api))
            .app_data(web::Data::new(shift_api))
            .app_data(web::Data::new(db.clone()))
            .service(health)
            .service(create_order)
            .service(accept_order)
            .service(call_delivery)
            .service(pick_up)
            .service(deliver)
            .service(reject_order)
            .service(order_by_id)
            .service(orders_for_user)
            .service(orders_for_shift)
            .service(submit_review)
            .service(open_shift)
            .service(close_shift)
            .service(active_shift)
            .service(rating)
    })
    .bind((host.as_str(), port))?
    .run();
    info!("💻 Server listening on {host}:{port}");
    Ok(srv)
}
