use std::sync::Arc;

use anyhow::{Error, Result, anyhow};
use notification_dispatch::{
    api::{AppState, bind_listener, run_api_server},
    clients::{
        email::{SmtpClient, SmtpSettings},
        rbmq::RabbitMqClient,
        sender::{ChannelSender, ConnectionProbe},
        sms::SimulatedSmsGateway,
        whatsapp::{WhatsAppClient, WhatsAppSettings},
    },
    config::Config,
    dispatcher::NotificationDispatcher,
    emitter::AckEmitter,
    models::channel::Channel,
    worker::ConsumerLoop,
};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load()?;
    let channel = config.service_channel;

    info!(channel = %channel, service = %config.service_name(), "Configuration validated");

    // A taken port aborts startup before anything is consumed.
    let listener = bind_listener(config.server_port()).await?;

    let (sender, probe) = build_sender(&config)?;
    let dispatcher = NotificationDispatcher::new(sender, config.processing_timeout());

    let rabbitmq = Arc::new(RabbitMqClient::connect(&config).await?);
    let consumer_tag = format!("{}-{}", config.consumer_group(), Uuid::new_v4());
    let consumer = rabbitmq.create_consumer(&consumer_tag).await?;

    let emitter = AckEmitter::new(rabbitmq.clone(), config.ack_publish_timeout());
    let consumer_loop = ConsumerLoop::new(consumer, dispatcher.clone(), emitter);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut worker = tokio::spawn(consumer_loop.run(shutdown_rx.clone()));

    let state = AppState {
        service_name: config.service_name(),
        dispatcher,
        probe,
        webhook_verify_token: config.whatsapp_webhook_verify_token.clone(),
    };

    let mut server_shutdown = shutdown_rx;
    let mut server = tokio::spawn(run_api_server(listener, state, async move {
        let _ = server_shutdown.wait_for(|stop| *stop).await;
    }));

    let mut server_result = None;

    let loop_result = tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown signal received, finishing in-flight message");
            let _ = shutdown_tx.send(true);
            (&mut worker).await
        }
        result = &mut worker => {
            let _ = shutdown_tx.send(true);
            result
        }
        result = &mut server => {
            error!("HTTP server stopped unexpectedly, shutting down");
            let _ = shutdown_tx.send(true);
            server_result = Some(result);
            (&mut worker).await
        }
    };

    let server_result = match server_result {
        Some(result) => result,
        None => server.await,
    };

    server_result.map_err(|e| anyhow!("HTTP server task failed: {}", e))??;

    match loop_result.map_err(|e| anyhow!("Consumer loop task failed: {}", e))? {
        Ok(stats) => {
            info!(stats = ?stats, "Service stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Consumer loop ended with an error");
            Err(e)
        }
    }
}

fn build_sender(
    config: &Config,
) -> Result<(Arc<dyn ChannelSender>, Option<Arc<dyn ConnectionProbe>>), Error> {
    match config.service_channel {
        Channel::WhatsApp => {
            let client: Arc<dyn ChannelSender> =
                Arc::new(WhatsAppClient::new(WhatsAppSettings::from_config(config)?)?);
            Ok((client, None))
        }
        Channel::Email => {
            let client = Arc::new(SmtpClient::new(SmtpSettings::from_config(config)?)?);
            let sender: Arc<dyn ChannelSender> = client.clone();
            let probe: Arc<dyn ConnectionProbe> = client;
            Ok((sender, Some(probe)))
        }
        Channel::Sms => {
            let gateway: Arc<dyn ChannelSender> =
                Arc::new(SimulatedSmsGateway::new(config.sms_simulated_latency()));
            Ok((gateway, None))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
