//! Wiring of the authenticator from node configuration.

use anyhow::Context;
use std::future::Future;
use std::sync::Arc;
use zeroize::Zeroizing;

use warden_auth::Authenticator;
use warden_credentials::{CachingDocumentLoader, HttpDocumentLoader};
use warden_dataverse::{DataverseClient, LcdContractQuerier, LcdLogicQuerier};

use crate::api;
use crate::config::WardenConfig;

/// A running Warden gateway.
pub struct WardenNode {
    config: WardenConfig,
    authenticator: Arc<Authenticator>,
}

impl WardenNode {
    /// Build the authenticator and resolve the triplestore behind the
    /// configured dataverse contract.
    pub async fn new(config: WardenConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let timeout = config.dataverse_timeout();

        let secret = Zeroizing::new(
            hex::decode(config.token.secret_hex.trim()).context("token.secret_hex is not hex")?,
        );

        let querier = Arc::new(LcdContractQuerier::new(&config.dataverse.lcd_endpoint, timeout)?);
        let dataverse = tokio::time::timeout(
            timeout,
            DataverseClient::connect(querier, &config.dataverse.dataverse_addr),
        )
        .await
        .context("timed out resolving the dataverse triplestore")??;
        tracing::info!(
            dataverse = %config.dataverse.dataverse_addr,
            triplestore = %dataverse.triplestore(),
            "dataverse resolved"
        );

        let logic = Arc::new(LcdLogicQuerier::new(&config.dataverse.lcd_endpoint, timeout)?);
        let loader = Arc::new(CachingDocumentLoader::new(
            HttpDocumentLoader::new(timeout)?,
            config.credentials.context_cache_size,
        )?);

        let authenticator = Authenticator::new(
            config.authenticator_config(),
            secret.to_vec(),
            loader,
            Arc::new(dataverse),
            logic,
        )?;

        Ok(Self {
            config,
            authenticator: Arc::new(authenticator),
        })
    }

    /// Serve the HTTP API until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listen_addr = self.config.api_socket_addr()?;
        tracing::info!(service = %self.authenticator.service_id(), "Warden gateway ready");
        api::start_api_server(listen_addr, self.authenticator, shutdown).await
    }
}
