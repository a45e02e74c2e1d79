//! Owns `Config`, `Context`, and the OIC/KV/checkpoint handles, the way
//! `ordhook-core::service::mod::Service` owns the node-facing handles for
//! its own indexing service.

use std::sync::Arc;

use config::Config;

use crate::core::resolver::PubkeyResolver;
use crate::core::{NotificationRouter, OrdinalIndexCore};
use crate::db::{Checkpoint, OrdinalKv};
use crate::try_info;
use crate::utils::Context;

pub struct Service {
    pub config: Config,
    pub ctx: Context,
    pub core: Arc<OrdinalIndexCore>,
}

impl Service {
    /// Opens the KV backend and checkpoint file at the paths `config`
    /// names and wires them into a fresh `OrdinalIndexCore`. Mirrors
    /// `ordhook-core::service::mod::Service::new`'s "construct, don't
    /// lazily open" approach.
    pub fn new(
        config: Config,
        resolver: Arc<dyn PubkeyResolver>,
        ctx: Context,
    ) -> Result<(Service, crossbeam_channel::Receiver<crate::core::types::Notification>), String> {
        try_info!(ctx, "opening ordinal index KV at {:?}", config.expected_kv_path());
        let kv = Arc::new(
            OrdinalKv::new(config.expected_kv_path(), config.kv.map_size_mib)
                .map_err(|e| e.to_string())?,
        );
        let checkpoint =
            Checkpoint::open(config.expected_checkpoint_path()).map_err(|e| e.to_string())?;
        let (router, receiver) = NotificationRouter::channel();
        let core = Arc::new(OrdinalIndexCore::new(kv, checkpoint, resolver, router, ctx.clone()));
        Ok((
            Service {
                config,
                ctx,
                core,
            },
            receiver,
        ))
    }
}
