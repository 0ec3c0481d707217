//! Return Orders Library
//!
//! Transactional core for retail return orders: partial updates merged into
//! a header-plus-lines aggregate, the draft/confirm/cancel workflow, and
//! append-only cancel records linked to their order exactly once.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod clock;
pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod migrator;
pub mod models;
pub mod repositories;
pub mod services;

pub use clock::{Clock, FixedClock, SystemClock};
pub use commands::{
    CancelReturnOrderCommand, Command, ConfirmReturnOrderCommand, CreateReturnOrderCommand,
    NewReturnLine, UpdateReturnOrderCommand,
};
pub use db::TransactionCoordinator;
pub use errors::{ErrorKind, ServiceError};
pub use models::{
    diff::{LinePatch, OrderPatch},
    ReturnOrderAggregate, StatusConf, StatusReturn,
};
pub use repositories::ReturnOrderRepository;
pub use services::{CancelReceipt, CancellationIssuer, ReturnOrderService};

use std::sync::Arc;

/// Wires the service from configuration: connects, optionally migrates, and
/// opens the event channel. The receiver is returned for the caller to drain.
pub async fn bootstrap(
    cfg: &config::AppConfig,
) -> Result<
    (
        ReturnOrderService,
        tokio::sync::mpsc::Receiver<events::ReturnOrderEvent>,
    ),
    ServiceError,
> {
    let pool = db::establish_connection_from_app_config(cfg).await?;
    if cfg.auto_migrate {
        db::run_migrations(&pool).await?;
    }

    let (sender, receiver) = events::channel(cfg.event_channel_capacity);
    let service = ReturnOrderService::new(
        Arc::new(pool),
        Arc::new(SystemClock),
        Some(Arc::new(sender)),
    );
    Ok((service, receiver))
}
