#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use return_orders::{
    clock::{Clock, FixedClock},
    commands::{CreateReturnOrderCommand, NewReturnLine},
    db::{self, DbConfig},
    events::{self, ReturnOrderEvent},
    ReturnOrderService,
};
use rust_decimal_macros::dec;
use tokio::sync::mpsc;

/// Service backed by a fresh in-memory SQLite database.
///
/// The pool holds a single connection, so the database lives as long as the
/// harness and every test gets its own schema.
pub struct TestContext {
    pub service: ReturnOrderService,
    pub clock: Arc<FixedClock>,
    pub events: mpsc::Receiver<ReturnOrderEvent>,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

impl TestContext {
    pub async fn new() -> Self {
        let pool = db::establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("in-memory sqlite");
        db::run_migrations(&pool).await.expect("migrations");

        let clock = Arc::new(FixedClock::new(start_time()));
        let (sender, events) = events::channel(64);
        let service = ReturnOrderService::new(
            Arc::new(pool),
            clock.clone() as Arc<dyn Clock>,
            Some(Arc::new(sender)),
        );

        Self {
            service,
            clock,
            events,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Moves the clock forward so audit dates of later writes differ.
    pub fn tick(&self) {
        self.clock.advance(chrono::Duration::minutes(1));
    }

    pub fn drain_events(&mut self) -> Vec<ReturnOrderEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

pub fn line(sku: &str, qty: i32, return_qty: i32) -> NewReturnLine {
    NewReturnLine {
        sku: sku.to_string(),
        item_name: format!("Item {}", sku),
        qty,
        return_qty,
        price: dec!(199.05),
        alter_sku: None,
        tracking_no: None,
    }
}

pub fn create_command(order_no: &str, lines: Vec<NewReturnLine>) -> CreateReturnOrderCommand {
    CreateReturnOrderCommand {
        order_no: order_no.to_string(),
        so_no: format!("SO-{}", order_no),
        sr_no: None,
        tracking_no: Some("TRK-001".to_string()),
        customer_id: "CUST-42".to_string(),
        channel_id: 2,
        warehouse_id: 7,
        logistic: "FLASH".to_string(),
        reason: "damaged in transit".to_string(),
        so_status_id: Some(1),
        mkp_status_id: None,
        create_by: "alice".to_string(),
        lines,
    }
}
