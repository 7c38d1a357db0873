//! Orchestrator-level tests with a scripted executor and hand-built
//! WebSocket messages.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use alloy::primitives::Address;
use async_trait::async_trait;
use hyperliquid_rust_sdk::{
    BaseUrl, BasicOrder, ClientCancelRequest, ClientModifyRequest, ClientOrderRequest,
    ExchangeResponseStatus, InfoClient, Message, OrderUpdate, OrderUpdates, TradeInfo, UserFills,
    UserFillsData,
};
use serde_json::json;

use crate::errors::Result;

use super::super::config::MakerConfig;
use super::super::emitter::{BatchEmitter, BulkExecutor};
use super::super::grid::{PricingGrid, DEFAULT_TICK};
use super::super::inventory::Inventory;
use super::super::order_state::{OrderState, Side};
use super::super::rate_limit::RateLimitBudget;
use super::MarketMaker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Cancel(usize),
    Modify(usize),
    Place(usize),
}

struct MockExecutor {
    responses: Mutex<VecDeque<ExchangeResponseStatus>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl MockExecutor {
    fn script(responses: Vec<ExchangeResponseStatus>) -> (Self, Arc<Mutex<Vec<Call>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                responses: Mutex::new(responses.into()),
                calls: calls.clone(),
            },
            calls,
        )
    }

    fn next_response(&self) -> ExchangeResponseStatus {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ok_response(vec![]))
    }
}

#[async_trait]
impl BulkExecutor for MockExecutor {
    async fn bulk_place(&self, orders: Vec<ClientOrderRequest>) -> Result<ExchangeResponseStatus> {
        self.calls.lock().unwrap().push(Call::Place(orders.len()));
        Ok(self.next_response())
    }

    async fn bulk_modify(
        &self,
        modifies: Vec<ClientModifyRequest>,
    ) -> Result<ExchangeResponseStatus> {
        self.calls.lock().unwrap().push(Call::Modify(modifies.len()));
        Ok(self.next_response())
    }

    async fn bulk_cancel(
        &self,
        cancels: Vec<ClientCancelRequest>,
    ) -> Result<ExchangeResponseStatus> {
        self.calls.lock().unwrap().push(Call::Cancel(cancels.len()));
        Ok(self.next_response())
    }
}

fn ok_response(statuses: Vec<serde_json::Value>) -> ExchangeResponseStatus {
    serde_json::from_value(json!({
        "status": "ok",
        "response": {"type": "order", "data": {"statuses": statuses}},
    }))
    .unwrap()
}

fn resting(oid: u64) -> serde_json::Value {
    json!({"resting": {"oid": oid}})
}

const COIN: &str = "TEST/USDC";

/// Grid {1.000, 1.003, 1.006, 1.009, 1.012}.
fn snap(px: f64) -> f64 {
    (px * 1000.0).round() / 1000.0
}

async fn test_maker(
    responses: Vec<ExchangeResponseStatus>,
) -> (MarketMaker<MockExecutor>, Arc<Mutex<Vec<Call>>>) {
    let mut config = MakerConfig::default();
    config.market.coin = COIN.to_string();
    config.strategy.start_px = 1.0;
    config.strategy.n_orders = 5;
    config.strategy.order_sz = 10.0;
    config.strategy.n_seeded_levels = 0;
    config.allocation.allocated_token = 1000.0;
    config.allocation.allocated_usdc = 1000.0;

    let (executor, calls) = MockExecutor::script(responses);
    let maker = MarketMaker {
        config,
        info_client: InfoClient::new(None, Some(BaseUrl::Testnet)).await.unwrap(),
        user_address: Address::ZERO,
        coin: COIN.to_string(),
        base_token: "TEST".to_string(),
        asset_id: 10_001,
        grid: PricingGrid::with_round_fn(1.0, 5, DEFAULT_TICK, snap).unwrap(),
        inventory: Inventory::new(1000.0, 1000.0, 0.0, 0.0),
        order_state: OrderState::new(),
        rate_limit: RateLimitBudget::new(),
        emitter: BatchEmitter::new(COIN, executor),
        boundary_level: 2,
        tick_count: 0,
        last_ws_event: Instant::now(),
    };
    (maker, calls)
}

fn order_update(oid: u64, coin: &str, side: &str, status: &str, px: &str, sz: &str) -> Message {
    Message::OrderUpdates(OrderUpdates {
        data: vec![OrderUpdate {
            order: BasicOrder {
                coin: coin.to_string(),
                side: side.to_string(),
                limit_px: px.to_string(),
                sz: sz.to_string(),
                oid,
                timestamp: 0,
                orig_sz: sz.to_string(),
                cloid: None,
            },
            status: status.to_string(),
            status_timestamp: 0,
        }],
    })
}

fn fill_message(tid: u64, oid: u64, px: &str, sz: &str, snapshot: bool) -> Message {
    Message::UserFills(UserFills {
        data: UserFillsData {
            is_snapshot: Some(snapshot),
            user: Address::ZERO,
            fills: vec![TradeInfo {
                coin: COIN.to_string(),
                side: "A".to_string(),
                px: px.to_string(),
                sz: sz.to_string(),
                time: 0,
                hash: String::new(),
                start_position: String::new(),
                dir: String::new(),
                closed_pnl: "0".to_string(),
                oid,
                cloid: None,
                crossed: false,
                fee: "0".to_string(),
                fee_token: "USDC".to_string(),
                tid,
                builder_fee: None,
            }],
        },
    })
}

#[tokio::test]
async fn boundary_follows_lowest_ask() {
    let (mut maker, _) = test_maker(vec![]).await;
    maker.order_state.on_place_confirmed(1, Side::Sell, 3, 1.009, 10.0);
    maker.order_state.on_place_confirmed(2, Side::Sell, 2, 1.006, 10.0);
    maker.order_state.on_place_confirmed(3, Side::Buy, 0, 1.0, 10.0);
    assert_eq!(maker.compute_boundary_level(), 2);
}

#[tokio::test]
async fn boundary_uses_configured_seed_without_asks() {
    let (mut maker, _) = test_maker(vec![]).await;
    maker.config.strategy.n_seeded_levels = 3;
    assert_eq!(maker.compute_boundary_level(), 3);
}

#[tokio::test]
async fn boundary_derives_from_allocation_without_seed() {
    let (maker, _) = test_maker(vec![]).await;
    // 1000 tokens / 10 per tranche = 100 tranches, clamped to the 5-level grid.
    assert_eq!(maker.compute_boundary_level(), 5);
}

#[tokio::test]
async fn resting_order_update_is_tracked_at_its_grid_level() {
    let (mut maker, _) = test_maker(vec![]).await;
    maker.handle_message(order_update(42, COIN, "A", "open", "1.006", "10.0"));
    let order = maker.order_state.get(42).unwrap();
    assert_eq!(order.side, Side::Sell);
    assert_eq!(order.level_index, 2);
}

#[tokio::test]
async fn foreign_coin_updates_are_ignored() {
    let (mut maker, _) = test_maker(vec![]).await;
    maker.handle_message(order_update(42, "OTHER/USDC", "A", "open", "1.006", "10.0"));
    assert!(maker.order_state.is_empty());
}

#[tokio::test]
async fn off_grid_prices_are_not_tracked() {
    let (mut maker, _) = test_maker(vec![]).await;
    maker.handle_message(order_update(42, COIN, "A", "open", "9.99", "10.0"));
    assert!(maker.order_state.is_empty());
}

#[tokio::test]
async fn canceled_update_removes_tracking() {
    let (mut maker, _) = test_maker(vec![]).await;
    maker.order_state.on_place_confirmed(42, Side::Sell, 2, 1.006, 10.0);
    maker.handle_message(order_update(42, COIN, "A", "canceled", "1.006", "10.0"));
    assert!(maker.order_state.is_empty());
}

#[tokio::test]
async fn cannot_modify_update_removes_ghost() {
    let (mut maker, _) = test_maker(vec![]).await;
    maker.order_state.on_place_confirmed(42, Side::Sell, 2, 1.006, 10.0);
    maker.handle_message(order_update(
        42,
        COIN,
        "A",
        "Cannot modify canceled or filled order",
        "1.006",
        "10.0",
    ));
    assert!(maker.order_state.is_empty());
}

#[tokio::test]
async fn fill_flows_into_inventory_and_budget() {
    let (mut maker, _) = test_maker(vec![]).await;
    maker.inventory.on_balance_update(25.0, 0.0);
    maker.order_state.on_place_confirmed(42, Side::Sell, 2, 1.006, 10.0);

    maker.handle_message(fill_message(9001, 42, "1.006", "10.0", false));

    assert!(maker.order_state.is_empty());
    assert_eq!(maker.inventory.account_token(), 15.0);
    assert!((maker.inventory.account_usdc() - 10.06).abs() < 1e-9);
    assert!((maker.rate_limit.cum_vlm() - 10.06).abs() < 1e-9);
}

#[tokio::test]
async fn duplicate_fill_replay_is_absorbed() {
    let (mut maker, _) = test_maker(vec![]).await;
    maker.inventory.on_balance_update(25.0, 0.0);
    maker.order_state.on_place_confirmed(42, Side::Sell, 2, 1.006, 20.0);

    maker.handle_message(fill_message(9001, 42, "1.006", "10.0", false));
    maker.handle_message(fill_message(9001, 42, "1.006", "10.0", false));

    // Only the first fill moved state.
    assert_eq!(maker.inventory.account_token(), 15.0);
    assert_eq!(maker.order_state.get(42).unwrap().size, 10.0);
}

#[tokio::test]
async fn snapshot_fills_are_skipped() {
    let (mut maker, _) = test_maker(vec![]).await;
    maker.inventory.on_balance_update(25.0, 0.0);
    maker.order_state.on_place_confirmed(42, Side::Sell, 2, 1.006, 10.0);

    maker.handle_message(fill_message(9001, 42, "1.006", "10.0", true));

    assert_eq!(maker.inventory.account_token(), 25.0);
    assert_eq!(maker.order_state.len(), 1);
}

#[tokio::test]
async fn tick_quotes_the_ladder_then_converges() {
    let (mut maker, calls) =
        test_maker(vec![ok_response(vec![resting(1), resting(2), resting(3)])]).await;
    // 25 tokens, no USDC, boundary 2: asks at levels 2/3/4 sized 10/10/5.
    maker.inventory.on_balance_update(25.0, 0.0);

    maker.tick().await;

    assert_eq!(*calls.lock().unwrap(), vec![Call::Place(3)]);
    assert_eq!(maker.order_state.len(), 3);
    assert_eq!(maker.boundary_level, 2);
    assert_eq!(maker.order_state.get_at(Side::Sell, 4).unwrap().size, 5.0);

    // Second tick sees a book identical to desired: nothing to emit.
    maker.tick().await;
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(maker.rate_limit.n_requests(), 1);
}

#[tokio::test]
async fn fill_shifts_boundary_on_next_tick() {
    let (mut maker, _) = test_maker(vec![ok_response(vec![
        resting(1),
        resting(2),
        resting(3),
    ])])
    .await;
    maker.inventory.on_balance_update(25.0, 0.0);
    maker.tick().await;
    assert_eq!(maker.boundary_level, 2);

    // The boundary ask fills: the next tick's boundary moves up a level.
    let oid = maker.order_state.get_at(Side::Sell, 2).unwrap().oid;
    maker.handle_message(fill_message(9001, oid, "1.006", "10.0", false));
    assert_eq!(maker.compute_boundary_level(), 3);
}
