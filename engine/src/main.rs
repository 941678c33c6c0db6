//! Demo: a group purchase from open to completion
//!
//! Registers a product with five units, opens a room capped at three
//! participants, joins three buyers and prints the resulting state. The
//! third join closes the room and triggers the completion notice.

use std::sync::Arc;

use groupbuy_core::environment::SystemClock;
use groupbuy_engine::availability::AvailabilityGate;
use groupbuy_engine::directory;
use groupbuy_engine::identity::StaticIdentityDirectory;
use groupbuy_engine::market::{MarketAction, MarketEnvironment, MarketReducer};
use groupbuy_engine::notifier::LoggingNotifier;
use groupbuy_engine::types::{BuyerId, MarketState, Money, Product, ProductId, RoomId};
use groupbuy_runtime::Store;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let identity = Arc::new(StaticIdentityDirectory::new());
    let alice = BuyerId::new();
    let bob = BuyerId::new();
    let carol = BuyerId::new();
    identity.register(alice, Some("alice@example.com"));
    identity.register(bob, Some("bob@example.com"));
    identity.register(carol, None);

    let environment = MarketEnvironment::new(
        Arc::new(SystemClock),
        identity,
        Arc::new(LoggingNotifier),
        Arc::new(AvailabilityGate::new()),
    );
    let store = Store::new(MarketState::new(), MarketReducer::new(), environment);

    let product = Product::new(
        ProductId::new(),
        "Ceramic pour-over set",
        Money::from_dollars(10),
        Some(Money::from_dollars(9)),
        5,
        2,
        3,
    )?;
    let product_id = product.id;
    store
        .send(MarketAction::RegisterProduct { product })
        .await?;

    let room_id = RoomId::new();
    store
        .send(MarketAction::OpenRoom {
            room_id,
            product_id,
            buyer_id: alice,
            is_private: false,
            expiration_time: None,
        })
        .await?;

    for buyer_id in [alice, bob, carol] {
        let mut handle = store
            .send(MarketAction::JoinRoom { room_id, buyer_id })
            .await?;
        handle.wait().await;
    }

    let listing = store.state(|state| directory::list_public(state)).await;
    println!("{}", serde_json::to_string_pretty(&listing)?);

    let summary = store
        .state(|state| {
            state.room(&room_id).map(|room| {
                (
                    room.participant_count(),
                    room.total_price,
                    room.is_active,
                    state.stock.available(&product_id),
                )
            })
        })
        .await;
    if let Some((participants, total, active, stock)) = summary {
        println!(
            "participants={participants} total={total} active={active} stock_left={stock}"
        );
    }

    store.shutdown().await?;
    Ok(())
}
