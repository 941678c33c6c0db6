//! The marketplace reducer
//!
//! One reducer owns products, rooms, orders and stock. The store serializes
//! reductions, so every command here runs as an atomic unit against the
//! whole [`MarketState`]: a join admits the participant, recomputes the
//! room total, debits stock and issues the order in one step, or does none
//! of it.
//!
//! The action enum carries both commands (requests from callers) and events
//! (facts applied to state). Commands validate and then apply events
//! inline; events arriving from outside are applied as-is, which keeps
//! replays idempotent.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use groupbuy_core::effect::Effect;
use groupbuy_core::environment::{Clock, SystemClock};
use groupbuy_core::reducer::Reducer;
use groupbuy_core::{SmallVec, smallvec};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

use crate::availability::AvailabilityGate;
use crate::error::Rejection;
use crate::identity::{IdentityDirectory, PermissiveIdentity};
use crate::notifier::{CompletionNotice, CompletionNotifier, LoggingNotifier};
use crate::orders::Order;
use crate::room::{CloseReason, Room};
use crate::types::{BuyerId, MarketState, OrderId, Product, ProductId, RoomId};

/// Effects returned by the marketplace reducer
pub type MarketEffects = SmallVec<[Effect<MarketAction>; 4]>;

/// Injected dependencies for the marketplace
#[derive(Clone)]
pub struct MarketEnvironment {
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Buyer registry
    pub identity: Arc<dyn IdentityDirectory>,
    /// Completion notice delivery
    pub notifier: Arc<dyn CompletionNotifier>,
    /// Joinability cache
    pub gate: Arc<AvailabilityGate>,
}

impl MarketEnvironment {
    /// Assemble an environment from its parts
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        identity: Arc<dyn IdentityDirectory>,
        notifier: Arc<dyn CompletionNotifier>,
        gate: Arc<AvailabilityGate>,
    ) -> Self {
        Self {
            clock,
            identity,
            notifier,
            gate,
        }
    }

    /// Production defaults: system clock, permissive identity, log-only
    /// notifier, 60 second gate
    #[must_use]
    pub fn live() -> Self {
        Self::new(
            Arc::new(SystemClock),
            Arc::new(PermissiveIdentity),
            Arc::new(LoggingNotifier),
            Arc::new(AvailabilityGate::new()),
        )
    }
}

impl std::fmt::Debug for MarketEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketEnvironment").finish_non_exhaustive()
    }
}

/// Commands and events for the marketplace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MarketAction {
    // === Commands ===
    /// Register a product from the catalog, seeding its stock
    RegisterProduct {
        /// The product to register
        product: Product,
    },

    /// Open a new group purchase room for a product
    OpenRoom {
        /// Identifier for the new room
        room_id: RoomId,
        /// Product the room purchases
        product_id: ProductId,
        /// Buyer opening the room
        buyer_id: BuyerId,
        /// Hide the room from public listings
        is_private: bool,
        /// Optional deadline after which the room closes
        expiration_time: Option<DateTime<Utc>>,
    },

    /// Join a group purchase room
    JoinRoom {
        /// Room to join
        room_id: RoomId,
        /// Buyer joining
        buyer_id: BuyerId,
    },

    /// Buy directly at the unit price, outside any room
    PlaceIndividualOrder {
        /// Identifier for the new order
        order_id: OrderId,
        /// Buyer placing the order
        buyer_id: BuyerId,
        /// Product ordered
        product_id: ProductId,
        /// Units ordered
        quantity: NonZeroU32,
    },

    /// Re-evaluate a room's expiration and closing conditions
    RefreshRoom {
        /// Room to refresh
        room_id: RoomId,
    },

    /// Close a room deliberately once it has reached its minimum size
    CloseRoomIfQuorum {
        /// Room to close
        room_id: RoomId,
    },

    // === Events ===
    /// A product entered the catalog
    ProductRegistered {
        /// The registered product
        product: Product,
    },

    /// A room was opened
    RoomOpened {
        /// Room identifier
        room_id: RoomId,
        /// Product the room purchases
        product_id: ProductId,
        /// Buyer who opened it
        opened_by: BuyerId,
        /// Hidden from public listings
        is_private: bool,
        /// Optional deadline
        expiration_time: Option<DateTime<Utc>>,
        /// When it was opened
        opened_at: DateTime<Utc>,
    },

    /// A buyer was admitted: participant recorded, total recomputed, one
    /// unit of stock debited, order issued
    ParticipantJoined {
        /// Room joined
        room_id: RoomId,
        /// Buyer admitted
        buyer_id: BuyerId,
        /// The group order issued by this admission
        order: Order,
    },

    /// An individual order was issued; stock is not touched
    OrderIssued {
        /// The issued order
        order: Order,
    },

    /// A room closed
    RoomClosed {
        /// Room that closed
        room_id: RoomId,
        /// Why it closed
        reason: CloseReason,
        /// When it closed
        closed_at: DateTime<Utc>,
    },

    /// A join was refused
    JoinRejected {
        /// Room targeted
        room_id: RoomId,
        /// Buyer refused
        buyer_id: BuyerId,
        /// Why
        reason: Rejection,
    },

    /// An individual order was refused
    OrderRejected {
        /// Buyer refused
        buyer_id: BuyerId,
        /// Product targeted
        product_id: ProductId,
        /// Why
        reason: Rejection,
    },

    /// Opening a room was refused
    RoomRejected {
        /// Product targeted
        product_id: ProductId,
        /// Buyer refused
        buyer_id: BuyerId,
        /// Why
        reason: Rejection,
    },
}

/// Reducer for the whole marketplace lifecycle
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketReducer;

impl MarketReducer {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn none() -> MarketEffects {
        smallvec![Effect::None]
    }

    fn log_rejection(reason: &Rejection) {
        if reason.is_soft() {
            tracing::warn!(%reason, "command refused (soft)");
        } else {
            tracing::info!(%reason, "command refused");
        }
    }

    fn reject_join(
        state: &mut MarketState,
        room_id: RoomId,
        buyer_id: BuyerId,
        reason: Rejection,
    ) -> MarketEffects {
        Self::log_rejection(&reason);
        Self::apply_event(
            state,
            &MarketAction::JoinRejected {
                room_id,
                buyer_id,
                reason,
            },
        );
        Self::none()
    }

    fn reject_order(
        state: &mut MarketState,
        buyer_id: BuyerId,
        product_id: ProductId,
        reason: Rejection,
    ) -> MarketEffects {
        Self::log_rejection(&reason);
        Self::apply_event(
            state,
            &MarketAction::OrderRejected {
                buyer_id,
                product_id,
                reason,
            },
        );
        Self::none()
    }

    fn reject_room(
        state: &mut MarketState,
        product_id: ProductId,
        buyer_id: BuyerId,
        reason: Rejection,
    ) -> MarketEffects {
        Self::log_rejection(&reason);
        Self::apply_event(
            state,
            &MarketAction::RoomRejected {
                product_id,
                buyer_id,
                reason,
            },
        );
        Self::none()
    }

    /// Apply an event to state; events never fail
    fn apply_event(state: &mut MarketState, event: &MarketAction) {
        match event {
            MarketAction::ProductRegistered { product } => {
                state.stock.seed(product.id, product.stock_quantity);
                state.products.insert(product.id, product.clone());
                state.last_rejection = None;
                tracing::debug!(product_id = %product.id, stock = product.stock_quantity, "product registered");
            }
            MarketAction::RoomOpened {
                room_id,
                product_id,
                opened_by,
                is_private,
                expiration_time,
                opened_at,
            } => {
                let room = Room::open(
                    *room_id,
                    *product_id,
                    *opened_by,
                    *is_private,
                    *expiration_time,
                    *opened_at,
                );
                state.rooms.insert(*room_id, room);
                state.last_rejection = None;
                tracing::info!(%room_id, %product_id, "room opened");
            }
            MarketAction::ParticipantJoined {
                room_id,
                buyer_id,
                order,
            } => {
                if let Some(room) = state.rooms.get_mut(room_id) {
                    room.admit(*buyer_id, order.unit_price_at_purchase);
                }
                // Stock was verified before this event was emitted.
                let _ = state.stock.try_debit(&order.product_id);
                state.orders.insert(order.id, order.clone());
                state.last_rejection = None;
                tracing::info!(%room_id, %buyer_id, "participant joined");
            }
            MarketAction::OrderIssued { order } => {
                state.orders.insert(order.id, order.clone());
                state.last_rejection = None;
                tracing::info!(order_id = %order.id, buyer_id = %order.buyer_id, "order issued");
            }
            MarketAction::RoomClosed {
                room_id,
                reason,
                closed_at: _,
            } => {
                if let Some(room) = state.rooms.get_mut(room_id) {
                    if room.close(*reason) {
                        tracing::info!(%room_id, ?reason, "room closed");
                    }
                }
            }
            MarketAction::JoinRejected { reason, .. }
            | MarketAction::OrderRejected { reason, .. }
            | MarketAction::RoomRejected { reason, .. } => {
                state.last_rejection = Some(reason.clone());
            }
            // Commands are not events; nothing to apply.
            _ => {}
        }
    }

    fn handle_register_product(state: &mut MarketState, product: Product) -> MarketEffects {
        Self::apply_event(state, &MarketAction::ProductRegistered { product });
        Self::none()
    }

    fn handle_open_room(
        state: &mut MarketState,
        env: &MarketEnvironment,
        room_id: RoomId,
        product_id: ProductId,
        buyer_id: BuyerId,
        is_private: bool,
        expiration_time: Option<DateTime<Utc>>,
    ) -> MarketEffects {
        let now = env.clock.now();

        if !env.identity.is_buyer(&buyer_id) {
            return Self::reject_room(state, product_id, buyer_id, Rejection::NotAuthorized);
        }

        let has_group_price = match state.products.get(&product_id) {
            Some(product) => product.group_price.is_some(),
            None => {
                return Self::reject_room(
                    state,
                    product_id,
                    buyer_id,
                    Rejection::NotFound { what: "product" },
                );
            }
        };

        // A room needs a reserve of at least two units: one for the opener's
        // eventual join and one for a second participant.
        let available = state.stock.available(&product_id);
        if available == 0 {
            return Self::reject_room(state, product_id, buyer_id, Rejection::OutOfStock);
        }
        if available == 1 {
            return Self::reject_room(state, product_id, buyer_id, Rejection::InsufficientReserve);
        }
        if !has_group_price {
            return Self::reject_room(state, product_id, buyer_id, Rejection::NoGroupPrice);
        }

        Self::apply_event(
            state,
            &MarketAction::RoomOpened {
                room_id,
                product_id,
                opened_by: buyer_id,
                is_private,
                expiration_time,
                opened_at: now,
            },
        );
        Self::none()
    }

    #[allow(clippy::too_many_lines)]
    fn handle_join_room(
        state: &mut MarketState,
        env: &MarketEnvironment,
        room_id: RoomId,
        buyer_id: BuyerId,
    ) -> MarketEffects {
        let now = env.clock.now();

        let Some(room) = state.rooms.get(&room_id) else {
            return Self::reject_join(
                state,
                room_id,
                buyer_id,
                Rejection::NotFound { what: "room" },
            );
        };
        let product_id = room.product_id;
        let deadline_passed = room.is_active && room.is_expired(now);

        // Expiration is lazy: the deadline is enforced on access, with no
        // background sweep. An expired room closes here and the join is then
        // refused like any other closed room.
        if deadline_passed {
            Self::apply_event(
                state,
                &MarketAction::RoomClosed {
                    room_id,
                    reason: CloseReason::Expired,
                    closed_at: now,
                },
            );
        }

        let (group_price_opt, max_participants, product_name) =
            match state.products.get(&product_id) {
                Some(product) => (
                    product.group_price,
                    product.max_participants,
                    product.name.clone(),
                ),
                None => {
                    return Self::reject_join(
                        state,
                        room_id,
                        buyer_id,
                        Rejection::NotFound { what: "product" },
                    );
                }
            };

        let Some(room) = state.rooms.get(&room_id) else {
            return Self::reject_join(
                state,
                room_id,
                buyer_id,
                Rejection::NotFound { what: "room" },
            );
        };
        if !room.is_active {
            return Self::reject_join(state, room_id, buyer_id, Rejection::RoomClosed);
        }
        let Some(group_price) = group_price_opt else {
            return Self::reject_join(state, room_id, buyer_id, Rejection::NoGroupPrice);
        };

        let stock_now = state.stock.available(&product_id);
        let count_now = room.participant_count();
        let already_joined = room.has_participant(&buyer_id);

        // Fast path through the joinability cache. A cached "no" deactivates
        // the room so later callers fail on the closed check instead.
        let joinable_hint = env
            .gate
            .check(room_id, || stock_now > 0 && count_now < max_participants);
        if !joinable_hint {
            let reason = if stock_now == 0 {
                CloseReason::StockExhausted
            } else {
                CloseReason::CapacityReached
            };
            Self::apply_event(
                state,
                &MarketAction::RoomClosed {
                    room_id,
                    reason,
                    closed_at: now,
                },
            );
            return Self::reject_join(state, room_id, buyer_id, Rejection::RoomUnavailable);
        }

        if already_joined {
            return Self::reject_join(state, room_id, buyer_id, Rejection::AlreadyJoined);
        }

        // The cached hint may be stale-positive within its TTL, so capacity
        // and stock are re-checked here, inside the same serialized
        // reduction that will mutate them.
        if count_now >= max_participants || stock_now == 0 {
            let reason = if stock_now == 0 {
                CloseReason::StockExhausted
            } else {
                CloseReason::CapacityReached
            };
            Self::apply_event(
                state,
                &MarketAction::RoomClosed {
                    room_id,
                    reason,
                    closed_at: now,
                },
            );
            return Self::reject_join(state, room_id, buyer_id, Rejection::RoomUnavailable);
        }

        // Commit: participant, total price, stock and order move together.
        let order = Order::group(
            OrderId::new(),
            buyer_id,
            product_id,
            group_price,
            room_id,
            now,
        );
        Self::apply_event(
            state,
            &MarketAction::ParticipantJoined {
                room_id,
                buyer_id,
                order,
            },
        );

        // Closing conditions are evaluated after the admission committed.
        let remaining = state.stock.available(&product_id);
        let count_after = state
            .rooms
            .get(&room_id)
            .map_or(0, Room::participant_count);

        if count_after < max_participants && remaining > 0 {
            return Self::none();
        }

        let reason = if count_after >= max_participants {
            CloseReason::CapacityReached
        } else {
            CloseReason::StockExhausted
        };
        Self::apply_event(
            state,
            &MarketAction::RoomClosed {
                room_id,
                reason,
                closed_at: now,
            },
        );

        // The close has committed; delivery is fire-and-forget. The join
        // was the closing one, so this fires exactly once per room.
        let recipients: Vec<String> = state.rooms.get(&room_id).map_or_else(Vec::new, |room| {
            room.participants
                .iter()
                .filter_map(|participant| env.identity.contact_address(participant))
                .collect()
        });
        let notice = CompletionNotice {
            product_name,
            recipients,
        };
        let notifier = Arc::clone(&env.notifier);
        smallvec![Effect::Future(Box::pin(async move {
            if let Err(error) = notifier.notify(notice).await {
                tracing::warn!(%error, "completion notice delivery failed");
            }
            None
        }))]
    }

    fn handle_individual_order(
        state: &mut MarketState,
        env: &MarketEnvironment,
        order_id: OrderId,
        buyer_id: BuyerId,
        product_id: ProductId,
        quantity: NonZeroU32,
    ) -> MarketEffects {
        let now = env.clock.now();

        if !env.identity.is_buyer(&buyer_id) {
            return Self::reject_order(state, buyer_id, product_id, Rejection::NotAuthorized);
        }

        let unit_price = match state.products.get(&product_id) {
            Some(product) => product.unit_price,
            None => {
                return Self::reject_order(
                    state,
                    buyer_id,
                    product_id,
                    Rejection::NotFound { what: "product" },
                );
            }
        };

        if state.stock.is_exhausted(&product_id) {
            return Self::reject_order(state, buyer_id, product_id, Rejection::OutOfStock);
        }

        let order = Order::individual(order_id, buyer_id, product_id, quantity, unit_price, now);
        Self::apply_event(state, &MarketAction::OrderIssued { order });
        Self::none()
    }

    fn handle_refresh_room(
        state: &mut MarketState,
        env: &MarketEnvironment,
        room_id: RoomId,
    ) -> MarketEffects {
        let now = env.clock.now();

        let Some(room) = state.rooms.get(&room_id) else {
            tracing::debug!(%room_id, "refresh of unknown room");
            state.last_rejection = Some(Rejection::NotFound { what: "room" });
            return Self::none();
        };
        if !room.is_active {
            return Self::none();
        }

        let product_id = room.product_id;
        let count = room.participant_count();
        let expired = room.is_expired(now);

        if expired {
            Self::apply_event(
                state,
                &MarketAction::RoomClosed {
                    room_id,
                    reason: CloseReason::Expired,
                    closed_at: now,
                },
            );
            return Self::none();
        }

        let max_participants = state
            .products
            .get(&product_id)
            .map(|product| product.max_participants);
        let stock_now = state.stock.available(&product_id);

        if let Some(max) = max_participants {
            if count >= max || stock_now == 0 {
                let reason = if count >= max {
                    CloseReason::CapacityReached
                } else {
                    CloseReason::StockExhausted
                };
                Self::apply_event(
                    state,
                    &MarketAction::RoomClosed {
                        room_id,
                        reason,
                        closed_at: now,
                    },
                );
            }
        }
        Self::none()
    }

    fn handle_close_if_quorum(state: &mut MarketState, room_id: RoomId) -> MarketEffects {
        let Some(room) = state.rooms.get(&room_id) else {
            state.last_rejection = Some(Rejection::NotFound { what: "room" });
            return Self::none();
        };

        let product_id = room.product_id;
        let min_participants = state
            .products
            .get(&product_id)
            .map(|product| product.min_participants);

        if let Some(min) = min_participants {
            let closed = state
                .rooms
                .get_mut(&room_id)
                .is_some_and(|room| room.close_if_quorum(min));
            if closed {
                tracing::info!(%room_id, "room closed at quorum");
            }
        }
        Self::none()
    }
}

impl Reducer for MarketReducer {
    type State = MarketState;
    type Action = MarketAction;
    type Environment = MarketEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> MarketEffects {
        match action {
            MarketAction::RegisterProduct { product } => {
                Self::handle_register_product(state, product)
            }
            MarketAction::OpenRoom {
                room_id,
                product_id,
                buyer_id,
                is_private,
                expiration_time,
            } => Self::handle_open_room(
                state,
                env,
                room_id,
                product_id,
                buyer_id,
                is_private,
                expiration_time,
            ),
            MarketAction::JoinRoom { room_id, buyer_id } => {
                Self::handle_join_room(state, env, room_id, buyer_id)
            }
            MarketAction::PlaceIndividualOrder {
                order_id,
                buyer_id,
                product_id,
                quantity,
            } => Self::handle_individual_order(state, env, order_id, buyer_id, product_id, quantity),
            MarketAction::RefreshRoom { room_id } => Self::handle_refresh_room(state, env, room_id),
            MarketAction::CloseRoomIfQuorum { room_id } => {
                Self::handle_close_if_quorum(state, room_id)
            }
            // Events from outside (replays, projections feeding back) are
            // applied directly.
            event => {
                Self::apply_event(state, &event);
                Self::none()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::identity::StaticIdentityDirectory;
    use crate::notifier::RecordingNotifier;
    use crate::types::Money;
    use groupbuy_testing::{ReducerTest, assertions, test_clock};

    fn test_env() -> MarketEnvironment {
        MarketEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(PermissiveIdentity),
            Arc::new(RecordingNotifier::new()),
            Arc::new(AvailabilityGate::new()),
        )
    }

    fn widget(stock: u32, max: u32) -> Product {
        Product::new(
            ProductId::new(),
            "Widget",
            Money::from_dollars(10),
            Some(Money::from_dollars(9)),
            stock,
            2,
            max,
        )
        .unwrap()
    }

    fn state_with_product(product: &Product) -> MarketState {
        let mut state = MarketState::new();
        MarketReducer::apply_event(
            &mut state,
            &MarketAction::ProductRegistered {
                product: product.clone(),
            },
        );
        state
    }

    #[test]
    fn register_product_seeds_stock() {
        let product = widget(5, 3);
        let product_id = product.id;

        ReducerTest::new(MarketReducer::new())
            .with_env(test_env())
            .given_state(MarketState::new())
            .when_action(MarketAction::RegisterProduct { product })
            .then_state(move |state| {
                assert_eq!(state.product_count(), 1);
                assert_eq!(state.stock.available(&product_id), 5);
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn open_room_requires_two_units_in_stock() {
        let product = widget(1, 3);
        let product_id = product.id;
        let state = state_with_product(&product);

        ReducerTest::new(MarketReducer::new())
            .with_env(test_env())
            .given_state(state)
            .when_action(MarketAction::OpenRoom {
                room_id: RoomId::new(),
                product_id,
                buyer_id: BuyerId::new(),
                is_private: false,
                expiration_time: None,
            })
            .then_state(|state| {
                assert_eq!(state.last_rejection, Some(Rejection::InsufficientReserve));
                assert!(state.rooms.is_empty());
            })
            .run();
    }

    #[test]
    fn open_room_requires_a_group_price() {
        let mut product = widget(5, 3);
        product.group_price = None;
        let product_id = product.id;
        let state = state_with_product(&product);

        ReducerTest::new(MarketReducer::new())
            .with_env(test_env())
            .given_state(state)
            .when_action(MarketAction::OpenRoom {
                room_id: RoomId::new(),
                product_id,
                buyer_id: BuyerId::new(),
                is_private: false,
                expiration_time: None,
            })
            .then_state(|state| {
                assert_eq!(state.last_rejection, Some(Rejection::NoGroupPrice));
            })
            .run();
    }

    #[test]
    fn open_room_rejects_unregistered_buyers() {
        let directory = StaticIdentityDirectory::new();
        let env = MarketEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(directory),
            Arc::new(RecordingNotifier::new()),
            Arc::new(AvailabilityGate::new()),
        );
        let product = widget(5, 3);
        let product_id = product.id;
        let state = state_with_product(&product);

        ReducerTest::new(MarketReducer::new())
            .with_env(env)
            .given_state(state)
            .when_action(MarketAction::OpenRoom {
                room_id: RoomId::new(),
                product_id,
                buyer_id: BuyerId::new(),
                is_private: false,
                expiration_time: None,
            })
            .then_state(|state| {
                assert_eq!(state.last_rejection, Some(Rejection::NotAuthorized));
            })
            .run();
    }

    #[test]
    fn join_recomputes_total_and_debits_stock() {
        let product = widget(5, 3);
        let product_id = product.id;
        let room_id = RoomId::new();
        let buyer = BuyerId::new();
        let env = test_env();
        let reducer = MarketReducer::new();

        let mut state = state_with_product(&product);
        let _ = reducer.reduce(
            &mut state,
            MarketAction::OpenRoom {
                room_id,
                product_id,
                buyer_id: BuyerId::new(),
                is_private: false,
                expiration_time: None,
            },
            &env,
        );
        let effects = reducer.reduce(
            &mut state,
            MarketAction::JoinRoom {
                room_id,
                buyer_id: buyer,
            },
            &env,
        );

        assertions::assert_no_effects(&effects);
        let room = state.room(&room_id).unwrap();
        assert_eq!(room.participant_count(), 1);
        assert_eq!(room.total_price, Money::from_dollars(9));
        assert_eq!(state.stock.available(&product_id), 4);
        assert_eq!(state.orders_for_buyer(&buyer).len(), 1);
        assert!(state.last_rejection.is_none());
    }

    #[test]
    fn duplicate_join_is_soft_and_changes_nothing() {
        let product = widget(5, 3);
        let product_id = product.id;
        let room_id = RoomId::new();
        let buyer = BuyerId::new();
        let env = test_env();
        let reducer = MarketReducer::new();

        let mut state = state_with_product(&product);
        let _ = reducer.reduce(
            &mut state,
            MarketAction::OpenRoom {
                room_id,
                product_id,
                buyer_id: buyer,
                is_private: false,
                expiration_time: None,
            },
            &env,
        );
        let _ = reducer.reduce(
            &mut state,
            MarketAction::JoinRoom {
                room_id,
                buyer_id: buyer,
            },
            &env,
        );
        let stock_before = state.stock.available(&product_id);

        let effects = reducer.reduce(
            &mut state,
            MarketAction::JoinRoom {
                room_id,
                buyer_id: buyer,
            },
            &env,
        );

        assertions::assert_no_effects(&effects);
        assert_eq!(state.last_rejection, Some(Rejection::AlreadyJoined));
        let room = state.room(&room_id).unwrap();
        assert_eq!(room.participant_count(), 1);
        assert!(room.is_active);
        assert_eq!(state.stock.available(&product_id), stock_before);
    }

    #[test]
    fn closing_join_returns_a_notification_effect() {
        let product = widget(5, 2);
        let product_id = product.id;
        let room_id = RoomId::new();
        let env = test_env();
        let reducer = MarketReducer::new();

        let mut state = state_with_product(&product);
        let _ = reducer.reduce(
            &mut state,
            MarketAction::OpenRoom {
                room_id,
                product_id,
                buyer_id: BuyerId::new(),
                is_private: false,
                expiration_time: None,
            },
            &env,
        );
        let first = reducer.reduce(
            &mut state,
            MarketAction::JoinRoom {
                room_id,
                buyer_id: BuyerId::new(),
            },
            &env,
        );
        assertions::assert_no_effects(&first);

        let second = reducer.reduce(
            &mut state,
            MarketAction::JoinRoom {
                room_id,
                buyer_id: BuyerId::new(),
            },
            &env,
        );

        assertions::assert_has_future_effect(&second);
        let room = state.room(&room_id).unwrap();
        assert!(!room.is_active);
        assert_eq!(room.close_reason, Some(CloseReason::CapacityReached));
    }

    #[test]
    fn individual_order_never_touches_stock() {
        let product = widget(5, 3);
        let product_id = product.id;
        let buyer = BuyerId::new();
        let state = state_with_product(&product);

        ReducerTest::new(MarketReducer::new())
            .with_env(test_env())
            .given_state(state)
            .when_action(MarketAction::PlaceIndividualOrder {
                order_id: OrderId::new(),
                buyer_id: buyer,
                product_id,
                quantity: NonZeroU32::new(3).unwrap(),
            })
            .then_state(move |state| {
                assert_eq!(state.stock.available(&product_id), 5);
                let orders = state.orders_for_buyer(&buyer);
                assert_eq!(orders.len(), 1);
                assert_eq!(orders[0].total(), Money::from_dollars(30));
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn refresh_closes_an_expired_room() {
        use chrono::TimeDelta;

        let product = widget(5, 3);
        let product_id = product.id;
        let room_id = RoomId::new();
        let env = test_env();
        let reducer = MarketReducer::new();
        let deadline = env.clock.now() - TimeDelta::seconds(1);

        let mut state = state_with_product(&product);
        let _ = reducer.reduce(
            &mut state,
            MarketAction::OpenRoom {
                room_id,
                product_id,
                buyer_id: BuyerId::new(),
                is_private: false,
                expiration_time: Some(deadline),
            },
            &env,
        );
        let _ = reducer.reduce(&mut state, MarketAction::RefreshRoom { room_id }, &env);

        let room = state.room(&room_id).unwrap();
        assert!(!room.is_active);
        assert_eq!(room.close_reason, Some(CloseReason::Expired));
    }

    #[test]
    fn quorum_close_only_fires_at_minimum_size() {
        let product = widget(5, 4);
        let product_id = product.id;
        let room_id = RoomId::new();
        let env = test_env();
        let reducer = MarketReducer::new();

        let mut state = state_with_product(&product);
        let _ = reducer.reduce(
            &mut state,
            MarketAction::OpenRoom {
                room_id,
                product_id,
                buyer_id: BuyerId::new(),
                is_private: false,
                expiration_time: None,
            },
            &env,
        );
        let _ = reducer.reduce(
            &mut state,
            MarketAction::JoinRoom {
                room_id,
                buyer_id: BuyerId::new(),
            },
            &env,
        );

        let _ = reducer.reduce(&mut state, MarketAction::CloseRoomIfQuorum { room_id }, &env);
        assert!(state.room(&room_id).unwrap().is_active);

        let _ = reducer.reduce(
            &mut state,
            MarketAction::JoinRoom {
                room_id,
                buyer_id: BuyerId::new(),
            },
            &env,
        );
        let _ = reducer.reduce(&mut state, MarketAction::CloseRoomIfQuorum { room_id }, &env);

        let room = state.room(&room_id).unwrap();
        assert!(!room.is_active);
        assert_eq!(room.close_reason, Some(CloseReason::QuorumReached));
    }
}
