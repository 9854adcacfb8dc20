//! Shopping cart aggregate used across the integration tests and benches.

use chrono::{DateTime, Utc};
use common::{AggregateId, EventContext};
use domain::{Aggregate, DomainEvent, EventSourcingState};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Events that can occur on a shopping cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ShoppingCartEvent {
    /// Cart was opened for a client.
    ShoppingCartInitialized {
        shopping_cart_id: Uuid,
        client_id: Uuid,
    },

    /// Product was put into the cart.
    ProductItemAddedToShoppingCart { shopping_cart_id: Uuid, product_id: Uuid },

    /// Product was taken out of the cart.
    ProductItemRemovedFromShoppingCart { shopping_cart_id: Uuid, product_id: Uuid },

    /// Cart was checked out.
    ShoppingCartConfirmed {
        shopping_cart_id: Uuid,
        confirmed_at: DateTime<Utc>,
    },
}

impl DomainEvent for ShoppingCartEvent {
    const EVENT_TYPES: &'static [&'static str] = &[
        "ShoppingCartInitialized",
        "ProductItemAddedToShoppingCart",
        "ProductItemRemovedFromShoppingCart",
        "ShoppingCartConfirmed",
    ];

    fn event_type(&self) -> &'static str {
        match self {
            ShoppingCartEvent::ShoppingCartInitialized { .. } => "ShoppingCartInitialized",
            ShoppingCartEvent::ProductItemAddedToShoppingCart { .. } => {
                "ProductItemAddedToShoppingCart"
            }
            ShoppingCartEvent::ProductItemRemovedFromShoppingCart { .. } => {
                "ProductItemRemovedFromShoppingCart"
            }
            ShoppingCartEvent::ShoppingCartConfirmed { .. } => "ShoppingCartConfirmed",
        }
    }
}

/// Lifecycle of a cart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartStatus {
    #[default]
    Pending,
    Confirmed,
}

/// Rejected cart operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Cart has not been initialized")]
    NotInitialized,

    #[error("Cart is already confirmed")]
    AlreadyConfirmed,

    #[error("Product {0} is not in the cart")]
    ProductNotInCart(Uuid),
}

/// Shopping cart aggregate root.
#[derive(Debug, Default)]
pub struct ShoppingCart {
    id: Option<AggregateId>,
    client_id: Option<Uuid>,
    status: CartStatus,
    products: Vec<Uuid>,
    confirmed_at: Option<DateTime<Utc>>,
    sourcing: EventSourcingState<ShoppingCartEvent>,
}

impl ShoppingCart {
    /// Opens a new cart for `client_id`.
    pub fn create(client_id: Uuid, ctx: &EventContext) -> Self {
        let mut cart = Self::default();
        cart.apply_event(
            ShoppingCartEvent::ShoppingCartInitialized {
                shopping_cart_id: AggregateId::generate(ctx.ids()).as_uuid(),
                client_id,
            },
            ctx,
        );
        cart
    }

    /// Puts a product into the cart.
    pub fn add_item(&mut self, product_id: Uuid, ctx: &EventContext) -> Result<(), CartError> {
        let shopping_cart_id = self.ensure_pending()?;
        self.apply_event(
            ShoppingCartEvent::ProductItemAddedToShoppingCart {
                shopping_cart_id,
                product_id,
            },
            ctx,
        );
        Ok(())
    }

    /// Takes one unit of a product out of the cart.
    pub fn remove_item(&mut self, product_id: Uuid, ctx: &EventContext) -> Result<(), CartError> {
        let shopping_cart_id = self.ensure_pending()?;
        if !self.products.contains(&product_id) {
            return Err(CartError::ProductNotInCart(product_id));
        }
        self.apply_event(
            ShoppingCartEvent::ProductItemRemovedFromShoppingCart {
                shopping_cart_id,
                product_id,
            },
            ctx,
        );
        Ok(())
    }

    /// Checks the cart out.
    pub fn confirm(&mut self, ctx: &EventContext) -> Result<(), CartError> {
        let shopping_cart_id = self.ensure_pending()?;
        self.apply_event(
            ShoppingCartEvent::ShoppingCartConfirmed {
                shopping_cart_id,
                confirmed_at: ctx.now(),
            },
            ctx,
        );
        Ok(())
    }

    pub fn client_id(&self) -> Option<Uuid> {
        self.client_id
    }

    pub fn status(&self) -> CartStatus {
        self.status
    }

    pub fn products(&self) -> &[Uuid] {
        &self.products
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    fn ensure_pending(&self) -> Result<Uuid, CartError> {
        let id = self.id.ok_or(CartError::NotInitialized)?;
        if self.status != CartStatus::Pending {
            return Err(CartError::AlreadyConfirmed);
        }
        Ok(id.as_uuid())
    }
}

impl Aggregate for ShoppingCart {
    type Id = Uuid;
    type Event = ShoppingCartEvent;

    fn aggregate_type() -> &'static str {
        "ShoppingCart"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn apply(&mut self, event: &ShoppingCartEvent) {
        match event {
            ShoppingCartEvent::ShoppingCartInitialized {
                shopping_cart_id,
                client_id,
            } => {
                self.id = Some(AggregateId::new(*shopping_cart_id));
                self.client_id = Some(*client_id);
                self.status = CartStatus::Pending;
                self.products.clear();
            }
            ShoppingCartEvent::ProductItemAddedToShoppingCart { product_id, .. } => {
                self.products.push(*product_id);
            }
            ShoppingCartEvent::ProductItemRemovedFromShoppingCart { product_id, .. } => {
                if let Some(index) = self.products.iter().position(|p| p == product_id) {
                    self.products.remove(index);
                }
            }
            ShoppingCartEvent::ShoppingCartConfirmed { confirmed_at, .. } => {
                self.confirmed_at = Some(*confirmed_at);
                self.status = CartStatus::Confirmed;
            }
        }
    }

    fn sourcing(&self) -> &EventSourcingState<ShoppingCartEvent> {
        &self.sourcing
    }

    fn sourcing_mut(&mut self) -> &mut EventSourcingState<ShoppingCartEvent> {
        &mut self.sourcing
    }
}
