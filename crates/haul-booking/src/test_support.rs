//! Fixtures shared by the unit tests of this crate.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{NaiveDate, Utc};

use haul_core::{BundleComponent, CartItem, OrderStatus};
use haul_db::{
    Database, DbConfig, NewOrder, NewProduct, NewReservation, OrderRepository,
    ReservationRepository,
};

use crate::orchestrator::CreateOrderRequest;

pub fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// In-memory database holding the given `(id, name, stock)` leaf products.
pub async fn db_with_supplies(supplies: &[(i64, &str, i64)]) -> Database {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    for (id, name, stock) in supplies {
        db.products()
            .insert(&NewProduct::standalone(*id, *name, 1_000, *stock))
            .await
            .unwrap();
    }
    db
}

pub async fn add_bundle(db: &Database, id: i64, name: &str, components: &[(i64, i64)]) {
    db.products()
        .insert(&NewProduct::bundle(id, name, 10_000))
        .await
        .unwrap();
    let components: Vec<BundleComponent> = components
        .iter()
        .map(|(component_id, qty)| BundleComponent::new(*component_id, *qty))
        .collect();
    db.products().set_composition(id, &components).await.unwrap();
}

/// Writes an active reservation directly, behind a placeholder order.
/// `end` is stored as given.
pub async fn reserve(db: &Database, product_id: i64, qty: i64, start: &str, end: &str) {
    let mut conn = db.pool().acquire().await.unwrap();
    static NEXT: AtomicUsize = AtomicUsize::new(1);
    let folio = format!("GH-FIXTURE-{:06}", NEXT.fetch_add(1, Ordering::Relaxed));
    let order_id = OrderRepository::insert_on(
        &mut conn,
        &NewOrder {
            folio,
            user_id: 1,
            total_cents: 0,
            status: OrderStatus::Activo,
            order_date: Utc::now(),
            rental_start: d(start),
            rental_end: d(end),
            // Far from any slot the tests look at.
            delivery_date: d("2000-01-01"),
            pickup_date: d("2000-01-02"),
            payment_confirmation: None,
        },
    )
    .await
    .unwrap();

    ReservationRepository::insert_on(
        &mut conn,
        &NewReservation {
            order_id,
            product_id,
            quantity: qty,
            date_start: d(start),
            date_end: d(end),
            user_id: 1,
        },
    )
    .await
    .unwrap();
}

/// A complete, valid request for `items` with delivery on `start` and
/// pickup on `end`.
pub fn request(items: Vec<CartItem>, start: &str, end: &str) -> CreateOrderRequest {
    CreateOrderRequest {
        user_id: 7,
        cart_items: items,
        delivery_address_id: Some(11),
        pickup_address_id: Some(12),
        date_start: Some(d(start)),
        date_end: Some(d(end)),
        delivery_date: Some(d(start)),
        pickup_date: Some(d(end)),
        total_amount_cents: 15_000,
    }
}

pub fn item(product_id: i64, name: &str, qty: i64) -> CartItem {
    CartItem::new(product_id, name, qty, 2_500)
}
