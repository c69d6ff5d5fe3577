//! Store integration tests.
//!
//! Every check runs against both backends: SQLite (`sqlite::memory:`) and the
//! in-memory test double. Run with:
//!
//! ```bash
//! cargo test -p store --test store_integration
//! ```

use chrono::NaiveDate;
use store::{
    Conflict, Customer, InMemoryStore, Money, NewCustomer, NewLineItem, NewOrder, NewProduct,
    OrderId, OrderStatus, Product, ProductId, SqliteStore, Store, StoreError, StoreExt,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

async fn customer<S: Store>(store: &S, name: &str, email: &str) -> Customer {
    store
        .insert_customer(NewCustomer::new(name, email).with_phone("555-0100"))
        .await
        .unwrap()
}

async fn product<S: Store>(store: &S, name: &str, cents: i64, stock: i64) -> Product {
    store
        .insert_product(NewProduct::new(name, Money::from_cents(cents), stock))
        .await
        .unwrap()
}

fn order_for(customer: &Customer, lines: &[(&Product, u32)], date: NaiveDate) -> NewOrder {
    let lines: Vec<NewLineItem> = lines
        .iter()
        .map(|(p, quantity)| NewLineItem {
            product_id: p.id,
            quantity: *quantity,
            unit_price: p.price,
        })
        .collect();
    NewOrder {
        customer_id: customer.id,
        date,
        status: OrderStatus::Pending,
        total: lines.iter().map(|l| l.unit_price.multiply(l.quantity)).sum(),
        lines,
    }
}

async fn stock_of<S: Store>(store: &S, id: ProductId) -> i64 {
    store.require_product(id).await.unwrap().stock
}

// -- Checks --

async fn customer_email_is_unique<S: Store>(store: S) {
    let ana = customer(&store, "Ana", "ana@example.com").await;

    let err = store
        .insert_customer(NewCustomer::new("Other Ana", "ana@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Conflict(Conflict::DuplicateEmail { .. })
    ));

    let ben = customer(&store, "Ben", "ben@example.com").await;
    let err = store
        .update_customer(Customer {
            email: ana.email.clone(),
            ..ben.clone()
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Conflict(Conflict::DuplicateEmail { .. })
    ));

    // Keeping your own email is fine.
    let renamed = store
        .update_customer(Customer {
            name: "Ana Maria".to_string(),
            ..ana.clone()
        })
        .await
        .unwrap();
    assert_eq!(
        store.get_customer(ana.id).await.unwrap(),
        Some(renamed.clone())
    );
    assert_eq!(
        store
            .find_customer_by_email("ana@example.com")
            .await
            .unwrap(),
        Some(renamed)
    );
}

async fn search_matches_any_field_ignoring_case<S: Store>(store: S) {
    customer(&store, "Carla", "carla@shop.test").await;
    customer(&store, "Bruno", "bruno@mail.test").await;
    product(&store, "USB Cable", 500, 3).await;
    store
        .insert_product(
            NewProduct::new("Charger", Money::from_cents(1500), 2)
                .with_description("Fast usb-c charger"),
        )
        .await
        .unwrap();
    product(&store, "Keyboard", 3000, 1).await;

    let names: Vec<_> = store
        .search_customers("SHOP")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Carla"]);

    let by_phone = store.search_customers("0100").await.unwrap();
    assert_eq!(by_phone.len(), 2);
    assert_eq!(by_phone[0].name, "Bruno");

    let names: Vec<_> = store
        .search_products("usb")
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["Charger", "USB Cable"]);

    let all: Vec<_> = store
        .list_products()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(all, vec!["Charger", "Keyboard", "USB Cable"]);
}

async fn adjust_stock_adds_delta<S: Store>(store: S) {
    let mouse = product(&store, "Mouse", 1999, 5).await;

    let updated = store.adjust_stock(mouse.id, 3).await.unwrap();
    assert_eq!(updated.stock, 8);
    let updated = store.adjust_stock(mouse.id, -8).await.unwrap();
    assert_eq!(updated.stock, 0);

    let err = store.adjust_stock(ProductId::new(999), 1).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            entity: "product",
            ..
        }
    ));
}

async fn update_product_leaves_stock_alone<S: Store>(store: S) {
    let ana = customer(&store, "Ana", "ana@example.com").await;
    let lamp = product(&store, "Lamp", 2500, 10).await;
    let snapshot = lamp.clone();

    store
        .insert_order(order_for(&ana, &[(&lamp, 3)], day(1)))
        .await
        .unwrap();

    let updated = store
        .update_product(Product {
            price: Money::from_cents(2700),
            ..snapshot
        })
        .await
        .unwrap();
    assert_eq!(updated.price, Money::from_cents(2700));
    assert_eq!(updated.stock, 7);
    assert_eq!(stock_of(&store, lamp.id).await, 7);

    let err = store
        .update_product(Product {
            id: ProductId::new(999),
            ..updated
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            entity: "product",
            ..
        }
    ));
}

async fn insert_order_decrements_stock<S: Store>(store: S) {
    let ana = customer(&store, "Ana", "ana@example.com").await;
    let widget = product(&store, "Widget", 500, 10).await;
    let gadget = product(&store, "Gadget", 250, 4).await;

    let (order, items) = store
        .insert_order(order_for(&ana, &[(&widget, 3), (&gadget, 2)], day(1)))
        .await
        .unwrap();

    assert_eq!(order.total, Money::from_cents(2000));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(items.len(), 2);
    assert_eq!(stock_of(&store, widget.id).await, 7);
    assert_eq!(stock_of(&store, gadget.id).await, 2);

    let stored = store.line_items_for_order(order.id).await.unwrap();
    assert_eq!(stored, items);
    assert_eq!(store.require_order(order.id).await.unwrap(), order);
}

async fn insert_order_rolls_back_on_short_stock<S: Store>(store: S) {
    let ana = customer(&store, "Ana", "ana@example.com").await;
    let widget = product(&store, "Widget", 500, 10).await;
    let gadget = product(&store, "Gadget", 250, 1).await;

    // The first line would succeed on its own; the second must undo it.
    let err = store
        .insert_order(order_for(&ana, &[(&widget, 3), (&gadget, 2)], day(1)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Conflict(Conflict::StockExhausted {
            requested: 2,
            available: 1,
            ..
        })
    ));

    assert_eq!(stock_of(&store, widget.id).await, 10);
    assert_eq!(stock_of(&store, gadget.id).await, 1);
    assert!(store.list_orders().await.unwrap().is_empty());
}

async fn insert_order_rolls_back_on_missing_product<S: Store>(store: S) {
    let ana = customer(&store, "Ana", "ana@example.com").await;
    let widget = product(&store, "Widget", 500, 10).await;
    let ghost = Product {
        id: ProductId::new(404),
        ..widget.clone()
    };

    let err = store
        .insert_order(order_for(&ana, &[(&widget, 1), (&ghost, 1)], day(1)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            entity: "product",
            id: 404
        }
    ));
    assert_eq!(stock_of(&store, widget.id).await, 10);
    assert!(store.list_orders().await.unwrap().is_empty());
}

async fn insert_order_requires_customer<S: Store>(store: S) {
    let ana = customer(&store, "Ana", "ana@example.com").await;
    let widget = product(&store, "Widget", 500, 10).await;
    let mut order = order_for(&ana, &[(&widget, 1)], day(1));
    order.customer_id = store::CustomerId::new(77);

    let err = store.insert_order(order).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            entity: "customer",
            ..
        }
    ));
    assert_eq!(stock_of(&store, widget.id).await, 10);
}

async fn delete_order_restores_stock<S: Store>(store: S) {
    let ana = customer(&store, "Ana", "ana@example.com").await;
    let widget = product(&store, "Widget", 500, 10).await;

    let (order, _) = store
        .insert_order(order_for(&ana, &[(&widget, 3)], day(1)))
        .await
        .unwrap();
    assert_eq!(stock_of(&store, widget.id).await, 7);

    let removed = store.delete_order(order.id).await.unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].quantity, 3);
    assert_eq!(stock_of(&store, widget.id).await, 10);
    assert_eq!(store.get_order(order.id).await.unwrap(), None);
    assert!(
        store
            .line_items_for_order(order.id)
            .await
            .unwrap()
            .is_empty()
    );

    let err = store.delete_order(order.id).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { entity: "order", .. }));
}

async fn referenced_rows_cannot_be_deleted<S: Store>(store: S) {
    let ana = customer(&store, "Ana", "ana@example.com").await;
    let widget = product(&store, "Widget", 500, 10).await;
    let (order, _) = store
        .insert_order(order_for(&ana, &[(&widget, 1)], day(1)))
        .await
        .unwrap();

    let err = store.delete_customer(ana.id).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Conflict(Conflict::CustomerHasOrders { orders: 1, .. })
    ));
    let err = store.delete_product(widget.id).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Conflict(Conflict::ProductReferenced { line_items: 1, .. })
    ));
    assert!(store.get_customer(ana.id).await.unwrap().is_some());
    assert!(store.get_product(widget.id).await.unwrap().is_some());

    store.delete_order(order.id).await.unwrap();
    store.delete_product(widget.id).await.unwrap();
    store.delete_customer(ana.id).await.unwrap();

    let err = store.delete_customer(ana.id).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            entity: "customer",
            ..
        }
    ));
}

async fn order_listing_and_status<S: Store>(store: S) {
    let ana = customer(&store, "Ana", "ana@example.com").await;
    let ben = customer(&store, "Ben", "ben@example.com").await;
    let widget = product(&store, "Widget", 500, 10).await;

    let (first, _) = store
        .insert_order(order_for(&ana, &[(&widget, 1)], day(2)))
        .await
        .unwrap();
    let (second, _) = store
        .insert_order(order_for(&ben, &[(&widget, 1)], day(4)))
        .await
        .unwrap();
    let (third, _) = store
        .insert_order(order_for(&ana, &[(&widget, 1)], day(4)))
        .await
        .unwrap();

    let ids: Vec<OrderId> = store
        .list_orders()
        .await
        .unwrap()
        .iter()
        .map(|s| s.order.id)
        .collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);

    let for_ana = store.list_orders_for_customer(ana.id).await.unwrap();
    assert_eq!(for_ana.len(), 2);
    assert!(for_ana.iter().all(|s| s.customer == ana));

    let updated = store
        .set_order_status(first.id, OrderStatus::Shipped)
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Shipped);
    let back = store
        .set_order_status(first.id, OrderStatus::Pending)
        .await
        .unwrap();
    assert_eq!(back.status, OrderStatus::Pending);

    let err = store
        .set_order_status(OrderId::new(999), OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { entity: "order", .. }));
}

macro_rules! backend_tests {
    ($($check:ident),* $(,)?) => {
        mod sqlite_backend {
            $(
                #[tokio::test]
                async fn $check() {
                    let store = store::SqliteStore::in_memory().await.unwrap();
                    super::$check(store).await;
                }
            )*
        }

        mod memory_backend {
            $(
                #[tokio::test]
                async fn $check() {
                    super::$check(store::InMemoryStore::new()).await;
                }
            )*
        }
    };
}

backend_tests!(
    customer_email_is_unique,
    search_matches_any_field_ignoring_case,
    adjust_stock_adds_delta,
    update_product_leaves_stock_alone,
    insert_order_decrements_stock,
    insert_order_rolls_back_on_short_stock,
    insert_order_rolls_back_on_missing_product,
    insert_order_requires_customer,
    delete_order_restores_stock,
    referenced_rows_cannot_be_deleted,
    order_listing_and_status,
);

// -- SQLite-only --

#[tokio::test]
async fn migrations_are_idempotent() {
    let store = SqliteStore::in_memory().await.unwrap();
    let ana = customer(&store, "Ana", "ana@example.com").await;

    store.run_migrations().await.unwrap();

    store.ping().await.unwrap();
    assert_eq!(store.get_customer(ana.id).await.unwrap(), Some(ana));
}

#[tokio::test]
async fn file_database_survives_reconnect() {
    let path = std::env::temp_dir().join(format!("shop-store-{}.db", std::process::id()));
    let url = format!("sqlite:{}", path.display());

    {
        let store = SqliteStore::connect(&url, 2).await.unwrap();
        store.run_migrations().await.unwrap();
        product(&store, "Widget", 500, 10).await;
        store.pool().close().await;
    }

    let store = SqliteStore::connect(&url, 2).await.unwrap();
    store.run_migrations().await.unwrap();
    let products = store.list_products().await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].price, Money::from_cents(500));
    store.pool().close().await;

    let _ = std::fs::remove_file(&path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_cannot_oversell() {
    let path = std::env::temp_dir().join(format!("shop-race-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite:{}", path.display());

    let store = SqliteStore::connect(&url, 4).await.unwrap();
    store.run_migrations().await.unwrap();
    let ana = customer(&store, "Ana", "ana@example.com").await;
    let widget = product(&store, "Widget", 500, 5).await;

    // Each order alone fits; both together would take 8 of 5.
    let first = store.clone();
    let second = store.clone();
    let (a, b) = tokio::join!(
        first.insert_order(order_for(&ana, &[(&widget, 4)], day(1))),
        second.insert_order(order_for(&ana, &[(&widget, 4)], day(1))),
    );

    let (ok, err) = match (a, b) {
        (Ok(ok), Err(err)) | (Err(err), Ok(ok)) => (ok, err),
        other => panic!("expected exactly one order to commit, got {other:?}"),
    };
    assert_eq!(ok.1[0].quantity, 4);
    assert!(matches!(
        err,
        StoreError::Conflict(Conflict::StockExhausted {
            requested: 4,
            available: 1,
            ..
        })
    ));
    assert_eq!(stock_of(&store, widget.id).await, 1);
    assert_eq!(store.list_orders().await.unwrap().len(), 1);

    store.pool().close().await;
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn in_memory_backend_counts_rows() {
    let store = InMemoryStore::new();
    let ana = customer(&store, "Ana", "ana@example.com").await;
    let widget = product(&store, "Widget", 500, 10).await;
    store
        .insert_order(order_for(&ana, &[(&widget, 1), (&widget, 2)], day(1)))
        .await
        .unwrap();

    assert_eq!(store.order_count().await, 1);
    assert_eq!(store.line_item_count().await, 2);
    assert_eq!(stock_of(&store, widget.id).await, 7);
}
