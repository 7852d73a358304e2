use super::*;

use std::{io::Cursor, sync::Mutex};

use async_trait::async_trait;
use chrono::Duration;
use shared::{
    domain::LotStatus,
    protocol::{LotDetail, LotSummary, OrderConfirmation, OrderRequest},
};
use storefront_core::{ManualClock, SelectionPolicy};

fn t0() -> DateTime<Utc> {
    "2024-01-01T12:00:00Z".parse().expect("timestamp")
}

fn summary(
    id: &str,
    status: LotStatus,
    price: Amount,
    starts: Duration,
    ends: Duration,
) -> LotSummary {
    LotSummary {
        id: LotId::from(id),
        title: format!("Lot {id}"),
        about: String::new(),
        image: format!("/{id}.png"),
        status,
        starts_at: t0() + starts,
        ends_at: t0() + ends,
        price,
        min_bid_increment: 5,
        description: None,
        history: None,
    }
}

#[derive(Default)]
struct StubApi {
    orders: Mutex<Vec<OrderRequest>>,
}

#[async_trait]
impl AuctionApi for StubApi {
    async fn get_lot_list(&self) -> Result<Vec<LotItem>> {
        Ok(vec![
            LotItem::from_summary(summary(
                "1",
                LotStatus::Active,
                50,
                Duration::hours(-1),
                Duration::minutes(5),
            )),
            LotItem::from_summary(summary(
                "2",
                LotStatus::Closed,
                70,
                Duration::hours(-2),
                Duration::hours(-1),
            )),
        ])
    }

    async fn get_lot_item(&self, id: &LotId) -> Result<LotDetail> {
        Ok(LotDetail {
            description: format!("detail for {id}"),
            history: Vec::new(),
        })
    }

    async fn order_lots(&self, order: &OrderRequest) -> Result<OrderConfirmation> {
        self.orders.lock().expect("orders lock").push(order.clone());
        Ok(OrderConfirmation {
            id: "order-1".into(),
            total: None,
        })
    }
}

async fn session(api: &Arc<StubApi>, clock: &ManualClock, policy: SelectionPolicy) -> Session {
    let session = Session::new(
        api.clone(),
        Rc::new(clock.clone()),
        StoreOptions {
            bidder_tag: "me".to_string(),
            selection_policy: policy,
        },
    )
    .expect("session");
    session.load().await.expect("catalog");
    session
}

async fn shell(session: &Session, input: &str) -> String {
    let mut out = Vec::new();
    session
        .run_shell(Cursor::new(input.to_string()), &mut out)
        .await
        .expect("shell");
    String::from_utf8(out).expect("utf8")
}

fn order_command(lots: &[&str]) -> Command {
    Command::Order {
        lots: lots.iter().map(|id| id.to_string()).collect(),
        email: "buyer@example.com".to_string(),
        phone: "5550100000".to_string(),
    }
}

#[tokio::test]
async fn lot_won_in_the_shell_can_be_ordered_under_default_policy() {
    let api = Arc::new(StubApi::default());
    let clock = ManualClock::new(t0());
    let session = session(&api, &clock, SelectionPolicy::WonLotsOnly).await;

    let out = shell(&session, "bid 1 60\n").await;
    assert!(out.contains("Your bid: 60"), "unexpected output: {out}");

    clock.advance(Duration::minutes(10));
    let out = shell(
        &session,
        "order --lot 1 --lot 2 --email buyer@example.com --phone 5550100000\n",
    )
    .await;

    assert!(out.contains("skipping lot 2"), "unexpected output: {out}");
    assert!(out.contains("order order-1 placed, total 60"), "unexpected output: {out}");
    let orders = api.orders.lock().expect("orders lock").clone();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].items, vec![LotId::from("1")]);
}

#[tokio::test]
async fn fresh_session_orders_closed_lots_only_with_any_closed() {
    let api = Arc::new(StubApi::default());
    let clock = ManualClock::new(t0());

    let strict = session(&api, &clock, SelectionPolicy::WonLotsOnly).await;
    let mut out = Vec::new();
    let err = strict
        .execute(order_command(&["2"]), &mut out)
        .await
        .expect_err("nothing won in this session");
    assert_eq!(err.to_string(), "order was not placed");
    assert!(String::from_utf8(out).expect("utf8").contains("skipping lot 2"));

    let permissive = session(&api, &clock, SelectionPolicy::AnyClosed).await;
    let mut out = Vec::new();
    permissive
        .execute(order_command(&["2"]), &mut out)
        .await
        .expect("order placed");
    assert!(String::from_utf8(out)
        .expect("utf8")
        .contains("order order-1 placed, total 70"));
    assert_eq!(api.orders.lock().expect("orders lock").len(), 1);
}

#[tokio::test]
async fn shell_reports_bad_lines_and_stops_at_quit() {
    let api = Arc::new(StubApi::default());
    let clock = ManualClock::new(t0());
    let session = session(&api, &clock, SelectionPolicy::WonLotsOnly).await;

    let out = shell(&session, "frobnicate\n\nbid 1 10\nbid 1\nquit\nlist\n").await;

    assert!(
        out.contains("error: bid 10 on lot 1 is below the next minimum bid 55"),
        "unexpected output: {out}"
    );
    assert!(out.contains("Your bid: 55"), "unexpected output: {out}");
    assert!(!out.contains("Open lots:"), "unexpected output: {out}");
}

#[tokio::test]
async fn show_prints_fetched_detail() {
    let api = Arc::new(StubApi::default());
    let clock = ManualClock::new(t0());
    let session = session(&api, &clock, SelectionPolicy::WonLotsOnly).await;

    let out = shell(&session, "show 2\n").await;

    assert!(out.contains("Lot 2 [2]"), "unexpected output: {out}");
    assert!(out.contains("Closed without bids"), "unexpected output: {out}");
    assert!(out.contains("detail for 2"), "unexpected output: {out}");
}
